//! Workspace data-directory layout.
//!
//! Everything the control-plane persists lives under `.deck/` inside the
//! workspace root: the tasks file, the bridge port file, and the
//! requirements tree with its singleton design guide.

use std::path::{Component, Path, PathBuf};

use crate::error::StoreError;

pub const DATA_DIR: &str = ".deck";
pub const TASKS_FILE: &str = "tasks.json";
pub const PORT_FILE: &str = "bridge.port";
pub const REQUIREMENTS_DIR: &str = "requirements";
pub const DESIGN_GUIDE_FILE: &str = "design.md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    root: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir().join(TASKS_FILE)
    }

    pub fn port_file(&self) -> PathBuf {
        self.data_dir().join(PORT_FILE)
    }

    pub fn requirements_dir(&self) -> PathBuf {
        self.data_dir().join(REQUIREMENTS_DIR)
    }

    pub fn design_guide(&self) -> PathBuf {
        self.requirements_dir().join(DESIGN_GUIDE_FILE)
    }

    /// Resolve a data-dir-relative requirement path, rejecting anything
    /// that would escape the data directory.
    pub fn resolve_requirement(&self, relative: &str) -> Result<PathBuf, StoreError> {
        let relative = sanitize_relative(relative)?;
        Ok(self.data_dir().join(relative))
    }
}

/// Validate a caller-supplied relative path: non-empty, not absolute, and
/// free of parent-directory components.
pub fn sanitize_relative(raw: &str) -> Result<PathBuf, StoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation("path must not be empty".to_string()));
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        return Err(StoreError::Validation(format!(
            "path must be relative: {trimmed}"
        )));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(StoreError::Validation(format!(
                    "path must not contain '.' or '..' components: {trimmed}"
                )))
            }
        }
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_under_the_data_dir() {
        let paths = WorkspacePaths::new("/work/repo");
        assert_eq!(paths.tasks_file(), PathBuf::from("/work/repo/.deck/tasks.json"));
        assert_eq!(paths.port_file(), PathBuf::from("/work/repo/.deck/bridge.port"));
        assert_eq!(
            paths.design_guide(),
            PathBuf::from("/work/repo/.deck/requirements/design.md")
        );
    }

    #[test]
    fn resolve_requirement_joins_under_data_dir() {
        let paths = WorkspacePaths::new("/work/repo");
        let resolved = paths.resolve_requirement("requirements/auth.md").unwrap();
        assert_eq!(
            resolved,
            PathBuf::from("/work/repo/.deck/requirements/auth.md")
        );
    }

    #[test]
    fn sanitize_rejects_escape_attempts() {
        assert!(sanitize_relative("").is_err());
        assert!(sanitize_relative("  ").is_err());
        assert!(sanitize_relative("/etc/passwd").is_err());
        assert!(sanitize_relative("../secrets.md").is_err());
        assert!(sanitize_relative("requirements/../../x.md").is_err());
        assert!(sanitize_relative("requirements/auth.md").is_ok());
    }
}
