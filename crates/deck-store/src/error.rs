use std::io;
use std::path::PathBuf;

use deck_core::{ProposalError, RepositoryError, SCHEMA_VERSION};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("unsupported tasks file version {found}, this build understands version {SCHEMA_VERSION}")]
    UnsupportedVersion { found: u64 },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("json serialization error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn task_not_found(id: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            kind: "task",
            id: id.to_string(),
        }
    }

    pub fn requirement_not_found(path: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            kind: "requirement",
            id: path.to_string(),
        }
    }
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::TaskNotFound(id) => StoreError::task_not_found(id),
            RepositoryError::Transition(err) => StoreError::Validation(err.to_string()),
        }
    }
}

impl From<ProposalError> for StoreError {
    fn from(err: ProposalError) -> Self {
        StoreError::Validation(err.to_string())
    }
}
