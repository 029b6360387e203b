//! Core types for the taskdeck control-plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::status::{FeatureStatus, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh identifier. Timestamp-based with a process-local
    /// counter so two mints in the same nanosecond still differ.
    pub fn generate() -> Self {
        Self(fresh_id("T"))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureId(pub String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(fresh_id("F"))
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FeatureId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn fresh_id(prefix: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{nanos}-{seq}")
}

/// The unit of executable work. Owned exclusively by the store; everything
/// outside receives clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    /// Priority rank. Lower value = higher priority; unique across the
    /// whole task set.
    pub rank: i64,
    /// `None` is the explicit "quick task" sentinel — work with no feature.
    #[serde(default)]
    pub feature_id: Option<FeatureId>,
    /// Workspace-relative path to a requirement document. May dangle;
    /// readers must tolerate a path that does not exist on disk.
    #[serde(default)]
    pub requirement_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task in `todo` state at the given rank.
    pub fn new(id: TaskId, title: impl Into<String>, rank: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            rank,
            feature_id: None,
            requirement_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_feature(mut self, feature_id: FeatureId) -> Self {
        self.feature_id = Some(feature_id);
        self
    }

    pub fn with_requirement_path(mut self, path: impl Into<String>) -> Self {
        self.requirement_path = Some(path.into());
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A consolidated unit of product work composed of one or more tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: FeatureStatus,
    /// Ordered references to owned tasks.
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
    pub created_at: DateTime<Utc>,
}

impl Feature {
    pub fn new(id: FeatureId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: FeatureStatus::Active,
            task_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
