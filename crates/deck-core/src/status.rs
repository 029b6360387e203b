//! Task and feature lifecycle states.
//!
//! The machine constrains agent-initiated transitions to the forward arcs;
//! the operator may force any arc.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    ReadyForSignoff,
    Done,
    Rework,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::ReadyForSignoff => "ready-for-signoff",
            TaskStatus::Done => "done",
            TaskStatus::Rework => "rework",
        }
    }

    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::ReadyForSignoff,
        TaskStatus::Done,
        TaskStatus::Rework,
    ];

    /// Returns true if the task is in a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    /// Forward arcs an agent may request: todo → in-progress →
    /// ready-for-signoff → done, plus rework → in-progress.
    /// `ready-for-signoff → rework` is operator-only.
    pub fn agent_may_transition(self, to: TaskStatus) -> bool {
        matches!(
            (self, to),
            (TaskStatus::Todo, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::ReadyForSignoff)
                | (TaskStatus::ReadyForSignoff, TaskStatus::Done)
                | (TaskStatus::Rework, TaskStatus::InProgress)
        )
    }

    pub fn may_transition(self, to: TaskStatus, origin: ChangeOrigin) -> bool {
        match origin {
            ChangeOrigin::Operator => true,
            ChangeOrigin::Agent => self.agent_may_transition(to),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "todo" => Ok(TaskStatus::Todo),
            "in-progress" => Ok(TaskStatus::InProgress),
            "ready-for-signoff" => Ok(TaskStatus::ReadyForSignoff),
            "done" => Ok(TaskStatus::Done),
            "rework" => Ok(TaskStatus::Rework),
            other => Err(format!(
                "invalid task status '{other}'. valid values: todo, in-progress, ready-for-signoff, done, rework"
            )),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who asked for a mutation. The store trusts operator-origin calls with
/// any transition; agent-origin calls are policy-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    Operator,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    #[default]
    Active,
    Archived,
}

impl FeatureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureStatus::Active => "active",
            FeatureStatus::Archived => "archived",
        }
    }
}

impl std::str::FromStr for FeatureStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "active" => Ok(FeatureStatus::Active),
            "archived" => Ok(FeatureStatus::Archived),
            other => Err(format!(
                "invalid feature status '{other}'. valid values: active, archived"
            )),
        }
    }
}

impl std::fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent-origin transition that the state machine rejects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to} for agent-origin caller")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}
