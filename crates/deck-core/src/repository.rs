//! The canonical in-memory task/feature collection.
//!
//! Pure data plus the lifecycle and ordering rules; persistence and
//! locking live in deck-store. Priority ranks are kept dense: every
//! mutation that touches ordering leaves the set a strict total order
//! with no duplicates.

use serde::{Deserialize, Serialize};

use crate::proposal::{Proposal, ProposalError, ProposalOutcome};
use crate::status::{ChangeOrigin, TaskStatus, TransitionError};
use crate::types::{Feature, FeatureId, Task, TaskId};

/// On-disk schema version understood by this build.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub version: u32,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Default for Repository {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            tasks: Vec::new(),
            features: Vec::new(),
        }
    }
}

impl Repository {
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| &task.id == id)
    }

    pub fn feature(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.iter().find(|feature| &feature.id == id)
    }

    pub fn feature_mut(&mut self, id: &FeatureId) -> Option<&mut Feature> {
        self.features.iter_mut().find(|feature| &feature.id == id)
    }

    /// Rank for a task appended after the current lowest-priority task.
    pub fn next_rank(&self) -> i64 {
        self.tasks
            .iter()
            .map(|task| task.rank)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Create a task in `todo` state at the end of the priority order and
    /// link it into its feature when that feature exists. A dangling
    /// feature reference is kept as-is.
    pub fn create_task(
        &mut self,
        title: impl Into<String>,
        description: Option<String>,
        feature_id: Option<FeatureId>,
        requirement_path: Option<String>,
    ) -> Task {
        let mut task = Task::new(TaskId::generate(), title, self.next_rank());
        if let Some(description) = description {
            task = task.with_description(description);
        }
        if let Some(path) = requirement_path {
            task = task.with_requirement_path(path);
        }
        if let Some(feature_id) = feature_id {
            if let Some(feature) = self.feature_mut(&feature_id) {
                feature.task_ids.push(task.id.clone());
            }
            task = task.with_feature(feature_id);
        }
        self.tasks.push(task.clone());
        task
    }

    /// Apply a status transition, enforcing the state machine for the
    /// given origin. On rejection the task is unchanged.
    pub fn update_status(
        &mut self,
        id: &TaskId,
        to: TaskStatus,
        origin: ChangeOrigin,
    ) -> Result<Task, RepositoryError> {
        let task = self
            .task_mut(id)
            .ok_or_else(|| RepositoryError::TaskNotFound(id.clone()))?;
        if !task.status.may_transition(to, origin) {
            return Err(TransitionError {
                from: task.status,
                to,
            }
            .into());
        }
        task.status = to;
        task.touch();
        Ok(task.clone())
    }

    /// Move a task to `new_rank`, shifting only the tasks whose ranks sit
    /// in the affected contiguous range. Ranks stay dense.
    pub fn reorder(&mut self, id: &TaskId, new_rank: i64) -> Result<(), RepositoryError> {
        let old_rank = self
            .task(id)
            .map(|task| task.rank)
            .ok_or_else(|| RepositoryError::TaskNotFound(id.clone()))?;
        let max_rank = self.next_rank().saturating_sub(1);
        let new_rank = new_rank.clamp(0, max_rank);
        if new_rank == old_rank {
            return Ok(());
        }

        for task in &mut self.tasks {
            if &task.id == id {
                task.rank = new_rank;
                task.touch();
            } else if new_rank < old_rank && task.rank >= new_rank && task.rank < old_rank {
                task.rank += 1;
            } else if new_rank > old_rank && task.rank > old_rank && task.rank <= new_rank {
                task.rank -= 1;
            }
        }
        Ok(())
    }

    /// Snapshot of tasks sorted by rank ascending, optionally filtered by
    /// status and truncated.
    pub fn tasks_sorted(&self, status: Option<TaskStatus>, limit: Option<usize>) -> Vec<Task> {
        let mut tasks = self
            .tasks
            .iter()
            .filter(|task| status.map_or(true, |wanted| task.status == wanted))
            .cloned()
            .collect::<Vec<_>>();
        tasks.sort_by_key(|task| task.rank);
        if let Some(limit) = limit {
            tasks.truncate(limit);
        }
        tasks
    }

    /// The lowest-rank `todo` task; `None` when the backlog is empty.
    pub fn next_task(&self) -> Option<Task> {
        self.tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Todo)
            .min_by_key(|task| task.rank)
            .cloned()
    }

    /// Re-assign dense ranks 0..n, preserving rank order and breaking ties
    /// by creation time. Used after loading a file written by other tools.
    pub fn normalize_ranks(&mut self) {
        let mut order = (0..self.tasks.len()).collect::<Vec<_>>();
        order.sort_by_key(|&idx| (self.tasks[idx].rank, self.tasks[idx].created_at));
        for (rank, idx) in order.into_iter().enumerate() {
            self.tasks[idx].rank = rank as i64;
        }
    }

    /// Remove a task, unlink it from its feature, and close the rank gap.
    pub fn remove_task(&mut self, id: &TaskId) -> Result<Task, RepositoryError> {
        let position = self
            .tasks
            .iter()
            .position(|task| &task.id == id)
            .ok_or_else(|| RepositoryError::TaskNotFound(id.clone()))?;
        let removed = self.tasks.remove(position);
        for task in &mut self.tasks {
            if task.rank > removed.rank {
                task.rank -= 1;
            }
        }
        if let Some(feature_id) = &removed.feature_id {
            if let Some(feature) = self.feature_mut(feature_id) {
                feature.task_ids.retain(|task_id| task_id != id);
            }
        }
        Ok(removed)
    }

    /// Apply a validated proposal: create features first, then tasks, each
    /// linked to its new or existing feature. The caller persists once
    /// afterwards; validation failure leaves the repository untouched.
    pub fn apply_proposal(&mut self, proposal: &Proposal) -> Result<ProposalOutcome, ProposalError> {
        proposal.validate()?;

        let mut outcome = ProposalOutcome::default();
        for feature in &proposal.features {
            let created = Feature::new(FeatureId::generate(), feature.title.clone())
                .with_description(feature.description.clone());
            outcome.feature_ids.push(created.id.clone());
            self.features.push(created);
        }

        for task in &proposal.tasks {
            let feature_id = match (task.feature_index, &task.existing_feature_id) {
                (Some(index), None) => Some(outcome.feature_ids[index].clone()),
                (None, Some(existing)) => Some(existing.clone()),
                _ => None,
            };
            let requirement_path = proposal.requirement_path.clone();
            let created = self.create_task(
                task.title.clone(),
                Some(task.description.clone()),
                feature_id,
                requirement_path,
            );
            outcome.task_ids.push(created.id.clone());
        }

        Ok(outcome)
    }
}
