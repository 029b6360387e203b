//! Single-writer coordinator over the tasks file.
//!
//! All mutations flow through one `TaskStore`: each computes the next
//! state on a scratch copy, persists it, and only then commits in memory
//! and notifies watchers. A failed persist therefore rolls back by
//! construction and watchers never observe unpersisted state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};

use deck_core::{
    ChangeOrigin, Proposal, ProposalOutcome, Repository, Task, TaskId, TaskStatus,
};

use crate::error::StoreError;
use crate::paths::WorkspacePaths;
use crate::persistence::{load_repository, save_repository, write_atomic};

/// Broadcast to watchers after a mutation has been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// Tasks, features, or requirement documents changed.
    Changed,
    /// An interview's proposal was applied in full. Fired exactly once
    /// per completed interview, after the `Changed` for its mutations.
    InterviewFinished,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "featureId")]
    pub feature_id: Option<deck_core::FeatureId>,
    #[serde(default, alias = "requirementPath")]
    pub requirement_path: Option<String>,
}

/// Payload for finishing an interview: a proposal to apply plus existing
/// tasks to attach the proposal's requirement document to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteInterview {
    #[serde(flatten)]
    pub proposal: Proposal,
    #[serde(default, alias = "taskIds")]
    pub task_ids: Vec<TaskId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterviewOutcome {
    #[serde(flatten)]
    pub created: ProposalOutcome,
    pub updated_task_ids: Vec<TaskId>,
}

pub struct TaskStore {
    paths: WorkspacePaths,
    repository: Mutex<Repository>,
    events: broadcast::Sender<StoreEvent>,
}

impl TaskStore {
    pub fn open(workspace_root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let paths = WorkspacePaths::new(workspace_root);
        let repository = load_repository(&paths.tasks_file())?;
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            paths,
            repository: Mutex::new(repository),
            events,
        })
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: StoreEvent) {
        // No receivers is fine; nobody is watching yet.
        let _ = self.events.send(event);
    }

    fn persist(&self, repository: &Repository) -> Result<(), StoreError> {
        save_repository(&self.paths.tasks_file(), repository)
    }

    pub async fn create_task(&self, new: NewTask) -> Result<Task, StoreError> {
        if new.title.trim().is_empty() {
            return Err(StoreError::Validation("task title must not be empty".to_string()));
        }
        let mut repository = self.repository.lock().await;
        let mut scratch = repository.clone();
        let task = scratch.create_task(
            new.title,
            new.description,
            new.feature_id,
            new.requirement_path,
        );
        self.persist(&scratch)?;
        *repository = scratch;
        drop(repository);
        self.notify(StoreEvent::Changed);
        Ok(task)
    }

    pub async fn update_task_status(
        &self,
        id: &TaskId,
        to: TaskStatus,
        origin: ChangeOrigin,
    ) -> Result<Task, StoreError> {
        let mut repository = self.repository.lock().await;
        let mut scratch = repository.clone();
        let task = scratch.update_status(id, to, origin)?;
        self.persist(&scratch)?;
        *repository = scratch;
        drop(repository);
        self.notify(StoreEvent::Changed);
        Ok(task)
    }

    pub async fn reorder_task(&self, id: &TaskId, new_rank: i64) -> Result<Task, StoreError> {
        let mut repository = self.repository.lock().await;
        let mut scratch = repository.clone();
        scratch.reorder(id, new_rank)?;
        let task = scratch
            .task(id)
            .cloned()
            .ok_or_else(|| StoreError::task_not_found(id))?;
        self.persist(&scratch)?;
        *repository = scratch;
        drop(repository);
        self.notify(StoreEvent::Changed);
        Ok(task)
    }

    pub async fn delete_task(&self, id: &TaskId) -> Result<Task, StoreError> {
        let mut repository = self.repository.lock().await;
        let mut scratch = repository.clone();
        let removed = scratch.remove_task(id)?;
        self.persist(&scratch)?;
        *repository = scratch;
        drop(repository);
        self.notify(StoreEvent::Changed);
        Ok(removed)
    }

    pub async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: Option<usize>,
    ) -> Vec<Task> {
        self.repository.lock().await.tasks_sorted(status, limit)
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.repository
            .lock()
            .await
            .task(id)
            .cloned()
            .ok_or_else(|| StoreError::task_not_found(id))
    }

    pub async fn next_task(&self) -> Option<Task> {
        self.repository.lock().await.next_task()
    }

    pub async fn list_features(&self) -> Vec<deck_core::Feature> {
        self.repository.lock().await.features.clone()
    }

    /// Data-dir-relative paths of every requirement document, sorted.
    pub fn list_requirements(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.paths.requirements_dir();
        let mut found = Vec::new();
        collect_documents(&dir, &self.paths.data_dir(), &mut found)?;
        found.sort();
        Ok(found)
    }

    pub fn read_requirement(&self, relative: &str) -> Result<String, StoreError> {
        let path = self.paths.resolve_requirement(relative)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::requirement_not_found(relative))
            }
            Err(err) => Err(StoreError::io(path, err)),
        }
    }

    /// The requirement document attached to a task. A task without a path,
    /// or a path that dangles, reports not-found rather than failing.
    pub async fn requirement_for_task(&self, id: &TaskId) -> Result<String, StoreError> {
        let task = self.get_task(id).await?;
        let relative = task
            .requirement_path
            .ok_or_else(|| StoreError::requirement_not_found(id))?;
        self.read_requirement(&relative)
    }

    /// Write a requirement document atomically and announce the change.
    /// Returns the normalized data-dir-relative path.
    pub fn write_requirement(&self, relative: &str, content: &str) -> Result<String, StoreError> {
        let path = self.paths.resolve_requirement(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
        write_atomic(&path, content.as_bytes())?;
        self.notify(StoreEvent::Changed);
        Ok(relative.trim().to_string())
    }

    /// Apply a proposal batch: requirement document and design-guide edits
    /// land on disk first, then tasks and features persist in one write.
    pub async fn apply_proposal(&self, proposal: &Proposal) -> Result<ProposalOutcome, StoreError> {
        let mut repository = self.repository.lock().await;
        let mut scratch = repository.clone();
        let outcome = scratch.apply_proposal(proposal)?;
        self.write_proposal_documents(proposal)?;
        self.persist(&scratch)?;
        *repository = scratch;
        drop(repository);
        self.notify(StoreEvent::Changed);
        Ok(outcome)
    }

    /// Finish an interview: apply the proposal, attach its requirement
    /// path to the listed existing tasks, and fire `InterviewFinished`
    /// exactly once after everything is persisted.
    pub async fn complete_interview(
        &self,
        request: &CompleteInterview,
    ) -> Result<InterviewOutcome, StoreError> {
        let mut repository = self.repository.lock().await;
        let mut scratch = repository.clone();
        let created = scratch.apply_proposal(&request.proposal)?;

        let mut updated_task_ids = Vec::new();
        if let Some(relative) = &request.proposal.requirement_path {
            for id in &request.task_ids {
                let task = scratch
                    .task_mut(id)
                    .ok_or_else(|| StoreError::task_not_found(id))?;
                task.requirement_path = Some(relative.clone());
                task.touch();
                updated_task_ids.push(id.clone());
            }
        } else if !request.task_ids.is_empty() {
            return Err(StoreError::Validation(
                "task_ids given without a requirement_path to attach".to_string(),
            ));
        }

        self.write_proposal_documents(&request.proposal)?;
        self.persist(&scratch)?;
        *repository = scratch;
        drop(repository);
        self.notify(StoreEvent::Changed);
        self.notify(StoreEvent::InterviewFinished);
        Ok(InterviewOutcome {
            created,
            updated_task_ids,
        })
    }

    fn write_proposal_documents(&self, proposal: &Proposal) -> Result<(), StoreError> {
        if let (Some(doc), Some(relative)) = (&proposal.requirement_doc, &proposal.requirement_path)
        {
            let path = self.paths.resolve_requirement(relative)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
            }
            write_atomic(&path, doc.as_bytes())?;
        }
        if let Some(text) = &proposal.design_md {
            self.merge_design_guide(text, proposal.design_md_replace)?;
        }
        Ok(())
    }

    /// The design guide is a singleton; new text appends unless a replace
    /// was requested or no guide exists yet.
    fn merge_design_guide(&self, text: &str, replace: bool) -> Result<(), StoreError> {
        let path = self.paths.design_guide();
        let merged = if replace {
            text.to_string()
        } else {
            match fs::read_to_string(&path) {
                Ok(existing) if !existing.trim().is_empty() => {
                    format!("{}\n\n{}", existing.trim_end(), text)
                }
                _ => text.to_string(),
            }
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
        write_atomic(&path, merged.as_bytes())
    }
}

fn collect_documents(
    dir: &Path,
    base: &Path,
    found: &mut Vec<String>,
) -> Result<(), StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(StoreError::io(dir, err)),
    };
    for entry in entries {
        let entry = entry.map_err(|err| StoreError::io(dir, err))?;
        let path = entry.path();
        if path.is_dir() {
            collect_documents(&path, base, found)?;
        } else if path.extension().map_or(false, |ext| ext == "md") {
            if let Ok(relative) = path.strip_prefix(base) {
                found.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(())
}
