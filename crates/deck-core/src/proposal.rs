//! Interview proposal payloads.
//!
//! The Interview Orchestrator hands the store a batch of new features,
//! tasks, and requirement edits; the whole batch is validated up front and
//! applied atomically or not at all.

use serde::{Deserialize, Serialize};

use crate::types::FeatureId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalFeature {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// 0-based index into the proposal's new-features array.
    #[serde(default, alias = "featureIndex")]
    pub feature_index: Option<usize>,
    /// Identifier of a feature that already exists in the store. Not
    /// checked for existence; dangling references are tolerated.
    #[serde(default, alias = "existingFeatureId")]
    pub existing_feature_id: Option<FeatureId>,
    /// Scope-less quick task: the only legal way to reference no feature.
    #[serde(default)]
    pub quick: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Proposal {
    #[serde(default)]
    pub features: Vec<ProposalFeature>,
    #[serde(default)]
    pub tasks: Vec<ProposalTask>,
    /// Requirement document content, written to `requirement_path`.
    #[serde(default, alias = "requirementDoc")]
    pub requirement_doc: Option<String>,
    #[serde(default, alias = "requirementPath")]
    pub requirement_path: Option<String>,
    /// Design-guide text. Merged into the singleton guide unless
    /// `design_md_replace` is set.
    #[serde(default, alias = "proposedDesignMd")]
    pub design_md: Option<String>,
    #[serde(default)]
    pub design_md_replace: bool,
}

/// Identifiers minted by an applied proposal, in batch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProposalOutcome {
    pub feature_ids: Vec<FeatureId>,
    pub task_ids: Vec<crate::types::TaskId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProposalError {
    #[error("task {index} references both a new-feature index and an existing feature")]
    BothFeatureRefs { index: usize },
    #[error("task {index} references no feature and is not marked as a quick task")]
    MissingFeatureRef { index: usize },
    #[error("task {index} references new-feature index {feature_index} but the proposal has {feature_count} features")]
    FeatureIndexOutOfRange {
        index: usize,
        feature_index: usize,
        feature_count: usize,
    },
    #[error("new feature {index} ({title:?}) is not referenced by any task")]
    UnreferencedFeature { index: usize, title: String },
    #[error("task {index} has an empty title")]
    EmptyTaskTitle { index: usize },
    #[error("new feature {index} has an empty title")]
    EmptyFeatureTitle { index: usize },
    #[error("requirement_doc supplied without a requirement_path")]
    RequirementDocWithoutPath,
}

impl Proposal {
    /// Validate the whole batch before anything mutates. Every new feature
    /// must be referenced by at least one task, and every non-quick task
    /// must reference exactly one of `feature_index`/`existing_feature_id`.
    pub fn validate(&self) -> Result<(), ProposalError> {
        if self.requirement_doc.is_some() && self.requirement_path.is_none() {
            return Err(ProposalError::RequirementDocWithoutPath);
        }

        for (index, feature) in self.features.iter().enumerate() {
            if feature.title.trim().is_empty() {
                return Err(ProposalError::EmptyFeatureTitle { index });
            }
        }

        let mut referenced = vec![false; self.features.len()];
        for (index, task) in self.tasks.iter().enumerate() {
            if task.title.trim().is_empty() {
                return Err(ProposalError::EmptyTaskTitle { index });
            }
            match (task.feature_index, &task.existing_feature_id) {
                (Some(_), Some(_)) => {
                    return Err(ProposalError::BothFeatureRefs { index });
                }
                (Some(feature_index), None) => {
                    if feature_index >= self.features.len() {
                        return Err(ProposalError::FeatureIndexOutOfRange {
                            index,
                            feature_index,
                            feature_count: self.features.len(),
                        });
                    }
                    referenced[feature_index] = true;
                }
                (None, Some(_)) => {}
                (None, None) => {
                    if !task.quick {
                        return Err(ProposalError::MissingFeatureRef { index });
                    }
                }
            }
        }

        for (index, seen) in referenced.iter().enumerate() {
            if !seen {
                return Err(ProposalError::UnreferencedFeature {
                    index,
                    title: self.features[index].title.clone(),
                });
            }
        }

        Ok(())
    }
}
