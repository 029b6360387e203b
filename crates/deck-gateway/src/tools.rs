//! The closed set of tools the gateway exposes.
//!
//! Tools are an enum rather than a registry: the surface is fixed, and
//! `tools/list` schemas are generated from the same place `tools/call`
//! dispatches, so the two can never drift apart.

use serde_json::json;

use deck_core::TaskStatus;

use crate::rpc::ToolDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ListTasks,
    GetTask,
    UpdateTaskStatus,
    CreateTask,
    ListRequirements,
    GetRequirementsPath,
    GetTaskRequirement,
    CreateRequirement,
    CompleteInterview,
}

impl ToolKind {
    pub const ALL: [ToolKind; 9] = [
        ToolKind::ListTasks,
        ToolKind::GetTask,
        ToolKind::UpdateTaskStatus,
        ToolKind::CreateTask,
        ToolKind::ListRequirements,
        ToolKind::GetRequirementsPath,
        ToolKind::GetTaskRequirement,
        ToolKind::CreateRequirement,
        ToolKind::CompleteInterview,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ListTasks => "list_tasks",
            ToolKind::GetTask => "get_task",
            ToolKind::UpdateTaskStatus => "update_task_status",
            ToolKind::CreateTask => "create_task",
            ToolKind::ListRequirements => "list_requirements",
            ToolKind::GetRequirementsPath => "get_requirements_path",
            ToolKind::GetTaskRequirement => "get_task_requirement",
            ToolKind::CreateRequirement => "create_requirement",
            ToolKind::CompleteInterview => "complete_interview",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            ToolKind::ListTasks => "List tasks in priority order, optionally filtered by status",
            ToolKind::GetTask => "Get one task by its identifier",
            ToolKind::UpdateTaskStatus => {
                "Move a task to a new status; only forward lifecycle arcs are allowed"
            }
            ToolKind::CreateTask => "Create a new task at the end of the priority order",
            ToolKind::ListRequirements => "List all requirement document paths",
            ToolKind::GetRequirementsPath => "Get the directory where requirement documents live",
            ToolKind::GetTaskRequirement => "Read the requirement document attached to a task",
            ToolKind::CreateRequirement => "Write a requirement document",
            ToolKind::CompleteInterview => {
                "Finish an interview by applying its proposed features, tasks, and documents"
            }
        }
    }

    pub fn input_schema(self) -> serde_json::Value {
        let statuses = TaskStatus::ALL
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>();
        match self {
            ToolKind::ListTasks => json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": statuses,
                        "description": "Only return tasks in this status"
                    },
                    "limit": { "type": "integer", "description": "Maximum number of tasks" }
                }
            }),
            ToolKind::GetTask | ToolKind::GetTaskRequirement => json!({
                "type": "object",
                "required": ["task_id"],
                "properties": {
                    "task_id": { "type": "string", "description": "Task identifier" }
                }
            }),
            ToolKind::UpdateTaskStatus => json!({
                "type": "object",
                "required": ["task_id", "status"],
                "properties": {
                    "task_id": { "type": "string", "description": "Task identifier" },
                    "status": {
                        "type": "string",
                        "enum": statuses,
                        "description": "Target status"
                    }
                }
            }),
            ToolKind::CreateTask => json!({
                "type": "object",
                "required": ["title"],
                "properties": {
                    "title": { "type": "string", "description": "Task title" },
                    "description": { "type": "string", "description": "What the task covers" },
                    "feature_id": { "type": "string", "description": "Owning feature, if any" },
                    "requirement_path": {
                        "type": "string",
                        "description": "Requirement document to attach"
                    }
                }
            }),
            ToolKind::ListRequirements | ToolKind::GetRequirementsPath => json!({
                "type": "object",
                "properties": {}
            }),
            ToolKind::CreateRequirement => json!({
                "type": "object",
                "required": ["path", "content"],
                "properties": {
                    "path": { "type": "string", "description": "Data-dir-relative document path" },
                    "content": { "type": "string", "description": "Markdown content" }
                }
            }),
            ToolKind::CompleteInterview => json!({
                "type": "object",
                "properties": {
                    "features": {
                        "type": "array",
                        "description": "New features to create",
                        "items": {
                            "type": "object",
                            "required": ["title"],
                            "properties": {
                                "title": { "type": "string" },
                                "description": { "type": "string" }
                            }
                        }
                    },
                    "tasks": {
                        "type": "array",
                        "description": "New tasks; each references a new feature by index, an existing feature by id, or is marked quick",
                        "items": {
                            "type": "object",
                            "required": ["title"],
                            "properties": {
                                "title": { "type": "string" },
                                "description": { "type": "string" },
                                "featureIndex": { "type": "integer" },
                                "existingFeatureId": { "type": "string" },
                                "quick": { "type": "boolean" }
                            }
                        }
                    },
                    "requirementDoc": { "type": "string", "description": "Requirement document content" },
                    "requirementPath": { "type": "string", "description": "Where to write the requirement document" },
                    "proposedDesignMd": { "type": "string", "description": "Text to merge into the design guide" },
                    "design_md_replace": { "type": "boolean", "description": "Replace the design guide instead of appending" },
                    "taskIds": {
                        "type": "array",
                        "description": "Existing tasks to attach the requirement document to",
                        "items": { "type": "string" }
                    }
                }
            }),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_for_every_tool() {
        for tool in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(tool.name()), Some(tool));
        }
        assert_eq!(ToolKind::from_name("no_such_tool"), None);
    }

    #[test]
    fn every_schema_is_an_object_schema() {
        for tool in ToolKind::ALL {
            let schema = tool.input_schema();
            assert_eq!(schema["type"], "object", "{}", tool.name());
            assert!(schema["properties"].is_object(), "{}", tool.name());
        }
    }

    #[test]
    fn status_arguments_enumerate_the_state_machine() {
        let schema = ToolKind::UpdateTaskStatus.input_schema();
        let values = schema["properties"]["status"]["enum"].as_array().unwrap();
        assert_eq!(values.len(), 5);
        assert!(values.contains(&serde_json::json!("ready-for-signoff")));
    }
}
