//! Stdio JSON-RPC loop translating tool calls into bridge requests.

use std::io::{self, BufRead, Write};

use serde_json::json;

use crate::client::{BridgeClient, CallError};
use crate::rpc::{
    error_response, success_response, JsonRpcRequest, JsonRpcResponse, ServerCapabilities,
    ServerInfo, ToolCallResult, ToolsCapability, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::tools::ToolKind;

pub struct GatewayServer {
    client: BridgeClient,
    initialized: bool,
}

impl GatewayServer {
    pub fn new(client: BridgeClient) -> Self {
        Self {
            client,
            initialized: false,
        }
    }

    pub fn handle_request(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        if request.jsonrpc != "2.0" {
            return error_response(
                request.id.clone(),
                INVALID_REQUEST,
                "Invalid JSON-RPC version",
                None,
            );
        }

        let params = request
            .params
            .clone()
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id.clone(), &params),
            "initialized" | "notifications/initialized" => {
                self.initialized = true;
                success_response(request.id.clone(), serde_json::Value::Null)
            }
            "tools/list" => {
                if !self.initialized {
                    return error_response(
                        request.id.clone(),
                        INVALID_REQUEST,
                        "Server not initialized",
                        None,
                    );
                }
                self.handle_tools_list(request.id.clone())
            }
            "tools/call" => {
                if !self.initialized {
                    return error_response(
                        request.id.clone(),
                        INVALID_REQUEST,
                        "Server not initialized",
                        None,
                    );
                }
                self.handle_tools_call(request.id.clone(), &params)
            }
            _ => error_response(request.id.clone(), METHOD_NOT_FOUND, "Method not found", None),
        }
    }

    fn handle_initialize(
        &mut self,
        id: Option<serde_json::Value>,
        params: &serde_json::Value,
    ) -> JsonRpcResponse {
        if !params.is_object() {
            return error_response(id, INVALID_PARAMS, "initialize params must be an object", None);
        }

        self.initialized = true;

        let server_info = ServerInfo {
            name: "deck-gateway".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let capabilities = ServerCapabilities {
            tools: Some(ToolsCapability { list_changed: false }),
        };

        success_response(
            id,
            json!({
                "serverInfo": server_info,
                "capabilities": capabilities
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        let tools = ToolKind::ALL
            .into_iter()
            .map(ToolKind::definition)
            .collect::<Vec<_>>();
        success_response(id, json!({ "tools": tools }))
    }

    fn handle_tools_call(
        &self,
        id: Option<serde_json::Value>,
        params: &serde_json::Value,
    ) -> JsonRpcResponse {
        let Some(params_obj) = params.as_object() else {
            return error_response(id, INVALID_PARAMS, "tools/call params must be an object", None);
        };

        let Some(name) = params_obj.get("name").and_then(serde_json::Value::as_str) else {
            return error_response(id, INVALID_PARAMS, "tools/call missing string field 'name'", None);
        };

        let Some(tool) = ToolKind::from_name(name) else {
            return error_response(
                id,
                METHOD_NOT_FOUND,
                "Tool not found",
                Some(json!({ "name": name })),
            );
        };

        let arguments = params_obj
            .get("arguments")
            .cloned()
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let result = self.dispatch(tool, &arguments);
        match serde_json::to_value(result) {
            Ok(result) => success_response(id, result),
            Err(err) => error_response(
                id,
                crate::rpc::INTERNAL_ERROR,
                "Failed to serialize tool result",
                Some(json!({ "reason": err.to_string() })),
            ),
        }
    }

    /// Execute one tool against the bridge. Argument problems and bridge
    /// failures both come back as `isError` tool results; only protocol
    /// misuse becomes a JSON-RPC error.
    fn dispatch(&self, tool: ToolKind, arguments: &serde_json::Value) -> ToolCallResult {
        let outcome = match tool {
            ToolKind::ListTasks => self.list_tasks(arguments),
            ToolKind::GetTask => {
                require_str(arguments, "task_id").and_then(|id| self.client.get(&format!("/tasks/{id}")))
            }
            ToolKind::UpdateTaskStatus => self.update_task_status(arguments),
            ToolKind::CreateTask => {
                require_str(arguments, "title").and_then(|_| self.client.post("/tasks", arguments))
            }
            ToolKind::ListRequirements => self.client.get("/requirements"),
            ToolKind::GetRequirementsPath => self.client.get("/requirements/path"),
            ToolKind::GetTaskRequirement => require_str(arguments, "task_id")
                .and_then(|id| self.client.get(&format!("/tasks/{id}/requirement"))),
            ToolKind::CreateRequirement => require_str(arguments, "path")
                .and_then(|_| require_str(arguments, "content"))
                .and_then(|_| self.client.post("/requirements", arguments)),
            ToolKind::CompleteInterview => self.client.post("/interview/complete", arguments),
        };

        match outcome {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => ToolCallResult::text(text),
                Err(err) => ToolCallResult::error(format!("failed to render bridge response: {err}")),
            },
            Err(err) => ToolCallResult::error(err.to_string()),
        }
    }

    fn list_tasks(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, CallError> {
        let mut query = Vec::new();
        if let Some(status) = arguments.get("status") {
            let status = status.as_str().ok_or_else(|| {
                CallError::Bridge("argument 'status' must be a string".to_string())
            })?;
            query.push(format!("status={status}"));
        }
        if let Some(limit) = arguments.get("limit") {
            let limit = limit.as_u64().ok_or_else(|| {
                CallError::Bridge("argument 'limit' must be a non-negative integer".to_string())
            })?;
            query.push(format!("limit={limit}"));
        }
        let path = if query.is_empty() {
            "/tasks".to_string()
        } else {
            format!("/tasks?{}", query.join("&"))
        };
        self.client.get(&path)
    }

    fn update_task_status(
        &self,
        arguments: &serde_json::Value,
    ) -> Result<serde_json::Value, CallError> {
        let task_id = require_str(arguments, "task_id")?;
        let status = require_str(arguments, "status")?;
        self.client.patch(
            &format!("/tasks/{task_id}/status"),
            &json!({ "status": status }),
        )
    }

    /// Read lines from stdin and answer on stdout. A malformed line gets
    /// an error response and the loop keeps going.
    pub fn run_stdio(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut out = stdout.lock();

        for line in stdin.lock().lines() {
            if let Some(response) = self.process_line(&line?) {
                writeln!(out, "{response}")?;
                out.flush()?;
            }
        }

        Ok(())
    }

    pub fn process_line(&mut self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => {
                let response = self.handle_request(&request);
                // Notifications carry no id and get no answer.
                if request.id.is_none() {
                    return None;
                }
                response
            }
            Err(err) => {
                tracing::warn!(error = %err, "discarding malformed stdin line");
                // Well-formed JSON that is not a request shape gets the
                // invalid-request code; anything else is a parse error.
                let (code, message) = if err.classify() == serde_json::error::Category::Data {
                    (INVALID_REQUEST, "Invalid request")
                } else {
                    (PARSE_ERROR, "Parse error")
                };
                error_response(None, code, message, Some(json!({ "reason": err.to_string() })))
            }
        };

        serde_json::to_string(&response).ok()
    }
}

fn require_str(arguments: &serde_json::Value, field: &str) -> Result<String, CallError> {
    arguments
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| CallError::Bridge(format!("missing required string argument '{field}'")))
}
