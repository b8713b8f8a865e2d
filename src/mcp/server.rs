//! The central Model Context Protocol engine
//!
//! Holds the tool registry and resource router shared by every session, decodes
//! JSON-RPC messages, and routes methods (`initialize`, `tools/*`, `resources/*`).

use std::sync::Arc;

use rust_mcp_sdk::schema::{
    CallToolRequest, CallToolRequestParams, Implementation, InitializeRequest, InitializeResult,
    JsonrpcMessage, JsonrpcRequest, ListResourceTemplatesRequest, ListResourceTemplatesResult,
    ListResourcesRequest, ListResourcesResult, ListToolsRequest, ListToolsResult, PingRequest,
    ReadResourceRequest, ReadResourceRequestParams, ResourceTemplate, ServerCapabilities,
    ServerCapabilitiesResources, ServerCapabilitiesTools,
};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::AppError;
use crate::mcp::registry::{ToolDescriptor, ToolHandler, ToolRegistry};
use crate::mcp::router::{ResourceHandler, ResourceRouter, UriTemplate};
use crate::mcp::rpc::{
    app_error_to_json_rpc, is_json_rpc_error, json_rpc_error, json_rpc_result,
    request_id_to_value, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
};

pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

/// Registry and router built once at startup and only read afterwards.
pub struct McpServer {
    name: String,
    version: String,
    tools: ToolRegistry,
    resources: ResourceRouter,
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tools: ToolRegistry::new(),
            resources: ResourceRouter::new(),
        }
    }

    pub fn register_tool(&mut self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) {
        self.tools.register(descriptor, handler);
    }

    pub fn register_resource(
        &mut self,
        template: UriTemplate,
        descriptor: ResourceTemplate,
        handler: Arc<dyn ResourceHandler>,
    ) {
        self.resources.register(template, descriptor, handler);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resources(&self) -> &ResourceRouter {
        &self.resources
    }
}

/// Handles one decoded JSON-RPC message. Returns `None` for notifications.
pub async fn handle_json_rpc_value(server: &McpServer, payload: Value) -> Option<Value> {
    if !payload.is_object() {
        return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
    }

    let request_id = payload.get("id").cloned();
    let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
        Ok(message) => message,
        Err(_) => return Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request")),
    };

    match parsed {
        JsonrpcMessage::Request(request) => {
            if let Err(error_response) = validate_request_shape(&request) {
                return Some(error_response);
            }

            let request_id = request_id_to_value(request.id);
            if request.method.trim().is_empty() {
                return Some(json_rpc_error(
                    Some(request_id),
                    INVALID_REQUEST,
                    "Invalid Request",
                ));
            }

            Some(
                handle_json_rpc_request(
                    server,
                    Some(request_id),
                    request.method,
                    request.params.map(Value::Object),
                )
                .await,
            )
        }
        JsonrpcMessage::Notification(notification) => {
            if notification.method.trim().is_empty() {
                return None;
            }

            let _ = handle_json_rpc_request(
                server,
                None,
                notification.method,
                notification.params.map(Value::Object),
            )
            .await;
            None
        }
        JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => Some(
            json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request"),
        ),
    }
}

pub fn validate_request_shape(request: &JsonrpcRequest) -> Result<(), Value> {
    let payload = serde_json::to_value(request).expect("jsonrpc request serialization");
    let request_id = Some(request_id_to_value(request.id.clone()));

    let valid = match request.method.as_str() {
        "tools/call" => serde_json::from_value::<CallToolRequest>(payload).is_ok(),
        "resources/read" => serde_json::from_value::<ReadResourceRequest>(payload).is_ok(),
        "tools/list" => serde_json::from_value::<ListToolsRequest>(payload).is_ok(),
        "resources/list" => serde_json::from_value::<ListResourcesRequest>(payload).is_ok(),
        "resources/templates/list" => {
            serde_json::from_value::<ListResourceTemplatesRequest>(payload).is_ok()
        }
        "ping" => serde_json::from_value::<PingRequest>(payload).is_ok(),
        "initialize" => serde_json::from_value::<InitializeRequest>(payload).is_ok(),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(json_rpc_error(request_id, INVALID_PARAMS, "Invalid params"))
    }
}

pub async fn handle_json_rpc_request(
    server: &McpServer,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
) -> Value {
    let audit_params = redact_audit_params(params.as_ref());

    let response = match method.as_str() {
        "initialize" => match negotiate_protocol_version(params.as_ref()) {
            Ok(protocol_version) => json_rpc_result(
                id,
                serde_json::to_value(initialize_result(server, protocol_version))
                    .expect("initialize result serialization"),
            ),
            Err(err) => app_error_to_json_rpc(id, err),
        },
        "ping" => json_rpc_result(id, json!({})),
        "tools/list" => json_rpc_result(
            id,
            serde_json::to_value(ListToolsResult {
                meta: None,
                next_cursor: None,
                tools: server.tools().list_tools(),
            })
            .expect("tools list result serialization"),
        ),
        "tools/call" => handle_tools_call(server, id, params).await,
        "resources/list" => json_rpc_result(
            id,
            serde_json::to_value(ListResourcesResult {
                meta: None,
                next_cursor: None,
                resources: server.resources().list_resources().await,
            })
            .expect("resources list result serialization"),
        ),
        "resources/templates/list" => json_rpc_result(
            id,
            serde_json::to_value(ListResourceTemplatesResult {
                meta: None,
                next_cursor: None,
                resource_templates: server.resources().list_templates(),
            })
            .expect("resource templates list result serialization"),
        ),
        "resources/read" => handle_resources_read(server, id, params).await,
        notification if notification.starts_with("notifications/") => {
            json_rpc_result(id, json!({}))
        }
        _ => json_rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
    };

    info!(
        method = %method,
        params = %audit_params,
        outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
        "mcp action audited"
    );

    response
}

pub async fn handle_tools_call(server: &McpServer, id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    match server
        .tools()
        .dispatch(&tool_call.name, tool_call.arguments.map(Value::Object))
        .await
    {
        Ok(result) => json_rpc_result(
            id,
            serde_json::to_value(result).expect("tool call result serialization"),
        ),
        Err(err) => app_error_to_json_rpc(id, err),
    }
}

pub async fn handle_resources_read(
    server: &McpServer,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let resource_read: ReadResourceRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    match server.resources().resolve(&resource_read.uri).await {
        Ok(result) => json_rpc_result(
            id,
            serde_json::to_value(result).expect("read resource result serialization"),
        ),
        Err(err) => app_error_to_json_rpc(id, err),
    }
}

fn initialize_result(server: &McpServer, protocol_version: &str) -> InitializeResult {
    InitializeResult {
        server_info: Implementation {
            name: server.name().to_string(),
            version: server.version().to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            resources: Some(ServerCapabilitiesResources {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            prompts: None,
            ..Default::default()
        },
        protocol_version: protocol_version.to_string(),
        instructions: None,
        meta: None,
    }
}

/// Echoes the client's version when supported, otherwise offers the latest one.
pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<&'static str, AppError> {
    let offered_version = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "invalid_protocol_version",
                "initialize params.protocolVersion is required",
            )
        })?;

    Ok(SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|version| *version == offered_version)
        .unwrap_or(LATEST_PROTOCOL_VERSION))
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}
