use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        code: &'static str,
        message: String,
    },
    #[error("not found: {message}")]
    NotFound {
        code: &'static str,
        message: &'static str,
        target: String,
    },
    #[error("invalid input for field `{field}`: {message}")]
    InvalidInput { field: String, message: String },
    #[error("handler error: {message}")]
    Handler { code: Option<i32>, message: String },
    #[error("request timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            code: "tool_not_found",
            message: "unknown tool name",
            target: name.into(),
        }
    }

    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::NotFound {
            code: "resource_not_found",
            message: "unknown resource uri",
            target: uri.into(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            code: None,
            message: message.into(),
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::Timeout {
            elapsed_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Envelope returned when a failure escapes the dispatch path.
pub fn internal_server_error_body() -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": -32603,
            "message": "Internal server error"
        },
        "id": null
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "error handling MCP request");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(internal_server_error_body()),
        )
            .into_response()
    }
}
