//! Axum HTTP handlers for the web server
//!
//! Provides the Model Context Protocol endpoint and the health check.

use std::any::Any;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::errors::{internal_server_error_body, AppError};
use crate::mcp::rpc::encode_json;
use crate::mcp::session::{CloseReason, Session};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// One HTTP exchange drives exactly one session. If the client goes away the
/// future is dropped and the session closes itself as aborted.
pub async fn mcp_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let mut session = Session::new(state.session_observer.clone(), state.handler_timeout);

    let outcome = match session.connect(&state.server) {
        Ok(()) => session.handle(&body).await,
        Err(err) => Err(err),
    };
    session.close(CloseReason::Completed);

    match outcome {
        Ok(Some(response)) => match encode_json(&response) {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            Err(err) => AppError::transport(format!("failed to encode response: {err}"))
                .into_response(),
        },
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Stateless mode has no session to resume and no event stream to subscribe to.
pub async fn mcp_method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32000,
                "message": "Method not allowed."
            },
            "id": null
        })),
    )
        .into_response()
}

pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %detail, "MCP request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json::<Value>(internal_server_error_body()),
    )
        .into_response()
}
