//! JSON-RPC protocol representations and formatting utilities
//!
//! Maps internal AppErrors onto JSON-RPC error objects, builds result envelopes,
//! and encodes outgoing JSON with JavaScript number formatting.

use std::io;

use rust_mcp_sdk::schema::{
    JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult, RpcError,
};
use serde::{ser::Error as _, Serialize};
use serde_json::{
    json,
    ser::{CompactFormatter, Formatter},
    Value,
};

use crate::errors::AppError;

pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const REQUEST_TIMEOUT: i32 = -32001;
pub const RESOURCE_NOT_FOUND: i32 = -32002;

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn app_error_to_json_rpc(id: Option<Value>, err: AppError) -> Value {
    let description = err.to_string();

    match err {
        AppError::BadRequest { code, message } => json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": code,
                "message": message,
                "details": {}
            })),
        ),
        AppError::NotFound {
            code,
            message,
            target,
        } => {
            let (rpc_code, rpc_message) = match code {
                "resource_not_found" => (RESOURCE_NOT_FOUND, "Resource not found"),
                _ => (METHOD_NOT_FOUND, "Method not found"),
            };
            json_rpc_error_with_data(
                id,
                rpc_code,
                rpc_message,
                Some(json!({
                    "code": code,
                    "message": message,
                    "details": {
                        "target": target,
                    },
                })),
            )
        }
        AppError::InvalidInput { field, message } => json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": "invalid_input",
                "message": message,
                "details": {
                    "field": field,
                },
            })),
        ),
        AppError::Handler { code, message } => {
            tracing::warn!(error = %message, "tool or resource handler failed");
            json_rpc_error_with_data(
                id,
                code.unwrap_or(INTERNAL_ERROR),
                "Internal error",
                Some(json!({
                    "code": "handler_error",
                    "message": message,
                    "details": {}
                })),
            )
        }
        AppError::Timeout { elapsed_ms } => json_rpc_error_with_data(
            id,
            REQUEST_TIMEOUT,
            "Request timed out",
            Some(json!({
                "code": "timeout",
                "message": description,
                "details": {
                    "elapsed_ms": elapsed_ms,
                },
            })),
        ),
        AppError::Transport { .. } => {
            tracing::error!(error = %description, "transport failure inside dispatch");
            json_rpc_error(id, INTERNAL_ERROR, "Internal error")
        }
    }
}

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let response = JsonrpcErrorResponse::new(
        RpcError {
            code: i64::from(code),
            data,
            message: message.to_string(),
        },
        id.as_ref().and_then(value_to_request_id),
    );
    serde_json::to_value(response).expect("jsonrpc error response serialization")
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    if let Some(request_id) = id.as_ref().and_then(value_to_request_id) {
        let extra = result.as_object().cloned();
        let response = JsonrpcResultResponse::new(request_id, McpResult { meta: None, extra });
        return serde_json::to_value(response).expect("jsonrpc result response serialization");
    }

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}

pub fn request_id_to_value(id: RequestId) -> Value {
    match id {
        RequestId::String(value) => Value::String(value),
        RequestId::Integer(value) => Value::Number(value.into()),
    }
}

/// Writes doubles the way `JSON.stringify` does: integral values below 1e21 as
/// plain digits, `-0` as `0`, and positive exponents with an explicit `+`.
struct JsNumberFormatter;

impl Formatter for JsNumberFormatter {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if value == 0.0 {
            return writer.write_all(b"0");
        }
        if value.fract() == 0.0 && value.abs() < 1e21 {
            return write!(writer, "{value:.0}");
        }

        let mut shortest = Vec::new();
        CompactFormatter.write_f64(&mut shortest, value)?;
        match shortest.iter().position(|byte| *byte == b'e') {
            Some(index) if shortest.get(index + 1) != Some(&b'-') => {
                writer.write_all(&shortest[..=index])?;
                writer.write_all(b"+")?;
                writer.write_all(&shortest[index + 1..])
            }
            _ => writer.write_all(&shortest),
        }
    }
}

pub fn encode_json<T>(value: &T) -> Result<Vec<u8>, serde_json::Error>
where
    T: ?Sized + Serialize,
{
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, JsNumberFormatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

pub fn encode_json_string<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: ?Sized + Serialize,
{
    String::from_utf8(encode_json(value)?).map_err(serde_json::Error::custom)
}
