//! Interactive tools exposed via Model Context Protocol
//!
//! Provides `add_numbers` and `echo_text`.

use rust_mcp_sdk::macros;
use serde::{Deserialize, Serialize};

use crate::domain::utils::serialize_js_number;
use crate::mcp::registry::{typed_handler, ToolDescriptor, ToolError};
use crate::mcp::schema::{FieldSpec, Shape, ShapeError};
use crate::mcp::server::McpServer;

#[macros::mcp_tool(
    name = "add_numbers",
    title = "Add Numbers",
    description = "Add two numbers and return the sum."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AddNumbersTool {
    /// First addend
    pub a: f64,
    /// Second addend
    pub b: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AddNumbersOutput {
    #[serde(serialize_with = "serialize_js_number")]
    pub result: f64,
}

#[macros::mcp_tool(
    name = "echo_text",
    title = "Echo Text",
    description = "Return the same text back. Useful for debugging."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct EchoTextTool {
    /// Text to echo back
    #[json_schema(min_length = 1)]
    pub text: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EchoTextOutput {
    pub echoed: String,
    /// Unicode code points, not bytes.
    pub length: usize,
}

pub fn add_numbers_descriptor() -> Result<ToolDescriptor, ShapeError> {
    Ok(ToolDescriptor::from_tool(AddNumbersTool::tool())?
        .output(Shape::new().field(FieldSpec::number("result"))))
}

pub fn echo_text_descriptor() -> Result<ToolDescriptor, ShapeError> {
    Ok(ToolDescriptor::from_tool(EchoTextTool::tool())?.output(
        Shape::new()
            .field(FieldSpec::string("echoed"))
            .field(FieldSpec::number("length")),
    ))
}

pub async fn add_numbers(input: AddNumbersTool) -> Result<AddNumbersOutput, ToolError> {
    Ok(AddNumbersOutput {
        result: input.a + input.b,
    })
}

pub async fn echo_text(input: EchoTextTool) -> Result<EchoTextOutput, ToolError> {
    let length = input.text.chars().count();
    Ok(EchoTextOutput {
        echoed: input.text,
        length,
    })
}

pub fn register_tools(server: &mut McpServer) -> Result<(), ShapeError> {
    server.register_tool(add_numbers_descriptor()?, typed_handler(add_numbers));
    server.register_tool(echo_text_descriptor()?, typed_handler(echo_text));
    Ok(())
}
