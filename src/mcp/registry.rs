//! Tool registry: named operations with declared shapes and async handlers
//!
//! Every call goes through the same pipeline: look up the tool, validate the
//! arguments against its input [`Shape`], run the handler, check the output
//! against the output shape, and package it as a text block plus structured content.

use std::{collections::HashMap, future::Future, marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use rust_mcp_sdk::schema::{CallToolResult, ContentBlock, TextContent, Tool};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;
use crate::mcp::rpc::encode_json_string;
use crate::mcp::schema::{Shape, ShapeError};

/// Failure raised by a tool's own logic.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ToolError {
    pub code: Option<i32>,
    pub message: String,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        AppError::Handler {
            code: err.code,
            message: err.message,
        }
    }
}

/// The protocol-facing [`Tool`] plus the shapes its calls are checked against.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    tool: Tool,
    input_schema: Shape,
    output_schema: Shape,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let input_schema = Shape::new();
        Self {
            tool: Tool {
                annotations: None,
                description: Some(description.into()),
                execution: None,
                icons: vec![],
                input_schema: input_schema.to_input_schema(),
                meta: None,
                name: name.into(),
                output_schema: None,
                title: Some(title.into()),
            },
            input_schema,
            output_schema: Shape::new(),
        }
    }

    /// Wraps a tool generated by `#[mcp_tool]`; its input schema becomes the input shape.
    pub fn from_tool(tool: Tool) -> Result<Self, ShapeError> {
        let input_schema = Shape::from_input_schema(&tool.input_schema)?;
        Ok(Self {
            tool,
            input_schema,
            output_schema: Shape::new(),
        })
    }

    pub fn input(mut self, shape: Shape) -> Self {
        self.tool.input_schema = shape.to_input_schema();
        self.input_schema = shape;
        self
    }

    pub fn output(mut self, shape: Shape) -> Self {
        self.tool.output_schema = Some(shape.to_output_schema());
        self.output_schema = shape;
        self
    }

    pub fn name(&self) -> &str {
        &self.tool.name
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, AppError>;
}

/// Adapts an async function over serde types into a [`ToolHandler`].
pub struct TypedToolHandler<I, O, F> {
    handler: F,
    _types: PhantomData<fn(I) -> O>,
}

pub fn typed_handler<I, O, F, Fut>(handler: F) -> Arc<dyn ToolHandler>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
{
    Arc::new(TypedToolHandler {
        handler,
        _types: PhantomData,
    })
}

#[async_trait]
impl<I, O, F, Fut> ToolHandler for TypedToolHandler<I, O, F>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
{
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, AppError> {
        let input: I = serde_json::from_value(Value::Object(arguments))
            .map_err(|err| AppError::invalid_input("arguments", err.to_string()))?;
        let output = (self.handler)(input).await?;

        serde_json::to_value(output)
            .map_err(|err| AppError::handler(format!("failed to serialize tool output: {err}")))
    }
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a tool under its descriptor name. A later registration with the
    /// same name replaces the earlier one and keeps its listing position.
    pub fn register(&mut self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) {
        let name = descriptor.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(
            name,
            RegisteredTool {
                descriptor,
                handler,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Entries for `tools/list`, in registration order.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|registered| registered.descriptor.tool().clone())
            .collect()
    }

    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<CallToolResult, AppError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AppError::tool_not_found(name))?;

        let arguments = match arguments {
            None => Map::new(),
            Some(Value::Object(arguments)) => arguments,
            Some(_) => {
                return Err(AppError::invalid_input(
                    "arguments",
                    "arguments must be an object",
                ))
            }
        };

        let validated = tool.descriptor.input_schema.validate(&arguments)?;
        debug!(tool = %name, "invoking tool handler");

        let Value::Object(output) = tool.handler.call(validated).await? else {
            return Err(AppError::handler(format!(
                "tool `{name}` returned a non-object output"
            )));
        };

        tool.descriptor
            .output_schema
            .validate(&output)
            .map_err(|err| {
                AppError::handler(format!(
                    "tool `{name}` output does not match its declared shape: {err}"
                ))
            })?;

        let text = encode_json_string(&output).map_err(|err| {
            AppError::handler(format!("failed to encode output of tool `{name}`: {err}"))
        })?;
        Ok(CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(text, None, None))],
            is_error: None,
            meta: None,
            structured_content: Some(output),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_mcp_sdk::schema::Tool;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Map, Value};

    use super::{typed_handler, ToolDescriptor, ToolError, ToolHandler, ToolRegistry};
    use crate::errors::AppError;
    use crate::mcp::schema::{FieldSpec, Shape};

    #[derive(Deserialize)]
    struct ShoutInput {
        text: String,
    }

    #[derive(Serialize)]
    struct ShoutOutput {
        shouted: String,
    }

    fn shout_descriptor() -> ToolDescriptor {
        ToolDescriptor::new("shout", "Shout", "Upper-case the text")
            .input(Shape::new().field(FieldSpec::string("text").min_length(1)))
            .output(Shape::new().field(FieldSpec::string("shouted")))
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(
            shout_descriptor(),
            typed_handler(|input: ShoutInput| async move {
                Ok::<_, ToolError>(ShoutOutput {
                    shouted: input.text.to_uppercase(),
                })
            }),
        );
        registry
    }

    struct RawHandler(Value);

    #[async_trait]
    impl ToolHandler for RawHandler {
        async fn call(&self, _arguments: Map<String, Value>) -> Result<Value, AppError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn dispatch_packages_text_and_structured_content() {
        let result = registry()
            .dispatch("shout", Some(json!({"text": "hey"})))
            .await
            .expect("dispatch succeeds");
        let result = serde_json::to_value(result).expect("result serialization");

        assert_eq!(result["structuredContent"], json!({"shouted": "HEY"}));
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], "{\"shouted\":\"HEY\"}");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let error = registry()
            .dispatch("whisper", None)
            .await
            .expect_err("unknown tool must fail");

        assert!(matches!(
            error,
            AppError::NotFound { code: "tool_not_found", ref target, .. } if target == "whisper"
        ));
    }

    #[tokio::test]
    async fn invalid_input_names_the_field() {
        let error = registry()
            .dispatch("shout", Some(json!({"text": ""})))
            .await
            .expect_err("empty text must fail");

        assert!(matches!(error, AppError::InvalidInput { ref field, .. } if field == "text"));
    }

    #[tokio::test]
    async fn missing_arguments_fail_required_fields() {
        let error = registry()
            .dispatch("shout", None)
            .await
            .expect_err("missing text must fail");

        assert!(matches!(error, AppError::InvalidInput { ref field, .. } if field == "text"));
    }

    #[tokio::test]
    async fn non_object_arguments_are_invalid_input() {
        let error = registry()
            .dispatch("shout", Some(json!("hey")))
            .await
            .expect_err("string arguments must fail");

        assert!(matches!(error, AppError::InvalidInput { ref field, .. } if field == "arguments"));
    }

    #[tokio::test]
    async fn handler_error_keeps_message_and_code() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::new("fail", "Fail", "Always fails"),
            typed_handler(|_: Value| async move {
                Err::<Value, _>(ToolError::new("disk on fire").with_code(-32050))
            }),
        );

        let error = registry
            .dispatch("fail", None)
            .await
            .expect_err("handler error must surface");

        assert!(matches!(
            error,
            AppError::Handler { code: Some(-32050), ref message } if message == "disk on fire"
        ));
    }

    #[tokio::test]
    async fn output_must_match_declared_shape() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::new("broken", "Broken", "Returns the wrong shape")
                .output(Shape::new().field(FieldSpec::number("result"))),
            Arc::new(RawHandler(json!({"result": "five"}))),
        );

        let error = registry
            .dispatch("broken", None)
            .await
            .expect_err("shape mismatch must fail");

        assert!(matches!(error, AppError::Handler { .. }));
    }

    #[tokio::test]
    async fn output_must_be_an_object() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::new("scalar", "Scalar", "Returns a bare number"),
            Arc::new(RawHandler(json!(5))),
        );

        let error = registry
            .dispatch("scalar", None)
            .await
            .expect_err("scalar output must fail");

        assert!(error.to_string().contains("non-object"));
    }

    #[tokio::test]
    async fn last_registration_wins_and_keeps_position() {
        let mut registry = registry();
        registry.register(
            ToolDescriptor::new("other", "Other", "Another tool"),
            Arc::new(RawHandler(json!({}))),
        );
        registry.register(
            ToolDescriptor::new("shout", "Shout v2", "Replaced"),
            Arc::new(RawHandler(json!({"replaced": true}))),
        );

        let names = registry
            .list_tools()
            .into_iter()
            .filter_map(|tool| tool.title)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Shout v2", "Other"]);
        assert_eq!(registry.len(), 2);

        let result = registry
            .dispatch("shout", None)
            .await
            .expect("replacement handler runs");
        assert_eq!(
            result.structured_content.map(Value::Object),
            Some(json!({"replaced": true}))
        );
    }

    #[test]
    fn listing_renders_schemas() {
        let listing =
            serde_json::to_value(shout_descriptor().tool()).expect("tool serialization");

        assert_eq!(listing["name"], "shout");
        assert_eq!(listing["title"], "Shout");
        assert_eq!(listing["inputSchema"]["properties"]["text"]["minLength"], 1);
        assert_eq!(listing["outputSchema"]["required"], json!(["shouted"]));
    }

    #[tokio::test]
    async fn declared_tool_schema_drives_validation() {
        let tool: Tool = serde_json::from_value(json!({
            "name": "greet",
            "description": "Greets someone",
            "inputSchema": {
                "type": "object",
                "properties": {"who": {"type": "string", "minLength": 2}},
                "required": ["who"]
            }
        }))
        .expect("valid tool");
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::from_tool(tool).expect("supported schema"),
            Arc::new(RawHandler(json!({"greeting": "hi"}))),
        );

        let error = registry
            .dispatch("greet", Some(json!({"who": "A"})))
            .await
            .expect_err("too short");
        assert!(matches!(error, AppError::InvalidInput { ref field, .. } if field == "who"));
        assert!(registry
            .dispatch("greet", Some(json!({"who": "Ada"})))
            .await
            .is_ok());
    }
}
