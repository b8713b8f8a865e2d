//! Model Context Protocol resource templates
//!
//! Exposes personalized greetings under `greeting://{name}`. The template cannot
//! be enumerated; clients must address a concrete name.

use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::macros;

use crate::errors::AppError;
use crate::mcp::router::{
    ResourceContent, ResourceHandler, TemplateError, TemplateVariables, UriTemplate,
};
use crate::mcp::server::McpServer;

pub const FALLBACK_NAME: &str = "stranger";

pub fn greeting_message(name: &str) -> String {
    format!("Hello, {name}! This greeting comes from the MCP server.")
}

#[macros::mcp_resource_template(
    name = "greeting_resource",
    title = "Greeting Resource",
    description = "Returns a personalized greeting for a given name.",
    uri_template = "greeting://{name}"
)]
#[derive(Debug, Default)]
pub struct GreetingResource;

#[async_trait]
impl ResourceHandler for GreetingResource {
    async fn read(
        &self,
        uri: &str,
        variables: &TemplateVariables,
    ) -> Result<Vec<ResourceContent>, AppError> {
        let name = variables.get("name").unwrap_or(FALLBACK_NAME);
        Ok(vec![ResourceContent::text(uri, greeting_message(name))])
    }
}

pub fn register_resources(server: &mut McpServer) -> Result<(), TemplateError> {
    server.register_resource(
        UriTemplate::parse(GreetingResource::resource_template_uri())?
            .with_default("name", FALLBACK_NAME),
        GreetingResource::resource_template(),
        Arc::new(GreetingResource),
    );
    Ok(())
}
