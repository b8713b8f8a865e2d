//! Tools and resources served by this MCP server
//!
//! `build_server` registers everything once at startup; the result is shared
//! read-only by every request.

pub mod resources;
pub mod tools;
pub mod utils;

use thiserror::Error;

use crate::mcp::router::TemplateError;
use crate::mcp::schema::ShapeError;
use crate::mcp::server::McpServer;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid tool schema: {0}")]
    Shape(#[from] ShapeError),
    #[error("invalid resource template: {0}")]
    Template(#[from] TemplateError),
}

pub fn build_server() -> Result<McpServer, BuildError> {
    let mut server = McpServer::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tools::register_tools(&mut server)?;
    resources::register_resources(&mut server)?;
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::build_server;

    #[test]
    fn registers_tools_and_resources() {
        let server = build_server().expect("server builds");

        assert!(server.tools().contains("add_numbers"));
        assert!(server.tools().contains("echo_text"));
        assert_eq!(server.tools().len(), 2);
        assert_eq!(server.resources().len(), 1);
        assert_eq!(server.name(), env!("CARGO_PKG_NAME"));
    }
}
