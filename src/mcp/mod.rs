//! Model Context Protocol server handling and JSON-RPC implementations
//!
//! Provides the shared tool registry and resource router, the JSON-RPC message
//! routing on top of them, and the per-request session that binds the two to one HTTP exchange.

pub mod registry;
pub mod router;
pub mod rpc;
pub mod schema;
pub mod server;
pub mod session;
