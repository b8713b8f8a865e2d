//! HTTP Transport layer for the Model Context Protocol
//!
//! Provides the `/mcp` endpoint, its error mapping, and the health check.

pub mod handlers;
