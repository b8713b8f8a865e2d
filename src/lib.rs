use std::{sync::Arc, time::Duration};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;

use mcp::server::McpServer;
use mcp::session::{SessionObserver, TracingSessionObserver};

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
    pub session_observer: Arc<dyn SessionObserver>,
    pub handler_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(server: McpServer) -> Self {
        Self {
            server: Arc::new(server),
            session_observer: Arc::new(TracingSessionObserver),
            handler_timeout: None,
        }
    }

    pub fn with_session_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.session_observer = observer;
        self
    }

    /// Bounds how long a session may stay in the handling state.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route(
            "/mcp",
            post(http::handlers::mcp_endpoint)
                .get(http::handlers::mcp_method_not_allowed)
                .delete(http::handlers::mcp_method_not_allowed),
        )
        .layer(CatchPanicLayer::custom(http::handlers::handle_panic))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
