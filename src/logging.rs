use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging() {
    if !try_init_logging() {
        warn!("global tracing subscriber already installed");
    }
}

/// Returns `false` when another subscriber was installed first.
pub fn try_init_logging() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}

/// One summary line per HTTP exchange, leveled by status class.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let duration_ms = started_at.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        error!(method = %method, path = %path, status, duration_ms, "request failed");
    } else if response.status().is_client_error() {
        warn!(method = %method, path = %path, status, duration_ms, "request rejected");
    } else {
        info!(method = %method, path = %path, status, duration_ms, "request summary");
    }

    response
}
