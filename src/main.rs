use stateless_mcp_server::{build_app, config::Config, domain, logging, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let server = domain::build_server()?;

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(server);
    let app = build_app(state);

    let listener = match tokio::net::TcpListener::bind(bind_socket).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(
                bind_addr = %config.bind_addr,
                bind_port = config.bind_port,
                error = %err,
                "failed to start server"
            );
            std::process::exit(1);
        }
    };

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        "MCP server is running on http://localhost:{}/mcp",
        config.bind_port
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
