//! In-memory backend service: users, product catalog, session tokens.

use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};

use edge_gatekeeper::{BackendState, Config, RuntimeMode, build_backend_router, utils};

#[tokio::main]
async fn main() -> ExitCode {
    utils::init_tracing(RuntimeMode::from_env().is_production(), "info");

    info!("Starting backend service v{}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

async fn run() -> Result<(), exitcode::ExitCode> {
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;

    let addr: SocketAddr = config.backend_addr().parse().map_err(|e| {
        error!("Invalid backend address: {e}");
        exitcode::CONFIG
    })?;

    let app = build_backend_router(BackendState::new(&config), &config.frontend_url).map_err(
        |e| {
            error!("Failed to build router: {e}");
            exitcode::CONFIG
        },
    )?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!(mode = %config.mode, frontend = %config.frontend_url, "Backend listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(utils::shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    info!("Backend shutdown complete");
    Ok(())
}
