//! Startup helpers for the nutrition coach server.

use std::process::ExitCode;
use std::sync::Arc;

use crate::coach::core::config::CoachConfig;
use crate::server::{self, AppState};

/// Run the server (used by the `nutri-coach-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting nutrition coach v{}", env!("CARGO_PKG_VERSION"));

    let config = match CoachConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!("Analysis endpoint: {}", config.gateway.base_url);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let port = config.server.port;
    let state = match rt.block_on(initialize(config)) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to create state: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, port, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Initialize application state without starting the server.
///
/// # Errors
/// Returns an error if state creation fails.
pub async fn initialize(
    config: CoachConfig,
) -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    match &config.ledger.sqlite_path {
        Some(path) => tracing::info!("Food ledger: {}", path.display()),
        None => tracing::info!("Food ledger: in memory"),
    }

    AppState::from_config(config)
        .await
        .map_err(|e| format!("Failed to create state: {e}").into())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
