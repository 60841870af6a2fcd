//! Todo CRUD service with best-effort Azure Blob mirroring.
//!
//! # Overview
//! Todos live in memory and are authoritative there. Each create, update and
//! delete is mirrored to `todos/{id}.json` in a blob container when storage
//! is configured; mirror failures are logged and never change a response.
//! Secrets can be read from Key Vault at startup, but only whether each one
//! loaded is retained.

pub mod azure;
pub mod config;
pub mod error;
pub mod logging;
pub mod mirror;
pub mod routes;
pub mod secrets;
pub mod state;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::Config;
pub use error::AppError;
pub use mirror::{BlobStore, Mirror};
pub use secrets::{LoadedSecrets, SecretSource};
pub use state::AppState;

pub fn app(state: AppState) -> Router {
    routes::router(state).layer(TraceLayer::new_for_http())
}

/// Serve until the listener fails.
pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

/// Serve until Ctrl+C or SIGTERM, then drain in-flight requests.
pub async fn run_until_shutdown(
    listener: TcpListener,
    state: AppState,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Todo API shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
