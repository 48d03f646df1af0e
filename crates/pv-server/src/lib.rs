//! pv-server: HTTP front end for the picture store.
//!
//! This crate ties the `pv-*` crates into a running server. It provides:
//!
//! - Axum routes for upload, retrieval, listing, and deletion
//! - Session token issuance for session-scoped galleries
//! - Request ids, CORS, and request tracing
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;

use std::future::Future;
use std::net::SocketAddr;

use pv_core::config::Config;

use crate::context::AppContext;

/// Start the picvault server.
///
/// Opens the database, builds the [`AppContext`], and serves HTTP until a
/// shutdown signal is received.
pub async fn start(config: Config) -> pv_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| pv_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::from_config(config)?;

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| pv_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    serve(listener, ctx, shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Serve the router on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    ctx: AppContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> pv_core::Result<()> {
    let app = router::build_router(ctx);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| pv_core::Error::Internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
