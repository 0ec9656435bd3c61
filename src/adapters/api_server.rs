use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::adapters::LedgerStore;
use crate::api::{create_router, AppState};
use crate::config::AppConfig;
use crate::error::{LedgerError, Result};

/// Start the API server and serve until Ctrl-C
pub async fn start_api_server(store: Arc<LedgerStore>, config: Arc<AppConfig>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            LedgerError::Internal(format!(
                "invalid listen address {}:{}: {e}",
                config.server.host, config.server.port
            ))
        })?;

    let app = create_router(AppState::new(store, config));

    info!("API server listening on http://{}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
