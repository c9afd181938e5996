//! Delivery server for host snapshots.
//!
//! Static data is pulled over HTTP from `/api/static`; dynamic data is
//! pushed over a WebSocket on `/` (alias `/ws`) whenever a client asks.

pub mod config;
pub mod handlers;
pub mod messages;
pub mod router;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use messages::{ClientMessage, ServerMessage};
pub use router::create_app;

use crate::error::{Result, SystemError};
use crate::metrics::SnapshotSource;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn SnapshotSource>,
}

impl AppState {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self { source }
    }
}

/// Bind to the configured address and serve until Ctrl-C.
pub async fn start_web_server(config: WebConfig, source: Arc<dyn SnapshotSource>) -> Result<()> {
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| SystemError::config_error(format!("Invalid bind address: {}", e)))?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| SystemError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("Host stats server listening on {}", addr);
    info!("Static endpoint: http://{}/api/static", addr);
    info!("Health endpoint: http://{}/api/health", addr);
    info!("WebSocket endpoint: ws://{}/", addr);

    serve_on(listener, config, source, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_on<F>(
    listener: TcpListener,
    config: WebConfig,
    source: Arc<dyn SnapshotSource>,
    shutdown: F,
) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_app(&config, AppState::new(source));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SystemError::web_server_error(format!("Server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
