//! HTTP surface started once startup configuration is in place.

pub mod openapi;
pub mod routes;

use crate::bootstrap::Bootstrap;
use crate::config::{ConfigEnvironment, DEFAULT_SERVER_PORT, MONGODB_URI_PROPERTY, SERVER_PORT_PROPERTY};

use anyhow::Result;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Shared state for request handlers.
#[derive(Clone)]
pub struct ServerState {
    pub version: String,
    pub profile: Option<String>,
    pub mongodb_uri_configured: bool,
    pub api_document: Arc<Value>,
}

/// The HTTP server.
pub struct HttpServer {
    state: ServerState,
    addr: SocketAddr,
}

impl HttpServer {
    /// Prepare the server from a finished bootstrap.
    pub fn new(boot: &Bootstrap) -> Self {
        let environment = &boot.environment;
        let port = server_port(environment);
        let servers = openapi::server_entries(environment, port);

        let state = ServerState {
            version: env!("CARGO_PKG_VERSION").to_string(),
            profile: boot.resolution.profile.as_ref().map(|p| p.as_str().to_string()),
            mongodb_uri_configured: environment.get_non_empty(MONGODB_URI_PROPERTY).is_some(),
            api_document: Arc::new(openapi::api_document(&servers)),
        };

        Self {
            state,
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the server until Ctrl+C or SIGTERM.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let app = routes::build_routes(self.state.clone());

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!("Rewards API v{} listening on {}", self.state.version, self.addr);
        info!("  Health: http://{}/health", self.addr);
        info!("  API docs: http://{}/v3/api-docs", self.addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server shut down gracefully");
        Ok(())
    }
}

/// `server.port`, falling back to 8080 when missing or out of range.
pub fn server_port(environment: &ConfigEnvironment) -> u16 {
    let raw = environment.get_u64(SERVER_PORT_PROPERTY, u64::from(DEFAULT_SERVER_PORT));
    u16::try_from(raw).unwrap_or_else(|_| {
        warn!("'{SERVER_PORT_PROPERTY}' value {raw} is out of range, using {DEFAULT_SERVER_PORT}");
        DEFAULT_SERVER_PORT
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
