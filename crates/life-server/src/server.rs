//! Viewer HTTP server lifecycle management.
//!
//! Provides [`start_server`] which binds to a TCP port and runs the
//! Axum server until the supplied shutdown future completes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use life_session::LifeConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Configuration for the viewer server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 6080,
        }
    }
}

impl From<&LifeConfig> for ServerConfig {
    fn from(config: &LifeConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
        }
    }
}

/// Start the viewer HTTP server.
///
/// Binds to the configured address, builds the router, and serves
/// requests until `shutdown` resolves. In-flight requests are allowed to
/// finish; the caller should close the registry inside `shutdown` so that
/// pending long-polls resolve instead of holding the server open.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "Viewer server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Viewer server stopped");
    Ok(())
}

/// Errors that can occur when starting or running the viewer server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_follows_life_config() {
        let mut life = LifeConfig::default();
        life.server.host = String::from("127.0.0.1");
        life.server.port = 7000;
        let config = ServerConfig::from(&life);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 7000);
    }

    #[tokio::test]
    async fn invalid_host_is_a_bind_error() {
        let config = ServerConfig {
            host: String::from("not an address"),
            port: 0,
        };
        let state = Arc::new(AppState::new(&LifeConfig::default()));
        let err = start_server(&config, state, async {}).await;
        assert!(matches!(err, Err(ServerError::Bind(_))));
    }
}
