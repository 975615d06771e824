//! Sparse Life viewer server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `life-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing), text or JSON
//! 3. Create the session registry and shared state
//! 4. Serve the viewer API until `Ctrl-C`
//! 5. Close every session so pending long-polls resolve, then exit

use std::path::Path;
use std::sync::Arc;

use life_server::{start_server, AppState, ServerConfig};
use life_session::LifeConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application entry point for the viewer server.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or the server
/// fails to bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so report after init.
    let config_path = Path::new("life-config.yaml");
    let config = LifeConfig::load_or_default(config_path)?;

    // 2. Initialize structured logging.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(
        config_file = config_path.exists(),
        host = config.server.host,
        port = config.server.port,
        pattern = config.seed.pattern.name(),
        workers = config.engine.workers,
        initial_delay_ms = config.session.initial_delay_ms,
        "life-server starting"
    );

    // 3. Shared state.
    let state = Arc::new(AppState::new(&config));
    let server_config = ServerConfig::from(&config);

    // 4-5. Serve until Ctrl-C, closing sessions first so long-polls drain.
    let registry = Arc::clone(&state.registry);
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C, serving until killed");
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
        registry.shutdown().await;
    };

    start_server(&server_config, state, shutdown).await?;
    info!("life-server exited cleanly");
    Ok(())
}
