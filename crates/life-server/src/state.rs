//! Shared application state for the viewer API server.

use std::sync::Arc;

use life_session::{LifeConfig, SessionRegistry};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The session table.
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    /// Create application state with an empty registry built from `config`.
    pub fn new(config: &LifeConfig) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(config)),
        }
    }
}
