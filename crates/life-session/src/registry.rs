//! The process-wide table of sessions.
//!
//! [`SessionRegistry`] is an explicit object handed to every operation
//! (there is no ambient global). Its table lock is held only for the
//! read-or-insert itself. Seeds are built before the lock is taken and
//! producers are spawned after it is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use life_core::GenerationEngine;
use tracing::info;

use crate::config::{LifeConfig, SeedConfig, SessionConfig};
use crate::control::{ControlCommand, ControlOutcome};
use crate::ids::SessionToken;
use crate::session::Session;

/// Result of [`SessionRegistry::get_or_create`].
#[derive(Debug, Clone)]
pub struct Lookup {
    /// The session (the shared instance, never a copy).
    pub session: Arc<Session>,
    /// The token the client must present from now on.
    pub token: SessionToken,
    /// Whether the session was minted by this call.
    pub created: bool,
}

/// Owner of all live sessions.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionToken, Arc<Session>>>,
    session_config: SessionConfig,
    seed: SeedConfig,
    engine: GenerationEngine,
    max_retries: u32,
}

impl SessionRegistry {
    /// Create an empty registry configured from `config`.
    pub fn new(config: &LifeConfig) -> Self {
        let engine = GenerationEngine::new(&config.engine);
        info!(
            workers = engine.workers(),
            pattern = config.seed.pattern.name(),
            max_retries = config.engine.max_retries,
            "Session registry ready"
        );
        Self {
            sessions: Mutex::new(HashMap::new()),
            session_config: config.session.clone(),
            seed: config.seed.clone(),
            engine,
            max_retries: config.engine.max_retries,
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<SessionToken, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Per-session settings handed to new sessions.
    pub const fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    /// Look up a session without creating one.
    pub fn get(&self, token: &SessionToken) -> Option<Arc<Session>> {
        self.table().get(token).cloned()
    }

    /// Return the session for `token`, or mint a new one.
    ///
    /// An absent or unknown token is not an error: a fresh token that is
    /// not in the table is minted and a new session (default delay, not
    /// paused) is registered and started. Must be called from within a
    /// Tokio runtime.
    pub fn get_or_create(&self, token: Option<&SessionToken>) -> Lookup {
        if let Some(session) = token.and_then(|t| self.get(t)) {
            return Lookup {
                token: session.token(),
                session,
                created: false,
            };
        }
        if let Some(stale) = token {
            info!(session = %stale, "Unknown session token, minting a new session");
        }

        let seed = self.seed.universe();
        let (session, generation_loop) = {
            let mut table = self.table();
            let mut fresh = SessionToken::mint();
            while table.contains_key(&fresh) {
                fresh = SessionToken::mint();
            }
            let (session, generation_loop) = Session::new(
                fresh,
                &self.session_config,
                self.engine.clone(),
                self.max_retries,
                seed,
            );
            table.insert(fresh, Arc::clone(&session));
            (session, generation_loop)
        };
        session.start_producer(generation_loop);

        let token = session.token();
        info!(session = %token, sessions = self.len(), "Session created");
        Lookup {
            session,
            token,
            created: true,
        }
    }

    /// Remove a session and stop its producer. Returns whether it existed.
    pub async fn destroy(&self, token: &SessionToken) -> bool {
        let removed = self.table().remove(token);
        match removed {
            Some(session) => {
                session.close().await;
                info!(session = %token, sessions = self.len(), "Session destroyed");
                true
            }
            None => false,
        }
    }

    /// Apply a control command. [`ControlCommand::Clear`] also removes the
    /// session from the table.
    pub async fn apply_control(&self, session: &Arc<Session>, command: ControlCommand) -> ControlOutcome {
        if command == ControlCommand::Clear {
            self.table().remove(&session.token());
        }
        let outcome = session.apply_control(command);
        if outcome.closed {
            session.close().await;
        }
        outcome
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Close every session. Used on server shutdown.
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<Session>> = self.table().drain().map(|(_, s)| s).collect();
        let count = drained.len();
        for session in drained {
            session.close().await;
        }
        info!(sessions = count, "All sessions closed");
    }
}
