//! Sessions, generation loops, and long-poll broadcast for Sparse Life.
//!
//! A [`Session`] is the unit of isolation between independent viewer
//! groups. Each one owns a background generation producer, a set of
//! single-use listener slots, and its simulation control state (delay,
//! paused). The [`SessionRegistry`] is the only owner of the session
//! table.
//!
//! # Locking
//!
//! The registry table and every session's state are guarded by separate
//! locks. The registry lock is never held while a session lock is taken.
//! Inside a session the frame receiver lock (async, may be held across an
//! `.await`) is always taken before the state lock (sync, never held
//! across an `.await`).
//!
//! # Modules
//!
//! - [`config`] -- `life-config.yaml` loading into typed structs.
//! - [`control`] -- Control commands, control events, and notifications.
//! - [`error`] -- [`SessionError`].
//! - [`ids`] -- [`SessionToken`] and [`PageId`].
//! - [`listener`] -- Single-fulfilment listener slots.
//! - [`producer`] -- The cancellable generation producer loop.
//! - [`registry`] -- [`SessionRegistry`].
//! - [`session`] -- [`Session`] and the frame-sharing policy.
//!
//! [`SessionError`]: error::SessionError
//! [`SessionToken`]: ids::SessionToken
//! [`PageId`]: ids::PageId
//! [`SessionRegistry`]: registry::SessionRegistry
//! [`Session`]: session::Session

pub mod config;
pub mod control;
pub mod error;
pub mod ids;
pub mod listener;
pub mod producer;
pub mod registry;
pub mod session;

// Re-export primary types for convenience.
pub use config::{ConfigError, LifeConfig, SessionConfig};
pub use control::{ControlCommand, ControlEvent, ControlOutcome, Notification};
pub use error::SessionError;
pub use ids::{PageId, SessionToken};
pub use listener::ListenerHandle;
pub use producer::{GenerationLoop, LoopExit};
pub use registry::{Lookup, SessionRegistry};
pub use session::{Session, SessionStatus, View};
