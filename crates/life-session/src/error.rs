//! Error types for session operations.
//!
//! An unknown session token is not an error: the registry answers it by
//! minting a new session. A control command on a session without
//! listeners is not an error either. What remains is a session that has
//! gone away underneath a request.

/// Errors returned by [`Session`](crate::session::Session) operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session was cleared or the registry shut down.
    #[error("session closed")]
    Closed,

    /// The generation producer exited (engine failed past its retry budget).
    #[error("generation producer stopped")]
    ProducerStopped,
}
