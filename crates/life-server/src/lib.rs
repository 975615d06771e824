//! Viewer API server for Sparse Life sessions.
//!
//! This crate maps the session core's logical operations onto an Axum
//! HTTP server:
//!
//! - **`POST /api/view`** gets or creates the caller's session and opens a
//!   new view on it
//! - **`GET /api/frame`** returns the next frame for a view
//! - **`POST /api/control`** applies a control command
//! - **`GET /api/updates`** long-polls for the next control notification;
//!   **`DELETE /api/updates`** withdraws a pending one
//! - **`GET /api/status`** and **`GET /api/health`** report state
//!
//! # Architecture
//!
//! All handlers share an [`AppState`] holding the [`SessionRegistry`].
//! The session token travels in the `x-life-session` header; the core
//! never sees how. Rendering frames (PNG, canvas) is the client's job:
//! frames leave the server as JSON coordinate lists.
//!
//! [`SessionRegistry`]: life_session::SessionRegistry

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use router::{build_router, SESSION_HEADER};
pub use server::{start_server, ServerConfig, ServerError};
pub use state::AppState;
