//! REST and long-poll endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/view` | Get or create the session, open a view |
//! | `GET` | `/api/frame?page_id=N` | Next frame for a view |
//! | `POST` | `/api/control` | Apply a control command |
//! | `GET` | `/api/updates?page_id=N` | Long-poll for one notification |
//! | `DELETE` | `/api/updates?page_id=N` | Withdraw a pending long-poll |
//! | `GET` | `/api/status` | Session summary |
//! | `GET` | `/api/health` | Liveness and session count |
//!
//! Every endpoint except `view` and `health` requires a known session in
//! the `x-life-session` header and answers 404 otherwise; only `view`
//! ever mints a session.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use life_session::{ControlCommand, PageId, Session, SessionToken};
use tracing::debug;

use crate::error::ApiError;
use crate::router::SESSION_HEADER;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters identifying a view.
///
/// Taken as raw text and parsed in the handler so a missing or
/// malformed value gets the JSON error body rather than a plain-text
/// extractor rejection.
#[derive(Debug, serde::Deserialize)]
pub struct PageQuery {
    /// The page id handed out by `POST /api/view`.
    pub page_id: Option<String>,
}

/// Request body for `POST /api/control`.
#[derive(Debug, serde::Deserialize)]
pub struct ControlRequest {
    /// The command to apply.
    pub command: ControlCommand,
}

/// Response body for `POST /api/view`.
#[derive(Debug, serde::Serialize)]
struct ViewResponse {
    session: SessionToken,
    created: bool,
    page_id: PageId,
    delay_ms: f64,
    paused: bool,
    token_max_age_secs: u64,
}

fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(SessionToken::parse)
}

/// Parse the `page_id` query parameter.
fn parse_page_id(query: &PageQuery) -> Result<PageId, ApiError> {
    let raw = query
        .page_id
        .as_deref()
        .ok_or_else(|| ApiError::InvalidRequest(String::from("missing page_id")))?;
    raw.trim()
        .parse::<u64>()
        .map(PageId)
        .map_err(|e| ApiError::InvalidRequest(format!("invalid page_id '{raw}': {e}")))
}

fn require_session(state: &AppState, headers: &HeaderMap) -> Result<Arc<Session>, ApiError> {
    session_token(headers)
        .and_then(|token| state.registry.get(&token))
        .ok_or(ApiError::SessionNotFound)
}

// ---------------------------------------------------------------------------
// POST /api/view
// ---------------------------------------------------------------------------

/// Get or create the caller's session and open a view on it.
///
/// Pending long-polls on the session are told to refresh. The session
/// token is echoed in the `x-life-session` response header.
pub async fn open_view(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let presented = session_token(&headers);
    let lookup = state.registry.get_or_create(presented.as_ref());
    let view = lookup.session.open_view();

    let header = HeaderValue::from_str(&lookup.token.to_string())
        .map_err(|e| ApiError::InvalidRequest(format!("unencodable token: {e}")))?;

    let body = ViewResponse {
        session: lookup.token,
        created: lookup.created,
        page_id: view.page_id,
        delay_ms: view.event.delay_ms,
        paused: view.event.paused,
        token_max_age_secs: state.registry.session_config().token_max_age_secs,
    };

    let mut response = Json(body).into_response();
    response.headers_mut().insert(SESSION_HEADER, header);
    Ok(response)
}

// ---------------------------------------------------------------------------
// GET /api/frame
// ---------------------------------------------------------------------------

/// Return the next frame for a view as JSON.
pub async fn next_frame(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let session = require_session(&state, &headers)?;
    let page_id = parse_page_id(&query)?;
    let frame = session.next_frame(page_id).await?;
    Ok(Json(frame.as_ref()).into_response())
}

// ---------------------------------------------------------------------------
// POST /api/control
// ---------------------------------------------------------------------------

/// Apply a control command and fan it out to the session's listeners.
pub async fn control(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ControlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_session(&state, &headers)?;
    let outcome = state.registry.apply_control(&session, body.command).await;
    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// GET /api/updates
// ---------------------------------------------------------------------------

/// Long-poll for the next notification of a view.
///
/// Resolves once per registration. If the client disconnects first, Axum
/// drops this future and with it the listener slot.
pub async fn updates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_session(&state, &headers)?;
    let page_id = parse_page_id(&query)?;
    let listener = session.add_listener(page_id);
    // Release the session so a cleared session is not kept alive by its waiters.
    drop(session);
    debug!(%page_id, "Long-poll registered");
    let notification = listener.await;
    debug!(%page_id, ?notification, "Long-poll resolved");
    Ok(Json(notification))
}

// ---------------------------------------------------------------------------
// DELETE /api/updates
// ---------------------------------------------------------------------------

/// Withdraw a pending long-poll. Idempotent.
pub async fn remove_listener(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<StatusCode, ApiError> {
    let session = require_session(&state, &headers)?;
    session.remove_listener(parse_page_id(&query)?);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Return a summary of the caller's session.
pub async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_session(&state, &headers)?;
    Ok(Json(session.status()))
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Liveness check with the number of live sessions.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "ok": true,
        "sessions": state.registry.len(),
    }))
}
