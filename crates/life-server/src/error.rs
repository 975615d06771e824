//! Error types for the viewer API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use life_session::SessionError;

/// Errors that can occur in the viewer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request carried no session token, or one the registry does
    /// not know.
    #[error("session not found")]
    SessionNotFound,

    /// An invalid query parameter or body was provided.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The session failed the operation.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(SessionError::Closed) => StatusCode::GONE,
            Self::Session(SessionError::ProducerStopped) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn stopped_producer_is_service_unavailable() {
        let response = ApiError::from(SessionError::ProducerStopped).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["status"], 503);
    }

    #[tokio::test]
    async fn closed_session_is_gone() {
        let response = ApiError::from(SessionError::Closed).into_response();
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn invalid_request_carries_its_reason() {
        let response = ApiError::InvalidRequest(String::from("page_id missing")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid request: page_id missing");
    }
}
