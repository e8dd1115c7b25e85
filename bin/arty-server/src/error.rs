//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON `{"error": ...}`
//! body with an appropriate status code.
//!
//! Internal errors (store, backend transport) are logged with full detail but
//! only a generic message is returned to the caller.

use arty_core::{GenerationError, StoreError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Raised before the stream opened: model selection or backend lookup.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Propagated from the history store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Generation(GenerationError::Selection { model }) => {
                tracing::debug!(%model, "rejected unknown model");
                (
                    StatusCode::BAD_REQUEST,
                    "Selected model not available".to_owned(),
                )
            }
            ServerError::Generation(
                e @ (GenerationError::Transport(_) | GenerationError::Protocol(_)),
            ) => {
                error!(error = %e, "inference backend error");
                (
                    StatusCode::BAD_GATEWAY,
                    "inference backend unavailable".to_owned(),
                )
            }
            ServerError::Generation(e) => {
                error!(error = %e, "generation error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Store(e) => {
                error!(error = %e, "history store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}
