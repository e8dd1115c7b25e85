//! Streaming generation (`POST /generate`).
//!
//! The response body is `application/x-ndjson`: one JSON object per
//! [`StreamEvent`](arty_core::StreamEvent) except `Done`, which is signalled
//! by the end of the body. When the client disconnects, axum drops the body
//! stream and with it the event receiver, which cancels the generation.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tokio_stream::StreamExt;
use tracing::debug;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::{ChatTurn, ErrorResponse, GenerateRequest};
use crate::state::AppState;

const NDJSON: &str = "application/x-ndjson";

#[derive(OpenApi)]
#[openapi(
    paths(generate),
    components(schemas(GenerateRequest, ChatTurn, ErrorResponse))
)]
pub struct GenerateApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/generate", post(generate))
}

/// Stream a completion for `prompt`.
#[utoipa::path(
    post,
    path = "/generate",
    tag = "generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "NDJSON event stream", content_type = "application/x-ndjson", body = String),
        (status = 400, description = "Empty prompt or unknown model", body = ErrorResponse),
        (status = 502, description = "Inference backend unreachable", body = ErrorResponse),
    )
)]
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Response, ServerError> {
    if req.prompt.trim().is_empty() {
        return Err(ServerError::BadRequest("prompt must not be empty".into()));
    }

    debug!(
        model = %req.model,
        prompt_len = req.prompt.len(),
        history = req.chat_history.len(),
        "generate request"
    );

    let events = state.pipeline.run(req.into()).await?;
    let lines = events.filter_map(|event| event.to_ndjson().map(Ok::<_, Infallible>));

    Ok(([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(lines)).into_response())
}
