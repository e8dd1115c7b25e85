//! Read access to the persisted history.

use std::sync::Arc;

use arty_core::HistoryStore;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::{ArtifactResponse, HistoryQuery, MessageResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_messages, list_artifacts),
    components(schemas(MessageResponse, ArtifactResponse))
)]
pub struct HistoryApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/history/messages", get(list_messages))
        .route("/history/artifacts", get(list_artifacts))
}

/// Most recent messages, oldest first.
#[utoipa::path(
    get,
    path = "/history/messages",
    tag = "history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Messages", body = Vec<MessageResponse>),
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    let limit = query.limit.unwrap_or(state.config.history_limit);
    let messages = state.pipeline.store().list_messages(limit).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// Every artifact, newest first.
#[utoipa::path(
    get,
    path = "/history/artifacts",
    tag = "history",
    responses(
        (status = 200, description = "Artifacts", body = Vec<ArtifactResponse>),
    )
)]
pub async fn list_artifacts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ArtifactResponse>>, ServerError> {
    let artifacts = state.pipeline.store().list_artifacts().await?;
    Ok(Json(artifacts.into_iter().map(Into::into).collect()))
}
