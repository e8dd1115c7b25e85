//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes::models::load_status;
use crate::schemas::HealthResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthResponse)))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Answers 200 whenever the server is up. A server with no model source
/// configured is still healthy; `model_status` tells the caller whether
/// `POST /generate` can succeed.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        model_status: load_status(state.pipeline.registry()).to_owned(),
    })
}
