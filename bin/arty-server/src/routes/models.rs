//! Model listing and status.

use std::sync::Arc;

use arty_core::ModelRegistry;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::{ErrorResponse, ModelStatusResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(available_models, model_status),
    components(schemas(ModelStatusResponse))
)]
pub struct ModelsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/available_models", get(available_models))
        .route("/model_status", get(model_status))
}

/// Names accepted by `POST /generate`.
#[utoipa::path(
    get,
    path = "/available_models",
    tag = "models",
    responses(
        (status = 200, description = "Model names", body = Vec<String>),
        (status = 502, description = "Remote backend unreachable", body = ErrorResponse),
    )
)]
pub async fn available_models(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ServerError> {
    Ok(Json(state.pipeline.registry().list_models().await?))
}

/// Whether any model source is configured.
#[utoipa::path(
    get,
    path = "/model_status",
    tag = "models",
    responses(
        (status = 200, description = "Load status", body = ModelStatusResponse),
    )
)]
pub async fn model_status(State(state): State<Arc<AppState>>) -> Json<ModelStatusResponse> {
    Json(ModelStatusResponse {
        status: load_status(state.pipeline.registry()).to_owned(),
    })
}

/// `"loaded"` once any local engine or remote backend is registered.
pub(crate) fn load_status(registry: &ModelRegistry) -> &'static str {
    if registry.is_loaded() {
        "loaded"
    } else {
        "not_loaded"
    }
}

#[cfg(test)]
mod test {
    use arty_core::RemoteBackend;
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use super::*;
    use crate::routes::testing::{MODEL, body_text, get, scripted_state, send, state_with};

    #[tokio::test]
    async fn lists_local_models() {
        let response = send(scripted_state(vec![]).await, get("/available_models")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body, json!([MODEL]));
    }

    #[tokio::test]
    async fn status_reflects_registry() {
        let loaded = send(scripted_state(vec![]).await, get("/model_status")).await;
        let body: Value = serde_json::from_str(&body_text(loaded).await).unwrap();
        assert_eq!(body, json!({"status": "loaded"}));

        let empty = send(state_with(ModelRegistry::new()).await, get("/model_status")).await;
        let body: Value = serde_json::from_str(&body_text(empty).await).unwrap();
        assert_eq!(body, json!({"status": "not_loaded"}));
    }

    #[tokio::test]
    async fn unreachable_remote_is_bad_gateway() {
        // Port 9 (discard) is not expected to run an HTTP server.
        let registry = ModelRegistry::new().with_remote(RemoteBackend::new("http://127.0.0.1:9"));
        let response = send(state_with(registry).await, get("/available_models")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
