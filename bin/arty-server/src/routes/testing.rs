//! Router fixtures shared by the route tests.

use std::sync::Arc;

use arty_core::{
    GenerationError, GenerationParams, GenerationPipeline, LocalBackend, ModelRegistry,
    SqliteHistoryStore, TokenEngine,
};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::config::Config;
use crate::state::AppState;

pub const MODEL: &str = "scripted.gguf";

/// Replays a fixed list of chunks.
pub struct ScriptedEngine(pub Vec<&'static str>);

impl TokenEngine for ScriptedEngine {
    fn generate(
        &self,
        _prompt: &str,
        _params: &GenerationParams,
        sink: &mut dyn FnMut(&str) -> bool,
    ) -> Result<(), GenerationError> {
        for chunk in &self.0 {
            if !sink(chunk) {
                break;
            }
        }
        Ok(())
    }
}

pub async fn state_with(registry: ModelRegistry) -> Arc<AppState> {
    let store = SqliteHistoryStore::connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    Arc::new(AppState {
        config: Arc::new(Config::default()),
        pipeline: Arc::new(GenerationPipeline::new(Arc::new(registry), Arc::new(store))),
    })
}

pub async fn scripted_state(chunks: Vec<&'static str>) -> Arc<AppState> {
    state_with(ModelRegistry::new().with_local(MODEL, LocalBackend::new(ScriptedEngine(chunks)))).await
}

pub async fn send(state: Arc<AppState>, request: Request<Body>) -> Response<Body> {
    let app: Router = super::build(state);
    app.oneshot(request).await.expect("infallible router")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("readable body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("valid request")
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}
