//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID span)
//! - `POST /generate` streaming endpoint
//! - Model listing / status, history listing, health
//! - OpenAPI document at `/api-docs/openapi.json`

pub mod doc;
mod generate;
mod health;
mod history;
mod models;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router, middleware};
use tower::ServiceBuilder;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(generate::router())
        .merge(models::router())
        .merge(history::router())
        .route("/api-docs/openapi.json", get(|| async { Json(doc::get_docs()) }))
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(&state.config)))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
