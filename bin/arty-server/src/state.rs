//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use arty_core::{GenerationPipeline, SqliteHistoryStore};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Model registry, history store and generation parameters.
    pub pipeline: Arc<GenerationPipeline<SqliteHistoryStore>>,
}
