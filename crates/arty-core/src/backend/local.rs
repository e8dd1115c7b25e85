//! In-process inference behind the [`TokenEngine`] trait.
//!
//! Engines are synchronous and may hold the CPU for the whole generation, so
//! each call runs on tokio's blocking pool and hands tokens back through the
//! chunk channel with `blocking_send`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::{CHUNK_CHANNEL_CAPACITY, ChunkReceiver, GenerationParams, StreamChunk};
use crate::error::GenerationError;

/// A loaded model that can generate text synchronously.
pub trait TokenEngine: Send + Sync + 'static {
    /// Generate a continuation of `prompt`, passing each piece to `sink` as
    /// soon as it is decoded.
    ///
    /// `sink` returns `false` once nobody is listening any more; the engine
    /// must stop generating and return `Ok(())` at that point.
    fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
        sink: &mut dyn FnMut(&str) -> bool,
    ) -> Result<(), GenerationError>;
}

/// Runs a [`TokenEngine`] for one request at a time per call.
#[derive(Clone)]
pub struct LocalBackend {
    engine: Arc<dyn TokenEngine>,
}

impl LocalBackend {
    pub fn new(engine: impl TokenEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn from_arc(engine: Arc<dyn TokenEngine>) -> Self {
        Self { engine }
    }

    pub fn stream_generate(&self, prompt: &str, params: &GenerationParams) -> ChunkReceiver {
        let (tx, rx) = mpsc::channel::<StreamChunk>(CHUNK_CHANNEL_CAPACITY);
        let engine = Arc::clone(&self.engine);
        let prompt = prompt.to_owned();
        let params = params.clone();

        tokio::task::spawn_blocking(move || {
            let mut delivered = 0usize;
            let mut sink = |piece: &str| {
                let ok = tx.blocking_send(StreamChunk::Token(piece.to_owned())).is_ok();
                if ok {
                    delivered += 1;
                }
                ok
            };
            let outcome = engine.generate(&prompt, &params, &mut sink);

            let last = match outcome {
                Ok(()) => StreamChunk::Done,
                Err(e) => StreamChunk::Error(e),
            };
            if tx.blocking_send(last).is_err() {
                debug!(delivered, "local generation receiver dropped");
            }
        });

        rx
    }
}
