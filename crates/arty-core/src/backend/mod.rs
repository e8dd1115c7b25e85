//! Token-producing backends.
//!
//! A backend turns a prompt into a [`ChunkReceiver`]: a bounded channel of
//! [`StreamChunk`] items terminated by [`StreamChunk::Done`] or
//! [`StreamChunk::Error`]. Dropping the receiver is the cancellation signal;
//! producers stop as soon as their next send fails.
//!
//! Two variants exist, chosen by configuration through the
//! [`ModelRegistry`]:
//! - [`LocalBackend`]: an in-process [`TokenEngine`] on the blocking pool.
//! - [`RemoteBackend`]: an Ollama-compatible HTTP inference server.

pub mod local;
pub mod registry;
pub mod remote;

pub use local::{LocalBackend, TokenEngine};
pub use registry::ModelRegistry;
pub use remote::RemoteBackend;

use tokio::sync::mpsc;

use crate::error::GenerationError;
use crate::prompt;

/// Capacity of the chunk channel between a backend producer and the pipeline.
pub(crate) const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// A single chunk emitted by a streaming backend.
#[derive(Debug)]
pub enum StreamChunk {
    /// A piece of generated output.
    Token(String),
    /// Generation completed normally.
    Done,
    /// Generation terminated due to a backend error.
    Error(GenerationError),
}

/// Receiving end of a streaming generation.
pub type ChunkReceiver = mpsc::Receiver<StreamChunk>;

/// Sampling parameters passed through to the backend untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 8192,
            temperature: 0.8,
            stop: prompt::default_stop_sequences(),
        }
    }
}

/// One backend capability, two transports.
#[derive(Clone)]
pub enum Backend {
    Local(LocalBackend),
    Remote(RemoteBackend),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Local(_) => f.write_str("Backend::Local"),
            Backend::Remote(remote) => write!(f, "Backend::Remote({})", remote.base_url()),
        }
    }
}

impl Backend {
    /// Start generating `prompt` with `model`.
    ///
    /// Errors returned here happen before any chunk was produced; errors
    /// after that arrive as [`StreamChunk::Error`].
    pub async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ChunkReceiver, GenerationError> {
        match self {
            Backend::Local(local) => Ok(local.stream_generate(prompt, params)),
            Backend::Remote(remote) => remote.stream_generate(model, prompt, params).await,
        }
    }
}
