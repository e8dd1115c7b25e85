//! Streaming chat generation with artifact extraction and durable history.
//!
//! A [`GenerationPipeline`] formats the conversation into a single prompt,
//! streams the selected [`Backend`]'s output to the caller as
//! [`StreamEvent`]s, pulls the first fenced code block out of the finished
//! response and records the exchange in a [`HistoryStore`].

pub mod artifact;
pub mod backend;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod prompt;
pub mod store;
pub mod types;

pub use artifact::{Artifact, extract_artifact};
pub use backend::{
    Backend, GenerationParams, LocalBackend, ModelRegistry, RemoteBackend, StreamChunk, TokenEngine,
};
pub use error::{GenerationError, StoreError};
pub use event::StreamEvent;
pub use pipeline::{EventStream, GenerationPipeline, GenerationRequest};
pub use prompt::format_prompt;
pub use store::{HistoryStore, MemoryHistoryStore, SqliteHistoryStore};
pub use types::{ArtifactRecord, ChatHistoryEntry, Message, Role};
