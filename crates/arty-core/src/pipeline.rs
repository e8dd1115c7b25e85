//! One generation request, end to end.
//!
//! [`GenerationPipeline::run`] selects the backend up front (the only failure
//! reported before streaming), then spawns a task that walks
//! `Formatting -> Streaming -> Finalizing -> Completed`, with `Failed`
//! reachable from the last two. Events reach the caller through a bounded
//! channel, so a slow caller stalls the backend read.
//!
//! The user message is persisted when streaming starts, before the backend is
//! called. After a mid-stream failure the history therefore holds the user
//! message without an assistant reply.
//!
//! Dropping the returned [`EventStream`] cancels the run: the task notices
//! the closed channel, drops the backend's chunk receiver and skips any
//! remaining persistence.

use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::artifact::{Artifact, extract_artifact};
use crate::backend::{Backend, GenerationParams, ModelRegistry, StreamChunk};
use crate::error::GenerationError;
use crate::event::StreamEvent;
use crate::prompt::format_prompt;
use crate::store::HistoryStore;
use crate::types::{ArtifactRecord, ChatHistoryEntry, Role};

/// Capacity of the event channel between the pipeline task and the caller.
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

const PROMPT_PREVIEW_CHARS: usize = 100;

const MAX_ARTIFACT_NAME_ATTEMPTS: u32 = 1000;

/// Events of one run, in production order.
pub type EventStream = ReceiverStream<StreamEvent>;

/// Input of a single generation.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub model: String,
    pub system_message: Option<String>,
    pub user_message: String,
    pub history: Vec<ChatHistoryEntry>,
}

/// Shared, immutable configuration for every run.
pub struct GenerationPipeline<S> {
    registry: Arc<ModelRegistry>,
    store: Arc<S>,
    params: GenerationParams,
    artifacts_dir: Option<PathBuf>,
}

impl<S> std::fmt::Debug for GenerationPipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationPipeline")
            .field("registry", &self.registry)
            .field("params", &self.params)
            .field("artifacts_dir", &self.artifacts_dir)
            .finish_non_exhaustive()
    }
}

impl<S: HistoryStore> GenerationPipeline<S> {
    pub fn new(registry: Arc<ModelRegistry>, store: Arc<S>) -> Self {
        Self {
            registry,
            store,
            params: GenerationParams::default(),
            artifacts_dir: None,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Also write every persisted artifact to `dir`.
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a generation and return its event stream.
    ///
    /// Fails only when the model cannot be resolved; every later failure is
    /// delivered as [`StreamEvent::Error`].
    pub async fn run(&self, request: GenerationRequest) -> Result<EventStream, GenerationError> {
        let backend = self.registry.select(&request.model).await?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let span = info_span!("generation", model = %request.model);
        let run = Run {
            backend,
            store: Arc::clone(&self.store),
            params: self.params.clone(),
            artifacts_dir: self.artifacts_dir.clone(),
            request,
            tx,
        };
        tokio::spawn(run.drive().instrument(span));

        Ok(ReceiverStream::new(rx))
    }
}

enum Stage {
    Formatting,
    Streaming { prompt: String },
    Finalizing { response: String },
    Completed,
    Failed,
}

struct Run<S> {
    backend: Backend,
    store: Arc<S>,
    params: GenerationParams,
    artifacts_dir: Option<PathBuf>,
    request: GenerationRequest,
    tx: mpsc::Sender<StreamEvent>,
}

impl<S: HistoryStore> Run<S> {
    async fn drive(self) {
        let mut stage = Stage::Formatting;
        loop {
            stage = match stage {
                Stage::Formatting => self.format(),
                Stage::Streaming { prompt } => self.stream(&prompt).await,
                Stage::Finalizing { response } => self.finalize(response).await,
                Stage::Completed | Stage::Failed => break,
            };
        }
    }

    fn format(&self) -> Stage {
        let prompt = format_prompt(
            self.request.system_message.as_deref(),
            &self.request.user_message,
            &self.request.history,
        );
        debug!(
            prompt_len = prompt.len(),
            history = self.request.history.len(),
            preview = %preview(&prompt),
            "formatted prompt"
        );
        Stage::Streaming { prompt }
    }

    async fn stream(&self, prompt: &str) -> Stage {
        if let Err(e) = self
            .store
            .append_message(Role::User, &self.request.user_message)
            .await
        {
            return self.fail(e.into()).await;
        }

        let mut chunks = match self
            .backend
            .stream_generate(&self.request.model, prompt, &self.params)
            .await
        {
            Ok(rx) => rx,
            Err(e) => return self.fail(e).await,
        };

        let mut accumulated = String::new();
        let mut received = 0usize;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.tx.closed() => return self.abandon("streaming"),
                chunk = chunks.recv() => chunk,
            };

            match chunk {
                Some(StreamChunk::Token(text)) => {
                    accumulated.push_str(&text);
                    received += 1;
                    let event = StreamEvent::TokenChunk {
                        text,
                        cumulative: accumulated.clone(),
                    };
                    if !self.emit(event).await {
                        return self.abandon("streaming");
                    }
                }
                Some(StreamChunk::Done) => {
                    debug!(chunks = received, response_len = accumulated.len(), "backend finished");
                    return Stage::Finalizing {
                        response: accumulated,
                    };
                }
                Some(StreamChunk::Error(e)) => return self.fail(e).await,
                None => {
                    return self
                        .fail(GenerationError::Transport(
                            "backend stream closed without a final marker".into(),
                        ))
                        .await;
                }
            }
        }
    }

    async fn finalize(&self, response: String) -> Stage {
        if self.tx.is_closed() {
            return self.abandon("finalizing");
        }

        if let Some(artifact) = extract_artifact(&response) {
            let record = match self.persist_artifact(&artifact).await {
                Ok(Some(record)) => record,
                Ok(None) => return self.abandon("finalizing"),
                Err(e) => return self.fail(e).await,
            };
            info!(artifact_id = record.id, filename = %record.filename, "artifact stored");
            if !self.emit(StreamEvent::ArtifactFound(record)).await {
                return self.abandon("finalizing");
            }
        }

        match self
            .unless_closed(self.store.append_message(Role::Assistant, &response))
            .await
        {
            Some(Ok(_)) => {}
            Some(Err(e)) => return self.fail(e.into()).await,
            None => return self.abandon("finalizing"),
        }

        info!(response_len = response.len(), "generation completed");
        if !self.emit(StreamEvent::Done).await {
            debug!("caller left before the done event");
        }
        Stage::Completed
    }

    /// Write the artifact file (if configured) and its row. `None` when the
    /// caller left before both were done.
    async fn persist_artifact(
        &self,
        artifact: &Artifact,
    ) -> Result<Option<ArtifactRecord>, GenerationError> {
        let timestamp = Utc::now();
        let filename = match &self.artifacts_dir {
            Some(dir) => {
                if self.tx.is_closed() {
                    return Ok(None);
                }
                write_artifact_file(dir, artifact, timestamp).await?
            }
            None => artifact.timestamped_filename(timestamp),
        };

        let id = match self
            .unless_closed(self.store.append_artifact(&filename, &artifact.content))
            .await
        {
            Some(id) => id?,
            None => return Ok(None),
        };
        Ok(Some(ArtifactRecord {
            id,
            filename,
            content: artifact.content.clone(),
            timestamp,
        }))
    }

    /// Drive `fut` unless the caller drops its end first, in which case
    /// `fut` is dropped unfinished.
    async fn unless_closed<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.tx.closed() => None,
            out = fut => Some(out),
        }
    }

    /// `false` once the caller has dropped its end.
    async fn emit(&self, event: StreamEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    async fn fail(&self, error: GenerationError) -> Stage {
        warn!(error = %error, "generation failed");
        let _ = self
            .tx
            .send(StreamEvent::Error {
                message: error.to_string(),
            })
            .await;
        Stage::Failed
    }

    fn abandon(&self, stage: &'static str) -> Stage {
        info!(stage, "caller disconnected; abandoning generation");
        Stage::Failed
    }
}

/// Create `<dir>/<name>` without touching existing files, numbering the name
/// when another artifact already took it within the same second. Returns the
/// name actually used.
async fn write_artifact_file(
    dir: &Path,
    artifact: &Artifact,
    at: DateTime<Utc>,
) -> Result<String, GenerationError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| GenerationError::ArtifactWrite {
            path: dir.to_path_buf(),
            source,
        })?;

    for n in 0..MAX_ARTIFACT_NAME_ATTEMPTS {
        let filename = artifact.numbered_filename(at, n);
        let path = dir.join(&filename);
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(GenerationError::ArtifactWrite { path, source }),
        };
        let written = match file.write_all(artifact.content.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        return match written {
            Ok(()) => Ok(filename),
            Err(source) => Err(GenerationError::ArtifactWrite { path, source }),
        };
    }

    Err(GenerationError::ArtifactWrite {
        path: dir.join(artifact.timestamped_filename(at)),
        source: io::Error::new(
            ErrorKind::AlreadyExists,
            "every numbered artifact name for this second is taken",
        ),
    })
}

fn preview(prompt: &str) -> &str {
    match prompt.char_indices().nth(PROMPT_PREVIEW_CHARS) {
        Some((end, _)) => &prompt[..end],
        None => prompt,
    }
}
