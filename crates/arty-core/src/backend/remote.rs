//! Ollama-compatible HTTP inference.
//!
//! `POST {base}/api/generate` streams newline-delimited JSON objects of the
//! form `{"response": "...", "done": false}` and finishes with `done: true`.
//! A line carrying `{"error": "..."}` aborts the generation.
//! `GET {base}/api/tags` lists the models the server can run.

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{CHUNK_CHANNEL_CAPACITY, ChunkReceiver, GenerationParams, StreamChunk};
use crate::error::GenerationError;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    /// The prompt already carries the role markup; skip server-side templating.
    raw: bool,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    num_predict: u32,
    temperature: f32,
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Decoded content of one response line.
#[derive(Debug, PartialEq)]
struct LineChunk {
    text: String,
    done: bool,
}

/// Client for one remote inference server.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models the remote server currently offers.
    pub async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Transport(format!(
                "model list request failed with status {status}"
            )));
        }
        let tags: TagList = response
            .json()
            .await
            .map_err(|e| GenerationError::Protocol(format!("invalid model list: {e}")))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Open a streaming generation.
    ///
    /// Connection failures and non-success statuses are returned directly;
    /// anything that goes wrong while reading the body arrives as
    /// [`StreamChunk::Error`].
    pub async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ChunkReceiver, GenerationError> {
        let body = GenerateRequest {
            model,
            prompt,
            raw: true,
            stream: true,
            options: GenerateOptions {
                num_predict: params.max_tokens,
                temperature: params.temperature,
                stop: &params.stop,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_owned());
            return Err(GenerationError::Transport(format!(
                "generate request failed with status {status}: {detail}"
            )));
        }

        let (tx, rx) = mpsc::channel::<StreamChunk>(CHUNK_CHANNEL_CAPACITY);
        tokio::spawn(relay_body(response.bytes_stream(), tx));

        Ok(rx)
    }
}

/// Split a streamed response body into lines and forward their chunks.
///
/// Lines may span body chunks; a final line without a trailing newline still
/// counts. Ends when a terminal chunk was sent, the body fails or ends early
/// (both reported as [`StreamChunk::Error`]), or the receiver is dropped.
async fn relay_body<S, E>(body: S, tx: mpsc::Sender<StreamChunk>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<GenerationError> + std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut buffer = BytesMut::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!("remote generation receiver dropped; closing response");
                return;
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(bytes)) => {
                buffer.extend_from_slice(&bytes);
                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line = buffer.split_to(pos);
                    buffer.advance(1);
                    if let Forwarded::Finished = forward_line(&tx, &line).await {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "remote generation stream failed");
                let _ = tx.send(StreamChunk::Error(e.into())).await;
                return;
            }
            None => {
                if let Forwarded::Finished = forward_line(&tx, &buffer).await {
                    return;
                }
                let _ = tx
                    .send(StreamChunk::Error(GenerationError::Transport(
                        "response ended before generation completed".into(),
                    )))
                    .await;
                return;
            }
        }
    }
}

enum Forwarded {
    Continue,
    Finished,
}

/// Decode one line and push the resulting chunks. `Finished` means the
/// stream reached a terminal chunk or the receiver is gone.
async fn forward_line(tx: &mpsc::Sender<StreamChunk>, line: &[u8]) -> Forwarded {
    match decode_line(line) {
        Ok(None) => Forwarded::Continue,
        Ok(Some(chunk)) => {
            if !chunk.text.is_empty() && tx.send(StreamChunk::Token(chunk.text)).await.is_err() {
                return Forwarded::Finished;
            }
            if chunk.done {
                let _ = tx.send(StreamChunk::Done).await;
                return Forwarded::Finished;
            }
            Forwarded::Continue
        }
        Err(e) => {
            let _ = tx.send(StreamChunk::Error(e)).await;
            Forwarded::Finished
        }
    }
}

/// Parse one NDJSON line. Blank lines yield `None`.
fn decode_line(line: &[u8]) -> Result<Option<LineChunk>, GenerationError> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }
    let parsed: GenerateLine = serde_json::from_slice(line).map_err(|e| {
        GenerationError::Protocol(format!(
            "malformed chunk {:?}: {e}",
            String::from_utf8_lossy(line)
        ))
    })?;
    if let Some(message) = parsed.error {
        return Err(GenerationError::Transport(message));
    }
    Ok(Some(LineChunk {
        text: parsed.response,
        done: parsed.done,
    }))
}
