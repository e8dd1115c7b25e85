//! Request / response types of the HTTP API.

use arty_core::{ArtifactRecord, ChatHistoryEntry, GenerationRequest, Message};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// One prior turn supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    /// Role label pasted into the prompt as-is (`"user"`, `"assistant"`, ...).
    pub role: String,
    pub content: String,
}

/// Request body for `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// The new user message.
    pub prompt: String,
    /// Model name as listed by `GET /available_models`.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub system_message: Option<String>,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

impl From<GenerateRequest> for GenerationRequest {
    fn from(req: GenerateRequest) -> Self {
        GenerationRequest {
            model: req.model,
            system_message: req.system_message,
            user_message: req.prompt,
            history: req
                .chat_history
                .into_iter()
                .map(|turn| ChatHistoryEntry::new(turn.role, turn.content))
                .collect(),
        }
    }
}

/// Response body for `GET /model_status`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelStatusResponse {
    /// `"loaded"` or `"not_loaded"`.
    pub status: String,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"ok"` while the server answers.
    pub status: String,
    pub version: String,
    /// Same value as `GET /model_status`.
    pub model_status: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Maximum number of most recent messages to return.
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: i64,
    pub role: String,
    pub content: String,
    /// RFC 3339.
    pub timestamp: String,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            role: m.role.to_string(),
            content: m.content,
            timestamp: m.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArtifactResponse {
    pub id: i64,
    pub filename: String,
    pub content: String,
    /// RFC 3339.
    pub timestamp: String,
}

impl From<ArtifactRecord> for ArtifactResponse {
    fn from(a: ArtifactRecord) -> Self {
        Self {
            id: a.id,
            filename: a.filename,
            content: a.content,
            timestamp: a.timestamp.to_rfc3339(),
        }
    }
}

/// Body of every non-streaming error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
