//! Conversation data shared by the formatter, the store and the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Author of a persisted [`Message`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message row in the `messages` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One caller-supplied turn of prior conversation.
///
/// The role is kept verbatim: it is pasted into the prompt markup as-is and
/// never validated against [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub role: String,
    pub content: String,
}

impl ChatHistoryEntry {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A single row in the `artifacts` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRecord {
    pub id: i64,
    pub filename: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
