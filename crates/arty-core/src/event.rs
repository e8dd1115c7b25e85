//! Events delivered to the caller of a generation, and their wire form.
//!
//! On the wire every event except [`StreamEvent::Done`] is one JSON object
//! per line:
//!
//! ```text
//! {"token": "...", "full": "..."}
//! {"type": "artifact", "data": {"filename": "...", "content": "..."}, "id": 1}
//! {"error": "..."}
//! ```
//!
//! `Done` has no line of its own; the stream simply closes. A stream that
//! closes after an `error` line, or without any terminal event, is an
//! incomplete response.

use serde::Serialize;

use crate::types::ArtifactRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// One backend chunk and everything generated so far.
    TokenChunk { text: String, cumulative: String },
    /// The completed response contained a fenced block, now persisted.
    ArtifactFound(ArtifactRecord),
    /// The generation failed. Nothing already emitted is retracted.
    Error { message: String },
    /// Generation and persistence both succeeded.
    Done,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireEvent<'a> {
    Token {
        token: &'a str,
        full: &'a str,
    },
    Artifact {
        #[serde(rename = "type")]
        kind: &'static str,
        data: WireArtifact<'a>,
        id: i64,
    },
    Error {
        error: &'a str,
    },
}

#[derive(Serialize)]
struct WireArtifact<'a> {
    filename: &'a str,
    content: &'a str,
}

impl StreamEvent {
    /// Newline-terminated JSON line for this event; `None` for `Done`.
    pub fn to_ndjson(&self) -> Option<String> {
        let wire = match self {
            StreamEvent::TokenChunk { text, cumulative } => WireEvent::Token {
                token: text,
                full: cumulative,
            },
            StreamEvent::ArtifactFound(artifact) => WireEvent::Artifact {
                kind: "artifact",
                data: WireArtifact {
                    filename: &artifact.filename,
                    content: &artifact.content,
                },
                id: artifact.id,
            },
            StreamEvent::Error { message } => WireEvent::Error { error: message },
            StreamEvent::Done => return None,
        };
        // Serializing borrowed strings and integers cannot fail.
        let mut line = serde_json::to_string(&wire).ok()?;
        line.push('\n');
        Some(line)
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use serde_json::{Value, json};

    use super::*;

    fn parse(line: &str) -> Value {
        assert!(line.ends_with('\n'));
        serde_json::from_str(line.trim_end()).unwrap()
    }

    #[test]
    fn token_line() {
        let event = StreamEvent::TokenChunk {
            text: " there".into(),
            cumulative: "Hi there".into(),
        };
        let line = event.to_ndjson().unwrap();
        assert_eq!(parse(&line), json!({"token": " there", "full": "Hi there"}));
    }

    #[test]
    fn artifact_line() {
        let event = StreamEvent::ArtifactFound(ArtifactRecord {
            id: 7,
            filename: "artifact.python".into(),
            content: "print(1)".into(),
            timestamp: Utc::now(),
        });
        let line = event.to_ndjson().unwrap();
        assert_eq!(
            parse(&line),
            json!({
                "type": "artifact",
                "data": {"filename": "artifact.python", "content": "print(1)"},
                "id": 7
            })
        );
    }

    #[test]
    fn error_line() {
        let event = StreamEvent::Error {
            message: "boom".into(),
        };
        assert_eq!(parse(&event.to_ndjson().unwrap()), json!({"error": "boom"}));
    }

    #[test]
    fn done_has_no_line() {
        assert_eq!(StreamEvent::Done.to_ndjson(), None);
    }

    #[test]
    fn multiline_content_stays_on_one_line() {
        let event = StreamEvent::TokenChunk {
            text: "a\nb".into(),
            cumulative: "a\nb".into(),
        };
        let line = event.to_ndjson().unwrap();
        assert_eq!(line.matches('\n').count(), 1);
    }
}
