//! Linear prompt assembly using the Llama-3 role-header markup.
//!
//! Message content is pasted in unescaped. A message that itself contains the
//! header markers can confuse the backend's role parsing; that is a known
//! limitation of the fixed format.

use crate::types::ChatHistoryEntry;

/// Opens a role header.
pub const HEADER_START: &str = "<|start_header_id|>";
/// Closes a role header; the segment body follows directly.
pub const HEADER_END: &str = "<|end_header_id|>";
/// Closes a segment body.
pub const END_OF_TURN: &str = "<|eot_id|>";

/// Stop sequences that keep the backend from generating the next turn itself.
pub fn default_stop_sequences() -> Vec<String> {
    vec![
        HEADER_START.to_owned(),
        HEADER_END.to_owned(),
        END_OF_TURN.to_owned(),
    ]
}

/// Build the prompt sent to the backend.
///
/// Order: optional system segment, one segment per history entry, the user
/// segment, then an unterminated assistant header that the backend continues
/// from. An empty (or absent) system message emits no system segment.
pub fn format_prompt(
    system_message: Option<&str>,
    user_message: &str,
    history: &[ChatHistoryEntry],
) -> String {
    let mut prompt = String::new();

    if let Some(system) = system_message.filter(|s| !s.is_empty()) {
        push_segment(&mut prompt, "system", system);
    }
    for entry in history {
        push_segment(&mut prompt, &entry.role, &entry.content);
    }
    push_segment(&mut prompt, "user", user_message);

    prompt.push_str(HEADER_START);
    prompt.push_str("assistant");
    prompt.push_str(HEADER_END);
    prompt
}

fn push_segment(prompt: &mut String, role: &str, content: &str) {
    prompt.push_str(HEADER_START);
    prompt.push_str(role);
    prompt.push_str(HEADER_END);
    prompt.push_str(content);
    prompt.push_str(END_OF_TURN);
}

#[cfg(test)]
mod test {
    use super::*;

    const ASSISTANT_OPEN: &str = "<|start_header_id|>assistant<|end_header_id|>";

    #[test]
    fn empty_history_and_system_collapse_to_user_and_assistant() {
        let prompt = format_prompt(Some(""), "Say hi", &[]);
        assert_eq!(
            prompt,
            format!("<|start_header_id|>user<|end_header_id|>Say hi<|eot_id|>{ASSISTANT_OPEN}")
        );
        assert_eq!(prompt, format_prompt(None, "Say hi", &[]));
    }

    #[test]
    fn system_segment_comes_first() {
        let prompt = format_prompt(Some("Be brief."), "Hello", &[]);
        assert!(prompt.starts_with("<|start_header_id|>system<|end_header_id|>Be brief.<|eot_id|>"));
        assert!(prompt.ends_with(ASSISTANT_OPEN));
    }

    #[test]
    fn history_entries_appear_once_in_order_between_markers() {
        let history = vec![
            ChatHistoryEntry::new("user", "first question"),
            ChatHistoryEntry::new("assistant", "first answer"),
            ChatHistoryEntry::new("user", "second question"),
        ];
        let prompt = format_prompt(None, "third question", &history);

        let mut cursor = 0;
        for entry in &history {
            let segment = format!(
                "{HEADER_START}{}{HEADER_END}{}{END_OF_TURN}",
                entry.role, entry.content
            );
            assert_eq!(prompt.matches(&entry.content).count(), 1);
            let at = prompt[cursor..]
                .find(&segment)
                .expect("segment present after the previous one");
            cursor += at + segment.len();
        }
        assert!(prompt[cursor..].starts_with("<|start_header_id|>user<|end_header_id|>third question"));
    }

    #[test]
    fn history_role_is_taken_verbatim() {
        let history = vec![ChatHistoryEntry::new("tool", "42")];
        let prompt = format_prompt(None, "ok", &history);
        assert!(prompt.starts_with("<|start_header_id|>tool<|end_header_id|>42<|eot_id|>"));
    }

    #[test]
    fn assistant_marker_is_left_open() {
        let prompt = format_prompt(None, "x", &[]);
        assert_eq!(prompt.matches(END_OF_TURN).count(), 1);
        assert!(!prompt.ends_with(END_OF_TURN));
    }
}
