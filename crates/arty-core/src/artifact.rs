//! Fenced-block detection in completed responses.
//!
//! Only the first fenced block of a response becomes an artifact. Any later
//! blocks stay in the assistant message but are not extracted.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Opening fence with an optional language tag, a lazily matched body, and a
/// closing fence on its own line.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(\w+)?\n([\s\S]+?)\n```").expect("fenced block pattern is valid")
});

const DEFAULT_EXTENSION: &str = "txt";

/// A named content unit found in a response, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Language tag following the opening fence, if any.
    pub language: Option<String>,
    /// `artifact.<tag>` or `artifact.txt`.
    pub filename: String,
    /// Block body without the fence lines.
    pub content: String,
}

impl Artifact {
    /// File extension derived from the language tag.
    pub fn extension(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_EXTENSION)
    }

    /// Name used when the artifact is persisted, e.g.
    /// `artifact_20240701123000.python`. Only unique to the second.
    pub fn timestamped_filename(&self, at: DateTime<Utc>) -> String {
        self.numbered_filename(at, 0)
    }

    /// `timestamped_filename` with `_<n>` before the extension; `n == 0`
    /// gives the plain name. Used when a same-second name is already taken.
    pub fn numbered_filename(&self, at: DateTime<Utc>, n: u32) -> String {
        let stamp = at.format("%Y%m%d%H%M%S");
        match n {
            0 => format!("artifact_{stamp}.{}", self.extension()),
            n => format!("artifact_{stamp}_{n}.{}", self.extension()),
        }
    }
}

/// Return the first fenced block in `response`, or `None` if there is none.
pub fn extract_artifact(response: &str) -> Option<Artifact> {
    let captures = FENCED_BLOCK.captures(response)?;
    let language = captures.get(1).map(|m| m.as_str().to_owned());
    let content = captures.get(2)?.as_str().to_owned();
    let filename = format!(
        "artifact.{}",
        language.as_deref().unwrap_or(DEFAULT_EXTENSION)
    );
    Some(Artifact {
        language,
        filename,
        content,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tagged_block_is_extracted() {
        let artifact = extract_artifact("Here:\n```python\nprint(1)\n```\n").expect("artifact");
        assert_eq!(artifact.filename, "artifact.python");
        assert_eq!(artifact.content, "print(1)");
        assert_eq!(artifact.language.as_deref(), Some("python"));
    }

    #[test]
    fn untagged_block_defaults_to_txt() {
        let artifact = extract_artifact("```\nplain text\nsecond line\n```").expect("artifact");
        assert_eq!(artifact.filename, "artifact.txt");
        assert_eq!(artifact.content, "plain text\nsecond line");
    }

    #[test]
    fn no_fence_means_no_artifact() {
        assert_eq!(extract_artifact("just words, no code"), None);
        assert_eq!(extract_artifact(""), None);
    }

    #[test]
    fn unterminated_fence_means_no_artifact() {
        assert_eq!(extract_artifact("```rust\nfn main() {}\n"), None);
    }

    #[test]
    fn tag_with_space_is_not_a_tag() {
        // The tag must follow the fence directly and end the line.
        assert_eq!(extract_artifact("``` rust\nfn main() {}\n```"), None);
    }

    #[test]
    fn only_first_block_is_extracted() {
        let text = "```js\nlet a = 1;\n```\nand\n```css\nbody {}\n```";
        let artifact = extract_artifact(text).expect("artifact");
        assert_eq!(artifact.filename, "artifact.js");
        assert_eq!(artifact.content, "let a = 1;");
    }

    #[test]
    fn body_has_no_trailing_fence_and_is_a_substring() {
        let text = "intro\n```html\n<p>hi</p>\n<p>there</p>\n```\noutro";
        let artifact = extract_artifact(text).expect("artifact");
        assert!(!artifact.content.contains("```"));
        assert!(text.contains(&artifact.content));
    }

    #[test]
    fn extraction_is_idempotent() {
        let text = "```sql\nSELECT 1;\n```";
        assert_eq!(extract_artifact(text), extract_artifact(text));
    }

    #[test]
    fn timestamped_filename_uses_extension() {
        let at = Utc.with_ymd_and_hms(2024, 7, 1, 12, 30, 5).unwrap();
        let tagged = extract_artifact("```python\nx\n```").unwrap();
        let untagged = extract_artifact("```\nx\n```").unwrap();
        assert_eq!(tagged.timestamped_filename(at), "artifact_20240701123005.python");
        assert_eq!(untagged.timestamped_filename(at), "artifact_20240701123005.txt");
    }

    #[test]
    fn numbered_filename_inserts_counter_before_extension() {
        let at = Utc.with_ymd_and_hms(2024, 7, 1, 12, 30, 5).unwrap();
        let tagged = extract_artifact("```python\nx\n```").unwrap();
        assert_eq!(tagged.numbered_filename(at, 0), tagged.timestamped_filename(at));
        assert_eq!(tagged.numbered_filename(at, 2), "artifact_20240701123005_2.python");
    }
}
