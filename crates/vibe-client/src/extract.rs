//! Pulling source text out of a chat response.

use regex::Regex;
use std::sync::LazyLock;

/// A fenced block with an optional language tag. Any tag may end the
/// opening line; known tags may also share it with the code.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:[\w+#.-]+[ \t]*\r?\n|(?:vibescript|python)[ \t]+|\s*)(.*?)```")
        .expect("fence pattern is valid")
});

/// Interior of the first fenced code block, trimmed. Without a fence the
/// whole trimmed body is returned, since backends do not always fence.
pub fn extract_code_block(content: &str) -> String {
    match FENCED_BLOCK.captures(content).and_then(|c| c.get(1)) {
        Some(block) => block.as_str().trim().to_string(),
        None => content.trim().to_string(),
    }
}
