//! System prompt sourcing
//!
//! The translation instruction lives in a markdown file so it can be tuned
//! without rebuilding: the first fenced code block under the
//! `## Translation Agent System Prompt` heading is used verbatim. Any
//! problem reading or locating it falls back to the built-in default.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Matches a fenced code block, capturing its body
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[a-zA-Z]*\r?\n(.*?)```").unwrap());

/// Heading the prompt file is searched for
pub const PROMPT_HEADING: &str = "## Translation Agent System Prompt";

/// Instruction used when no prompt file is available
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional translator. \
Translate the following English text to Chinese. Preserve the HTML structure \
and formatting. Only return the translated text without any explanations.";

/// Read the system prompt from a markdown file, falling back to the default
pub fn load_system_prompt(path: &Path) -> String {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "cannot read prompt file, using built-in prompt"
            );
            return DEFAULT_SYSTEM_PROMPT.to_string();
        }
    };

    match extract_prompt(&content) {
        Some(prompt) => prompt,
        None => {
            tracing::warn!(
                path = %path.display(),
                heading = PROMPT_HEADING,
                "prompt file has no fenced block under the expected heading, using built-in prompt"
            );
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

/// Pull the first fenced code block after the prompt heading, if present
pub fn extract_prompt(markdown: &str) -> Option<String> {
    let after_heading = &markdown[markdown.find(PROMPT_HEADING)? + PROMPT_HEADING.len()..];
    let block = FENCE_RE.captures(after_heading)?.get(1)?.as_str().trim();
    if block.is_empty() {
        None
    } else {
        Some(block.to_string())
    }
}
