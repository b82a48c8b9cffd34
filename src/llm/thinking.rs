//! Extraction of `<think>...</think>` reasoning segments from model output

use super::traits::LlmTextResponse;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Opening marker of a thinking segment
pub const THINK_OPEN: &str = "<think>";

/// Closing marker of a thinking segment
pub const THINK_CLOSE: &str = "</think>";

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// A model response split into its answer and its reasoning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThinkingResponse {
    /// User-facing text with thinking segments removed
    pub main_content: String,
    /// Trimmed reasoning text, if any
    pub thinking_content: Option<String>,
    pub has_thinking: bool,
    pub original_response: LlmTextResponse,
}

impl ThinkingResponse {
    /// Split `response` into main content and thinking content
    ///
    /// Ambiguous markup (no closing marker, or a closing marker at or
    /// before the opening one) is left untouched.
    pub fn parse(response: LlmTextResponse) -> Self {
        let (main_content, thinking_content) = split(&response.text);
        Self {
            main_content,
            has_thinking: thinking_content.is_some(),
            thinking_content,
            original_response: response,
        }
    }
}

/// Shorthand for parsing bare text
pub fn parse_thinking(text: &str) -> ThinkingResponse {
    ThinkingResponse::parse(LlmTextResponse::new(text, ""))
}

fn split(text: &str) -> (String, Option<String>) {
    let open = match text.find(THINK_OPEN) {
        Some(pos) => pos,
        None => return (text.to_string(), None),
    };
    let close = match text.find(THINK_CLOSE) {
        Some(pos) if pos > open => pos,
        _ => return (text.to_string(), None),
    };

    let thinking = text[open + THINK_OPEN.len()..close].trim();
    let main = THINK_BLOCK.replace_all(text, "").trim().to_string();

    if thinking.is_empty() {
        (main, None)
    } else {
        (main, Some(thinking.to_string()))
    }
}
