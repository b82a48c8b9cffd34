//! Language model module
//!
//! Defines the [`LanguageModelClient`] capability consumed by the pipeline,
//! an OpenAI-compatible HTTP adapter and the thinking-segment parser.

mod openai;
mod thinking;
mod traits;

pub use openai::{ChatMessage, OpenAiCompatibleClient};
pub use thinking::{parse_thinking, ThinkingResponse, THINK_CLOSE, THINK_OPEN};
pub use traits::*;
