//! Language model traits and types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default completion budget in tokens
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default nucleus sampling cutoff
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Errors reported by a language model client
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LlmError {
    /// Transport-level failure (connection refused, DNS, TLS...)
    #[error("Request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered but the payload was not understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service returned no text
    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Request timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_decode() {
            LlmError::InvalidResponse(err.to_string())
        } else {
            LlmError::Request(err.to_string())
        }
    }
}

/// Sampling and prompt options for a single generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Sequences that stop generation
    pub stop_sequences: Vec<String>,
    /// System prompt sent ahead of the user prompt
    pub system_prompt: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            stop_sequences: vec![],
            system_prompt: None,
        }
    }
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_stop_sequence(mut self, stop: impl Into<String>) -> Self {
        self.stop_sequences.push(stop.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// A complete text generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmTextResponse {
    /// Generated text
    pub text: String,
    /// Model that produced the text
    pub model: String,
    /// Number of completion tokens, if reported
    pub tokens_generated: Option<u32>,
    /// Wall time spent generating, in milliseconds
    pub generation_time_ms: Option<u64>,
}

impl LlmTextResponse {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            tokens_generated: None,
            generation_time_ms: None,
        }
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens_generated = Some(tokens);
        self
    }

    pub fn with_generation_time(mut self, ms: u64) -> Self {
        self.generation_time_ms = Some(ms);
        self
    }
}

/// A model advertised by the service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub id: String,
    pub owned_by: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

/// Capability to generate text from a prompt
///
/// Implementations must be safe to share between concurrent pipeline runs.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    /// Adapter name, used in logs
    fn name(&self) -> &str;

    /// Model used when a call does not name one
    fn default_model(&self) -> &str;

    /// Generate a completion for `prompt`
    ///
    /// `model` and `config` fall back to the client's defaults when `None`.
    async fn generate_text(
        &self,
        prompt: &str,
        model: Option<&str>,
        config: Option<&GenerationConfig>,
    ) -> Result<LlmTextResponse, LlmError>;

    /// Models available from the service
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        Ok(vec![])
    }

    /// Whether the service is reachable
    async fn is_available(&self) -> bool {
        self.list_models().await.is_ok()
    }
}
