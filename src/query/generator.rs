//! Expansion of one user question into focused search queries

use crate::error::PipelineError;
use crate::llm::{GenerationConfig, LanguageModelClient, LlmError};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure of query generation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryGenerationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The model output was not a JSON array of strings
    #[error("Failed to parse generated queries: {message}")]
    Parsing { message: String, raw: String },
}

impl From<QueryGenerationError> for PipelineError {
    fn from(err: QueryGenerationError) -> Self {
        match err {
            QueryGenerationError::Llm(e) => PipelineError::Llm(e),
            QueryGenerationError::Parsing { message, raw } => {
                PipelineError::Parsing { message, raw }
            }
        }
    }
}

/// Turns a user question into search queries using a language model
pub struct QueryGenerator {
    llm: Arc<dyn LanguageModelClient>,
    model: Option<String>,
    config: Option<GenerationConfig>,
}

impl QueryGenerator {
    pub fn new(llm: Arc<dyn LanguageModelClient>) -> Self {
        Self {
            llm,
            model: None,
            config: None,
        }
    }

    /// Use a specific model instead of the client default
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Generate search queries for `user_query`
    ///
    /// The model must answer with a bare JSON array of strings. Anything
    /// else fails with [`QueryGenerationError::Parsing`]; no queries are
    /// guessed from free text.
    pub async fn generate(&self, user_query: &str) -> Result<Vec<String>, QueryGenerationError> {
        let prompt = build_prompt(user_query);
        let response = self
            .llm
            .generate_text(&prompt, self.model.as_deref(), self.config.as_ref())
            .await?;

        let queries = parse_queries(&response.text)?;
        debug!("Generated {} queries for '{}'", queries.len(), user_query);
        Ok(queries)
    }
}

fn build_prompt(user_query: &str) -> String {
    format!(
        r#"Generate 2-3 focused web search queries that together would find the information needed to answer the question below.

Question: "{}"

Respond with ONLY a JSON array of strings, without explanations or code fences.
Example: ["first search query", "second search query"]"#,
        user_query
    )
}

/// Parse the model output into a list of queries
///
/// Blank entries are dropped; an array with no usable entry is an error.
pub fn parse_queries(raw: &str) -> Result<Vec<String>, QueryGenerationError> {
    let parsing = |message: String| QueryGenerationError::Parsing {
        message,
        raw: raw.to_string(),
    };

    let value: Value = serde_json::from_str(raw.trim()).map_err(|e| {
        warn!("Query generation returned invalid JSON: {}", e);
        parsing(format!("invalid JSON: {}", e))
    })?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(parsing(format!(
                "expected a JSON array of strings, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut queries = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => {
                let s = s.trim();
                if !s.is_empty() {
                    queries.push(s.to_string());
                }
            }
            other => {
                return Err(parsing(format!(
                    "expected a JSON array of strings, found {} element",
                    json_kind(&other)
                )))
            }
        }
    }

    if queries.is_empty() {
        return Err(parsing("model returned no queries".to_string()));
    }
    Ok(queries)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
