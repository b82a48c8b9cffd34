//! Search query value and LLM-driven query generation

mod generator;

pub use generator::{QueryGenerationError, QueryGenerator};

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Default number of results requested per query
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// Default search language
pub const DEFAULT_LANGUAGE: &str = "en";

/// One search request sent to a backend
///
/// Construction guarantees a non-blank text and a positive result count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Query {
    text: String,
    max_results: u32,
    language: String,
}

impl Query {
    /// Create a validated query; surrounding whitespace is trimmed
    pub fn new(
        text: impl Into<String>,
        max_results: u32,
        language: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(PipelineError::Validation(
                "query text must not be empty".to_string(),
            ));
        }
        if max_results == 0 {
            return Err(PipelineError::Validation(
                "max_results must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            text,
            max_results,
            language: language.into(),
        })
    }

    /// Create a query with the default result count and language
    pub fn simple(text: impl Into<String>) -> Result<Self, PipelineError> {
        Self::new(text, DEFAULT_MAX_RESULTS, DEFAULT_LANGUAGE)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

#[derive(Deserialize)]
struct RawQuery {
    text: String,
    #[serde(default = "default_max_results")]
    max_results: u32,
    #[serde(default = "default_language")]
    language: String,
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawQuery::deserialize(deserializer)?;
        Query::new(raw.text, raw.max_results, raw.language).map_err(serde::de::Error::custom)
    }
}
