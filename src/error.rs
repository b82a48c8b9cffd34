//! Pipeline-level error taxonomy
//!
//! Every exit of [`crate::pipeline::SearchPipeline`] is either synthesized
//! text or one of these variants. Collaborator errors ([`LlmError`],
//! [`crate::backends::BackendError`]) are defined next to their traits.

use crate::llm::LlmError;
use thiserror::Error;

/// Typed failure of a pipeline run
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    /// The incoming request was rejected before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A language model call failed
    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    /// The model returned structured output that could not be parsed
    #[error("Failed to parse model output: {message}")]
    Parsing {
        message: String,
        /// Offending model output, kept for diagnostics
        raw: String,
    },

    /// Every search query failed or returned nothing
    #[error("Search failed: no results")]
    NoResults,

    /// The run was cancelled or hit its deadline
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Anything not covered above, e.g. a panicking collaborator
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Short machine-friendly name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Llm(_) => "llm",
            PipelineError::Parsing { .. } => "parsing",
            PipelineError::NoResults => "search",
            PipelineError::Cancelled => "cancelled",
            PipelineError::Unexpected(_) => "unexpected",
        }
    }
}

/// Render a caught panic payload as text
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
