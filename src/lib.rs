//! searchsynth: LLM-assisted web search with cited answers
//!
//! A user question is expanded into several search queries by a language
//! model, the queries are run concurrently against a search backend, and
//! the leading results are synthesized into one answer with inline
//! source citations.

pub mod backends;
pub mod config;
pub mod error;
pub mod llm;
pub mod network;
pub mod pipeline;
pub mod query;
pub mod results;
pub mod search;
pub mod synthesis;

#[cfg(test)]
mod testing;

pub use backends::{BackendError, SearchBackend};
pub use config::Settings;
pub use error::PipelineError;
pub use llm::{parse_thinking, LanguageModelClient, LlmError, ThinkingResponse};
pub use pipeline::{PipelineReport, PipelineResult, SearchPipeline};
pub use query::{Query, QueryGenerator};
pub use results::{AggregateResultSet, SearchOutcome, SearchResult};
pub use search::SearchOrchestrator;
pub use synthesis::ResultSynthesizer;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
