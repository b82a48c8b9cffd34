//! Backend trait and error type

use crate::query::Query;
use crate::results::SearchOutcome;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to a search backend
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// Network or transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if let Some(status) = err.status() {
            BackendError::Status(status.as_u16())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

/// Capability to run a web search and fetch pages
///
/// Implementations must be safe to share between concurrent pipeline runs.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Backend name, used in logs and as the result source
    fn name(&self) -> &str;

    /// Run one query
    ///
    /// Errors are reported as [`SearchOutcome::Failure`], never panics.
    async fn search(&self, query: &Query) -> SearchOutcome;

    /// Fetch readable text of one page
    async fn fetch_page_content(&self, url: &str) -> Result<String, BackendError>;
}
