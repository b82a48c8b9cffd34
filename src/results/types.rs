//! Result type definitions

use crate::backends::BackendError;
use serde::{Deserialize, Serialize};
use url::Url;

/// A single search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    /// Identity of the result for deduplication purposes
    pub url: String,
    pub snippet: String,
    /// Full page text, when it was fetched
    pub content: Option<String>,
    /// Backend or upstream engine that produced the hit
    pub source: Option<String>,
}

impl SearchResult {
    /// Create a new result
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            content: None,
            source: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Host part of the URL, or the raw URL when it cannot be parsed
    pub fn domain(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Result of one backend call
///
/// Success is independent of result count: a backend may succeed with
/// zero hits.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Success(Vec<SearchResult>),
    Failure(String),
}

impl SearchOutcome {
    pub fn success(results: Vec<SearchResult>) -> Self {
        SearchOutcome::Success(results)
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        SearchOutcome::Failure(reason.into())
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, SearchOutcome::Success(_))
    }

    /// Results of a successful call; empty on failure
    pub fn results(&self) -> &[SearchResult] {
        match self {
            SearchOutcome::Success(results) => results,
            SearchOutcome::Failure(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SearchOutcome::Success(_) => None,
            SearchOutcome::Failure(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> std::result::Result<Vec<SearchResult>, String> {
        match self {
            SearchOutcome::Success(results) => Ok(results),
            SearchOutcome::Failure(reason) => Err(reason),
        }
    }
}

impl From<std::result::Result<Vec<SearchResult>, BackendError>> for SearchOutcome {
    fn from(result: std::result::Result<Vec<SearchResult>, BackendError>) -> Self {
        match result {
            Ok(results) => SearchOutcome::Success(results),
            Err(e) => SearchOutcome::Failure(e.to_string()),
        }
    }
}

/// Per-query diagnostics recorded by the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryReport {
    /// Query text as submitted
    pub query: String,
    /// Number of results kept from this query
    pub result_count: usize,
    pub elapsed_ms: u64,
    /// Why the query was dropped, if it was
    pub error: Option<String>,
}

impl QueryReport {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}
