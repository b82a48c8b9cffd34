//! Fan-out over several backends presented as one

use super::traits::*;
use crate::query::Query;
use crate::results::SearchOutcome;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Backend that queries all of its children concurrently
///
/// Results are concatenated in registration order. The call succeeds if
/// at least one child succeeded.
pub struct MultiBackend {
    name: String,
    backends: Vec<Arc<dyn SearchBackend>>,
}

impl MultiBackend {
    pub fn new(backends: Vec<Arc<dyn SearchBackend>>) -> Self {
        let name = backends
            .iter()
            .map(|b| b.name())
            .collect::<Vec<_>>()
            .join("+");
        Self { name, backends }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[async_trait]
impl SearchBackend for MultiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &Query) -> SearchOutcome {
        let outcomes = join_all(self.backends.iter().map(|b| b.search(query))).await;

        let mut results = Vec::new();
        let mut errors = Vec::new();
        let mut any_success = false;

        for (backend, outcome) in self.backends.iter().zip(outcomes) {
            match outcome {
                SearchOutcome::Success(hits) => {
                    debug!("{}: {} results", backend.name(), hits.len());
                    any_success = true;
                    results.extend(hits);
                }
                SearchOutcome::Failure(reason) => {
                    warn!("Backend {} failed for '{}': {}", backend.name(), query.text(), reason);
                    errors.push(format!("{}: {}", backend.name(), reason));
                }
            }
        }

        if any_success {
            SearchOutcome::success(results)
        } else if errors.is_empty() {
            SearchOutcome::failure("no backends configured")
        } else {
            SearchOutcome::failure(errors.join("; "))
        }
    }

    async fn fetch_page_content(&self, url: &str) -> Result<String, BackendError> {
        let mut last_error = BackendError::Other("no backends configured".to_string());
        for backend in &self.backends {
            match backend.fetch_page_content(url).await {
                Ok(text) => return Ok(text),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{hits, FakeBackend, Reply};

    fn query() -> Query {
        Query::simple("q").unwrap()
    }

    #[tokio::test]
    async fn test_concatenates_in_registration_order() {
        let slow = Arc::new(FakeBackend::new().reply("q", 40, Reply::Results(hits("slow", 2))));
        let fast = Arc::new(FakeBackend::new().reply("q", 0, Reply::Results(hits("fast", 1))));
        let multi = MultiBackend::new(vec![slow, fast]);

        let outcome = multi.search(&query()).await;
        let titles: Vec<_> = outcome.results().iter().map(|r| r.title.clone()).collect();
        assert_eq!(titles, vec!["slow-0", "slow-1", "fast-0"]);
    }

    #[tokio::test]
    async fn test_partial_failure_is_success() {
        let broken =
            Arc::new(FakeBackend::new().reply("q", 0, Reply::Failure("HTTP status 500".into())));
        let ok = Arc::new(FakeBackend::new().reply("q", 0, Reply::Results(hits("ok", 1))));
        let multi = MultiBackend::new(vec![broken, ok]);

        let outcome = multi.search(&query()).await;
        assert!(outcome.is_successful());
        assert_eq!(outcome.results().len(), 1);
    }

    #[tokio::test]
    async fn test_all_failed() {
        let a = Arc::new(FakeBackend::new().reply("q", 0, Reply::Failure("down".into())));
        let b = Arc::new(FakeBackend::new().reply("q", 0, Reply::Failure("timeout".into())));
        let multi = MultiBackend::new(vec![a, b]);

        assert_eq!(multi.name(), "fake+fake");
        let outcome = multi.search(&query()).await;
        assert_eq!(outcome.error(), Some("fake: down; fake: timeout"));
    }

    #[tokio::test]
    async fn test_empty_multi_fails() {
        let multi = MultiBackend::new(vec![]);
        assert!(!multi.search(&query()).await.is_successful());
        assert!(multi.fetch_page_content("https://x").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_uses_first_success() {
        let multi = MultiBackend::new(vec![Arc::new(FakeBackend::new())]);
        let text = multi.fetch_page_content("https://example.com").await.unwrap();
        assert_eq!(text, "content of https://example.com");
    }
}
