//! Concurrent fan-out of generated queries to a search backend

use crate::backends::SearchBackend;
use crate::error::panic_message;
use crate::query::Query;
use crate::results::{AggregateResultSet, SearchOutcome, SearchResult};
use futures::{stream, FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default number of queries in flight at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default per-query deadline
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Search orchestrator that runs every query against the backend
///
/// One failing query never fails the whole search: its contribution is
/// dropped and recorded in the aggregate's reports.
pub struct SearchOrchestrator {
    backend: Arc<dyn SearchBackend>,
    concurrency: usize,
    query_timeout: Duration,
}

impl SearchOrchestrator {
    /// Create a new orchestrator
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            concurrency: DEFAULT_CONCURRENCY,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Set the maximum number of queries in flight (at least one)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the per-query deadline
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Run all queries and collect their results in submission order
    ///
    /// Returns once every query has produced results or failed. Results
    /// are ordered by query, then by backend ranking, regardless of which
    /// query finished first.
    pub async fn search(&self, queries: &[Query]) -> AggregateResultSet {
        info!(
            "Executing {} queries on {} (concurrency {})",
            queries.len(),
            self.backend.name(),
            self.concurrency
        );

        // `buffered` yields in input order while polling up to N futures at once
        let slots: Vec<(&Query, Result<Vec<SearchResult>, String>, u64)> = stream::iter(queries)
            .map(|query| async move {
                let start = Instant::now();
                let result = self.search_one(query).await;
                (query, result, start.elapsed().as_millis() as u64)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut aggregate = AggregateResultSet::new();
        for (query, result, elapsed_ms) in slots {
            match result {
                Ok(results) => {
                    debug!(
                        "Query '{}' returned {} results in {}ms",
                        query.text(),
                        results.len(),
                        elapsed_ms
                    );
                    aggregate.push_success(query.text(), results, elapsed_ms);
                }
                Err(reason) => {
                    warn!("Dropping query '{}': {}", query.text(), reason);
                    aggregate.push_failure(query.text(), reason, elapsed_ms);
                }
            }
        }

        info!(
            "Search finished: {} results, {} of {} queries failed",
            aggregate.len(),
            aggregate.failed_queries(),
            queries.len()
        );
        aggregate
    }

    /// Search a single query, turning every failure mode into `Err`
    async fn search_one(&self, query: &Query) -> Result<Vec<SearchResult>, String> {
        let call = AssertUnwindSafe(self.backend.search(query)).catch_unwind();

        match timeout(self.query_timeout, call).await {
            Ok(Ok(SearchOutcome::Success(mut results))) => {
                results.truncate(query.max_results() as usize);
                Ok(results)
            }
            Ok(Ok(SearchOutcome::Failure(reason))) => Err(reason),
            Ok(Err(panic)) => Err(format!("backend panicked: {}", panic_message(panic))),
            Err(_) => Err(format!("timed out after {:?}", self.query_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{hits, FakeBackend, Reply};

    fn queries(texts: &[&str]) -> Vec<Query> {
        texts.iter().map(|t| Query::simple(*t).unwrap()).collect()
    }

    fn titles(aggregate: &AggregateResultSet) -> Vec<String> {
        aggregate.results().iter().map(|r| r.title.clone()).collect()
    }

    #[tokio::test]
    async fn test_order_follows_submission_not_completion() {
        let backend = Arc::new(
            FakeBackend::new()
                .reply("A", 80, Reply::Results(hits("a", 2)))
                .reply("B", 0, Reply::Results(hits("b", 2)))
                .reply("C", 40, Reply::Results(hits("c", 1))),
        );
        let orchestrator = SearchOrchestrator::new(backend.clone()).with_concurrency(3);

        let aggregate = orchestrator.search(&queries(&["A", "B", "C"])).await;

        assert_eq!(backend.completed(), vec!["B", "C", "A"]);
        assert_eq!(titles(&aggregate), vec!["a-0", "a-1", "b-0", "b-1", "c-0"]);
        let reported: Vec<_> = aggregate.reports().iter().map(|r| r.query.as_str()).collect();
        assert_eq!(reported, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_queries_run_concurrently() {
        let backend = Arc::new(
            FakeBackend::new()
                .reply("A", 50, Reply::Results(hits("a", 1)))
                .reply("B", 50, Reply::Results(hits("b", 1)))
                .reply("C", 50, Reply::Results(hits("c", 1))),
        );
        let orchestrator = SearchOrchestrator::new(backend.clone()).with_concurrency(3);

        orchestrator.search(&queries(&["A", "B", "C"])).await;
        assert_eq!(backend.peak_in_flight(), 3);
    }

    #[tokio::test]
    async fn test_concurrency_limit() {
        let mut backend = FakeBackend::new();
        for q in ["A", "B", "C", "D", "E"] {
            backend = backend.reply(q, 20, Reply::Results(hits(q, 1)));
        }
        let backend = Arc::new(backend);
        let orchestrator = SearchOrchestrator::new(backend.clone()).with_concurrency(2);

        let aggregate = orchestrator.search(&queries(&["A", "B", "C", "D", "E"])).await;

        assert!(backend.peak_in_flight() <= 2);
        assert_eq!(aggregate.len(), 5);
    }

    #[tokio::test]
    async fn test_failed_queries_are_dropped() {
        let backend = Arc::new(
            FakeBackend::new()
                .reply("A", 0, Reply::Results(hits("a", 1)))
                .reply("B", 0, Reply::Failure("HTTP status 500".into()))
                .reply("C", 0, Reply::Results(hits("c", 1))),
        );
        let orchestrator = SearchOrchestrator::new(backend);

        let aggregate = orchestrator.search(&queries(&["A", "B", "C"])).await;

        assert_eq!(titles(&aggregate), vec!["a-0", "c-0"]);
        assert_eq!(aggregate.failed_queries(), 1);
        assert_eq!(aggregate.reports()[1].error.as_deref(), Some("HTTP status 500"));
    }

    #[tokio::test]
    async fn test_panicking_backend_is_a_dropped_query() {
        let backend = Arc::new(
            FakeBackend::new()
                .reply("A", 0, Reply::Panic)
                .reply("B", 0, Reply::Results(hits("b", 1))),
        );
        let orchestrator = SearchOrchestrator::new(backend);

        let aggregate = orchestrator.search(&queries(&["A", "B"])).await;

        assert_eq!(titles(&aggregate), vec!["b-0"]);
        let error = aggregate.reports()[0].error.clone().unwrap();
        assert!(error.contains("backend exploded on 'A'"));
    }

    #[tokio::test]
    async fn test_slow_query_times_out() {
        let backend = Arc::new(
            FakeBackend::new()
                .reply("slow", 500, Reply::Results(hits("slow", 1)))
                .reply("fast", 0, Reply::Results(hits("fast", 1))),
        );
        let orchestrator =
            SearchOrchestrator::new(backend).with_query_timeout(Duration::from_millis(50));

        let aggregate = orchestrator.search(&queries(&["slow", "fast"])).await;

        assert_eq!(titles(&aggregate), vec!["fast-0"]);
        assert!(aggregate.reports()[0].error.as_deref().unwrap().starts_with("timed out"));
    }

    #[tokio::test]
    async fn test_all_failed_is_empty_not_error() {
        let backend = Arc::new(
            FakeBackend::new()
                .reply("A", 0, Reply::Failure("down".into()))
                .reply("B", 0, Reply::Results(vec![])),
        );
        let orchestrator = SearchOrchestrator::new(backend);

        let aggregate = orchestrator.search(&queries(&["A", "B"])).await;

        assert!(aggregate.is_empty());
        assert_eq!(aggregate.failed_queries(), 1);
        assert_eq!(aggregate.reports().len(), 2);
    }

    #[tokio::test]
    async fn test_results_capped_per_query() {
        let backend = Arc::new(FakeBackend::new().reply("A", 0, Reply::Results(hits("a", 8))));
        let orchestrator = SearchOrchestrator::new(backend);

        let aggregate = orchestrator
            .search(&[Query::new("A", 3, "en").unwrap()])
            .await;
        assert_eq!(titles(&aggregate), vec!["a-0", "a-1", "a-2"]);
    }

    #[tokio::test]
    async fn test_no_queries() {
        let backend = Arc::new(FakeBackend::new());
        let orchestrator = SearchOrchestrator::new(backend.clone());

        let aggregate = orchestrator.search(&[]).await;
        assert!(aggregate.is_empty());
        assert!(backend.calls().is_empty());
    }
}
