//! Ordered aggregation of per-query search results

use super::types::*;

/// Results accumulated across all queries of one search, in query
/// submission order and, within a query, in backend ranking order
///
/// No deduplication happens here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResultSet {
    results: Vec<SearchResult>,
    reports: Vec<QueryReport>,
}

impl AggregateResultSet {
    /// Create a new empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful query's results
    pub fn push_success(
        &mut self,
        query: impl Into<String>,
        results: Vec<SearchResult>,
        elapsed_ms: u64,
    ) {
        self.reports.push(QueryReport {
            query: query.into(),
            result_count: results.len(),
            elapsed_ms,
            error: None,
        });
        self.results.extend(results);
    }

    /// Record a dropped query
    pub fn push_failure(
        &mut self,
        query: impl Into<String>,
        error: impl Into<String>,
        elapsed_ms: u64,
    ) {
        self.reports.push(QueryReport {
            query: query.into(),
            result_count: 0,
            elapsed_ms,
            error: Some(error.into()),
        });
    }

    /// All results in aggregate order
    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// The first `n` results, preserving order
    pub fn top(&self, n: usize) -> &[SearchResult] {
        &self.results[..n.min(self.results.len())]
    }

    /// Per-query diagnostics in submission order
    pub fn reports(&self) -> &[QueryReport] {
        &self.reports
    }

    /// Number of queries that were dropped
    pub fn failed_queries(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failure()).count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(n: usize) -> SearchResult {
        SearchResult::new(format!("r{}", n), format!("https://example.com/{}", n), "")
    }

    #[test]
    fn test_order_and_reports() {
        let mut set = AggregateResultSet::new();
        set.push_success("a", vec![hit(1), hit(2)], 10);
        set.push_failure("b", "HTTP status 500", 3);
        set.push_success("c", vec![hit(3)], 7);

        let titles: Vec<_> = set.results().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["r1", "r2", "r3"]);
        assert_eq!(set.reports().len(), 3);
        assert_eq!(set.reports()[1].query, "b");
        assert_eq!(set.failed_queries(), 1);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut set = AggregateResultSet::new();
        set.push_success("a", vec![hit(1)], 1);
        set.push_success("b", vec![hit(1)], 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_top() {
        let mut set = AggregateResultSet::new();
        set.push_success("a", (0..7).map(hit).collect(), 1);
        assert_eq!(set.top(5).len(), 5);
        assert_eq!(set.top(5)[4].title, "r4");
        assert_eq!(set.top(50).len(), 7);
    }

    #[test]
    fn test_empty() {
        let mut set = AggregateResultSet::new();
        set.push_failure("a", "timeout", 1);
        assert!(set.is_empty());
        assert_eq!(set.failed_queries(), 1);
    }
}
