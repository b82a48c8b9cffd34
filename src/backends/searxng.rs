//! SearXNG instance backend (JSON API)

use super::traits::*;
use crate::network::{accept_json, accept_language, HttpClient, HttpRequest};
use crate::query::Query;
use crate::results::{SearchOutcome, SearchResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    engine: Option<String>,
}

/// Backend querying a SearXNG instance with `format=json` enabled
pub struct SearxngBackend {
    name: String,
    base_url: String,
    client: HttpClient,
    timeout: Option<Duration>,
}

impl SearxngBackend {
    pub fn new(base_url: impl Into<String>, client: HttpClient) -> Self {
        Self {
            name: "searxng".to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn request(&self, query: &Query) -> HttpRequest {
        let mut request = HttpRequest::get(format!("{}/search", self.base_url))
            .param("q", query.text())
            .param("format", "json")
            .param("language", query.language())
            .header("Accept", accept_json())
            .header("Accept-Language", accept_language(query.language()));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    async fn run(&self, query: &Query) -> Result<Vec<SearchResult>, BackendError> {
        let response = self
            .client
            .execute(self.request(query))
            .await?
            .error_for_status()?;
        let parsed: SearxngResponse = response.json()?;

        let results: Vec<SearchResult> = parsed
            .results
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .take(query.max_results() as usize)
            .map(|r| {
                let source = r.engine.unwrap_or_else(|| self.name.clone());
                SearchResult::new(r.title.trim(), r.url, r.content.unwrap_or_default().trim())
                    .with_source(source)
            })
            .collect();

        debug!("{} returned {} results for '{}'", self.name, results.len(), query.text());
        Ok(results)
    }
}

#[async_trait]
impl SearchBackend for SearxngBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &Query) -> SearchOutcome {
        self.run(query).await.into()
    }

    async fn fetch_page_content(&self, url: &str) -> Result<String, BackendError> {
        self.client.fetch_page_text(url).await
    }
}
