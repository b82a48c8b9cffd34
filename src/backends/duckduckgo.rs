//! DuckDuckGo HTML search backend

use super::traits::*;
use crate::network::{accept_language, HttpClient, HttpRequest};
use crate::query::Query;
use crate::results::{SearchOutcome, SearchResult};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

const HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// DuckDuckGo web search scraped from the no-JavaScript HTML endpoint
pub struct DuckDuckGoBackend {
    html_url: String,
    client: HttpClient,
    timeout: Option<Duration>,
}

impl DuckDuckGoBackend {
    pub fn new(client: HttpClient) -> Self {
        Self {
            html_url: HTML_URL.to_string(),
            client,
            timeout: None,
        }
    }

    /// Point the backend at another endpoint (mirrors, tests)
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.html_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn request(&self, query: &Query) -> HttpRequest {
        let mut request = HttpRequest::post(&self.html_url)
            .form_field("q", query.text())
            .form_field("b", "")
            .form_field("kl", region(query.language()))
            .header("Accept-Language", accept_language(query.language()));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    fn parse_results(&self, html: &str, limit: usize) -> Vec<SearchResult> {
        let document = Html::parse_document(html);
        let mut results = Vec::new();

        let result_selector = Selector::parse("div.result").unwrap();
        let title_selector = Selector::parse("a.result__a").unwrap();
        let snippet_selector = Selector::parse(".result__snippet").unwrap();

        for element in document.select(&result_selector) {
            if results.len() >= limit {
                break;
            }

            let title_elem = match element.select(&title_selector).next() {
                Some(t) => t,
                None => continue,
            };

            let title = title_elem.text().collect::<String>().trim().to_string();
            if title.is_empty() {
                continue;
            }

            let url = match title_elem.value().attr("href").and_then(resolve_link) {
                Some(u) => u,
                None => continue,
            };

            // Ads and internal links
            if url.contains("duckduckgo.com") {
                continue;
            }

            let snippet = element
                .select(&snippet_selector)
                .next()
                .map(|s| s.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            results.push(SearchResult::new(title, url, snippet).with_source(self.name()));
        }

        results
    }

    async fn run(&self, query: &Query) -> Result<Vec<SearchResult>, BackendError> {
        let response = self
            .client
            .execute(self.request(query))
            .await?
            .error_for_status()?;

        let results = self.parse_results(&response.text, query.max_results() as usize);
        debug!("duckduckgo returned {} results for '{}'", results.len(), query.text());
        Ok(results)
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &Query) -> SearchOutcome {
        self.run(query).await.into()
    }

    async fn fetch_page_content(&self, url: &str) -> Result<String, BackendError> {
        self.client.fetch_page_text(url).await
    }
}

/// DuckDuckGo region code (`kl`) for a language tag
fn region(lang: &str) -> String {
    match lang {
        "" | "all" | "auto" => "wt-wt".to_string(),
        "en" => "us-en".to_string(),
        tag => match tag.split_once('-') {
            Some((lang, country)) => format!("{}-{}", country.to_lowercase(), lang.to_lowercase()),
            None => format!("{0}-{0}", tag.to_lowercase()),
        },
    }
}

/// Resolve a result href, unwrapping `/l/?uddg=` redirect links
fn resolve_link(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    if parsed.path().starts_with("/l/") {
        return parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }

    Some(absolute)
}
