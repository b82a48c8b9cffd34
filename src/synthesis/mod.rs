//! Answer synthesis from aggregated search results
//!
//! Builds a citation-oriented prompt from the first few results and hands
//! it to the language model. Only titles, snippets and URLs go into the
//! prompt, so its size does not depend on fetched page content.

use crate::llm::{GenerationConfig, LanguageModelClient, LlmError};
use crate::results::SearchResult;
use std::fmt::Write;
use std::sync::Arc;
use tracing::debug;

/// Default number of results included in the prompt
pub const DEFAULT_SYNTHESIS_RESULTS: usize = 5;

/// Turns search results into one answer with source citations
pub struct ResultSynthesizer {
    llm: Arc<dyn LanguageModelClient>,
    max_results: usize,
    model: Option<String>,
    config: Option<GenerationConfig>,
}

impl ResultSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModelClient>) -> Self {
        Self {
            llm,
            max_results: DEFAULT_SYNTHESIS_RESULTS,
            model: None,
            config: None,
        }
    }

    /// Set how many leading results go into the prompt (at least one)
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Synthesize an answer to `original_query` from `results`
    ///
    /// The model output is returned verbatim.
    pub async fn synthesize(
        &self,
        original_query: &str,
        results: &[SearchResult],
    ) -> Result<String, LlmError> {
        let prompt = self.build_prompt(original_query, results);
        debug!(
            "Synthesizing from {} of {} results ({} prompt chars)",
            results.len().min(self.max_results),
            results.len(),
            prompt.len()
        );

        let response = self
            .llm
            .generate_text(&prompt, self.model.as_deref(), self.config.as_ref())
            .await?;
        Ok(response.text)
    }

    /// Prompt embedding the question and the first `max_results` results
    pub fn build_prompt(&self, original_query: &str, results: &[SearchResult]) -> String {
        let included = &results[..results.len().min(self.max_results)];

        let mut sources = String::new();
        for (i, result) in included.iter().enumerate() {
            // Writing to a String cannot fail
            let _ = write!(
                sources,
                "[{}] Source: {}\nTitle: {}\nSnippet: {}\nURL: {}\n\n",
                i + 1,
                result.domain(),
                result.title,
                result.snippet,
                result.url
            );
        }

        format!(
            r#"Answer the question using the search results below.

Question: "{}"

Search results:

{}Instructions:
- Write a clear, well-structured answer based only on these results.
- Cite sources inline in the form [Source Name](URL).
- If the results are not sufficient to answer, say so instead of making up information."#,
            original_query, sources
        )
    }
}
