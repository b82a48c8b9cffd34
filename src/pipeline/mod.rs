//! End-to-end search pipeline
//!
//! `Start -> GeneratingQueries -> Searching -> Synthesizing -> Done`, with
//! an exit to `Failed` from every stage. Each stage races the run's
//! cancellation token, and a panicking collaborator surfaces as
//! [`PipelineError::Unexpected`] rather than unwinding into the caller.

use crate::backends::SearchBackend;
use crate::config::Settings;
use crate::error::{panic_message, PipelineError};
use crate::llm::{GenerationConfig, LanguageModelClient};
use crate::query::{Query, QueryGenerator, DEFAULT_LANGUAGE, DEFAULT_MAX_RESULTS};
use crate::results::QueryReport;
use crate::search::SearchOrchestrator;
use crate::synthesis::ResultSynthesizer;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Stages of a pipeline run, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    GeneratingQueries,
    Searching,
    Synthesizing,
    Done,
    Failed,
}

/// Terminal outcome of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineResult {
    Synthesized(String),
    Failed(PipelineError),
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Synthesized(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            PipelineResult::Synthesized(text) => Some(text),
            PipelineResult::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            PipelineResult::Synthesized(_) => None,
            PipelineResult::Failed(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<String, PipelineError> {
        match self {
            PipelineResult::Synthesized(text) => Ok(text),
            PipelineResult::Failed(e) => Err(e),
        }
    }
}

impl From<Result<String, PipelineError>> for PipelineResult {
    fn from(result: Result<String, PipelineError>) -> Self {
        match result {
            Ok(text) => PipelineResult::Synthesized(text),
            Err(e) => PipelineResult::Failed(e),
        }
    }
}

/// Outcome of a run together with its intermediate data
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub result: PipelineResult,
    /// Queries produced by the model, before validation
    pub generated_queries: Vec<String>,
    /// Per-query search diagnostics in submission order
    pub search_reports: Vec<QueryReport>,
    /// Number of results handed to the synthesis prompt
    pub results_used: usize,
}

impl PipelineReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            result: PipelineResult::Failed(PipelineError::Cancelled),
            generated_queries: vec![],
            search_reports: vec![],
            results_used: 0,
        }
    }
}

/// Aborts a spawned task when dropped
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Query generation, search fan-out and synthesis in sequence
///
/// Holds no per-run state; one pipeline may serve concurrent runs.
pub struct SearchPipeline {
    generator: QueryGenerator,
    orchestrator: SearchOrchestrator,
    synthesizer: ResultSynthesizer,
    max_results: u32,
    language: String,
    timeout: Option<Duration>,
}

impl SearchPipeline {
    /// Create a pipeline with default limits
    pub fn new(llm: Arc<dyn LanguageModelClient>, backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            generator: QueryGenerator::new(llm.clone()),
            orchestrator: SearchOrchestrator::new(backend),
            synthesizer: ResultSynthesizer::new(llm),
            max_results: DEFAULT_MAX_RESULTS,
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: None,
        }
    }

    /// Create a pipeline configured from settings
    ///
    /// `settings` must have passed [`Settings::validate`].
    pub fn from_settings(
        settings: &Settings,
        llm: Arc<dyn LanguageModelClient>,
        backend: Arc<dyn SearchBackend>,
    ) -> Self {
        let mut pipeline = Self::new(llm, backend)
            .with_max_results(settings.search.max_results)
            .with_language(&settings.search.language)
            .with_concurrency(settings.search.concurrency)
            .with_query_timeout(Duration::from_secs_f64(settings.search.query_timeout))
            .with_synthesis_results(settings.pipeline.max_synthesis_results)
            .with_generation_config(settings.llm.generation_config());
        if let Some(secs) = settings.pipeline.timeout {
            pipeline = pipeline.with_timeout(Duration::from_secs_f64(secs));
        }
        pipeline
    }

    /// Results requested per generated query
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    /// Language applied to every generated query
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.orchestrator = self.orchestrator.with_concurrency(concurrency);
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.orchestrator = self.orchestrator.with_query_timeout(timeout);
        self
    }

    /// Results included in the synthesis prompt
    pub fn with_synthesis_results(mut self, max_results: usize) -> Self {
        self.synthesizer = self.synthesizer.with_max_results(max_results);
        self
    }

    /// Use `model` for both model calls
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.generator = self.generator.with_model(model.clone());
        self.synthesizer = self.synthesizer.with_model(model);
        self
    }

    /// Use `config` for both model calls
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generator = self.generator.with_config(config.clone());
        self.synthesizer = self.synthesizer.with_config(config);
        self
    }

    /// Deadline for a whole run; hitting it fails the run as cancelled
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run the pipeline for `user_query`
    pub async fn run(&self, user_query: &str) -> PipelineResult {
        self.run_with_cancellation(user_query, CancellationToken::new())
            .await
    }

    /// Run the pipeline, giving up as soon as `token` is cancelled
    pub async fn run_with_cancellation(
        &self,
        user_query: &str,
        token: CancellationToken,
    ) -> PipelineResult {
        self.run_detailed(user_query, token).await.result
    }

    /// Run the pipeline and return intermediate data alongside the outcome
    pub async fn run_detailed(&self, user_query: &str, token: CancellationToken) -> PipelineReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id);

        async move {
            let mut report = PipelineReport::new(run_id);
            let token = token.child_token();
            let _deadline = self.timeout.map(|after| {
                let token = token.clone();
                AbortOnDrop(tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    token.cancel();
                }))
            });

            let result = self.execute(user_query, &token, &mut report).await;
            match result {
                Ok(ref text) => {
                    info!(stage = ?PipelineStage::Done, "Synthesized {} chars", text.len());
                }
                Err(ref e) => {
                    warn!(
                        stage = ?PipelineStage::Failed,
                        kind = e.kind(),
                        "Pipeline failed: {}",
                        e
                    );
                }
            }
            report.result = result.into();
            report
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        user_query: &str,
        token: &CancellationToken,
        report: &mut PipelineReport,
    ) -> Result<String, PipelineError> {
        info!(stage = ?PipelineStage::Start, "Query: '{}'", user_query);
        let user_query = user_query.trim();
        if user_query.is_empty() {
            return Err(PipelineError::Validation(
                "query must not be empty".to_string(),
            ));
        }
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        info!(stage = ?PipelineStage::GeneratingQueries);
        let generated = guarded(token, self.generator.generate(user_query)).await??;
        report.generated_queries = generated.clone();

        let queries: Vec<Query> = generated
            .iter()
            .filter_map(|text| {
                let query = Query::new(text.as_str(), self.max_results, self.language.as_str());
                match query {
                    Ok(query) => Some(query),
                    Err(e) => {
                        warn!("Skipping generated query '{}': {}", text, e);
                        None
                    }
                }
            })
            .collect();

        info!(stage = ?PipelineStage::Searching, "Searching {} queries", queries.len());
        let aggregate = guarded(token, self.orchestrator.search(&queries)).await?;
        report.search_reports = aggregate.reports().to_vec();

        if aggregate.is_empty() {
            return Err(PipelineError::NoResults);
        }

        let included = aggregate.top(self.synthesizer.max_results());
        report.results_used = included.len();
        info!(
            stage = ?PipelineStage::Synthesizing,
            "Synthesizing from {} of {} results",
            included.len(),
            aggregate.len()
        );
        let synthesis = self.synthesizer.synthesize(user_query, included);
        let text = guarded(token, synthesis).await??;

        Ok(text)
    }
}

/// Run one stage unless `token` fires first; a panic becomes `Unexpected`
async fn guarded<F, T>(token: &CancellationToken, stage: F) -> Result<T, PipelineError>
where
    F: Future<Output = T>,
{
    let stage = AssertUnwindSafe(stage).catch_unwind();
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PipelineError::Cancelled),
        output = stage => output.map_err(|panic| PipelineError::Unexpected(panic_message(panic))),
    }
}
