//! Scripted collaborators for unit tests

use crate::backends::{BackendError, SearchBackend};
use crate::llm::{GenerationConfig, LanguageModelClient, LlmError, LlmTextResponse};
use crate::query::Query;
use crate::results::{SearchOutcome, SearchResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Language model answering from a fixed script, recording every prompt
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
    models: Mutex<Vec<Option<String>>>,
    delay: Duration,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(vec![]),
            models: Mutex::new(vec![]),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn models(&self) -> Vec<Option<String>> {
        self.models.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModelClient for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn generate_text(
        &self,
        prompt: &str,
        model: Option<&str>,
        _config: Option<&GenerationConfig>,
    ) -> Result<LlmTextResponse, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.models.lock().unwrap().push(model.map(|m| m.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse));
        next.map(|text| LlmTextResponse::new(text, "scripted-model"))
    }
}

/// Scripted reply of [`FakeBackend`] for one query text
#[derive(Clone)]
pub enum Reply {
    Results(Vec<SearchResult>),
    Failure(String),
    Panic,
}

/// Search backend replying per query text after an optional delay
pub struct FakeBackend {
    replies: HashMap<String, (Duration, Reply)>,
    calls: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: Mutex::new(vec![]),
            completed: Mutex::new(vec![]),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn reply(mut self, query: &str, delay_ms: u64, reply: Reply) -> Self {
        self.replies
            .insert(query.to_string(), (Duration::from_millis(delay_ms), reply));
        self
    }

    /// Queries in the order they were dispatched
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Queries in the order they finished
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search(&self, query: &Query) -> SearchOutcome {
        self.calls.lock().unwrap().push(query.text().to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let (delay, reply) = self
            .replies
            .get(query.text())
            .cloned()
            .unwrap_or((Duration::ZERO, Reply::Results(vec![])));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().unwrap().push(query.text().to_string());

        match reply {
            Reply::Results(results) => SearchOutcome::success(results),
            Reply::Failure(reason) => SearchOutcome::failure(reason),
            Reply::Panic => panic!("backend exploded on '{}'", query.text()),
        }
    }

    async fn fetch_page_content(&self, url: &str) -> Result<String, BackendError> {
        Ok(format!("content of {}", url))
    }
}

/// `count` results titled `<prefix>-<n>` on distinct URLs
pub fn hits(prefix: &str, count: usize) -> Vec<SearchResult> {
    (0..count)
        .map(|n| {
            SearchResult::new(
                format!("{}-{}", prefix, n),
                format!("https://{}.example.com/{}", prefix, n),
                format!("snippet {} of {}", n, prefix),
            )
        })
        .collect()
}
