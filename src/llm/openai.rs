//! OpenAI-compatible chat completion client (OpenAI, vLLM, Ollama, LM Studio)

use super::traits::*;
use crate::config::LlmSettings;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    owned_by: Option<String>,
    created: Option<i64>,
}

/// Client for any service exposing `/chat/completions` and `/models`
pub struct OpenAiCompatibleClient {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    defaults: GenerationConfig,
}

impl OpenAiCompatibleClient {
    /// Create a client for `base_url` (e.g. `http://localhost:11434/v1`)
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(base_url, model, Duration::from_secs(60))
    }

    fn with_timeout(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(LlmError::Config("base_url must not be empty".to_string()));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            model: model.into(),
            api_key: None,
            defaults: GenerationConfig::default(),
        })
    }

    /// Create a client from configuration
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let mut client = Self::with_timeout(
            &settings.base_url,
            &settings.model,
            Duration::from_secs_f64(settings.timeout),
        )?;
        client.api_key = settings.api_key.clone().filter(|k| !k.is_empty());
        client.defaults = settings.generation_config();
        Ok(client)
    }

    /// Set the bearer token
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the generation options used when a call passes none
    pub fn with_defaults(mut self, defaults: GenerationConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LlmError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl LanguageModelClient for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn generate_text(
        &self,
        prompt: &str,
        model: Option<&str>,
        config: Option<&GenerationConfig>,
    ) -> Result<LlmTextResponse, LlmError> {
        let config = config.unwrap_or(&self.defaults);
        let model = model.unwrap_or(&self.model);

        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = config.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(prompt));

        let body = ChatCompletionRequest {
            model,
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            stop: config.stop_sequences.clone(),
            stream: false,
        };

        let start = Instant::now();
        let request = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        let response = self.authorize(request).send().await?;
        let response = Self::check_status(response).await?;

        let text = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, text)))?;
        let elapsed = start.elapsed().as_millis() as u64;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        debug!(
            "Model {} generated {} chars in {}ms",
            model,
            content.len(),
            elapsed
        );

        let model = parsed.model.unwrap_or_else(|| model.to_string());
        let mut result = LlmTextResponse::new(content, model).with_generation_time(elapsed);
        if let Some(tokens) = parsed.usage.and_then(|u| u.completion_tokens) {
            result = result.with_tokens(tokens);
        }
        Ok(result)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let request = self.http_client.get(format!("{}/models", self.base_url));
        let response = self.authorize(request).send().await?;
        let response = Self::check_status(response).await?;

        let parsed: ModelsResponse = response.json().await?;
        Ok(parsed
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                owned_by: m.owned_by,
                created: m.created.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            })
            .collect())
    }
}
