//! Settings structures for searchsynth configuration

use crate::llm::GenerationConfig;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main settings structure matching `searchsynth.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub pipeline: PipelineSettings,
    pub outgoing: OutgoingSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Merge with environment variables (SEARCHSYNTH_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("SEARCHSYNTH_LLM_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Ok(val) = std::env::var("SEARCHSYNTH_LLM_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("SEARCHSYNTH_LLM_API_KEY") {
            self.llm.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("SEARCHSYNTH_LANGUAGE") {
            self.search.language = val;
        }
        if let Ok(val) = std::env::var("SEARCHSYNTH_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                self.search.concurrency = n;
            }
        }
        if let Ok(val) = std::env::var("SEARCHSYNTH_SEARXNG_URL") {
            self.search.set_searxng_url(val);
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.search.max_results == 0 {
            bail!("search.max_results must be greater than zero");
        }
        if self.search.concurrency == 0 {
            bail!("search.concurrency must be greater than zero");
        }
        if self.pipeline.max_synthesis_results == 0 {
            bail!("pipeline.max_synthesis_results must be greater than zero");
        }
        if self.search.enabled_backends().is_empty() {
            bail!("no search backend is enabled");
        }
        if self.llm.base_url.trim().is_empty() {
            bail!("llm.base_url must be set");
        }

        check_timeout("llm.timeout", self.llm.timeout)?;
        check_timeout("search.query_timeout", self.search.query_timeout)?;
        check_timeout("outgoing.request_timeout", self.outgoing.request_timeout)?;
        if let Some(secs) = self.pipeline.timeout {
            check_timeout("pipeline.timeout", secs)?;
        }
        for backend in &self.search.backends {
            if let Some(secs) = backend.timeout {
                check_timeout(&format!("search.backends[{}].timeout", backend.name), secs)?;
            }
        }
        Ok(())
    }
}

/// Timeouts become `Duration`s, so they must be finite and positive
fn check_timeout(field: &str, secs: f64) -> Result<()> {
    if !secs.is_finite() || secs <= 0.0 {
        bail!("{} must be a positive number of seconds, got {}", field, secs);
    }
    Ok(())
}

/// Language model service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible API root, e.g. `http://localhost:11434/v1`
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout: f64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub system_prompt: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let defaults = GenerationConfig::default();
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1".to_string(),
            api_key: None,
            timeout: 60.0,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            top_p: defaults.top_p,
            system_prompt: None,
        }
    }
}

impl LlmSettings {
    /// Generation options derived from these settings
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            stop_sequences: vec![],
            system_prompt: self.system_prompt.clone(),
        }
    }
}

/// Search behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub backends: Vec<BackendConfig>,
    /// Results requested per generated query
    pub max_results: u32,
    /// Language applied to every generated query
    pub language: String,
    /// Maximum queries in flight at once
    pub concurrency: usize,
    /// Per-query deadline in seconds
    pub query_timeout: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            max_results: 5,
            language: "en".to_string(),
            concurrency: 4,
            query_timeout: 10.0,
        }
    }
}

impl SearchSettings {
    /// Get all enabled backends
    pub fn enabled_backends(&self) -> Vec<&BackendConfig> {
        self.backends.iter().filter(|b| !b.disabled).collect()
    }

    /// Get backend config by name
    pub fn get_backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// Enable the SearXNG backend at `url`, adding it if missing
    fn set_searxng_url(&mut self, url: String) {
        match self.backends.iter_mut().find(|b| b.kind == BackendKind::Searxng) {
            Some(backend) => {
                backend.base_url = Some(url);
                backend.disabled = false;
            }
            None => self.backends.insert(
                0,
                BackendConfig {
                    name: "searxng".to_string(),
                    kind: BackendKind::Searxng,
                    base_url: Some(url),
                    ..Default::default()
                },
            ),
        }
    }
}

/// Supported backend implementations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Searxng,
    #[default]
    Duckduckgo,
}

/// Individual backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend name (unique identifier)
    pub name: String,
    pub kind: BackendKind,
    /// Instance URL, required for SearXNG
    pub base_url: Option<String>,
    pub disabled: bool,
    /// Custom request timeout in seconds
    pub timeout: Option<f64>,
}

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Results passed to the synthesis prompt
    pub max_synthesis_results: usize,
    /// Whole-run deadline in seconds
    pub timeout: Option<f64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_synthesis_results: 5,
            timeout: None,
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Fixed user agent (none = random browser agent)
    pub user_agent: Option<String>,
    /// Pool max idle connections per host
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    pub proxies: ProxySettings,
    /// Extra headers to send
    pub extra_headers: HashMap<String, String>,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 8.0,
            user_agent: None,
            pool_maxsize: 20,
            verify_ssl: true,
            proxies: ProxySettings::default(),
            extra_headers: HashMap::new(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// Default backend configurations
fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig {
            name: "searxng".to_string(),
            kind: BackendKind::Searxng,
            base_url: Some("http://localhost:8888".to_string()),
            disabled: true,
            ..Default::default()
        },
        BackendConfig {
            name: "duckduckgo".to_string(),
            kind: BackendKind::Duckduckgo,
            ..Default::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.search.max_results, 5);
        assert_eq!(settings.pipeline.max_synthesis_results, 5);
        assert_eq!(settings.llm.max_tokens, 1000);
        assert_eq!(settings.search.enabled_backends().len(), 1);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_backend_lookup() {
        let settings = Settings::default();
        let searxng = settings.search.get_backend("searxng").unwrap();
        assert_eq!(searxng.kind, BackendKind::Searxng);
        assert!(searxng.disabled);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
llm:
  model: qwen3:8b
  temperature: 0.2
search:
  concurrency: 2
  backends:
    - name: local
      kind: searxng
      base_url: http://searx.lan
"#;
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.llm.model, "qwen3:8b");
        assert_eq!(settings.llm.temperature, 0.2);
        assert_eq!(settings.llm.top_p, 0.9);
        assert_eq!(settings.search.concurrency, 2);
        assert_eq!(settings.search.max_results, 5);
        assert_eq!(settings.search.backends.len(), 1);
        assert_eq!(settings.search.backends[0].kind, BackendKind::Searxng);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut settings = Settings::default();
        settings.search.max_results = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.search.concurrency = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.pipeline.max_synthesis_results = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_timeouts() {
        let cases: Vec<(&str, fn(&mut Settings))> = vec![
            ("llm.timeout", |s: &mut Settings| s.llm.timeout = 0.0),
            ("search.query_timeout", |s: &mut Settings| s.search.query_timeout = -1.0),
            ("outgoing.request_timeout", |s: &mut Settings| {
                s.outgoing.request_timeout = f64::NAN
            }),
            ("pipeline.timeout", |s: &mut Settings| {
                s.pipeline.timeout = Some(f64::INFINITY)
            }),
            ("search.backends[duckduckgo].timeout", |s: &mut Settings| {
                s.search.backends[1].timeout = Some(-0.5)
            }),
        ];

        for (field, corrupt) in cases {
            let mut settings = Settings::default();
            corrupt(&mut settings);
            let err = settings.validate().unwrap_err();
            assert!(err.to_string().contains(field), "{}: {}", field, err);
        }
    }

    #[test]
    fn test_validate_accepts_fractional_timeouts() {
        let mut settings = Settings::default();
        settings.search.query_timeout = 0.25;
        settings.pipeline.timeout = Some(1.5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_negative_timeout_from_yaml_fails_validation() {
        let yaml = "search:\n  query_timeout: -1.0\n  backends:\n    - kind: duckduckgo\n";
        let settings = Settings::from_yaml(yaml).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_no_backends() {
        let mut settings = Settings::default();
        for backend in &mut settings.search.backends {
            backend.disabled = true;
        }
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("no search backend"));
    }

    #[test]
    fn test_set_searxng_url_enables_backend() {
        let mut search = SearchSettings::default();
        search.set_searxng_url("http://searx.example".to_string());
        let searxng = search.get_backend("searxng").unwrap();
        assert!(!searxng.disabled);
        assert_eq!(searxng.base_url.as_deref(), Some("http://searx.example"));

        let mut search = SearchSettings {
            backends: vec![],
            ..Default::default()
        };
        search.set_searxng_url("http://other".to_string());
        assert_eq!(search.enabled_backends().len(), 1);
    }

    #[test]
    fn test_generation_config_from_settings() {
        let llm = LlmSettings {
            system_prompt: Some("sys".to_string()),
            ..Default::default()
        };
        let config = llm.generation_config();
        assert_eq!(config.system_prompt.as_deref(), Some("sys"));
        assert_eq!(config.temperature, 0.7);
    }
}
