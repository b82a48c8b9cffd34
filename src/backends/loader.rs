//! Backend loader for initializing backends from configuration

use super::duckduckgo::DuckDuckGoBackend;
use super::multi::MultiBackend;
use super::searxng::SearxngBackend;
use super::traits::SearchBackend;
use crate::config::{BackendConfig, BackendKind, Settings};
use crate::network::HttpClient;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Loader for initializing backends from configuration
pub struct BackendLoader;

impl BackendLoader {
    /// Build the configured backend set
    ///
    /// A single enabled backend is returned as is; several are wrapped in
    /// a [`MultiBackend`].
    pub fn load(settings: &Settings, client: &HttpClient) -> Result<Arc<dyn SearchBackend>> {
        let mut backends: Vec<Arc<dyn SearchBackend>> = Vec::new();

        for config in &settings.search.backends {
            if config.disabled {
                info!("Skipping disabled backend: {}", config.name);
                continue;
            }

            match Self::create_backend(config, client) {
                Ok(backend) => {
                    info!("Loaded backend: {} ({:?})", config.name, config.kind);
                    backends.push(backend);
                }
                Err(e) => {
                    warn!("Failed to load backend {}: {}", config.name, e);
                }
            }
        }

        match backends.len() {
            0 => Err(anyhow!("no usable search backend configured")),
            1 => Ok(backends.remove(0)),
            n => {
                info!("Loaded {} backends", n);
                Ok(Arc::new(MultiBackend::new(backends)))
            }
        }
    }

    /// Create a backend instance from its configuration
    fn create_backend(
        config: &BackendConfig,
        client: &HttpClient,
    ) -> Result<Arc<dyn SearchBackend>> {
        let timeout = config.timeout.map(Duration::from_secs_f64);

        let backend: Arc<dyn SearchBackend> = match config.kind {
            BackendKind::Searxng => {
                let base_url = config
                    .base_url
                    .as_deref()
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| anyhow!("searxng backend requires base_url"))?;
                let mut backend = SearxngBackend::new(base_url, client.clone());
                if !config.name.is_empty() {
                    backend = backend.with_name(&config.name);
                }
                if let Some(timeout) = timeout {
                    backend = backend.with_timeout(timeout);
                }
                Arc::new(backend)
            }
            BackendKind::Duckduckgo => {
                let mut backend = DuckDuckGoBackend::new(client.clone());
                if let Some(url) = config.base_url.as_deref() {
                    backend = backend.with_endpoint(url);
                }
                if let Some(timeout) = timeout {
                    backend = backend.with_timeout(timeout);
                }
                Arc::new(backend)
            }
        };

        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::new().unwrap()
    }

    #[test]
    fn test_load_defaults() {
        let backend = BackendLoader::load(&Settings::default(), &client()).unwrap();
        assert_eq!(backend.name(), "duckduckgo");
    }

    #[test]
    fn test_load_multiple() {
        let mut settings = Settings::default();
        settings.search.backends[0].disabled = false;

        let backend = BackendLoader::load(&settings, &client()).unwrap();
        assert_eq!(backend.name(), "searxng+duckduckgo");
    }

    #[test]
    fn test_searxng_without_url_is_skipped() {
        let mut settings = Settings::default();
        settings.search.backends = vec![BackendConfig {
            name: "broken".to_string(),
            kind: BackendKind::Searxng,
            ..Default::default()
        }];

        assert!(BackendLoader::load(&settings, &client()).is_err());
    }
}
