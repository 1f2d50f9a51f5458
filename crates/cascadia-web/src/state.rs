//! Shared application state for the gateway.

use std::sync::Arc;

use anyhow::Context;
use cascadia_config::{GatewayConfig, RateLimit};
use cascadia_llm::{AdapterRegistry, CascadeEngine, CascadeSettings, ProviderSet};
use cascadia_monitoring::MetricsStore;
use cascadia_security::{ApiKeyGuard, PromptScreen};
use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::SecretString;

use crate::rate_limit::RateLimiter;

/// Everything a handler needs. Immutable after startup apart from the
/// internally synchronized metrics store and rate limiter.
pub struct AppState {
    pub engine: Arc<CascadeEngine>,
    pub metrics: Arc<MetricsStore>,
    pub screen: PromptScreen,
    pub api_key: ApiKeyGuard,
    pub rate_limiter: RateLimiter,
    pub prometheus: Option<PrometheusHandle>,
    pub allowed_origins: Vec<String>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// State around `engine`, reporting into `metrics`. Protected routes
    /// answer 500 until an API key is set with [`with_api_key`](Self::with_api_key).
    pub fn new(engine: CascadeEngine, metrics: Arc<MetricsStore>) -> Self {
        let engine = engine.with_metrics_sink(metrics.clone());
        Self {
            engine: Arc::new(engine),
            metrics,
            screen: PromptScreen::default(),
            api_key: ApiKeyGuard::new(None),
            rate_limiter: RateLimiter::new(RateLimit::default()),
            prometheus: None,
            allowed_origins: vec!["*".to_string()],
        }
    }

    pub fn with_api_key(mut self, key: Option<SecretString>) -> Self {
        self.api_key = ApiKeyGuard::new(key);
        self
    }

    pub fn with_screen(mut self, screen: PromptScreen) -> Self {
        self.screen = screen;
        self
    }

    pub fn with_rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limiter = RateLimiter::new(limit);
        self
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Wire the real HTTP adapters from startup configuration.
    pub fn from_config(config: GatewayConfig) -> anyhow::Result<Self> {
        let settings = CascadeSettings {
            attempt_timeout: config.provider_timeout,
            retries_per_provider: config.provider_retries,
        };

        let providers = ProviderSet::from_settings(config.providers)
            .context("invalid provider configuration")?;
        if providers.is_empty() {
            tracing::warn!("No LLM providers configured; /query will answer 503 until an API key is set");
        } else {
            tracing::info!(providers = ?providers.names(), "Cascade order");
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("cascadia/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        let engine = CascadeEngine::new(providers, AdapterRegistry::http(client), settings);

        Ok(Self::new(engine, Arc::new(MetricsStore::new()))
            .with_api_key(config.service_api_key)
            .with_screen(PromptScreen::new(config.injection_check, config.pii_check))
            .with_rate_limit(config.rate_limit)
            .with_allowed_origins(config.allowed_origins))
    }
}
