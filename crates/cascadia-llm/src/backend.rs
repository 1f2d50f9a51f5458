//! Backend adapter trait and the HTTP adapters.
//!
//! Adapters:
//!   OpenAiCompatibleAdapter: `/chat/completions` with a bearer token (Groq,
//!                            OpenRouter, OpenAI, vLLM, ...)
//!   GeminiAdapter:           Google `generateContent`, key in the query string
//!   AnthropicAdapter:        Anthropic Messages API
//!
//! Every adapter makes exactly one outbound call per invocation and turns
//! every failure into an [`AdapterFailure`] value.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cascadia_config::EndpointKind;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::provider::ProviderDescriptor;
use crate::request::CascadeRequest;
use crate::response::{AnthropicResponse, GeminiResponse, OpenAiChatResponse, ProviderResponse};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const ERROR_BODY_LOG_LIMIT: usize = 512;

// ── Failure ──────────────────────────────────────────────────────────────────

/// Why a single attempt did not produce text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterFailure {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {status}")]
    Http { status: u16 },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("timed out{}", .after_ms.map(|ms| format!(" after {ms} ms")).unwrap_or_default())]
    Timeout { after_ms: Option<u64> },
    #[error("no adapter registered for endpoint kind '{0}'")]
    Unsupported(EndpointKind),
}

impl AdapterFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterFailure::Network(_) => "network",
            AdapterFailure::Http { .. } => "http",
            AdapterFailure::MalformedResponse(_) => "malformed_response",
            AdapterFailure::Timeout { .. } => "timeout",
            AdapterFailure::Unsupported(_) => "unsupported",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AdapterFailure::Timeout { .. })
    }
}

impl From<reqwest::Error> for AdapterFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return AdapterFailure::Timeout { after_ms: None };
        }
        // The Gemini key rides in the query string; never surface the URL.
        let err = err.without_url();
        if err.is_decode() {
            AdapterFailure::MalformedResponse(err.to_string())
        } else {
            AdapterFailure::Network(err.to_string())
        }
    }
}

// ── Trait ────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Wire protocol this adapter speaks.
    fn kind(&self) -> EndpointKind;

    /// Send one request to `provider` and return the generated text.
    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &CascadeRequest,
    ) -> Result<String, AdapterFailure>;
}

// ── Helper: status check + typed decode ──────────────────────────────────────

async fn decode<T: DeserializeOwned>(
    provider: &ProviderDescriptor,
    resp: reqwest::Response,
) -> Result<T, AdapterFailure> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(ERROR_BODY_LOG_LIMIT).collect();
        tracing::debug!(
            provider = %provider.name(),
            status = status.as_u16(),
            body = %snippet,
            "Upstream returned an error status"
        );
        return Err(AdapterFailure::Http { status: status.as_u16() });
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| AdapterFailure::MalformedResponse(e.to_string()))
}

// ── 1. OpenAI-compatible (Groq, OpenRouter, OpenAI, vLLM, ...) ───────────────

pub struct OpenAiCompatibleAdapter {
    client: reqwest::Client,
}

impl OpenAiCompatibleAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendAdapter for OpenAiCompatibleAdapter {
    fn kind(&self) -> EndpointKind { EndpointKind::OpenAiCompatible }

    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &CascadeRequest,
    ) -> Result<String, AdapterFailure> {
        let url = format!("{}/chat/completions", provider.endpoint_root());
        let body = serde_json::json!({
            "model":       provider.model(),
            "messages":    [{"role": "user", "content": request.prompt()}],
            "max_tokens":  request.max_tokens(),
            "temperature": request.temperature(),
        });

        let resp = self.client
            .post(&url)
            .bearer_auth(provider.credential().expose_secret())
            .json(&body)
            .send()
            .await?;

        let parsed: OpenAiChatResponse = decode(provider, resp).await?;
        ProviderResponse::OpenAiChat(parsed).into_text()
    }
}

// ── 2. Google Gemini ─────────────────────────────────────────────────────────

pub struct GeminiAdapter {
    client: reqwest::Client,
}

impl GeminiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendAdapter for GeminiAdapter {
    fn kind(&self) -> EndpointKind { EndpointKind::Gemini }

    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &CascadeRequest,
    ) -> Result<String, AdapterFailure> {
        let url = format!(
            "{}/models/{}:generateContent",
            provider.endpoint_root(),
            provider.model()
        );
        let body = serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": request.prompt()}]}],
            "generationConfig": {
                "maxOutputTokens": request.max_tokens(),
                "temperature":     request.temperature(),
            },
        });

        let resp = self.client
            .post(&url)
            .query(&[("key", provider.credential().expose_secret())])
            .json(&body)
            .send()
            .await?;

        let parsed: GeminiResponse = decode(provider, resp).await?;
        ProviderResponse::Gemini(parsed).into_text()
    }
}

// ── 3. Anthropic (claude-*) ──────────────────────────────────────────────────

pub struct AnthropicAdapter {
    client: reqwest::Client,
}

impl AnthropicAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendAdapter for AnthropicAdapter {
    fn kind(&self) -> EndpointKind { EndpointKind::Anthropic }

    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &CascadeRequest,
    ) -> Result<String, AdapterFailure> {
        let url = format!("{}/messages", provider.endpoint_root());
        let body = serde_json::json!({
            "model":       provider.model(),
            "messages":    [{"role": "user", "content": request.prompt()}],
            "max_tokens":  request.max_tokens(),
            "temperature": request.temperature(),
        });

        let resp = self.client
            .post(&url)
            .header("x-api-key", provider.credential().expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let parsed: AnthropicResponse = decode(provider, resp).await?;
        ProviderResponse::Anthropic(parsed).into_text()
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Adapters keyed by the protocol they speak.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<EndpointKind, Arc<dyn BackendAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three HTTP adapters sharing one client.
    pub fn http(client: reqwest::Client) -> Self {
        Self::new()
            .with(Arc::new(OpenAiCompatibleAdapter::new(client.clone())))
            .with(Arc::new(GeminiAdapter::new(client.clone())))
            .with(Arc::new(AnthropicAdapter::new(client)))
    }

    /// Register `adapter`, replacing any adapter for the same kind.
    pub fn register(&mut self, adapter: Arc<dyn BackendAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn BackendAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, kind: EndpointKind) -> Option<&Arc<dyn BackendAdapter>> {
        self.adapters.get(&kind)
    }

    pub fn kinds(&self) -> Vec<EndpointKind> {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry").field("kinds", &self.kinds()).finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
