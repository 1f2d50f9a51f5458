//! Sequential provider cascade: first success wins.
//!
//! For each call the engine walks the provider set in configured order,
//! bounds every attempt with a timeout, records one `AttemptRecord` per
//! attempt, and stops at the first provider that returns text. Adapter
//! failures are data; the only error is an empty provider set (or an
//! explicit cancellation).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cascadia_monitoring::{CascadeOutcome, MetricsSink};
use serde::Serialize;
use thiserror::Error;

use crate::backend::{AdapterFailure, AdapterRegistry};
use crate::provider::{ProviderDescriptor, ProviderSet};
use crate::request::CascadeRequest;

pub const ALL_PROVIDERS_FAILED: &str = "All LLM providers failed.";

// ── Attempt trace ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failed,
    Timeout,
}

/// One attempt against one provider. `error_detail` is set exactly when
/// the outcome is not `Success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    #[serde(rename = "provider")]
    provider_name: String,
    model: String,
    #[serde(rename = "status")]
    outcome: AttemptOutcome,
    latency_ms: u64,
    #[serde(rename = "reason")]
    error_detail: Option<String>,
    #[serde(skip)]
    failure_kind: Option<&'static str>,
}

impl AttemptRecord {
    pub fn success(provider: &ProviderDescriptor, latency_ms: u64) -> Self {
        Self {
            provider_name: provider.name().to_string(),
            model: provider.model().to_string(),
            outcome: AttemptOutcome::Success,
            latency_ms,
            error_detail: None,
            failure_kind: None,
        }
    }

    pub fn failure(provider: &ProviderDescriptor, failure: &AdapterFailure, latency_ms: u64) -> Self {
        Self {
            provider_name: provider.name().to_string(),
            model: provider.model().to_string(),
            outcome: if failure.is_timeout() { AttemptOutcome::Timeout } else { AttemptOutcome::Failed },
            latency_ms,
            error_detail: Some(failure.to_string()),
            failure_kind: Some(failure.kind()),
        }
    }

    pub fn provider_name(&self) -> &str { &self.provider_name }
    pub fn model(&self) -> &str { &self.model }
    pub fn outcome(&self) -> AttemptOutcome { self.outcome }
    pub fn latency_ms(&self) -> u64 { self.latency_ms }
    pub fn error_detail(&self) -> Option<&str> { self.error_detail.as_deref() }
    /// Fixed failure category, e.g. `"http"` or `"timeout"`. Carries no
    /// upstream text.
    pub fn failure_kind(&self) -> Option<&'static str> { self.failure_kind }
}

// ── Result ───────────────────────────────────────────────────────────────────

/// Terminal value of one cascade. Either text plus the provider that
/// produced it, or the generic failure message; never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeResult {
    response_text: Option<String>,
    provider_used: Option<String>,
    model_used: Option<String>,
    total_latency_ms: u64,
    attempts: Vec<AttemptRecord>,
    error_message: Option<String>,
}

impl CascadeResult {
    pub fn succeeded(
        text: String,
        provider: &ProviderDescriptor,
        total_latency_ms: u64,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self {
            response_text: Some(text),
            provider_used: Some(provider.name().to_string()),
            model_used: Some(provider.model().to_string()),
            total_latency_ms,
            attempts,
            error_message: None,
        }
    }

    pub fn exhausted(total_latency_ms: u64, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            response_text: None,
            provider_used: None,
            model_used: None,
            total_latency_ms,
            attempts,
            error_message: Some(ALL_PROVIDERS_FAILED.to_string()),
        }
    }

    pub fn is_success(&self) -> bool { self.response_text.is_some() }
    pub fn response_text(&self) -> Option<&str> { self.response_text.as_deref() }
    pub fn provider_used(&self) -> Option<&str> { self.provider_used.as_deref() }
    pub fn model_used(&self) -> Option<&str> { self.model_used.as_deref() }
    pub fn total_latency_ms(&self) -> u64 { self.total_latency_ms }
    pub fn attempts(&self) -> &[AttemptRecord] { &self.attempts }
    pub fn error_message(&self) -> Option<&str> { self.error_message.as_deref() }

    /// Attempts that did not succeed.
    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| a.outcome != AttemptOutcome::Success).count()
    }

    fn outcome(&self) -> CascadeOutcome {
        match &self.provider_used {
            Some(provider) => CascadeOutcome::succeeded(provider.clone(), self.total_latency_ms),
            None => CascadeOutcome::failed(self.total_latency_ms),
        }
    }
}

// ── Errors, settings, cancellation ───────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("no LLM providers are configured")]
    NoProviders,
    #[error("cascade cancelled after {} attempt(s)", .attempts.len())]
    Cancelled { attempts: Vec<AttemptRecord> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSettings {
    /// Budget for one attempt unless the provider overrides it.
    pub attempt_timeout: Duration,
    /// Extra attempts against the same provider before moving on.
    pub retries_per_provider: u32,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self { attempt_timeout: Duration::from_secs(10), retries_per_provider: 0 }
    }
}

/// Shared stop signal, checked before each attempt.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Holds only immutable data; share it behind an `Arc` and call `run`
/// concurrently.
pub struct CascadeEngine {
    providers: ProviderSet,
    adapters: AdapterRegistry,
    settings: CascadeSettings,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl CascadeEngine {
    pub fn new(providers: ProviderSet, adapters: AdapterRegistry, settings: CascadeSettings) -> Self {
        Self { providers, adapters, settings, metrics: None }
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    pub fn providers(&self) -> &ProviderSet { &self.providers }
    pub fn settings(&self) -> &CascadeSettings { &self.settings }

    pub async fn run(&self, request: &CascadeRequest) -> Result<CascadeResult, CascadeError> {
        self.execute(request, None).await
    }

    /// Like [`run`](Self::run), but stops before the next attempt once
    /// `cancel` is set. A cancelled call emits no metrics event.
    pub async fn run_cancellable(
        &self,
        request: &CascadeRequest,
        cancel: &CancelFlag,
    ) -> Result<CascadeResult, CascadeError> {
        self.execute(request, Some(cancel)).await
    }

    async fn execute(
        &self,
        request: &CascadeRequest,
        cancel: Option<&CancelFlag>,
    ) -> Result<CascadeResult, CascadeError> {
        if self.providers.is_empty() {
            tracing::error!("Cascade requested with no providers configured");
            return Err(CascadeError::NoProviders);
        }

        let started = Instant::now();
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            for round in 0..=self.settings.retries_per_provider {
                if cancel.is_some_and(CancelFlag::is_cancelled) {
                    tracing::info!(attempts = attempts.len(), "Cascade cancelled");
                    return Err(CascadeError::Cancelled { attempts });
                }

                let (result, latency_ms) = self.attempt(provider, request).await;
                match result {
                    Ok(text) => {
                        attempts.push(AttemptRecord::success(provider, latency_ms));
                        let total_ms = elapsed_ms(started);
                        tracing::info!(
                            provider = %provider.name(),
                            model = %provider.model(),
                            attempts = attempts.len(),
                            total_latency_ms = total_ms,
                            "Cascade succeeded"
                        );
                        let result = CascadeResult::succeeded(text, provider, total_ms, attempts);
                        self.emit(&result);
                        return Ok(result);
                    }
                    Err(failure) => {
                        tracing::warn!(
                            provider = %provider.name(),
                            outcome = failure.kind(),
                            latency_ms,
                            round,
                            detail = %failure,
                            "Provider attempt failed"
                        );
                        let unsupported = matches!(failure, AdapterFailure::Unsupported(_));
                        attempts.push(AttemptRecord::failure(provider, &failure, latency_ms));
                        if unsupported {
                            break;
                        }
                    }
                }
            }
        }

        let total_ms = elapsed_ms(started);
        tracing::error!(
            attempts = attempts.len(),
            total_latency_ms = total_ms,
            "All LLM providers failed"
        );
        let result = CascadeResult::exhausted(total_ms, attempts);
        self.emit(&result);
        Ok(result)
    }

    /// One bounded call. On timeout the adapter future is dropped, which
    /// aborts the in-flight request.
    async fn attempt(
        &self,
        provider: &ProviderDescriptor,
        request: &CascadeRequest,
    ) -> (Result<String, AdapterFailure>, u64) {
        let budget = provider.timeout().unwrap_or(self.settings.attempt_timeout);
        let started = Instant::now();

        let result = match self.adapters.get(provider.endpoint_kind()) {
            None => Err(AdapterFailure::Unsupported(provider.endpoint_kind())),
            Some(adapter) => {
                match tokio::time::timeout(budget, adapter.complete(provider, request)).await {
                    Ok(result) => result,
                    Err(_) => Err(AdapterFailure::Timeout { after_ms: Some(duration_ms(budget)) }),
                }
            }
        };

        (result, elapsed_ms(started))
    }

    fn emit(&self, result: &CascadeResult) {
        if let Some(sink) = &self.metrics {
            sink.record_outcome(&result.outcome());
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn elapsed_ms(since: Instant) -> u64 {
    duration_ms(since.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascadia_config::EndpointKind;
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;

    fn provider(name: &str) -> ProviderDescriptor {
        ProviderDescriptor::new(
            name,
            SecretString::from("k".to_string()),
            format!("{name}-model"),
            EndpointKind::Gemini,
        )
    }

    #[test]
    fn test_attempt_record_serializes_with_wire_names() {
        let failure = AdapterFailure::Http { status: 503 };
        let rec = AttemptRecord::failure(&provider("gemini"), &failure, 12);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "provider": "gemini",
                "model": "gemini-model",
                "status": "failed",
                "latency_ms": 12,
                "reason": "HTTP status 503"
            })
        );
    }

    #[test]
    fn test_timeout_failure_maps_to_timeout_outcome() {
        let failure = AdapterFailure::Timeout { after_ms: Some(5) };
        let rec = AttemptRecord::failure(&provider("a"), &failure, 5);
        assert_eq!(rec.outcome(), AttemptOutcome::Timeout);
        assert!(rec.error_detail().is_some());
        assert_eq!(rec.failure_kind(), Some("timeout"));
        assert_eq!(AttemptRecord::success(&provider("a"), 1).failure_kind(), None);
    }

    #[test]
    fn test_result_invariant_by_construction() {
        let attempts = vec![AttemptRecord::success(&provider("a"), 3)];
        let ok = CascadeResult::succeeded("hi".into(), &provider("a"), 3, attempts);
        assert!(ok.is_success());
        assert_eq!(ok.provider_used(), Some("a"));
        assert_eq!(ok.model_used(), Some("a-model"));
        assert!(ok.error_message().is_none());

        let failed = CascadeResult::exhausted(9, vec![]);
        assert!(!failed.is_success());
        assert!(failed.provider_used().is_none());
        assert_eq!(failed.error_message(), Some(ALL_PROVIDERS_FAILED));
    }

    #[tokio::test]
    async fn test_empty_set_is_a_configuration_error() {
        let engine =
            CascadeEngine::new(ProviderSet::empty(), AdapterRegistry::new(), CascadeSettings::default());
        let req = CascadeRequest::with_defaults("hello").unwrap();
        assert!(matches!(engine.run(&req).await, Err(CascadeError::NoProviders)));
    }

    #[tokio::test]
    async fn test_missing_adapter_is_recorded_not_panicked() {
        let set = ProviderSet::new(vec![provider("a"), provider("b")]).unwrap();
        let engine = CascadeEngine::new(
            set,
            AdapterRegistry::new(),
            CascadeSettings { retries_per_provider: 2, ..CascadeSettings::default() },
        );
        let req = CascadeRequest::with_defaults("hello").unwrap();
        let result = engine.run(&req).await.unwrap();

        assert_eq!(result.attempts().len(), 2);
        assert!(result.attempts().iter().all(|a| a.outcome() == AttemptOutcome::Failed));
        assert!(result.attempts()[0].error_detail().unwrap().contains("no adapter registered"));
    }

    #[test]
    fn test_cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
    }
}
