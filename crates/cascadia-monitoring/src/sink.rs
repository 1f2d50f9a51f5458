use serde::Serialize;

/// One finished cascade, as seen by metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeOutcome {
    /// Name of the provider that answered, `None` when every provider failed.
    pub provider_used: Option<String>,
    pub total_latency_ms: u64,
    pub success: bool,
}

impl CascadeOutcome {
    pub fn succeeded(provider: impl Into<String>, total_latency_ms: u64) -> Self {
        Self { provider_used: Some(provider.into()), total_latency_ms, success: true }
    }

    pub fn failed(total_latency_ms: u64) -> Self {
        Self { provider_used: None, total_latency_ms, success: false }
    }
}

/// A prompt stopped by the security screen before reaching any provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlockedPrompt {
    pub pii_detected: bool,
    pub injection_detected: bool,
}

/// Receiver of post-cascade events. Implementations must be cheap and must
/// not block the caller for long; they run on the request path.
pub trait MetricsSink: Send + Sync {
    fn record_outcome(&self, outcome: &CascadeOutcome);

    fn record_blocked(&self, _blocked: &BlockedPrompt) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record_outcome(&self, _outcome: &CascadeOutcome) {}
}
