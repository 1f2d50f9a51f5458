//! HTTP handlers for all gateway routes.

pub mod batch;
pub mod health;
pub mod metrics;
pub mod providers;
pub mod query;

use cascadia_llm::{AttemptOutcome, AttemptRecord};
use cascadia_monitoring::{BlockedPrompt, MetricsSink};
use cascadia_security::BlockReport;
use serde::Serialize;

use crate::state::AppState;

const PREVIEW_CHARS: usize = 50;

/// One cascade step as shown to callers. Upstream error text stays in the
/// logs; only the failure category is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeStep {
    pub provider: String,
    pub model: String,
    pub status: AttemptOutcome,
    pub latency_ms: u64,
    pub failure: Option<&'static str>,
}

impl From<&AttemptRecord> for CascadeStep {
    fn from(record: &AttemptRecord) -> Self {
        Self {
            provider: record.provider_name().to_string(),
            model: record.model().to_string(),
            status: record.outcome(),
            latency_ms: record.latency_ms(),
            failure: record.failure_kind(),
        }
    }
}

pub(crate) fn cascade_path(attempts: &[AttemptRecord]) -> Vec<CascadeStep> {
    attempts.iter().map(CascadeStep::from).collect()
}

/// Count a screened prompt in the metrics store.
pub(crate) fn record_block(state: &AppState, report: &BlockReport) {
    state.metrics.record_blocked(&BlockedPrompt {
        pii_detected: report.pii_detected(),
        injection_detected: report.injection_detected(),
    });
}

/// First 50 characters of a prompt, with an ellipsis when cut.
pub(crate) fn preview(prompt: &str) -> String {
    match prompt.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &prompt[..idx]),
        None => prompt.to_string(),
    }
}
