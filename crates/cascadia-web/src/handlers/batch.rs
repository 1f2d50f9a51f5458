//! Batch endpoints for exercising the cascade and the screen in bulk.
//! Oversized batches are truncated, not rejected.

use axum::extract::State;
use axum::Json;
use cascadia_llm::CascadeRequest;
use cascadia_security::PiiReport;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::{cascade_path, preview, record_block, CascadeStep};
use crate::state::SharedState;

pub const RESILIENCE_BATCH_LIMIT: usize = 10;
pub const SECURITY_BATCH_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub prompts: Vec<String>,
}

// ── Resilience ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ResilienceItem {
    pub prompt: String,
    pub success: bool,
    pub provider: Option<String>,
    pub latency_ms: u64,
    pub cascade_path: Vec<CascadeStep>,
    pub failures_in_cascade: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResilienceItem {
    fn rejected(prompt: &str, error: String) -> Self {
        Self {
            prompt: preview(prompt),
            success: false,
            provider: None,
            latency_ms: 0,
            cascade_path: Vec::new(),
            failures_in_cascade: 0,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResilienceReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_cascade_failures: usize,
    pub average_latency_ms: f64,
    pub results: Vec<ResilienceItem>,
}

/// Run each prompt through the screen and the cascade with default
/// parameters. Per-prompt problems are reported inline.
pub async fn batch_resilience(
    State(state): State<SharedState>,
    Json(body): Json<BatchBody>,
) -> Result<Json<ResilienceReport>, ApiError> {
    if state.engine.providers().is_empty() {
        return Err(ApiError::NoProviders);
    }

    let mut results = Vec::new();
    for prompt in body.prompts.iter().take(RESILIENCE_BATCH_LIMIT) {
        let request = match CascadeRequest::with_defaults(prompt.as_str()) {
            Ok(r) => r,
            Err(e) => {
                results.push(ResilienceItem::rejected(prompt, e.to_string()));
                continue;
            }
        };

        let report = state.screen.inspect(request.prompt());
        if report.is_blocked() {
            record_block(&state, &report);
            let error = format!("Security Alert: {}.", report.reasons().join("; "));
            results.push(ResilienceItem::rejected(prompt, error));
            continue;
        }

        let result = state.engine.run(&request).await?;
        results.push(ResilienceItem {
            prompt: preview(prompt),
            success: result.is_success(),
            provider: result.provider_used().map(str::to_string),
            latency_ms: result.total_latency_ms(),
            failures_in_cascade: result.failed_attempts(),
            error: result.error_message().map(str::to_string),
            cascade_path: cascade_path(result.attempts()),
        });
    }

    let successful: Vec<&ResilienceItem> = results.iter().filter(|r| r.success).collect();
    let average_latency_ms = if successful.is_empty() {
        0.0
    } else {
        let total: u64 = successful.iter().map(|r| r.latency_ms).sum();
        (total as f64 / successful.len() as f64 * 100.0).round() / 100.0
    };

    Ok(Json(ResilienceReport {
        total: results.len(),
        successful: successful.len(),
        failed: results.len() - successful.len(),
        total_cascade_failures: results.iter().map(|r| r.failures_in_cascade).sum(),
        average_latency_ms,
        results,
    }))
}

// ── Security ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SecurityItem {
    pub prompt: String,
    pub blocked: bool,
    pub injection_detected: bool,
    pub pii_detected: Vec<&'static str>,
    pub pii_matches: PiiReport,
}

#[derive(Debug, Serialize)]
pub struct SecurityReport {
    pub total: usize,
    pub blocked: usize,
    pub passed: usize,
    /// Distinct PII kinds summed over all prompts.
    pub pii_leaks_prevented: usize,
    pub injection_attempts_blocked: usize,
    pub results: Vec<SecurityItem>,
}

/// Screen each prompt without calling any provider.
pub async fn batch_security(
    State(state): State<SharedState>,
    Json(body): Json<BatchBody>,
) -> Json<SecurityReport> {
    let mut results = Vec::new();
    let mut pii_leaks_prevented = 0;
    let mut injection_attempts_blocked = 0;

    for prompt in body.prompts.iter().take(SECURITY_BATCH_LIMIT) {
        let report = state.screen.inspect(prompt);
        if report.is_blocked() {
            record_block(&state, &report);
        }
        pii_leaks_prevented += report.pii_kinds().len();
        injection_attempts_blocked += usize::from(report.injection_detected());

        results.push(SecurityItem {
            prompt: preview(prompt),
            blocked: report.is_blocked(),
            injection_detected: report.injection_detected(),
            pii_detected: report.pii_kinds().iter().map(|k| k.as_str()).collect(),
            pii_matches: report.pii,
        });
    }

    let blocked = results.iter().filter(|r| r.blocked).count();
    Json(SecurityReport {
        total: results.len(),
        blocked,
        passed: results.len() - blocked,
        pii_leaks_prevented,
        injection_attempts_blocked,
        results,
    })
}
