use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use metrics::{counter, histogram};
use serde::Serialize;

use crate::sink::{BlockedPrompt, CascadeOutcome, MetricsSink};

const LATENCY_HISTORY_CAP: usize = 100;
const SNAPSHOT_HISTORY_LEN: usize = 20;

#[derive(Debug, Default)]
struct Counters {
    total_requests: u64,
    successful_requests: u64,
    blocked_requests: u64,
    cascade_failures: u64,
    total_latency_ms: u64,
    provider_usage: BTreeMap<String, u64>,
    pii_detections: u64,
    injection_detections: u64,
    latency_history: VecDeque<u64>,
}

/// Serializable view of [`MetricsStore`] at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub blocked_requests: u64,
    /// Mean latency of successful requests, rounded to two decimals.
    pub average_latency_ms: f64,
    pub provider_usage: BTreeMap<String, u64>,
    pub cascade_failures: u64,
    pub pii_detections: u64,
    pub injection_detections: u64,
    /// Most recent successful latencies, oldest first.
    pub latency_history: Vec<u64>,
}

/// Process-wide request counters behind a single lock.
#[derive(Debug, Default)]
pub struct MetricsStore {
    inner: Mutex<Counters>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means a panic happened mid-update; the counters
    // are still usable.
    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = self.lock();
        let average = if c.successful_requests > 0 {
            c.total_latency_ms as f64 / c.successful_requests as f64
        } else {
            0.0
        };
        let skip = c.latency_history.len().saturating_sub(SNAPSHOT_HISTORY_LEN);

        MetricsSnapshot {
            total_requests: c.total_requests,
            successful_requests: c.successful_requests,
            blocked_requests: c.blocked_requests,
            average_latency_ms: (average * 100.0).round() / 100.0,
            provider_usage: c.provider_usage.clone(),
            cascade_failures: c.cascade_failures,
            pii_detections: c.pii_detections,
            injection_detections: c.injection_detections,
            latency_history: c.latency_history.iter().skip(skip).copied().collect(),
        }
    }

    pub fn reset(&self) {
        *self.lock() = Counters::default();
        tracing::info!("Metrics store reset");
    }
}

impl MetricsSink for MetricsStore {
    fn record_outcome(&self, outcome: &CascadeOutcome) {
        {
            let mut c = self.lock();
            c.total_requests += 1;
            if outcome.success {
                c.successful_requests += 1;
                c.total_latency_ms = c.total_latency_ms.saturating_add(outcome.total_latency_ms);
                c.latency_history.push_back(outcome.total_latency_ms);
                if c.latency_history.len() > LATENCY_HISTORY_CAP {
                    c.latency_history.pop_front();
                }
            } else {
                c.cascade_failures += 1;
            }
            if let Some(provider) = &outcome.provider_used {
                *c.provider_usage.entry(provider.clone()).or_insert(0) += 1;
            }
        }

        let label = if outcome.success { "success" } else { "cascade_failed" };
        counter!("cascadia_requests_total", "outcome" => label).increment(1);
        histogram!("cascadia_cascade_latency_ms").record(outcome.total_latency_ms as f64);
        if let Some(provider) = &outcome.provider_used {
            counter!("cascadia_provider_requests_total", "provider" => provider.clone()).increment(1);
        }
    }

    fn record_blocked(&self, blocked: &BlockedPrompt) {
        {
            let mut c = self.lock();
            c.total_requests += 1;
            c.blocked_requests += 1;
            if blocked.pii_detected {
                c.pii_detections += 1;
            }
            if blocked.injection_detected {
                c.injection_detections += 1;
            }
        }

        counter!("cascadia_requests_total", "outcome" => "blocked").increment(1);
    }
}
