//! Pre-cascade prompt screen. A blocked prompt never reaches a provider.

use serde::Serialize;

use crate::injection::detect_injection;
use crate::pii::{detect_pii, PiiKind, PiiReport};

/// What the screen found in one prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockReport {
    pub injection_patterns: Vec<&'static str>,
    pub pii: PiiReport,
}

impl BlockReport {
    pub fn injection_detected(&self) -> bool {
        !self.injection_patterns.is_empty()
    }

    pub fn pii_detected(&self) -> bool {
        self.pii.has_pii()
    }

    pub fn is_blocked(&self) -> bool {
        self.injection_detected() || self.pii_detected()
    }

    pub fn pii_kinds(&self) -> Vec<PiiKind> {
        self.pii.kinds()
    }

    /// Human-readable reasons, without the matched values.
    pub fn reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if self.injection_detected() {
            reasons.push("Prompt injection pattern detected".to_string());
        }
        if self.pii_detected() {
            let kinds: Vec<&str> = self.pii.kinds().iter().map(PiiKind::as_str).collect();
            reasons.push(format!("PII detected: {}", kinds.join(", ")));
        }
        reasons
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenVerdict {
    Pass,
    Blocked(BlockReport),
}

impl ScreenVerdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, ScreenVerdict::Blocked(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptScreen {
    pub injection_check: bool,
    pub pii_check: bool,
}

impl Default for PromptScreen {
    fn default() -> Self {
        Self { injection_check: true, pii_check: true }
    }
}

impl PromptScreen {
    pub fn new(injection_check: bool, pii_check: bool) -> Self {
        Self { injection_check, pii_check }
    }

    /// Run the enabled detectors and report everything found.
    pub fn inspect(&self, prompt: &str) -> BlockReport {
        BlockReport {
            injection_patterns: if self.injection_check { detect_injection(prompt) } else { Vec::new() },
            pii: if self.pii_check { detect_pii(prompt) } else { PiiReport::default() },
        }
    }

    pub fn screen(&self, prompt: &str) -> ScreenVerdict {
        let report = self.inspect(prompt);
        if report.is_blocked() {
            tracing::warn!(
                injection = ?report.injection_patterns,
                pii = ?report.pii_kinds(),
                "Prompt blocked by security screen"
            );
            ScreenVerdict::Blocked(report)
        } else {
            ScreenVerdict::Pass
        }
    }
}
