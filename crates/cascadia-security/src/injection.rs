//! Prompt injection detection.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// (label, pattern) pairs, matched case-insensitively.
    static ref INJECTION_PATTERNS: Vec<(&'static str, Regex)> = [
        ("ignore_instructions", r"(?i)ignore\s+(all\s+)?(previous|above|prior)\s+instructions?"),
        ("disregard_instructions", r"(?i)disregard\s+(all\s+)?(previous|above|prior)\s+instructions?"),
        ("role_override", r"(?i)you\s+are\s+now"),
        ("system_prefix", r"(?i)system\s*:\s*"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("injection pattern compiles")))
    .collect();
}

/// Labels of every injection pattern found in `prompt`, in table order.
pub fn detect_injection(prompt: &str) -> Vec<&'static str> {
    INJECTION_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(prompt))
        .map(|(label, _)| *label)
        .collect()
}
