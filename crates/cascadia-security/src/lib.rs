//! cascadia-security: request screening for the gateway.
//!
//! - `injection`: prompt injection phrase detection
//! - `pii`: personal data detectors (email, phone, SSN, card, IPv4)
//! - `screen`: combines both into a pass/block verdict
//! - `auth`: shared-secret API key check

pub mod auth;
pub mod injection;
pub mod pii;
pub mod screen;

pub use auth::{ApiKeyGuard, AuthError, API_KEY_HEADER};
pub use injection::detect_injection;
pub use pii::{detect_pii, PiiKind, PiiReport};
pub use screen::{BlockReport, PromptScreen, ScreenVerdict};
