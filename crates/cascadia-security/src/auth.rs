//! Shared-secret API key check for protected routes.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The server itself has no key configured.
    #[error("Server misconfiguration: API Key missing")]
    Misconfigured,
    #[error("Invalid or missing API key")]
    Invalid,
}

pub struct ApiKeyGuard {
    expected: Option<SecretString>,
}

impl ApiKeyGuard {
    pub fn new(expected: Option<SecretString>) -> Self {
        let expected = expected.filter(|k| !k.expose_secret().is_empty());
        if expected.is_none() {
            tracing::warn!("SERVICE_API_KEY is not set; protected routes will answer 500");
        }
        Self { expected }
    }

    pub fn is_configured(&self) -> bool {
        self.expected.is_some()
    }

    pub fn check(&self, provided: Option<&str>) -> Result<(), AuthError> {
        let expected = self.expected.as_ref().ok_or(AuthError::Misconfigured)?;
        let provided = provided.ok_or(AuthError::Invalid)?;
        if bool::from(expected.expose_secret().as_bytes().ct_eq(provided.as_bytes())) {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }
}

impl std::fmt::Debug for ApiKeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGuard").field("configured", &self.is_configured()).finish()
    }
}
