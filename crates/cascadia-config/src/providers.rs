//! Known providers and the per-provider settings read from the environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Wire protocol spoken by a provider. Selects the backend adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// `POST {base}/chat/completions` with a bearer token.
    OpenAiCompatible,
    /// `POST {base}/models/{model}:generateContent?key=...`
    Gemini,
    /// `POST {base}/messages` with `x-api-key`.
    Anthropic,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::OpenAiCompatible => "openai_compatible",
            EndpointKind::Gemini => "gemini",
            EndpointKind::Anthropic => "anthropic",
        }
    }

    /// Endpoint root used when neither the provider table nor the
    /// environment names one.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            EndpointKind::OpenAiCompatible => "https://api.openai.com/v1",
            EndpointKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            EndpointKind::Anthropic => "https://api.anthropic.com/v1",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai_compatible" | "openai" => Ok(EndpointKind::OpenAiCompatible),
            "gemini" => Ok(EndpointKind::Gemini),
            "anthropic" => Ok(EndpointKind::Anthropic),
            other => Err(ConfigError::invalid(
                "endpoint_kind",
                other,
                "expected openai_compatible, gemini or anthropic",
            )),
        }
    }
}

/// A provider the gateway knows how to reach out of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownProvider {
    pub name: &'static str,
    pub kind: EndpointKind,
    pub default_model: &'static str,
    pub default_base_url: &'static str,
}

pub const KNOWN_PROVIDERS: &[KnownProvider] = &[
    KnownProvider {
        name: "gemini",
        kind: EndpointKind::Gemini,
        default_model: "gemini-2.0-flash-exp",
        default_base_url: "https://generativelanguage.googleapis.com/v1beta",
    },
    KnownProvider {
        name: "groq",
        kind: EndpointKind::OpenAiCompatible,
        default_model: "llama-3.3-70b-versatile",
        default_base_url: "https://api.groq.com/openai/v1",
    },
    KnownProvider {
        name: "openrouter",
        kind: EndpointKind::OpenAiCompatible,
        default_model: "google/gemini-2.0-flash-exp:free",
        default_base_url: "https://openrouter.ai/api/v1",
    },
    KnownProvider {
        name: "anthropic",
        kind: EndpointKind::Anthropic,
        default_model: "claude-3-5-haiku-latest",
        default_base_url: "https://api.anthropic.com/v1",
    },
];

/// Default cascade order when `PROVIDER_ORDER` is not set.
pub const DEFAULT_PROVIDER_ORDER: &[&str] = &["gemini", "groq", "openrouter", "anthropic"];

pub fn known_provider(name: &str) -> Option<&'static KnownProvider> {
    KNOWN_PROVIDERS.iter().find(|p| p.name == name)
}

/// Settings for one provider as read from `{NAME}_*` variables.
///
/// Not `Clone`: the credential moves into the provider descriptor exactly
/// once.
pub struct ProviderSettings {
    pub name: String,
    pub kind: EndpointKind,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl ProviderSettings {
    /// True when an API key is present and not blank.
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }

    /// Prefix used for this provider's environment variables.
    pub fn env_prefix(&self) -> String {
        env_prefix(&self.name)
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub(crate) fn env_prefix(name: &str) -> String {
    name.to_ascii_uppercase().replace('-', "_")
}
