//! Provider descriptors and the ordered, immutable provider set.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cascadia_config::{EndpointKind, ProviderSettings};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderSetError {
    #[error("provider '{0}' appears more than once")]
    DuplicateName(String),
    #[error("provider '{0}' has an empty credential")]
    EmptyCredential(String),
}

/// Static configuration for one backend. Built once at startup.
pub struct ProviderDescriptor {
    name: String,
    credential: SecretString,
    model: String,
    endpoint_kind: EndpointKind,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl ProviderDescriptor {
    pub fn new(
        name: impl Into<String>,
        credential: SecretString,
        model: impl Into<String>,
        endpoint_kind: EndpointKind,
    ) -> Self {
        Self {
            name: name.into(),
            credential,
            model: model.into(),
            endpoint_kind,
            base_url: None,
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Per-provider attempt budget, overriding the cascade default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn credential(&self) -> &SecretString { &self.credential }
    pub fn model(&self) -> &str { &self.model }
    pub fn endpoint_kind(&self) -> EndpointKind { self.endpoint_kind }
    pub fn base_url(&self) -> Option<&str> { self.base_url.as_deref() }
    pub fn timeout(&self) -> Option<Duration> { self.timeout }

    /// Base URL without a trailing slash, falling back to the adapter default.
    pub fn endpoint_root(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.endpoint_kind.default_base_url())
            .trim_end_matches('/')
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("credential", &"[REDACTED]")
            .field("model", &self.model)
            .field("endpoint_kind", &self.endpoint_kind)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Ordered providers; index 0 is the primary. Cloning shares the list.
#[derive(Debug, Clone)]
pub struct ProviderSet {
    providers: Arc<[ProviderDescriptor]>,
}

impl ProviderSet {
    pub fn new(providers: Vec<ProviderDescriptor>) -> Result<Self, ProviderSetError> {
        let mut seen = HashSet::new();
        for p in &providers {
            if !seen.insert(p.name.as_str()) {
                return Err(ProviderSetError::DuplicateName(p.name.clone()));
            }
            if p.credential.expose_secret().trim().is_empty() {
                return Err(ProviderSetError::EmptyCredential(p.name.clone()));
            }
        }
        Ok(Self { providers: providers.into() })
    }

    pub fn empty() -> Self {
        Self { providers: Arc::from(Vec::new()) }
    }

    /// Build from configuration. Providers without a usable key are left
    /// out here so they are never attempted at runtime.
    pub fn from_settings(settings: Vec<ProviderSettings>) -> Result<Self, ProviderSetError> {
        let mut descriptors = Vec::with_capacity(settings.len());
        for s in settings {
            if !s.has_credential() {
                tracing::warn!(
                    provider = %s.name,
                    env = %format!("{}_API_KEY", s.env_prefix()),
                    "No API key configured, provider excluded from cascade"
                );
                continue;
            }
            let Some(key) = s.api_key else { continue };

            let mut d = ProviderDescriptor::new(s.name, key, s.model, s.kind).with_base_url(s.base_url);
            if let Some(timeout) = s.timeout {
                d = d.with_timeout(timeout);
            }
            tracing::info!(
                provider = %d.name,
                model = %d.model,
                kind = %d.endpoint_kind,
                "Provider enabled"
            );
            descriptors.push(d);
        }
        Self::new(descriptors)
    }

    pub fn len(&self) -> usize { self.providers.len() }
    pub fn is_empty(&self) -> bool { self.providers.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, ProviderDescriptor> {
        self.providers.iter()
    }

    pub fn primary(&self) -> Option<&ProviderDescriptor> {
        self.providers.first()
    }

    pub fn get(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ProviderSet {
    type Item = &'a ProviderDescriptor;
    type IntoIter = std::slice::Iter<'a, ProviderDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
