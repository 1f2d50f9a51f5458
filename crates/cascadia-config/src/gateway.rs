//! Gateway configuration loaded from the process environment.
//! A `.env` file in the working directory is read first when present.

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::{ConfigError, Result};
use crate::providers::{env_prefix, known_provider, ProviderSettings, DEFAULT_PROVIDER_ORDER, KNOWN_PROVIDERS};
use crate::rate_limit::RateLimit;

fn default_bind() -> SocketAddr { SocketAddr::from(([0, 0, 0, 0], 8000)) }
fn default_provider_timeout() -> Duration { Duration::from_millis(10_000) }
fn default_allowed_origins() -> Vec<String> { vec!["*".to_string()] }

pub struct GatewayConfig {
    /// Shared secret for protected routes. `None` means every protected
    /// request answers with a server misconfiguration error.
    pub service_api_key: Option<SecretString>,
    pub rate_limit: RateLimit,
    pub allowed_origins: Vec<String>,
    pub injection_check: bool,
    pub pii_check: bool,
    pub bind: SocketAddr,
    /// Default per-attempt budget for the cascade.
    pub provider_timeout: Duration,
    pub provider_retries: u32,
    /// Every provider named in `PROVIDER_ORDER`, in order, whether or not
    /// a key was supplied for it.
    pub providers: Vec<ProviderSettings>,
}

impl GatewayConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values
    /// are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let service_api_key = get("SERVICE_API_KEY").map(SecretString::from);

        let rate_limit = match get("RATE_LIMIT") {
            Some(raw) => raw.parse()?,
            None => RateLimit::default(),
        };

        let allowed_origins = match get("ALLOWED_ORIGINS") {
            Some(raw) => {
                let origins: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect();
                if origins.is_empty() { default_allowed_origins() } else { origins }
            }
            None => default_allowed_origins(),
        };

        let injection_check = parse_or("ENABLE_PROMPT_INJECTION_CHECK", get("ENABLE_PROMPT_INJECTION_CHECK"), true, parse_bool)?;
        let pii_check = parse_or("ENABLE_PII_CHECK", get("ENABLE_PII_CHECK"), true, parse_bool)?;
        let bind = parse_or("GATEWAY_BIND", get("GATEWAY_BIND"), default_bind(), parse_from_str)?;
        let provider_timeout = parse_or("PROVIDER_TIMEOUT_MS", get("PROVIDER_TIMEOUT_MS"), default_provider_timeout(), parse_millis)?;
        let provider_retries = parse_or("PROVIDER_RETRIES", get("PROVIDER_RETRIES"), 0u32, parse_from_str)?;

        let order: Vec<String> = match get("PROVIDER_ORDER") {
            Some(raw) => raw
                .split(',')
                .map(|n| n.trim().to_ascii_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
            None => DEFAULT_PROVIDER_ORDER.iter().map(|n| n.to_string()).collect(),
        };

        let mut seen = HashSet::new();
        let mut providers = Vec::with_capacity(order.len());
        for name in order {
            let known = known_provider(&name).ok_or_else(|| ConfigError::UnknownProvider {
                name: name.clone(),
                known: KNOWN_PROVIDERS.iter().map(|p| p.name).collect::<Vec<_>>().join(", "),
            })?;
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateProvider(name));
            }

            let prefix = env_prefix(&name);
            let key_var = format!("{prefix}_API_KEY");
            let timeout_var = format!("{prefix}_TIMEOUT_MS");

            providers.push(ProviderSettings {
                kind: known.kind,
                api_key: get(&key_var).map(SecretString::from),
                model: get(&format!("{prefix}_MODEL")).unwrap_or_else(|| known.default_model.to_string()),
                base_url: get(&format!("{prefix}_BASE_URL"))
                    .unwrap_or_else(|| known.default_base_url.to_string()),
                timeout: get(&timeout_var)
                    .map(|raw| parse_millis(&timeout_var, &raw))
                    .transpose()?,
                name,
            });
        }

        Ok(Self {
            service_api_key,
            rate_limit,
            allowed_origins,
            injection_check,
            pii_check,
            bind,
            provider_timeout,
            provider_retries,
            providers,
        })
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("service_api_key", &self.service_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("rate_limit", &self.rate_limit)
            .field("allowed_origins", &self.allowed_origins)
            .field("injection_check", &self.injection_check)
            .field("pii_check", &self.pii_check)
            .field("bind", &self.bind)
            .field("provider_timeout", &self.provider_timeout)
            .field("provider_retries", &self.provider_retries)
            .field("providers", &self.providers)
            .finish()
    }
}

fn parse_or<T>(
    key: &str,
    raw: Option<String>,
    default: T,
    parse: fn(&str, &str) -> Result<T>,
) -> Result<T> {
    match raw {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "expected true or false")),
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration> {
    let ms: u64 = raw
        .parse()
        .map_err(|_| ConfigError::invalid(key, raw, "expected milliseconds"))?;
    if ms == 0 {
        return Err(ConfigError::invalid(key, raw, "must be greater than zero"));
    }
    Ok(Duration::from_millis(ms))
}

fn parse_from_str<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| ConfigError::invalid(key, raw, "could not be parsed"))
}
