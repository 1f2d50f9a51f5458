use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown provider '{name}' in PROVIDER_ORDER (known providers: {known})")]
    UnknownProvider { name: String, known: String },

    #[error("Provider '{0}' is listed more than once in PROVIDER_ORDER")]
    DuplicateProvider(String),

    #[error("Invalid rate limit {0:?}: expected '<count>/<second|minute|hour|day>'")]
    InvalidRateLimit(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
