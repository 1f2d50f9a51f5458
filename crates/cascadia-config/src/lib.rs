//! cascadia-config: startup configuration for the gateway.
//!
//! Everything is read once from the process environment (after loading an
//! optional `.env` file) and handed to the other crates as plain values.
//! Parsing goes through a lookup function so tests can feed a map instead
//! of mutating the real environment.

pub mod error;
pub mod gateway;
pub mod providers;
pub mod rate_limit;

pub use error::{ConfigError, Result};
pub use gateway::GatewayConfig;
pub use providers::{known_provider, EndpointKind, KnownProvider, ProviderSettings, KNOWN_PROVIDERS};
pub use rate_limit::RateLimit;
