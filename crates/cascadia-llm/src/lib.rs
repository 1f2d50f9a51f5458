//! cascadia-llm: provider cascade over interchangeable LLM backends.
//!
//! Modules:
//!   request: validated `CascadeRequest`
//!   provider: immutable provider descriptors and the ordered `ProviderSet`
//!   backend: `BackendAdapter` trait, HTTP adapters, `AdapterRegistry`
//!   response: raw provider response shapes and text extraction
//!   cascade: sequential first-success-wins engine with attempt trace
//!   pricing: per-model pricing table and cost estimates

pub mod backend;
pub mod cascade;
pub mod pricing;
pub mod provider;
pub mod request;
pub mod response;

pub use backend::{AdapterFailure, AdapterRegistry, BackendAdapter};
pub use cascade::{
    AttemptOutcome, AttemptRecord, CancelFlag, CascadeEngine, CascadeError, CascadeResult,
    CascadeSettings, ALL_PROVIDERS_FAILED,
};
pub use cascadia_config::EndpointKind;
pub use provider::{ProviderDescriptor, ProviderSet, ProviderSetError};
pub use request::{CascadeRequest, RequestError};
