//! cascadia-web: HTTP surface of the gateway.
//! Routes:
//!   - `/`, `/health`: service info and readiness
//!   - `/query`: screened prompt through the provider cascade
//!   - `/metrics`, `/metrics/prometheus`: counters as JSON or Prometheus text
//!   - `/metrics/reset`: zero the in-process counters
//!   - `/providers`: pricing table and active providers
//!   - `/batch/resilience`, `/batch/security`: multi-prompt reports

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::{AppState, SharedState};
