//! Resilient multi-source fetching.
//!
//! A route is an ordered set of interchangeable upstream endpoints, a
//! per-attempt request configuration and a fallback payload. Fetching a
//! route tries each endpoint once, in order, validates the body of any 2xx
//! response and returns the first payload that validates. If every endpoint
//! fails, the route's fallback is returned instead; callers always get
//! something renderable.
//!
//! ```text
//!           ┌──────────────┐   url    ┌───────────┐  RawResponse  ┌────────────┐
//! route ──▶ │ Orchestrator │ ───────▶ │ Transport │ ────────────▶ │ Normalizer │ ──▶ T
//!           └──────────────┘          └───────────┘               └────────────┘
//!                  │ all endpoints failed
//!                  ▼
//!           FallbackProvider ──▶ T
//! ```

pub mod endpoints;
pub mod errors;
pub mod fallback;
pub mod metrics_defs;
pub mod orchestrator;
pub mod request;
pub mod validate;

#[cfg(test)]
mod testutils;

pub use endpoints::{EndpointSet, RequestTemplate};
pub use errors::{AttemptError, ConfigError, ValidationError};
pub use fallback::{FallbackProvider, StaticFallback};
pub use orchestrator::{FetchOutcome, FetchRoute, Orchestrator, Provenance};
pub use request::{AttemptConfig, HttpTransport, RawResponse, Transport};
pub use validate::Normalizer;
