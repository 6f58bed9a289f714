//! Sequential multi-endpoint fetch with static fallback.
//!
//! One orchestration run walks the endpoint set of a [`FetchRoute`] once,
//! in order:
//!
//! ```text
//! Pending ─▶ Attempting(0) ─ok─▶ Succeeded            (provenance: live)
//!                 │
//!               error
//!                 ▼
//!             Advancing ─▶ Attempting(1) ─ ... ─▶ Exhausted ─▶ Fallback
//! ```
//!
//! Network errors, timeouts, non-2xx statuses and validation failures are
//! all handled the same way: log, count, advance. There is no backoff and
//! no second pass. A run never fails; it always ends in a live payload or
//! the route's fallback.

use crate::endpoints::{EndpointSet, RequestTemplate};
use crate::errors::AttemptError;
use crate::fallback::FallbackProvider;
use crate::metrics_defs::{FETCH_ATTEMPT_FAILED, FETCH_DURATION, FETCH_OUTCOME};
use crate::request::{AttemptConfig, HttpTransport, Transport};
use crate::validate::Normalizer;
use serde::Serialize;
use shared::{counter, histogram};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use url::Url;

/// Immutable per-route configuration, shared across concurrent runs.
pub struct FetchRoute<T> {
    name: &'static str,
    endpoints: EndpointSet,
    attempt: AttemptConfig,
    fallback: Box<dyn FallbackProvider<T>>,
}

impl<T> FetchRoute<T> {
    pub fn new<F>(
        name: &'static str,
        endpoints: EndpointSet,
        attempt: AttemptConfig,
        fallback: F,
    ) -> Self
    where
        F: FallbackProvider<T> + 'static,
    {
        Self {
            name,
            endpoints,
            attempt,
            fallback: Box::new(fallback),
        }
    }

    pub fn fallback(&self) -> T {
        self.fallback.fallback()
    }
}

impl<T> fmt::Debug for FetchRoute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRoute")
            .field("name", &self.name)
            .field("endpoints", &self.endpoints)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Fallback,
}

impl Provenance {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Fallback => "fallback",
        }
    }
}

/// Result of one orchestration run.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchOutcome<T> {
    pub data: T,
    pub provenance: Provenance,
    /// The last attempt error, set only when the fallback was used.
    pub error: Option<String>,
    /// Number of endpoints actually tried.
    pub attempts: usize,
}

impl<T> FetchOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

enum FetchState {
    Pending,
    Attempting { index: usize, url: Url },
    Advancing,
    Exhausted,
}

/// Drives the attempt loop for any route.
#[derive(Clone)]
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self::new(Arc::new(HttpTransport::new(client)))
    }

    /// Tries each endpoint of `route` in order and returns the first
    /// response that `normalizer` accepts, or the route's fallback.
    pub async fn fetch<N>(
        &self,
        route: &FetchRoute<N::Output>,
        template: &RequestTemplate,
        normalizer: &N,
    ) -> FetchOutcome<N::Output>
    where
        N: Normalizer,
    {
        let started = Instant::now();
        let mut rotation = route.endpoints.rotation(template);
        let mut attempts = 0;
        let mut last_error: Option<AttemptError> = None;
        let mut state = FetchState::Pending;

        let outcome = loop {
            state = match state {
                FetchState::Pending | FetchState::Advancing => match rotation.next() {
                    Some((index, url)) => FetchState::Attempting { index, url },
                    None => FetchState::Exhausted,
                },
                FetchState::Attempting { index, url } => {
                    attempts += 1;
                    match self.attempt(route, &url, normalizer).await {
                        Ok(data) => {
                            tracing::debug!(route = route.name, index, %url, "Endpoint succeeded");
                            break FetchOutcome {
                                data,
                                provenance: Provenance::Live,
                                error: None,
                                attempts,
                            };
                        }
                        Err(error) => {
                            tracing::warn!(
                                route = route.name,
                                index,
                                %url,
                                error = %error,
                                "Endpoint attempt failed"
                            );
                            counter!(FETCH_ATTEMPT_FAILED, "route" => route.name, "kind" => error.kind())
                                .increment(1);
                            last_error = Some(error);
                            FetchState::Advancing
                        }
                    }
                }
                FetchState::Exhausted => {
                    tracing::warn!(
                        route = route.name,
                        attempts,
                        "All endpoints failed, serving fallback"
                    );
                    break FetchOutcome {
                        data: route.fallback(),
                        provenance: Provenance::Fallback,
                        error: Some(
                            last_error
                                .as_ref()
                                .map(ToString::to_string)
                                .unwrap_or_else(|| "no endpoint attempted".to_string()),
                        ),
                        attempts,
                    };
                }
            };
        };

        counter!(FETCH_OUTCOME, "route" => route.name, "provenance" => outcome.provenance.as_str())
            .increment(1);
        histogram!(FETCH_DURATION, "route" => route.name).record(started.elapsed().as_secs_f64());

        outcome
    }

    async fn attempt<N>(
        &self,
        route: &FetchRoute<N::Output>,
        url: &Url,
        normalizer: &N,
    ) -> Result<N::Output, AttemptError>
    where
        N: Normalizer,
    {
        let raw = self.transport.send(url, &route.attempt).await?;
        Ok(normalizer.normalize(&raw)?)
    }
}
