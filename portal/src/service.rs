use crate::api::utils::bad_request;
use crate::errors::PortalError;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use crate::router::Router;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use shared::http::{into_boxed, make_error_response};
use shared::{gauge, histogram};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

/// Request bodies are small JSON documents; anything larger is refused.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Holds one slot of the in-flight gauge for the lifetime of a request.
///
/// Hyper drops the request future when the client goes away, so the gauge
/// and the duration sample are settled on drop. Requests that never
/// produced a response are recorded with status `aborted`.
struct RequestTimer {
    started: Instant,
    handler: &'static str,
    status: Option<StatusCode>,
}

impl RequestTimer {
    fn start() -> Self {
        gauge!(REQUESTS_INFLIGHT).increment(1.0);
        Self {
            started: Instant::now(),
            handler: "none",
            status: None,
        }
    }

    fn finish(&mut self, handler: &'static str, status: StatusCode) {
        self.handler = handler;
        self.status = Some(status);
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let status = self
            .status
            .as_ref()
            .map_or("aborted", |status| status.as_str())
            .to_string();
        histogram!(REQUEST_DURATION, "status" => status, "handler" => self.handler)
            .record(self.started.elapsed().as_secs_f64());
        gauge!(REQUESTS_INFLIGHT).decrement(1.0);
    }
}

/// JSON 400 for a body that could not be read, matching the handlers'
/// own validation errors.
fn body_rejected(error: &(dyn std::error::Error + Send + Sync + 'static)) -> Response<Bytes> {
    let message = if error.downcast_ref::<LengthLimitError>().is_some() {
        "Request body too large"
    } else {
        "Could not read request body"
    };
    let e = PortalError::RequestBodyError(error.to_string());
    tracing::debug!(error = %e, "Rejecting request");

    bad_request(message).unwrap_or_else(|_| make_error_response(StatusCode::BAD_REQUEST))
}

/// Hyper service for the public API. Buffers the request body, dispatches
/// through the router and records request metrics.
pub struct PortalService {
    router: Router,
}

impl PortalService {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

impl Service<Request<Incoming>> for PortalService {
    type Response = Response<BoxBody<Bytes, Self::Error>>;
    type Error = PortalError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let router = self.router.clone();

        Box::pin(async move {
            let mut timer = RequestTimer::start();

            let (parts, body) = req.into_parts();
            let (handler, response) = match Limited::new(body, MAX_BODY_BYTES).collect().await {
                Ok(collected) => {
                    let request = Request::from_parts(parts, collected.to_bytes());
                    let routed = router.route(request).await;
                    (routed.handler, routed.response)
                }
                Err(e) => ("none", body_rejected(e.as_ref())),
            };

            timer.finish(handler, response.status());
            Ok(into_boxed(response))
        })
    }
}
