use crate::errors::PortalError;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::{Request, Response};

/// Handler for one API route.
///
/// Requests arrive with their body fully collected. Handlers that call
/// upstreams go through the fetcher, which never fails, so an `Err` here
/// means something local went wrong (bad serialization, broken invariant)
/// and is answered with a 500.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn handle(&self, request: Request<Bytes>) -> Result<Response<Bytes>, PortalError>;
}
