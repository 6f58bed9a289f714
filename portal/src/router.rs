use crate::handler::RouteHandler;
use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use shared::http::make_error_response;
use std::sync::Arc;

/// A method and exact path bound to a handler.
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: &'static str,
    handler: Arc<dyn RouteHandler>,
}

impl Route {
    pub fn new<H>(method: Method, path: &'static str, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        Self {
            method,
            path,
            handler: Arc::new(handler),
        }
    }
}

/// Result of dispatching one request.
pub struct Routed {
    /// Name of the handler that answered, `"none"` when nothing matched.
    pub handler: &'static str,
    pub response: Response<Bytes>,
}

/// Router that matches incoming requests against the route table
#[derive(Clone)]
pub struct Router {
    routes: Arc<Vec<Route>>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes: Arc::new(routes),
        }
    }

    /// Routes an incoming request to the first matching handler. Always
    /// produces a response: unmatched requests get a 404, handler errors a
    /// 500.
    pub async fn route(&self, req: Request<Bytes>) -> Routed {
        let Some(handler) = self.find_matching_route(&req) else {
            tracing::warn!(
                method = %req.method(),
                path = %req.uri().path(),
                "No route matched"
            );
            return Routed {
                handler: "none",
                response: self.handle_no_route(),
            };
        };

        let name = handler.name();
        tracing::debug!(handler = name, "Matched route");

        let response = match handler.handle(req).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(handler = name, error = %e, "Handler failed");
                make_error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        Routed {
            handler: name,
            response,
        }
    }

    fn find_matching_route<B>(&self, req: &Request<B>) -> Option<Arc<dyn RouteHandler>> {
        self.routes
            .iter()
            .find(|route| route.path == req.uri().path() && route.method == req.method())
            .map(|route| route.handler.clone())
    }

    fn handle_no_route(&self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::from_static(b"No route matched\n"));
        *response.status_mut() = StatusCode::NOT_FOUND;
        response
    }
}
