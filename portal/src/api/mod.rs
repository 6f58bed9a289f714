pub mod catalog;
pub mod radio_lists;
pub mod radio_relay;
pub mod radio_stations;
pub mod status_feeds;
pub mod topic;
pub mod utils;

use crate::config::Upstreams;
use crate::errors::PortalError;
use crate::router::{Route, Router};
use catalog::{InfrastructureHandler, Provider, RegionsHandler};
use fetcher::Orchestrator;
use hyper::Method;
use radio_lists::{NameList, NameListHandler};
use radio_relay::{Relay, RelayHandler};
use radio_stations::RadioStationsHandler;
use status_feeds::{StatusFeed, StatusFeedHandler};
use topic::TopicHandler;

/// Builds the full route table. Every upstream-backed handler shares one
/// orchestrator and therefore one connection pool.
pub fn build_router(upstreams: &Upstreams, orchestrator: Orchestrator) -> Result<Router, PortalError> {
    let radio = &upstreams.radio_browser;

    Ok(Router::new(vec![
        Route::new(
            Method::GET,
            "/api/radio-stations",
            RadioStationsHandler::new(orchestrator.clone(), radio)?,
        ),
        Route::new(
            Method::GET,
            "/api/radio-countries",
            NameListHandler::new(NameList::Countries, orchestrator.clone(), radio)?,
        ),
        Route::new(
            Method::GET,
            "/api/radio-genres",
            NameListHandler::new(NameList::Genres, orchestrator.clone(), radio)?,
        ),
        Route::new(
            Method::POST,
            "/api/radio-click",
            RelayHandler::new(Relay::Click, orchestrator.clone(), radio)?,
        ),
        Route::new(
            Method::POST,
            "/api/radio-vote",
            RelayHandler::new(Relay::Vote, orchestrator.clone(), radio)?,
        ),
        Route::new(
            Method::GET,
            "/api/aws-health",
            StatusFeedHandler::new(StatusFeed::Aws, orchestrator.clone(), &upstreams.aws_status)?,
        ),
        Route::new(
            Method::GET,
            "/api/google-health",
            StatusFeedHandler::new(
                StatusFeed::Google,
                orchestrator.clone(),
                &upstreams.google_status,
            )?,
        ),
        Route::new(
            Method::GET,
            "/api/wikipedia",
            TopicHandler::new(orchestrator, &upstreams.wikipedia)?,
        ),
        Route::new(
            Method::GET,
            "/api/aws-regions",
            RegionsHandler::new(Provider::Aws),
        ),
        Route::new(
            Method::GET,
            "/api/google-regions",
            RegionsHandler::new(Provider::Google),
        ),
        Route::new(Method::GET, "/api/infrastructure", InfrastructureHandler),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use bytes::Bytes;
    use hyper::{Request, StatusCode};

    #[tokio::test]
    async fn test_route_table() {
        let router = build_router(
            &Upstreams::default(),
            Orchestrator::with_client(reqwest::Client::new()),
        )
        .unwrap();

        let request = |method: Method, path: &str| {
            Request::builder()
                .method(method)
                .uri(path)
                .body(Bytes::new())
                .unwrap()
        };

        // Static routes answer without any upstream
        let routed = router.route(request(Method::GET, "/api/aws-regions")).await;
        assert_eq!(routed.handler, "aws_regions");
        assert_eq!(routed.response.status(), StatusCode::OK);

        let routed = router.route(request(Method::GET, "/api/infrastructure")).await;
        assert_eq!(routed.handler, "infrastructure");

        // Relay validation happens before any upstream call
        let routed = router.route(request(Method::POST, "/api/radio-click")).await;
        assert_eq!(routed.handler, "radio_click");
        assert_eq!(routed.response.status(), StatusCode::BAD_REQUEST);

        let routed = router.route(request(Method::GET, "/api/radio-click")).await;
        assert_eq!(routed.response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_upstream_rejected() {
        let mut upstreams = Upstreams::default();
        upstreams.wikipedia = UpstreamConfig {
            endpoints: vec![],
            timeout_secs: 5,
            user_agent: "x".to_string(),
        };

        let err = build_router(
            &upstreams,
            Orchestrator::with_client(reqwest::Client::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            PortalError::UpstreamConfig {
                upstream: "wikipedia",
                source: fetcher::ConfigError::EmptyEndpointSet,
            }
        ));
    }
}
