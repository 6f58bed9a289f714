use crate::api::utils::{Failure, bad_request, fetch_route, ok_json};
use crate::config::UpstreamConfig;
use crate::errors::PortalError;
use crate::handler::RouteHandler;
use async_trait::async_trait;
use bytes::Bytes;
use fetcher::validate::AcceptAny;
use fetcher::{FetchRoute, Orchestrator, RequestTemplate, StaticFallback};
use http::Method;
use hyper::{Request, Response};
use serde::{Deserialize, Serialize};

/// Station interaction forwarded to Radio-Browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relay {
    /// `POST /api/radio-click`, upstream `json/url/{uuid}`
    Click,
    /// `POST /api/radio-vote`, upstream `json/vote/{uuid}`
    Vote,
}

impl Relay {
    fn handler_name(&self) -> &'static str {
        match self {
            Relay::Click => "radio_click",
            Relay::Vote => "radio_vote",
        }
    }

    fn template(&self, station_uuid: &str) -> RequestTemplate {
        let action = match self {
            Relay::Click => "url",
            Relay::Vote => "vote",
        };
        RequestTemplate::new(["json", action, station_uuid])
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Relay::Click => "Click tracking failed",
            Relay::Vote => "Voting failed",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest {
    station_uuid: Option<String>,
}

#[derive(Debug, Serialize)]
struct Accepted {
    success: bool,
}

/// Extracts a non-blank `stationUuid` from a JSON body.
fn station_uuid(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<RelayRequest>(body)
        .ok()?
        .station_uuid
        .map(|uuid| uuid.trim().to_string())
        .filter(|uuid| !uuid.is_empty())
}

/// Forwards a click or vote. Unlike the read routes there is nothing to
/// fall back to, so `success` reports whether any mirror accepted it.
pub struct RelayHandler {
    relay: Relay,
    orchestrator: Orchestrator,
    route: FetchRoute<()>,
}

impl RelayHandler {
    pub fn new(
        relay: Relay,
        orchestrator: Orchestrator,
        upstream: &UpstreamConfig,
    ) -> Result<Self, PortalError> {
        let route = fetch_route(
            "radio_browser",
            relay.handler_name(),
            upstream,
            Method::POST,
            "application/json",
            StaticFallback::new(()),
        )?;

        Ok(Self {
            relay,
            orchestrator,
            route,
        })
    }
}

#[async_trait]
impl RouteHandler for RelayHandler {
    fn name(&self) -> &'static str {
        self.relay.handler_name()
    }

    async fn handle(&self, request: Request<Bytes>) -> Result<Response<Bytes>, PortalError> {
        let Some(uuid) = station_uuid(request.body()) else {
            return bad_request("Station UUID required");
        };

        let outcome = self
            .orchestrator
            .fetch(&self.route, &self.relay.template(&uuid), &AcceptAny)
            .await;

        if outcome.is_fallback() {
            tracing::warn!(
                relay = self.name(),
                station = %uuid,
                error = ?outcome.error,
                "Relay rejected by every mirror"
            );
            return ok_json(&Failure::new(self.relay.failure_message()));
        }

        ok_json(&Accepted { success: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::utils::test_support::{call, upstream};
    use http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn handler(relay: Relay, uris: &[String]) -> RelayHandler {
        RelayHandler::new(
            relay,
            Orchestrator::with_client(reqwest::Client::new()),
            &upstream(uris, 2),
        )
        .unwrap()
    }

    #[test]
    fn test_station_uuid() {
        assert_eq!(
            station_uuid(br#"{"stationUuid": "9617a958-0601-11e8-ae97-52543be04c81"}"#).as_deref(),
            Some("9617a958-0601-11e8-ae97-52543be04c81")
        );
        assert_eq!(station_uuid(br#"{"stationUuid": ""}"#), None);
        assert_eq!(station_uuid(br#"{"station": "abc"}"#), None);
        assert_eq!(station_uuid(b"not json"), None);
        assert_eq!(station_uuid(b""), None);
    }

    #[tokio::test]
    async fn test_missing_uuid_rejected_without_upstream_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let handler = handler(Relay::Vote, &[server.uri()]);
        let (status, body) = call(&handler, Method::POST, "/api/radio-vote", "{}").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"success": false, "error": "Station UUID required"})
        );
    }

    #[tokio::test]
    async fn test_click_fails_over_to_next_mirror() {
        let down = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&down)
            .await;
        let up = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json/url/abc-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&up)
            .await;

        let handler = handler(Relay::Click, &[down.uri(), up.uri()]);
        let (status, body) = call(
            &handler,
            Method::POST,
            "/api/radio-click",
            r#"{"stationUuid": "abc-123"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
    }

    #[tokio::test]
    async fn test_vote_rejected_everywhere() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json/vote/abc-123"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let handler = handler(Relay::Vote, &[server.uri()]);
        let (status, body) = call(
            &handler,
            Method::POST,
            "/api/radio-vote",
            r#"{"stationUuid": "abc-123"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": false, "error": "Voting failed"}));
    }
}
