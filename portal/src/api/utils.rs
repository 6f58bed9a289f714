use crate::config::UpstreamConfig;
use crate::errors::PortalError;
use crate::metrics_defs::RESPONSE_FALLBACK;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use fetcher::{FallbackProvider, FetchOutcome, FetchRoute, Provenance};
use http::Method;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use shared::counter;
use shared::http::json_response;

/// Common JSON envelope for every upstream-backed response.
///
/// `success` means the response carries renderable data. Fallback data
/// counts, and is flagged with `fallback: true` plus the last upstream
/// error.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<P> {
    pub success: bool,
    #[serde(flatten)]
    pub payload: P,
    pub provenance: Provenance,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<P> Envelope<P> {
    pub fn from_outcome<T, F>(handler: &'static str, outcome: FetchOutcome<T>, payload: F) -> Self
    where
        F: FnOnce(T, Provenance) -> P,
    {
        if outcome.is_fallback() {
            counter!(RESPONSE_FALLBACK, "handler" => handler).increment(1);
        }

        Self {
            success: true,
            fallback: outcome.is_fallback(),
            error: outcome.error,
            provenance: outcome.provenance,
            payload: payload(outcome.data, outcome.provenance),
        }
    }
}

/// `{ "success": false, "error": ... }`
#[derive(Debug, Serialize)]
pub struct Failure<'a> {
    pub success: bool,
    pub error: &'a str,
}

impl<'a> Failure<'a> {
    pub fn new(error: &'a str) -> Self {
        Self {
            success: false,
            error,
        }
    }
}

pub fn ok_json<T: Serialize>(value: &T) -> Result<Response<Bytes>, PortalError> {
    Ok(json_response(StatusCode::OK, value)?)
}

pub fn bad_request(error: &str) -> Result<Response<Bytes>, PortalError> {
    Ok(json_response(StatusCode::BAD_REQUEST, &Failure::new(error))?)
}

/// First value of query parameter `name`, ignoring blank values.
pub fn query_param<B>(request: &Request<B>, name: &str) -> Option<String> {
    let query = request.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Current time as an ISO-8601 UTC timestamp with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds a fetch route from upstream configuration, tagging configuration
/// errors with the upstream name.
pub fn fetch_route<T, F>(
    upstream_name: &'static str,
    route_name: &'static str,
    upstream: &UpstreamConfig,
    method: Method,
    accept: &str,
    fallback: F,
) -> Result<FetchRoute<T>, PortalError>
where
    F: FallbackProvider<T> + 'static,
{
    let to_error = |source| PortalError::UpstreamConfig {
        upstream: upstream_name,
        source,
    };

    let endpoints = upstream.endpoint_set().map_err(to_error)?;
    let attempt = upstream.attempt_config(method, accept).map_err(to_error)?;

    Ok(FetchRoute::new(route_name, endpoints, attempt, fallback))
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Names {
        names: Vec<&'static str>,
    }

    #[test]
    fn test_query_param() {
        let request = Request::builder()
            .uri("/api/radio-stations?country=United%20States&genre=&search=+jazz+")
            .body(())
            .unwrap();

        assert_eq!(
            query_param(&request, "country").as_deref(),
            Some("United States")
        );
        assert_eq!(query_param(&request, "genre"), None);
        assert_eq!(query_param(&request, "search").as_deref(), Some("jazz"));
        assert_eq!(query_param(&request, "missing"), None);
    }

    #[test]
    fn test_envelope_serialization() {
        let live = FetchOutcome {
            data: vec!["a"],
            provenance: Provenance::Live,
            error: None,
            attempts: 1,
        };
        let envelope = Envelope::from_outcome("test", live, |names, _| Names { names });
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": true, "names": ["a"], "provenance": "live"})
        );

        let fallback = FetchOutcome {
            data: vec!["b"],
            provenance: Provenance::Fallback,
            error: Some("timed out after 10s".to_string()),
            attempts: 2,
        };
        let envelope = Envelope::from_outcome("test", fallback, |names, _| Names { names });
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": true,
                "names": ["b"],
                "provenance": "fallback",
                "fallback": true,
                "error": "timed out after 10s"
            })
        );
    }

    #[test]
    fn test_now_iso() {
        let now = now_iso();
        assert!(now.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }
}
