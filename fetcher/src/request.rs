use crate::errors::{AttemptError, ConfigError};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use http::{Method, StatusCode};
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// Per-attempt request parameters shared by every endpoint of a route.
#[derive(Clone, Debug)]
pub struct AttemptConfig {
    method: Method,
    timeout: Duration,
    headers: HeaderMap,
}

impl AttemptConfig {
    pub fn new(method: Method, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            method,
            timeout,
            headers: HeaderMap::new(),
        })
    }

    pub fn get(timeout: Duration) -> Result<Self, ConfigError> {
        Self::new(Method::GET, timeout)
    }

    pub fn post(timeout: Duration) -> Result<Self, ConfigError> {
        Self::new(Method::POST, timeout)
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, ConfigError> {
        let value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn user_agent(self, user_agent: &str) -> Result<Self, ConfigError> {
        self.header(USER_AGENT, user_agent)
    }

    /// Sets the `Accept` header to the content type the route expects back.
    pub fn accept(self, content_type: &str) -> Result<Self, ConfigError> {
        self.header(ACCEPT, content_type)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// The unparsed outcome of one successful attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }
}

/// Issues a single request against one endpoint.
///
/// Implementations must bound the whole request/response cycle by
/// [`AttemptConfig::timeout`] and report non-2xx statuses as
/// [`AttemptError::Http`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &Url, config: &AttemptConfig) -> Result<RawResponse, AttemptError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// The timeout covers connecting, sending, receiving headers and
    /// collecting the complete body. When it fires the in-flight future is
    /// dropped, which closes the connection.
    async fn send(&self, url: &Url, config: &AttemptConfig) -> Result<RawResponse, AttemptError> {
        let request = self
            .client
            .request(config.method().clone(), url.clone())
            .headers(config.headers().clone());

        let attempt = async {
            let response = request
                .send()
                .await
                .map_err(|e| AttemptError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AttemptError::Http { status });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            let body = response
                .bytes()
                .await
                .map_err(|e| AttemptError::Network(e.to_string()))?;

            Ok(RawResponse {
                status,
                content_type,
                body,
            })
        };

        timeout(config.timeout(), attempt)
            .await
            .map_err(|_| AttemptError::Timeout(config.timeout()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(timeout_ms: u64) -> AttemptConfig {
        AttemptConfig::get(Duration::from_millis(timeout_ms))
            .unwrap()
            .user_agent("control-center-test/1.0")
            .unwrap()
            .accept("application/json")
            .unwrap()
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(matches!(
            AttemptConfig::get(Duration::ZERO),
            Err(ConfigError::ZeroTimeout)
        ));
        assert!(matches!(
            AttemptConfig::get(Duration::from_secs(1))
                .unwrap()
                .user_agent("bad\nvalue"),
            Err(ConfigError::InvalidHeader { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/tags"))
            .and(header("user-agent", "control-center-test/1.0"))
            .and(header("accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"[{"name":"jazz"}]"#, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/json/tags", server.uri())).unwrap();
        let response = HttpTransport::default()
            .send(&url, &config(1000))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
        assert_eq!(response.body.as_ref(), br#"[{"name":"jazz"}]"#);
    }

    #[tokio::test]
    async fn test_send_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let result = HttpTransport::default().send(&url, &config(1000)).await;

        assert_eq!(
            result.unwrap_err(),
            AttemptError::Http {
                status: StatusCode::SERVICE_UNAVAILABLE
            }
        );
    }

    #[tokio::test]
    async fn test_send_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let started = tokio::time::Instant::now();
        let result = HttpTransport::default().send(&url, &config(200)).await;

        assert_eq!(
            result.unwrap_err(),
            AttemptError::Timeout(Duration::from_millis(200))
        );
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_send_network_error() {
        // Bind then drop a listener so the port is known to refuse connections
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        let result = HttpTransport::default().send(&url, &config(1000)).await;

        assert!(matches!(result.unwrap_err(), AttemptError::Network(_)));
    }
}
