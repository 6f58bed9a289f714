use fetcher::{AttemptConfig, EndpointSet};
use http::Method;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Upstream {0} has no endpoints")]
    EmptyEndpoints(&'static str),

    #[error("Upstream {0} timeout cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("Upstream {upstream} endpoint {url} must use http or https")]
    UnsupportedScheme { upstream: &'static str, url: String },

    #[error("Upstream {0} has an empty user agent")]
    EmptyUserAgent(&'static str),
}

/// Portal configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the public API
    pub listener: Listener,
    /// Listener for health and readiness probes
    pub admin_listener: Listener,
    /// Upstream mirrors per data source. Any source left out uses the
    /// public defaults.
    #[serde(default)]
    pub upstreams: Upstreams,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        for (name, upstream) in self.upstreams.iter() {
            upstream.validate(name)?;
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Upstreams {
    pub radio_browser: UpstreamConfig,
    pub aws_status: UpstreamConfig,
    pub google_status: UpstreamConfig,
    pub wikipedia: UpstreamConfig,
}

impl Upstreams {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &UpstreamConfig)> {
        [
            ("radio_browser", &self.radio_browser),
            ("aws_status", &self.aws_status),
            ("google_status", &self.google_status),
            ("wikipedia", &self.wikipedia),
        ]
        .into_iter()
    }
}

impl Default for Upstreams {
    fn default() -> Self {
        Self {
            radio_browser: UpstreamConfig::public(
                &[
                    "https://de1.api.radio-browser.info",
                    "https://de2.api.radio-browser.info",
                    "https://at1.api.radio-browser.info",
                    "https://nl1.api.radio-browser.info",
                    "https://fr1.api.radio-browser.info",
                ],
                "control-center-radio/1.0",
            ),
            aws_status: UpstreamConfig::public(
                &["https://status.aws.amazon.com"],
                "Mozilla/5.0 (compatible; AWS-Monitor/1.0)",
            ),
            google_status: UpstreamConfig::public(
                &["https://status.cloud.google.com"],
                "Mozilla/5.0 (compatible; Google-Cloud-Monitor/1.0)",
            ),
            wikipedia: UpstreamConfig::public(
                &["https://en.wikipedia.org"],
                "control-center-learn/1.0",
            ),
        }
    }
}

/// One logical upstream: interchangeable mirrors tried in listed order.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Mirror base URLs, most preferred first
    pub endpoints: Vec<Url>,
    /// Cap on a single attempt against one mirror, body included
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "control-center/1.0".to_string()
}

impl UpstreamConfig {
    fn public(endpoints: &[&str], user_agent: &str) -> Self {
        Self {
            endpoints: endpoints
                .iter()
                .filter_map(|e| Url::parse(e).ok())
                .collect(),
            timeout_secs: default_timeout_secs(),
            user_agent: user_agent.to_string(),
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), ValidationError> {
        if self.endpoints.is_empty() {
            return Err(ValidationError::EmptyEndpoints(name));
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout(name));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ValidationError::EmptyUserAgent(name));
        }

        if let Some(url) = self
            .endpoints
            .iter()
            .find(|url| !matches!(url.scheme(), "http" | "https"))
        {
            return Err(ValidationError::UnsupportedScheme {
                upstream: name,
                url: url.to_string(),
            });
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoint_set(&self) -> Result<EndpointSet, fetcher::ConfigError> {
        EndpointSet::try_new(self.endpoints.clone())
    }

    /// Attempt parameters for requests expecting `accept` back.
    pub fn attempt_config(
        &self,
        method: Method,
        accept: &str,
    ) -> Result<AttemptConfig, fetcher::ConfigError> {
        AttemptConfig::new(method, self.timeout())?
            .user_agent(&self.user_agent)?
            .accept(accept)
    }
}
