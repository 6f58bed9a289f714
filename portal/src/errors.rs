use thiserror::Error;

/// Errors that can occur while building or serving the portal
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Response serialization error: {0}")]
    ResponseSerializationError(#[from] serde_json::Error),

    #[error("Invalid upstream configuration for {upstream}: {source}")]
    UpstreamConfig {
        upstream: &'static str,
        #[source]
        source: fetcher::ConfigError,
    },

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
