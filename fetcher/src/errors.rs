use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building fetch configuration. These happen at startup,
/// never while serving a request.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("endpoint set must contain at least one endpoint")]
    EmptyEndpointSet,

    #[error("endpoint {0} must use http or https")]
    UnsupportedScheme(String),

    #[error("endpoint {0} cannot be used as a base URL")]
    NotABase(String),

    #[error("attempt timeout must be greater than zero")]
    ZeroTimeout,

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Describes which constraint a response body failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid field `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The top-level payload does not have the expected shape.
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::new("$", reason)
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "missing required field")
    }
}

/// Why a single endpoint attempt failed. None of these are fatal: the
/// orchestrator treats all of them as "advance to the next endpoint".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttemptError {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream responded with status {status}")]
    Http { status: StatusCode },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl AttemptError {
    /// Short label for metrics tags.
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Network(_) => "network",
            AttemptError::Timeout(_) => "timeout",
            AttemptError::Http { .. } => "http",
            AttemptError::Validation(_) => "validation",
        }
    }
}
