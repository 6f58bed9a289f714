use crate::errors::ValidationError;
use crate::request::RawResponse;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Validates a raw upstream body and maps it onto a route's stable output
/// shape.
///
/// Implementations must be pure: the same body always yields the same
/// decision and the same output. Whole-response problems (unparsable body,
/// wrong top-level shape) are reported as a [`ValidationError`]; records
/// that fail per-record checks are dropped silently before mapping.
pub trait Normalizer: Send + Sync {
    type Output: Send;

    fn normalize(&self, response: &RawResponse) -> Result<Self::Output, ValidationError>;
}

impl<F, T> Normalizer for F
where
    F: Fn(&RawResponse) -> Result<T, ValidationError> + Send + Sync,
    T: Send,
{
    type Output = T;

    fn normalize(&self, response: &RawResponse) -> Result<T, ValidationError> {
        self(response)
    }
}

/// Accepts any successful response and discards the body.
pub struct AcceptAny;

impl Normalizer for AcceptAny {
    type Output = ();

    fn normalize(&self, _response: &RawResponse) -> Result<(), ValidationError> {
        Ok(())
    }
}

pub fn parse_json<T: DeserializeOwned>(response: &RawResponse) -> Result<T, ValidationError> {
    serde_json::from_slice(&response.body)
        .map_err(|e| ValidationError::shape(format!("body is not valid JSON: {e}")))
}

/// Parses the body and requires the top level to be a JSON array.
pub fn json_array(response: &RawResponse) -> Result<Vec<Value>, ValidationError> {
    match parse_json::<Value>(response)? {
        Value::Array(items) => Ok(items),
        other => Err(ValidationError::shape(format!(
            "expected an array, got {}",
            json_type_name(&other)
        ))),
    }
}

/// True when `candidate` parses as an absolute http or https URL.
pub fn is_web_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Treats empty and whitespace-only strings like missing values.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
