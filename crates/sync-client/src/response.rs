//! HTTP response handling and error classification.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{Error, ErrorKind, Result};

/// Wrapper around an HTTP response.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Get a header value.
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Get the Retry-After header as a Duration.
    ///
    /// Only the delta-seconds form is understood; fractional seconds are
    /// rounded up.
    pub fn retry_after(&self) -> Option<Duration> {
        parse_retry_after(self.header("retry-after")?)
    }

    /// Get the response body as text.
    pub async fn text(self) -> Result<String> {
        self.inner.text().await.map_err(Into::into)
    }

    /// Read the body as a JSON value. An empty body (`204`, or a `DELETE`
    /// that answers with nothing) becomes `Value::Null`.
    pub async fn json_value(self) -> Result<Value> {
        let text = self.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(Into::into)
    }
}

pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| Duration::from_secs(s.ceil() as u64))
}

/// Extension trait for turning non-2xx responses into typed errors.
pub trait ResponseExt {
    /// Pass successful responses through; classify everything else.
    fn check_api_error(self) -> impl std::future::Future<Output = Result<Response>> + Send;
}

impl ResponseExt for Response {
    async fn check_api_error(self) -> Result<Response> {
        if self.is_success() {
            return Ok(self);
        }

        let status = self.status();
        let retry_after = self.retry_after();
        let body = self.text().await.unwrap_or_default();
        Err(parse_error_response(status, retry_after, &body))
    }
}

/// Classify an error response.
///
/// A body with a non-empty `errors` list or `field-errors` map is a
/// validation error regardless of status (other than 429).
pub(crate) fn parse_error_response(
    status: u16,
    retry_after: Option<Duration>,
    body: &str,
) -> Error {
    if status == 429 {
        return Error::new(ErrorKind::RateLimited { retry_after });
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(kind) = validation_kind(status, &map) {
            return Error::new(kind);
        }
    }

    let sanitized = sanitize_error_message(body);
    let kind = match status {
        401 => ErrorKind::Authentication(sanitized),
        403 => ErrorKind::Authorization(sanitized),
        404 => ErrorKind::NotFound(sanitized),
        _ => ErrorKind::Http {
            status,
            message: sanitized,
        },
    };

    Error::new(kind)
}

fn validation_kind(status: u16, body: &Map<String, Value>) -> Option<ErrorKind> {
    let errors = body
        .get("errors")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let field_errors = body
        .get("field-errors")
        .or_else(|| body.get("field_errors"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    if errors.is_empty() && field_errors.is_empty() {
        return None;
    }

    let message = body
        .get("error")
        .and_then(Value::as_str)
        .map(sanitize_error_message);

    Some(ErrorKind::Validation {
        status,
        message,
        errors,
        field_errors,
    })
}

/// Sanitize an error message to avoid leaking credentials into logs.
///
/// - Redacts API keys (`api_...`)
/// - Redacts `Basic`/`Bearer` credentials echoed back by a server
/// - Truncates messages longer than 500 characters
pub(crate) fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    let mut sanitized = message.to_string();

    if let Ok(key_pattern) = regex_lite::Regex::new(r"api_[A-Za-z0-9.]{16,}") {
        sanitized = key_pattern
            .replace_all(&sanitized, "[REDACTED_KEY]")
            .to_string();
    }

    if let Ok(auth_pattern) = regex_lite::Regex::new(r"(?i)(basic|bearer)\s+[A-Za-z0-9+/=._-]{8,}")
    {
        sanitized = auth_pattern
            .replace_all(&sanitized, "$1 [REDACTED]")
            .to_string();
    }

    if sanitized.len() > MAX_LENGTH {
        let mut cut = MAX_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }

    sanitized
}
