//! HTTP request description shared by the transport and its callers.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RequestMethod {
    /// Convert to reqwest::Method.
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Delete => reqwest::Method::DELETE,
        }
    }

    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single API request.
///
/// `url` is either an endpoint relative to the session's base URL
/// (`"lead/"`, `"data/search/"`) or an absolute URL, as returned by
/// APIs that hand out `next_page` links.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub(crate) method: RequestMethod,
    pub(crate) url: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) body: Option<Value>,
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            query_params: Vec::new(),
            body: None,
        }
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Add several query parameters.
    pub fn query_pairs<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a JSON body from any serializable value.
    pub fn json<T: Serialize>(self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)?;
        Ok(self.json_value(value))
    }

    /// Set a raw JSON body.
    pub fn json_value(mut self, body: Value) -> Self {
        self.body = Some(body);
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        self
    }

    /// The request method.
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    /// The relative endpoint or absolute URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query parameters in insertion order.
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    /// Value of the last query parameter named `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Extra headers set on the request.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The JSON body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let req = RequestBuilder::new(RequestMethod::Get, "lead/")
            .header("X-Custom", "value")
            .query("_skip", "0")
            .query_pairs([("_fields", "id,name")]);

        assert_eq!(req.method(), RequestMethod::Get);
        assert_eq!(req.url(), "lead/");
        assert_eq!(req.headers().get("X-Custom"), Some(&"value".to_string()));
        assert_eq!(req.query_params().len(), 2);
        assert_eq!(req.query_param("_fields"), Some("id,name"));
    }

    #[test]
    fn test_query_param_last_wins() {
        let req = RequestBuilder::new(RequestMethod::Get, "lead/")
            .query("_skip", "0")
            .query("_skip", "100");
        assert_eq!(req.query_param("_skip"), Some("100"));
    }

    #[test]
    fn test_json_body() {
        let req = RequestBuilder::new(RequestMethod::Post, "lead/")
            .json(&json!({"name": "Acme Dental"}))
            .unwrap();

        assert_eq!(req.body(), Some(&json!({"name": "Acme Dental"})));
        assert_eq!(
            req.headers().get("Content-Type"),
            Some(&"application/json".to_string())
        );
    }

    #[test]
    fn test_method_display() {
        assert_eq!(RequestMethod::Put.to_string(), "PUT");
        assert_eq!(RequestMethod::Delete.as_str(), "DELETE");
    }
}
