//! Core HTTP client with retry and error classification.

use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBuilder, RequestMethod};
use crate::response::{Response, ResponseExt};
use crate::retry::RetryPolicy;

/// HTTP client with built-in retry and error classification.
///
/// Requests given to [`HttpClient::execute`] must carry absolute URLs;
/// resolving endpoints against a base URL is the session's job
/// (see [`crate::ApiClient`]).
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.accept_compressed)
            .deflate(config.accept_compressed)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self { inner, config })
    }

    /// Create a new HTTP client with default configuration.
    pub fn default_client() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a GET request builder.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Get, url)
    }

    /// Create a POST request builder.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Post, url)
    }

    /// Create a PUT request builder.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Put, url)
    }

    /// Create a DELETE request builder.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Delete, url)
    }

    /// Execute a request with automatic retry handling.
    ///
    /// Retryable failures (see [`crate::RetryConfig::retries`]) are retried
    /// after the configured backoff. Each retry, 429 included, consumes one
    /// attempt. Non-retryable errors return immediately.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: &RequestBuilder) -> Result<Response> {
        let mut retry_policy = self.config.retry.clone().map(RetryPolicy::new);

        loop {
            let err = match self.execute_once(request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            let Some(policy) = retry_policy.as_mut() else {
                return Err(err);
            };

            if !policy.retries(&err) {
                return Err(err);
            }

            match policy.next_delay(err.retry_after()) {
                Some(delay) => {
                    warn!(
                        attempt = policy.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(Error::with_source(
                        ErrorKind::RetriesExhausted {
                            attempts: policy.attempt(),
                            last_error: err.to_string(),
                        },
                        err,
                    ));
                }
            }
        }
    }

    /// Execute a single request without retry logic.
    async fn execute_once(&self, request: &RequestBuilder) -> Result<Response> {
        let mut url = url::Url::parse(&request.url)?;
        if !request.query_params.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query_params);
        }

        let mut req = self.inner.request(request.method.to_reqwest(), url);

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        if self.config.enable_tracing {
            debug!(method = %request.method, url = %request.url, "Sending request");
        }

        let response = Response::new(req.send().await?);

        if self.config.enable_tracing {
            let status = response.status();
            if response.is_success() {
                debug!(status, "Response received");
            } else {
                info!(status, "Non-success response");
            }
        }

        response.check_api_error().await
    }

    /// Execute a request and read the body as JSON (`Null` when empty).
    pub async fn send_json(&self, request: &RequestBuilder) -> Result<serde_json::Value> {
        let response = self.execute(request).await?;
        response.json_value().await
    }
}
