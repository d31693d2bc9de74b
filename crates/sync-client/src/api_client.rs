//! Authenticated API session over [`HttpClient`].
//!
//! `ApiClient` combines a base URL and credentials with the retrying HTTP
//! client, and is the production [`Transport`].
//!
//! ## Security
//!
//! - Credentials are redacted in Debug output
//! - Request bodies are skipped in tracing spans

use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::auth::Auth;
use crate::client::HttpClient;
use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::RequestBuilder;
use crate::transport::Transport;

/// Authenticated session against one API root.
///
/// Cloning is cheap: the underlying connection pool is shared.
///
/// # Example
///
/// ```rust,ignore
/// use crm_sync_client::{ApiClient, Auth, Transport};
///
/// let api = ApiClient::new("https://api.close.com/api/v1/", Auth::basic_api_key(key))?;
/// let me = api.get("me/", &[]).await?;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: Url,
    auth: Auth,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a session with the default client configuration.
    pub fn new(base_url: impl AsRef<str>, auth: Auth) -> Result<Self> {
        Self::with_config(base_url, auth, ClientConfig::default())
    }

    /// Create a session with a custom client configuration.
    pub fn with_config(base_url: impl AsRef<str>, auth: Auth, config: ClientConfig) -> Result<Self> {
        let http = HttpClient::new(config)?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url.as_ref())?,
            auth,
        })
    }

    /// The API root every relative endpoint is resolved against.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Resolve an endpoint to an absolute URL.
    ///
    /// Absolute `http(s)://` URLs pass through untouched; anything else is
    /// joined onto the base URL.
    pub fn url(&self, endpoint: &str) -> Result<String> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(endpoint.to_string());
        }
        let joined = self.base_url.join(endpoint.trim_start_matches('/'))?;
        Ok(joined.to_string())
    }
}

impl Transport for ApiClient {
    #[instrument(skip(self, request), fields(method = %request.method(), endpoint = %request.url()))]
    async fn send(&self, mut request: RequestBuilder) -> Result<Value> {
        request.url = self.url(&request.url)?;
        request
            .headers
            .insert("Authorization".to_string(), self.auth.header_value());
        self.http.send_json(&request).await
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::new(ErrorKind::InvalidUrl(format!(
            "{} cannot be used as an API root",
            base_url
        ))));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
