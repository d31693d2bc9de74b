//! Close REST API client.
//!
//! `CloseClient` wraps any [`Transport`] (by default the retrying, authenticated
//! [`ApiClient`]) and adds pagination, search, batch dispatch and lookups.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::instrument;

use crm_sync_client::{
    fetch_all, ApiClient, Auth, ClientConfig, PageStrategy, Record, RequestBuilder, RequestMethod,
    Transport,
};

use crate::error::{Error, ErrorKind, Result};

mod dispatch;
mod lookups;
mod search;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.close.com/api/v1/";

/// Close API client.
///
/// Cloning is cheap; clones share the connection pool and the cached
/// organization id.
///
/// # Example
///
/// ```rust,ignore
/// use crm_sync_close::CloseClient;
///
/// let close = CloseClient::new(api_key)?;
/// let opportunities = close
///     .get_all("opportunity/", &[("status_type".into(), "active".into())])
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct CloseClient<T = ApiClient> {
    transport: T,
    organization_id: Arc<OnceCell<String>>,
}

impl CloseClient<ApiClient> {
    /// Create a client for the production API, authenticating with an API
    /// key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(DEFAULT_BASE_URL, api_key, ClientConfig::default())
    }

    /// Create a client against a custom API root and HTTP configuration.
    pub fn with_config(
        base_url: impl AsRef<str>,
        api_key: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let api = ApiClient::with_config(base_url, Auth::basic_api_key(api_key), config)?;
        Ok(Self::from_transport(api))
    }

    /// Read `CLOSE_API_KEY` (and optionally `CLOSE_BASE_URL`) from the
    /// environment.
    pub fn from_env() -> Result<Self> {
        let api_key = Auth::secret_from_env("CLOSE_API_KEY")?;
        let base_url =
            std::env::var("CLOSE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_config(base_url, api_key, ClientConfig::default())
    }
}

impl<T: Transport> CloseClient<T> {
    /// Wrap an existing transport.
    pub fn from_transport(transport: T) -> Self {
        Self {
            transport,
            organization_id: Arc::new(OnceCell::new()),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET a single resource.
    pub async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        self.transport.get(endpoint, params).await.map_err(Into::into)
    }

    /// POST a JSON body.
    pub async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        self.transport.post(endpoint, body).await.map_err(Into::into)
    }

    /// PUT a JSON body.
    pub async fn put(&self, endpoint: &str, body: Value) -> Result<Value> {
        self.transport.put(endpoint, body).await.map_err(Into::into)
    }

    /// DELETE a resource.
    pub async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.transport.delete(endpoint).await.map_err(Into::into)
    }

    /// Fetch every record of an offset-paginated listing, in server order.
    ///
    /// `params` are sent with every page; `_skip` is managed here and
    /// overrides any caller value.
    #[instrument(skip(self, params))]
    pub async fn get_all(&self, endpoint: &str, params: &[(String, String)]) -> Result<Vec<Record>> {
        let params = params
            .iter()
            .filter(|(name, _)| name != "_skip")
            .cloned()
            .collect();
        fetch_all(&self.transport, endpoint, params, PageStrategy::offset())
            .await
            .map_err(Into::into)
    }

    async fn get_record(&self, endpoint: &str, params: &[(String, String)]) -> Result<Record> {
        into_record(self.get(endpoint, params).await?, endpoint)
    }
}

/// Build a request for one batch item.
pub(crate) fn item_request(method: RequestMethod, endpoint: &str, payload: Option<&Value>) -> RequestBuilder {
    let request = RequestBuilder::new(method, endpoint);
    match payload {
        Some(body) => request.json_value(body.clone()),
        None => request,
    }
}

/// A response body that must be a single object.
pub(crate) fn into_record(value: Value, endpoint: &str) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Record::new()),
        other => Err(Error::new(ErrorKind::MalformedResponse(format!(
            "{} returned {} instead of an object",
            endpoint, other
        )))),
    }
}

/// `<resource>/<id>/` with the id percent-encoded.
pub(crate) fn resource_path(resource: &str, id: &str) -> String {
    format!("{}/{}/", resource, urlencoding::encode(id))
}

/// `("_fields", "a,b,c")`.
pub(crate) fn fields_param(fields: &[&str]) -> (String, String) {
    ("_fields".to_string(), fields.join(","))
}
