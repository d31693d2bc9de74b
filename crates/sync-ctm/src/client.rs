use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crm_sync_client::{
    fetch_all, take_records, ApiClient, Auth, ClientConfig, PageStrategy, Record, Transport,
};

use crate::error::{Error, ErrorKind, Result};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.calltrackingmetrics.com/api/v1/";

/// Largest page size the calls listing accepts.
pub const MAX_PER_PAGE: u32 = 150;

/// CallTrackingMetrics API client.
///
/// Retries follow the transport's configuration: 429 and transient failures
/// are retried after a fixed delay, 404 never is.
#[derive(Debug, Clone)]
pub struct CallTrackingClient<T = ApiClient> {
    transport: T,
    account_id: Arc<OnceCell<String>>,
}

impl CallTrackingClient<ApiClient> {
    /// Create a client authenticating with a prebuilt Basic token.
    pub fn new(auth_token: impl Into<String>) -> Result<Self> {
        Self::with_config(DEFAULT_BASE_URL, auth_token, ClientConfig::default())
    }

    /// Create a client against a custom API root and HTTP configuration.
    pub fn with_config(
        base_url: impl AsRef<str>,
        auth_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let api = ApiClient::with_config(base_url, Auth::basic_token(auth_token), config)?;
        Ok(Self::from_transport(api))
    }

    /// Read `CTM_AUTH_TOKEN` (and optionally `CTM_BASE_URL`) from the
    /// environment.
    pub fn from_env() -> Result<Self> {
        let token = Auth::secret_from_env("CTM_AUTH_TOKEN")?;
        let base_url = std::env::var("CTM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_config(base_url, token, ClientConfig::default())
    }
}

impl<T: Transport> CallTrackingClient<T> {
    pub fn from_transport(transport: T) -> Self {
        Self {
            transport,
            account_id: Arc::new(OnceCell::new()),
        }
    }

    /// Scope requests to a known account instead of the primary one.
    pub fn with_account_id(self, account_id: impl Into<String>) -> Self {
        Self {
            transport: self.transport,
            account_id: Arc::new(OnceCell::new_with(Some(account_id.into()))),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        self.transport.get(endpoint, params).await.map_err(Into::into)
    }

    /// Every record under `records_key`, following `next_page` links.
    #[instrument(skip(self, params))]
    pub async fn get_all(
        &self,
        endpoint: &str,
        records_key: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Record>> {
        fetch_all(
            &self.transport,
            endpoint,
            params.to_vec(),
            PageStrategy::next_page_url(records_key),
        )
        .await
        .map_err(Into::into)
    }

    /// Accounts visible to the token.
    #[instrument(skip(self))]
    pub async fn accounts(&self) -> Result<Vec<Record>> {
        let body = self.get("accounts", &[]).await?;
        let Value::Object(body) = body else {
            return Err(Error::new(ErrorKind::MalformedResponse(
                "accounts response is not an object".to_string(),
            )));
        };
        take_records(&body, "accounts").map_err(Into::into)
    }

    /// Id of the primary (first) account, resolved once.
    pub async fn account_id(&self) -> Result<&str> {
        let id = self
            .account_id
            .get_or_try_init(|| async {
                let accounts = self.accounts().await?;
                let id = accounts
                    .first()
                    .and_then(|account| account.get("id"))
                    .and_then(id_string)
                    .ok_or_else(|| Error::new(ErrorKind::NoAccounts))?;
                debug!(account_id = %id, "Resolved primary account");
                Ok::<_, Error>(id)
            })
            .await?;
        Ok(id.as_str())
    }

    /// Every call of the account. `per_page` defaults to the maximum.
    #[instrument(skip(self, params))]
    pub async fn calls(&self, params: &[(String, String)]) -> Result<Vec<Record>> {
        let mut params = params.to_vec();
        if !params.iter().any(|(name, _)| name == "per_page") {
            params.push(("per_page".to_string(), MAX_PER_PAGE.to_string()));
        }

        let account_id = self.account_id().await?;
        self.get_all(&format!("accounts/{}/calls", account_id), "calls", &params)
            .await
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
