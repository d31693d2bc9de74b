use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument};

use crm_sync_client::{
    ApiClient, Auth, ClientConfig, PageStrategy, Paginator, Record, RetryConfig, Transport,
};

use crate::error::{Error, ErrorKind, Result};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.getbase.com/v2/";

/// Page size of every listing.
pub const PER_PAGE: u32 = 50;

/// Listable object collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SellObject {
    Leads,
    Contacts,
    Deals,
    Notes,
    Tasks,
    Users,
}

impl SellObject {
    pub fn endpoint(&self) -> &'static str {
        match self {
            SellObject::Leads => "leads",
            SellObject::Contacts => "contacts",
            SellObject::Deals => "deals",
            SellObject::Notes => "notes",
            SellObject::Tasks => "tasks",
            SellObject::Users => "users",
        }
    }
}

impl fmt::Display for SellObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// Resources that carry (or lead to) an email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Lead,
    Contact,
    /// Resolved through the deal's contact.
    Deal,
}

/// Zendesk Sell API client.
#[derive(Debug, Clone)]
pub struct SellClient<T = ApiClient> {
    transport: T,
}

impl SellClient<ApiClient> {
    /// Create a client authenticating with a bearer access token.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_config(DEFAULT_BASE_URL, access_token, Self::default_config())
    }

    /// Create a client against a custom API root and HTTP configuration.
    pub fn with_config(
        base_url: impl AsRef<str>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let api = ApiClient::with_config(base_url, Auth::bearer(access_token), config)?;
        Ok(Self::from_transport(api))
    }

    /// Read `SELL_ACCESS_TOKEN` (and optionally `SELL_BASE_URL`) from the
    /// environment.
    pub fn from_env() -> Result<Self> {
        let token = Auth::secret_from_env("SELL_ACCESS_TOKEN")?;
        let base_url =
            std::env::var("SELL_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_config(base_url, token, Self::default_config())
    }

    /// Transient failures are retried; 429 is returned to the caller.
    pub fn default_config() -> ClientConfig {
        ClientConfig::builder()
            .with_retry(RetryConfig::default().without_rate_limit_retry())
            .build()
    }
}

impl<T: Transport> SellClient<T> {
    pub fn from_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Every object of a collection, most recently updated first.
    ///
    /// With `since`, the walk stops at the first object not updated after
    /// it; older objects are never fetched.
    #[instrument(skip(self))]
    pub async fn all_items(
        &self,
        object: SellObject,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>> {
        let params = vec![("sort_by".to_string(), "updated_at:desc".to_string())];
        let mut pages = Paginator::new(
            &self.transport,
            object.endpoint(),
            params,
            PageStrategy::page_number("items", PER_PAGE),
        );

        let mut items = Vec::new();
        while let Some(page) = pages.next_page().await? {
            for envelope in page {
                let item = unwrap_data(envelope, object.endpoint())?;
                if let Some(since) = since {
                    if updated_at(&item)? <= since {
                        debug!(%object, items = items.len(), "Reached cut-off");
                        return Ok(items);
                    }
                }
                items.push(item);
            }
        }
        Ok(items)
    }

    /// User email to user id.
    #[instrument(skip(self))]
    pub async fn user_ids_by_email(&self) -> Result<HashMap<String, String>> {
        let users = self.all_items(SellObject::Users, None).await?;
        Ok(users
            .iter()
            .filter_map(|user| {
                let email = user.get("email")?.as_str()?;
                let id = id_string(user.get("id")?)?;
                Some((email.to_string(), id))
            })
            .collect())
    }

    /// One object by id.
    pub async fn retrieve(&self, object: SellObject, id: &str) -> Result<Record> {
        let endpoint = format!("{}/{}", object.endpoint(), id);
        let body = self.transport.get(&endpoint, &[]).await?;
        match body {
            Value::Object(envelope) => unwrap_data(envelope, &endpoint),
            _ => Err(Error::new(ErrorKind::MalformedResponse(format!(
                "{} did not return an object",
                endpoint
            )))),
        }
    }

    /// Email address of a lead, contact, or a deal's contact.
    ///
    /// A missing resource surfaces as the transport's not-found error.
    #[instrument(skip(self))]
    pub async fn email_address(&self, resource: ResourceType, id: &str) -> Result<Option<String>> {
        let holder = match resource {
            ResourceType::Lead => self.retrieve(SellObject::Leads, id).await?,
            ResourceType::Contact => self.retrieve(SellObject::Contacts, id).await?,
            ResourceType::Deal => {
                let deal = self.retrieve(SellObject::Deals, id).await?;
                let contact_id = deal
                    .get("contact_id")
                    .and_then(id_string)
                    .ok_or_else(|| Error::new(ErrorKind::NoContact(id.to_string())))?;
                self.retrieve(SellObject::Contacts, &contact_id).await?
            }
        };

        Ok(holder
            .get("email")
            .and_then(Value::as_str)
            .filter(|email| !email.is_empty())
            .map(str::to_string))
    }
}

/// `{"data": {...}, "meta": {...}}` to the inner record.
fn unwrap_data(mut envelope: Record, context: &str) -> Result<Record> {
    match envelope.remove("data") {
        Some(Value::Object(data)) => Ok(data),
        _ => Err(Error::new(ErrorKind::MalformedResponse(format!(
            "{} item has no data object",
            context
        )))),
    }
}

fn updated_at(item: &Record) -> Result<DateTime<Utc>> {
    let raw = item
        .get("updated_at")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::new(ErrorKind::MalformedResponse(
                "item has no updated_at".to_string(),
            ))
        })?;
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error {
            kind: ErrorKind::MalformedResponse(format!("bad updated_at {:?}: {}", raw, e)),
            source: Some(Box::new(e)),
        })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SellClient {
        SellClient::with_config(
            format!("{}/v2/", server.uri()),
            "sell-token",
            SellClient::default_config(),
        )
        .unwrap()
    }

    fn envelope(id: u64, updated_at: &str) -> Value {
        json!({"data": {"id": id, "updated_at": updated_at}, "meta": {"type": "lead"}})
    }

    async fn mount_page(server: &MockServer, page: u32, items: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/v2/leads"))
            .and(header("Authorization", "Bearer sell-token"))
            .and(query_param("page", page.to_string()))
            .and(query_param("per_page", "50"))
            .and(query_param("sort_by", "updated_at:desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": items,
                "meta": {"type": "collection"}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_all_items_until_empty_page() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            1,
            vec![
                envelope(3, "2024-03-03T10:00:00Z"),
                envelope(2, "2024-03-02T10:00:00Z"),
            ],
        )
        .await;
        mount_page(&server, 2, vec![envelope(1, "2024-03-01T10:00:00Z")]).await;
        mount_page(&server, 3, vec![]).await;

        let leads = client(&server)
            .all_items(SellObject::Leads, None)
            .await
            .unwrap();
        let ids: Vec<u64> = leads.iter().map(|l| l["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, [3, 2, 1]);
    }

    #[tokio::test]
    async fn test_all_items_stops_at_cut_off() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            1,
            vec![
                envelope(3, "2024-03-03T10:00:00Z"),
                envelope(2, "2024-03-02T10:00:00+00:00"),
            ],
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/v2/leads"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(0)
            .mount(&server)
            .await;

        let since = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        let leads = client(&server)
            .all_items(SellObject::Leads, Some(since))
            .await
            .unwrap();

        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0]["id"], 3);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/users"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).user_ids_by_email().await.unwrap_err();
        assert!(err.is_rate_limited());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_deal_email_resolves_contact() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/deals/55"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"id": 55, "contact_id": 77}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/contacts/77"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"id": 77, "email": "pat@example.com"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/deals/56"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"id": 56, "contact_id": null}})),
            )
            .mount(&server)
            .await;

        let sell = client(&server);
        assert_eq!(
            sell.email_address(ResourceType::Deal, "55").await.unwrap().as_deref(),
            Some("pat@example.com")
        );
        let err = sell.email_address(ResourceType::Deal, "56").await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NoContact(_)));
    }

    #[test]
    fn test_updated_at_parsing() {
        let mut item = Record::new();
        item.insert("updated_at".into(), json!("2024-03-02T12:00:00-02:00"));
        assert_eq!(
            updated_at(&item).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 2, 14, 0, 0).unwrap()
        );

        item.insert("updated_at".into(), json!("yesterday"));
        assert!(matches!(
            updated_at(&item).unwrap_err().kind,
            ErrorKind::MalformedResponse(_)
        ));
    }
}
