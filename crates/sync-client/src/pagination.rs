//! Drives a listing endpoint until it runs out of pages.
//!
//! Three page-continuation styles are supported:
//!
//! | strategy       | request                      | stop when                          |
//! |----------------|------------------------------|------------------------------------|
//! | `Offset`       | `?_skip=<n>`                 | empty page or falsy `has_more`     |
//! | `NextPageUrl`  | follow `next_page` verbatim  | empty page or null `next_page`     |
//! | `PageNumber`   | `?page=<n>&per_page=<k>`     | empty page                         |
//!
//! Pages are requested strictly one after another. Nothing here retries:
//! a transport error ends the walk and propagates.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBuilder, RequestMethod};
use crate::transport::Transport;

/// A schema-less record as returned by a remote system.
pub type Record = Map<String, Value>;

/// How the next page is requested and when the walk ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStrategy {
    /// Offset pagination: the offset advances by the length of each page.
    Offset {
        skip_param: String,
        items_key: String,
        has_more_key: String,
    },
    /// The body carries the absolute URL of the next page.
    NextPageUrl { items_key: String, next_key: String },
    /// 1-based page numbers with a fixed page size.
    PageNumber {
        page_param: String,
        per_page_param: String,
        per_page: u32,
        items_key: String,
    },
}

impl PageStrategy {
    /// `_skip` / `data` / `has_more`.
    pub fn offset() -> Self {
        PageStrategy::Offset {
            skip_param: "_skip".to_string(),
            items_key: "data".to_string(),
            has_more_key: "has_more".to_string(),
        }
    }

    /// Follow `next_page`, reading records from `items_key`.
    pub fn next_page_url(items_key: impl Into<String>) -> Self {
        PageStrategy::NextPageUrl {
            items_key: items_key.into(),
            next_key: "next_page".to_string(),
        }
    }

    /// `page` / `per_page`, reading records from `items_key`.
    pub fn page_number(items_key: impl Into<String>, per_page: u32) -> Self {
        PageStrategy::PageNumber {
            page_param: "page".to_string(),
            per_page_param: "per_page".to_string(),
            per_page,
            items_key: items_key.into(),
        }
    }

    fn items_key(&self) -> &str {
        match self {
            PageStrategy::Offset { items_key, .. }
            | PageStrategy::NextPageUrl { items_key, .. }
            | PageStrategy::PageNumber { items_key, .. } => items_key,
        }
    }
}

#[derive(Debug)]
enum Cursor {
    Offset(usize),
    Url(String),
    Page(u32),
    Done,
}

/// Page-at-a-time walker over a listing endpoint.
///
/// Use [`Paginator::next_page`] to stop early (for example on a date
/// cut-off), or [`Paginator::collect_all`] to drain it.
#[derive(Debug)]
pub struct Paginator<'a, T: Transport> {
    transport: &'a T,
    endpoint: String,
    params: Vec<(String, String)>,
    strategy: PageStrategy,
    cursor: Cursor,
    pages: u32,
}

impl<'a, T: Transport> Paginator<'a, T> {
    /// Start a walk over `endpoint` with caller-supplied query parameters.
    pub fn new(
        transport: &'a T,
        endpoint: impl Into<String>,
        params: Vec<(String, String)>,
        strategy: PageStrategy,
    ) -> Self {
        let cursor = match strategy {
            PageStrategy::Offset { .. } => Cursor::Offset(0),
            PageStrategy::NextPageUrl { .. } => Cursor::Url(String::new()),
            PageStrategy::PageNumber { .. } => Cursor::Page(1),
        };
        let endpoint = endpoint.into();
        Self {
            transport,
            endpoint,
            params,
            strategy,
            cursor,
            pages: 0,
        }
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages
    }

    /// Returns true once the last page has been fetched.
    pub fn is_done(&self) -> bool {
        matches!(self.cursor, Cursor::Done)
    }

    /// Fetch the next page. Returns `None` once the walk is over.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        let request = match (&self.cursor, &self.strategy) {
            (Cursor::Done, _) => return Ok(None),
            (Cursor::Offset(offset), PageStrategy::Offset { skip_param, .. }) => {
                self.base_request()
                    .query(skip_param.as_str(), offset.to_string())
            }
            (Cursor::Url(next), PageStrategy::NextPageUrl { .. }) => {
                if next.is_empty() {
                    self.base_request()
                } else {
                    RequestBuilder::new(RequestMethod::Get, next.as_str())
                }
            }
            (
                Cursor::Page(page),
                PageStrategy::PageNumber {
                    page_param,
                    per_page_param,
                    per_page,
                    ..
                },
            ) => self
                .base_request()
                .query(page_param.as_str(), page.to_string())
                .query(per_page_param.as_str(), per_page.to_string()),
            (cursor, strategy) => {
                return Err(Error::new(ErrorKind::Other(format!(
                    "cursor {:?} does not match strategy {:?}",
                    cursor, strategy
                ))))
            }
        };

        let body = self.transport.send(request).await?;
        let body = match body {
            Value::Object(map) => map,
            other => {
                return Err(Error::new(ErrorKind::MalformedResponse(format!(
                    "expected a JSON object page, got {}",
                    type_name(&other)
                ))))
            }
        };

        let items = take_records(&body, self.strategy.items_key())?;
        self.pages += 1;
        debug!(
            endpoint = %self.endpoint,
            page = self.pages,
            items = items.len(),
            "Fetched page"
        );

        self.cursor = if items.is_empty() {
            Cursor::Done
        } else {
            match (&self.cursor, &self.strategy) {
                (Cursor::Offset(offset), PageStrategy::Offset { has_more_key, .. }) => {
                    if is_truthy(body.get(has_more_key.as_str())) {
                        Cursor::Offset(offset + items.len())
                    } else {
                        Cursor::Done
                    }
                }
                (Cursor::Url(_), PageStrategy::NextPageUrl { next_key, .. }) => {
                    match body.get(next_key.as_str()).and_then(Value::as_str) {
                        Some(next) if !next.is_empty() => Cursor::Url(next.to_string()),
                        _ => Cursor::Done,
                    }
                }
                (Cursor::Page(page), PageStrategy::PageNumber { .. }) => Cursor::Page(page + 1),
                _ => Cursor::Done,
            }
        };

        Ok(Some(items))
    }

    /// Drain every remaining page into one ordered list.
    pub async fn collect_all(mut self) -> Result<Vec<Record>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }

    fn base_request(&self) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Get, self.endpoint.as_str())
            .query_pairs(self.params.iter().cloned())
    }
}

/// Fetch every page of `endpoint` and return the records in server order.
pub async fn fetch_all<T: Transport>(
    transport: &T,
    endpoint: &str,
    params: Vec<(String, String)>,
    strategy: PageStrategy,
) -> Result<Vec<Record>> {
    Paginator::new(transport, endpoint, params, strategy)
        .collect_all()
        .await
}

/// Read `key` from a response body as a list of records.
///
/// A missing or non-list key is a [`ErrorKind::MalformedResponse`], not an
/// empty page.
pub fn take_records(body: &Map<String, Value>, key: &str) -> Result<Vec<Record>> {
    let items = body
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::missing_key(key))?;

    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map.clone()),
            other => Err(Error::new(ErrorKind::MalformedResponse(format!(
                "`{}` contains a {} where a record was expected",
                key,
                type_name(other)
            )))),
        })
        .collect()
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays canned bodies and records every request it sees.
    struct Scripted {
        bodies: Mutex<Vec<Value>>,
        seen: Mutex<Vec<RequestBuilder>>,
    }

    impl Scripted {
        fn new(bodies: Vec<Value>) -> Self {
            Self {
                bodies: Mutex::new(bodies.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<RequestBuilder> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for Scripted {
        async fn send(&self, request: RequestBuilder) -> Result<Value> {
            self.seen.lock().unwrap().push(request);
            self.bodies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| Error::new(ErrorKind::Other("no more pages scripted".into())))
        }
    }

    fn page(ids: std::ops::Range<u32>, has_more: bool) -> Value {
        let data: Vec<Value> = ids.map(|i| json!({"id": format!("lead_{i}")})).collect();
        json!({"data": data, "has_more": has_more})
    }

    #[tokio::test]
    async fn test_offset_pages_until_empty() {
        let transport = Scripted::new(vec![
            page(0..3, true),
            page(3..6, true),
            page(6..8, true),
            page(8..8, true),
        ]);

        let records = fetch_all(&transport, "lead/", vec![], PageStrategy::offset())
            .await
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(
            ids,
            ["lead_0", "lead_1", "lead_2", "lead_3", "lead_4", "lead_5", "lead_6", "lead_7"]
        );

        let skips: Vec<String> = transport
            .seen()
            .iter()
            .map(|r| r.query_param("_skip").unwrap().to_string())
            .collect();
        assert_eq!(skips, ["0", "3", "6", "8"]);
    }

    #[tokio::test]
    async fn test_offset_stops_on_has_more_false() {
        let transport = Scripted::new(vec![page(0..2, true), page(2..3, false)]);

        let records = fetch_all(
            &transport,
            "activity/note/",
            vec![("_fields".into(), "id,note".into())],
            PageStrategy::offset(),
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 3);
        let seen = transport.seen();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|r| r.query_param("_fields") == Some("id,note")));
    }

    #[tokio::test]
    async fn test_missing_has_more_means_exhausted() {
        let transport = Scripted::new(vec![json!({"data": [{"id": "a"}]})]);
        let records = fetch_all(&transport, "lead/", vec![], PageStrategy::offset())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(transport.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_items_key_is_malformed() {
        let transport = Scripted::new(vec![json!({"has_more": false})]);
        let err = fetch_all(&transport, "lead/", vec![], PageStrategy::offset())
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_next_page_url_is_followed_verbatim() {
        let transport = Scripted::new(vec![
            json!({"calls": [{"id": 1}, {"id": 2}], "next_page": "https://api.example.com/calls?page=2&per_page=2"}),
            json!({"calls": [{"id": 3}], "next_page": null}),
        ]);

        let records = fetch_all(
            &transport,
            "accounts/7/calls",
            vec![("per_page".into(), "2".into())],
            PageStrategy::next_page_url("calls"),
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 3);
        let seen = transport.seen();
        assert_eq!(seen[0].url(), "accounts/7/calls");
        assert_eq!(seen[0].query_param("per_page"), Some("2"));
        assert_eq!(seen[1].url(), "https://api.example.com/calls?page=2&per_page=2");
        assert!(seen[1].query_params().is_empty());
    }

    #[tokio::test]
    async fn test_page_number_stops_on_empty_page() {
        let transport = Scripted::new(vec![
            json!({"items": [{"data": {"id": 1}}, {"data": {"id": 2}}]}),
            json!({"items": []}),
        ]);

        let mut paginator = Paginator::new(
            &transport,
            "v2/leads",
            vec![],
            PageStrategy::page_number("items", 2),
        );

        assert_eq!(paginator.next_page().await.unwrap().unwrap().len(), 2);
        assert_eq!(paginator.next_page().await.unwrap().unwrap().len(), 0);
        assert!(paginator.is_done());
        assert!(paginator.next_page().await.unwrap().is_none());
        assert_eq!(paginator.pages_fetched(), 2);

        let seen = transport.seen();
        assert_eq!(seen[0].query_param("page"), Some("1"));
        assert_eq!(seen[1].query_param("page"), Some("2"));
        assert_eq!(seen[1].query_param("per_page"), Some("2"));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = Scripted::new(vec![page(0..2, true)]);
        let err = fetch_all(&transport, "lead/", vec![], PageStrategy::offset())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no more pages scripted"));
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&Value::Null)));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(is_truthy(Some(&json!(true))));
        assert!(is_truthy(Some(&json!(1))));
    }
}
