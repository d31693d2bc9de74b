use serde_json::Value;
use tracing::{debug, instrument};

use crm_sync_client::{take_records, Record, Transport};

use crate::error::{Error, ErrorKind, Result};
use crate::query::Query;
use crate::search::{continuation, CountBody, SearchBody, SearchOptions, DEFAULT_OBJECT_TYPE, SEARCH_ENDPOINT};

impl<T: Transport> super::CloseClient<T> {
    /// Run a structured search and return every match in server order.
    ///
    /// `query` is scoped to `options.object_type` automatically. Pages are
    /// fetched one after another, each request echoing the cursor of the
    /// previous response, until the server returns no cursor.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` before any request when `query` breaks its
    /// invariants; transport errors propagate unchanged.
    #[instrument(skip(self, query, options), fields(object_type = %options.object_type))]
    pub async fn search(&self, query: &Query, options: SearchOptions) -> Result<Vec<Record>> {
        query.validate()?;

        let mut body = SearchBody::new(query, &options);
        let mut records = Vec::new();
        let mut pages = 0u32;

        loop {
            let page = self
                .post(SEARCH_ENDPOINT, serde_json::to_value(&body)?)
                .await?;
            let page = super::into_record(page, SEARCH_ENDPOINT)?;
            let data = take_records(&page, "data")?;
            pages += 1;
            debug!(page = pages, results = data.len(), "Fetched search page");
            records.extend(data);

            match continuation(page.get("cursor")) {
                Some(cursor) => body.cursor = Some(cursor.clone()),
                None => break,
            }
        }

        Ok(records)
    }

    /// Count the matches of `query` without fetching them.
    ///
    /// Always exactly one request.
    #[instrument(skip(self, query))]
    pub async fn count(&self, query: &Query, object_type: Option<&str>) -> Result<u64> {
        query.validate()?;

        let object_type = object_type.unwrap_or(DEFAULT_OBJECT_TYPE);
        let body = serde_json::to_value(CountBody::new(query, object_type))?;
        let response = self.post(SEARCH_ENDPOINT, body).await?;

        response
            .get("count")
            .and_then(|count| count.get("total"))
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                Error::new(ErrorKind::MalformedResponse(
                    "search response has no count.total".to_string(),
                ))
            })
    }
}
