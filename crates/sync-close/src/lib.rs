//! # crm-sync-close
//!
//! Close CRM client for batch sync jobs.
//!
//! ## Features
//!
//! - **Offset pagination** - `get_all` walks `_skip`/`has_more` listings
//! - **Structured search** - cursor-paginated `data/search/` with a typed
//!   [`Query`] builder
//! - **Count** - single-request aggregate totals
//! - **Concurrent batch dispatch** - slice-bounded fan-out with
//!   success/failure partitioning
//! - **Lookups** - statuses, pipelines, custom fields, users and groups
//!
//! ## Example
//!
//! ```rust,ignore
//! use crm_sync_close::{query, BatchItem, CloseClient, DispatchOptions, SearchOptions};
//! use crm_sync_client::RequestMethod;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), crm_sync_close::Error> {
//!     let close = CloseClient::from_env()?;
//!
//!     let leads = close
//!         .search(
//!             &query::lead_email_query("jane@example.com"),
//!             SearchOptions::default().with_fields(["id", "name"]),
//!         )
//!         .await?;
//!
//!     let items = leads
//!         .iter()
//!         .filter_map(|lead| lead.get("id")?.as_str())
//!         .map(|id| BatchItem::with_payload(format!("lead/{id}/"), serde_json::json!({"status_id": "stat_1"})))
//!         .collect();
//!
//!     let outcome = close
//!         .dispatch_all(RequestMethod::Put, items, DispatchOptions::default())
//!         .await?;
//!     println!("{} updated, {} failed", outcome.successes.len(), outcome.failures.len());
//!     Ok(())
//! }
//! ```

mod client;
mod dispatch;
mod error;
pub mod query;
mod search;

#[cfg(test)]
mod test_support;

pub use client::{CloseClient, DEFAULT_BASE_URL};
pub use dispatch::{
    BatchFailure, BatchItem, BatchOutcome, ConcurrentFetch, DispatchOptions, FetchFailure,
    FetchRequest, DEFAULT_READ_SLICE_SIZE, DEFAULT_SLICE_SIZE,
};
pub use error::{Error, ErrorKind, Result};
pub use query::{Condition, FieldRef, Moment, Query, SortSpec};
pub use search::{SearchOptions, DEFAULT_OBJECT_TYPE, MAX_PAGE_SIZE, SEARCH_ENDPOINT};

pub use crm_sync_client::Record;

/// Prefix under which custom field values appear on records.
pub const CUSTOM_FIELD_PREFIX: &str = "custom.";
