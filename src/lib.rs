//! # crm-sync
//!
//! API clients for batch jobs that synchronize records between a primary
//! CRM, a legacy CRM and a call-tracking service.
//!
//! ## Security
//!
//! - Credentials are redacted in Debug output
//! - Tracing skips request bodies and credentials
//! - Error messages sanitize API keys and authorization headers
//!
//! ## Crates
//!
//! - **crm-sync-client** - HTTP transport: retry, rate limiting, error classification, pagination
//! - **crm-sync-close** - Close: offset pagination, structured search, count, concurrent batch dispatch
//! - **crm-sync-ctm** - CallTrackingMetrics: accounts and `next_page` call listings
//! - **crm-sync-sell** - Zendesk Sell: page-number listings with `updated_at` cut-offs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crm_sync::close::{query, BatchItem, CloseClient, DispatchOptions, SearchOptions};
//! use crm_sync::client::RequestMethod;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     crm_sync::init_tracing();
//!     let close = CloseClient::from_env()?;
//!
//!     let stale = close
//!         .search(
//!             &query::field_condition("lead", "status_label", query::Condition::exact("Stale")),
//!             SearchOptions::default().with_fields(["id"]),
//!         )
//!         .await?;
//!
//!     let items = stale
//!         .iter()
//!         .filter_map(|lead| lead.get("id")?.as_str())
//!         .map(|id| BatchItem::new(format!("lead/{id}/")))
//!         .collect();
//!     let outcome = close
//!         .dispatch_all(RequestMethod::Delete, items, DispatchOptions::default())
//!         .await?;
//!
//!     for failure in &outcome.failures {
//!         eprintln!("{} failed", failure.endpoint());
//!     }
//!     Ok(())
//! }
//! ```

// Re-export all crates for convenient access
#[cfg(feature = "client")]
pub use crm_sync_client as client;
#[cfg(feature = "close")]
pub use crm_sync_close as close;
#[cfg(feature = "calltracking")]
pub use crm_sync_ctm as calltracking;
#[cfg(feature = "sell")]
pub use crm_sync_sell as sell;

// Re-export commonly used types at the top level
#[cfg(feature = "calltracking")]
pub use crm_sync_ctm::CallTrackingClient;
#[cfg(feature = "client")]
pub use crm_sync_client::{ClientConfig, Record, RetryConfig};
#[cfg(feature = "close")]
pub use crm_sync_close::{BatchOutcome, CloseClient, Query, SearchOptions};
#[cfg(feature = "sell")]
pub use crm_sync_sell::SellClient;

/// Install a `tracing` subscriber for a batch job.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Does nothing if
/// a global subscriber is already set.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
