//! # crm-sync-ctm
//!
//! CallTrackingMetrics API client.
//!
//! Listings are paginated by following the absolute `next_page` URL each
//! response carries. Requests are scoped to the primary account, resolved
//! from `accounts` on first use.
//!
//! ## Example
//!
//! ```rust,ignore
//! use crm_sync_ctm::CallTrackingClient;
//!
//! let ctm = CallTrackingClient::from_env()?;
//! let calls = ctm
//!     .calls(&[("start_date".into(), "2024-01-01".into())])
//!     .await?;
//! ```

mod client;
mod error;

pub use client::{CallTrackingClient, DEFAULT_BASE_URL, MAX_PER_PAGE};
pub use error::{Error, ErrorKind, Result};
