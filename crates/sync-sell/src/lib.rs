//! # crm-sync-sell
//!
//! Read-only client for the legacy Zendesk Sell CRM.
//!
//! Listings are walked page by page, newest first, and can stop at an
//! `updated_at` cut-off. Unlike the other clients, rate limits (429) are
//! surfaced to the caller instead of retried.
//!
//! ## Example
//!
//! ```rust,ignore
//! use crm_sync_sell::{SellClient, SellObject};
//!
//! let sell = SellClient::from_env()?;
//! let since = chrono::Utc::now() - chrono::Duration::days(1);
//! let leads = sell.all_items(SellObject::Leads, Some(since)).await?;
//! ```

mod client;
mod error;

pub use client::{ResourceType, SellClient, SellObject, DEFAULT_BASE_URL, PER_PAGE};
pub use error::{Error, ErrorKind, Result};
