//! # crm-sync-client
//!
//! Core HTTP transport shared by the CRM sync clients.
//!
//! This crate provides:
//! - Automatic retry with configurable backoff
//! - Rate limit detection and handling
//! - Error classification (validation vs. hard failure)
//! - Basic and bearer authentication
//! - Offset, next-page-URL and page-number pagination
//! - Request/response tracing
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │        (crm-sync-close, crm-sync-ctm, crm-sync-sell)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  Transport
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ApiClient                             │
//! │  - Holds base URL + credentials + HTTP client               │
//! │  - Resolves endpoints, attaches Authorization               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HttpClient                             │
//! │  - Raw HTTP with retry, compression, rate limiting          │
//! │  - Error classification                                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use crm_sync_client::{fetch_all, ApiClient, Auth, PageStrategy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), crm_sync_client::Error> {
//!     let key = Auth::secret_from_env("CLOSE_API_KEY")?;
//!     let api = ApiClient::new("https://api.close.com/api/v1/", Auth::basic_api_key(key))?;
//!
//!     let leads = fetch_all(&api, "lead/", vec![], PageStrategy::offset()).await?;
//!     println!("{} leads", leads.len());
//!     Ok(())
//! }
//! ```

mod api_client;
mod auth;
mod client;
mod config;
mod error;
pub mod pagination;
mod request;
mod response;
mod retry;
mod transport;

pub use api_client::ApiClient;
pub use auth::Auth;
pub use client::HttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use pagination::{fetch_all, take_records, PageStrategy, Paginator, Record};
pub use request::{RequestBuilder, RequestMethod};
pub use response::{Response, ResponseExt};
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy};
pub use transport::Transport;

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("crm-sync/", env!("CARGO_PKG_VERSION"));
