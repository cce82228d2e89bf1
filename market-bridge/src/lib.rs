//! Market Bridge: one interface to four marketplace APIs
//!
//! A Rust library that reads catalogs and orders from, and writes stock levels
//! to, Shopify, Amazon, eBay and WooCommerce through a single trait.
//!
//! # What is Market Bridge?
//!
//! Each marketplace authenticates, paginates and reports errors its own way.
//! Market Bridge hides those differences behind [`VendorAdapter`]:
//!
//! - **Full listings**: `list_products` and `list_orders` follow every page
//! - **Raw payloads**: products and orders come back exactly as the vendor sent them
//! - **Uniform errors**: every failure is an [`AdapterError`] naming the vendor
//! - **Non-fatal order fetches**: a failed order fetch is logged once and
//!   reported as [`OrderFetch::Failed`], never as a panic or a silent empty list
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  Caller (inventory sync, reporting job, ...)     │
//! └────────┬─────────────────────────────────────────┘
//!          │ VendorAdapter
//! ┌────────▼─────────────────────────────────────────┐
//! │  Shopify │ Amazon │ eBay │ WooCommerce adapters  │
//! │      auth headers, URLs, cursor handling         │
//! ├──────────────────────────────────────────────────┤
//! │  VendorClient: retry, circuit breaker, paging,   │
//! │  status classification                           │
//! ├──────────────────────────────────────────────────┤
//! │  Transport (HttpTransport over reqwest)          │
//! └────────┬─────────────────────────────────────────┘
//!          │ HTTPS
//!          ▼
//!    marketplace REST APIs
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use market_bridge::{
//!     VendorAdapter,
//!     credentials::{Secret, ShopifyCredentials},
//!     transport::HttpTransport,
//!     vendor::{ClientOptions, ShopifyAdapter},
//! };
//!
//! # async fn example() -> market_bridge::Result<()> {
//! let credentials = ShopifyCredentials::new("demo", Secret::from_env("SHOPIFY_ACCESS_TOKEN")?)
//!     .with_location_id(655_441_491);
//! let shopify = ShopifyAdapter::new(credentials, HttpTransport::new()?, &ClientOptions::default())?;
//!
//! let products = shopify.list_products().await?;
//! println!("{} products", products.len());
//!
//! let orders = shopify.list_orders(Utc::now() - Duration::days(1)).await;
//! if let Some(error) = orders.error() {
//!     eprintln!("orders unavailable: {error}");
//! }
//!
//! shopify.update_stock("808950810", 12).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Adapters for several accounts are usually built from a configuration file,
//! see [`config::AdaptersConfig`].
//!
//! # Security
//!
//! - Every base URL must be HTTPS and not a loopback address
//! - Secrets are redacted in `Debug` output and zeroized on drop
//! - Pagination never follows a cursor to another origin, so credentials
//!   stay with the vendor that issued them
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`]. [`AdapterError::code`] gives a
//! stable identifier for logs and metrics, the vendor's own error code where
//! the vendor supplied one.

pub mod config;
pub mod credentials;
pub mod error;
pub mod observability;
pub mod reliability;
pub mod transport;
pub mod vendor;

pub use error::{AdapterError, Result};
pub use vendor::{Marketplace, OrderFetch, StockAck, Vendor, VendorAdapter};
