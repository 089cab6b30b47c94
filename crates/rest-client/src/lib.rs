//! Generic REST client infrastructure.
//!
//! A thin wrapper around `reqwest` that every exchange client in the
//! workspace issues its HTTP calls through:
//!
//! - one request path for GET/POST/PUT/DELETE with optional query and headers
//! - JSON response decoding, or body-less success for keepalive-style calls
//! - `RestError` classifying transport, HTTP status and decoding failures
//!
//! No retries happen here; every failure is returned to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use rest_client::{Method, RestClient};
//!
//! let client = RestClient::with_default_timeout("https://api.binance.com")?;
//! let depth: serde_json::Value = client
//!     .request(Method::GET, "/api/v3/depth", Some("symbol=BTCUSDT&limit=5"), None)
//!     .await?;
//! ```

mod client;
mod error;

pub use client::{Method, RestClient};
pub use error::RestError;
