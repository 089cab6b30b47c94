//! Binance REST API client.
//!
//! - **Request variants**: public, API-key authenticated and HMAC-signed
//! - **Depth snapshots**: `GET /api/v3/depth` decoded into exact decimals,
//!   also exposed as a [`connector_core::SnapshotSource`]
//! - **Listen keys**: create, keep alive and close user data stream keys
//! - **Time synchronization**: signed timestamps follow the server clock
//!
//! # Example
//!
//! ```rust,ignore
//! use binance_rest::BinanceRestClient;
//! use common::BinanceEnvironment;
//!
//! let client = BinanceRestClient::new(BinanceEnvironment::Production)?;
//! let snapshot = client.get_depth_snapshot("BTCUSDT", 100).await?;
//! println!("{} bid levels", snapshot.bids.len());
//! ```

mod client;
mod error;
mod responses;

pub use client::{BinanceRestClient, DEFAULT_SNAPSHOT_LIMIT};
pub use error::BinanceRestError;
pub use responses::{DepthSnapshotResponse, ListenKeyResponse, ServerTimeResponse};
