//! Authentication and signing for the Binance API.
//!
//! - **Credentials**: the API key is sent as a header, the secret is wrapped in
//!   `SecretString`, redacted from `Debug` and only ever fed to HMAC.
//! - **Signing**: parameters are serialized in insertion order, URL-encoded,
//!   stamped with `timestamp` and `recvWindow`, then signed with HMAC-SHA256.
//!
//! # Example
//!
//! ```rust,ignore
//! use auth::{ApiCredentials, RequestSigner};
//!
//! let credentials = ApiCredentials::from_env()?;
//! let signer = RequestSigner::new(&credentials);
//!
//! let signed = signer.sign_params_now(&[("symbol", "BTCUSDT")])?;
//! let url = format!("/api/v3/openOrders?{}", signed.to_query_string());
//! ```

mod credentials;
mod error;
mod signer;

pub use credentials::ApiCredentials;
pub use error::AuthError;
pub use signer::{RequestSigner, SignedQuery, DEFAULT_RECV_WINDOW_MS};
