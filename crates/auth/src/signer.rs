//! HMAC-SHA256 request signing for the Binance API.

use crate::credentials::ApiCredentials;
use crate::error::AuthError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `recvWindow` applied when the caller does not set one.
pub const DEFAULT_RECV_WINDOW_MS: u64 = 6500;

/// A canonical query string and the signature computed over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    /// Exactly the bytes that were signed.
    pub query: String,
    /// Lowercase hex HMAC-SHA256 of `query`.
    pub signature: String,
}

impl SignedQuery {
    /// `query&signature=<hex>`, ready to append after `?`.
    pub fn to_query_string(&self) -> String {
        format!("{}&signature={}", self.query, self.signature)
    }
}

/// Request signer for authenticated Binance API calls.
pub struct RequestSigner<'a> {
    credentials: &'a ApiCredentials,
    recv_window_ms: u64,
}

impl<'a> RequestSigner<'a> {
    /// Create a new request signer with the given credentials.
    pub fn new(credentials: &'a ApiCredentials) -> Self {
        Self {
            credentials,
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
        }
    }

    /// Override the default `recvWindow`.
    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    /// Sign a message and return the hex-encoded signature.
    ///
    /// # Errors
    /// `AuthError::MissingSecret` if the credentials carry no secret.
    pub fn sign(&self, message: &str) -> Result<String, AuthError> {
        let secret = self.credentials.expose_secret()?;
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidKey)?;

        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build the canonical query string for `params` and sign it.
    ///
    /// Parameters keep their insertion order and values are URL-encoded.
    /// `timestamp` is always set to `timestamp_ms`: an existing entry is
    /// overwritten in place, otherwise it is appended. `recvWindow` is
    /// appended with the signer's default unless the caller supplied one.
    pub fn sign_params(
        &self,
        params: &[(&str, &str)],
        timestamp_ms: i64,
    ) -> Result<SignedQuery, AuthError> {
        // Fail before doing any work if we cannot sign.
        self.credentials.expose_secret()?;

        let timestamp = timestamp_ms.to_string();
        let recv_window = self.recv_window_ms.to_string();
        let mut pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|&(k, v)| if k == "timestamp" { (k, timestamp.as_str()) } else { (k, v) })
            .collect();

        if !pairs.iter().any(|(k, _)| *k == "timestamp") {
            pairs.push(("timestamp", timestamp.as_str()));
        }

        if !pairs.iter().any(|(k, _)| *k == "recvWindow") {
            pairs.push(("recvWindow", recv_window.as_str()));
        }

        let query = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let signature = self.sign(&query)?;
        Ok(SignedQuery { query, signature })
    }

    /// [`sign_params`](Self::sign_params) stamped with the current time.
    pub fn sign_params_now(&self, params: &[(&str, &str)]) -> Result<SignedQuery, AuthError> {
        self.sign_params(params, chrono::Utc::now().timestamp_millis())
    }
}
