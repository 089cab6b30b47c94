//! Binance REST API client.

use crate::error::BinanceRestError;
use crate::responses::{DepthSnapshotResponse, ListenKeyResponse, ServerTimeResponse};
use async_trait::async_trait;
use auth::{ApiCredentials, AuthError, RequestSigner};
use common::BinanceEnvironment;
use connector_core::{ConnectorError, SnapshotSource};
use model::DepthSnapshot;
use rest_client::{Method, RestClient};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Request timeout for Binance API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Depth levels requested per snapshot unless configured otherwise.
pub const DEFAULT_SNAPSHOT_LIMIT: u32 = 1000;

/// Binance REST API client.
///
/// Works without credentials for public market data; API-key and signed
/// requests fail with an [`AuthError`] before anything is sent when the
/// required credentials are missing.
pub struct BinanceRestClient {
    client: RestClient,
    credentials: Option<ApiCredentials>,
    environment: BinanceEnvironment,
    snapshot_limit: u32,
    /// Time offset between local clock and Binance server (local - server).
    time_offset_ms: AtomicI64,
}

impl BinanceRestClient {
    /// Create a client for public endpoints only.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(environment: BinanceEnvironment) -> Result<Self, BinanceRestError> {
        let client = RestClient::new(environment.rest_base_url(), REQUEST_TIMEOUT)?;

        Ok(Self {
            client,
            credentials: None,
            environment,
            snapshot_limit: DEFAULT_SNAPSHOT_LIMIT,
            time_offset_ms: AtomicI64::new(0),
        })
    }

    /// Create a client able to issue authenticated requests.
    pub fn with_credentials(
        credentials: ApiCredentials,
        environment: BinanceEnvironment,
    ) -> Result<Self, BinanceRestError> {
        let mut client = Self::new(environment)?;
        client.credentials = Some(credentials);
        Ok(client)
    }

    /// Depth levels requested when acting as a [`SnapshotSource`].
    pub fn with_snapshot_limit(mut self, limit: u32) -> Self {
        self.snapshot_limit = limit;
        self
    }

    /// Get the environment this client is connected to.
    pub fn environment(&self) -> BinanceEnvironment {
        self.environment
    }

    /// Estimated current Binance server time in milliseconds.
    pub fn server_timestamp_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() - self.time_offset_ms.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Request variants
    // ========================================================================

    /// Unauthenticated request.
    pub async fn public_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, BinanceRestError> {
        let query = encode_query(params);
        Ok(self.client.request(method, path, Some(&query), None).await?)
    }

    /// Request authenticated by the `X-MBX-APIKEY` header only.
    pub async fn api_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, BinanceRestError> {
        let headers = [(API_KEY_HEADER, self.credentials()?.api_key())];
        let query = encode_query(params);
        Ok(self
            .client
            .request(method, path, Some(&query), Some(&headers))
            .await?)
    }

    /// API-key request whose response body is ignored.
    async fn api_request_empty(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<(), BinanceRestError> {
        let headers = [(API_KEY_HEADER, self.credentials()?.api_key())];
        let query = encode_query(params);
        Ok(self
            .client
            .request_empty(method, path, Some(&query), Some(&headers))
            .await?)
    }

    /// HMAC-signed request.
    ///
    /// The query is stamped with the server-adjusted timestamp at the moment
    /// of signing. Without a secret the request is never sent.
    pub async fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, BinanceRestError> {
        let credentials = self.credentials()?;
        let signed =
            RequestSigner::new(credentials).sign_params(params, self.server_timestamp_ms())?;
        let headers = [(API_KEY_HEADER, credentials.api_key())];

        Ok(self
            .client
            .request(method, path, Some(&signed.to_query_string()), Some(&headers))
            .await?)
    }

    fn credentials(&self) -> Result<&ApiCredentials, AuthError> {
        self.credentials.as_ref().ok_or(AuthError::MissingApiKey)
    }

    // ========================================================================
    // Time Synchronization
    // ========================================================================

    /// Synchronize with Binance server time.
    ///
    /// Computes the offset between the local clock and the server clock so
    /// that signed timestamps fall inside `recvWindow`.
    pub async fn sync_time(&self) -> Result<(), BinanceRestError> {
        let before = std::time::Instant::now();
        let response: ServerTimeResponse = self
            .public_request(Method::GET, "/api/v3/time", &[])
            .await?;
        let rtt = before.elapsed().as_millis() as i64;

        let local_time = chrono::Utc::now().timestamp_millis();

        // Estimate server time at midpoint of request
        let estimated_server_time = response.server_time + (rtt / 2);
        let offset = local_time - estimated_server_time;

        self.time_offset_ms.store(offset, Ordering::Relaxed);

        tracing::info!(
            server_time = response.server_time,
            offset_ms = offset,
            rtt_ms = rtt,
            "Time synchronized with Binance server"
        );

        Ok(())
    }

    // ========================================================================
    // Market Data
    // ========================================================================

    /// Get order book depth snapshot.
    ///
    /// GET /api/v3/depth
    ///
    /// A single point-in-time read; failures are returned, never retried.
    pub async fn get_depth_snapshot(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<DepthSnapshot, BinanceRestError> {
        let limit = limit.to_string();
        tracing::debug!(symbol = %symbol, limit = %limit, "Fetching depth snapshot");

        let response: DepthSnapshotResponse = self
            .public_request(
                Method::GET,
                "/api/v3/depth",
                &[("symbol", symbol), ("limit", &limit)],
            )
            .await?;

        tracing::debug!(
            symbol = %symbol,
            last_update_id = ?response.last_update_id,
            bid_levels = response.bids.len(),
            ask_levels = response.asks.len(),
            "Depth snapshot received"
        );

        Ok(response.into_snapshot(symbol))
    }

    // ========================================================================
    // Listen Key Management
    // ========================================================================

    /// Create a new listen key for the user data stream.
    ///
    /// POST /api/v3/userDataStream
    pub async fn create_listen_key(&self) -> Result<String, BinanceRestError> {
        let response: ListenKeyResponse = self
            .api_request(Method::POST, "/api/v3/userDataStream", &[])
            .await?;

        tracing::info!("Created listen key");
        Ok(response.listen_key)
    }

    /// Keep an existing listen key alive.
    ///
    /// PUT /api/v3/userDataStream
    pub async fn keepalive_listen_key(&self, listen_key: &str) -> Result<(), BinanceRestError> {
        self.api_request_empty(
            Method::PUT,
            "/api/v3/userDataStream",
            &[("listenKey", listen_key)],
        )
        .await?;

        tracing::debug!("Listen key refreshed");
        Ok(())
    }

    /// Close a listen key.
    ///
    /// DELETE /api/v3/userDataStream
    pub async fn close_listen_key(&self, listen_key: &str) -> Result<(), BinanceRestError> {
        self.api_request_empty(
            Method::DELETE,
            "/api/v3/userDataStream",
            &[("listenKey", listen_key)],
        )
        .await?;

        tracing::info!("Listen key closed");
        Ok(())
    }
}

#[async_trait]
impl SnapshotSource for BinanceRestClient {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<DepthSnapshot, ConnectorError> {
        Ok(self.get_depth_snapshot(symbol, self.snapshot_limit).await?)
    }
}

impl std::fmt::Debug for BinanceRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceRestClient")
            .field("environment", &self.environment)
            .field("base_url", &self.client.base_url())
            .field("credentials", &self.credentials)
            .field("snapshot_limit", &self.snapshot_limit)
            .field(
                "time_offset_ms",
                &self.time_offset_ms.load(Ordering::Relaxed),
            )
            .finish()
    }
}

/// Serialize parameters in order, URL-encoding values.
fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
