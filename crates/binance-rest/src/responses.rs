//! Binance API response types.

use model::{deserialize_levels, DepthSnapshot, PriceLevelUpdate};
use serde::Deserialize;

/// Response from GET /api/v3/time.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerTimeResponse {
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

/// Response from POST /api/v3/userDataStream.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenKeyResponse {
    #[serde(rename = "listenKey")]
    pub listen_key: String,
}

/// Response from GET /api/v3/depth.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthSnapshotResponse {
    #[serde(rename = "lastUpdateId", default)]
    pub last_update_id: Option<u64>,
    #[serde(deserialize_with = "deserialize_levels")]
    pub bids: Vec<PriceLevelUpdate>,
    #[serde(deserialize_with = "deserialize_levels")]
    pub asks: Vec<PriceLevelUpdate>,
}

impl DepthSnapshotResponse {
    /// Attach the symbol the snapshot was requested for.
    pub fn into_snapshot(self, symbol: &str) -> DepthSnapshot {
        DepthSnapshot {
            symbol: symbol.to_string(),
            last_update_id: self.last_update_id,
            bids: self.bids,
            asks: self.asks,
        }
    }
}
