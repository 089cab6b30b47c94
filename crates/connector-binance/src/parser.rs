use model::{deserialize_levels, DepthEvent, PriceLevelUpdate};
use serde::Deserialize;
use serde_json::Value;

/// Raw Binance depth update event.
#[derive(Debug, Deserialize)]
pub struct BinanceDepthRaw {
    #[serde(rename = "E", default)]
    pub event_time: Option<i64>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "U", default)]
    pub first_update_id: Option<u64>,
    #[serde(rename = "u", default)]
    pub final_update_id: Option<u64>,
    #[serde(rename = "b", deserialize_with = "deserialize_levels")]
    pub bids: Vec<PriceLevelUpdate>,
    #[serde(rename = "a", deserialize_with = "deserialize_levels")]
    pub asks: Vec<PriceLevelUpdate>,
}

/// Combined stream wrapper: `{"stream": "...", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct CombinedStreamWrapper {
    pub stream: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    DepthUpdate(DepthEvent),
    Unknown,
}

impl From<BinanceDepthRaw> for DepthEvent {
    fn from(raw: BinanceDepthRaw) -> Self {
        DepthEvent {
            symbol: raw.symbol,
            event_time_ms: raw.event_time,
            first_update_id: raw.first_update_id,
            final_update_id: raw.final_update_id,
            bids: raw.bids,
            asks: raw.asks,
        }
    }
}

/// Strip the combined stream envelope, if present.
pub(crate) fn unwrap_payload(raw: Value) -> Result<Value, serde_json::Error> {
    if raw.get("stream").is_some() && raw.get("data").is_some() {
        let wrapper: CombinedStreamWrapper = serde_json::from_value(raw)?;
        Ok(wrapper.data)
    } else {
        Ok(raw)
    }
}

/// Parse a depth stream frame, raw or combined.
///
/// A `depthUpdate` whose levels cannot be decoded exactly is an error, never a
/// partially filled event.
pub fn parse_message(text: &str) -> Result<ParsedMessage, serde_json::Error> {
    let payload = unwrap_payload(serde_json::from_str(text)?)?;

    match payload.get("e").and_then(|v| v.as_str()) {
        Some("depthUpdate") => {
            let depth_raw: BinanceDepthRaw = serde_json::from_value(payload)?;
            Ok(ParsedMessage::DepthUpdate(depth_raw.into()))
        }
        _ => Ok(ParsedMessage::Unknown),
    }
}
