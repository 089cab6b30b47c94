use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A `(price, quantity)` change. Quantity zero deletes the level.
pub type PriceLevelUpdate = (Decimal, Decimal);

/// Incremental order book update received from a diff stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthEvent {
    pub symbol: String,
    /// Exchange event time, when provided.
    pub event_time_ms: Option<i64>,
    /// First update id covered by this event, when provided.
    pub first_update_id: Option<u64>,
    /// Last update id covered by this event, when provided.
    pub final_update_id: Option<u64>,
    /// Bid changes in the order the exchange sent them.
    pub bids: Vec<PriceLevelUpdate>,
    /// Ask changes in the order the exchange sent them.
    pub asks: Vec<PriceLevelUpdate>,
}

impl DepthEvent {
    /// Build an event without sequence information.
    pub fn new(
        symbol: impl Into<String>,
        bids: Vec<PriceLevelUpdate>,
        asks: Vec<PriceLevelUpdate>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            event_time_ms: None,
            first_update_id: None,
            final_update_id: None,
            bids,
            asks,
        }
    }

    /// Attach the `[first, final]` update id range.
    pub fn with_update_ids(mut self, first: u64, last: u64) -> Self {
        self.first_update_id = Some(first);
        self.final_update_id = Some(last);
        self
    }

    /// Both update ids, if the exchange sent them.
    pub fn update_range(&self) -> Option<(u64, u64)> {
        Some((self.first_update_id?, self.final_update_id?))
    }
}

/// Point-in-time full read of one symbol's order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub symbol: String,
    /// Update id the snapshot is consistent with, when provided.
    pub last_update_id: Option<u64>,
    pub bids: Vec<PriceLevelUpdate>,
    pub asks: Vec<PriceLevelUpdate>,
}

impl DepthSnapshot {
    pub fn new(
        symbol: impl Into<String>,
        bids: Vec<PriceLevelUpdate>,
        asks: Vec<PriceLevelUpdate>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            last_update_id: None,
            bids,
            asks,
        }
    }

    pub fn with_last_update_id(mut self, last_update_id: u64) -> Self {
        self.last_update_id = Some(last_update_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_update_range_requires_both_ids() {
        let event = DepthEvent::new("BTCUSDT", vec![(dec!(1), dec!(1))], vec![]);
        assert_eq!(event.update_range(), None);

        let event = event.with_update_ids(10, 12);
        assert_eq!(event.update_range(), Some((10, 12)));
    }

    #[test]
    fn test_snapshot_builder() {
        let snapshot = DepthSnapshot::new("ETHUSDT", vec![], vec![(dec!(2000), dec!(3))])
            .with_last_update_id(77);
        assert_eq!(snapshot.symbol, "ETHUSDT");
        assert_eq!(snapshot.last_update_id, Some(77));
        assert!(snapshot.bids.is_empty());
    }
}
