//! Per-symbol depth cache.

use model::{DepthEvent, DepthSnapshot, PriceLevelUpdate};
use rust_decimal::Decimal;

use crate::error::OrderBookError;
use crate::level::PriceLevel;
use crate::side::{BookSide, Side};

/// Bid and ask state for one symbol.
///
/// Updates are validated as a whole before anything is written, so a rejected
/// event or snapshot leaves the cache exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthCache {
    bids: BookSide,
    asks: BookSide,
}

impl Default for DepthCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DepthCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(Side::Bid),
            asks: BookSide::new(Side::Ask),
        }
    }

    pub fn bids(&self) -> &BookSide {
        &self.bids
    }

    pub fn asks(&self) -> &BookSide {
        &self.asks
    }

    /// True when neither side has any level.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Replace both sides with the snapshot's levels.
    ///
    /// Zero-quantity levels in the snapshot are skipped.
    pub fn apply_snapshot(&mut self, snapshot: &DepthSnapshot) -> Result<(), OrderBookError> {
        validate(&snapshot.bids)?;
        validate(&snapshot.asks)?;

        self.bids.clear();
        self.asks.clear();
        apply_levels(&mut self.bids, &snapshot.bids);
        apply_levels(&mut self.asks, &snapshot.asks);
        Ok(())
    }

    /// Apply a diff event: zero quantity deletes, anything else upserts.
    ///
    /// Bids and asks are applied independently, each in event order.
    /// Applying the same event twice yields the same state as applying it once.
    pub fn apply_event(&mut self, event: &DepthEvent) -> Result<(), OrderBookError> {
        validate(&event.bids)?;
        validate(&event.asks)?;

        apply_levels(&mut self.bids, &event.bids);
        apply_levels(&mut self.asks, &event.asks);
        Ok(())
    }

    /// Bids by descending price.
    pub fn sorted_bids(&self) -> Vec<PriceLevel> {
        self.bids.sorted()
    }

    /// Asks by ascending price.
    pub fn sorted_asks(&self) -> Vec<PriceLevel> {
        self.asks.sorted()
    }

    /// Returns the best (highest) bid price level.
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.best()
    }

    /// Returns the best (lowest) ask price level.
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.best()
    }

    /// Returns the top N bid price levels (highest to lowest).
    pub fn top_bids(&self, n: usize) -> Vec<PriceLevel> {
        self.bids.top(n)
    }

    /// Returns the top N ask price levels (lowest to highest).
    pub fn top_asks(&self, n: usize) -> Vec<PriceLevel> {
        self.asks.top(n)
    }

    /// Returns the mid price (average of best bid and best ask).
    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some((bid.price + ask.price) / Decimal::TWO)
    }

    /// Returns the spread (best ask - best bid).
    pub fn spread(&self) -> Option<Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(ask.price - bid.price)
    }

    /// Total bid quantity at or above `price`.
    pub fn bid_depth_at(&self, price: Decimal) -> Decimal {
        self.bids.depth_through(price)
    }

    /// Total ask quantity at or below `price`.
    pub fn ask_depth_at(&self, price: Decimal) -> Decimal {
        self.asks.depth_through(price)
    }

    /// Drop every level on both sides.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }
}

fn validate(levels: &[PriceLevelUpdate]) -> Result<(), OrderBookError> {
    for &(price, quantity) in levels {
        if price <= Decimal::ZERO {
            return Err(OrderBookError::InvalidPrice(price));
        }
        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(OrderBookError::InvalidQuantity { price, quantity });
        }
    }
    Ok(())
}

fn apply_levels(side: &mut BookSide, levels: &[PriceLevelUpdate]) {
    for &(price, quantity) in levels {
        side.apply(price, quantity);
    }
}
