//! One side of an order book.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::level::PriceLevel;

/// Which side of the book a [`BookSide`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Buy orders; best is the highest price.
    Bid,
    /// Sell orders; best is the lowest price.
    Ask,
}

/// Price to quantity mapping for one side.
///
/// Keys compare as exact decimals, so `100.0` and `100.00` are the same
/// level. Stored quantities are always strictly positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<Decimal, Decimal>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Upsert `price` to `quantity`, or remove it when `quantity` is zero.
    ///
    /// Removing an absent price is a no-op. Callers validate signs first.
    pub(crate) fn apply(&mut self, price: Decimal, quantity: Decimal) {
        if quantity.is_zero() {
            self.levels.remove(&price);
        } else {
            self.levels.insert(price, quantity);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.levels.clear();
    }

    /// Quantity resting at `price`, if any.
    pub fn get(&self, price: Decimal) -> Option<Decimal> {
        self.levels.get(&price).copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Unordered view of the raw mapping.
    pub fn levels(&self) -> &BTreeMap<Decimal, Decimal> {
        &self.levels
    }

    /// Levels best-first: descending for bids, ascending for asks.
    pub fn iter_best_first(&self) -> Box<dyn Iterator<Item = PriceLevel> + '_> {
        let levels = self.levels.iter().map(|(p, q)| PriceLevel::new(*p, *q));
        match self.side {
            Side::Bid => Box::new(levels.rev()),
            Side::Ask => Box::new(levels),
        }
    }

    /// All levels, best first.
    pub fn sorted(&self) -> Vec<PriceLevel> {
        self.iter_best_first().collect()
    }

    /// Best level, or `None` when the side is empty.
    pub fn best(&self) -> Option<PriceLevel> {
        self.iter_best_first().next()
    }

    /// The `n` best levels.
    pub fn top(&self, n: usize) -> Vec<PriceLevel> {
        self.iter_best_first().take(n).collect()
    }

    /// Total quantity from the best price through `price` inclusive.
    ///
    /// For bids that is every level at or above `price`, for asks every level
    /// at or below it.
    pub fn depth_through(&self, price: Decimal) -> Decimal {
        match self.side {
            Side::Bid => self.levels.range(price..).map(|(_, q)| q).sum(),
            Side::Ask => self.levels.range(..=price).map(|(_, q)| q).sum(),
        }
    }
}
