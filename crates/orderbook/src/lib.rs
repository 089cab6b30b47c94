//! Local order book state for market depth tracking.
//!
//! A [`DepthCache`] holds one symbol's bid and ask [`BookSide`]s. Both sides
//! are keyed by exact `Decimal` prices, so numeric ordering never depends on
//! string or float comparison. Zero quantities delete levels; every stored
//! level has a strictly positive quantity.
//!
//! # Example
//!
//! ```rust
//! use model::DepthEvent;
//! use orderbook::DepthCache;
//! use rust_decimal_macros::dec;
//!
//! let mut cache = DepthCache::new();
//! let event = DepthEvent::new(
//!     "BTCUSDT",
//!     vec![(dec!(100.0), dec!(1.0)), (dec!(99.0), dec!(2.0))],
//!     vec![(dec!(101.0), dec!(1.5))],
//! );
//! cache.apply_event(&event).unwrap();
//!
//! assert_eq!(cache.best_bid().unwrap().price, dec!(100.0));
//! assert_eq!(cache.best_ask().unwrap().price, dec!(101.0));
//! ```

mod cache;
mod error;
mod level;
mod side;
mod sorted;

pub use cache::DepthCache;
pub use error::OrderBookError;
pub use level::PriceLevel;
pub use side::{BookSide, Side};
pub use sorted::{first, sort_asks, sort_bids};
