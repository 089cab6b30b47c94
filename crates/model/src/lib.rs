//! Shared market data types.
//!
//! Prices and quantities are exact decimals everywhere; nothing in this
//! workspace round-trips them through `f64`.

mod depth;
mod levels;

pub use depth::{DepthEvent, DepthSnapshot, PriceLevelUpdate};
pub use levels::{deserialize_levels, parse_decimal, parse_levels, LevelParseError};
