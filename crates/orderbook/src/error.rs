//! Order book error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons an update is refused. A refused update changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderBookError {
    /// Price must be strictly positive.
    #[error("invalid price: {0}")]
    InvalidPrice(Decimal),

    /// Quantity must not be negative.
    #[error("invalid quantity {quantity} at price {price}")]
    InvalidQuantity { price: Decimal, quantity: Decimal },
}
