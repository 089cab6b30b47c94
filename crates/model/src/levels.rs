//! Exact-decimal parsing of `[price, quantity]` arrays.
//!
//! Binance sends levels as `[["100.10", "2.5"], ...]`. Some payloads carry
//! numbers instead of strings, and older endpoints append extra elements; both
//! are accepted. Values never pass through `f64`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::depth::PriceLevelUpdate;

/// Errors raised while decoding price levels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelParseError {
    /// The value is neither a decimal string nor a JSON number.
    #[error("invalid decimal value: {0}")]
    InvalidDecimal(String),

    /// A level array had fewer than two elements.
    #[error("price level must have price and quantity, got {0} element(s)")]
    MissingField(usize),
}

/// Parse a decimal from a JSON string or number.
pub fn parse_decimal(value: &Value) -> Result<Decimal, LevelParseError> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(LevelParseError::InvalidDecimal(other.to_string())),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| LevelParseError::InvalidDecimal(text))
}

/// Parse a list of `[price, quantity, ..]` arrays, preserving order.
pub fn parse_levels(levels: &[Vec<Value>]) -> Result<Vec<PriceLevelUpdate>, LevelParseError> {
    levels
        .iter()
        .map(|level| match level.as_slice() {
            [price, qty, ..] => Ok((parse_decimal(price)?, parse_decimal(qty)?)),
            short => Err(LevelParseError::MissingField(short.len())),
        })
        .collect()
}

/// Serde adapter for fields holding price level arrays.
pub fn deserialize_levels<'de, D>(deserializer: D) -> Result<Vec<PriceLevelUpdate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<Value>> = Deserialize::deserialize(deserializer)?;
    parse_levels(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_string_and_number() {
        assert_eq!(parse_decimal(&json!("0.00000000")).unwrap(), Decimal::ZERO);
        assert_eq!(parse_decimal(&json!("101.25")).unwrap(), dec!(101.25));
        assert_eq!(parse_decimal(&json!(0)).unwrap(), Decimal::ZERO);
        assert_eq!(parse_decimal(&json!(8.5)).unwrap(), dec!(8.5));
    }

    #[test]
    fn test_parse_scientific_notation() {
        assert_eq!(parse_decimal(&json!("1e-8")).unwrap(), dec!(0.00000001));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_decimal(&json!("abc")),
            Err(LevelParseError::InvalidDecimal(_))
        ));
        assert!(parse_decimal(&json!(null)).is_err());
        assert!(parse_decimal(&json!(["1"])).is_err());
    }

    #[test]
    fn test_parse_levels_ignores_trailing_elements() {
        let raw = vec![
            vec![json!("100.00"), json!("2"), json!([])],
            vec![json!("99.50"), json!("0.1")],
        ];
        let levels = parse_levels(&raw).unwrap();
        assert_eq!(levels, vec![(dec!(100.00), dec!(2)), (dec!(99.50), dec!(0.1))]);
    }

    #[test]
    fn test_parse_levels_short_array() {
        let raw = vec![vec![json!("100.00")]];
        assert_eq!(parse_levels(&raw), Err(LevelParseError::MissingField(1)));
    }

    #[test]
    fn test_deserialize_levels_field() {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(deserialize_with = "deserialize_levels")]
            bids: Vec<PriceLevelUpdate>,
        }

        let payload: Payload = serde_json::from_str(r#"{"bids": [["1.5", "3"]]}"#).unwrap();
        assert_eq!(payload.bids, vec![(dec!(1.5), dec!(3))]);

        let bad = serde_json::from_str::<Payload>(r#"{"bids": [["x", "3"]]}"#);
        assert!(bad.is_err());
    }
}
