//! Sorted projections of arbitrary price level mappings.
//!
//! [`BookSide`](crate::BookSide) is already ordered; these helpers cover
//! mappings that came from elsewhere (a `HashMap`, a copied snapshot, a
//! plain list of pairs).

use rust_decimal::Decimal;

use crate::level::PriceLevel;

/// Levels ordered by descending price, best bid first.
pub fn sort_bids<I>(levels: I) -> Vec<PriceLevel>
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let mut sorted: Vec<PriceLevel> = levels.into_iter().map(PriceLevel::from).collect();
    sorted.sort_unstable_by(|a, b| b.price.cmp(&a.price));
    sorted
}

/// Levels ordered by ascending price, best ask first.
pub fn sort_asks<I>(levels: I) -> Vec<PriceLevel>
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let mut sorted: Vec<PriceLevel> = levels.into_iter().map(PriceLevel::from).collect();
    sorted.sort_unstable_by(|a, b| a.price.cmp(&b.price));
    sorted
}

/// First level of a sorted projection.
pub fn first(sorted: &[PriceLevel]) -> Option<PriceLevel> {
    sorted.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn mapping(prices: &[&str]) -> HashMap<Decimal, Decimal> {
        prices
            .iter()
            .map(|p| (Decimal::from_str(p).unwrap(), dec!(1)))
            .collect()
    }

    #[test]
    fn test_sort_bids_is_numeric_not_lexical() {
        // Lexically "9" > "8.5" > "10"; numerically 10 is the best bid.
        let sorted = sort_bids(mapping(&["9", "10", "8.5"]));
        let prices: Vec<_> = sorted.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![dec!(10), dec!(9), dec!(8.5)]);
    }

    #[test]
    fn test_sort_asks_ascending() {
        let sorted = sort_asks(mapping(&["100.5", "100.25", "99.999", "1000"]));
        let prices: Vec<_> = sorted.iter().map(|l| l.price).collect();
        assert_eq!(
            prices,
            vec![dec!(99.999), dec!(100.25), dec!(100.5), dec!(1000)]
        );
    }

    #[test]
    fn test_strict_ordering_for_populated_mapping() {
        let levels = mapping(&["0.00000001", "0.00000003", "0.00000002", "5", "12.75"]);

        let bids = sort_bids(levels.clone());
        assert!(bids.windows(2).all(|w| w[0].price > w[1].price));

        let asks = sort_asks(levels);
        assert!(asks.windows(2).all(|w| w[0].price < w[1].price));
    }

    #[test]
    fn test_first_of_empty_is_none() {
        assert_eq!(first(&sort_bids(Vec::new())), None);
        assert_eq!(
            first(&sort_asks(vec![(dec!(2), dec!(3)), (dec!(1), dec!(4))])),
            Some(PriceLevel::new(dec!(1), dec!(4)))
        );
    }
}
