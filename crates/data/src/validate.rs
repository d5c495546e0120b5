use senti_trade_core::{MarketDataError, PriceBar};

/// Checks that a per-symbol bar sequence is strictly increasing by
/// timestamp. Duplicates and out-of-order bars are rejected here, at the
/// boundary, so everything downstream can assume a clean sequence.
pub fn validate_ordering(bars: &[PriceBar]) -> Result<(), MarketDataError> {
    for pair in bars.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.timestamp == prev.timestamp {
            return Err(MarketDataError::DuplicateBar {
                symbol: next.symbol.clone(),
                timestamp: next.timestamp,
            });
        }
        if next.timestamp < prev.timestamp {
            return Err(MarketDataError::OutOfOrder {
                symbol: next.symbol.clone(),
                previous: prev.timestamp,
                current: next.timestamp,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bar(hour: u32) -> PriceBar {
        PriceBar {
            symbol: "BTC".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100),
            volume: dec!(1),
        }
    }

    #[test]
    fn ordered_sequence_passes() {
        assert!(validate_ordering(&[bar(0), bar(1), bar(2)]).is_ok());
    }

    #[test]
    fn duplicate_timestamp_is_rejected() {
        let err = validate_ordering(&[bar(0), bar(1), bar(1)]).unwrap_err();
        assert!(matches!(err, MarketDataError::DuplicateBar { .. }));
    }

    #[test]
    fn out_of_order_is_rejected() {
        let err = validate_ordering(&[bar(2), bar(1)]).unwrap_err();
        assert!(matches!(err, MarketDataError::OutOfOrder { .. }));
    }
}
