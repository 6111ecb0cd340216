/*
[INPUT]:  String-typed wire fields
[OUTPUT]: Decimals, timestamps and enums with field-named errors
[POS]:    Data layer - shared conversions for the model mapping step
[UPDATE]: When the venue changes number or time formats
*/

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::http::{CoinbaseError, Result};

pub(crate) fn decimal(field: &'static str, raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| CoinbaseError::decode(field, raw))
}

/// Blank means "not provided"
pub(crate) fn optional_decimal(field: &'static str, raw: &str) -> Result<Option<Decimal>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    decimal(field, raw).map(Some)
}

pub(crate) fn decimal_or_zero(field: &'static str, raw: &str) -> Result<Decimal> {
    Ok(optional_decimal(field, raw)?.unwrap_or(Decimal::ZERO))
}

pub(crate) fn timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|time| time.with_timezone(&Utc))
        .map_err(|_| CoinbaseError::decode(field, raw))
}

pub(crate) fn unix_seconds(field: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| CoinbaseError::decode(field, raw))
}

pub(crate) fn integer(field: &'static str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| CoinbaseError::decode(field, raw))
}

/// Routes through the enum's serde names so aliases and `Unknown` fallbacks apply
pub(crate) fn enum_value<T: DeserializeOwned>(field: &'static str, raw: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string()))
        .map_err(|_| CoinbaseError::decode(field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Level2Side, OrderSide};

    #[test]
    fn test_decimal_accepts_scientific_notation() {
        assert_eq!(decimal("size", "1.5").unwrap(), Decimal::new(15, 1));
        assert_eq!(decimal("size", "1e-3").unwrap(), Decimal::new(1, 3));
        assert!(decimal("size", "abc").is_err());
    }

    #[test]
    fn test_optional_decimal_treats_blank_as_none() {
        assert_eq!(optional_decimal("best_bid", "").unwrap(), None);
        assert_eq!(optional_decimal("best_bid", "  ").unwrap(), None);
        assert_eq!(decimal_or_zero("avg_price", "").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_timestamp_parses_nanosecond_rfc3339() {
        let time = timestamp("timestamp", "2023-02-09T20:32:50.714964855Z").unwrap();
        assert_eq!(time.timestamp(), 1_675_974_770);
    }

    #[test]
    fn test_unix_seconds() {
        let time = unix_seconds("start", "1688998200").unwrap();
        assert_eq!(time.timestamp(), 1_688_998_200);
        assert!(unix_seconds("start", "soon").is_err());
    }

    #[test]
    fn test_enum_value_uses_serde_names() {
        let side: OrderSide = enum_value("side", "SELL").unwrap();
        assert_eq!(side, OrderSide::Sell);

        let side: Level2Side = enum_value("side", "offer").unwrap();
        assert_eq!(side, Level2Side::Offer);

        let err = enum_value::<Level2Side>("side", "middle").unwrap_err();
        assert!(matches!(err, CoinbaseError::Decode { field: "side", .. }));
    }
}
