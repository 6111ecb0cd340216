/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - typed public values for stream events and REST resources
[UPDATE]: When API schema changes or new types added
*/

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{Level2Side, OrderSide, OrderStatus, OrderType, ProductType};

/// Outer wrapper of every stream message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<E> {
    pub channel: String,
    pub client_id: String,
    pub timestamp: DateTime<Utc>,
    pub sequence_num: i64,
    pub events: Vec<E>,
}

pub type CandlesMessage = Envelope<CandleEvent>;
pub type HeartbeatsMessage = Envelope<HeartbeatEvent>;
pub type MarketTradesMessage = Envelope<MarketTradeEvent>;
pub type StatusMessage = Envelope<ProductStatusEvent>;
pub type TickerMessage = Envelope<TickerEvent>;
pub type Level2Message = Envelope<Level2Event>;
pub type UserMessage = Envelope<UserOrderEvent>;
pub type SubscriptionsMessage = Envelope<SubscriptionsEvent>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub start: DateTime<Utc>,
    pub high: Decimal,
    pub low: Decimal,
    pub open: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Empty for REST candles, which are always scoped to one product
    pub product_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleEvent {
    pub event_type: String,
    pub candles: Vec<Candle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartbeatEvent {
    pub event_type: String,
    /// Server clock as printed by the venue (not RFC 3339)
    pub current_time: String,
    pub heartbeat_counter: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketTrade {
    pub trade_id: String,
    pub product_id: String,
    pub price: Decimal,
    pub size: Decimal,
    pub side: OrderSide,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketTradeEvent {
    pub event_type: String,
    pub trades: Vec<MarketTrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticker {
    pub product_id: String,
    pub price: Decimal,
    pub volume_24_h: Decimal,
    pub low_24_h: Decimal,
    pub high_24_h: Decimal,
    pub low_52_w: Decimal,
    pub high_52_w: Decimal,
    pub price_percent_chg_24_h: Decimal,
    pub best_bid: Option<Decimal>,
    pub best_bid_quantity: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub best_ask_quantity: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerEvent {
    pub event_type: String,
    pub tickers: Vec<Ticker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductStatus {
    pub product_type: ProductType,
    pub id: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub base_increment: Decimal,
    pub quote_increment: Decimal,
    pub display_name: String,
    pub status: String,
    pub status_message: String,
    pub min_market_funds: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductStatusEvent {
    pub event_type: String,
    pub products: Vec<ProductStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level2Update {
    pub side: Level2Side,
    pub event_time: DateTime<Utc>,
    pub price_level: Decimal,
    pub new_quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level2Event {
    pub event_type: String,
    pub product_id: String,
    pub updates: Vec<Level2Update>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserOrder {
    pub order_id: String,
    pub client_order_id: String,
    pub cumulative_quantity: Decimal,
    pub leaves_quantity: Decimal,
    pub avg_price: Decimal,
    pub total_fees: Decimal,
    pub status: OrderStatus,
    pub product_id: String,
    pub creation_time: DateTime<Utc>,
    pub order_side: OrderSide,
    pub order_type: OrderType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserOrderEvent {
    pub event_type: String,
    pub orders: Vec<UserOrder>,
}

/// Server acknowledgement listing the product ids active per channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionsEvent {
    pub subscriptions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerTime {
    pub iso: DateTime<Utc>,
    #[serde(rename = "epochSeconds", deserialize_with = "serde_helpers::deserialize_i64")]
    pub epoch_seconds: i64,
    #[serde(rename = "epochMillis", deserialize_with = "serde_helpers::deserialize_i64")]
    pub epoch_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    #[serde(
        default,
        deserialize_with = "serde_helpers::deserialize_decimal_or_zero",
        serialize_with = "serde_helpers::serialize_decimal"
    )]
    pub price: Decimal,
    #[serde(
        default,
        deserialize_with = "serde_helpers::deserialize_decimal_or_zero",
        serialize_with = "serde_helpers::serialize_decimal"
    )]
    pub price_percentage_change_24h: Decimal,
    #[serde(
        default,
        deserialize_with = "serde_helpers::deserialize_decimal_or_zero",
        serialize_with = "serde_helpers::serialize_decimal"
    )]
    pub volume_24h: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_increment: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub quote_increment: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_min_size: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_max_size: Decimal,
    pub base_currency_id: String,
    pub quote_currency_id: String,
    pub product_type: ProductType,
    pub status: String,
    #[serde(default)]
    pub trading_disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub size: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBook {
    pub product_id: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub uuid: String,
    pub name: String,
    pub currency: String,
    pub available_balance: Balance,
    #[serde(default)]
    pub hold: Option<Balance>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(rename = "type", default)]
    pub account_type: String,
    #[serde(default)]
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub product_id: String,
    #[serde(default)]
    pub client_order_id: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    #[serde(default = "default_order_type")]
    pub order_type: OrderType,
    pub created_time: DateTime<Utc>,
    #[serde(
        default,
        deserialize_with = "serde_helpers::deserialize_decimal_or_zero",
        serialize_with = "serde_helpers::serialize_decimal"
    )]
    pub filled_size: Decimal,
    #[serde(
        default,
        deserialize_with = "serde_helpers::deserialize_decimal_or_zero",
        serialize_with = "serde_helpers::serialize_decimal"
    )]
    pub average_filled_price: Decimal,
    #[serde(
        default,
        deserialize_with = "serde_helpers::deserialize_decimal_or_zero",
        serialize_with = "serde_helpers::serialize_decimal"
    )]
    pub total_fees: Decimal,
    #[serde(default)]
    pub completion_percentage: Option<String>,
}

fn default_order_type() -> OrderType {
    OrderType::Unknown
}

mod serde_helpers {
    use super::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use std::str::FromStr;

    pub fn deserialize_decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Decimal::ZERO);
        }

        if let Some(raw) = value.as_str() {
            if raw.trim().is_empty() {
                return Ok(Decimal::ZERO);
            }
            return Decimal::from_str(raw).map_err(serde::de::Error::custom);
        }

        if value.is_number() {
            return Decimal::from_str(&value.to_string()).map_err(serde::de::Error::custom);
        }

        Err(serde::de::Error::custom("invalid decimal value"))
    }

    pub fn serialize_decimal<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    /// Accepts both `"1700000000"` and `1700000000`
    pub fn deserialize_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(raw) => raw.trim().parse().map_err(serde::de::Error::custom),
            Value::Number(number) => number
                .as_i64()
                .ok_or_else(|| serde::de::Error::custom("integer out of range")),
            _ => Err(serde::de::Error::custom("invalid integer value")),
        }
    }
}
