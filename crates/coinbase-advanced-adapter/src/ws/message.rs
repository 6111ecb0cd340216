/*
[INPUT]:  Raw WebSocket JSON text
[OUTPUT]: String-typed wire shapes and their typed public counterparts
[POS]:    WebSocket layer - message shapes and the wire-to-model mapping step
[UPDATE]: When adding new message types or changing format
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::http::{CoinbaseError, Result};
use crate::types::parse;
use crate::types::{
    Candle, CandleEvent, ChannelType, Envelope, HeartbeatEvent, Level2Event, Level2Update,
    MarketTrade, MarketTradeEvent, ProductStatus, ProductStatusEvent, SubscriptionsEvent, Ticker,
    TickerEvent, UserOrder, UserOrderEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Subscribe,
    Unsubscribe,
}

/// Outbound subscribe/unsubscribe request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub kind: ControlKind,
    pub product_ids: Vec<String>,
    pub channel: ChannelType,
    pub api_key: String,
    /// Unix seconds, as a string
    pub timestamp: String,
    pub jwt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireEnvelope<E> {
    pub channel: String,
    #[serde(default)]
    pub client_id: String,
    pub timestamp: String,
    pub sequence_num: i64,
    #[serde(default = "Vec::new")]
    pub events: Vec<E>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireCandle {
    pub start: String,
    pub high: String,
    pub low: String,
    pub open: String,
    pub close: String,
    pub volume: String,
    #[serde(default)]
    pub product_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireCandleEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub candles: Vec<WireCandle>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireHeartbeatEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    pub current_time: String,
    #[serde(deserialize_with = "string_or_number")]
    pub heartbeat_counter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireMarketTrade {
    pub trade_id: String,
    pub product_id: String,
    pub price: String,
    pub size: String,
    pub side: String,
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireMarketTradeEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub trades: Vec<WireMarketTrade>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireTicker {
    pub product_id: String,
    pub price: String,
    #[serde(default)]
    pub volume_24_h: String,
    #[serde(default)]
    pub low_24_h: String,
    #[serde(default)]
    pub high_24_h: String,
    #[serde(default)]
    pub low_52_w: String,
    #[serde(default)]
    pub high_52_w: String,
    #[serde(default)]
    pub price_percent_chg_24_h: String,
    #[serde(default)]
    pub best_bid: String,
    #[serde(default)]
    pub best_bid_quantity: String,
    #[serde(default)]
    pub best_ask: String,
    #[serde(default)]
    pub best_ask_quantity: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireTickerEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub tickers: Vec<WireTicker>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireProductStatus {
    pub product_type: String,
    pub id: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub base_increment: String,
    pub quote_increment: String,
    #[serde(default)]
    pub display_name: String,
    pub status: String,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub min_market_funds: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireProductStatusEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub products: Vec<WireProductStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireLevel2Update {
    pub side: String,
    pub event_time: String,
    pub price_level: String,
    pub new_quantity: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireLevel2Event {
    #[serde(rename = "type", default)]
    pub event_type: String,
    pub product_id: String,
    #[serde(default)]
    pub updates: Vec<WireLevel2Update>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireUserOrder {
    pub order_id: String,
    #[serde(default)]
    pub client_order_id: String,
    #[serde(default)]
    pub cumulative_quantity: String,
    #[serde(default)]
    pub leaves_quantity: String,
    #[serde(default)]
    pub avg_price: String,
    #[serde(default)]
    pub total_fees: String,
    pub status: String,
    pub product_id: String,
    pub creation_time: String,
    pub order_side: String,
    pub order_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireUserOrderEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub orders: Vec<WireUserOrder>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireSubscriptionsEvent {
    #[serde(default)]
    pub subscriptions: BTreeMap<String, Vec<String>>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(raw) => Ok(raw),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn map_all<W, M>(items: Vec<W>) -> Result<Vec<M>>
where
    M: TryFrom<W, Error = CoinbaseError>,
{
    items.into_iter().map(M::try_from).collect()
}

impl<W, E> TryFrom<WireEnvelope<W>> for Envelope<E>
where
    E: TryFrom<W, Error = CoinbaseError>,
{
    type Error = CoinbaseError;

    fn try_from(wire: WireEnvelope<W>) -> Result<Self> {
        Ok(Envelope {
            timestamp: parse::timestamp("timestamp", &wire.timestamp)?,
            channel: wire.channel,
            client_id: wire.client_id,
            sequence_num: wire.sequence_num,
            events: map_all(wire.events)?,
        })
    }
}

impl TryFrom<WireCandle> for Candle {
    type Error = CoinbaseError;

    fn try_from(wire: WireCandle) -> Result<Self> {
        Ok(Candle {
            start: parse::unix_seconds("start", &wire.start)?,
            high: parse::decimal("high", &wire.high)?,
            low: parse::decimal("low", &wire.low)?,
            open: parse::decimal("open", &wire.open)?,
            close: parse::decimal("close", &wire.close)?,
            volume: parse::decimal("volume", &wire.volume)?,
            product_id: wire.product_id,
        })
    }
}

impl TryFrom<WireCandleEvent> for CandleEvent {
    type Error = CoinbaseError;

    fn try_from(wire: WireCandleEvent) -> Result<Self> {
        Ok(CandleEvent {
            event_type: wire.event_type,
            candles: map_all(wire.candles)?,
        })
    }
}

impl TryFrom<WireHeartbeatEvent> for HeartbeatEvent {
    type Error = CoinbaseError;

    fn try_from(wire: WireHeartbeatEvent) -> Result<Self> {
        Ok(HeartbeatEvent {
            heartbeat_counter: parse::integer("heartbeat_counter", &wire.heartbeat_counter)?,
            event_type: wire.event_type,
            current_time: wire.current_time,
        })
    }
}

impl TryFrom<WireMarketTrade> for MarketTrade {
    type Error = CoinbaseError;

    fn try_from(wire: WireMarketTrade) -> Result<Self> {
        Ok(MarketTrade {
            price: parse::decimal("price", &wire.price)?,
            size: parse::decimal("size", &wire.size)?,
            side: parse::enum_value("side", &wire.side)?,
            time: parse::timestamp("time", &wire.time)?,
            trade_id: wire.trade_id,
            product_id: wire.product_id,
        })
    }
}

impl TryFrom<WireMarketTradeEvent> for MarketTradeEvent {
    type Error = CoinbaseError;

    fn try_from(wire: WireMarketTradeEvent) -> Result<Self> {
        Ok(MarketTradeEvent {
            event_type: wire.event_type,
            trades: map_all(wire.trades)?,
        })
    }
}

impl TryFrom<WireTicker> for Ticker {
    type Error = CoinbaseError;

    fn try_from(wire: WireTicker) -> Result<Self> {
        Ok(Ticker {
            price: parse::decimal("price", &wire.price)?,
            volume_24_h: parse::decimal_or_zero("volume_24_h", &wire.volume_24_h)?,
            low_24_h: parse::decimal_or_zero("low_24_h", &wire.low_24_h)?,
            high_24_h: parse::decimal_or_zero("high_24_h", &wire.high_24_h)?,
            low_52_w: parse::decimal_or_zero("low_52_w", &wire.low_52_w)?,
            high_52_w: parse::decimal_or_zero("high_52_w", &wire.high_52_w)?,
            price_percent_chg_24_h: parse::decimal_or_zero(
                "price_percent_chg_24_h",
                &wire.price_percent_chg_24_h,
            )?,
            best_bid: parse::optional_decimal("best_bid", &wire.best_bid)?,
            best_bid_quantity: parse::optional_decimal(
                "best_bid_quantity",
                &wire.best_bid_quantity,
            )?,
            best_ask: parse::optional_decimal("best_ask", &wire.best_ask)?,
            best_ask_quantity: parse::optional_decimal(
                "best_ask_quantity",
                &wire.best_ask_quantity,
            )?,
            product_id: wire.product_id,
        })
    }
}

impl TryFrom<WireTickerEvent> for TickerEvent {
    type Error = CoinbaseError;

    fn try_from(wire: WireTickerEvent) -> Result<Self> {
        Ok(TickerEvent {
            event_type: wire.event_type,
            tickers: map_all(wire.tickers)?,
        })
    }
}

impl TryFrom<WireProductStatus> for ProductStatus {
    type Error = CoinbaseError;

    fn try_from(wire: WireProductStatus) -> Result<Self> {
        Ok(ProductStatus {
            product_type: parse::enum_value("product_type", &wire.product_type)?,
            base_increment: parse::decimal("base_increment", &wire.base_increment)?,
            quote_increment: parse::decimal("quote_increment", &wire.quote_increment)?,
            min_market_funds: parse::optional_decimal("min_market_funds", &wire.min_market_funds)?,
            id: wire.id,
            base_currency: wire.base_currency,
            quote_currency: wire.quote_currency,
            display_name: wire.display_name,
            status: wire.status,
            status_message: wire.status_message,
        })
    }
}

impl TryFrom<WireProductStatusEvent> for ProductStatusEvent {
    type Error = CoinbaseError;

    fn try_from(wire: WireProductStatusEvent) -> Result<Self> {
        Ok(ProductStatusEvent {
            event_type: wire.event_type,
            products: map_all(wire.products)?,
        })
    }
}

impl TryFrom<WireLevel2Update> for Level2Update {
    type Error = CoinbaseError;

    fn try_from(wire: WireLevel2Update) -> Result<Self> {
        Ok(Level2Update {
            side: parse::enum_value("side", &wire.side)?,
            event_time: parse::timestamp("event_time", &wire.event_time)?,
            price_level: parse::decimal("price_level", &wire.price_level)?,
            new_quantity: parse::decimal("new_quantity", &wire.new_quantity)?,
        })
    }
}

impl TryFrom<WireLevel2Event> for Level2Event {
    type Error = CoinbaseError;

    fn try_from(wire: WireLevel2Event) -> Result<Self> {
        Ok(Level2Event {
            event_type: wire.event_type,
            product_id: wire.product_id,
            updates: map_all(wire.updates)?,
        })
    }
}

impl TryFrom<WireUserOrder> for UserOrder {
    type Error = CoinbaseError;

    fn try_from(wire: WireUserOrder) -> Result<Self> {
        Ok(UserOrder {
            cumulative_quantity: parse::decimal_or_zero(
                "cumulative_quantity",
                &wire.cumulative_quantity,
            )?,
            leaves_quantity: parse::decimal_or_zero("leaves_quantity", &wire.leaves_quantity)?,
            avg_price: parse::decimal_or_zero("avg_price", &wire.avg_price)?,
            total_fees: parse::decimal_or_zero("total_fees", &wire.total_fees)?,
            status: parse::enum_value("status", &wire.status)?,
            creation_time: parse::timestamp("creation_time", &wire.creation_time)?,
            order_side: parse::enum_value("order_side", &wire.order_side)?,
            order_type: parse::enum_value("order_type", &wire.order_type)?,
            order_id: wire.order_id,
            client_order_id: wire.client_order_id,
            product_id: wire.product_id,
        })
    }
}

impl TryFrom<WireUserOrderEvent> for UserOrderEvent {
    type Error = CoinbaseError;

    fn try_from(wire: WireUserOrderEvent) -> Result<Self> {
        Ok(UserOrderEvent {
            event_type: wire.event_type,
            orders: map_all(wire.orders)?,
        })
    }
}

impl TryFrom<WireSubscriptionsEvent> for SubscriptionsEvent {
    type Error = CoinbaseError;

    fn try_from(wire: WireSubscriptionsEvent) -> Result<Self> {
        Ok(SubscriptionsEvent {
            subscriptions: wire.subscriptions,
        })
    }
}
