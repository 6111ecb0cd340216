/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::http::CoinbaseError;

/// Logical stream multiplexed over the market data connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Candles,
    Heartbeats,
    MarketTrades,
    Status,
    Ticker,
    TickerBatch,
    Level2,
    User,
    Matches,
}

impl ChannelType {
    pub const ALL: [ChannelType; 9] = [
        ChannelType::Candles,
        ChannelType::Heartbeats,
        ChannelType::MarketTrades,
        ChannelType::Status,
        ChannelType::Ticker,
        ChannelType::TickerBatch,
        ChannelType::Level2,
        ChannelType::User,
        ChannelType::Matches,
    ];

    /// Canonical name used in subscribe/unsubscribe messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Candles => "candles",
            ChannelType::Heartbeats => "heartbeats",
            ChannelType::MarketTrades => "market_trades",
            ChannelType::Status => "status",
            ChannelType::Ticker => "ticker",
            ChannelType::TickerBatch => "ticker_batch",
            ChannelType::Level2 => "level2",
            ChannelType::User => "user",
            ChannelType::Matches => "matches",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = CoinbaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelType::ALL
            .into_iter()
            .find(|channel| channel.as_str() == s)
            .ok_or_else(|| CoinbaseError::InvalidChannel(s.to_string()))
    }
}

/// Socket lifecycle as observed by the connection controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionState {
    #[default]
    None,
    Connecting,
    Open,
    CloseSent,
    CloseReceived,
    Closed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    #[serde(rename = "BUY", alias = "buy")]
    Buy,
    #[serde(rename = "SELL", alias = "sell")]
    Sell,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level2Side {
    Bid,
    #[serde(alias = "ask")]
    Offer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Open,
    Filled,
    #[serde(alias = "CANCELED")]
    Cancelled,
    Expired,
    Failed,
    Queued,
    CancelQueued,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "MARKET", alias = "Market")]
    Market,
    #[serde(rename = "LIMIT", alias = "Limit")]
    Limit,
    #[serde(rename = "STOP", alias = "Stop")]
    Stop,
    #[serde(rename = "STOP_LIMIT", alias = "StopLimit")]
    StopLimit,
    #[serde(rename = "BRACKET", alias = "Bracket")]
    Bracket,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Spot,
    Future,
    #[serde(other)]
    Unknown,
}
