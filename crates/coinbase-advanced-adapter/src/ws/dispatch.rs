/*
[INPUT]:  Complete text messages from the receive loop
[OUTPUT]: Typed stream events on the broadcast channel
[POS]:    WebSocket layer - channel routing and per-message error isolation
[UPDATE]: When adding new channels or changing envelope decoding
*/

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::http::{CoinbaseError, Result};
use crate::types::{
    CandlesMessage, Envelope, HeartbeatsMessage, Level2Message, MarketTradesMessage,
    StatusMessage, SubscriptionsMessage, TickerMessage, UserMessage,
};

use super::message::{
    WireCandleEvent, WireEnvelope, WireHeartbeatEvent, WireLevel2Event, WireMarketTradeEvent,
    WireProductStatusEvent, WireSubscriptionsEvent, WireTickerEvent, WireUserOrderEvent,
};

const OTHER_LOG_LIMIT: usize = 3;
const PARSE_FAIL_LOG_LIMIT: usize = 3;
const SERVER_ERROR_LOG_LIMIT: usize = 10;
pub(crate) const RAW_LOG_MAX_BYTES: usize = 1024;

static OTHER_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static PARSE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static SERVER_ERROR_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Decoded stream message, one variant per inbound channel
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Candles(CandlesMessage),
    Heartbeats(HeartbeatsMessage),
    MarketTrades(MarketTradesMessage),
    Status(StatusMessage),
    Ticker(TickerMessage),
    TickerBatch(TickerMessage),
    Level2(Level2Message),
    User(UserMessage),
    /// `matches` carries the same trade shape as `market_trades`
    Matches(MarketTradesMessage),
    Subscriptions(SubscriptionsMessage),
}

impl StreamEvent {
    /// Channel name as received on the wire
    pub fn channel(&self) -> &str {
        match self {
            StreamEvent::Candles(m) => &m.channel,
            StreamEvent::Heartbeats(m) => &m.channel,
            StreamEvent::MarketTrades(m) | StreamEvent::Matches(m) => &m.channel,
            StreamEvent::Status(m) => &m.channel,
            StreamEvent::Ticker(m) | StreamEvent::TickerBatch(m) => &m.channel,
            StreamEvent::Level2(m) => &m.channel,
            StreamEvent::User(m) => &m.channel,
            StreamEvent::Subscriptions(m) => &m.channel,
        }
    }

    pub fn sequence_num(&self) -> i64 {
        match self {
            StreamEvent::Candles(m) => m.sequence_num,
            StreamEvent::Heartbeats(m) => m.sequence_num,
            StreamEvent::MarketTrades(m) | StreamEvent::Matches(m) => m.sequence_num,
            StreamEvent::Status(m) => m.sequence_num,
            StreamEvent::Ticker(m) | StreamEvent::TickerBatch(m) => m.sequence_num,
            StreamEvent::Level2(m) => m.sequence_num,
            StreamEvent::User(m) => m.sequence_num,
            StreamEvent::Subscriptions(m) => m.sequence_num,
        }
    }
}

type Route = fn(&str) -> Result<StreamEvent>;

/// Inbound channel name to decoder. `level2` arrives as `l2_data`.
const ROUTES: &[(&str, Route)] = &[
    ("candles", decode_candles),
    ("heartbeats", decode_heartbeats),
    ("market_trades", decode_market_trades),
    ("status", decode_status),
    ("ticker", decode_ticker),
    ("ticker_batch", decode_ticker_batch),
    ("l2_data", decode_level2),
    ("user", decode_user),
    ("matches", decode_matches),
    ("subscriptions", decode_subscriptions),
];

fn route(channel: &str) -> Option<Route> {
    ROUTES
        .iter()
        .find(|(name, _)| *name == channel)
        .map(|(_, route)| *route)
}

fn decode<W, E>(raw: &str) -> Result<Envelope<E>>
where
    W: DeserializeOwned,
    E: TryFrom<W, Error = CoinbaseError>,
{
    let wire: WireEnvelope<W> = serde_json::from_str(raw)?;
    Envelope::try_from(wire)
}

fn decode_candles(raw: &str) -> Result<StreamEvent> {
    decode::<WireCandleEvent, _>(raw).map(StreamEvent::Candles)
}

fn decode_heartbeats(raw: &str) -> Result<StreamEvent> {
    decode::<WireHeartbeatEvent, _>(raw).map(StreamEvent::Heartbeats)
}

fn decode_market_trades(raw: &str) -> Result<StreamEvent> {
    decode::<WireMarketTradeEvent, _>(raw).map(StreamEvent::MarketTrades)
}

fn decode_status(raw: &str) -> Result<StreamEvent> {
    decode::<WireProductStatusEvent, _>(raw).map(StreamEvent::Status)
}

fn decode_ticker(raw: &str) -> Result<StreamEvent> {
    decode::<WireTickerEvent, _>(raw).map(StreamEvent::Ticker)
}

fn decode_ticker_batch(raw: &str) -> Result<StreamEvent> {
    decode::<WireTickerEvent, _>(raw).map(StreamEvent::TickerBatch)
}

fn decode_level2(raw: &str) -> Result<StreamEvent> {
    decode::<WireLevel2Event, _>(raw).map(StreamEvent::Level2)
}

fn decode_user(raw: &str) -> Result<StreamEvent> {
    decode::<WireUserOrderEvent, _>(raw).map(StreamEvent::User)
}

fn decode_matches(raw: &str) -> Result<StreamEvent> {
    decode::<WireMarketTradeEvent, _>(raw).map(StreamEvent::Matches)
}

fn decode_subscriptions(raw: &str) -> Result<StreamEvent> {
    decode::<WireSubscriptionsEvent, _>(raw).map(StreamEvent::Subscriptions)
}

/// Top-level fields read before choosing a decoder
#[derive(Debug, Deserialize)]
struct EnvelopeHead {
    #[serde(default)]
    channel: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Routes messages to typed events; never fails outward
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    events: broadcast::Sender<StreamEvent>,
}

impl Dispatcher {
    pub(crate) fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self { events }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }

    /// Decode one message and publish it; errors are logged and the message dropped
    pub(crate) fn dispatch(&self, raw: &str) {
        match self.decode(raw) {
            Ok(Some(event)) => {
                if self.events.receiver_count() > 0 {
                    let _ = self.events.send(event);
                }
            }
            Ok(None) => {}
            Err(err) => log_parse_fail_once(&err, raw),
        }
    }

    fn decode(&self, raw: &str) -> Result<Option<StreamEvent>> {
        let head: EnvelopeHead = serde_json::from_str(raw)?;

        if head.kind.as_deref() == Some("error") {
            log_server_error(head.message.as_deref().unwrap_or_default(), raw);
            return Ok(None);
        }

        let Some(channel) = head.channel else {
            log_other_message_once(None, raw);
            return Ok(None);
        };
        let Some(route) = route(&channel) else {
            log_other_message_once(Some(&channel), raw);
            return Ok(None);
        };

        route(raw).map(Some)
    }
}

fn log_server_error(reason: &str, raw: &str) {
    let count = SERVER_ERROR_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < SERVER_ERROR_LOG_LIMIT {
        warn!(
            sample_index = count + 1,
            sample_limit = SERVER_ERROR_LOG_LIMIT,
            reason,
            raw = %truncate_for_log(raw, RAW_LOG_MAX_BYTES),
            "ws server reported error"
        );
    }
}

fn log_other_message_once(channel: Option<&str>, raw: &str) {
    let count = OTHER_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < OTHER_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = OTHER_LOG_LIMIT,
            channel = channel.unwrap_or("<none>"),
            bytes = raw.len(),
            "ws message channel unrecognized"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = OTHER_LOG_LIMIT,
            bytes = raw.len(),
            message = %preview,
            "ws message channel unrecognized"
        );
    }
}

fn log_parse_fail_once(err: &CoinbaseError, raw: &str) {
    let count = PARSE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < PARSE_FAIL_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "ws message parse failed"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            message = %preview,
            "ws message parse failed"
        );
    }
}

/// Cut at a char boundary no later than `max_len`
pub(crate) fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}
