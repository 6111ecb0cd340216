/*
[INPUT]:  Stream configuration and a token provider for signed control messages
[OUTPUT]: Typed and raw message streams, connection state, subscription set
[POS]:    WebSocket layer - connection controller and public stream client
[UPDATE]: When adding new channels or changing connection logic
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use chrono::Utc;
use futures_util::SinkExt;
use futures_util::StreamExt;
use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::{JwtTokenProvider, TokenProvider};
use crate::config::{AdapterConfig, WsConfig};
use crate::http::{CoinbaseError, Result};
use crate::types::{ChannelType, ConnectionState};

use super::dispatch::{Dispatcher, StreamEvent};
use super::message::{ControlKind, ControlMessage};
use super::registry::{SubscriptionEntry, SubscriptionRegistry};
use super::{reader, watcher};

const CONTROL_LOG_LIMIT: usize = 10;
/// Socket-level message cap as a multiple of the receive buffer
const SOCKET_LIMIT_FACTOR: usize = 4;

static CONTROL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, WsMessage>;
pub(crate) type WsSource = SplitStream<WsStream>;

/// Socket halves and task handles of the current connection
#[derive(Default)]
struct Connection {
    sink: Option<WsSink>,
    reader: Option<JoinHandle<()>>,
    reader_token: Option<CancellationToken>,
    watch_token: Option<CancellationToken>,
}

/// State shared by the public handle, the receive loop and the watcher
pub(crate) struct Inner {
    config: WsConfig,
    token_provider: Arc<dyn TokenProvider>,
    /// Serializes connect, disconnect, subscribe and unsubscribe
    gate: Mutex<Connection>,
    state: watch::Sender<ConnectionState>,
    /// Bumped on every open and close; receive loops only write state for their own epoch
    epoch: AtomicU64,
    registry: SubscriptionRegistry,
    dispatcher: Dispatcher,
    raw: broadcast::Sender<String>,
    shutdown: CancellationToken,
}

/// Streaming client for the Advanced Trade market data feed
///
/// Subscriptions recorded here survive connection loss: a background
/// watcher reopens the socket and replays them.
pub struct CoinbaseWebSocket {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CoinbaseWebSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinbaseWebSocket")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("subscriptions", &self.inner.registry.len())
            .finish()
    }
}

impl CoinbaseWebSocket {
    pub fn new(config: WsConfig, token_provider: Arc<dyn TokenProvider>) -> Result<Self> {
        config.validate()?;
        let (state, _) = watch::channel(ConnectionState::None);
        let (raw, _) = broadcast::channel(config.event_capacity);

        Ok(Self {
            inner: Arc::new(Inner {
                dispatcher: Dispatcher::new(config.event_capacity),
                config,
                token_provider,
                gate: Mutex::new(Connection::default()),
                state,
                epoch: AtomicU64::new(0),
                registry: SubscriptionRegistry::new(),
                raw,
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Build a client signing with the configured API key
    pub fn from_config(config: &AdapterConfig) -> Result<Self> {
        let provider = JwtTokenProvider::from_credentials(&config.credentials)?;
        Self::new(config.websocket.clone(), Arc::new(provider))
    }

    /// Open the socket; no-op while already open
    ///
    /// Subscriptions recorded while disconnected are sent once the socket is up.
    pub async fn connect(&self) -> Result<()> {
        self.inner.connect().await
    }

    /// Close gracefully and stop reconnecting
    pub async fn disconnect(&self) -> Result<()> {
        self.inner.close(true).await
    }

    /// Close gracefully but leave the watcher running, so the connection recovers
    pub async fn internal_disconnect(&self) -> Result<()> {
        self.inner.close(false).await
    }

    /// Subscribe `symbols` on `channel`, replacing any previous product list
    pub async fn subscribe<S: AsRef<str>>(&self, symbols: &[S], channel: ChannelType) -> Result<()> {
        self.inner.subscribe(to_owned_symbols(symbols), channel).await
    }

    pub async fn unsubscribe<S: AsRef<str>>(
        &self,
        symbols: &[S],
        channel: ChannelType,
    ) -> Result<()> {
        self.inner.unsubscribe(to_owned_symbols(symbols), channel).await
    }

    /// Like [`subscribe`](Self::subscribe) with a wire channel name
    ///
    /// Unknown names fail with `InvalidChannel` before any network call.
    pub async fn subscribe_by_name<S: AsRef<str>>(&self, symbols: &[S], channel: &str) -> Result<()> {
        let channel: ChannelType = channel.parse()?;
        self.subscribe(symbols, channel).await
    }

    pub async fn unsubscribe_by_name<S: AsRef<str>>(
        &self,
        symbols: &[S],
        channel: &str,
    ) -> Result<()> {
        let channel: ChannelType = channel.parse()?;
        self.unsubscribe(symbols, channel).await
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionEntry> {
        self.inner.registry.snapshot()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Typed events; slow receivers observe `Lagged` instead of blocking the socket
    pub fn subscribe_events(&self) -> broadcast::Receiver<StreamEvent> {
        self.inner.dispatcher.subscribe()
    }

    /// Every complete text message as received, including ones that fail to decode
    pub fn subscribe_raw(&self) -> broadcast::Receiver<String> {
        self.inner.raw.subscribe()
    }
}

impl Drop for CoinbaseWebSocket {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    pub(crate) fn config(&self) -> &WsConfig {
        &self.config
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// State write from a receive loop, dropped if its connection is stale
    pub(crate) fn set_state_for(&self, epoch: u64, next: ConnectionState) {
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::Acquire) != epoch || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    /// Peer close: completes our handshake or records theirs
    pub(crate) fn mark_close_received(&self, epoch: u64) {
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::Acquire) != epoch {
                return false;
            }
            *state = match *state {
                ConnectionState::CloseSent => ConnectionState::Closed,
                _ => ConnectionState::CloseReceived,
            };
            true
        });
    }

    /// Publish a complete message to the raw stream and the dispatcher
    pub(crate) fn deliver(&self, message: String) {
        if self.raw.receiver_count() > 0 {
            let _ = self.raw.send(message.clone());
        }
        if !message.trim().is_empty() {
            self.dispatcher.dispatch(&message);
        }
    }

    async fn connect(self: &Arc<Self>) -> Result<()> {
        let mut conn = self.gate.lock().await;
        if self.is_open() {
            debug!("ws connect skipped, already open");
            return Ok(());
        }

        self.open_locked(&mut conn).await?;
        for entry in self.registry.snapshot() {
            if let Err(err) = self
                .send_control(&mut conn, ControlKind::Subscribe, &entry.symbols, entry.channel)
                .await
            {
                self.abort_locked(&mut conn);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Replace the socket and its watcher. Caller holds the gate.
    async fn open_locked(self: &Arc<Self>, conn: &mut Connection) -> Result<()> {
        if let Some(previous) = conn.watch_token.take() {
            previous.cancel();
        }
        let watch_token = self.shutdown.child_token();
        conn.watch_token = Some(watch_token.clone());
        watcher::spawn(Arc::clone(self), watch_token);

        self.teardown(conn);
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.send_replace(ConnectionState::Connecting);
        info!(url = %self.config.url, epoch, "ws connecting");

        let stream = match timeout(
            self.config.connect_timeout,
            connect_async_with_config(self.config.url.as_str(), Some(self.socket_config()), false),
        )
        .await
        {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(err)) => {
                self.state.send_replace(ConnectionState::Aborted);
                return Err(err.into());
            }
            Err(_) => {
                self.state.send_replace(ConnectionState::Aborted);
                return Err(CoinbaseError::Timeout {
                    duration: self.config.connect_timeout.as_secs(),
                });
            }
        };

        let (sink, source) = stream.split();
        let reader_token = self.shutdown.child_token();
        conn.sink = Some(sink);
        conn.reader_token = Some(reader_token.clone());
        self.state.send_replace(ConnectionState::Open);
        conn.reader = Some(tokio::spawn(reader::run(
            Arc::clone(self),
            source,
            reader_token,
            epoch,
        )));

        info!(url = %self.config.url, epoch, "ws connected");
        Ok(())
    }

    /// Transport caps sit well above the receive buffer so an oversized
    /// message reaches the reassembler and is dropped there, not by the socket.
    fn socket_config(&self) -> WebSocketConfig {
        let floor = self
            .config
            .receive_buffer_size
            .saturating_mul(SOCKET_LIMIT_FACTOR);
        let mut config = WebSocketConfig::default();
        config.max_message_size = config.max_message_size.map(|cap| cap.max(floor));
        config.max_frame_size = config.max_frame_size.map(|cap| cap.max(floor));
        config
    }

    /// Drop the socket halves and stop the receive loop. Caller holds the gate.
    fn teardown(&self, conn: &mut Connection) {
        if let Some(token) = conn.reader_token.take() {
            token.cancel();
        }
        conn.reader = None;
        conn.sink = None;
    }

    /// Drop a socket whose subscriptions could not be restored. Caller holds the gate.
    fn abort_locked(&self, conn: &mut Connection) {
        self.teardown(conn);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.state.send_replace(ConnectionState::Aborted);
    }

    async fn close(&self, stop_watching: bool) -> Result<()> {
        let mut conn = self.gate.lock().await;
        if stop_watching && let Some(token) = conn.watch_token.take() {
            token.cancel();
        }

        let state = self.state();
        if matches!(state, ConnectionState::Open | ConnectionState::CloseReceived) {
            self.state.send_replace(ConnectionState::CloseSent);
            if let Some(sink) = conn.sink.as_mut()
                && let Err(err) = sink.send(WsMessage::Close(None)).await
            {
                debug!(error = %err, "ws close frame not sent");
            }
            if let Some(reader) = conn.reader.take()
                && timeout(self.config.close_timeout, reader).await.is_err()
            {
                warn!(
                    timeout_ms = self.config.close_timeout.as_millis() as u64,
                    "ws close handshake timed out"
                );
            }
        }

        self.teardown(&mut conn);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if state != ConnectionState::None {
            self.state.send_replace(ConnectionState::Closed);
        }
        info!(stop_watching, "ws disconnected");
        Ok(())
    }

    async fn subscribe(&self, symbols: Vec<String>, channel: ChannelType) -> Result<()> {
        let mut conn = self.gate.lock().await;
        if self.is_open() {
            self.send_control(&mut conn, ControlKind::Subscribe, &symbols, channel)
                .await?;
        }
        self.registry.insert(channel, symbols);
        Ok(())
    }

    async fn unsubscribe(&self, symbols: Vec<String>, channel: ChannelType) -> Result<()> {
        let mut conn = self.gate.lock().await;
        if self.is_open() {
            self.send_control(&mut conn, ControlKind::Unsubscribe, &symbols, channel)
                .await?;
        }
        self.registry.remove(channel);
        Ok(())
    }

    /// Sign and send one control message on the current socket
    async fn send_control(
        &self,
        conn: &mut Connection,
        kind: ControlKind,
        symbols: &[String],
        channel: ChannelType,
    ) -> Result<()> {
        let sink = conn.sink.as_mut().ok_or(CoinbaseError::NotConnected)?;
        let message = ControlMessage {
            kind,
            product_ids: symbols.to_vec(),
            channel,
            api_key: self.token_provider.api_key().to_string(),
            timestamp: Utc::now().timestamp().to_string(),
            jwt: self.token_provider.token(None).await?,
        };

        let payload = serde_json::to_string(&message)?;
        sink.send(WsMessage::Text(payload.into())).await?;
        log_control_sent(kind, channel, symbols);
        Ok(())
    }

    /// Checked by the watcher on every tick
    pub(crate) async fn needs_recovery(&self) -> bool {
        let _conn = self.gate.lock().await;
        !self.registry.is_empty() && !self.is_open()
    }

    /// Reopen and replay every entry as unsubscribe then subscribe
    ///
    /// Returns `None` when the watcher was stopped or the socket is already open.
    pub(crate) async fn recover(
        self: &Arc<Self>,
        token: &CancellationToken,
    ) -> Result<Option<usize>> {
        let mut conn = self.gate.lock().await;
        if token.is_cancelled() || self.is_open() {
            return Ok(None);
        }

        self.open_locked(&mut conn).await?;
        let entries = self.registry.snapshot();
        for entry in &entries {
            if let Err(err) = self.replay_entry(&mut conn, entry).await {
                self.abort_locked(&mut conn);
                return Err(err);
            }
        }
        Ok(Some(entries.len()))
    }

    async fn replay_entry(&self, conn: &mut Connection, entry: &SubscriptionEntry) -> Result<()> {
        self.send_control(conn, ControlKind::Unsubscribe, &entry.symbols, entry.channel)
            .await?;
        self.send_control(conn, ControlKind::Subscribe, &entry.symbols, entry.channel)
            .await
    }
}

fn to_owned_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    symbols.iter().map(|symbol| symbol.as_ref().to_string()).collect()
}

fn log_control_sent(kind: ControlKind, channel: ChannelType, symbols: &[String]) {
    let count = CONTROL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < CONTROL_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = CONTROL_LOG_LIMIT,
            action = ?kind,
            channel = %channel,
            symbols = ?symbols,
            "ws control message sent"
        );
    }
}
