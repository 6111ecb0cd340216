/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for coinbase-advanced-adapter tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use coinbase_advanced_adapter::{ControlMessage, Ed25519Signer, WsConfig};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::Frame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::{Data, OpCode};
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub const TEST_API_KEY: &str = "organizations/org-id/apiKeys/key-id";

/// Mock JWT token for testing
pub fn mock_jwt_token() -> String {
    "eyJhbGciOiJFZERTQSIsInR5cCI6IkpXVCJ9.test.signature".to_string()
}

/// Base64 secret of a deterministic Ed25519 key, in the 64-byte API form
pub fn test_api_secret() -> String {
    let signer = Ed25519Signer::from_secret_key(&[7u8; 32]);
    let mut keypair = signer.secret_key_bytes().to_vec();
    keypair.extend_from_slice(&signer.public_key_bytes());
    STANDARD.encode(keypair)
}

/// Stream settings with short timers so recovery finishes within a test
pub fn fast_ws_config(url: &str) -> WsConfig {
    WsConfig {
        reconnect_poll_interval: Duration::from_millis(20),
        reconnect_delay: Duration::from_millis(100),
        connect_timeout: Duration::from_secs(2),
        close_timeout: Duration::from_secs(1),
        ..WsConfig::with_url(url)
    }
}

/// Reserve a loopback address with nothing listening on it
pub fn unused_local_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind placeholder listener");
    listener.local_addr().expect("listener address").to_string()
}

/// Poll `condition` until it holds or `within` elapses
pub async fn wait_until<F>(mut condition: F, within: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub fn ticker_message(sequence_num: i64, price: &str) -> String {
    serde_json::json!({
        "channel": "ticker",
        "client_id": "",
        "timestamp": "2023-02-09T20:30:37.167359596Z",
        "sequence_num": sequence_num,
        "events": [{
            "type": "update",
            "tickers": [{
                "type": "ticker",
                "product_id": "BTC-USD",
                "price": price,
                "volume_24_h": "18215.5",
                "low_24_h": "21870",
                "high_24_h": "23450",
                "low_52_w": "15460",
                "high_52_w": "48240",
                "price_percent_chg_24_h": "-4.15",
                "best_bid": "21930.1",
                "best_bid_quantity": "0.5",
                "best_ask": "21932",
                "best_ask_quantity": "1.2"
            }]
        }]
    })
    .to_string()
}

#[derive(Debug, Clone)]
enum ServerCommand {
    Text(String),
    Fragments(Vec<String>),
    Close,
}

/// In-process WebSocket endpoint standing in for the market data feed
///
/// Counts handshakes, records every control message it receives and pushes
/// scripted frames to all connected clients.
pub struct TestWsServer {
    pub url: String,
    handshakes: Arc<AtomicUsize>,
    controls: Arc<Mutex<Vec<ControlMessage>>>,
    commands: broadcast::Sender<ServerCommand>,
}

impl TestWsServer {
    pub async fn start() -> Self {
        Self::start_at("127.0.0.1:0").await
    }

    /// Listen on a fixed address, e.g. one a client already failed to reach
    pub async fn start_at(addr: &str) -> Self {
        let listener = TcpListener::bind(addr).await.expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let (commands, _) = broadcast::channel(64);
        let server = Self {
            url: format!("ws://{addr}"),
            handshakes: Arc::new(AtomicUsize::new(0)),
            controls: Arc::new(Mutex::new(Vec::new())),
            commands,
        };

        let handshakes = Arc::clone(&server.handshakes);
        let controls = Arc::clone(&server.controls);
        let commands = server.commands.clone();
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                // Subscribe before the handshake completes so no scripted frame is missed
                let session_commands = commands.subscribe();
                let Ok(socket) = accept_async(tcp).await else {
                    continue;
                };
                handshakes.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(run_session(socket, session_commands, Arc::clone(&controls)));
            }
        });

        server
    }

    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    pub fn controls(&self) -> Vec<ControlMessage> {
        self.controls.lock().expect("controls lock").clone()
    }

    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.commands.send(ServerCommand::Text(text.into()));
    }

    /// Send one text message split over several frames, the last one final
    pub fn send_fragments(&self, parts: &[&str]) {
        let parts = parts.iter().map(|part| part.to_string()).collect();
        let _ = self.commands.send(ServerCommand::Fragments(parts));
    }

    /// Initiate a close handshake on every open session
    pub fn close_clients(&self) {
        let _ = self.commands.send(ServerCommand::Close);
    }
}

async fn run_session(
    socket: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    mut commands: broadcast::Receiver<ServerCommand>,
    controls: Arc<Mutex<Vec<ControlMessage>>>,
) {
    let (mut write, mut read) = socket.split();
    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(control) = serde_json::from_str::<ControlMessage>(&text) {
                        controls.lock().expect("controls lock").push(control);
                    }
                }
                // Keep reading after a close so the reply gets flushed
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
            command = commands.recv() => match command {
                Ok(ServerCommand::Text(text)) => {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(ServerCommand::Fragments(parts)) => {
                    let last = parts.len().saturating_sub(1);
                    for (index, part) in parts.into_iter().enumerate() {
                        let opcode = if index == 0 {
                            OpCode::Data(Data::Text)
                        } else {
                            OpCode::Data(Data::Continue)
                        };
                        let frame = Frame::message(part.into_bytes(), opcode, index == last);
                        if write.send(Message::Frame(frame)).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(ServerCommand::Close) => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
