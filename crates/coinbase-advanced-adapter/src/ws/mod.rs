/*
[INPUT]:  WebSocket configuration and subscription channels
[OUTPUT]: Real-time market data and user order updates
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new channels or changing connection logic
*/

pub mod client;
pub mod dispatch;
pub mod message;
mod reader;
pub mod reassembler;
pub mod registry;
mod watcher;

pub use client::CoinbaseWebSocket;
pub use dispatch::StreamEvent;
pub use message::{ControlKind, ControlMessage};
pub use reassembler::FrameReassembler;
pub use registry::{SubscriptionEntry, SubscriptionRegistry};
