/*
[INPUT]:  Read half of an open socket and its cancellation token
[OUTPUT]: Complete messages handed to the raw stream and the dispatcher
[POS]:    WebSocket layer - per-connection receive loop
[UPDATE]: When frame handling or close detection changes
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::http::CoinbaseError;
use crate::types::ConnectionState;

use super::client::{Inner, WsSource};
use super::reassembler::FrameReassembler;

const DROPPED_LOG_LIMIT: usize = 10;

static DROPPED_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Pull frames until the socket closes or `token` fires
///
/// `epoch` identifies the connection this loop belongs to; state changes
/// are ignored once a newer connection has been opened.
pub(crate) async fn run(
    inner: Arc<Inner>,
    mut source: WsSource,
    token: CancellationToken,
    epoch: u64,
) {
    let mut reassembler = FrameReassembler::new(inner.config().receive_buffer_size);

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => {
                debug!(epoch, "ws receive loop cancelled");
                return;
            }
            next = source.next() => next,
        };

        let completed = match next {
            Some(Ok(WsMessage::Text(text))) => reassembler.push(text.as_bytes(), true),
            Some(Ok(WsMessage::Binary(data))) => reassembler.push(&data[..], true),
            // Continuation frames are joined by tungstenite; raw frames only exist on write
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => continue,
            Some(Ok(WsMessage::Close(frame))) => {
                info!(epoch, close_frame = ?frame, "ws close received");
                inner.mark_close_received(epoch);
                return;
            }
            Some(Err(err)) => {
                warn!(epoch, error = %err, "ws receive failed");
                inner.set_state_for(epoch, ConnectionState::Aborted);
                return;
            }
            None => {
                info!(epoch, "ws stream ended");
                inner.set_state_for(epoch, ConnectionState::Closed);
                return;
            }
        };

        match completed {
            Ok(Some(message)) => inner.deliver(message),
            Ok(None) => {}
            Err(err) => log_dropped_message(&err),
        }
    }
}

fn log_dropped_message(err: &CoinbaseError) {
    let count = DROPPED_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < DROPPED_LOG_LIMIT {
        warn!(
            sample_index = count + 1,
            sample_limit = DROPPED_LOG_LIMIT,
            error = %err,
            "ws message dropped"
        );
    }
}
