/*
[INPUT]:  Shared connection state and a per-connection watch token
[OUTPUT]: Reopened socket with every desired subscription replayed
[POS]:    WebSocket layer - background reconnect supervisor
[UPDATE]: When polling cadence or replay order changes
*/

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::Inner;

/// Spawn the watcher for one logical connection
pub(crate) fn spawn(inner: Arc<Inner>, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(run(inner, token))
}

async fn run(inner: Arc<Inner>, token: CancellationToken) {
    let poll = inner.config().reconnect_poll_interval;
    let delay = inner.config().reconnect_delay;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("ws watcher stopped");
                return;
            }
            _ = sleep(poll) => {}
        }

        if !inner.needs_recovery().await {
            continue;
        }

        warn!(
            state = ?inner.state(),
            delay_ms = delay.as_millis() as u64,
            "ws connection lost with active subscriptions, reconnecting"
        );
        tokio::select! {
            _ = token.cancelled() => {
                debug!("ws watcher stopped during backoff");
                return;
            }
            _ = sleep(delay) => {}
        }

        // A successful reopen hands supervision to a fresh watcher and
        // cancels this token, so the next select returns.
        match inner.recover(&token).await {
            Ok(Some(replayed)) => info!(subscriptions = replayed, "ws reconnected"),
            Ok(None) => debug!("ws recovery skipped"),
            Err(err) => error!(error = %err, "ws reconnect failed"),
        }
    }
}
