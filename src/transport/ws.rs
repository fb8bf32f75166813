//! WebSocket reader task
//!
//! Connects to the backend's `/ws` endpoint, parses push frames into
//! [`WsEvent`]s and forwards them over a bounded channel. Reconnects with
//! capped exponential backoff and a bounded attempt count; when the
//! attempts run out the task returns an error and the caller falls back to
//! periodic polling.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use rand::Rng;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::TransportError;
use crate::messages::{WsEvent, WsMessage};

const MAX_BACKOFF: Duration = Duration::from_secs(30);
const JITTER_MS: u64 = 250;

/// Reader task configuration.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Full websocket URL, e.g. `ws://host:8080/ws`.
    pub url: String,
    /// Consecutive failed connection attempts before giving up.
    pub max_retries: u32,
    /// Base reconnect delay; doubles per attempt up to a cap.
    pub base_backoff: Duration,
}

/// Delay before reconnect attempt number `attempt` (zero-based): base
/// doubled per attempt, capped, plus a little jitter.
pub fn backoff_delay(cfg: &WsConfig, attempt: u32) -> Duration {
    let exp = cfg
        .base_backoff
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF);
    exp + Duration::from_millis(rand::thread_rng().gen_range(0..JITTER_MS))
}

/// Run the reader until the receiver is dropped (returns `Ok`) or the
/// reconnect budget is exhausted. A successful connection resets the
/// attempt counter.
pub async fn run(cfg: WsConfig, tx: mpsc::Sender<WsEvent>) -> Result<(), TransportError> {
    let mut attempts: u32 = 0;

    loop {
        match connect_async(cfg.url.as_str()).await {
            Ok((stream, _)) => {
                info!(url = %cfg.url, "websocket connected");
                attempts = 0;
                if !read_frames(stream, &tx).await {
                    // Receiver gone: the client is shutting down.
                    return Ok(());
                }
                warn!(url = %cfg.url, "websocket connection lost");
            }
            Err(e) => {
                warn!(url = %cfg.url, attempt = attempts + 1, "websocket connect failed: {e}");
            }
        }

        if attempts >= cfg.max_retries {
            return Err(TransportError::RetriesExhausted(attempts));
        }
        let delay = backoff_delay(&cfg, attempts);
        attempts += 1;
        debug!(delay_ms = delay.as_millis() as u64, "websocket reconnect backoff");
        tokio::time::sleep(delay).await;
    }
}

// Returns false when the event receiver has been dropped, true when the
// connection closed and a reconnect should be attempted.
async fn read_frames<S>(mut stream: S, tx: &mpsc::Sender<WsEvent>) -> bool
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<WsMessage>(&text) {
                Ok(msg) => {
                    if tx.send(msg.into_event()).await.is_err() {
                        return false;
                    }
                }
                Err(e) => warn!("dropping undecodable websocket frame: {e}"),
            },
            Ok(Message::Close(_)) => return true,
            Ok(_) => {} // ping/pong/binary
            Err(e) => {
                warn!("websocket read error: {e}");
                return true;
            }
        }
    }
    true
}
