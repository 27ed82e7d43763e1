//! Relay publisher.
//!
//! Forwards captured messages to a downstream WebSocket endpoint as JSON
//! text frames. Fire-and-forget by design: sends while disconnected are
//! dropped silently, and a dead relay never disturbs the capture session.
//! There is no auto-reconnect; the operator reconnects explicitly.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tracing::{debug, warn};

use crate::error::{CastError, Result};

/// Outbound queue depth; beyond this, sends are dropped with a warning.
const RELAY_QUEUE: usize = 64;

/// Lifecycle events of the relay link.
#[derive(Debug)]
pub enum RelayEvent {
    Open,
    Close { code: u16, reason: Option<String> },
    Error(String),
}

struct RelayClose {
    code: u16,
    reason: Option<String>,
}

/// Check that a string is a plausible `ws://` or `wss://` endpoint.
pub fn verify_ws_url(input: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(input)
        .map_err(|e| CastError::connection(format!("invalid relay url: {e}")))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(CastError::connection(format!(
            "relay url must be ws or wss, got {other:?}"
        ))),
    }
}

/// Handle to one downstream relay connection.
pub struct RelayCast {
    url: String,
    connected: Arc<AtomicBool>,
    out_tx: Mutex<Option<mpsc::Sender<WsMessage>>>,
    close_tx: Mutex<Option<mpsc::Sender<RelayClose>>>,
}

impl RelayCast {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connected: Arc::new(AtomicBool::new(false)),
            out_tx: Mutex::new(None),
            close_tx: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Connect and return the relay's lifecycle event stream.
    pub fn connect(&self) -> mpsc::Receiver<RelayEvent> {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (out_tx, out_rx) = mpsc::channel(RELAY_QUEUE);
        let (close_tx, close_rx) = mpsc::channel(1);

        *self.out_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(out_tx);
        *self.close_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(close_tx);

        let url = self.url.clone();
        let connected = Arc::clone(&self.connected);
        tokio::spawn(async move {
            run_relay(&url, connected, out_rx, close_rx, event_tx).await;
        });

        event_rx
    }

    /// Queue one text payload. Silently ignored while disconnected; dropped
    /// with a warning when the queue is full.
    pub fn send(&self, payload: String) {
        if !self.is_connected() {
            return;
        }
        let guard = self.out_tx.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = guard.as_ref()
            && let Err(e) = tx.try_send(WsMessage::Text(payload.into()))
        {
            warn!(error = %e, "relay queue full, dropping payload");
        }
    }

    /// Close the relay link. No-op when already closed.
    pub async fn close(&self, code: u16, reason: Option<&str>) {
        let close_tx = {
            let guard = self.close_tx.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        if let Some(tx) = close_tx {
            let _ = tx
                .send(RelayClose {
                    code,
                    reason: reason.map(str::to_string),
                })
                .await;
        }
    }
}

async fn run_relay(
    url: &str,
    connected: Arc<AtomicBool>,
    mut out_rx: mpsc::Receiver<WsMessage>,
    mut close_rx: mpsc::Receiver<RelayClose>,
    events: mpsc::Sender<RelayEvent>,
) {
    let mut stream = match connect_async(url).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(url, error = %e, "relay connect failed");
            let _ = events.send(RelayEvent::Error(e.to_string())).await;
            let _ = events
                .send(RelayEvent::Close {
                    code: 1006,
                    reason: Some("relay connect failed".to_string()),
                })
                .await;
            return;
        }
    };

    connected.store(true, Ordering::SeqCst);
    debug!(url, "relay open");
    let _ = events.send(RelayEvent::Open).await;

    // Cleared before the Close event goes out, so `is_connected` is already
    // false when a consumer reacts to the closure.
    loop {
        tokio::select! {
            outbound = out_rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if let Err(e) = stream.send(msg).await {
                            warn!(error = %e, "relay send failed");
                            connected.store(false, Ordering::SeqCst);
                            let _ = events.send(RelayEvent::Error(e.to_string())).await;
                            let _ = events
                                .send(RelayEvent::Close { code: 1006, reason: None })
                                .await;
                            break;
                        }
                    }
                    None => {
                        // Handle dropped; tear the link down rather than
                        // holding the socket open with nobody to feed it.
                        debug!(url, "relay handle dropped");
                        connected.store(false, Ordering::SeqCst);
                        let _ = stream.close(None).await;
                        let _ = events
                            .send(RelayEvent::Close {
                                code: 1001,
                                reason: Some("relay handle dropped".to_string()),
                            })
                            .await;
                        break;
                    }
                }
            }

            Some(req) = close_rx.recv() => {
                let frame = CloseFrame {
                    code: WsCloseCode::from(req.code),
                    reason: req.reason.clone().unwrap_or_default().into(),
                };
                let _ = stream.close(Some(frame)).await;
                connected.store(false, Ordering::SeqCst);
                let _ = events
                    .send(RelayEvent::Close { code: req.code, reason: req.reason })
                    .await;
                break;
            }

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMessage::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => {
                                let reason = (!frame.reason.is_empty())
                                    .then(|| frame.reason.to_string());
                                (u16::from(frame.code), reason)
                            }
                            None => (1005, None),
                        };
                        connected.store(false, Ordering::SeqCst);
                        let _ = events.send(RelayEvent::Close { code, reason }).await;
                        break;
                    }
                    Some(Ok(_)) => {
                        // The relay is write-only; ignore downstream chatter.
                    }
                    Some(Err(e)) => {
                        connected.store(false, Ordering::SeqCst);
                        let _ = events.send(RelayEvent::Error(e.to_string())).await;
                        let _ = events
                            .send(RelayEvent::Close { code: 1006, reason: None })
                            .await;
                        break;
                    }
                    None => {
                        connected.store(false, Ordering::SeqCst);
                        let _ = events
                            .send(RelayEvent::Close {
                                code: 1006,
                                reason: Some("relay endpoint closed".to_string()),
                            })
                            .await;
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_verification() {
        assert!(verify_ws_url("ws://127.0.0.1:8080/feed").is_ok());
        assert!(verify_ws_url("wss://relay.example.com").is_ok());
        assert!(verify_ws_url("http://example.com").is_err());
        assert!(verify_ws_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_send_while_disconnected_is_silent() {
        let relay = RelayCast::new("ws://127.0.0.1:1/never");
        relay.send("dropped".to_string());
        assert!(!relay.is_connected());
    }
}
