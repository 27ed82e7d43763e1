//! Public session handle.
//!
//! [`DyCast`] owns one capture of one room: `connect` spawns the controller
//! task and hands back the event receiver; `close` requests an orderly
//! shutdown from any task.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::connection::{CloseRequest, ConnState};
use crate::douyin::DouyinProtocol;
use crate::event::{CastEvent, CloseCode};
use crate::message::LiveInfo;
use crate::protocol::CastProtocol;
use crate::reconnect::{self, RetryPolicy};

/// Tunables of one cast session.
#[derive(Debug, Clone)]
pub struct CastConfig {
    /// Budget for room resolution and for the websocket handshake, each.
    pub connect_timeout: Duration,
    /// Heartbeat ticks without any inbound traffic before the connection is
    /// declared dead.
    pub max_missed_liveness: u32,
    pub retry: RetryPolicy,
    /// Capacity of the event channel handed to the consumer.
    pub event_buffer: usize,
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_missed_liveness: 3,
            retry: RetryPolicy::default(),
            event_buffer: 100,
        }
    }
}

/// Handle to one danmaku capture session.
///
/// Cheap to share behind an `Arc`; `connect` and `close` take `&self`.
pub struct DyCast<P: CastProtocol = DouyinProtocol> {
    room_num: String,
    protocol: Arc<P>,
    config: CastConfig,
    state: Arc<AtomicU8>,
    live_info: Arc<RwLock<Option<LiveInfo>>>,
    close_tx: Mutex<Option<mpsc::Sender<CloseRequest>>>,
}

impl DyCast<DouyinProtocol> {
    /// Session for a Douyin room with default configuration.
    pub fn new(room_num: impl Into<String>) -> Self {
        Self::with_protocol(room_num, DouyinProtocol::new(), CastConfig::default())
    }
}

impl<P: CastProtocol> DyCast<P> {
    pub fn with_protocol(room_num: impl Into<String>, protocol: P, config: CastConfig) -> Self {
        Self {
            room_num: room_num.into(),
            protocol: Arc::new(protocol),
            config,
            state: Arc::new(AtomicU8::new(ConnState::Idle as u8)),
            live_info: Arc::new(RwLock::new(None)),
            close_tx: Mutex::new(None),
        }
    }

    pub fn room_num(&self) -> &str {
        &self.room_num
    }

    pub fn state(&self) -> ConnState {
        ConnState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Resolved room metadata, available once the session has opened.
    pub fn get_live_info(&self) -> Option<LiveInfo> {
        self.live_info
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Start the session and return its event stream.
    ///
    /// A second call while a session is still running is rejected and
    /// returns an immediately-terminated stream.
    pub fn connect(&self) -> mpsc::Receiver<CastEvent> {
        let (events_tx, events_rx) = mpsc::channel(self.config.event_buffer);

        {
            let mut guard = self.close_tx.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = guard.as_ref()
                && !existing.is_closed()
            {
                warn!(room = %self.room_num, "connect called while a session is active");
                return events_rx;
            }

            let (close_tx, close_rx) = mpsc::channel::<CloseRequest>(4);
            *guard = Some(close_tx);

            let protocol = Arc::clone(&self.protocol);
            let room_num = self.room_num.clone();
            let config = self.config.clone();
            let state = Arc::clone(&self.state);
            let live_info = Arc::clone(&self.live_info);

            tokio::spawn(async move {
                reconnect::run_controller(
                    protocol.as_ref(),
                    &room_num,
                    &config,
                    &state,
                    &live_info,
                    &events_tx,
                    close_rx,
                )
                .await;
            });
        }

        events_rx
    }

    /// Request an orderly shutdown. Idempotent: closing an already-closed
    /// session is a no-op.
    pub async fn close(&self, code: CloseCode, reason: Option<&str>) {
        let close_tx = {
            let guard = self.close_tx.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        if let Some(tx) = close_tx {
            // Fails once the controller has exited and dropped its receiver.
            let _ = tx
                .send(CloseRequest {
                    code,
                    reason: reason.map(str::to_string),
                })
                .await;
        }
    }
}
