//! Reconnection controller.
//!
//! Wraps the per-session connection manager in a retry loop with exponential
//! backoff. Event ordering contract: every session's `Close` is emitted, then
//! `Reconnecting` when a retry is scheduled; the final `Close` is terminal.

use std::sync::RwLock;
use std::sync::atomic::AtomicU8;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info};

use crate::cast::CastConfig;
use crate::connection::{self, CloseRequest, ConnState};
use crate::event::CastEvent;
use crate::message::LiveInfo;
use crate::protocol::CastProtocol;

/// Backoff policy for abnormal closures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retry ceiling; 0 disables reconnection entirely.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `attempt` (1-based): doubles per attempt, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        delay.min(self.max_delay)
    }
}

/// Drive sessions until a terminal closure or a caller close.
///
/// The attempt counter resets whenever a session reaches open, so a stream
/// that drops every few hours retries from scratch each time instead of
/// burning through the ceiling.
pub(crate) async fn run_controller<P: CastProtocol>(
    protocol: &P,
    room_num: &str,
    config: &CastConfig,
    state: &AtomicU8,
    live_info: &RwLock<Option<LiveInfo>>,
    events: &mpsc::Sender<CastEvent>,
    mut close_rx: mpsc::Receiver<CloseRequest>,
) {
    let mut attempt: u32 = 0;

    loop {
        let outcome = connection::run_session(
            protocol, room_num, config, attempt, state, live_info, events, &mut close_rx,
        )
        .await;

        if outcome.opened {
            attempt = 0;
        }

        state.store(ConnState::Closed as u8, std::sync::atomic::Ordering::SeqCst);
        let _ = events
            .send(CastEvent::Close {
                code: outcome.code,
                reason: outcome.reason.clone(),
            })
            .await;

        if !outcome.code.is_retryable()
            || attempt >= config.retry.max_attempts
            || events.is_closed()
        {
            info!(room = room_num, code = ?outcome.code, "session closed");
            break;
        }

        attempt += 1;
        let delay = config.retry.delay_for(attempt);
        debug!(room = room_num, attempt, ?delay, "scheduling reconnect");
        let _ = events
            .send(CastEvent::Reconnecting {
                attempt,
                code: outcome.code,
                reason: outcome.reason,
            })
            .await;

        tokio::select! {
            _ = time::sleep(delay) => {}
            Some(req) = close_rx.recv() => {
                // Caller closed during backoff: terminal.
                state.store(ConnState::Closed as u8, std::sync::atomic::Ordering::SeqCst);
                let _ = events
                    .send(CastEvent::Close { code: req.code, reason: req.reason })
                    .await;
                break;
            }
        }
    }
}
