//! Single-session connection manager.
//!
//! One call to [`run_session`] drives one socket lifetime: resolve, connect,
//! pump frames with heartbeat/liveness accounting, and classify the closure.
//! Retrying across sessions is the reconnection controller's job.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU8, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;
use tracing::{debug, info, warn};

use crate::cast::CastConfig;
use crate::error::CastError;
use crate::event::{CastEvent, CloseCode};
use crate::message::{LiveInfo, RoomStatus};
use crate::protocol::CastProtocol;

/// Connection lifecycle, observable by consumers via an atomic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnState {
    Idle = 0,
    Resolving = 1,
    Open = 2,
    Closing = 3,
    Closed = 4,
}

impl ConnState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Resolving,
            2 => Self::Open,
            3 => Self::Closing,
            4 => Self::Closed,
            _ => Self::Idle,
        }
    }
}

/// Caller-initiated close, delivered over the control channel.
#[derive(Debug)]
pub(crate) struct CloseRequest {
    pub code: CloseCode,
    pub reason: Option<String>,
}

/// How one session ended. The controller turns this into a `Close` event and
/// a retry decision.
#[derive(Debug)]
pub(crate) struct SessionOutcome {
    pub code: CloseCode,
    pub reason: Option<String>,
    /// Whether the session reached the open state before closing.
    pub opened: bool,
}

impl SessionOutcome {
    fn new(code: CloseCode, reason: impl Into<String>, opened: bool) -> Self {
        Self {
            code,
            reason: Some(reason.into()),
            opened,
        }
    }
}

fn set_state(state: &AtomicU8, value: ConnState) {
    state.store(value as u8, Ordering::SeqCst);
}

/// Run one session to completion.
///
/// Every exit path returns a [`SessionOutcome`]; the caller emits the `Close`
/// event so that close ordering relative to `Reconnecting` stays in one
/// place.
pub(crate) async fn run_session<P: CastProtocol>(
    protocol: &P,
    room_num: &str,
    config: &CastConfig,
    attempt: u32,
    state: &AtomicU8,
    live_info: &RwLock<Option<LiveInfo>>,
    events: &mpsc::Sender<CastEvent>,
    close_rx: &mut mpsc::Receiver<CloseRequest>,
) -> SessionOutcome {
    set_state(state, ConnState::Resolving);

    let profile = tokio::select! {
        resolved = time::timeout(config.connect_timeout, protocol.resolve(room_num)) => {
            match resolved {
                Ok(Ok(profile)) => profile,
                Ok(Err(e)) => {
                    warn!(room = room_num, error = %e, "room resolution failed");
                    let _ = events.send(CastEvent::Error(e)).await;
                    return SessionOutcome::new(
                        CloseCode::Other(1006),
                        "room resolution failed",
                        false,
                    );
                }
                Err(_) => {
                    let _ = events
                        .send(CastEvent::Error(CastError::connection(
                            "room resolution timed out",
                        )))
                        .await;
                    return SessionOutcome::new(
                        CloseCode::Other(1006),
                        "room resolution timed out",
                        false,
                    );
                }
            }
        }
        Some(req) = close_rx.recv() => {
            return SessionOutcome { code: req.code, reason: req.reason, opened: false };
        }
    };

    if profile.info.status != RoomStatus::Living {
        info!(room = room_num, status = ?profile.info.status, "room is not live");
        *live_info.write().unwrap_or_else(|e| e.into_inner()) = Some(profile.info);
        return SessionOutcome::new(
            CloseCode::LiveEnd,
            "live has not started or already ended",
            false,
        );
    }

    let mut request = match profile.ws_url.as_str().into_client_request() {
        Ok(request) => request,
        Err(e) => {
            let _ = events.send(CastEvent::Error(e.into())).await;
            return SessionOutcome::new(CloseCode::Other(1006), "invalid websocket url", false);
        }
    };
    for (key, value) in &profile.headers {
        match (key.parse::<HeaderName>(), value.parse::<HeaderValue>()) {
            (Ok(name), Ok(value)) => {
                request.headers_mut().insert(name, value);
            }
            _ => warn!(header = key, "skipping malformed upgrade header"),
        }
    }

    let mut stream = tokio::select! {
        connected = time::timeout(config.connect_timeout, connect_async(request)) => {
            match connected {
                Ok(Ok((stream, _response))) => stream,
                Ok(Err(e)) => {
                    warn!(room = room_num, error = %e, "websocket connect failed");
                    let _ = events.send(CastEvent::Error(e.into())).await;
                    return SessionOutcome::new(
                        CloseCode::Other(1006),
                        "websocket connect failed",
                        false,
                    );
                }
                Err(_) => {
                    let _ = events
                        .send(CastEvent::Error(CastError::connection(
                            "websocket connect timed out",
                        )))
                        .await;
                    return SessionOutcome::new(
                        CloseCode::Other(1006),
                        "websocket connect timed out",
                        false,
                    );
                }
            }
        }
        Some(req) = close_rx.recv() => {
            return SessionOutcome { code: req.code, reason: req.reason, opened: false };
        }
    };

    set_state(state, ConnState::Open);
    let mut room = profile.room;
    let info = profile.info;
    *live_info.write().unwrap_or_else(|e| e.into_inner()) = Some(info.clone());

    let opened_event = if attempt == 0 {
        CastEvent::Open { info }
    } else {
        CastEvent::Reconnect { info }
    };
    let _ = events.send(opened_event).await;
    info!(room = room_num, attempt, "session open");

    let period = protocol.heartbeat_interval();
    let mut heartbeat = time::interval_at(Instant::now() + period, period);
    let mut saw_traffic = false;
    let mut missed: u32 = 0;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if events.is_closed() {
                    let _ = stream.close(None).await;
                    set_state(state, ConnState::Closing);
                    return SessionOutcome::new(CloseCode::Normal, "consumer dropped", true);
                }

                if saw_traffic {
                    saw_traffic = false;
                    missed = 0;
                } else {
                    missed += 1;
                    if missed >= config.max_missed_liveness {
                        warn!(room = room_num, missed, "liveness timeout");
                        let _ = events.send(CastEvent::Error(CastError::LivenessTimeout)).await;
                        let _ = stream.close(None).await;
                        set_state(state, ConnState::Closing);
                        return SessionOutcome::new(
                            CloseCode::CannotReceive,
                            "no messages received within the liveness window",
                            true,
                        );
                    }
                }

                if let Some(hb) = protocol.heartbeat_message()
                    && let Err(e) = stream.send(hb).await
                {
                    warn!(error = %e, "heartbeat send failed");
                }
            }

            Some(req) = close_rx.recv() => {
                set_state(state, ConnState::Closing);
                let frame = CloseFrame {
                    code: WsCloseCode::from(req.code.as_u16()),
                    reason: req.reason.clone().unwrap_or_default().into(),
                };
                let _ = stream.close(Some(frame)).await;
                return SessionOutcome { code: req.code, reason: req.reason, opened: true };
            }

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMessage::Binary(data))) => {
                        saw_traffic = true;
                        let batch = match protocol.decode_frame(&data, &mut room) {
                            Ok(batch) => batch,
                            Err(e) => {
                                // Still counts as traffic; an undecodable
                                // frame is not a dead connection.
                                warn!(error = %e, "dropping undecodable frame");
                                continue;
                            }
                        };

                        if let Some(ack) = batch.ack
                            && let Err(e) = stream.send(WsMessage::Binary(ack)).await
                        {
                            warn!(error = %e, "ack send failed");
                        }

                        // The room was live when the session opened; any
                        // other status now means the broadcast is over.
                        let ended_reason = (room.status != RoomStatus::Living).then(|| {
                            batch
                                .messages
                                .iter()
                                .rev()
                                .find_map(|m| m.content.clone())
                                .unwrap_or_else(|| "live stream ended".to_string())
                        });

                        // One event per network frame, empty batches included.
                        let _ = events.send(CastEvent::Message(batch.messages)).await;

                        if let Some(reason) = ended_reason {
                            debug!(room = room_num, "platform closed the stream");
                            let _ = stream.close(None).await;
                            set_state(state, ConnState::Closing);
                            return SessionOutcome::new(CloseCode::LiveEnd, reason, true);
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        set_state(state, ConnState::Closing);
                        let (code, reason) = match frame {
                            Some(frame) => {
                                let reason = (!frame.reason.is_empty())
                                    .then(|| frame.reason.to_string());
                                (u16::from(frame.code), reason)
                            }
                            None => (1005, None),
                        };
                        // Upstream closures are never `Normal` from the
                        // consumer's point of view.
                        return SessionOutcome {
                            code: CloseCode::Other(code),
                            reason,
                            opened: true,
                        };
                    }
                    Some(Ok(_)) => {
                        // Text, ping, pong: liveness only.
                        saw_traffic = true;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket transport error");
                        let _ = events.send(CastEvent::Error(e.into())).await;
                        set_state(state, ConnState::Closing);
                        return SessionOutcome::new(
                            CloseCode::Other(1006),
                            "websocket transport error",
                            true,
                        );
                    }
                    None => {
                        set_state(state, ConnState::Closing);
                        return SessionOutcome::new(
                            CloseCode::Other(1006),
                            "upstream closed the stream",
                            true,
                        );
                    }
                }
            }
        }
    }
}
