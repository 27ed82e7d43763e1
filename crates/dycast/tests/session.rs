//! End-to-end session tests against loopback WebSocket servers.
//!
//! The stub protocol skips real room resolution and decodes frames as plain
//! JSON message arrays, so these tests exercise the connection manager and
//! the reconnection controller, not the Douyin codec.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

use dycast::{
    CastConfig, CastError, CastEvent, CastMethod, CastProtocol, CloseCode, DecodedBatch,
    DedupLedger, DyCast, LiveInfo, LiveRoom, Message, Result, RetryPolicy, RoomProfile,
    RoomStatus,
};

struct StubProtocol {
    /// Endpoint to hand out; `None` makes resolution fail.
    url: Mutex<Option<String>>,
    status: RoomStatus,
    resolve_delay: Duration,
    heartbeat: Duration,
}

impl StubProtocol {
    fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Mutex::new(Some(url.into())),
            status: RoomStatus::Living,
            resolve_delay: Duration::ZERO,
            heartbeat: Duration::from_millis(200),
        }
    }

    fn failing() -> Self {
        Self {
            url: Mutex::new(None),
            status: RoomStatus::Living,
            resolve_delay: Duration::ZERO,
            heartbeat: Duration::from_millis(200),
        }
    }
}

#[async_trait]
impl CastProtocol for StubProtocol {
    async fn resolve(&self, room_num: &str) -> Result<RoomProfile> {
        if !self.resolve_delay.is_zero() {
            sleep(self.resolve_delay).await;
        }
        let url = self
            .url
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CastError::resolution("stub room not found"))?;
        Ok(RoomProfile {
            ws_url: url,
            headers: Vec::new(),
            info: LiveInfo {
                room_num: room_num.to_string(),
                room_id: "1".to_string(),
                title: "Test".to_string(),
                cover: None,
                avatar: None,
                nickname: "host".to_string(),
                status: self.status,
            },
            room: LiveRoom {
                status: self.status,
                ..Default::default()
            },
        })
    }

    fn heartbeat_interval(&self) -> Duration {
        self.heartbeat
    }

    fn decode_frame(&self, frame: &[u8], room: &mut LiveRoom) -> Result<DecodedBatch> {
        let messages: Vec<Message> = serde_json::from_slice(frame)?;
        for msg in &messages {
            if let Some(snapshot) = &msg.room {
                *room = snapshot.clone();
            }
        }
        Ok(DecodedBatch {
            messages,
            ack: None,
        })
    }
}

fn quick_config() -> CastConfig {
    CastConfig {
        connect_timeout: Duration::from_secs(2),
        max_missed_liveness: 3,
        retry: RetryPolicy {
            max_attempts: 0,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        },
        event_buffer: 100,
    }
}

fn chat(id: &str, text: &str) -> Message {
    Message {
        id: id.to_string(),
        method: CastMethod::Chat,
        content: Some(text.to_string()),
        ..Default::default()
    }
}

fn frame(messages: &[Message]) -> WsMessage {
    WsMessage::Binary(Bytes::from(serde_json::to_vec(messages).unwrap()))
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn recv(events: &mut mpsc::Receiver<CastEvent>) -> Option<CastEvent> {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
}

#[tokio::test]
async fn test_messages_dispatch_in_arrival_order() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        ws.send(frame(&[chat("a", "one")])).await.unwrap();
        ws.send(frame(&[chat("b", "two"), chat("c", "three")]))
            .await
            .unwrap();
        // Keep the connection up until the client closes.
        while ws.next().await.is_some() {}
    });

    let cast = DyCast::with_protocol("777", StubProtocol::for_url(url), quick_config());
    let mut events = cast.connect();

    match recv(&mut events).await {
        Some(CastEvent::Open { info }) => assert_eq!(info.title, "Test"),
        other => panic!("expected open, got {other:?}"),
    }
    match recv(&mut events).await {
        Some(CastEvent::Message(batch)) => {
            assert_eq!(batch.len(), 1);
            assert_eq!(batch[0].id, "a");
        }
        other => panic!("expected first batch, got {other:?}"),
    }
    match recv(&mut events).await {
        Some(CastEvent::Message(batch)) => {
            // Batch boundaries are preserved.
            assert_eq!(batch.len(), 2);
            assert_eq!(batch[0].id, "b");
            assert_eq!(batch[1].id, "c");
        }
        other => panic!("expected second batch, got {other:?}"),
    }

    cast.close(CloseCode::Normal, Some("done")).await;
    match recv(&mut events).await {
        Some(CastEvent::Close { code, .. }) => assert_eq!(code, CloseCode::Normal),
        other => panic!("expected close, got {other:?}"),
    }
    assert!(recv(&mut events).await.is_none());
}

#[tokio::test]
async fn test_duplicate_ids_collapse_in_ledger() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        ws.send(frame(&[chat("a", "hello")])).await.unwrap();
        ws.send(frame(&[chat("a", "hello"), chat("b", "fresh")]))
            .await
            .unwrap();
        while ws.next().await.is_some() {}
    });

    let cast = DyCast::with_protocol("777", StubProtocol::for_url(url), quick_config());
    let mut events = cast.connect();

    let mut ledger = DedupLedger::new();
    let mut visible = Vec::new();
    while visible.len() < 2 {
        match recv(&mut events).await {
            Some(CastEvent::Message(batch)) => {
                for msg in batch {
                    if ledger.insert(&msg.id) {
                        visible.push(msg);
                    }
                }
            }
            Some(_) => {}
            None => panic!("stream ended early"),
        }
    }

    assert_eq!(visible.len(), 2);
    assert_eq!(visible[0].id, "a");
    assert_eq!(visible[1].id, "b");
    cast.close(CloseCode::Normal, None).await;
}

#[tokio::test]
async fn test_control_end_is_delivered_then_closed_with_live_end() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        let control = Message {
            id: "ctl".to_string(),
            method: CastMethod::Control,
            content: Some("stream over".to_string()),
            room: Some(LiveRoom {
                status: RoomStatus::Ended,
                ..Default::default()
            }),
            ..Default::default()
        };
        ws.send(frame(&[control])).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let mut config = quick_config();
    config.retry.max_attempts = 3;
    let cast = DyCast::with_protocol("777", StubProtocol::for_url(url), config);
    let mut events = cast.connect();

    assert!(matches!(recv(&mut events).await, Some(CastEvent::Open { .. })));
    match recv(&mut events).await {
        Some(CastEvent::Message(batch)) => assert_eq!(batch[0].method, CastMethod::Control),
        other => panic!("expected control message, got {other:?}"),
    }
    match recv(&mut events).await {
        Some(CastEvent::Close { code, reason }) => {
            assert_eq!(code, CloseCode::LiveEnd);
            assert_eq!(reason.as_deref(), Some("stream over"));
        }
        other => panic!("expected live-end close, got {other:?}"),
    }
    // LiveEnd is terminal even with retries configured.
    assert!(recv(&mut events).await.is_none());
}

#[tokio::test]
async fn test_any_non_living_status_update_ends_the_session() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        // The broadcast leaves the live state without fully ending.
        let control = Message {
            id: "ctl".to_string(),
            method: CastMethod::Control,
            content: Some("host stepped away".to_string()),
            room: Some(LiveRoom {
                status: RoomStatus::Paused,
                ..Default::default()
            }),
            ..Default::default()
        };
        ws.send(frame(&[control])).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let cast = DyCast::with_protocol("777", StubProtocol::for_url(url), quick_config());
    let mut events = cast.connect();

    assert!(matches!(recv(&mut events).await, Some(CastEvent::Open { .. })));
    assert!(matches!(recv(&mut events).await, Some(CastEvent::Message(_))));
    match recv(&mut events).await {
        Some(CastEvent::Close { code, reason }) => {
            assert_eq!(code, CloseCode::LiveEnd);
            assert_eq!(reason.as_deref(), Some("host stepped away"));
        }
        other => panic!("expected live-end close, got {other:?}"),
    }
    assert!(recv(&mut events).await.is_none());
}

#[tokio::test]
async fn test_empty_frames_dispatch_empty_batches() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        // A frame whose decoded batch carries no messages still counts as
        // one dispatch.
        ws.send(frame(&[])).await.unwrap();
        ws.send(frame(&[chat("a", "after empty")])).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let cast = DyCast::with_protocol("777", StubProtocol::for_url(url), quick_config());
    let mut events = cast.connect();

    assert!(matches!(recv(&mut events).await, Some(CastEvent::Open { .. })));
    match recv(&mut events).await {
        Some(CastEvent::Message(batch)) => assert!(batch.is_empty()),
        other => panic!("expected empty batch, got {other:?}"),
    }
    match recv(&mut events).await {
        Some(CastEvent::Message(batch)) => {
            assert_eq!(batch.len(), 1);
            assert_eq!(batch[0].id, "a");
        }
        other => panic!("expected second batch, got {other:?}"),
    }
    cast.close(CloseCode::Normal, None).await;
}

#[tokio::test]
async fn test_liveness_timeout_closes_with_cannot_receive() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        // Silent server: never sends anything.
        while ws.next().await.is_some() {}
    });

    let mut protocol = StubProtocol::for_url(url);
    protocol.heartbeat = Duration::from_millis(25);
    let cast = DyCast::with_protocol("777", protocol, quick_config());
    let mut events = cast.connect();

    assert!(matches!(recv(&mut events).await, Some(CastEvent::Open { .. })));
    match recv(&mut events).await {
        Some(CastEvent::Error(CastError::LivenessTimeout)) => {}
        other => panic!("expected liveness error, got {other:?}"),
    }
    match recv(&mut events).await {
        Some(CastEvent::Close { code, .. }) => assert_eq!(code, CloseCode::CannotReceive),
        other => panic!("expected cannot-receive close, got {other:?}"),
    }
    assert!(recv(&mut events).await.is_none());
}

#[tokio::test]
async fn test_retry_ceiling_event_order() {
    let mut config = quick_config();
    config.retry.max_attempts = 3;
    let cast = DyCast::with_protocol("777", StubProtocol::failing(), config);
    let mut events = cast.connect();

    let mut closes = 0u32;
    let mut reconnectings = Vec::new();
    let mut last_was_close = false;
    while let Some(event) = recv(&mut events).await {
        match event {
            CastEvent::Error(_) => {}
            CastEvent::Close { code, .. } => {
                assert_eq!(code, CloseCode::Other(1006));
                closes += 1;
                last_was_close = true;
            }
            CastEvent::Reconnecting { attempt, .. } => {
                // Every reconnecting notice directly follows a close.
                assert!(last_was_close);
                last_was_close = false;
                reconnectings.push(attempt);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    assert_eq!(closes, 4);
    assert_eq!(reconnectings, vec![1, 2, 3]);
    assert!(last_was_close, "terminal event must be a close");
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let cast = DyCast::with_protocol("777", StubProtocol::for_url(url), quick_config());
    let mut events = cast.connect();
    assert!(matches!(recv(&mut events).await, Some(CastEvent::Open { .. })));

    cast.close(CloseCode::Normal, None).await;
    cast.close(CloseCode::Normal, None).await;

    match recv(&mut events).await {
        Some(CastEvent::Close { code, .. }) => assert_eq!(code, CloseCode::Normal),
        other => panic!("expected close, got {other:?}"),
    }
    assert!(recv(&mut events).await.is_none());

    // Closing after the session ended is a no-op.
    cast.close(CloseCode::Normal, None).await;
}

#[tokio::test]
async fn test_reconnect_after_upstream_drop() {
    let (listener, url) = bind().await;
    let connections = std::sync::Arc::new(AtomicUsize::new(0));
    let server_connections = connections.clone();
    tokio::spawn(async move {
        loop {
            let (socket, _) = listener.accept().await.unwrap();
            let n = server_connections.fetch_add(1, Ordering::SeqCst);
            let mut ws = accept_async(socket).await.unwrap();
            if n == 0 {
                ws.send(frame(&[chat("a", "before drop")])).await.unwrap();
                // Drop the connection without a close handshake.
                drop(ws);
            } else {
                ws.send(frame(&[chat("b", "after reconnect")])).await.unwrap();
                while ws.next().await.is_some() {}
            }
        }
    });

    let mut config = quick_config();
    config.retry.max_attempts = 3;
    let cast = DyCast::with_protocol("777", StubProtocol::for_url(url), config);
    let mut events = cast.connect();

    let mut saw = Vec::new();
    loop {
        match recv(&mut events).await {
            Some(CastEvent::Open { .. }) => saw.push("open".to_string()),
            Some(CastEvent::Message(batch)) => {
                saw.push(format!("msg:{}", batch[0].id));
                if batch[0].id == "b" {
                    break;
                }
            }
            Some(CastEvent::Close { .. }) => saw.push("close".to_string()),
            Some(CastEvent::Reconnecting { attempt, .. }) => {
                saw.push(format!("reconnecting:{attempt}"));
            }
            Some(CastEvent::Reconnect { .. }) => saw.push("reconnect".to_string()),
            Some(CastEvent::Error(_)) => {}
            None => panic!("stream ended before reconnect delivered"),
        }
    }

    assert_eq!(
        saw,
        vec!["open", "msg:a", "close", "reconnecting:1", "reconnect", "msg:b"]
    );
    cast.close(CloseCode::Normal, None).await;
}

#[tokio::test]
async fn test_close_during_resolution() {
    let mut protocol = StubProtocol::failing();
    protocol.resolve_delay = Duration::from_secs(30);
    let cast = DyCast::with_protocol("777", protocol, quick_config());
    let mut events = cast.connect();

    sleep(Duration::from_millis(50)).await;
    cast.close(CloseCode::Normal, Some("changed my mind")).await;

    match recv(&mut events).await {
        Some(CastEvent::Close { code, reason }) => {
            assert_eq!(code, CloseCode::Normal);
            assert_eq!(reason.as_deref(), Some("changed my mind"));
        }
        other => panic!("expected close, got {other:?}"),
    }
    assert!(recv(&mut events).await.is_none());
}

#[tokio::test]
async fn test_non_living_room_closes_with_live_end() {
    let mut protocol = StubProtocol::for_url("ws://127.0.0.1:1/unused");
    protocol.status = RoomStatus::Ended;
    let mut config = quick_config();
    config.retry.max_attempts = 3;
    let cast = DyCast::with_protocol("777", protocol, config);
    let mut events = cast.connect();

    match recv(&mut events).await {
        Some(CastEvent::Close { code, .. }) => assert_eq!(code, CloseCode::LiveEnd),
        other => panic!("expected live-end close, got {other:?}"),
    }
    assert!(recv(&mut events).await.is_none());
    // Metadata is still exposed for rooms that were resolved but not live.
    assert_eq!(cast.get_live_info().unwrap().status, RoomStatus::Ended);
}
