//! Platform protocol seam.
//!
//! The connection manager is protocol-agnostic: everything upstream-specific
//! (room resolution, heartbeat shape, the wire container) lives behind
//! [`CastProtocol`]. Production uses [`crate::douyin::DouyinProtocol`]; tests
//! plug stubs pointed at loopback servers.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

use crate::error::Result;
use crate::message::{LiveInfo, LiveRoom, Message};

/// Output of room resolution: where to connect and what the room looks like.
#[derive(Debug, Clone)]
pub struct RoomProfile {
    /// Fully signed WebSocket URL of the push endpoint.
    pub ws_url: String,
    /// Extra headers for the WebSocket upgrade (origin, cookies, UA).
    pub headers: Vec<(String, String)>,
    /// Room identity, immutable for the session once open.
    pub info: LiveInfo,
    /// Initial statistics snapshot.
    pub room: LiveRoom,
}

/// Result of decoding one network frame.
#[derive(Debug, Default)]
pub struct DecodedBatch {
    /// Messages decoded from the frame, in wire order. May be empty.
    pub messages: Vec<Message>,
    /// Exact acknowledgment payload to send back, when the frame demands one.
    pub ack: Option<Bytes>,
}

/// Upstream protocol definition for one platform.
#[async_trait]
pub trait CastProtocol: Send + Sync + 'static {
    /// Resolve room metadata and negotiate the socket endpoint.
    async fn resolve(&self, room_num: &str) -> Result<RoomProfile>;

    /// Heartbeat message, if the protocol uses one.
    fn heartbeat_message(&self) -> Option<WsMessage> {
        None
    }

    /// Heartbeat cadence; also the liveness accounting interval.
    fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(10)
    }

    /// Decode one raw binary frame into public messages, updating the room
    /// snapshot in place. Malformed sub-events inside a frame are skipped;
    /// only a fully unparseable frame is an error (and even that is treated
    /// by the caller as a liveness signal, not a fatal condition).
    fn decode_frame(&self, frame: &[u8], room: &mut LiveRoom) -> Result<DecodedBatch>;
}
