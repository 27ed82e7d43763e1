//! dycast: Douyin live-stream danmaku capture library.
//!
//! Connects to a live room's webcast push socket, decodes the binary frame
//! stream into typed messages, and delivers them as an ordered event stream
//! with built-in heartbeating, liveness detection, and bounded reconnection.
//!
//! ## Core Types
//!
//! - [`DyCast`] - Handle to one capture session of one room
//! - [`CastEvent`] - Tagged-union event stream (open, message, close, ...)
//! - [`Message`] / [`CastMethod`] - Decoded danmaku messages and their taxonomy
//! - [`CloseCode`] - Close cause classification driving retry decisions
//!
//! ## Protocol Seam
//!
//! - [`CastProtocol`] - Platform abstraction (resolution, heartbeat, codec)
//! - [`douyin::DouyinProtocol`] - The Douyin webcast implementation
//!
//! ## Consumer Utilities
//!
//! - [`DedupLedger`] - Message-id deduplication across reconnects
//! - [`RelayCast`] - Fire-and-forget JSON relay to a downstream WebSocket

pub mod cast;
pub mod connection;
pub mod douyin;
pub mod error;
pub mod event;
pub mod ledger;
pub mod message;
pub mod protocol;
pub mod reconnect;
pub mod relay;

pub use cast::{CastConfig, DyCast};
pub use connection::ConnState;
pub use error::{CastError, Result};
pub use event::{CastEvent, CloseCode};
pub use ledger::DedupLedger;
pub use message::{
    CastMethod, CastUser, GiftInfo, LiveInfo, LiveRoom, Message, RichSegment, RoomStatus,
};
pub use protocol::{CastProtocol, DecodedBatch, RoomProfile};
pub use reconnect::RetryPolicy;
pub use relay::{RelayCast, RelayEvent, verify_ws_url};
