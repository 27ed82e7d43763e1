//! Cast error types.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, CastError>;

/// Errors produced by the danmaku client.
///
/// Transport and protocol failures never surface synchronously from
/// `connect()`/`send()`; they are delivered through the event stream.
#[derive(Error, Debug)]
pub enum CastError {
    /// Room lookup / handshake failure before the session reached open.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// A frame (or frame payload) that could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// WebSocket session errors (send failures, broken transport).
    #[error("connection error: {0}")]
    Connection(String),

    /// Protocol-level silence beyond the liveness threshold.
    #[error("no upstream traffic within the liveness window")]
    LivenessTimeout,

    /// HTTP errors during room resolution.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Protobuf decode errors.
    #[error("protobuf error: {0}")]
    Proto(#[from] prost::DecodeError),

    /// WebSocket transport errors.
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON (de)serialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CastError {
    /// Create a resolution error.
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }
}
