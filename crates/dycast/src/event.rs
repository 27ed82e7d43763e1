//! Typed events emitted by a cast session.
//!
//! Consumers receive a single tagged-union event stream over an mpsc channel
//! instead of registering per-event callbacks; ordering is inherited from the
//! session task that produces them.

use serde::{Deserialize, Serialize};

use crate::error::CastError;
use crate::message::{LiveInfo, Message};

/// Close cause of a session. The variants are the public contract other
/// components branch on; the numeric codes are carried on the wire and in
/// exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseCode {
    /// Caller-initiated, intentional disconnect.
    Normal,
    /// The room's own control signal said the stream ended; self-closed.
    LiveEnd,
    /// Liveness timeout: protocol-level silence beyond the threshold.
    CannotReceive,
    /// Any other / unclassified upstream closure.
    Other(u16),
}

impl CloseCode {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::LiveEnd => 4001,
            Self::CannotReceive => 4002,
            Self::Other(code) => code,
        }
    }

    pub fn from_u16(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            4001 => Self::LiveEnd,
            4002 => Self::CannotReceive,
            other => Self::Other(other),
        }
    }

    /// Whether the reconnection controller may retry after this closure.
    /// `Normal` and `LiveEnd` are terminal.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::CannotReceive | Self::Other(_))
    }
}

/// Events of one capture run, delivered strictly in production order.
#[derive(Debug)]
pub enum CastEvent {
    /// The session reached open; carries the resolved room metadata.
    Open { info: LiveInfo },
    /// One network frame's worth of decoded messages (may be empty).
    Message(Vec<Message>),
    /// A non-fatal or pre-open failure. Fatal outcomes are always followed by
    /// `Close`.
    Error(CastError),
    /// The session closed. Followed by `Reconnecting` when a retry is
    /// scheduled; terminal otherwise.
    Close {
        code: CloseCode,
        reason: Option<String>,
    },
    /// A retry was scheduled; emitted before the backoff delay elapses.
    Reconnecting {
        attempt: u32,
        code: CloseCode,
        reason: Option<String>,
    },
    /// A session reached open after at least one retry; emitted instead of
    /// `Open`. Resets the attempt counter.
    Reconnect { info: LiveInfo },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_values_are_stable() {
        assert_eq!(CloseCode::Normal.as_u16(), 1000);
        assert_eq!(CloseCode::LiveEnd.as_u16(), 4001);
        assert_eq!(CloseCode::CannotReceive.as_u16(), 4002);
        assert_eq!(CloseCode::Other(1006).as_u16(), 1006);
        assert_eq!(CloseCode::from_u16(4001), CloseCode::LiveEnd);
        assert_eq!(CloseCode::from_u16(1011), CloseCode::Other(1011));
    }

    #[test]
    fn test_retry_classification() {
        assert!(CloseCode::CannotReceive.is_retryable());
        assert!(CloseCode::Other(1006).is_retryable());
        assert!(!CloseCode::Normal.is_retryable());
        assert!(!CloseCode::LiveEnd.is_retryable());
    }
}
