//! Binary frame codec for the webcast push socket.
//!
//! Inbound frames are `PushFrame` containers whose payload is a gzip-packed
//! `Response` holding a batch of typed events. Outbound traffic is limited to
//! heartbeats and acknowledgments, both also `PushFrame`s.

use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;
use prost::Message as _;
use tracing::{trace, warn};

use crate::error::{CastError, Result};

use super::proto::{
    ChatMessage, ControlMessage, EmojiChatMessage, GiftMessage, LikeMessage, MemberMessage,
    PushFrame, Response, RoomStatsMessage, RoomUserSeqMessage, SocialMessage,
};

/// One decoded upstream event, still in wire-model form.
#[derive(Debug)]
pub enum ProtocolEvent {
    Chat(ChatMessage),
    EmojiChat(EmojiChatMessage),
    Gift(GiftMessage),
    Like(LikeMessage),
    Member(MemberMessage),
    Social(SocialMessage),
    RoomUserSeq(RoomUserSeqMessage),
    RoomStats(RoomStatsMessage),
    Control(ControlMessage),
}

/// Events extracted from one frame, in wire order, plus the ack the server
/// asked for (if any).
#[derive(Debug, Default)]
pub struct RawBatch {
    pub events: Vec<ProtocolEvent>,
    pub ack: Option<Bytes>,
}

/// Heartbeat frame sent on every tick; equals the 4-byte `:\x02hb`.
pub fn heartbeat_frame() -> Bytes {
    let frame = PushFrame {
        payload_type: "hb".to_string(),
        ..Default::default()
    };
    Bytes::from(frame.encode_to_vec())
}

/// Acknowledgment echoing the frame's log id and internal ext string.
pub fn ack_frame(log_id: u64, internal_ext: &str) -> Bytes {
    let frame = PushFrame {
        log_id,
        payload_type: "ack".to_string(),
        payload: internal_ext.as_bytes().to_vec(),
        ..Default::default()
    };
    Bytes::from(frame.encode_to_vec())
}

fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CastError::decode(format!("gzip payload: {e}")))?;
    Ok(out)
}

fn decode_event(method: &str, payload: &[u8]) -> Result<Option<ProtocolEvent>> {
    let event = match method {
        "WebcastChatMessage" => ProtocolEvent::Chat(ChatMessage::decode(payload)?),
        "WebcastEmojiChatMessage" => ProtocolEvent::EmojiChat(EmojiChatMessage::decode(payload)?),
        "WebcastGiftMessage" => ProtocolEvent::Gift(GiftMessage::decode(payload)?),
        "WebcastLikeMessage" => ProtocolEvent::Like(LikeMessage::decode(payload)?),
        "WebcastMemberMessage" => ProtocolEvent::Member(MemberMessage::decode(payload)?),
        "WebcastSocialMessage" => ProtocolEvent::Social(SocialMessage::decode(payload)?),
        "WebcastRoomUserSeqMessage" => {
            ProtocolEvent::RoomUserSeq(RoomUserSeqMessage::decode(payload)?)
        }
        "WebcastRoomStatsMessage" => ProtocolEvent::RoomStats(RoomStatsMessage::decode(payload)?),
        "WebcastControlMessage" => ProtocolEvent::Control(ControlMessage::decode(payload)?),
        _ => return Ok(None),
    };
    Ok(Some(event))
}

/// Decode one binary frame into a batch of events.
///
/// A malformed sub-event is skipped with a warning so the rest of the batch
/// still goes through; only an unparseable container or payload is an error.
pub fn decode_frame(data: &[u8]) -> Result<RawBatch> {
    let frame = PushFrame::decode(data)?;

    let compress_type = frame
        .headers
        .iter()
        .find(|h| h.key == "compress_type")
        .map(|h| h.value.as_str())
        .unwrap_or("gzip");

    let payload = match compress_type {
        "gzip" => decompress_gzip(&frame.payload)?,
        "none" | "" => frame.payload.clone(),
        other => {
            return Err(CastError::decode(format!(
                "unsupported compress_type {other:?}"
            )));
        }
    };

    let response = Response::decode(payload.as_slice())?;

    let ack = response
        .need_ack
        .then(|| ack_frame(frame.log_id, &response.internal_ext));

    let mut events = Vec::with_capacity(response.messages.len());
    for msg in &response.messages {
        match decode_event(&msg.method, &msg.payload) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => trace!(method = %msg.method, "skipping unhandled message"),
            Err(e) => warn!(method = %msg.method, error = %e, "dropping malformed message"),
        }
    }

    Ok(RawBatch { events, ack })
}
