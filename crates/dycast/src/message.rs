//! Public message model.
//!
//! The unit delivered to consumers is [`Message`]: a typed, immutable view of
//! one upstream event, carrying a stable identifier used for deduplication
//! across reconnects. All types serialize to camelCase JSON and round-trip
//! without loss, which is what the relay and the JSON export rely on.

use serde::{Deserialize, Serialize};

/// Message taxonomy (closed set).
///
/// `Custom` is synthesized client-side (console/system notices) and never
/// produced by the upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CastMethod {
    Chat,
    EmojiChat,
    Gift,
    Like,
    /// Viewer joined the room.
    Member,
    /// Viewer followed the host.
    Social,
    /// Periodic audience-count push.
    RoomUserSeq,
    /// Periodic aggregate-stats push.
    RoomStats,
    /// Room lifecycle signal (e.g. stream ended).
    Control,
    Custom,
}

/// Room lifecycle status as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Preparing,
    Living,
    Paused,
    Ended,
    Unknown,
}

impl RoomStatus {
    /// Map the platform's numeric room status.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Preparing,
            2 => Self::Living,
            3 => Self::Paused,
            4 => Self::Ended,
            _ => Self::Unknown,
        }
    }
}

impl Default for RoomStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Snapshot of live room statistics.
///
/// Mutated in place by any event carrying fresher counts. Fields are sparse:
/// `None` means "unknown at this moment", not zero, and updates never clear a
/// field they do not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRoom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_user_count: Option<u64>,
    #[serde(default)]
    pub status: RoomStatus,
}

/// Room identity metadata, resolved once per session and immutable after
/// `open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveInfo {
    /// Room number as entered by the operator (the web rid).
    pub room_num: String,
    /// Internal room id used by the push protocol.
    pub room_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub nickname: String,
    #[serde(default)]
    pub status: RoomStatus,
}

/// Sender of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sec_uid: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Gift payload of a `GIFT` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub count: u64,
    /// Unit price in platform diamonds.
    pub price: u64,
    /// Whether this is the terminal frame of a combo.
    pub repeat_end: bool,
}

/// One segment of rich-text content, in original order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichSegment {
    Text { text: String },
    Emoji { name: String, url: String },
}

/// A single decoded danmaku message.
///
/// Created by the mapper, immutable once handed to consumers. `id` is
/// assigned at decode time from the upstream event id and is stable across a
/// reconnect re-delivery of the same event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub method: CastMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<CastUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift: Option<GiftInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_content: Option<Vec<RichSegment>>,
    /// Room statistics snapshot taken when the event was mapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<LiveRoom>,
}

impl Default for CastMethod {
    fn default() -> Self {
        Self::Custom
    }
}

impl Message {
    /// Synthesize a client-local message (console/system notice).
    pub fn custom(content: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            method: CastMethod::Custom,
            user: Some(CastUser {
                name: from.into(),
                ..Default::default()
            }),
            content: Some(content.into()),
            ..Default::default()
        }
    }
}
