//! Wire-model to public-model mapping.
//!
//! Every upstream event either becomes one [`Message`] or is dropped here.
//! Events that carry room statistics also update the session's [`LiveRoom`]
//! snapshot in place before the message is built, so messages always embed
//! counts at least as fresh as the event that produced them.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::message::{CastMethod, CastUser, GiftInfo, LiveRoom, Message, RichSegment, RoomStatus};

use super::codec::ProtocolEvent;
use super::emoji;
use super::proto::{Common, User};

static EMOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Bracketed emote names never nest.
    Regex::new(r"\[[^\[\]]+\]").unwrap()
});

fn map_user(user: Option<User>) -> Option<CastUser> {
    let user = user?;
    Some(CastUser {
        id: (user.id != 0).then(|| user.id.to_string()),
        sec_uid: (!user.sec_uid.is_empty()).then(|| user.sec_uid.clone()),
        name: user.nickname,
        avatar: user
            .avatar_thumb
            .and_then(|img| img.url_list.into_iter().next()),
    })
}

fn event_id(common: &Option<Common>) -> Option<String> {
    match common {
        Some(c) if c.msg_id != 0 => Some(c.msg_id.to_string()),
        _ => None,
    }
}

/// Split chat content into text and emote segments, in original order.
///
/// Bracketed names that are not in the emote table stay as literal text, and
/// adjacent text runs are coalesced. Reassembling the segments always yields
/// the input string.
pub fn tokenize_rich_text(content: &str) -> Vec<RichSegment> {
    let mut segments: Vec<RichSegment> = Vec::new();
    let mut push_text = |segments: &mut Vec<RichSegment>, text: &str| {
        if text.is_empty() {
            return;
        }
        if let Some(RichSegment::Text { text: last }) = segments.last_mut() {
            last.push_str(text);
        } else {
            segments.push(RichSegment::Text {
                text: text.to_string(),
            });
        }
    };

    let mut cursor = 0;
    for m in EMOTE_RE.find_iter(content) {
        push_text(&mut segments, &content[cursor..m.start()]);
        let name = &content[m.start() + 1..m.end() - 1];
        match emoji::emoji_url(name) {
            Some(url) => segments.push(RichSegment::Emoji {
                name: name.to_string(),
                url: url.to_string(),
            }),
            None => push_text(&mut segments, m.as_str()),
        }
        cursor = m.end();
    }
    push_text(&mut segments, &content[cursor..]);
    segments
}

fn rich_content_for(content: &str) -> Option<Vec<RichSegment>> {
    let segments = tokenize_rich_text(content);
    segments
        .iter()
        .any(|s| matches!(s, RichSegment::Emoji { .. }))
        .then_some(segments)
}

/// Map one wire event to a public message, updating the room snapshot.
///
/// Returns `None` for events without a usable id and for snapshot-only pushes
/// that carry nothing consumers render.
pub fn map_event(event: ProtocolEvent, room: &mut LiveRoom) -> Option<Message> {
    match event {
        ProtocolEvent::Chat(chat) => {
            let Some(id) = event_id(&chat.common) else {
                trace!("dropping chat without msg_id");
                return None;
            };
            Some(Message {
                id,
                method: CastMethod::Chat,
                user: map_user(chat.user),
                rich_content: rich_content_for(&chat.content),
                content: Some(chat.content),
                ..Default::default()
            })
        }
        ProtocolEvent::EmojiChat(chat) => {
            let id = event_id(&chat.common)?;
            Some(Message {
                id,
                method: CastMethod::EmojiChat,
                user: map_user(chat.user),
                rich_content: rich_content_for(&chat.default_content),
                content: Some(chat.default_content),
                ..Default::default()
            })
        }
        ProtocolEvent::Gift(gift) => {
            let id = event_id(&gift.common)?;
            let info = gift.gift.as_ref();
            let count = if gift.repeat_count > 0 {
                gift.repeat_count
            } else {
                gift.combo_count.max(1)
            };
            Some(Message {
                id,
                method: CastMethod::Gift,
                user: map_user(gift.user),
                gift: Some(GiftInfo {
                    name: info.map(|g| g.name.clone()).unwrap_or_default(),
                    icon: info.and_then(|g| {
                        g.image
                            .as_ref()
                            .and_then(|img| img.url_list.first().cloned())
                    }),
                    count,
                    price: info.map(|g| u64::from(g.diamond_count)).unwrap_or(0),
                    repeat_end: gift.repeat_end == 1,
                }),
                ..Default::default()
            })
        }
        ProtocolEvent::Like(like) => {
            let id = event_id(&like.common)?;
            room.like_count = Some(like.total);
            Some(Message {
                id,
                method: CastMethod::Like,
                user: map_user(like.user),
                room: Some(room.clone()),
                ..Default::default()
            })
        }
        ProtocolEvent::Member(member) => {
            let id = event_id(&member.common)?;
            room.audience_count = Some(member.member_count);
            Some(Message {
                id,
                method: CastMethod::Member,
                user: map_user(member.user),
                room: Some(room.clone()),
                ..Default::default()
            })
        }
        ProtocolEvent::Social(social) => {
            let id = event_id(&social.common)?;
            if social.follow_count > 0 {
                room.follow_count = Some(social.follow_count);
            }
            Some(Message {
                id,
                method: CastMethod::Social,
                user: map_user(social.user),
                room: Some(room.clone()),
                ..Default::default()
            })
        }
        ProtocolEvent::RoomUserSeq(seq) => {
            let id = event_id(&seq.common)?;
            if seq.total > 0 {
                room.audience_count = Some(seq.total as u64);
            }
            if seq.total_user > 0 {
                room.total_user_count = Some(seq.total_user as u64);
            }
            Some(Message {
                id,
                method: CastMethod::RoomUserSeq,
                room: Some(room.clone()),
                ..Default::default()
            })
        }
        ProtocolEvent::RoomStats(stats) => {
            let id = event_id(&stats.common)?;
            if stats.display_value > 0 {
                room.audience_count = Some(stats.display_value as u64);
            }
            Some(Message {
                id,
                method: CastMethod::RoomStats,
                room: Some(room.clone()),
                ..Default::default()
            })
        }
        ProtocolEvent::Control(control) => {
            let id = event_id(&control.common)?;
            // Action 3 is the platform-side stream close.
            if control.action == 3 {
                room.status = RoomStatus::Ended;
            }
            Some(Message {
                id,
                method: CastMethod::Control,
                content: (!control.tips.is_empty()).then_some(control.tips),
                room: Some(room.clone()),
                ..Default::default()
            })
        }
    }
}
