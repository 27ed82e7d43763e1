//! Room resolution via the webcast enter API.
//!
//! Turns an operator-facing room number (the web rid) into the internal room
//! id, room metadata, and an initial statistics snapshot. Requires a `ttwid`
//! cookie, fetched once from the live site and cached by the protocol.

use serde::Deserialize;

use crate::error::{CastError, Result};
use crate::message::{LiveInfo, LiveRoom, RoomStatus};

#[derive(Debug, Deserialize)]
pub(super) struct EnterResponse {
    pub data: Option<EnterData>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EnterData {
    #[serde(default)]
    pub data: Vec<EnterRoom>,
    pub user: Option<EnterUser>,
    #[serde(default)]
    pub prompts: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EnterRoom {
    pub id_str: String,
    pub status: i64,
    #[serde(default)]
    pub title: String,
    pub cover: Option<UrlList>,
    pub stats: Option<EnterStats>,
    pub owner: Option<EnterUser>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EnterStats {
    #[serde(default)]
    pub total_user_str: Option<String>,
    #[serde(default)]
    pub user_count_str: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EnterUser {
    #[serde(default)]
    pub nickname: String,
    pub avatar_thumb: Option<UrlList>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UrlList {
    #[serde(default)]
    pub url_list: Vec<String>,
}

/// Parse a display count like `"1,024"`. Suffixed forms (`"1.2万"`) are not
/// exact numbers and yield `None`.
pub(super) fn parse_count(display: &str) -> Option<u64> {
    let cleaned: String = display.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}

/// Build the public room metadata and snapshot from an enter API response.
pub(super) fn room_from_enter(room_num: &str, body: &str) -> Result<(LiveInfo, LiveRoom)> {
    let response: EnterResponse = serde_json::from_str(body)?;
    let data = response
        .data
        .ok_or_else(|| CastError::resolution("enter API returned no data"))?;

    let room = data.data.into_iter().next().ok_or_else(|| {
        let prompt = data
            .prompts
            .unwrap_or_else(|| "room not found".to_string());
        CastError::resolution(prompt)
    })?;

    let status = RoomStatus::from_code(room.status);
    let owner = room.owner.as_ref();
    let anchor = owner.or(data.user.as_ref());

    let info = LiveInfo {
        room_num: room_num.to_string(),
        room_id: room.id_str,
        title: room.title,
        cover: room
            .cover
            .and_then(|c| c.url_list.into_iter().next()),
        avatar: anchor
            .and_then(|u| u.avatar_thumb.as_ref())
            .and_then(|a| a.url_list.first().cloned()),
        nickname: anchor.map(|u| u.nickname.clone()).unwrap_or_default(),
        status,
    };

    let stats = room.stats.as_ref();
    let snapshot = LiveRoom {
        audience_count: stats
            .and_then(|s| s.user_count_str.as_deref())
            .and_then(parse_count),
        total_user_count: stats
            .and_then(|s| s.total_user_str.as_deref())
            .and_then(parse_count),
        status,
        ..Default::default()
    };

    Ok((info, snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTER_BODY: &str = r#"{
        "data": {
            "data": [{
                "id_str": "7312000000000000000",
                "status": 2,
                "title": "深夜电台",
                "cover": {"url_list": ["https://example.com/cover.jpg"]},
                "stats": {"total_user_str": "90,210", "user_count_str": "1024"},
                "owner": {
                    "id_str": "88",
                    "sec_uid": "MS4wLjAB",
                    "nickname": "主播A",
                    "avatar_thumb": {"url_list": ["https://example.com/a.png"]}
                }
            }],
            "user": null
        }
    }"#;

    #[test]
    fn test_enter_response_maps_to_room() {
        let (info, room) = room_from_enter("777", ENTER_BODY).unwrap();
        assert_eq!(info.room_num, "777");
        assert_eq!(info.room_id, "7312000000000000000");
        assert_eq!(info.title, "深夜电台");
        assert_eq!(info.nickname, "主播A");
        assert_eq!(info.status, RoomStatus::Living);
        assert_eq!(room.audience_count, Some(1024));
        assert_eq!(room.total_user_count, Some(90210));
        assert_eq!(room.status, RoomStatus::Living);
    }

    #[test]
    fn test_missing_room_surfaces_prompt() {
        let body = r#"{"data": {"data": [], "user": null, "prompts": "直播已结束"}}"#;
        let err = room_from_enter("777", body).unwrap_err();
        assert!(err.to_string().contains("直播已结束"));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,024"), Some(1024));
        assert_eq!(parse_count("90210"), Some(90210));
        assert_eq!(parse_count("1.2万"), None);
        assert_eq!(parse_count(""), None);
    }
}
