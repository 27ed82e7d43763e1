//! Douyin webcast protocol.
//!
//! Implements [`CastProtocol`] for live.douyin.com: resolves a web rid via
//! the enter API, signs and builds the push-socket URL, and decodes the
//! binary push frames into public messages.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use regex::Regex;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::debug;

use crate::error::{CastError, Result};
use crate::message::{LiveRoom, Message};
use crate::protocol::{CastProtocol, DecodedBatch, RoomProfile};

pub mod codec;
pub mod emoji;
pub mod mapper;
pub mod proto;
mod resolve;
pub mod sign;

const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

const LIVE_DOUYIN_URL: &str = "https://live.douyin.com";
const WEBCAST_ENTER_URL: &str = "https://live.douyin.com/webcast/room/web/enter/";

const DOUYIN_WS_HOSTS: &[&str] = &[
    "wss://webcast100-ws-web-lq.douyin.com",
    "wss://webcast100-ws-web-hl.douyin.com",
    "wss://webcast100-ws-web-lf.douyin.com",
];
const DOUYIN_WS_URL_PATH: &str = "/webcast/im/push/v2/";

const VERSION_CODE: &str = "180800";
const WEBCAST_SDK_VERSION: &str = "1.0.15";
const UPDATE_VERSION_CODE: &str = "1.0.15";

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

static ROOM_NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4,16}$").unwrap());

/// Whether a string is a plausible web rid (digits only, sane length).
pub fn is_valid_room_num(room_num: &str) -> bool {
    ROOM_NUM_RE.is_match(room_num)
}

/// Douyin implementation of the protocol seam.
pub struct DouyinProtocol {
    client: reqwest::Client,
    /// Extra operator-supplied cookies appended to every request.
    cookies: Option<String>,
    /// Anonymous device cookie, fetched lazily and cached for the lifetime of
    /// the protocol instance.
    ttwid: Mutex<Option<String>>,
}

impl Default for DouyinProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl DouyinProtocol {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_UA)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            cookies: None,
            ttwid: Mutex::new(None),
        }
    }

    pub fn with_cookies(cookies: impl Into<String>) -> Self {
        Self {
            cookies: Some(cookies.into()),
            ..Self::new()
        }
    }

    /// Anonymous ttwid cookie from the live site, cached after first fetch.
    async fn ttwid(&self) -> Result<String> {
        let mut cached = self.ttwid.lock().await;
        if let Some(value) = cached.as_ref() {
            return Ok(value.clone());
        }

        let response = self.client.get(LIVE_DOUYIN_URL).send().await?;
        let ttwid = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| {
                cookie
                    .split(';')
                    .next()
                    .and_then(|pair| pair.trim().strip_prefix("ttwid="))
                    .map(str::to_string)
            })
            .ok_or_else(|| CastError::resolution("live site did not issue a ttwid cookie"))?;

        debug!("fetched ttwid cookie");
        *cached = Some(ttwid.clone());
        Ok(ttwid)
    }

    fn cookie_header(&self, ttwid: &str) -> String {
        let mut header = format!("ttwid={ttwid}; msToken={}", sign::generate_ms_token(116));
        if let Some(extra) = &self.cookies {
            header.push_str("; ");
            header.push_str(extra);
        }
        header
    }

    /// Signed push-socket URL for a resolved room.
    fn build_ws_url(room_id: &str, user_id: &str) -> String {
        let query_params: &[(&str, &str)] = &[
            ("app_name", "douyin_web"),
            ("aid", "6383"),
            ("live_id", "1"),
            ("device_platform", "web"),
            ("language", "zh-CN"),
            ("browser_language", "zh-CN"),
            ("browser_platform", "Win32"),
            ("browser_name", "Mozilla"),
            ("browser_version", "5.0"),
            ("cookie_enabled", "true"),
            ("screen_width", "1920"),
            ("screen_height", "1080"),
            ("version_code", VERSION_CODE),
            ("webcast_sdk_version", WEBCAST_SDK_VERSION),
            ("update_version_code", UPDATE_VERSION_CODE),
            ("compress", "gzip"),
            ("host", LIVE_DOUYIN_URL),
            ("did_rule", "3"),
            ("identity", "audience"),
            ("endpoint", "live_pc"),
            ("need_persist_msg_count", "15"),
            ("heartbeatDuration", "0"),
            ("room_id", room_id),
            ("user_unique_id", user_id),
        ];

        let query = query_params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let signature_stub = format!(
            "live_id=1,aid=6383,version_code={VERSION_CODE},webcast_sdk_version={WEBCAST_SDK_VERSION},room_id={room_id},sub_room_id=,sub_channel_id=,did_rule=3,user_unique_id={user_id},device_platform=web,device_type=,ac=,identity=audience"
        );
        let signature = sign::xbogus_for_stub(&signature_stub);

        let mut rng = rand::rng();
        let host = DOUYIN_WS_HOSTS
            .choose(&mut rng)
            .unwrap_or(&DOUYIN_WS_HOSTS[0]);

        format!("{host}{DOUYIN_WS_URL_PATH}?{query}&signature={signature}")
    }
}

#[async_trait]
impl CastProtocol for DouyinProtocol {
    async fn resolve(&self, room_num: &str) -> Result<RoomProfile> {
        if !is_valid_room_num(room_num) {
            return Err(CastError::resolution(format!(
                "invalid room number {room_num:?}"
            )));
        }

        let ttwid = self.ttwid().await?;
        let cookie = self.cookie_header(&ttwid);

        let response = self
            .client
            .get(WEBCAST_ENTER_URL)
            .query(&[
                ("aid", "6383"),
                ("app_name", "douyin_web"),
                ("live_id", "1"),
                ("device_platform", "web"),
                ("language", "zh-CN"),
                ("enter_from", "web_live"),
                ("cookie_enabled", "true"),
                ("screen_width", "1920"),
                ("screen_height", "1080"),
                ("browser_language", "zh-CN"),
                ("browser_platform", "Win32"),
                ("browser_name", "Chrome"),
                ("browser_version", "126.0.0.0"),
                ("web_rid", room_num),
            ])
            .header(reqwest::header::REFERER, LIVE_DOUYIN_URL)
            .header(reqwest::header::COOKIE, &cookie)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CastError::resolution(format!(
                "enter API returned {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let (info, room) = resolve::room_from_enter(room_num, &body)?;
        debug!(room_id = %info.room_id, status = ?info.status, "resolved room");

        let user_id = sign::generate_user_unique_id();
        let ws_url = Self::build_ws_url(&info.room_id, &user_id);

        let headers = vec![
            ("Origin".to_string(), LIVE_DOUYIN_URL.to_string()),
            ("User-Agent".to_string(), DEFAULT_UA.to_string()),
            ("Cookie".to_string(), format!("ttwid={ttwid}")),
        ];

        Ok(RoomProfile {
            ws_url,
            headers,
            info,
            room,
        })
    }

    fn heartbeat_message(&self) -> Option<WsMessage> {
        Some(WsMessage::Binary(codec::heartbeat_frame()))
    }

    fn heartbeat_interval(&self) -> Duration {
        HEARTBEAT_INTERVAL
    }

    fn decode_frame(&self, frame: &[u8], room: &mut LiveRoom) -> Result<DecodedBatch> {
        let batch = codec::decode_frame(frame)?;
        let messages: Vec<Message> = batch
            .events
            .into_iter()
            .filter_map(|event| mapper::map_event(event, room))
            .collect();
        Ok(DecodedBatch {
            messages,
            ack: batch.ack,
        })
    }
}
