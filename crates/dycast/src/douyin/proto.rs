//! Webcast push-protocol wire types.
//!
//! Hand-derived prost messages for the subset of the webcast IM schema this
//! client consumes: the outer `PushFrame`/`Response` container plus the event
//! payloads the mapper understands. Unknown fields are skipped by prost, so
//! these stay compatible with upstream schema growth.

/// Outer container of every binary frame in both directions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushFrame {
    #[prost(uint64, tag = "1")]
    pub seq_id: u64,
    #[prost(uint64, tag = "2")]
    pub log_id: u64,
    #[prost(uint64, tag = "3")]
    pub service: u64,
    #[prost(uint64, tag = "4")]
    pub method: u64,
    #[prost(message, repeated, tag = "5")]
    pub headers: ::prost::alloc::vec::Vec<FrameHeader>,
    #[prost(string, tag = "6")]
    pub payload_encoding: ::prost::alloc::string::String,
    #[prost(string, tag = "7")]
    pub payload_type: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "8")]
    pub payload: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FrameHeader {
    #[prost(string, tag = "1")]
    pub key: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub value: ::prost::alloc::string::String,
}

/// Decompressed payload of an inbound `PushFrame`: a batch of logical events.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(message, repeated, tag = "2")]
    pub messages: ::prost::alloc::vec::Vec<PushMessage>,
    #[prost(string, tag = "3")]
    pub cursor: ::prost::alloc::string::String,
    #[prost(uint64, tag = "4")]
    pub fetch_interval: u64,
    #[prost(uint64, tag = "5")]
    pub now: u64,
    #[prost(string, tag = "6")]
    pub internal_ext: ::prost::alloc::string::String,
    #[prost(uint32, tag = "7")]
    pub fetch_type: u32,
    #[prost(uint64, tag = "9")]
    pub heartbeat_duration: u64,
    #[prost(bool, tag = "10")]
    pub need_ack: bool,
    #[prost(string, tag = "11")]
    pub push_server: ::prost::alloc::string::String,
}

/// One logical event inside a `Response`, dispatched by `method`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushMessage {
    #[prost(string, tag = "1")]
    pub method: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: ::prost::alloc::vec::Vec<u8>,
    #[prost(int64, tag = "3")]
    pub msg_id: i64,
    #[prost(int32, tag = "4")]
    pub msg_type: i32,
    #[prost(int64, tag = "5")]
    pub offset: i64,
}

/// Fields shared by every event payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Common {
    #[prost(string, tag = "1")]
    pub method: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub msg_id: u64,
    #[prost(uint64, tag = "3")]
    pub room_id: u64,
    #[prost(uint64, tag = "4")]
    pub create_time: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Image {
    #[prost(string, repeated, tag = "1")]
    pub url_list: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, tag = "2")]
    pub uri: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct User {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub short_id: u64,
    #[prost(string, tag = "3")]
    pub nickname: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "9")]
    pub avatar_thumb: ::core::option::Option<Image>,
    #[prost(string, tag = "46")]
    pub sec_uid: ::prost::alloc::string::String,
}

/// `WebcastChatMessage`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChatMessage {
    #[prost(message, optional, tag = "1")]
    pub common: ::core::option::Option<Common>,
    #[prost(message, optional, tag = "2")]
    pub user: ::core::option::Option<User>,
    #[prost(string, tag = "3")]
    pub content: ::prost::alloc::string::String,
    #[prost(bool, tag = "4")]
    pub visible_to_sender: bool,
    #[prost(uint64, tag = "11")]
    pub event_time: u64,
}

/// `WebcastEmojiChatMessage`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EmojiChatMessage {
    #[prost(message, optional, tag = "1")]
    pub common: ::core::option::Option<Common>,
    #[prost(message, optional, tag = "2")]
    pub user: ::core::option::Option<User>,
    #[prost(uint64, tag = "3")]
    pub emoji_id: u64,
    #[prost(string, tag = "5")]
    pub default_content: ::prost::alloc::string::String,
}

/// `WebcastGiftMessage`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GiftMessage {
    #[prost(message, optional, tag = "1")]
    pub common: ::core::option::Option<Common>,
    #[prost(uint64, tag = "2")]
    pub gift_id: u64,
    #[prost(uint64, tag = "3")]
    pub fan_ticket_count: u64,
    #[prost(uint64, tag = "4")]
    pub group_count: u64,
    #[prost(uint64, tag = "5")]
    pub repeat_count: u64,
    #[prost(uint64, tag = "6")]
    pub combo_count: u64,
    #[prost(message, optional, tag = "7")]
    pub user: ::core::option::Option<User>,
    #[prost(message, optional, tag = "8")]
    pub to_user: ::core::option::Option<User>,
    #[prost(uint32, tag = "9")]
    pub repeat_end: u32,
    #[prost(message, optional, tag = "15")]
    pub gift: ::core::option::Option<GiftStruct>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GiftStruct {
    #[prost(message, optional, tag = "1")]
    pub image: ::core::option::Option<Image>,
    #[prost(string, tag = "2")]
    pub describe: ::prost::alloc::string::String,
    #[prost(bool, tag = "4")]
    pub combo: bool,
    #[prost(uint64, tag = "5")]
    pub id: u64,
    #[prost(uint32, tag = "12")]
    pub diamond_count: u32,
    #[prost(string, tag = "16")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "21")]
    pub icon: ::core::option::Option<Image>,
}

/// `WebcastLikeMessage`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LikeMessage {
    #[prost(message, optional, tag = "1")]
    pub common: ::core::option::Option<Common>,
    #[prost(uint64, tag = "2")]
    pub count: u64,
    #[prost(uint64, tag = "3")]
    pub total: u64,
    #[prost(message, optional, tag = "5")]
    pub user: ::core::option::Option<User>,
}

/// `WebcastMemberMessage`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MemberMessage {
    #[prost(message, optional, tag = "1")]
    pub common: ::core::option::Option<Common>,
    #[prost(message, optional, tag = "2")]
    pub user: ::core::option::Option<User>,
    #[prost(uint64, tag = "3")]
    pub member_count: u64,
}

/// `WebcastSocialMessage`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SocialMessage {
    #[prost(message, optional, tag = "1")]
    pub common: ::core::option::Option<Common>,
    #[prost(message, optional, tag = "2")]
    pub user: ::core::option::Option<User>,
    #[prost(string, tag = "3")]
    pub share_type: ::prost::alloc::string::String,
    #[prost(uint64, tag = "4")]
    pub action: u64,
    #[prost(uint64, tag = "6")]
    pub follow_count: u64,
}

/// `WebcastRoomUserSeqMessage`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoomUserSeqMessage {
    #[prost(message, optional, tag = "1")]
    pub common: ::core::option::Option<Common>,
    #[prost(int64, tag = "3")]
    pub total: i64,
    #[prost(int64, tag = "7")]
    pub total_user: i64,
    #[prost(string, tag = "8")]
    pub total_user_str: ::prost::alloc::string::String,
    #[prost(string, tag = "9")]
    pub total_str: ::prost::alloc::string::String,
}

/// `WebcastRoomStatsMessage`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoomStatsMessage {
    #[prost(message, optional, tag = "1")]
    pub common: ::core::option::Option<Common>,
    #[prost(string, tag = "4")]
    pub display_short: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub display_middle: ::prost::alloc::string::String,
    #[prost(string, tag = "6")]
    pub display_long: ::prost::alloc::string::String,
    #[prost(int64, tag = "7")]
    pub display_value: i64,
    #[prost(int64, tag = "11")]
    pub total: i64,
}

/// `WebcastControlMessage`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControlMessage {
    #[prost(message, optional, tag = "1")]
    pub common: ::core::option::Option<Common>,
    /// Lifecycle action; 3 means the stream was closed by the platform.
    #[prost(int64, tag = "2")]
    pub action: i64,
    #[prost(string, tag = "4")]
    pub tips: ::prost::alloc::string::String,
}
