//! Built-in emote table.
//!
//! Chat content embeds emotes as bracketed names, e.g. `你好[比心]`. The
//! platform does not send the image URLs inline, so the mapper resolves them
//! from this static table. Names missing here stay as literal text.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

macro_rules! emote {
    ($name:literal, $n:literal) => {
        (
            $name,
            concat!(
                "https://p3-webcast.douyinpic.com/img/webcast/emoji_",
                $n,
                ".png~tplv-obj.image"
            ),
        )
    };
}

static EMOJI_TABLE: LazyLock<FxHashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        emote!("微笑", 1),
        emote!("爱心", 2),
        emote!("比心", 3),
        emote!("赞", 4),
        emote!("鼓掌", 5),
        emote!("玫瑰", 6),
        emote!("666", 7),
        emote!("捂脸", 8),
        emote!("大笑", 9),
        emote!("流泪", 10),
        emote!("呲牙", 11),
        emote!("发怒", 12),
        emote!("惊呆", 13),
        emote!("灵机一动", 14),
        emote!("送心", 15),
        emote!("加油", 16),
        emote!("握手", 17),
        emote!("来看我", 18),
        emote!("酷拽", 19),
        emote!("泣不成声", 20),
    ]
    .into_iter()
    .collect()
});

/// Image URL for a bracketed emote name, without the brackets.
pub fn emoji_url(name: &str) -> Option<&'static str> {
    EMOJI_TABLE.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_emotes_resolve() {
        assert!(emoji_url("比心").is_some());
        assert!(emoji_url("666").is_some());
        assert!(emoji_url("不存在的表情").is_none());
    }
}
