//! YouTube 视频 ID 提取

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#\s]*&)?v=|shorts/|embed/|live/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
    .expect("valid regex")
});

static BARE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid regex"));

/// 从分享文本或 URL 中取出 11 位视频 ID，也接受裸 ID
pub fn extract_video_id(text: &str) -> Option<String> {
    let text = text.trim();
    if BARE_ID_RE.is_match(text) {
        return Some(text.to_string());
    }
    URL_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42s")
                .as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_short_forms() {
        for url in [
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_video_id(url).as_deref(), Some("dQw4w9WgXcQ"), "{}", url);
        }
    }

    #[test]
    fn test_url_inside_share_text() {
        let text = "这节课的板书很清楚 https://youtu.be/a_B-c1D2e3F 推荐收藏";
        assert_eq!(extract_video_id(text).as_deref(), Some("a_B-c1D2e3F"));
    }

    #[test]
    fn test_bare_id() {
        assert_eq!(extract_video_id("  dQw4w9WgXcQ \n").as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_rejects_invalid() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQextra"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(extract_video_id("没有链接"), None);
    }
}
