//! Video id extraction from watch/share URLs.

use url::Url;

/// Extracts the video id from a URL.
///
/// Recognized shapes: a `v=` query parameter, a `youtu.be/<id>` share path,
/// and `/shorts/<id>`, `/embed/<id>`, `/live/<id>` paths.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;

    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        if !v.is_empty() {
            return Some(v.into_owned());
        }
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    if host == "youtu.be" || host == "www.youtu.be" {
        return segments.next().map(str::to_string);
    }

    match segments.next() {
        Some("shorts") | Some("embed") | Some("live") => segments.next().map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn share_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/AAA?t=10"),
            Some("AAA".to_string())
        );
    }

    #[test]
    fn shorts_embed_live() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/S1"),
            Some("S1".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/E1?t=5"),
            Some("E1".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/live/L1"),
            Some("L1".to_string())
        );
    }

    #[test]
    fn unrecognized() {
        assert_eq!(extract_video_id("https://example.com/video.mp4"), None);
        assert_eq!(extract_video_id("https://youtu.be/"), None);
        assert_eq!(extract_video_id("not a url"), None);
    }
}
