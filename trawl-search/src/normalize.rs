//! Result normalization: raw driver records into client-ready results.
//!
//! A record either becomes a complete [`MediaResult`] or is dropped. Drops are
//! silent apart from a debug log; they are expected on real pages (ads,
//! promo tiles, half-rendered items).

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::types::{MediaResult, MediaType, RawRecord};

/// Sentinel duration for types that have one but the source did not say.
pub const UNKNOWN_DURATION: &str = "N/A";

/// File extensions accepted for inline preview playback.
pub const PREVIEW_EXTENSIONS: [&str; 8] = [
    "mp4", "webm", "m4v", "mov", "ogv", "gif", "gifv", "m3u8",
];

static PLACEHOLDER_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(^data:|placeholder|blank\.|spacer|loading|lazy[-_.]?load|lazy\.|default[-_]?(img|image|thumb))",
    )
    .map_err(|e| tracing::error!("Invalid preview denylist pattern: {}", e))
    .ok()
});

/// Caller-side defaults applied to every record from one driver.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeDefaults<'a> {
    pub source: &'a str,
    pub media_type: MediaType,
    pub base_url: &'a Url,
}

/// Normalizes one record; `index` is its 0-based position in the batch.
///
/// Returns `None` when the record has no resolvable page URL, or when it has
/// no title and lacks either a URL or an id to build a placeholder from.
pub fn normalize(
    raw: RawRecord,
    defaults: &NormalizeDefaults<'_>,
    index: usize,
) -> Option<MediaResult> {
    let source = non_empty(raw.source).unwrap_or_else(|| defaults.source.to_string());
    let media_type = raw.media_type.unwrap_or(defaults.media_type);

    let title = non_empty(raw.title).map(|t| collapse_whitespace(&t));
    let id = non_empty(raw.id);
    let raw_url = non_empty(raw.url);

    if title.is_none() && (raw_url.is_none() || id.is_none()) {
        tracing::debug!(
            "Dropping untitled {} record #{} without url and id",
            source,
            index
        );
        return None;
    }

    let Some(url) = raw_url
        .as_deref()
        .and_then(|u| resolve_url(defaults.base_url, u))
    else {
        tracing::debug!(
            "Dropping {} record #{}: unresolvable url {:?}",
            source,
            index,
            raw_url
        );
        return None;
    };

    let title = title.unwrap_or_else(|| format!("{} Content {}", source, index + 1));
    let id = id.unwrap_or_else(|| fallback_id(&url));

    let thumbnail = raw
        .thumbnail
        .as_deref()
        .and_then(|t| resolve_url(defaults.base_url, t))
        .unwrap_or_default();

    let preview_video = raw
        .preview_video
        .as_deref()
        .and_then(|p| resolve_url(defaults.base_url, p))
        .filter(|p| is_valid_preview(p))
        .unwrap_or_default();

    let duration = media_type.has_duration().then(|| {
        non_empty(raw.duration)
            .map(|d| collapse_whitespace(&d))
            .unwrap_or_else(|| UNKNOWN_DURATION.to_string())
    });

    Some(MediaResult {
        id,
        title,
        url,
        thumbnail,
        preview_video,
        duration,
        source,
        media_type,
    })
}

/// Normalizes a driver's batch, preserving document order.
pub fn normalize_all(
    records: Vec<RawRecord>,
    defaults: &NormalizeDefaults<'_>,
) -> Vec<MediaResult> {
    let total = records.len();
    let results: Vec<MediaResult> = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| normalize(raw, defaults, index))
        .collect();

    if results.len() < total {
        tracing::debug!(
            "{}: kept {}/{} records after normalization",
            defaults.source,
            results.len(),
            total
        );
    }
    results
}

/// Resolves a possibly relative link to an absolute http(s) URL.
///
/// Protocol-relative links (`//cdn...`) inherit the base scheme. Anything
/// that does not end up as http or https is rejected.
pub fn resolve_url(base: &Url, candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.starts_with('#') {
        return None;
    }

    let resolved = match Url::parse(candidate) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(candidate).ok()?,
        Err(_) => return None,
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Whether a resolved URL looks like playable preview media.
pub fn is_valid_preview(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    let has_media_extension = parsed
        .path()
        .rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .is_some_and(|(_, ext)| {
            PREVIEW_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        });

    has_media_extension && !is_placeholder(url)
}

fn is_placeholder(url: &str) -> bool {
    PLACEHOLDER_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(url))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Id derived from the item URL: its last non-empty path segment, or the
/// whole URL when the path is bare.
fn fallback_id(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                .map(str::to_string)
        })
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn base() -> Url {
        Url::parse("https://tube.example.com/search?q=x").unwrap()
    }

    fn defaults(base: &Url, media_type: MediaType) -> NormalizeDefaults<'_> {
        NormalizeDefaults {
            source: "Example Tube",
            media_type,
            base_url: base,
        }
    }

    #[test]
    fn test_complete_record_is_resolved() {
        let base = base();
        let raw = RawRecord::new("11", "  A   clip ", "/watch/11")
            .with_thumbnail("//cdn.example.com/11.jpg")
            .with_preview("/previews/11.webm")
            .with_duration("3:21");

        let result = normalize(raw, &defaults(&base, MediaType::Videos), 0).unwrap();

        assert_eq!(result.title, "A clip");
        assert_eq!(result.url, "https://tube.example.com/watch/11");
        assert_eq!(result.thumbnail, "https://cdn.example.com/11.jpg");
        assert_eq!(
            result.preview_video,
            "https://tube.example.com/previews/11.webm"
        );
        assert_eq!(result.duration.as_deref(), Some("3:21"));
        assert_eq!(result.source, "Example Tube");
        assert_eq!(result.media_type, MediaType::Videos);
    }

    #[test]
    fn test_placeholder_title_uses_position() {
        let base = base();
        let raw = RawRecord {
            id: Some("7".to_string()),
            url: Some("/watch/7".to_string()),
            ..RawRecord::default()
        };

        let result = normalize(raw, &defaults(&base, MediaType::Videos), 2).unwrap();
        assert_eq!(result.title, "Example Tube Content 3");
        assert_eq!(result.duration.as_deref(), Some(UNKNOWN_DURATION));
        assert_eq!(result.thumbnail, "");
    }

    #[test]
    fn test_untitled_record_without_id_is_dropped() {
        let base = base();
        let raw = RawRecord {
            url: Some("/watch/7".to_string()),
            ..RawRecord::default()
        };
        assert!(normalize(raw, &defaults(&base, MediaType::Videos), 0).is_none());
    }

    #[test]
    fn test_record_without_resolvable_url_is_dropped() {
        let base = base();
        let no_url = RawRecord {
            id: Some("1".to_string()),
            title: Some("Title".to_string()),
            ..RawRecord::default()
        };
        let script_url = RawRecord::new("2", "Title", "javascript:void(0)");

        assert!(normalize(no_url, &defaults(&base, MediaType::Videos), 0).is_none());
        assert!(normalize(script_url, &defaults(&base, MediaType::Videos), 0).is_none());
    }

    #[test]
    fn test_record_values_beat_defaults() {
        let base = base();
        let raw = RawRecord::new("9", "Loop", "https://gifs.example.org/9")
            .with_source("Partner Gifs")
            .with_media_type(MediaType::Gifs)
            .with_duration("0:04");

        let result = normalize(raw, &defaults(&base, MediaType::Videos), 0).unwrap();
        assert_eq!(result.source, "Partner Gifs");
        assert_eq!(result.media_type, MediaType::Gifs);
        assert_eq!(result.duration, None);
    }

    #[test]
    fn test_missing_id_falls_back_to_url() {
        let base = base();
        let raw = RawRecord {
            title: Some("Untagged".to_string()),
            url: Some("/video/abc-123/".to_string()),
            ..RawRecord::default()
        };

        let result = normalize(raw, &defaults(&base, MediaType::Videos), 0).unwrap();
        assert_eq!(result.id, "abc-123");
    }

    #[test]
    fn test_preview_validation() {
        assert!(is_valid_preview("https://cdn.example.com/p/1.mp4"));
        assert!(is_valid_preview("https://cdn.example.com/p/1.WEBM?token=abc"));
        assert!(is_valid_preview("https://cdn.example.com/hls/master.m3u8"));
        assert!(!is_valid_preview("https://cdn.example.com/p/1.jpg"));
        assert!(!is_valid_preview("https://cdn.example.com/p/stream"));
        assert!(!is_valid_preview("https://cdn.example.com/img/placeholder.gif"));
        assert!(!is_valid_preview("https://cdn.example.com/img/loading.gif"));
        assert!(!is_valid_preview("https://cdn.example.com/spacer.gif"));
    }

    #[test]
    fn test_invalid_preview_blanks_field_only() {
        let base = base();
        let raw = RawRecord::new("3", "Still", "/watch/3").with_preview("/img/blank.gif");

        let result = normalize(raw, &defaults(&base, MediaType::Gifs), 0).unwrap();
        assert_eq!(result.preview_video, "");
        assert_eq!(result.url, "https://tube.example.com/watch/3");
    }

    #[test]
    fn test_resolve_url_rules() {
        let base = base();
        assert_eq!(
            resolve_url(&base, "page/2").as_deref(),
            Some("https://tube.example.com/page/2")
        );
        assert_eq!(resolve_url(&base, "   "), None);
        assert_eq!(resolve_url(&base, "#top"), None);
        assert_eq!(resolve_url(&base, "data:image/gif;base64,R0lGOD"), None);
        assert_eq!(resolve_url(&base, "mailto:someone@example.com"), None);
    }

    fn optional_text() -> impl Strategy<Value = Option<String>> {
        prop::option::of(prop_oneof![
            Just(String::new()),
            Just("   ".to_string()),
            "[a-zA-Z0-9 /._:-]{1,24}",
        ])
    }

    proptest! {
        #[test]
        fn prop_normalized_results_are_complete(
            id in optional_text(),
            title in optional_text(),
            url in optional_text(),
            thumbnail in optional_text(),
            preview in optional_text(),
            duration in optional_text(),
            gifs in any::<bool>(),
            index in 0usize..50,
        ) {
            let base = base();
            let media_type = if gifs { MediaType::Gifs } else { MediaType::Videos };
            let raw = RawRecord {
                id,
                title,
                url,
                thumbnail,
                preview_video: preview,
                duration,
                source: None,
                media_type: None,
            };

            if let Some(result) = normalize(raw, &defaults(&base, media_type), index) {
                prop_assert!(!result.title.trim().is_empty());
                prop_assert!(!result.id.is_empty());
                prop_assert!(!result.source.is_empty());
                prop_assert!(Url::parse(&result.url).is_ok());
                prop_assert!(result.thumbnail.is_empty() || Url::parse(&result.thumbnail).is_ok());
                prop_assert!(result.preview_video.is_empty() || is_valid_preview(&result.preview_video));
                prop_assert_eq!(result.duration.is_some(), media_type.has_duration());
            }
        }
    }
}
