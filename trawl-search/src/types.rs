//! Data types for media search functionality.

use serde::{Deserialize, Serialize};

use crate::errors::MediaSearchError;

/// Result category requested from every source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Videos,
    Gifs,
}

impl MediaType {
    /// Every media type, in the order sources are usually queried.
    pub const ALL: [MediaType; 2] = [MediaType::Videos, MediaType::Gifs];

    /// Wire name used in URLs, fixture names and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::Gifs => "gifs",
        }
    }

    /// Whether results of this type carry a playback duration.
    pub fn has_duration(self) -> bool {
        matches!(self, Self::Videos)
    }

    /// Parses a caller-supplied type, falling back to `videos` with a warning.
    ///
    /// Absent or blank input silently means `videos`.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Self::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Unknown media type '{}', defaulting to videos", raw);
                Self::default()
            }),
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = MediaSearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "videos" | "video" => Ok(Self::Videos),
            "gifs" | "gif" => Ok(Self::Gifs),
            _ => Err(MediaSearchError::InvalidMediaType {
                media_type: s.to_string(),
            }),
        }
    }
}

/// Normalized search result returned to clients.
///
/// `title`, `url`, `source` and `type` are never empty once a value of this
/// type leaves the normalizer. `(source, id)` identifies an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaResult {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub preview_video: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub source: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

/// Unvalidated record produced by a driver's parser.
///
/// Every field may be missing; the normalizer decides what survives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub preview_video: Option<String>,
    pub duration: Option<String>,
    pub source: Option<String>,
    pub media_type: Option<MediaType>,
}

impl RawRecord {
    /// Record with an id, title and page URL, the minimum most parsers find.
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            title: Some(title.into()),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview_video = Some(preview.into());
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }
}

/// Body format of fetched content, used to pick a parse path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
}

impl ContentKind {
    /// Derives the kind from a `Content-Type` header value.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let lowered = content_type.to_lowercase();
        if lowered.contains("json") {
            Some(Self::Json)
        } else if lowered.contains("html") || lowered.contains("xml") {
            Some(Self::Html)
        } else {
            None
        }
    }

    /// Guesses the kind from the first non-whitespace character of a body.
    pub fn sniff(body: &str) -> Self {
        match body.trim_start().chars().next() {
            Some('{') | Some('[') => Self::Json,
            _ => Self::Html,
        }
    }
}

/// Raw body returned by a fetch adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    pub body: String,
    pub kind: ContentKind,
}

impl RawContent {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            kind: ContentKind::Html,
        }
    }

    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            kind: ContentKind::Json,
        }
    }
}

/// Context handed to a driver's parser.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub media_type: MediaType,
    pub source_name: &'a str,
    pub query: &'a str,
    pub page: u32,
}
