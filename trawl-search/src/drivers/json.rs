//! JSON-pointer driver for sources exposing a search API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DriverDescriptor, SearchUrls, SourceDriver};
use crate::errors::MediaSearchError;
use crate::types::{MediaType, ParseContext, RawContent, RawRecord};

/// JSON pointers (RFC 6901) locating the result array and item fields.
///
/// `items` is evaluated against the document root, the others against each
/// item. An empty `items` pointer means the root itself is the array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFields {
    #[serde(default)]
    pub items: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    /// Per-item source name, for APIs that aggregate several sites
    #[serde(default)]
    pub source: Option<String>,
    /// Per-item media type (`videos`/`gifs`)
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
}

impl JsonFields {
    pub fn new(items: &str) -> Self {
        Self {
            items: items.to_string(),
            id: None,
            title: None,
            url: None,
            thumbnail: None,
            preview: None,
            duration: None,
            source: None,
            media_type: None,
        }
    }

    fn validate(&self, driver: &str) -> Result<(), MediaSearchError> {
        let pointers = [
            Some(&self.items),
            self.id.as_ref(),
            self.title.as_ref(),
            self.url.as_ref(),
            self.thumbnail.as_ref(),
            self.preview.as_ref(),
            self.duration.as_ref(),
            self.source.as_ref(),
            self.media_type.as_ref(),
        ];

        match pointers
            .into_iter()
            .flatten()
            .find(|p| !p.is_empty() && !p.starts_with('/'))
        {
            Some(bad) => Err(MediaSearchError::InvalidDriver {
                name: driver.to_string(),
                reason: format!("JSON pointer '{bad}' must start with '/'"),
            }),
            None => Ok(()),
        }
    }

    fn extract(&self, item: &Value) -> Option<RawRecord> {
        let field = |pointer: &Option<String>| pointer.as_deref().and_then(|p| scalar(item, p));

        let record = RawRecord {
            id: field(&self.id),
            title: field(&self.title),
            url: field(&self.url),
            thumbnail: field(&self.thumbnail),
            preview_video: field(&self.preview),
            duration: field(&self.duration),
            source: field(&self.source),
            media_type: field(&self.media_type).and_then(|t| t.parse::<MediaType>().ok()),
        };

        (record != RawRecord::default()).then_some(record)
    }
}

/// Reads a pointer as text; numbers are rendered, other types ignored.
fn scalar(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Driver for sources that answer searches with JSON.
#[derive(Debug)]
pub struct JsonDriver {
    descriptor: DriverDescriptor,
    urls: SearchUrls,
    fields: JsonFields,
    gif_fields: Option<JsonFields>,
    headers: Vec<(String, String)>,
}

impl JsonDriver {
    /// Creates a driver; media support follows which URL templates exist.
    ///
    /// # Errors
    /// - `MediaSearchError::InvalidDriver` - A pointer is malformed
    pub fn new(
        descriptor: DriverDescriptor,
        urls: SearchUrls,
        fields: JsonFields,
        gif_fields: Option<JsonFields>,
    ) -> Result<Self, MediaSearchError> {
        fields.validate(&descriptor.name)?;
        if let Some(gif_fields) = &gif_fields {
            gif_fields.validate(&descriptor.name)?;
        }
        let descriptor = descriptor.with_media(urls.videos.is_some(), urls.gifs.is_some());

        Ok(Self {
            descriptor,
            urls,
            fields,
            gif_fields,
            headers: Vec::new(),
        })
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }
}

impl SourceDriver for JsonDriver {
    fn descriptor(&self) -> &DriverDescriptor {
        &self.descriptor
    }

    fn build_search_url(
        &self,
        query: &str,
        page: u32,
        media_type: MediaType,
    ) -> Result<String, MediaSearchError> {
        self.urls.build(&self.descriptor, query, page, media_type)
    }

    fn parse(&self, raw: &RawContent, context: &ParseContext<'_>) -> Vec<RawRecord> {
        // Content-Type is unreliable on some APIs, so HTML-labelled bodies are
        // still attempted as JSON.
        let document: Value = match serde_json::from_str(&raw.body) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!(
                    "{} returned a body that is not JSON: {}",
                    context.source_name,
                    e
                );
                return Vec::new();
            }
        };

        let fields = match context.media_type {
            MediaType::Gifs => self.gif_fields.as_ref().unwrap_or(&self.fields),
            MediaType::Videos => &self.fields,
        };

        let Some(items) = document.pointer(&fields.items).and_then(Value::as_array) else {
            tracing::debug!(
                "No item array at '{}' in {} response",
                fields.items,
                context.source_name
            );
            return Vec::new();
        };

        items.iter().filter_map(|item| fields.extract(item)).collect()
    }

    fn request_headers(&self) -> &[(String, String)] {
        &self.headers
    }
}
