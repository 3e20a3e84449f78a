//! Source driver abstraction and the generic driver implementations.

use url::Url;

use crate::errors::MediaSearchError;
use crate::types::{MediaType, ParseContext, RawContent, RawRecord};

pub mod catalog;
pub mod html;
pub mod json;

pub use catalog::{DriverSpec, load_catalog, parse_catalog};
pub use html::{HtmlDriver, HtmlSelectors};
pub use json::{JsonDriver, JsonFields};

/// Trait for one external content source.
///
/// Drivers are pure: they build URLs and parse bodies, while retrieval is
/// delegated to a [`FetchAdapter`](crate::fetch::FetchAdapter) so live and
/// mock searches run the exact same driver code.
pub trait SourceDriver: Send + Sync + std::fmt::Debug {
    /// Static description of the source.
    fn descriptor(&self) -> &DriverDescriptor;

    /// Build the search URL for a 1-based `page`.
    ///
    /// # Errors
    /// - `MediaSearchError::EmptyQuery` - The query is blank
    /// - `MediaSearchError::UnsupportedMediaType` - The source lacks this type
    fn build_search_url(
        &self,
        query: &str,
        page: u32,
        media_type: MediaType,
    ) -> Result<String, MediaSearchError>;

    /// Turn a fetched body into raw records, in document order.
    ///
    /// Must not fail on malformed input; returns an empty list when nothing
    /// can be located.
    fn parse(&self, raw: &RawContent, context: &ParseContext<'_>) -> Vec<RawRecord>;

    /// Extra request headers the source expects (referer, cookies).
    fn request_headers(&self) -> &[(String, String)] {
        &[]
    }

    /// Display name of the source.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Whether the source serves `media_type` at all.
    fn supports(&self, media_type: MediaType) -> bool {
        self.descriptor().supports(media_type)
    }
}

/// Registration data shared by every driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverDescriptor {
    /// Display name, also the case-insensitive lookup key
    pub name: String,
    /// Base for resolving relative links found in parsed pages
    pub base_url: Url,
    pub supports_videos: bool,
    pub supports_gifs: bool,
    /// Page index the site uses for the first page (usually 0 or 1)
    pub first_page: u32,
}

impl DriverDescriptor {
    /// Descriptor supporting both media types with 1-indexed pagination.
    ///
    /// # Errors
    /// - `MediaSearchError::InvalidDriver` - Blank name or unparsable base URL
    pub fn new(name: &str, base_url: &str) -> Result<Self, MediaSearchError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MediaSearchError::InvalidDriver {
                name: name.to_string(),
                reason: "driver name must not be empty".to_string(),
            });
        }
        let base_url = Url::parse(base_url).map_err(|e| MediaSearchError::InvalidDriver {
            name: name.to_string(),
            reason: format!("invalid base URL '{base_url}': {e}"),
        })?;

        Ok(Self {
            name: name.to_string(),
            base_url,
            supports_videos: true,
            supports_gifs: true,
            first_page: 1,
        })
    }

    pub fn with_media(mut self, supports_videos: bool, supports_gifs: bool) -> Self {
        self.supports_videos = supports_videos;
        self.supports_gifs = supports_gifs;
        self
    }

    pub fn with_first_page(mut self, first_page: u32) -> Self {
        self.first_page = first_page;
        self
    }

    pub fn supports(&self, media_type: MediaType) -> bool {
        match media_type {
            MediaType::Videos => self.supports_videos,
            MediaType::Gifs => self.supports_gifs,
        }
    }

    /// Translates a 1-based API page into the site's own page index.
    pub fn site_page(&self, page: u32) -> u32 {
        self.first_page.saturating_add(page.max(1) - 1)
    }

    /// Shared precondition check for `build_search_url` implementations.
    ///
    /// # Errors
    /// - `MediaSearchError::EmptyQuery` - The query is blank
    /// - `MediaSearchError::UnsupportedMediaType` - The source lacks this type
    pub fn check_search(&self, query: &str, media_type: MediaType) -> Result<(), MediaSearchError> {
        if query.trim().is_empty() {
            return Err(MediaSearchError::EmptyQuery);
        }
        if !self.supports(media_type) {
            return Err(MediaSearchError::UnsupportedMediaType {
                source_name: self.name.clone(),
                media_type: media_type.to_string(),
            });
        }
        Ok(())
    }
}

/// Search URL pattern with `{query}` and `{page}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchUrlTemplate {
    pattern: String,
}

impl SearchUrlTemplate {
    /// Validates that the pattern contains a `{query}` placeholder.
    ///
    /// # Errors
    /// - `MediaSearchError::InvalidDriver` - Missing placeholder
    pub fn new(driver: &str, pattern: &str) -> Result<Self, MediaSearchError> {
        if !pattern.contains("{query}") {
            return Err(MediaSearchError::InvalidDriver {
                name: driver.to_string(),
                reason: format!("search URL '{pattern}' has no {{query}} placeholder"),
            });
        }
        Ok(Self {
            pattern: pattern.to_string(),
        })
    }

    /// Substitutes the percent-encoded query and the site page number.
    pub fn render(&self, query: &str, site_page: u32) -> String {
        self.pattern
            .replace("{query}", &urlencoding::encode(query.trim()))
            .replace("{page}", &site_page.to_string())
    }
}

/// Search URL templates keyed by media type; a missing template means the
/// source does not serve that type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchUrls {
    pub videos: Option<SearchUrlTemplate>,
    pub gifs: Option<SearchUrlTemplate>,
}

impl SearchUrls {
    pub fn get(&self, media_type: MediaType) -> Option<&SearchUrlTemplate> {
        match media_type {
            MediaType::Videos => self.videos.as_ref(),
            MediaType::Gifs => self.gifs.as_ref(),
        }
    }

    /// Renders the URL for a search after the descriptor's precondition check.
    ///
    /// # Errors
    /// - `MediaSearchError::EmptyQuery` - The query is blank
    /// - `MediaSearchError::UnsupportedMediaType` - No template for the type
    pub fn build(
        &self,
        descriptor: &DriverDescriptor,
        query: &str,
        page: u32,
        media_type: MediaType,
    ) -> Result<String, MediaSearchError> {
        descriptor.check_search(query, media_type)?;
        let template =
            self.get(media_type)
                .ok_or_else(|| MediaSearchError::UnsupportedMediaType {
                    source_name: descriptor.name.clone(),
                    media_type: media_type.to_string(),
                })?;
        Ok(template.render(query, descriptor.site_page(page)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_page_respects_first_page() {
        let zero_based = DriverDescriptor::new("Zero", "https://zero.example.com")
            .unwrap()
            .with_first_page(0);
        let one_based = DriverDescriptor::new("One", "https://one.example.com").unwrap();

        assert_eq!(zero_based.site_page(1), 0);
        assert_eq!(zero_based.site_page(3), 2);
        assert_eq!(one_based.site_page(1), 1);
        assert_eq!(one_based.site_page(0), 1);
    }

    #[test]
    fn test_descriptor_rejects_bad_input() {
        assert!(DriverDescriptor::new("  ", "https://x.example.com").is_err());
        assert!(DriverDescriptor::new("Broken", "not a url").is_err());
    }

    #[test]
    fn test_template_encodes_query() {
        let template =
            SearchUrlTemplate::new("Example", "https://example.com/s?q={query}&p={page}").unwrap();
        assert_eq!(
            template.render(" red panda ", 2),
            "https://example.com/s?q=red%20panda&p=2"
        );
        assert!(SearchUrlTemplate::new("Example", "https://example.com/latest").is_err());
    }

    #[test]
    fn test_search_urls_check_support() {
        let descriptor = DriverDescriptor::new("Example", "https://example.com")
            .unwrap()
            .with_media(true, false)
            .with_first_page(0);
        let urls = SearchUrls {
            videos: Some(
                SearchUrlTemplate::new("Example", "https://example.com/{query}/{page}").unwrap(),
            ),
            gifs: None,
        };

        assert_eq!(
            urls.build(&descriptor, "cats", 2, MediaType::Videos).unwrap(),
            "https://example.com/cats/1"
        );
        assert!(matches!(
            urls.build(&descriptor, "cats", 1, MediaType::Gifs),
            Err(MediaSearchError::UnsupportedMediaType { .. })
        ));
        assert!(matches!(
            urls.build(&descriptor, "   ", 1, MediaType::Videos),
            Err(MediaSearchError::EmptyQuery)
        ));
    }
}
