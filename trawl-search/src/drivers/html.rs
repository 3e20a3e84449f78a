//! Selector-driven HTML driver.
//!
//! One implementation serves every HTML source: the per-site knowledge lives
//! in the CSS selectors of its catalogue entry.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use super::{DriverDescriptor, SearchUrls, SourceDriver};
use crate::errors::MediaSearchError;
use crate::types::{ContentKind, MediaType, ParseContext, RawContent, RawRecord};

/// CSS selectors locating result items and their fields.
///
/// Every field selector is evaluated relative to the matched item element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlSelectors {
    /// Selector matching one element per result
    pub item: String,
    /// Anchor carrying the item page link; the item itself when absent
    #[serde(default)]
    pub link: Option<String>,
    /// Element holding the title text (or `title` attribute)
    #[serde(default)]
    pub title: Option<String>,
    /// Attribute on the item (or link) holding the source-local id
    #[serde(default)]
    pub id_attribute: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Attributes tried in order on the thumbnail element (lazy-loaded first)
    #[serde(default = "default_thumbnail_attributes")]
    pub thumbnail_attributes: Vec<String>,
    #[serde(default)]
    pub preview: Option<String>,
    /// Attributes tried in order on the preview element
    #[serde(default = "default_preview_attributes")]
    pub preview_attributes: Vec<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

fn default_thumbnail_attributes() -> Vec<String> {
    ["data-src", "data-original", "data-thumb", "src"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_preview_attributes() -> Vec<String> {
    ["data-preview", "data-mediabook", "data-webm", "data-mp4", "src"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl HtmlSelectors {
    /// Selectors with only the item selector set and default attribute lists.
    pub fn new(item: &str) -> Self {
        Self {
            item: item.to_string(),
            link: None,
            title: None,
            id_attribute: None,
            thumbnail: None,
            thumbnail_attributes: default_thumbnail_attributes(),
            preview: None,
            preview_attributes: default_preview_attributes(),
            duration: None,
        }
    }
}

#[derive(Debug)]
struct CompiledSelectors {
    item: Selector,
    link: Option<Selector>,
    title: Option<Selector>,
    id_attribute: Option<String>,
    thumbnail: Option<Selector>,
    thumbnail_attributes: Vec<String>,
    preview: Option<Selector>,
    preview_attributes: Vec<String>,
    duration: Option<Selector>,
}

impl CompiledSelectors {
    fn compile(driver: &str, spec: &HtmlSelectors) -> Result<Self, MediaSearchError> {
        let optional = |css: &Option<String>| -> Result<Option<Selector>, MediaSearchError> {
            css.as_deref()
                .map(|css| compile_selector(driver, css))
                .transpose()
        };

        Ok(Self {
            item: compile_selector(driver, &spec.item)?,
            link: optional(&spec.link)?,
            title: optional(&spec.title)?,
            id_attribute: spec.id_attribute.clone(),
            thumbnail: optional(&spec.thumbnail)?,
            thumbnail_attributes: spec.thumbnail_attributes.clone(),
            preview: optional(&spec.preview)?,
            preview_attributes: spec.preview_attributes.clone(),
            duration: optional(&spec.duration)?,
        })
    }

    fn extract(&self, item: ElementRef<'_>) -> Option<RawRecord> {
        let link = match &self.link {
            Some(selector) => item.select(selector).next(),
            None => Some(item),
        };

        let url = link.and_then(|el| attribute(el, "href"));

        let title = match &self.title {
            Some(selector) => item
                .select(selector)
                .next()
                .and_then(|el| attribute(el, "title").or_else(|| element_text(el))),
            None => link.and_then(|el| attribute(el, "title").or_else(|| element_text(el))),
        };

        let id = self.id_attribute.as_deref().and_then(|name| {
            attribute(item, name).or_else(|| link.and_then(|el| attribute(el, name)))
        });

        let thumbnail = self
            .thumbnail
            .as_ref()
            .and_then(|selector| item.select(selector).next())
            .and_then(|el| first_attribute(el, &self.thumbnail_attributes));

        let preview_video = self
            .preview
            .as_ref()
            .and_then(|selector| item.select(selector).next())
            .and_then(|el| first_attribute(el, &self.preview_attributes));

        let duration = self
            .duration
            .as_ref()
            .and_then(|selector| item.select(selector).next())
            .and_then(element_text);

        let record = RawRecord {
            id,
            title,
            url,
            thumbnail,
            preview_video,
            duration,
            source: None,
            media_type: None,
        };

        (record != RawRecord::default()).then_some(record)
    }
}

fn compile_selector(driver: &str, css: &str) -> Result<Selector, MediaSearchError> {
    Selector::parse(css).map_err(|e| MediaSearchError::InvalidDriver {
        name: driver.to_string(),
        reason: format!("invalid CSS selector '{css}': {e:?}"),
    })
}

fn attribute(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn first_attribute(element: ElementRef<'_>, names: &[String]) -> Option<String> {
    names.iter().find_map(|name| attribute(element, name))
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Driver for sources that answer searches with an HTML results page.
#[derive(Debug)]
pub struct HtmlDriver {
    descriptor: DriverDescriptor,
    urls: SearchUrls,
    selectors: CompiledSelectors,
    gif_selectors: Option<CompiledSelectors>,
    headers: Vec<(String, String)>,
}

impl HtmlDriver {
    /// Creates a driver; media support follows which URL templates exist.
    ///
    /// # Errors
    /// - `MediaSearchError::InvalidDriver` - A selector does not parse
    pub fn new(
        descriptor: DriverDescriptor,
        urls: SearchUrls,
        selectors: &HtmlSelectors,
        gif_selectors: Option<&HtmlSelectors>,
    ) -> Result<Self, MediaSearchError> {
        let name = descriptor.name.clone();
        let descriptor = descriptor.with_media(urls.videos.is_some(), urls.gifs.is_some());

        Ok(Self {
            descriptor,
            urls,
            selectors: CompiledSelectors::compile(&name, selectors)?,
            gif_selectors: gif_selectors
                .map(|spec| CompiledSelectors::compile(&name, spec))
                .transpose()?,
            headers: Vec::new(),
        })
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    fn selectors_for(&self, media_type: MediaType) -> &CompiledSelectors {
        match media_type {
            MediaType::Gifs => self.gif_selectors.as_ref().unwrap_or(&self.selectors),
            MediaType::Videos => &self.selectors,
        }
    }
}

impl SourceDriver for HtmlDriver {
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
        if raw.kind == ContentKind::Json {
            tracing::debug!(
                "{} returned JSON where HTML was expected, ignoring body",
                context.source_name
            );
            return Vec::new();
        }

        let selectors = self.selectors_for(context.media_type);
        let document = Html::parse_document(&raw.body);
        let records: Vec<RawRecord> = document
            .select(&selectors.item)
            .filter_map(|item| selectors.extract(item))
            .collect();

        if records.is_empty() {
            tracing::debug!(
                "No {} items found on {} page {} for '{}'",
                context.media_type,
                context.source_name,
                context.page,
                context.query
            );
        }

        records
    }

    fn request_headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::SearchUrlTemplate;

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <ul class="results">
            <li class="item" data-id="101">
              <a class="title" href="/watch/101" title="First   clip">First clip</a>
              <img class="thumb" data-src="//cdn.example.com/101.jpg" src="/img/placeholder.gif">
              <video class="preview" data-preview="https://cdn.example.com/101.webm"></video>
              <span class="duration"> 12:34 </span>
            </li>
            <li class="item" data-id="102">
              <a class="title" href="https://example.com/watch/102">Second clip</a>
            </li>
            <li class="item"></li>
          </ul>
        </body></html>
    "#;

    fn driver() -> HtmlDriver {
        let descriptor = DriverDescriptor::new("Example", "https://example.com").unwrap();
        let urls = SearchUrls {
            videos: Some(
                SearchUrlTemplate::new("Example", "https://example.com/search?q={query}&page={page}")
                    .unwrap(),
            ),
            gifs: None,
        };
        let selectors = HtmlSelectors {
            link: Some("a.title".to_string()),
            title: Some("a.title".to_string()),
            id_attribute: Some("data-id".to_string()),
            thumbnail: Some("img.thumb".to_string()),
            preview: Some("video.preview".to_string()),
            duration: Some("span.duration".to_string()),
            ..HtmlSelectors::new("li.item")
        };
        HtmlDriver::new(descriptor, urls, &selectors, None).unwrap()
    }

    fn context() -> ParseContext<'static> {
        ParseContext {
            media_type: MediaType::Videos,
            source_name: "Example",
            query: "clip",
            page: 1,
        }
    }

    #[test]
    fn test_parse_extracts_items_in_document_order() {
        let records = driver().parse(&RawContent::html(RESULTS_PAGE), &context());

        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.id.as_deref(), Some("101"));
        assert_eq!(first.title.as_deref(), Some("First   clip"));
        assert_eq!(first.url.as_deref(), Some("/watch/101"));
        assert_eq!(first.thumbnail.as_deref(), Some("//cdn.example.com/101.jpg"));
        assert_eq!(
            first.preview_video.as_deref(),
            Some("https://cdn.example.com/101.webm")
        );
        assert_eq!(first.duration.as_deref(), Some("12:34"));

        let second = &records[1];
        assert_eq!(second.id.as_deref(), Some("102"));
        assert_eq!(second.title.as_deref(), Some("Second clip"));
        assert!(second.thumbnail.is_none());
    }

    #[test]
    fn test_parse_tolerates_garbage() {
        let driver = driver();
        assert!(driver.parse(&RawContent::html("<<<not html"), &context()).is_empty());
        assert!(driver.parse(&RawContent::json("{\"a\":1}"), &context()).is_empty());
    }

    #[test]
    fn test_media_support_follows_templates() {
        let driver = driver();
        assert!(driver.supports(MediaType::Videos));
        assert!(!driver.supports(MediaType::Gifs));
        assert_eq!(
            driver
                .build_search_url("two words", 3, MediaType::Videos)
                .unwrap(),
            "https://example.com/search?q=two%20words&page=3"
        );
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let descriptor = DriverDescriptor::new("Broken", "https://example.com").unwrap();
        let result = HtmlDriver::new(
            descriptor,
            SearchUrls::default(),
            &HtmlSelectors::new("li[[["),
            None,
        );
        assert!(matches!(result, Err(MediaSearchError::InvalidDriver { .. })));
    }
}
