//! Driver catalogue: the explicit list of sources registered at startup.
//!
//! The catalogue is a JSON document:
//!
//! ```json
//! {
//!   "drivers": [
//!     {
//!       "kind": "html",
//!       "name": "Example Tube",
//!       "base_url": "https://tube.example.com",
//!       "first_page": 1,
//!       "search_urls": { "videos": "https://tube.example.com/search?q={query}&page={page}" },
//!       "selectors": { "item": "div.video", "link": "a", "id_attribute": "data-id" }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    DriverDescriptor, HtmlDriver, HtmlSelectors, JsonDriver, JsonFields, SearchUrlTemplate,
    SearchUrls, SourceDriver,
};
use crate::errors::MediaSearchError;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct CatalogFile {
    drivers: Vec<DriverSpec>,
}

/// Fields shared by every catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceSpec {
    pub name: String,
    pub base_url: String,
    #[serde(default = "default_first_page")]
    pub first_page: u32,
    #[serde(default)]
    pub search_urls: SearchUrlSpec,
    /// Extra request headers, e.g. a referer the site insists on
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_first_page() -> u32 {
    1
}

/// URL templates per media type as written in the catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchUrlSpec {
    #[serde(default)]
    pub videos: Option<String>,
    #[serde(default)]
    pub gifs: Option<String>,
}

/// One catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DriverSpec {
    Html {
        #[serde(flatten)]
        source: SourceSpec,
        selectors: HtmlSelectors,
        #[serde(default)]
        gif_selectors: Option<HtmlSelectors>,
    },
    Json {
        #[serde(flatten)]
        source: SourceSpec,
        fields: JsonFields,
        #[serde(default)]
        gif_fields: Option<JsonFields>,
    },
}

impl DriverSpec {
    pub fn source(&self) -> &SourceSpec {
        match self {
            Self::Html { source, .. } | Self::Json { source, .. } => source,
        }
    }

    /// Instantiates the driver described by this entry.
    ///
    /// # Errors
    /// - `MediaSearchError::InvalidDriver` - Bad base URL, template or selector
    pub fn build(&self) -> Result<Arc<dyn SourceDriver>, MediaSearchError> {
        let source = self.source();
        let descriptor = DriverDescriptor::new(&source.name, &source.base_url)?
            .with_first_page(source.first_page);
        let urls = source.search_urls.compile(&source.name)?;
        let headers: Vec<(String, String)> = source
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if urls.videos.is_none() && urls.gifs.is_none() {
            return Err(MediaSearchError::InvalidDriver {
                name: source.name.clone(),
                reason: "no search URL configured for any media type".to_string(),
            });
        }

        let driver: Arc<dyn SourceDriver> = match self {
            Self::Html {
                selectors,
                gif_selectors,
                ..
            } => Arc::new(
                HtmlDriver::new(descriptor, urls, selectors, gif_selectors.as_ref())?
                    .with_headers(headers),
            ),
            Self::Json {
                fields, gif_fields, ..
            } => Arc::new(
                JsonDriver::new(descriptor, urls, fields.clone(), gif_fields.clone())?
                    .with_headers(headers),
            ),
        };
        Ok(driver)
    }
}

impl SearchUrlSpec {
    fn compile(&self, driver: &str) -> Result<SearchUrls, MediaSearchError> {
        let template = |pattern: &Option<String>| {
            pattern
                .as_deref()
                .map(|p| SearchUrlTemplate::new(driver, p))
                .transpose()
        };
        Ok(SearchUrls {
            videos: template(&self.videos)?,
            gifs: template(&self.gifs)?,
        })
    }
}

/// Parses catalogue JSON into ready-to-register drivers, in file order.
///
/// # Errors
/// - `MediaSearchError::CatalogError` - The document is not a valid catalogue
/// - `MediaSearchError::InvalidDriver` - An entry cannot be instantiated
pub fn parse_catalog(json: &str) -> Result<Vec<Arc<dyn SourceDriver>>, MediaSearchError> {
    let catalog: CatalogFile =
        serde_json::from_str(json).map_err(|e| MediaSearchError::CatalogError {
            reason: format!("invalid catalogue JSON: {e}"),
        })?;

    catalog.drivers.iter().map(DriverSpec::build).collect()
}

/// Reads and parses a catalogue file.
///
/// # Errors
/// - `MediaSearchError::CatalogError` - The file cannot be read or decoded
/// - `MediaSearchError::InvalidDriver` - An entry cannot be instantiated
pub async fn load_catalog(path: &Path) -> Result<Vec<Arc<dyn SourceDriver>>, MediaSearchError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MediaSearchError::CatalogError {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;

    let drivers = parse_catalog(&json)?;
    tracing::info!(
        "Loaded {} drivers from {}",
        drivers.len(),
        path.display()
    );
    Ok(drivers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaType;

    const CATALOG: &str = r#"{
        "drivers": [
            {
                "kind": "html",
                "name": "Example Tube",
                "base_url": "https://tube.example.com",
                "search_urls": {"videos": "https://tube.example.com/search?q={query}&page={page}"},
                "headers": {"Referer": "https://tube.example.com/"},
                "selectors": {"item": "div.video", "link": "a", "id_attribute": "data-id"}
            },
            {
                "kind": "json",
                "name": "sex.com",
                "base_url": "https://api.example.org",
                "first_page": 0,
                "search_urls": {
                    "videos": "https://api.example.org/videos?q={query}&p={page}",
                    "gifs": "https://api.example.org/gifs?q={query}&p={page}"
                },
                "fields": {"items": "/items", "id": "/id", "title": "/title", "url": "/url"}
            }
        ]
    }"#;

    #[test]
    fn test_parse_catalog_builds_drivers_in_order() {
        let drivers = parse_catalog(CATALOG).unwrap();

        assert_eq!(drivers.len(), 2);
        assert_eq!(drivers[0].name(), "Example Tube");
        assert!(drivers[0].supports(MediaType::Videos));
        assert!(!drivers[0].supports(MediaType::Gifs));
        assert_eq!(drivers[0].request_headers().len(), 1);

        assert_eq!(drivers[1].name(), "sex.com");
        assert_eq!(drivers[1].descriptor().first_page, 0);
        assert!(drivers[1].supports(MediaType::Gifs));
    }

    #[test]
    fn test_entry_without_urls_is_rejected() {
        let json = r#"{"drivers": [{
            "kind": "html", "name": "Nowhere", "base_url": "https://nowhere.example.com",
            "selectors": {"item": "li"}
        }]}"#;
        assert!(matches!(
            parse_catalog(json),
            Err(MediaSearchError::InvalidDriver { .. })
        ));
    }

    #[test]
    fn test_malformed_catalogue() {
        assert!(matches!(
            parse_catalog("{\"drivers\": 3}"),
            Err(MediaSearchError::CatalogError { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drivers.json");
        tokio::fs::write(&path, CATALOG).await.unwrap();

        let drivers = load_catalog(&path).await.unwrap();
        assert_eq!(drivers.len(), 2);

        let missing = load_catalog(&dir.path().join("absent.json")).await;
        assert!(matches!(missing, Err(MediaSearchError::CatalogError { .. })));
    }
}
