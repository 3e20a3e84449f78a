//! Search request parsing and normalization.
//!
//! Callers hand over loosely typed parameters (HTTP query strings, CLI flags);
//! everything is coerced here so the aggregator only sees valid values.

use serde::Deserialize;

use crate::types::MediaType;

/// Raw, untrusted search parameters as they arrive from a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

/// Validated search request handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Query exactly as supplied; blank queries are rejected by the service.
    pub query: String,
    pub media_type: MediaType,
    /// 1-based page number, never zero.
    pub page: u32,
    /// Single-source filter; `None` searches every registered source.
    pub source: Option<String>,
}

impl SearchRequest {
    /// Request for the first page of videos across all sources.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            media_type: MediaType::default(),
            page: 1,
            source: None,
        }
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    /// Sets the page, clamping anything below 1 to 1.
    pub fn with_page(mut self, page: i64) -> Self {
        self.page = normalize_page(page);
        self
    }

    /// Restricts the search to one source. Blank or `"all"` clears the filter.
    pub fn with_source(mut self, source: Option<&str>) -> Self {
        self.source = source_filter(source);
        self
    }

    /// Coerces raw client parameters into a request.
    ///
    /// `source` takes precedence over its `driver` alias. Invalid types and
    /// pages fall back to their defaults with a warning instead of failing.
    pub fn from_params(params: &SearchParams) -> Self {
        let source = params.source.as_deref().or(params.driver.as_deref());
        Self {
            query: params.query.clone().unwrap_or_default(),
            media_type: MediaType::parse_or_default(params.media_type.as_deref()),
            page: parse_page(params.page.as_deref()),
            source: source_filter(source),
        }
    }

    /// Whether the query has any non-whitespace content.
    pub fn has_query(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// Human-readable label of the source filter.
    pub fn source_label(&self) -> &str {
        self.source.as_deref().unwrap_or("all")
    }
}

/// Clamps a page number to the valid 1-based range.
pub fn normalize_page(page: i64) -> u32 {
    if page < 1 {
        tracing::warn!("Invalid page {}, using page 1", page);
        return 1;
    }
    u32::try_from(page).unwrap_or(u32::MAX)
}

/// Parses a textual page number; missing input means page 1.
pub fn parse_page(raw: Option<&str>) -> u32 {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        None => 1,
        Some(text) => match text.parse::<i64>() {
            Ok(page) => normalize_page(page),
            Err(_) => {
                tracing::warn!("Unparsable page '{}', using page 1", text);
                1
            }
        },
    }
}

fn source_filter(source: Option<&str>) -> Option<String> {
    source
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> SearchParams {
        let mut params = SearchParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "query" => params.query = value,
                "source" => params.source = value,
                "driver" => params.driver = value,
                "type" => params.media_type = value,
                "page" => params.page = value,
                _ => {}
            }
        }
        params
    }

    #[test]
    fn test_invalid_pages_clamp_to_one() {
        assert_eq!(normalize_page(0), 1);
        assert_eq!(normalize_page(-5), 1);
        assert_eq!(normalize_page(3), 3);
        assert_eq!(parse_page(Some("-5")), 1);
        assert_eq!(parse_page(Some("two")), 1);
        assert_eq!(parse_page(Some(" 4 ")), 4);
        assert_eq!(parse_page(None), 1);
    }

    #[test]
    fn test_from_params_defaults() {
        let request = SearchRequest::from_params(&params(&[("query", "cats")]));

        assert_eq!(request.query, "cats");
        assert_eq!(request.media_type, MediaType::Videos);
        assert_eq!(request.page, 1);
        assert_eq!(request.source, None);
        assert_eq!(request.source_label(), "all");
    }

    #[test]
    fn test_source_wins_over_driver_alias() {
        let request = SearchRequest::from_params(&params(&[
            ("query", "cats"),
            ("driver", "Other"),
            ("source", "Sex.com"),
            ("type", "gifs"),
            ("page", "0"),
        ]));

        assert_eq!(request.source.as_deref(), Some("Sex.com"));
        assert_eq!(request.media_type, MediaType::Gifs);
        assert_eq!(request.page, 1);
    }

    #[test]
    fn test_all_means_no_filter() {
        let request = SearchRequest::new("cats").with_source(Some("ALL"));
        assert!(request.source.is_none());

        let request = SearchRequest::from_params(&params(&[("driver", "sexcom")]));
        assert_eq!(request.source.as_deref(), Some("sexcom"));
        assert!(!request.has_query());
    }
}
