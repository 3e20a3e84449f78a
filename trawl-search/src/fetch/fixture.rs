//! Mock-mode retrieval from recorded fixture files.
//!
//! Layout: `<root>/<source-slug>/<media_type>_page<N>.{json,html}` where the
//! slug is the lowercase, dotless driver name (`sex.com` -> `sexcom`). The
//! extension decides the content kind; JSON wins when both exist.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{FetchAdapter, FetchError, FetchRequest};
use crate::registry::source_slug;
use crate::types::{ContentKind, MediaType, RawContent};

/// Fetch adapter substituting fixture files for network I/O.
#[derive(Debug, Clone)]
pub struct FixtureFetcher {
    root: PathBuf,
}

impl FixtureFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the fixtures of one source.
    pub fn source_dir(&self, source: &str) -> PathBuf {
        self.root.join(source_slug(source))
    }

    /// Candidate fixture paths for a key, in lookup order.
    pub fn candidates(
        &self,
        source: &str,
        media_type: MediaType,
        page: u32,
    ) -> [(PathBuf, ContentKind); 2] {
        let dir = self.source_dir(source);
        let stem = format!("{}_page{}", media_type.as_str(), page.max(1));
        [
            (dir.join(format!("{stem}.json")), ContentKind::Json),
            (dir.join(format!("{stem}.html")), ContentKind::Html),
        ]
    }
}

#[async_trait]
impl FetchAdapter for FixtureFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawContent, FetchError> {
        for (path, kind) in self.candidates(&request.source, request.media_type, request.page) {
            match tokio::fs::read_to_string(&path).await {
                Ok(body) => {
                    tracing::debug!("Serving fixture {}", path.display());
                    return Ok(RawContent { body, kind });
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(FetchError::FixtureIo {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(FetchError::FixtureMissing {
            source_name: request.source.clone(),
            media_type: request.media_type,
            page: request.page,
            dir: self.source_dir(&request.source),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn request(source: &str, media_type: MediaType, page: u32) -> FetchRequest {
        FetchRequest {
            url: "https://unused.example.com".to_string(),
            source: source.to_string(),
            media_type,
            page,
            timeout: Duration::from_secs(1),
            headers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_reads_fixture_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("sexcom");
        std::fs::create_dir_all(&source_dir).unwrap();
        std::fs::write(source_dir.join("gifs_page2.json"), "{\"items\": []}").unwrap();
        std::fs::write(source_dir.join("videos_page1.html"), "<ul></ul>").unwrap();

        let fetcher = FixtureFetcher::new(dir.path());

        let gifs = fetcher
            .fetch(&request("Sex.com", MediaType::Gifs, 2))
            .await
            .unwrap();
        assert_eq!(gifs.kind, ContentKind::Json);

        let videos = fetcher
            .fetch(&request("sex.com", MediaType::Videos, 1))
            .await
            .unwrap();
        assert_eq!(videos.kind, ContentKind::Html);
        assert_eq!(videos.body, "<ul></ul>");
    }

    #[tokio::test]
    async fn test_missing_fixture_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FixtureFetcher::new(dir.path());

        let error = fetcher
            .fetch(&request("Absent", MediaType::Videos, 1))
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::FixtureMissing { page: 1, .. }));
        assert!(!error.is_retryable());
    }
}
