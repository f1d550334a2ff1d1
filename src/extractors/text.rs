use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::path::Path;
use tokio::fs;

use super::{is_web_url, Extraction, SourceExtractor, SourceKind, SourceMetadata};
use crate::chunking::word_count;
use crate::utils::extract_domain;
use crate::{Result, StreamError};

/// Title used when a page has no `<title>`
pub const UNTITLED: &str = "Untitled";

/// Web page and local text file extractor
pub struct TextExtractor {
    client: Client,
}

impl TextExtractor {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<(String, String)> {
        tracing::debug!("Fetching web page: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch {}: HTTP {}", url, response.status());
        }

        let html = response.text().await?;
        parse_page(&html)
    }

    /// Check that the path exists and is a regular file
    async fn read_file(&self, path: &Path) -> Result<(String, String)> {
        if !path.exists() {
            return Err(StreamError::UnsupportedLocator(format!(
                "File does not exist: {}",
                path.display()
            ))
            .into());
        }

        if !path.is_file() {
            return Err(StreamError::UnsupportedLocator(format!(
                "Path is not a file: {}",
                path.display()
            ))
            .into());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read file {}", path.display()))?;

        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Local File")
            .to_string();

        Ok((title, content))
    }
}

/// Extract the document title and all paragraph text, in document order.
///
/// Paragraphs are joined with single spaces.
pub fn parse_page(html: &str) -> Result<(String, String)> {
    let document = Html::parse_document(html);

    let title_selector = Selector::parse("title")
        .map_err(|e| anyhow::anyhow!("Invalid CSS selector: {:?}", e))?;
    let paragraph_selector =
        Selector::parse("p").map_err(|e| anyhow::anyhow!("Invalid CSS selector: {:?}", e))?;

    let title = document
        .select(&title_selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let content = document
        .select(&paragraph_selector)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");

    Ok((title, content))
}

#[async_trait]
impl SourceExtractor for TextExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Text
    }

    fn platform_name(&self) -> &'static str {
        "Web page or local file"
    }

    async fn extract(&self, locator: &str, _work_dir: &Path) -> Result<Extraction> {
        let is_url = is_web_url(locator);

        let (title, content) = if is_url {
            self.fetch_page(locator)
                .await
                .map_err(|e| StreamError::ExtractionFailure(format!("{:#}", e)))?
        } else {
            match self.read_file(Path::new(locator)).await {
                Ok(pair) => pair,
                Err(e) if e.downcast_ref::<StreamError>().is_some() => return Err(e),
                Err(e) => return Err(StreamError::ExtractionFailure(format!("{:#}", e)).into()),
            }
        };

        let origin = if is_url { "web" } else { "file" };
        let metadata = SourceMetadata::new()
            .with("title", title.as_str())
            .with("source", origin)
            .with("url", locator)
            .with("word_count", word_count(&content));

        Ok(Extraction {
            kind: SourceKind::Text,
            attribution: format!(
                "Source: {}",
                extract_domain(locator).unwrap_or_else(|| locator.to_string())
            ),
            title,
            metadata,
            audio: None,
            content: Some(content),
        })
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_title_and_paragraphs() {
        let html = r#"
            <html>
                <head><title> Example Article </title></head>
                <body>
                    <h1>Heading</h1>
                    <p>First paragraph.</p>
                    <div><p>Second <b>bold</b> paragraph.</p></div>
                </body>
            </html>
        "#;
        let (title, content) = parse_page(html).unwrap();
        assert_eq!(title, "Example Article");
        assert_eq!(content, "First paragraph. Second bold paragraph.");
    }

    #[test]
    fn test_parse_page_without_title() {
        let (title, content) = parse_page("<html><body><p>Only text</p></body></html>").unwrap();
        assert_eq!(title, UNTITLED);
        assert_eq!(content, "Only text");
    }

    #[tokio::test]
    async fn test_local_file_uses_stem_as_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meeting_notes.txt");
        std::fs::write(&path, "Hello world. Hello again.").unwrap();

        let extraction = TextExtractor::new()
            .extract(&path.to_string_lossy(), dir.path())
            .await
            .unwrap();

        assert_eq!(extraction.title, "meeting_notes");
        assert_eq!(extraction.content.as_deref(), Some("Hello world. Hello again."));
        assert!(extraction.audio.is_none());
        assert_eq!(extraction.metadata.get_str("source"), Some("file"));
    }

    #[tokio::test]
    async fn test_missing_file_is_unsupported_locator() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let err = TextExtractor::new()
            .extract(&missing.to_string_lossy(), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StreamError>(),
            Some(StreamError::UnsupportedLocator(_))
        ));
    }
}
