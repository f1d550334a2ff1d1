use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::extractors::{SourceKind, SourceMetadata};

/// Longest report file stem, in bytes
pub const MAX_STEM_BYTES: usize = 200;

/// Final Markdown document for one run
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub attribution: String,
    pub kind: SourceKind,
    pub summary: String,

    /// Chat-model overview, video sources only
    pub rich_summary: Option<String>,

    /// Summary with synonym annotations
    pub enriched: Option<String>,

    /// Transcript or text body as extracted
    pub original: String,

    pub translated: String,
    pub metadata: SourceMetadata,
}

impl Report {
    fn body_label(&self) -> &'static str {
        match self.kind {
            SourceKind::Text => "Content",
            SourceKind::Video | SourceKind::Audio => "Transcript",
        }
    }

    /// Render the report as Markdown
    pub fn to_markdown(&self) -> Result<String> {
        let label = self.body_label();
        let mut metadata = self.metadata.clone();
        metadata.insert("processing_date", chrono::Utc::now().to_rfc3339());

        let mut md = String::new();
        writeln!(md, "# {}\n", self.title)?;
        writeln!(md, "**{}**\n", self.attribution)?;

        writeln!(md, "## Summary\n")?;
        writeln!(md, "{}\n", self.summary)?;

        if let Some(overview) = &self.rich_summary {
            writeln!(md, "## Overview\n")?;
            writeln!(md, "{}\n", overview)?;
        }

        if let Some(enriched) = &self.enriched {
            writeln!(md, "## Enriched Summary\n")?;
            writeln!(md, "{}\n", enriched)?;
        }

        writeln!(md, "## Original {}\n", label)?;
        writeln!(md, "{}\n", self.original)?;

        writeln!(md, "## Translated {}\n", label)?;
        writeln!(md, "{}\n", self.translated)?;

        writeln!(md, "## Metadata\n")?;
        writeln!(md, "```json\n{}\n```", metadata.to_pretty_json()?)?;

        Ok(md)
    }

    /// File name derived from the title, spaces replaced with underscores.
    ///
    /// The stem is cut to [`MAX_STEM_BYTES`] on a character boundary so long
    /// multi-byte titles stay under the usual 255-byte name limit.
    pub fn file_name(&self) -> String {
        let sanitized = crate::utils::sanitize_filename(&self.title).replace(' ', "_");
        let stem = truncate_bytes(&sanitized, MAX_STEM_BYTES);
        if stem.is_empty() {
            "untitled.md".to_string()
        } else {
            format!("{}.md", stem)
        }
    }
}

fn truncate_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Write the report into `dir`, creating it if needed
pub async fn save_to_dir(report: &Report, dir: &Path) -> Result<PathBuf> {
    fs_err::create_dir_all(dir).context("Failed to create output directory")?;

    let path = dir.join(report.file_name());
    let content = report.to_markdown()?;

    fs_err::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(kind: SourceKind) -> Report {
        Report {
            title: "My Great Talk".to_string(),
            attribution: "Channel: Rustaceans".to_string(),
            kind,
            summary: "Short.".to_string(),
            rich_summary: None,
            enriched: None,
            original: "Original words.".to_string(),
            translated: "Palavras.".to_string(),
            metadata: SourceMetadata::new().with("title", "My Great Talk"),
        }
    }

    #[test]
    fn test_file_name_replaces_spaces() {
        assert_eq!(report(SourceKind::Video).file_name(), "My_Great_Talk.md");

        let mut odd = report(SourceKind::Text);
        odd.title = "a/b: c?".to_string();
        assert_eq!(odd.file_name(), "a_b__c_.md");

        odd.title = "   ".to_string();
        assert_eq!(odd.file_name(), "untitled.md");
    }

    #[test]
    fn test_file_name_bounded_for_long_multibyte_title() {
        let mut long = report(SourceKind::Video);
        long.title = "標題".repeat(50);

        let name = long.file_name();
        assert!(name.len() <= 255);
        assert!(name.ends_with(".md"));
        assert!(name.trim_end_matches(".md").len() <= MAX_STEM_BYTES);
        assert!(name.starts_with("標題標題"));
    }

    #[tokio::test]
    async fn test_save_long_title_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let (title, _) = crate::extractors::text::parse_page(&format!(
            "<html><head><title>{}</title></head><body><p>x</p></body></html>",
            "標題".repeat(50)
        ))
        .unwrap();

        let mut long = report(SourceKind::Text);
        long.title = title;
        let path = save_to_dir(&long, dir.path()).await.unwrap();

        assert!(path.is_file());
        assert!(std::fs::read_to_string(path).unwrap().contains("標題"));
    }

    #[test]
    fn test_truncate_bytes_respects_char_boundaries() {
        assert_eq!(truncate_bytes("short", 200), "short");
        // Each character is three bytes
        assert_eq!(truncate_bytes("標題標", 7), "標題");
        assert_eq!(truncate_bytes("標題標", 6), "標題");
    }

    #[test]
    fn test_markdown_sections_for_video() {
        let md = report(SourceKind::Video).to_markdown().unwrap();
        assert!(md.starts_with("# My Great Talk\n"));
        assert!(md.contains("**Channel: Rustaceans**"));
        assert!(md.contains("## Summary\n\nShort."));
        assert!(md.contains("## Original Transcript\n\nOriginal words."));
        assert!(md.contains("## Translated Transcript\n\nPalavras."));
        assert!(md.contains("```json\n{"));
        assert!(md.contains("\"processing_date\""));
        assert!(!md.contains("## Overview"));
    }

    #[test]
    fn test_markdown_sections_for_text() {
        let mut text = report(SourceKind::Text);
        text.enriched = Some("Short (synonym: brief).".to_string());
        text.rich_summary = Some("Overview body".to_string());
        let md = text.to_markdown().unwrap();
        assert!(md.contains("## Original Content"));
        assert!(md.contains("## Translated Content"));
        assert!(md.contains("## Enriched Summary\n\nShort (synonym: brief)."));
        assert!(md.contains("## Overview\n\nOverview body"));
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports").join("today");
        let path = save_to_dir(&report(SourceKind::Audio), &nested).await.unwrap();

        assert_eq!(path, nested.join("My_Great_Talk.md"));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("# My Great Talk"));
    }
}
