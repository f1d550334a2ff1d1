use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub mod spotify;
pub mod text;
pub mod youtube;

use crate::config::Config;
use crate::{Result, StreamError};

/// Substrings that mark a video-hosting locator
pub const VIDEO_MARKERS: &[&str] = &["youtube.com", "youtu.be"];

/// Substrings that mark an audio-platform locator
pub const AUDIO_MARKERS: &[&str] = &["spotify.com"];

/// The three kinds of source a locator can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Video,
    Audio,
    Text,
}

impl SourceKind {
    /// Classify a locator by substring match on known domain markers
    pub fn classify(locator: &str) -> Self {
        let lower = locator.to_lowercase();
        if VIDEO_MARKERS.iter().any(|m| lower.contains(m)) {
            SourceKind::Video
        } else if AUDIO_MARKERS.iter().any(|m| lower.contains(m)) {
            SourceKind::Audio
        } else {
            SourceKind::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Video => "video",
            SourceKind::Audio => "audio",
            SourceKind::Text => "text",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, source-specific metadata fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceMetadata(Map<String, Value>);

impl SourceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of a field, `None` if absent, null or not a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Human-readable rendering of any field, empty when absent
    pub fn display(&self, key: &str) -> String {
        match self.0.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
            Some(other) => other.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }
}

/// A locally materialized audio file owned by one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    pub path: PathBuf,
}

impl AudioAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Everything an extractor produces for one locator
#[derive(Debug, Clone)]
pub struct Extraction {
    pub kind: SourceKind,

    /// Resolved title, used for the report heading and file name
    pub title: String,

    /// Channel, artist or origin line shown under the title
    pub attribution: String,

    pub metadata: SourceMetadata,

    /// Downloaded audio, absent when the source has none
    pub audio: Option<AudioAsset>,

    /// Text body for text sources
    pub content: Option<String>,
}

/// Trait for extracting metadata, audio or text from one kind of source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceExtractor: Send + Sync {
    /// Which kind of locator this extractor handles
    fn kind(&self) -> SourceKind;

    /// Get the name of this platform
    fn platform_name(&self) -> &'static str;

    /// Extract metadata and, where applicable, audio into `work_dir`
    async fn extract(&self, locator: &str, work_dir: &Path) -> Result<Extraction>;
}

/// Routes each locator to exactly one extractor
pub struct Dispatcher {
    video: Box<dyn SourceExtractor>,
    audio: Box<dyn SourceExtractor>,
    text: Box<dyn SourceExtractor>,
}

impl Dispatcher {
    /// Create a dispatcher with the default extractors
    pub fn new(config: &Config) -> Self {
        Self::with_extractors(
            Box::new(youtube::YoutubeExtractor::from_config(config)),
            Box::new(spotify::SpotifyExtractor::from_config(config)),
            Box::new(text::TextExtractor::new()),
        )
    }

    /// Each extractor must report the kind of the slot it is placed in
    pub fn with_extractors(
        video: Box<dyn SourceExtractor>,
        audio: Box<dyn SourceExtractor>,
        text: Box<dyn SourceExtractor>,
    ) -> Self {
        debug_assert_eq!(video.kind(), SourceKind::Video, "video slot holds {}", video.platform_name());
        debug_assert_eq!(audio.kind(), SourceKind::Audio, "audio slot holds {}", audio.platform_name());
        debug_assert_eq!(text.kind(), SourceKind::Text, "text slot holds {}", text.platform_name());
        Self { video, audio, text }
    }

    /// Classify a locator, rejecting text locators that are neither URLs nor existing paths
    pub fn classify(&self, locator: &str) -> Result<SourceKind> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(StreamError::UnsupportedLocator("empty locator".to_string()).into());
        }

        let kind = SourceKind::classify(locator);
        if kind == SourceKind::Text && !is_web_url(locator) && !Path::new(locator).exists() {
            return Err(StreamError::UnsupportedLocator(format!(
                "{} is not a known platform URL, a web URL, or an existing file",
                locator
            ))
            .into());
        }

        Ok(kind)
    }

    /// Run the extractor selected for `locator`
    pub async fn extract(&self, locator: &str, work_dir: &Path) -> Result<Extraction> {
        let kind = self.classify(locator)?;
        let extractor = self.extractor_for(kind);
        tracing::info!("Dispatching {} locator to {}", kind, extractor.platform_name());
        extractor.extract(locator.trim(), work_dir).await
    }

    pub fn extractor_for(&self, kind: SourceKind) -> &dyn SourceExtractor {
        match kind {
            SourceKind::Video => self.video.as_ref(),
            SourceKind::Audio => self.audio.as_ref(),
            SourceKind::Text => self.text.as_ref(),
        }
    }

    /// List all supported platforms
    pub fn list_platforms(&self) -> Vec<&'static str> {
        vec![
            self.video.platform_name(),
            self.audio.platform_name(),
            self.text.platform_name(),
        ]
    }
}

/// True for locators with an http(s) scheme prefix
pub fn is_web_url(locator: &str) -> bool {
    let lower = locator.trim_start().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
