use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use uuid::Uuid;

use super::{AudioAsset, Extraction, SourceExtractor, SourceKind, SourceMetadata};
use crate::cache::{CachedFetch, DEFAULT_CAPACITY};
use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::{Result, StreamError};

/// YouTube extractor using yt-dlp for metadata and audio
pub struct YoutubeExtractor {
    yt_dlp_path: String,
    metadata: CachedFetch<SourceMetadata>,
}

impl YoutubeExtractor {
    pub fn new() -> Self {
        Self::with_options("yt-dlp", DEFAULT_CAPACITY, RetryPolicy::exponential(3))
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_options(
            &config.transcription.yt_dlp_path,
            config.cache.capacity,
            RetryPolicy::exponential(config.retry.max_attempts),
        )
    }

    pub fn with_options(yt_dlp_path: &str, cache_capacity: usize, policy: RetryPolicy) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.to_string(),
            metadata: CachedFetch::new(cache_capacity, policy),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Get video information, served from the cache after the first success
    pub async fn video_info(&self, url: &str) -> Result<SourceMetadata> {
        self.metadata
            .get_or_fetch(url, "video metadata fetch", || self.fetch_video_info(url))
            .await
    }

    async fn fetch_video_info(&self, url: &str) -> Result<SourceMetadata> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", "--skip-download", "--no-warnings", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let info: Value = serde_json::from_slice(&output.stdout)?;
        Ok(video_metadata(&info, url))
    }

    /// Download the best audio stream and convert it to wav.
    ///
    /// On failure any `audio_<id>.*` intermediates yt-dlp left behind are removed.
    pub async fn download_audio(&self, url: &str, work_dir: &Path) -> Result<PathBuf> {
        let stem_name = format!("audio_{}", &Uuid::new_v4().simple().to_string()[..8]);
        let stem = work_dir.join(&stem_name);
        let template = format!("{}.%(ext)s", stem.display());
        let target = stem.with_extension("wav");

        tracing::debug!("Downloading audio for {} to {}", url, target.display());

        match self.run_download(url, &template, &target).await {
            Ok(()) => Ok(target),
            Err(e) => {
                remove_partial_downloads(work_dir, &stem_name);
                Err(e)
            }
        }
    }

    async fn run_download(&self, url: &str, template: &str, target: &Path) -> Result<()> {
        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--output",
                template,
                "--format",
                "bestaudio/best",
                "--extract-audio",
                "--audio-format",
                "wav",
                "--no-playlist",
                "--quiet",
                "--no-warnings",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to download audio: {}", error.trim());
        }

        if !target.is_file() {
            anyhow::bail!("yt-dlp finished but {} was not created", target.display());
        }

        Ok(())
    }
}

/// Best-effort removal of every `<stem>.*` file in `dir`
fn remove_partial_downloads(dir: &Path, stem: &str) {
    let prefix = format!("{}.", stem);
    let entries = match fs_err::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot scan {} for partial downloads: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let matches = entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with(&prefix))
            .unwrap_or(false);
        if !matches {
            continue;
        }

        let path = entry.path();
        match fs_err::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed partial download {}", path.display()),
            Err(e) => tracing::warn!("{}", e),
        }
    }
}

/// Map yt-dlp's JSON dump onto report metadata
pub fn video_metadata(info: &Value, url: &str) -> SourceMetadata {
    let channel = info["uploader"]
        .as_str()
        .or_else(|| info["channel"].as_str())
        .unwrap_or("unknown_channel");

    let tags: Vec<Value> = info["tags"].as_array().cloned().unwrap_or_default();

    SourceMetadata::new()
        .with("title", info["title"].as_str().unwrap_or("unknown_title"))
        .with("channel", channel)
        .with("video_id", info["id"].as_str().unwrap_or("unknown_id"))
        .with("description", info["description"].as_str().unwrap_or(""))
        .with("view_count", info["view_count"].as_u64().unwrap_or(0))
        .with("like_count", info["like_count"].as_u64().unwrap_or(0))
        .with("duration", info["duration"].as_f64().map(|d| d as u64).unwrap_or(0))
        .with("upload_date", info["upload_date"].as_str().unwrap_or(""))
        .with("tags", tags)
        .with("url", url)
}

/// Metadata used when the lookup itself fails
fn placeholder_metadata(url: &str) -> SourceMetadata {
    video_metadata(&Value::Null, url)
}

#[async_trait]
impl SourceExtractor for YoutubeExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Video
    }

    fn platform_name(&self) -> &'static str {
        "YouTube"
    }

    async fn extract(&self, url: &str, work_dir: &Path) -> Result<Extraction> {
        if !self.check_availability().await {
            return Err(StreamError::ExtractionFailure(
                "yt-dlp is not available. Please install it: https://github.com/yt-dlp/yt-dlp"
                    .to_string(),
            )
            .into());
        }

        let audio = match self.download_audio(url, work_dir).await {
            Ok(path) => Some(AudioAsset::new(path)),
            Err(e) => {
                tracing::error!("Error downloading video audio: {:#}", e);
                None
            }
        };

        let metadata = match self.video_info(url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::error!("Error fetching video info: {:#}", e);
                placeholder_metadata(url)
            }
        };

        Ok(Extraction {
            kind: SourceKind::Video,
            title: metadata.display("title"),
            attribution: format!("Channel: {}", metadata.display("channel")),
            metadata,
            audio,
            content: None,
        })
    }
}

impl Default for YoutubeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_video_metadata_fields() {
        let info = json!({
            "title": "Test Video",
            "uploader": "Test Channel",
            "id": "test_id",
            "description": "Test description",
            "view_count": 1000,
            "like_count": 100,
            "duration": 300,
            "upload_date": "20230101",
            "tags": ["tag1", "tag2"],
        });
        let url = "https://www.youtube.com/watch?v=test_id";
        let metadata = video_metadata(&info, url);

        assert_eq!(metadata.get_str("title"), Some("Test Video"));
        assert_eq!(metadata.get_str("channel"), Some("Test Channel"));
        assert_eq!(metadata.get_str("video_id"), Some("test_id"));
        assert_eq!(metadata.get("view_count"), Some(&json!(1000)));
        assert_eq!(metadata.get("like_count"), Some(&json!(100)));
        assert_eq!(metadata.get("duration"), Some(&json!(300)));
        assert_eq!(metadata.get_str("upload_date"), Some("20230101"));
        assert_eq!(metadata.get("tags"), Some(&json!(["tag1", "tag2"])));
        assert_eq!(metadata.get_str("url"), Some(url));
    }

    #[test]
    fn test_placeholder_metadata_defaults() {
        let metadata = placeholder_metadata("https://youtu.be/x");
        assert_eq!(metadata.get_str("title"), Some("unknown_title"));
        assert_eq!(metadata.get_str("channel"), Some("unknown_channel"));
        assert_eq!(metadata.get("tags"), Some(&json!([])));
    }

    #[test]
    fn test_partial_downloads_removed_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["audio_ab12cd34.webm", "audio_ab12cd34.m4a.part", "audio_ff00ff00.webm", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        remove_partial_downloads(dir.path(), "audio_ab12cd34");

        assert!(!dir.path().join("audio_ab12cd34.webm").exists());
        assert!(!dir.path().join("audio_ab12cd34.m4a.part").exists());
        assert!(dir.path().join("audio_ff00ff00.webm").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_failed_download_leaves_work_dir_empty() {
        let extractor = YoutubeExtractor::with_options(
            "/nonexistent/yt-dlp",
            4,
            RetryPolicy::fixed(1, std::time::Duration::ZERO),
        );
        let dir = tempfile::tempdir().unwrap();

        assert!(extractor
            .download_audio("https://youtu.be/abc", dir.path())
            .await
            .is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_binary_is_extraction_failure() {
        let extractor = YoutubeExtractor::with_options(
            "/nonexistent/yt-dlp",
            4,
            RetryPolicy::fixed(1, std::time::Duration::ZERO),
        );
        let dir = tempfile::tempdir().unwrap();
        let err = extractor
            .extract("https://youtu.be/abc", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StreamError>(),
            Some(StreamError::ExtractionFailure(_))
        ));
    }
}
