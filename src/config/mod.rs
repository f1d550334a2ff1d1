use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::chunking::{DEFAULT_CHUNK_WORDS, DEFAULT_SUMMARY_MAX_LENGTH, DEFAULT_TRANSLATION_CHARS};
use crate::retry::RetryPolicy;
use crate::transcribe::ModelSize;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output locations, languages and optional stages
    pub pipeline: PipelineConfig,

    /// External speech-to-text and download tools
    pub transcription: TranscriptionConfig,

    pub translation: TranslationConfig,

    pub summarization: SummarizationConfig,

    /// Chat completion settings for the video overview
    pub chat: ChatConfig,

    pub enrichment: EnrichmentConfig,

    pub spotify: SpotifyConfig,

    /// Retry settings for remote calls
    pub retry: RetryConfig,

    /// Metadata cache settings
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory the Markdown reports are written to
    pub output_dir: PathBuf,

    /// Scratch directory for downloaded audio (system temp if unset)
    pub temp_dir: Option<PathBuf>,

    /// Language of the source material
    pub source_language: String,

    /// Language to translate into
    pub target_language: String,

    /// Annotate summary nouns with synonyms
    pub enrich: bool,

    /// Ask the chat model for a structured overview of videos
    pub rich_summary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub whisper_path: String,
    pub yt_dlp_path: String,

    /// Default model size
    pub model: ModelSize,

    /// Spoken language hint (auto-detect if not specified)
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub base_url: String,

    /// Model name with `{source}` and `{target}` placeholders
    pub model_template: String,

    /// Maximum characters per translation request
    pub max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    pub base_url: String,
    pub model: String,

    /// Word budget for the finished summary
    pub max_length: usize,

    /// Words per chunk sent to the model
    pub chunk_words: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,

    /// Language the overview is written in
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    /// Market code sent with catalog lookups
    pub market: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            temp_dir: None,
            source_language: "en".to_string(),
            target_language: "pt".to_string(),
            enrich: false,
            rich_summary: false,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            whisper_path: "whisper".to_string(),
            yt_dlp_path: "yt-dlp".to_string(),
            model: ModelSize::Base,
            language: None,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: crate::huggingface::DEFAULT_BASE_URL.to_string(),
            model_template: crate::translate::huggingface::DEFAULT_MODEL_TEMPLATE.to_string(),
            max_chars: DEFAULT_TRANSLATION_CHARS,
        }
    }
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            base_url: crate::huggingface::DEFAULT_BASE_URL.to_string(),
            model: crate::summarize::huggingface::DEFAULT_MODEL.to_string(),
            max_length: DEFAULT_SUMMARY_MAX_LENGTH,
            chunk_words: DEFAULT_CHUNK_WORDS,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: crate::chat::openai::DEFAULT_BASE_URL.to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            language: "Brazilian Portuguese".to_string(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            base_url: crate::enrich::datamuse::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            market: "US".to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: crate::retry::DEFAULT_MAX_ATTEMPTS,
            delay_secs: crate::retry::DEFAULT_DELAY.as_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: crate::cache::DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            tracing::debug!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("stream-digest").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.translation.max_chars == 0 {
            anyhow::bail!("translation.max_chars must be greater than zero");
        }
        if self.summarization.max_length == 0 || self.summarization.chunk_words == 0 {
            anyhow::bail!("summarization.max_length and chunk_words must be greater than zero");
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        if self.cache.capacity == 0 {
            anyhow::bail!("cache.capacity must be at least 1");
        }
        if self.pipeline.target_language.trim().is_empty() {
            anyhow::bail!("pipeline.target_language must be set");
        }

        Ok(())
    }

    /// Retry policy for chat completion calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.retry.max_attempts, Duration::from_secs(self.retry.delay_secs))
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Output Directory: {}", self.pipeline.output_dir.display());
        println!(
            "  Languages: {} -> {}",
            self.pipeline.source_language, self.pipeline.target_language
        );
        println!("  Whisper Model: {}", self.transcription.model);
        println!("  Summarization Model: {}", self.summarization.model);
        println!("  Chat Model: {}", self.chat.model);
        println!("  Enrichment: {}", self.pipeline.enrich);
        println!("  Rich Summary: {}", self.pipeline.rich_summary);
        println!(
            "  Retry: {} attempts, {}s delay",
            self.retry.max_attempts, self.retry.delay_secs
        );
        println!("  Credentials (from environment):");
        for name in [
            crate::extractors::spotify::CLIENT_ID_ENV,
            crate::extractors::spotify::CLIENT_SECRET_ENV,
            crate::chat::openai::API_KEY_ENV,
            crate::huggingface::TOKEN_ENV,
        ] {
            let state = if std::env::var(name).is_ok() { "set" } else { "not set" };
            println!("    {}: {}", name, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.target_language, "pt");
        assert_eq!(config.translation.max_chars, 4999);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.cache.capacity, 100);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
pipeline:
  target_language: de
  enrich: true
transcription:
  model: small
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.pipeline.target_language, "de");
        assert!(config.pipeline.enrich);
        assert_eq!(config.transcription.model, ModelSize::Small);
        assert_eq!(config.summarization.max_length, 130);
    }

    #[test]
    fn test_zero_limits_rejected() {
        let yaml = "translation:\n  max_chars: 0\n";
        assert!(Config::from_yaml(yaml).is_err());
        let yaml = "retry:\n  max_attempts: 0\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_yaml_round_trip_keeps_sections() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("pipeline:"));
        assert!(yaml.contains("summarization:"));
        assert!(yaml.contains("model: base"));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = Config::default();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff.delay_after(1), Duration::from_secs(5));
    }
}
