//! Stream Digest - turn videos, podcasts, web pages and text files into Markdown digests
//!
//! This library fetches content from YouTube, Spotify, the web or the local filesystem,
//! derives a transcript or text body, translates and summarizes it, optionally enriches
//! the summary with noun synonyms, and writes everything into a Markdown report.

pub mod cache;
pub mod chat;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod extractors;
pub mod huggingface;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod summarize;
pub mod transcribe;
pub mod translate;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{Dispatcher, Extraction, SourceExtractor, SourceKind};
pub use output::Report;
pub use pipeline::{RunOutcome, StreamPipeline};
pub use retry::{Backoff, RetryPolicy};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to stream processing
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("Unsupported locator: {0}")]
    UnsupportedLocator(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Transcription unavailable: {0}")]
    TranscriptionUnavailable(String),

    #[error("{operation} failed after {attempts} attempts")]
    RemoteCallExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Missing configuration: {0} is not set")]
    ConfigurationMissing(String),
}

/// Read a required credential from the environment.
///
/// Credentials are looked up lazily, at the first call that needs them.
pub fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(StreamError::ConfigurationMissing(name.to_string()).into()),
    }
}
