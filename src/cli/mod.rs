use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::transcribe::ModelSize;

#[derive(Parser)]
#[command(
    name = "stream-digest",
    about = "Stream Digest - Summarize and translate YouTube videos, Spotify tracks, web pages and text files",
    version,
    long_about = "Fetches a YouTube video, Spotify track or episode, web page or local text file, transcribes any audio with Whisper, translates and summarizes the result, and writes a Markdown report."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a URL or local file into a Markdown report
    Process {
        /// YouTube or Spotify URL, web page URL, or path to a text file
        #[arg(value_name = "LOCATOR")]
        locator: String,

        /// Directory the report is written to
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Whisper model size
        #[arg(short, long, value_enum)]
        model: Option<ModelSize>,

        /// Language to translate into
        #[arg(short, long, value_name = "LANG")]
        target_language: Option<String>,

        /// Annotate nouns in the summary with synonyms
        #[arg(long)]
        enrich: bool,

        /// Add a chat-model overview for YouTube videos
        #[arg(long)]
        rich_summary: bool,
    },

    /// Show the current configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported sources
    Sources,
}

/// Per-run overrides from the `process` subcommand
#[derive(Debug, Default, Clone)]
pub struct ProcessOverrides {
    pub output_dir: Option<PathBuf>,
    pub model: Option<ModelSize>,
    pub target_language: Option<String>,
    pub enrich: bool,
    pub rich_summary: bool,
}

impl ProcessOverrides {
    /// Apply command-line flags on top of the loaded configuration
    pub fn apply(self, config: &mut Config) {
        if let Some(dir) = self.output_dir {
            config.pipeline.output_dir = dir;
        }
        if let Some(model) = self.model {
            config.transcription.model = model;
        }
        if let Some(lang) = self.target_language {
            config.pipeline.target_language = lang;
        }
        // Flags only switch stages on; the config file can enable them too
        config.pipeline.enrich |= self.enrich;
        config.pipeline.rich_summary |= self.rich_summary;
    }
}
