use anyhow::Context;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;

use super::{ModelSize, Transcriber};
use crate::{Result, StreamError};

/// Speech-to-text through the `whisper` command-line tool
pub struct WhisperCli {
    whisper_path: String,
    model: ModelSize,
    language: Option<String>,
    show_progress: bool,
}

impl WhisperCli {
    pub fn new(model: ModelSize) -> Self {
        Self {
            whisper_path: "whisper".to_string(),
            model,
            language: None,
            show_progress: false,
        }
    }

    pub fn with_path(mut self, whisper_path: impl Into<String>) -> Self {
        self.whisper_path = whisper_path.into();
        self
    }

    /// Spoken language hint; auto-detected when unset
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn model(&self) -> ModelSize {
        self.model
    }

    fn build_args(&self, audio_path: &Path, output_dir: &Path) -> Vec<String> {
        let mut args = vec![
            audio_path.to_string_lossy().into_owned(),
            "--model".to_string(),
            self.model.as_str().to_string(),
            "--output_format".to_string(),
            "txt".to_string(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().into_owned(),
            "--verbose".to_string(),
            "False".to_string(),
        ];

        if let Some(lang) = &self.language {
            args.push("--language".to_string());
            args.push(lang.clone());
        }

        args
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        if !audio_path.is_file() {
            return Err(StreamError::TranscriptionUnavailable(format!(
                "Audio file not found: {}",
                audio_path.display()
            ))
            .into());
        }

        let output_dir = TempDir::new().context("Failed to create transcription directory")?;
        let args = self.build_args(audio_path, output_dir.path());

        tracing::info!(
            "Transcribing {} with whisper ({} model)",
            audio_path.display(),
            self.model
        );

        let progress = if self.show_progress {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message(format!("Transcribing audio ({} model)...", self.model));
            spinner.enable_steady_tick(Duration::from_millis(120));
            Some(spinner)
        } else {
            None
        };

        let result = Command::new(&self.whisper_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        if let Some(spinner) = progress {
            spinner.finish_and_clear();
        }

        let output = result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::Error::from(StreamError::TranscriptionUnavailable(
                    "whisper is not installed. Install it with: pip install -U openai-whisper"
                        .to_string(),
                ))
            } else {
                anyhow::anyhow!("Failed to run whisper: {}", e)
            }
        })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("whisper failed: {}", error.trim());
        }

        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let transcript_path = output_dir.path().join(format!("{}.txt", stem));

        let transcript = fs_err::read_to_string(&transcript_path)
            .context("whisper did not produce a transcript")?;

        Ok(transcript.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    fn name(&self) -> &'static str {
        "Whisper CLI"
    }
}
