use anyhow::Context;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::chat::{OpenAiChat, RichSummary};
use crate::chunking::{self, SummaryOptions, TranslationOptions};
use crate::config::Config;
use crate::enrich::{Datamuse, Enricher};
use crate::extractors::{Dispatcher, Extraction, SourceKind};
use crate::huggingface::InferenceClient;
use crate::output::{self, Report};
use crate::summarize::{HuggingFaceSummarizer, Summarizer};
use crate::transcribe::{Transcriber, WhisperCli};
use crate::translate::{HuggingFaceTranslator, Translator};
use crate::{Result, StreamError};

/// Transcript used when a source yields no audio to transcribe
pub const AUDIO_UNAVAILABLE: &str = "Audio not available for transcription.";

/// Transcript used when the speech-to-text backend fails
pub const TRANSCRIPTION_FAILED: &str = "Transcription failed.";

/// Steps of a single run, in the order they are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dispatch,
    Extract,
    Transcribe,
    Translate,
    Summarize,
    Enrich,
    Report,
    Cleanup,
    Done,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Dispatch => "dispatch",
            Stage::Extract => "extract",
            Stage::Transcribe => "transcribe",
            Stage::Translate => "translate",
            Stage::Summarize => "summarize",
            Stage::Enrich => "enrich",
            Stage::Report => "report",
            Stage::Cleanup => "cleanup",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report_path: PathBuf,

    /// Stages entered, ending with `Done`
    pub stages: Vec<Stage>,
}

/// Removes the run's audio file when dropped, whatever the exit path
#[derive(Default)]
struct AudioCleanup {
    path: Option<PathBuf>,
}

impl AudioCleanup {
    fn track(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
    }
}

impl Drop for AudioCleanup {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };

        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed audio file {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove audio file {}: {}", path.display(), e),
        }
    }
}

/// Scratch directory for downloads, either configured or temporary
enum WorkDir {
    Configured(PathBuf),
    Temporary(TempDir),
}

impl WorkDir {
    fn create(configured: Option<&Path>) -> Result<Self> {
        match configured {
            Some(dir) => {
                fs_err::create_dir_all(dir).context("Failed to create temp directory")?;
                Ok(Self::Configured(dir.to_path_buf()))
            }
            None => Ok(Self::Temporary(
                TempDir::new().context("Failed to create temporary directory")?,
            )),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Configured(path) => path,
            Self::Temporary(dir) => dir.path(),
        }
    }
}

/// Dispatch, transcribe, translate, summarize and report for one locator at a time
pub struct StreamPipeline {
    config: Config,
    dispatcher: Dispatcher,
    transcriber: Box<dyn Transcriber>,
    translator: Box<dyn Translator>,
    summarizer: Box<dyn Summarizer>,
    rich_summary: Option<RichSummary>,
    enricher: Option<Enricher>,
    work_dir: WorkDir,
}

/// Assembles a [`StreamPipeline`], filling unset backends from the config
pub struct PipelineBuilder {
    config: Config,
    show_progress: bool,
    dispatcher: Option<Dispatcher>,
    transcriber: Option<Box<dyn Transcriber>>,
    translator: Option<Box<dyn Translator>>,
    summarizer: Option<Box<dyn Summarizer>>,
    rich_summary: Option<RichSummary>,
    enricher: Option<Enricher>,
}

impl PipelineBuilder {
    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn transcriber(mut self, transcriber: Box<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Used for video sources only, and only when `pipeline.rich_summary` is set
    pub fn rich_summary(mut self, rich_summary: RichSummary) -> Self {
        self.rich_summary = Some(rich_summary);
        self
    }

    /// Used only when `pipeline.enrich` is set
    pub fn enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn build(self) -> Result<StreamPipeline> {
        let config = self.config;
        config.validate()?;

        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Dispatcher::new(&config));

        let transcriber = self.transcriber.unwrap_or_else(|| {
            Box::new(
                WhisperCli::new(config.transcription.model)
                    .with_path(config.transcription.whisper_path.clone())
                    .with_language(config.transcription.language.clone())
                    .with_progress(self.show_progress),
            )
        });

        let translator = self.translator.unwrap_or_else(|| {
            Box::new(HuggingFaceTranslator::with_template(
                InferenceClient::new(config.translation.base_url.clone()),
                &config.translation.model_template,
                &config.pipeline.source_language,
                &config.pipeline.target_language,
            ))
        });

        let summarizer = self.summarizer.unwrap_or_else(|| {
            Box::new(
                HuggingFaceSummarizer::new(InferenceClient::new(
                    config.summarization.base_url.clone(),
                ))
                .with_model(config.summarization.model.clone()),
            )
        });

        let rich_summary = match self.rich_summary {
            Some(rich_summary) => Some(rich_summary),
            None if config.pipeline.rich_summary => Some(RichSummary::new(
                Box::new(OpenAiChat::new(config.chat.base_url.clone())),
                &config.chat,
                config.retry_policy(),
            )),
            None => None,
        };

        let enricher = match self.enricher {
            Some(enricher) => Some(enricher),
            None if config.pipeline.enrich => Some(Enricher::new(
                Box::new(Datamuse::new(config.enrichment.base_url.clone())),
                Box::new(Datamuse::new(config.enrichment.base_url.clone())),
            )),
            None => None,
        };

        let work_dir = WorkDir::create(config.pipeline.temp_dir.as_deref())?;

        Ok(StreamPipeline {
            config,
            dispatcher,
            transcriber,
            translator,
            summarizer,
            rich_summary,
            enricher,
            work_dir,
        })
    }
}

impl StreamPipeline {
    /// Create a pipeline with the default backends for `config`
    pub fn new(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: Config) -> PipelineBuilder {
        PipelineBuilder {
            config,
            show_progress: false,
            dispatcher: None,
            transcriber: None,
            translator: None,
            summarizer: None,
            rich_summary: None,
            enricher: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Process one locator into a Markdown report.
    ///
    /// Any audio file downloaded for the run is removed before this returns,
    /// on success and on failure alike.
    pub async fn run(&self, locator: &str) -> Result<RunOutcome> {
        let mut stages = Vec::new();
        let mut cleanup = AudioCleanup::default();

        let result = self.run_stages(locator, &mut stages, &mut cleanup).await;

        enter(&mut stages, Stage::Cleanup);
        drop(cleanup);

        match result {
            Ok(report_path) => {
                enter(&mut stages, Stage::Done);
                Ok(RunOutcome {
                    report_path,
                    stages,
                })
            }
            Err(e) => {
                enter(&mut stages, Stage::Failed);
                tracing::error!("Run failed for {}: {:#}", locator, e);
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        locator: &str,
        stages: &mut Vec<Stage>,
        cleanup: &mut AudioCleanup,
    ) -> Result<PathBuf> {
        enter(stages, Stage::Dispatch);
        let kind = self.dispatcher.classify(locator)?;

        enter(stages, Stage::Extract);
        let extraction = self.dispatcher.extract(locator, self.work_dir.path()).await?;
        if let Some(audio) = &extraction.audio {
            cleanup.track(&audio.path);
        }

        enter(stages, Stage::Transcribe);
        let original = self.transcript(kind, &extraction).await?;

        enter(stages, Stage::Translate);
        let translated = chunking::translate_chunked(
            self.translator.as_ref(),
            &original,
            TranslationOptions {
                max_chars: self.config.translation.max_chars,
            },
        )
        .await
        .context("Translation failed")?;

        enter(stages, Stage::Summarize);
        let summary = chunking::summarize_recursive(
            self.summarizer.as_ref(),
            &translated,
            SummaryOptions {
                chunk_words: self.config.summarization.chunk_words,
                max_length: self.config.summarization.max_length,
            },
        )
        .await
        .context("Summarization failed")?;

        let rich_summary = self.rich_summary(kind, &extraction).await;

        let enriched = match (&self.enricher, self.config.pipeline.enrich) {
            (Some(enricher), true) => {
                enter(stages, Stage::Enrich);
                match enricher.enrich(&summary).await {
                    Ok(enriched) => Some(enriched),
                    Err(e) => {
                        tracing::warn!("Enrichment skipped: {:#}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        enter(stages, Stage::Report);
        let report = Report {
            title: extraction.title,
            attribution: extraction.attribution,
            kind,
            summary,
            rich_summary,
            enriched,
            original,
            translated,
            metadata: extraction.metadata,
        };

        output::save_to_dir(&report, &self.config.pipeline.output_dir).await
    }

    /// Body text for the run: text content, a transcript, or a sentinel
    async fn transcript(&self, kind: SourceKind, extraction: &Extraction) -> Result<String> {
        if kind == SourceKind::Text {
            return Ok(extraction.content.clone().unwrap_or_default());
        }

        match &extraction.audio {
            Some(audio) if audio.exists() => {
                match self.transcriber.transcribe(&audio.path).await {
                    Ok(transcript) => Ok(transcript),
                    Err(e) => {
                        tracing::warn!(
                            "{} transcription failed for {}: {:#}",
                            self.transcriber.name(),
                            audio.path.display(),
                            e
                        );
                        Ok(TRANSCRIPTION_FAILED.to_string())
                    }
                }
            }
            _ if kind == SourceKind::Video => Err(StreamError::ExtractionFailure(format!(
                "No audio file was produced for {}",
                extraction.title
            ))
            .into()),
            _ => {
                tracing::info!("No audio for '{}', using placeholder transcript", extraction.title);
                Ok(AUDIO_UNAVAILABLE.to_string())
            }
        }
    }

    async fn rich_summary(&self, kind: SourceKind, extraction: &Extraction) -> Option<String> {
        if kind != SourceKind::Video || !self.config.pipeline.rich_summary {
            return None;
        }

        let generator = self.rich_summary.as_ref()?;
        match generator.generate(&extraction.metadata).await {
            Ok(overview) => Some(overview),
            Err(e) => {
                tracing::warn!("Rich summary omitted: {:#}", e);
                None
            }
        }
    }
}

fn enter(stages: &mut Vec<Stage>, stage: Stage) {
    tracing::info!("Stage: {}", stage);
    stages.push(stage);
}
