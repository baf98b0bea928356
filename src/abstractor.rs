//! The request pipeline: upload → extract → summarize → translate → speak.
//!
//! An [`Abstractor`] is built once per process and shared by every request.
//! It owns the backends (read-only, behind `Arc`) and runs each request as a
//! strictly linear sequence of stages. The first failing stage aborts the
//! request; whatever was produced before it is returned alongside the error
//! in a [`PipelineFailure`].

use crate::backend::{build_inference_backend, build_speech_backend, InferenceBackend, SpeechBackend};
use crate::config::AbstractorConfig;
use crate::error::{AbstractorError, Stage};
use crate::language::{end_to_end_languages, LanguageCode, LanguageOption};
use crate::output::{AbstractOutput, PartialOutput, PipelineStats};
use crate::pipeline::extract::{PdfTextExtractor, TextExtractor};
use crate::pipeline::input::{self, Document};
use crate::pipeline::summarize::Summarizer;
use crate::pipeline::synthesize::{summary_audio_name, translation_audio_name, Synthesizer};
use crate::pipeline::translate::Translator;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One abstractor request: a PDF and the language to translate its summary into.
#[derive(Debug, Clone)]
pub struct AbstractRequest {
    pub document: Document,
    pub target_lang: LanguageCode,
}

/// A failed request: the error plus anything produced before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PipelineFailure {
    pub request_id: String,
    #[source]
    pub error: AbstractorError,
    pub partial: PartialOutput,
}

impl PipelineFailure {
    pub fn stage(&self) -> Stage {
        self.error.stage()
    }

    fn early(request_id: &str, error: AbstractorError) -> Self {
        Self {
            request_id: request_id.to_string(),
            error,
            partial: PartialOutput::default(),
        }
    }
}

/// Mutable bookkeeping for one run; survives a timeout so the partial output
/// and the stage in flight can still be reported.
#[derive(Default)]
struct RunState {
    stage: Option<Stage>,
    partial: PartialOutput,
    stats: PipelineStats,
}

/// Runs the abstractor pipeline.
pub struct Abstractor {
    config: AbstractorConfig,
    extractor: Arc<dyn TextExtractor>,
    summarizer: Summarizer,
    translator: Translator,
    synthesizer: Synthesizer,
    inference: Arc<dyn InferenceBackend>,
    speech: Arc<dyn SpeechBackend>,
}

impl Abstractor {
    /// Build the backends selected in `config` and prepare the directories.
    pub async fn new(config: AbstractorConfig) -> Result<Self, AbstractorError> {
        let inference = build_inference_backend(&config).await?;
        let speech = build_speech_backend(&config)?;
        let extractor: Arc<dyn TextExtractor> = Arc::new(PdfTextExtractor::from_config(&config));
        info!(
            "Backends ready: inference={}, speech={}",
            inference.name(),
            speech.name()
        );
        let abstractor = Self::with_backends(config, extractor, inference, speech);
        abstractor.prepare_dirs().await?;
        Ok(abstractor)
    }

    /// Assemble an abstractor from explicit collaborators.
    pub fn with_backends(
        config: AbstractorConfig,
        extractor: Arc<dyn TextExtractor>,
        inference: Arc<dyn InferenceBackend>,
        speech: Arc<dyn SpeechBackend>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.inference_concurrency.max(1)));
        let summarizer = Summarizer::new(
            Arc::clone(&inference),
            config.generation.clone(),
            config.source_lang.clone(),
            Arc::clone(&permits),
        );
        let translator = Translator::new(Arc::clone(&inference), permits);
        let synthesizer = Synthesizer::new(Arc::clone(&speech), config.static_dir.clone());
        Self {
            config,
            extractor,
            summarizer,
            translator,
            synthesizer,
            inference,
            speech,
        }
    }

    pub fn config(&self) -> &AbstractorConfig {
        &self.config
    }

    /// Create the uploads and static directories.
    pub async fn prepare_dirs(&self) -> Result<(), AbstractorError> {
        tokio::fs::create_dir_all(&self.config.uploads_dir)
            .await
            .map_err(|source| AbstractorError::UploadWriteFailed {
                path: self.config.uploads_dir.clone(),
                source,
            })?;
        tokio::fs::create_dir_all(&self.config.static_dir)
            .await
            .map_err(|source| AbstractorError::AudioWriteFailed {
                path: self.config.static_dir.clone(),
                source,
            })?;
        Ok(())
    }

    /// Target languages that can be both translated into and spoken.
    pub fn supported_languages(&self) -> Vec<LanguageOption> {
        let source = &self.config.source_lang;
        end_to_end_languages(
            |c| self.inference.supports_translation(source, c),
            |c| self.speech.supports_language(c),
        )
    }

    /// Reject a target language before any work is done.
    ///
    /// The source language must be speakable too, since its summary is
    /// synthesized as well.
    pub fn check_target(&self, target: &LanguageCode) -> Result<(), AbstractorError> {
        self.translator.check_target(&self.config.source_lang, target)?;
        self.synthesizer.check_language(target)?;
        self.synthesizer.check_language(&self.config.source_lang)
    }

    /// Run the pipeline for an uploaded document.
    pub async fn process(&self, request: AbstractRequest) -> Result<AbstractOutput, PipelineFailure> {
        let request_id = new_request_id();

        request
            .document
            .validate()
            .map_err(|e| PipelineFailure::early(&request_id, e))?;
        self.check_target(&request.target_lang)
            .map_err(|e| PipelineFailure::early(&request_id, e))?;

        let stored = input::store_upload(
            &request.document,
            &self.config.uploads_dir,
            &request_id,
            self.config.keep_uploads,
        )
        .await
        .map_err(|e| PipelineFailure::early(&request_id, e))?;

        info!(
            "[{}] Upload '{}' stored at {}",
            request_id,
            request.document.file_name,
            stored.path().display()
        );

        // `stored` lives until the run ends; without retention the file is
        // removed on drop.
        self.run_with_id(request_id, stored.path(), &request.target_lang)
            .await
    }

    /// Run the pipeline for a PDF already on disk.
    pub async fn process_file(
        &self,
        path: impl AsRef<Path>,
        target: &LanguageCode,
    ) -> Result<AbstractOutput, PipelineFailure> {
        let request_id = new_request_id();
        let path = input::resolve_local(path.as_ref())
            .map_err(|e| PipelineFailure::early(&request_id, e))?;
        self.check_target(target)
            .map_err(|e| PipelineFailure::early(&request_id, e))?;
        self.run_with_id(request_id, &path, target).await
    }

    async fn run_with_id(
        &self,
        request_id: String,
        path: &Path,
        target: &LanguageCode,
    ) -> Result<AbstractOutput, PipelineFailure> {
        let total_start = Instant::now();
        let cb = self.config.progress_callback.clone();
        if let Some(ref cb) = cb {
            cb.on_pipeline_start(&request_id);
        }

        let mut state = RunState::default();
        let limit = Duration::from_secs(self.config.request_timeout_secs);
        let outcome =
            tokio::time::timeout(limit, self.run(&request_id, path, target, &mut state)).await;

        let result = match outcome {
            Ok(Ok(mut output)) => {
                output.stats.total_ms = total_start.elapsed().as_millis() as u64;
                Ok(output)
            }
            Ok(Err(error)) => Err(error),
            Err(_) => {
                let stage = state.stage.unwrap_or(Stage::Extraction);
                if stage == Stage::Synthesis {
                    self.remove_request_audio(&request_id, target).await;
                }
                if let Some(ref cb) = cb {
                    cb.on_stage_error(&request_id, stage, "timed out");
                }
                Err(AbstractorError::Timeout {
                    secs: self.config.request_timeout_secs,
                    stage,
                })
            }
        };

        if let Some(ref cb) = cb {
            cb.on_pipeline_complete(&request_id, result.is_ok());
        }

        match result {
            Ok(output) => {
                info!(
                    "[{}] Done in {}ms (extract {}ms, summarize {}ms, translate {}ms, speech {}ms)",
                    request_id,
                    output.stats.total_ms,
                    output.stats.extraction_ms,
                    output.stats.summarization_ms,
                    output.stats.translation_ms,
                    output.stats.synthesis_ms
                );
                Ok(output)
            }
            Err(error) => {
                warn!("[{}] Failed during {}: {}", request_id, error.stage(), error);
                Err(PipelineFailure {
                    request_id,
                    error,
                    partial: state.partial,
                })
            }
        }
    }

    /// The stage sequence. Records progress in `state` as it goes.
    async fn run(
        &self,
        request_id: &str,
        path: &Path,
        target: &LanguageCode,
        state: &mut RunState,
    ) -> Result<AbstractOutput, AbstractorError> {
        // ── Stage 1: Extract ─────────────────────────────────────────────
        let t = self.enter(request_id, Stage::Extraction, state);
        let extracted = self
            .finish(request_id, Stage::Extraction, t, self.extractor.extract(path).await)?;
        state.stats.extraction_ms = t.elapsed().as_millis() as u64;
        state.partial.page_count = Some(extracted.page_count);
        debug!(
            "[{}] {} pages, {} empty",
            request_id,
            extracted.page_count,
            extracted.empty_pages.len()
        );

        // ── Stage 2: Summarize ───────────────────────────────────────────
        let t = self.enter(request_id, Stage::Summarization, state);
        let summary = self.finish(
            request_id,
            Stage::Summarization,
            t,
            self.summarizer.summarize(&extracted.text).await,
        )?;
        state.stats.summarization_ms = t.elapsed().as_millis() as u64;
        state.partial.summary = Some(summary.clone());

        // ── Stage 3: Translate ───────────────────────────────────────────
        let t = self.enter(request_id, Stage::Translation, state);
        let translation = self.finish(
            request_id,
            Stage::Translation,
            t,
            self.translator.translate(&summary, target).await,
        )?;
        state.stats.translation_ms = t.elapsed().as_millis() as u64;
        state.partial.translation = Some(translation.clone());

        // ── Stage 4: Synthesize both texts concurrently ──────────────────
        let t = self.enter(request_id, Stage::Synthesis, state);
        let summary_name = summary_audio_name(request_id);
        let translation_name = translation_audio_name(target, request_id);
        let (summary_audio, translation_audio) = tokio::join!(
            self.synthesizer
                .synthesize(&summary.text, &summary.language, &summary_name),
            self.synthesizer
                .synthesize(&translation.text, target, &translation_name),
        );
        let audio = match (summary_audio, translation_audio) {
            (Ok(a), Ok(b)) => Ok((a, b)),
            (Ok(written), Err(e)) | (Err(e), Ok(written)) => {
                self.synthesizer.discard(&written).await;
                Err(e)
            }
            (Err(e), Err(_)) => Err(e),
        };
        let (summary_audio, translation_audio) =
            self.finish(request_id, Stage::Synthesis, t, audio)?;
        state.stats.synthesis_ms = t.elapsed().as_millis() as u64;

        Ok(AbstractOutput {
            request_id: request_id.to_string(),
            page_count: extracted.page_count,
            empty_pages: extracted.empty_pages,
            summary,
            translation,
            summary_audio,
            translation_audio,
            stats: state.stats.clone(),
        })
    }

    fn enter(&self, request_id: &str, stage: Stage, state: &mut RunState) -> Instant {
        state.stage = Some(stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_start(request_id, stage);
        }
        Instant::now()
    }

    fn finish<T>(
        &self,
        request_id: &str,
        stage: Stage,
        started: Instant,
        result: Result<T, AbstractorError>,
    ) -> Result<T, AbstractorError> {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                info!("[{}] {} finished in {}ms", request_id, stage, elapsed_ms);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_stage_complete(request_id, stage, elapsed_ms);
                }
            }
            Err(e) => {
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_stage_error(request_id, stage, &e.to_string());
                }
            }
        }
        result
    }

    async fn remove_request_audio(&self, request_id: &str, target: &LanguageCode) {
        let dir = self.synthesizer.output_dir();
        for name in [
            summary_audio_name(request_id),
            translation_audio_name(target, request_id),
        ] {
            let path = dir.join(name);
            // A timeout can land between the temp write and the rename.
            for candidate in [path.with_extension("mp3.tmp"), path] {
                match tokio::fs::remove_file(&candidate).await {
                    Ok(()) => debug!("Removed {}", candidate.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!("Failed to remove {}: {}", candidate.display(), e),
                }
            }
        }
    }
}

fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}
