//! Values produced by the pipeline stages.
//!
//! Each value is created once by its stage and never mutated afterwards.

use crate::language::LanguageCode;
use serde::Serialize;
use std::path::PathBuf;

/// Text of a PDF, every page concatenated in ascending page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    /// The concatenated text. Page boundaries are not retained.
    pub text: String,
    /// Number of pages in the document.
    pub page_count: usize,
    /// 1-indexed pages that contributed no text.
    pub empty_pages: Vec<usize>,
}

impl ExtractedText {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Abstractive summary in the source language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub text: String,
    pub language: LanguageCode,
    /// True when the input was cut to the token budget before generation.
    pub input_truncated: bool,
}

/// The summary rendered into the requested target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslatedSummary {
    pub text: String,
    pub source_language: LanguageCode,
    pub target_language: LanguageCode,
}

/// A synthesized speech file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioArtifact {
    /// Absolute or config-relative path of the written file.
    pub path: PathBuf,
    /// File name inside the static directory.
    pub file_name: String,
    /// URL path under which the web server serves the file.
    pub url: String,
    pub language: LanguageCode,
    pub size_bytes: u64,
}

/// Timings of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub extraction_ms: u64,
    pub summarization_ms: u64,
    pub translation_ms: u64,
    pub synthesis_ms: u64,
    pub total_ms: u64,
}

/// Everything a successful request returns.
#[derive(Debug, Clone, Serialize)]
pub struct AbstractOutput {
    pub request_id: String,
    pub page_count: usize,
    pub empty_pages: Vec<usize>,
    pub summary: Summary,
    pub translation: TranslatedSummary,
    pub summary_audio: AudioArtifact,
    pub translation_audio: AudioArtifact,
    pub stats: PipelineStats,
}

/// What a failed request had produced before the failing stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartialOutput {
    pub page_count: Option<usize>,
    pub summary: Option<Summary>,
    pub translation: Option<TranslatedSummary>,
}

impl PartialOutput {
    pub fn is_empty(&self) -> bool {
        self.page_count.is_none() && self.summary.is_none() && self.translation.is_none()
    }
}
