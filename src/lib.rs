//! # pdf-abstractor
//!
//! Summarize a PDF, translate the summary, and speak both.
//!
//! A user uploads a document and picks a target language. The text layer of
//! every page is extracted, condensed into a short abstractive summary by a
//! legal-domain Pegasus model, translated by M2M100, and both texts are
//! rendered to MP3 audio. The web front end shows the two summaries with a
//! player for each.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Input       validate %PDF magic, store as <request-id>_<name>.pdf
//!  ├─ 2. Extract     every page's text in page order (pdfium, spawn_blocking)
//!  ├─ 3. Summarize   token budget in, beam search, ≤ 512 tokens out
//!  ├─ 4. Translate   target language checked first, one generation pass
//!  └─ 5. Synthesize  both texts to MP3 concurrently, request-keyed names
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_abstractor::{Abstractor, AbstractorConfig, LanguageCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Hugging Face inference API; token from HF_API_TOKEN
//!     let abstractor = Abstractor::new(AbstractorConfig::default()).await?;
//!     let output = abstractor
//!         .process_file("contract.pdf", &LanguageCode::new("es"))
//!         .await?;
//!     println!("{}\n\n{}", output.summary.text, output.translation.text);
//!     eprintln!("audio: {}", output.translation_audio.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `abstractor` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `bundled` | off     | Embed the pdfium library in the binary at compile time |
//!
//! ## Backends
//!
//! | Concern | Default | Alternative |
//! |---------|---------|-------------|
//! | Summarization | `nsi319/legal-pegasus` via HF inference API | any edgequake-llm chat provider |
//! | Translation   | `facebook/m2m100_418M` via HF inference API | any edgequake-llm chat provider |
//! | Speech        | Google Translate TTS | none |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod abstractor;
pub mod backend;
pub mod config;
pub mod error;
pub mod language;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use abstractor::{AbstractRequest, Abstractor, PipelineFailure};
pub use backend::{InferenceBackend, SpeechBackend};
pub use config::{
    AbstractorConfig, AbstractorConfigBuilder, EmptyPagePolicy, GenerationConfig,
    InferenceBackendKind, SpeechBackendKind,
};
pub use error::{AbstractorError, BackendError, Stage};
pub use language::{LanguageCode, LanguageOption};
pub use output::{
    AbstractOutput, AudioArtifact, ExtractedText, PartialOutput, PipelineStats, Summary,
    TranslatedSummary,
};
pub use pipeline::input::Document;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
