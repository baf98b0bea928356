//! Error types for the pdf-abstractor library.
//!
//! Two layers of errors reflect two layers of the system:
//!
//! * [`AbstractorError`]: **Request-fatal**: one of the pipeline stages
//!   could not produce its output. Every variant belongs to exactly one
//!   [`Stage`], so the web front end can tell the user *which* step failed
//!   and let them resubmit.
//!
//! * [`BackendError`]: a collaborator (inference API, LLM provider, speech
//!   service) failed. Stages wrap it as the `#[source]` of their own
//!   variant; callers never see a bare backend error escape the pipeline.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The pipeline step an error or progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Extraction,
    Summarization,
    Translation,
    Synthesis,
}

impl Stage {
    /// Human-readable name used in logs and error pages.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Extraction => "text extraction",
            Stage::Summarization => "summarization",
            Stage::Translation => "translation",
            Stage::Synthesis => "speech synthesis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// All request-fatal errors returned by the pdf-abstractor library.
#[derive(Debug, Error)]
pub enum AbstractorError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// A required multipart field was absent from the form.
    #[error("Missing form field '{field}'")]
    MissingField { field: &'static str },

    /// The multipart body could not be read.
    #[error("Malformed upload form: {0}")]
    MalformedForm(String),

    /// The uploaded file had no content.
    #[error("Uploaded file '{file_name}' is empty")]
    EmptyUpload { file_name: String },

    /// The uploaded bytes do not start with the PDF magic.
    #[error("Uploaded file '{file_name}' is not a PDF\nFirst bytes: {magic:?}")]
    NotAPdf { file_name: String, magic: Vec<u8> },

    /// Could not persist the upload into the uploads directory.
    #[error("Failed to store upload at '{path}': {source}")]
    UploadWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none (or a wrong one) was provided.
    #[error("PDF '{path}' is encrypted and requires a password.")]
    PasswordRequired { path: PathBuf },

    /// A page had no text layer and the configured policy rejects that.
    #[error("Page {page} of '{path}' has no extractable text")]
    EmptyPage { path: PathBuf, page: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Model errors ──────────────────────────────────────────────────────
    /// The summarization model could not process the input.
    #[error("Summarization failed: {reason}")]
    SummarizationFailed {
        reason: String,
        #[source]
        source: Option<BackendError>,
    },

    /// The translation model could not process the input.
    #[error("Translation to '{target}' failed: {reason}")]
    TranslationFailed {
        target: String,
        reason: String,
        #[source]
        source: Option<BackendError>,
    },

    /// The language code is not supported by the backend of `stage`.
    #[error("Language '{code}' is not supported for {stage}")]
    UnsupportedLanguage { code: String, stage: Stage },

    // ── Synthesis errors ──────────────────────────────────────────────────
    /// The speech backend failed or received unusable input.
    #[error("Speech synthesis ({language}) failed: {reason}")]
    SynthesisFailed {
        language: String,
        reason: String,
        #[source]
        source: Option<BackendError>,
    },

    /// Audio bytes were produced but could not be written.
    #[error("Failed to write audio file '{path}': {source}")]
    AudioWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Runtime errors ────────────────────────────────────────────────────
    /// The configured inference provider is not initialised (missing API key etc.).
    #[error("Inference provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The whole request exceeded `request_timeout_secs`.
    #[error("Request timed out after {secs}s during {stage}")]
    Timeout { secs: u64, stage: Stage },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AbstractorError {
    /// The pipeline stage this error aborted.
    ///
    /// Configuration and provider errors are attributed to the stage that
    /// needs the provider; internal errors default to extraction, the first
    /// stage that touches the file system.
    pub fn stage(&self) -> Stage {
        match self {
            Self::MissingField { .. }
            | Self::MalformedForm(_)
            | Self::EmptyUpload { .. }
            | Self::NotAPdf { .. }
            | Self::UploadWriteFailed { .. }
            | Self::InvalidConfig(_) => Stage::Upload,
            Self::FileNotFound { .. }
            | Self::CorruptPdf { .. }
            | Self::PasswordRequired { .. }
            | Self::EmptyPage { .. }
            | Self::PdfiumBindingFailed(_)
            | Self::Internal(_) => Stage::Extraction,
            Self::SummarizationFailed { .. } | Self::ProviderNotConfigured { .. } => {
                Stage::Summarization
            }
            Self::TranslationFailed { .. } => Stage::Translation,
            Self::SynthesisFailed { .. } | Self::AudioWriteFailed { .. } => Stage::Synthesis,
            Self::UnsupportedLanguage { stage, .. } | Self::Timeout { stage, .. } => *stage,
        }
    }

    /// True for the taxonomy's UnsupportedLanguageError.
    pub fn is_unsupported_language(&self) -> bool {
        matches!(self, Self::UnsupportedLanguage { .. })
    }

    /// True when the user can fix the problem by changing the form input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. }
                | Self::MalformedForm(_)
                | Self::EmptyUpload { .. }
                | Self::NotAPdf { .. }
                | Self::UnsupportedLanguage { .. }
                | Self::CorruptPdf { .. }
                | Self::PasswordRequired { .. }
                | Self::EmptyPage { .. }
        )
    }
}

/// A failure reported by an inference or speech backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The remote API answered with a non-success status.
    #[error("HTTP {status} from {service}: {body}")]
    Http {
        service: String,
        status: u16,
        body: String,
    },

    /// The remote API rejected the credentials (401/403).
    #[error("Authentication failed for {service}: {detail}")]
    Auth { service: String, detail: String },

    /// Model weights are still being loaded on the inference server.
    #[error("Model '{model}' is loading (estimated {estimated_secs:.0}s)")]
    ModelLoading { model: String, estimated_secs: f64 },

    /// Connection-level failure (DNS, refused, reset).
    #[error("Network error talking to {service}: {detail}")]
    Network { service: String, detail: String },

    /// The call exceeded the per-call timeout.
    #[error("{service} did not answer within {secs}s")]
    Timeout { service: String, secs: u64 },

    /// The response body did not have the expected shape.
    #[error("Unexpected response from {service}: {detail}")]
    InvalidResponse { service: String, detail: String },

    /// An LLM provider call failed.
    #[error("{service} call failed: {detail}")]
    Provider { service: String, detail: String },

    /// The backend was asked to do something it cannot (e.g. empty input).
    #[error("{0}")]
    Rejected(String),
}

impl BackendError {
    /// Map a reqwest failure onto the backend taxonomy.
    pub(crate) fn from_reqwest(service: &str, secs: u64, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout {
                service: service.to_string(),
                secs,
            }
        } else if e.is_decode() {
            BackendError::InvalidResponse {
                service: service.to_string(),
                detail: e.to_string(),
            }
        } else {
            BackendError::Network {
                service: service.to_string(),
                detail: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_language_display_names_stage() {
        let e = AbstractorError::UnsupportedLanguage {
            code: "xx".into(),
            stage: Stage::Translation,
        };
        let msg = e.to_string();
        assert!(msg.contains("'xx'"), "got: {msg}");
        assert!(msg.contains("translation"), "got: {msg}");
        assert_eq!(e.stage(), Stage::Translation);
        assert!(e.is_unsupported_language());
    }

    #[test]
    fn stage_attribution() {
        assert_eq!(
            AbstractorError::MissingField { field: "pdf_file" }.stage(),
            Stage::Upload
        );
        assert_eq!(
            AbstractorError::CorruptPdf {
                path: "a.pdf".into(),
                detail: "xref".into()
            }
            .stage(),
            Stage::Extraction
        );
        assert_eq!(
            AbstractorError::SummarizationFailed {
                reason: "empty".into(),
                source: None
            }
            .stage(),
            Stage::Summarization
        );
        assert_eq!(
            AbstractorError::SynthesisFailed {
                language: "es".into(),
                reason: "empty text".into(),
                source: None
            }
            .stage(),
            Stage::Synthesis
        );
        assert_eq!(
            AbstractorError::Timeout {
                secs: 30,
                stage: Stage::Translation
            }
            .stage(),
            Stage::Translation
        );
    }

    #[test]
    fn backend_error_is_exposed_as_source() {
        use std::error::Error as _;

        let e = AbstractorError::TranslationFailed {
            target: "de".into(),
            reason: "backend fault".into(),
            source: Some(BackendError::Http {
                service: "huggingface".into(),
                status: 500,
                body: "boom".into(),
            }),
        };
        let source = e.source().expect("source should be set");
        assert!(source.to_string().contains("HTTP 500"));
    }

    #[test]
    fn client_errors() {
        assert!(AbstractorError::NotAPdf {
            file_name: "x.txt".into(),
            magic: b"hell".to_vec()
        }
        .is_client_error());
        assert!(!AbstractorError::Internal("x".into()).is_client_error());
    }

    #[test]
    fn model_loading_display() {
        let e = BackendError::ModelLoading {
            model: "facebook/m2m100_418M".into(),
            estimated_secs: 20.4,
        };
        assert!(e.to_string().contains("m2m100"));
        assert!(e.to_string().contains("20s"));
    }
}
