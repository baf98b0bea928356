//! Shared fakes for the integration tests.
//!
//! None of them touch the network or need a pdfium library, so every test
//! using them runs in CI.

#![allow(dead_code)]

use async_trait::async_trait;
use pdf_abstractor::pipeline::extract::{assemble_pages, TextExtractor};
use pdf_abstractor::{
    AbstractRequest, Abstractor, AbstractorConfig, AbstractorError, BackendError, Document,
    EmptyPagePolicy, ExtractedText, GenerationConfig, InferenceBackend, LanguageCode,
    SpeechBackend,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Smallest byte sequence the upload validator accepts as a PDF.
pub const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n%%EOF\n";

/// Audio bytes returned by [`FakeSpeech`].
pub const FAKE_MP3: &[u8] = b"ID3\x03\x00fake-mp3-frames";

// ── Extractor ────────────────────────────────────────────────────────────────

/// Returns fixed page texts for any path.
pub struct FakeExtractor {
    pub pages: Vec<String>,
    pub policy: EmptyPagePolicy,
    pub calls: AtomicUsize,
    pub seen_paths: Mutex<Vec<PathBuf>>,
}

impl FakeExtractor {
    pub fn new(pages: &[&str]) -> Arc<Self> {
        Self::with_policy(pages, EmptyPagePolicy::Warn)
    }

    pub fn with_policy(pages: &[&str], policy: EmptyPagePolicy) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            policy,
            calls: AtomicUsize::new(0),
            seen_paths: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract(&self, path: &Path) -> Result<ExtractedText, AbstractorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_paths.lock().unwrap().push(path.to_path_buf());
        if !path.exists() {
            return Err(AbstractorError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        assemble_pages(path, self.pages.clone(), self.policy)
    }
}

// ── Inference ────────────────────────────────────────────────────────────────

/// Deterministic summarizer/translator.
///
/// The summary is the first sentence of the input; the translation is the
/// input prefixed with the target code.
#[derive(Default)]
pub struct FakeInference {
    pub summarize_calls: AtomicUsize,
    pub translate_calls: AtomicUsize,
    pub fail_translation: bool,
    pub summary_delay: Option<Duration>,
    pub last_summary_input: Mutex<Option<String>>,
}

impl FakeInference {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_translation() -> Arc<Self> {
        Arc::new(Self {
            fail_translation: true,
            ..Default::default()
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            summary_delay: Some(delay),
            ..Default::default()
        })
    }
}

#[async_trait]
impl InferenceBackend for FakeInference {
    fn name(&self) -> &str {
        "fake-inference"
    }

    async fn summarize(
        &self,
        text: &str,
        _generation: &GenerationConfig,
    ) -> Result<String, BackendError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_summary_input.lock().unwrap() = Some(text.to_string());
        if let Some(delay) = self.summary_delay {
            tokio::time::sleep(delay).await;
        }
        let first = text.split_inclusive('.').next().unwrap_or(text).trim();
        Ok(format!("<pad> {first}</s>"))
    }

    async fn translate(
        &self,
        text: &str,
        _source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, BackendError> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_translation {
            return Err(BackendError::Http {
                service: "fake-inference".into(),
                status: 500,
                body: "translation model crashed".into(),
            });
        }
        Ok(format!("[{}] {}", target.as_str(), text))
    }
}

// ── Speech ───────────────────────────────────────────────────────────────────

/// Returns [`FAKE_MP3`] for every call, or fails for one language.
#[derive(Default)]
pub struct FakeSpeech {
    pub calls: AtomicUsize,
    pub fail_for: Option<LanguageCode>,
    pub delay_for: Option<(LanguageCode, Duration)>,
}

impl FakeSpeech {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_for(code: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_for: Some(LanguageCode::new(code)),
            ..Default::default()
        })
    }
}

#[async_trait]
impl SpeechBackend for FakeSpeech {
    fn name(&self) -> &str {
        "fake-speech"
    }

    async fn synthesize(
        &self,
        _text: &str,
        language: &LanguageCode,
    ) -> Result<Vec<u8>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((ref code, delay)) = self.delay_for {
            if code == language {
                tokio::time::sleep(delay).await;
            }
        }
        if self.fail_for.as_ref() == Some(language) {
            return Err(BackendError::Network {
                service: "fake-speech".into(),
                detail: "connection reset".into(),
            });
        }
        Ok(FAKE_MP3.to_vec())
    }
}

// ── Assembly ─────────────────────────────────────────────────────────────────

/// Route library logs to the test harness; `RUST_LOG=pdf_abstractor=debug`
/// with `--nocapture` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Config rooted in `dir` (uploads/ and static/ below it).
pub fn test_config(dir: &Path) -> AbstractorConfig {
    AbstractorConfig::builder()
        .uploads_dir(dir.join("uploads"))
        .static_dir(dir.join("static"))
        .request_timeout_secs(30)
        .build()
        .unwrap()
}

pub async fn abstractor(
    config: AbstractorConfig,
    extractor: Arc<FakeExtractor>,
    inference: Arc<FakeInference>,
    speech: Arc<FakeSpeech>,
) -> Abstractor {
    init_tracing();
    let a = Abstractor::with_backends(config, extractor, inference, speech);
    a.prepare_dirs().await.unwrap();
    a
}

pub fn pdf_request(name: &str, target: &str) -> AbstractRequest {
    AbstractRequest {
        document: Document::new(name, MINIMAL_PDF.to_vec()),
        target_lang: LanguageCode::new(target),
    }
}

/// File names in `dir`, sorted.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
