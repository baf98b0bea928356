//! Configuration types for the abstractor pipeline.
//!
//! All pipeline behaviour is controlled through [`AbstractorConfig`], built
//! via its [`AbstractorConfigBuilder`]. One struct holds every knob so the
//! same config can be shared by the web server, the CLI and tests.

use crate::error::AbstractorError;
use crate::language::LanguageCode;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default summarization model (legal-domain Pegasus).
pub const DEFAULT_SUMMARIZATION_MODEL: &str = "nsi319/legal-pegasus";

/// Default translation model (many-to-many, 100 languages).
pub const DEFAULT_TRANSLATION_MODEL: &str = "facebook/m2m100_418M";

/// Default Hugging Face inference endpoint; model ids are appended.
pub const DEFAULT_HF_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Generation parameters for the summarizer.
///
/// Beam search with fixed parameters and no sampling, so a given model
/// version produces the same summary for the same input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Input token budget; longer text is cut before generation. Default: 1024.
    pub max_input_tokens: usize,
    /// Maximum summary length in tokens. Default: 512.
    pub max_length: usize,
    /// Beam width. Default: 5.
    pub num_beams: u32,
    /// Exponential length penalty; > 1.0 favours longer sequences. Default: 2.0.
    pub length_penalty: f32,
    /// Penalty for repeated n-grams; > 1.0 discourages repetition. Default: 2.5.
    pub repetition_penalty: f32,
    /// Stop once every beam has produced an end-of-sequence token. Default: true.
    pub early_stopping: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_input_tokens: 1024,
            max_length: 512,
            num_beams: 5,
            length_penalty: 2.0,
            repetition_penalty: 2.5,
            early_stopping: true,
        }
    }
}

/// What the extractor does with a page that yields no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmptyPagePolicy {
    /// Contribute an empty string silently.
    Ignore,
    /// Contribute an empty string and log a warning. (default)
    #[default]
    Warn,
    /// Fail the request with [`AbstractorError::EmptyPage`].
    Reject,
}

/// Which inference backend serves summarization and translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InferenceBackendKind {
    /// Hugging Face inference API running the seq2seq models. (default)
    #[default]
    HuggingFace,
    /// Any edgequake-llm chat provider, driven by fixed prompts.
    Llm,
}

/// Which speech backend synthesizes audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeechBackendKind {
    /// Google Translate text-to-speech endpoint. (default)
    #[default]
    GoogleTts,
}

/// Configuration for the abstractor pipeline and its web front end.
///
/// Built via [`AbstractorConfig::builder()`] or using
/// [`AbstractorConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_abstractor::AbstractorConfig;
///
/// let config = AbstractorConfig::builder()
///     .static_dir("/tmp/abstractor/static")
///     .request_timeout_secs(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.generation.num_beams, 5);
/// ```
#[derive(Clone)]
pub struct AbstractorConfig {
    /// Language the documents are written in and the summary is produced in. Default: `en`.
    pub source_lang: LanguageCode,

    /// Summarizer generation parameters.
    pub generation: GenerationConfig,

    /// Backend for summarization and translation. Default: Hugging Face.
    pub inference_backend: InferenceBackendKind,

    /// Base URL of the Hugging Face inference API; `/{model}` is appended.
    pub hf_base_url: String,

    /// Bearer token for the inference API. Falls back to `HF_API_TOKEN`.
    pub hf_api_token: Option<String>,

    /// Ask the inference API to hold the request while a cold model loads,
    /// instead of answering 503. Default: true.
    pub hf_wait_for_model: bool,

    /// Summarization model id. Default: `nsi319/legal-pegasus`.
    pub summarization_model: String,

    /// Translation model id. Default: `facebook/m2m100_418M`.
    pub translation_model: String,

    /// LLM provider name for [`InferenceBackendKind::Llm`] (e.g. "openai", "ollama").
    pub llm_provider_name: Option<String>,

    /// LLM model identifier. If None, uses the provider default.
    pub llm_model: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `llm_provider_name`.
    pub llm_provider: Option<Arc<dyn LLMProvider>>,

    /// Backend for speech synthesis. Default: Google TTS.
    pub speech_backend: SpeechBackendKind,

    /// Google TTS base URL. Default: `https://translate.google.com`.
    pub tts_base_url: String,

    /// Read more slowly. Default: false.
    pub tts_slow: bool,

    /// Directory receiving uploaded PDFs. Default: `uploads`.
    pub uploads_dir: PathBuf,

    /// Directory receiving generated audio, served under `/static`. Default: `static`.
    pub static_dir: PathBuf,

    /// Keep uploaded PDFs after the request finishes. Default: true.
    pub keep_uploads: bool,

    /// Handling of pages without a text layer. Default: [`EmptyPagePolicy::Warn`].
    pub empty_page_policy: EmptyPagePolicy,

    /// PDF user password for encrypted documents.
    pub pdf_password: Option<String>,

    /// Explicit pdfium library path. If None, pdfium-auto resolves or downloads it.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Maximum concurrent inference calls across all requests. Default: 4.
    ///
    /// Set to 1 when the backend cannot serve concurrent calls.
    pub inference_concurrency: usize,

    /// Whole-request timeout in seconds. Default: 600.
    pub request_timeout_secs: u64,

    /// Per-call timeout for remote backends in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Largest accepted upload in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Optional stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AbstractorConfig {
    fn default() -> Self {
        Self {
            source_lang: LanguageCode::new("en"),
            generation: GenerationConfig::default(),
            inference_backend: InferenceBackendKind::default(),
            hf_base_url: DEFAULT_HF_BASE_URL.to_string(),
            hf_api_token: None,
            hf_wait_for_model: true,
            summarization_model: DEFAULT_SUMMARIZATION_MODEL.to_string(),
            translation_model: DEFAULT_TRANSLATION_MODEL.to_string(),
            llm_provider_name: None,
            llm_model: None,
            llm_provider: None,
            speech_backend: SpeechBackendKind::default(),
            tts_base_url: "https://translate.google.com".to_string(),
            tts_slow: false,
            uploads_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("static"),
            keep_uploads: true,
            empty_page_policy: EmptyPagePolicy::default(),
            pdf_password: None,
            pdfium_lib_path: None,
            inference_concurrency: 4,
            request_timeout_secs: 600,
            api_timeout_secs: 120,
            max_upload_bytes: 50 * 1024 * 1024,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AbstractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractorConfig")
            .field("source_lang", &self.source_lang)
            .field("generation", &self.generation)
            .field("inference_backend", &self.inference_backend)
            .field("hf_base_url", &self.hf_base_url)
            .field("hf_api_token", &self.hf_api_token.as_ref().map(|_| "<redacted>"))
            .field("hf_wait_for_model", &self.hf_wait_for_model)
            .field("summarization_model", &self.summarization_model)
            .field("translation_model", &self.translation_model)
            .field("llm_provider_name", &self.llm_provider_name)
            .field("llm_model", &self.llm_model)
            .field("llm_provider", &self.llm_provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("speech_backend", &self.speech_backend)
            .field("uploads_dir", &self.uploads_dir)
            .field("static_dir", &self.static_dir)
            .field("keep_uploads", &self.keep_uploads)
            .field("empty_page_policy", &self.empty_page_policy)
            .field("inference_concurrency", &self.inference_concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl AbstractorConfig {
    /// Create a new builder for `AbstractorConfig`.
    pub fn builder() -> AbstractorConfigBuilder {
        AbstractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// The API token from config, else `HF_API_TOKEN`, else `HUGGINGFACEHUB_API_TOKEN`.
    pub fn resolved_hf_token(&self) -> Option<String> {
        self.hf_api_token
            .clone()
            .or_else(|| std::env::var("HF_API_TOKEN").ok())
            .or_else(|| std::env::var("HUGGINGFACEHUB_API_TOKEN").ok())
            .filter(|t| !t.is_empty())
    }
}

/// Builder for [`AbstractorConfig`].
#[derive(Debug)]
pub struct AbstractorConfigBuilder {
    config: AbstractorConfig,
}

impl AbstractorConfigBuilder {
    pub fn source_lang(mut self, lang: impl Into<LanguageCode>) -> Self {
        self.config.source_lang = lang.into();
        self
    }

    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.config.generation = generation;
        self
    }

    pub fn max_input_tokens(mut self, n: usize) -> Self {
        self.config.generation.max_input_tokens = n;
        self
    }

    pub fn max_summary_tokens(mut self, n: usize) -> Self {
        self.config.generation.max_length = n;
        self
    }

    pub fn inference_backend(mut self, kind: InferenceBackendKind) -> Self {
        self.config.inference_backend = kind;
        self
    }

    pub fn hf_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.hf_base_url = url.into();
        self
    }

    pub fn hf_api_token(mut self, token: impl Into<String>) -> Self {
        self.config.hf_api_token = Some(token.into());
        self
    }

    pub fn hf_wait_for_model(mut self, wait: bool) -> Self {
        self.config.hf_wait_for_model = wait;
        self
    }

    pub fn summarization_model(mut self, model: impl Into<String>) -> Self {
        self.config.summarization_model = model.into();
        self
    }

    pub fn translation_model(mut self, model: impl Into<String>) -> Self {
        self.config.translation_model = model.into();
        self
    }

    pub fn llm_provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.llm_provider_name = Some(name.into());
        self
    }

    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm_model = Some(model.into());
        self
    }

    pub fn llm_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.llm_provider = Some(provider);
        self.config.inference_backend = InferenceBackendKind::Llm;
        self
    }

    pub fn speech_backend(mut self, kind: SpeechBackendKind) -> Self {
        self.config.speech_backend = kind;
        self
    }

    pub fn tts_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.tts_base_url = url.into();
        self
    }

    pub fn tts_slow(mut self, slow: bool) -> Self {
        self.config.tts_slow = slow;
        self
    }

    pub fn uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.uploads_dir = dir.into();
        self
    }

    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.static_dir = dir.into();
        self
    }

    pub fn keep_uploads(mut self, keep: bool) -> Self {
        self.config.keep_uploads = keep;
        self
    }

    pub fn empty_page_policy(mut self, policy: EmptyPagePolicy) -> Self {
        self.config.empty_page_policy = policy;
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn inference_concurrency(mut self, n: usize) -> Self {
        self.config.inference_concurrency = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AbstractorConfig, AbstractorError> {
        let c = &self.config;
        let g = &c.generation;
        if g.max_length == 0 {
            return Err(AbstractorError::InvalidConfig(
                "Maximum summary length must be ≥ 1 token".into(),
            ));
        }
        if g.max_input_tokens == 0 {
            return Err(AbstractorError::InvalidConfig(
                "Input token budget must be ≥ 1 token".into(),
            ));
        }
        if g.num_beams == 0 {
            return Err(AbstractorError::InvalidConfig(
                "Beam width must be ≥ 1".into(),
            ));
        }
        if c.source_lang.is_empty() {
            return Err(AbstractorError::InvalidConfig(
                "Source language must not be empty".into(),
            ));
        }
        if c.request_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(AbstractorError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(AbstractorError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}
