//! Inference and speech backends.
//!
//! The pipeline never talks to a model or a speech service directly. It
//! holds an [`InferenceBackend`] (summarization + translation) and a
//! [`SpeechBackend`] (text-to-speech), both built once at start-up and shared
//! read-only between requests. Tests substitute fakes.
//!
//! | Backend | Serves | Transport |
//! |---------|--------|-----------|
//! | [`HuggingFaceBackend`] | Pegasus summarization, M2M100 translation | HTTP inference API |
//! | [`LlmBackend`]         | both, through prompts | any edgequake-llm provider |
//! | [`GoogleTtsBackend`]   | speech | Google Translate TTS endpoint |

mod google_tts;
mod huggingface;
mod llm;

pub use google_tts::{split_for_speech, GoogleTtsBackend, MAX_CHUNK_CHARS};
pub use huggingface::HuggingFaceBackend;
pub use llm::{resolve_provider, LlmBackend};

use crate::config::{AbstractorConfig, GenerationConfig, InferenceBackendKind, SpeechBackendKind};
use crate::error::{AbstractorError, BackendError};
use crate::language::{google_tts_supports, m2m100_supports, LanguageCode};
use async_trait::async_trait;
use std::sync::Arc;

/// Summarization and translation models.
///
/// Calls may run concurrently from many requests; implementations must be
/// safe for shared read-only use.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Produce an abstractive summary of `text` using `generation`.
    ///
    /// `text` is already cut to `generation.max_input_tokens`.
    async fn summarize(
        &self,
        text: &str,
        generation: &GenerationConfig,
    ) -> Result<String, BackendError>;

    /// Whether `source → target` can be translated. Checked before every
    /// [`translate`](Self::translate) call.
    fn supports_translation(&self, source: &LanguageCode, target: &LanguageCode) -> bool {
        m2m100_supports(source) && m2m100_supports(target)
    }

    /// Translate `text` from `source` into `target` in one generation pass.
    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, BackendError>;
}

/// Text-to-speech service producing MP3 audio.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether speech in `language` can be produced.
    fn supports_language(&self, language: &LanguageCode) -> bool {
        google_tts_supports(language)
    }

    /// Synthesize `text` spoken in `language`; returns encoded audio bytes.
    async fn synthesize(&self, text: &str, language: &LanguageCode)
        -> Result<Vec<u8>, BackendError>;
}

/// Build the inference backend selected in `config`.
pub async fn build_inference_backend(
    config: &AbstractorConfig,
) -> Result<Arc<dyn InferenceBackend>, AbstractorError> {
    match config.inference_backend {
        InferenceBackendKind::HuggingFace => Ok(Arc::new(HuggingFaceBackend::from_config(config)?)),
        InferenceBackendKind::Llm => {
            let provider = resolve_provider(config).await?;
            Ok(Arc::new(LlmBackend::new(provider)))
        }
    }
}

/// Build the speech backend selected in `config`.
pub fn build_speech_backend(
    config: &AbstractorConfig,
) -> Result<Arc<dyn SpeechBackend>, AbstractorError> {
    match config.speech_backend {
        SpeechBackendKind::GoogleTts => Ok(Arc::new(GoogleTtsBackend::from_config(config)?)),
    }
}

/// Shorten a response body for inclusion in an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 300;
    let body = body.trim();
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}\u{2026}", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_limits_length() {
        let long = "x".repeat(1000);
        let short = truncate_body(&long);
        assert_eq!(short.chars().count(), 301);
        assert_eq!(truncate_body("  ok \n"), "ok");
    }

    #[tokio::test]
    async fn default_config_builds_both_backends() {
        let config = AbstractorConfig::default();
        let inference = build_inference_backend(&config).await.unwrap();
        let speech = build_speech_backend(&config).unwrap();
        assert_eq!(inference.name(), "huggingface");
        assert_eq!(speech.name(), "google-tts");
        assert!(inference.supports_translation(&"en".into(), &"es".into()));
        assert!(!inference.supports_translation(&"en".into(), &"xx".into()));
        assert!(speech.supports_language(&"es".into()));
    }
}
