//! Translation stage.

use crate::backend::InferenceBackend;
use crate::error::{AbstractorError, Stage};
use crate::language::LanguageCode;
use crate::output::{Summary, TranslatedSummary};
use crate::pipeline::postprocess::clean_generated_text;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Renders a summary into a requested target language.
pub struct Translator {
    backend: Arc<dyn InferenceBackend>,
    permits: Arc<Semaphore>,
}

impl Translator {
    pub fn new(backend: Arc<dyn InferenceBackend>, permits: Arc<Semaphore>) -> Self {
        Self { backend, permits }
    }

    /// Fails with `UnsupportedLanguage` when the backend cannot produce
    /// `target`. Checked before any backend call.
    pub fn check_target(
        &self,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<(), AbstractorError> {
        if target.is_empty() || !self.backend.supports_translation(source, target) {
            return Err(AbstractorError::UnsupportedLanguage {
                code: target.to_string(),
                stage: Stage::Translation,
            });
        }
        Ok(())
    }

    /// Translate `summary` into `target` in one generation pass.
    pub async fn translate(
        &self,
        summary: &Summary,
        target: &LanguageCode,
    ) -> Result<TranslatedSummary, AbstractorError> {
        self.check_target(&summary.language, target)?;

        if summary.text.trim().is_empty() {
            return Err(AbstractorError::TranslationFailed {
                target: target.to_string(),
                reason: "nothing to translate".to_string(),
                source: None,
            });
        }

        let raw = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| AbstractorError::Internal(format!("inference semaphore: {e}")))?;
            self.backend
                .translate(&summary.text, &summary.language, target)
                .await
                .map_err(|e| AbstractorError::TranslationFailed {
                    target: target.to_string(),
                    reason: format!("{} backend failed", self.backend.name()),
                    source: Some(e),
                })?
        };

        let text = clean_generated_text(&raw);
        if text.is_empty() {
            return Err(AbstractorError::TranslationFailed {
                target: target.to_string(),
                reason: "model returned an empty translation".to_string(),
                source: None,
            });
        }

        Ok(TranslatedSummary {
            text,
            source_language: summary.language.clone(),
            target_language: target.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::error::BackendError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InferenceBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        async fn summarize(
            &self,
            text: &str,
            _generation: &GenerationConfig,
        ) -> Result<String, BackendError> {
            Ok(text.to_string())
        }

        async fn translate(
            &self,
            text: &str,
            _source: &LanguageCode,
            target: &LanguageCode,
        ) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("__{}__ {} </s>", target.as_str(), text))
        }
    }

    fn summary(text: &str) -> Summary {
        Summary {
            text: text.to_string(),
            language: LanguageCode::new("en"),
            input_truncated: false,
        }
    }

    #[tokio::test]
    async fn output_is_tagged_with_requested_target() {
        let backend = Arc::new(CountingBackend::default());
        let t = Translator::new(backend.clone(), Arc::new(Semaphore::new(1)));
        let out = t
            .translate(&summary("The parties agree."), &LanguageCode::new("DE"))
            .await
            .unwrap();
        assert_eq!(out.target_language.as_str(), "de");
        assert_eq!(out.source_language.as_str(), "en");
        assert_eq!(out.text, "The parties agree.");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsupported_target_fails_before_backend_call() {
        let backend = Arc::new(CountingBackend::default());
        let t = Translator::new(backend.clone(), Arc::new(Semaphore::new(1)));
        for code in ["xx", "", "klingon"] {
            let err = t
                .translate(&summary("Text."), &LanguageCode::new(code))
                .await
                .unwrap_err();
            assert!(err.is_unsupported_language(), "{code}: {err}");
            assert_eq!(err.stage(), Stage::Translation);
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}
