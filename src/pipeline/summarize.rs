//! Summarization stage.

use crate::backend::InferenceBackend;
use crate::config::GenerationConfig;
use crate::error::AbstractorError;
use crate::language::LanguageCode;
use crate::output::Summary;
use crate::pipeline::postprocess::{clean_generated_text, truncate_to_tokens};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Produces an abstractive summary of extracted document text.
pub struct Summarizer {
    backend: Arc<dyn InferenceBackend>,
    generation: GenerationConfig,
    language: LanguageCode,
    permits: Arc<Semaphore>,
}

impl Summarizer {
    /// `permits` bounds concurrent inference calls; share it with the
    /// [`Translator`](super::translate::Translator) built on the same backend.
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        generation: GenerationConfig,
        language: LanguageCode,
        permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            backend,
            generation,
            language,
            permits,
        }
    }

    /// Summarize `text`.
    ///
    /// The input is cut to `max_input_tokens` first; the output is cleaned of
    /// control tokens and never longer than `max_length` tokens.
    pub async fn summarize(&self, text: &str) -> Result<Summary, AbstractorError> {
        if text.trim().is_empty() {
            return Err(AbstractorError::SummarizationFailed {
                reason: "document contains no extractable text".to_string(),
                source: None,
            });
        }

        let (input, input_truncated) = truncate_to_tokens(text, self.generation.max_input_tokens);
        if input_truncated {
            info!(
                "Summarizer input cut to {} tokens",
                self.generation.max_input_tokens
            );
        }

        let raw = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| AbstractorError::Internal(format!("inference semaphore: {e}")))?;
            self.backend
                .summarize(input, &self.generation)
                .await
                .map_err(|e| AbstractorError::SummarizationFailed {
                    reason: format!("{} backend failed", self.backend.name()),
                    source: Some(e),
                })?
        };

        let cleaned = clean_generated_text(&raw);
        let (clamped, over_budget) = truncate_to_tokens(&cleaned, self.generation.max_length);
        if over_budget {
            debug!(
                "Summary clamped to {} tokens",
                self.generation.max_length
            );
        }
        if clamped.is_empty() {
            return Err(AbstractorError::SummarizationFailed {
                reason: "model returned an empty summary".to_string(),
                source: None,
            });
        }

        Ok(Summary {
            text: clamped.to_string(),
            language: self.language.clone(),
            input_truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::pipeline::postprocess::count_tokens;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes its input, or returns a fixed reply when one is set.
    struct EchoBackend {
        reply: Option<String>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InferenceBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn summarize(
            &self,
            text: &str,
            _generation: &GenerationConfig,
        ) -> Result<String, BackendError> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self.reply.clone().unwrap_or_else(|| text.to_string()))
        }

        async fn translate(
            &self,
            text: &str,
            _source: &LanguageCode,
            _target: &LanguageCode,
        ) -> Result<String, BackendError> {
            Ok(text.to_string())
        }
    }

    fn summarizer(
        reply: Option<&str>,
        max_input: usize,
        max_len: usize,
    ) -> (Summarizer, Arc<EchoBackend>) {
        let backend = Arc::new(EchoBackend {
            reply: reply.map(str::to_string),
            seen: Mutex::new(Vec::new()),
        });
        let generation = GenerationConfig {
            max_input_tokens: max_input,
            max_length: max_len,
            ..Default::default()
        };
        let s = Summarizer::new(
            backend.clone(),
            generation,
            LanguageCode::new("en"),
            Arc::new(Semaphore::new(1)),
        );
        (s, backend)
    }

    #[tokio::test]
    async fn short_input_is_not_truncated() {
        let (s, backend) = summarizer(None, 100, 100);
        let out = s.summarize("The parties agree.").await.unwrap();
        assert!(!out.input_truncated);
        assert_eq!(backend.seen.lock().unwrap()[0], "The parties agree.");
        assert_eq!(out.language.as_str(), "en");
    }

    #[tokio::test]
    async fn long_input_is_cut_to_budget() {
        let (s, backend) = summarizer(Some("Short."), 3, 100);
        let out = s.summarize("one two three four five").await.unwrap();
        assert!(out.input_truncated);
        assert_eq!(backend.seen.lock().unwrap()[0], "one two three");
    }

    #[tokio::test]
    async fn output_never_exceeds_max_length() {
        let reply = (0..50).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let (s, _) = summarizer(Some(&reply), 1024, 10);
        let out = s.summarize("text").await.unwrap();
        assert_eq!(count_tokens(&out.text), 10);
    }

    #[tokio::test]
    async fn control_tokens_only_is_an_error() {
        let (s, _) = summarizer(Some("<pad></s>"), 1024, 512);
        let err = s.summarize("text").await.unwrap_err();
        assert!(matches!(err, AbstractorError::SummarizationFailed { source: None, .. }));
    }

    #[tokio::test]
    async fn blank_input_never_reaches_backend() {
        let (s, backend) = summarizer(None, 1024, 512);
        assert!(s.summarize(" \n ").await.is_err());
        assert!(backend.seen.lock().unwrap().is_empty());
    }
}
