//! LLM inference backend: summarization and translation through a chat model.
//!
//! Any provider edgequake-llm knows (OpenAI, Anthropic, Gemini, Ollama, …)
//! can stand in for the seq2seq models. The generation config maps onto
//! completion options: `max_length` becomes `max_tokens`, and temperature is
//! pinned to 0 so the output is as repeatable as the provider allows.

use super::InferenceBackend;
use crate::config::{AbstractorConfig, GenerationConfig};
use crate::error::{AbstractorError, BackendError};
use crate::language::LanguageCode;
use crate::prompts::{summary_prompt, translation_prompt};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const SERVICE: &str = "llm";

/// Model used when a provider is named without a model.
const DEFAULT_LLM_MODEL: &str = "gpt-4.1-nano";

/// Inference backend driving an edgequake-llm chat provider.
#[derive(Clone)]
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    async fn complete(
        &self,
        system: String,
        user: &str,
        max_tokens: Option<usize>,
    ) -> Result<String, BackendError> {
        if user.trim().is_empty() {
            return Err(BackendError::Rejected("empty input text".to_string()));
        }

        let start = Instant::now();
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens,
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::Provider {
                service: SERVICE.to_string(),
                detail: e.to_string(),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            SERVICE,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(BackendError::InvalidResponse {
                service: SERVICE.to_string(),
                detail: "empty completion".to_string(),
            });
        }
        Ok(response.content)
    }
}

#[async_trait]
impl InferenceBackend for LlmBackend {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn summarize(
        &self,
        text: &str,
        generation: &GenerationConfig,
    ) -> Result<String, BackendError> {
        self.complete(
            summary_prompt(generation.max_length),
            text,
            Some(generation.max_length),
        )
        .await
    }

    fn supports_translation(&self, source: &LanguageCode, target: &LanguageCode) -> bool {
        !source.is_empty() && !target.is_empty()
    }

    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, BackendError> {
        self.complete(translation_prompt(source, target), text, None)
            .await
    }
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, AbstractorError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        AbstractorError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. `config.llm_provider`, used as-is.
/// 2. `config.llm_provider_name` with `config.llm_model`.
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 4. OpenAI, when `OPENAI_API_KEY` is set.
/// 5. Whatever [`ProviderFactory::from_env`] detects.
pub async fn resolve_provider(
    config: &AbstractorConfig,
) -> Result<Arc<dyn LLMProvider>, AbstractorError> {
    if let Some(ref provider) = config.llm_provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.llm_provider_name {
        let model = config.llm_model.as_deref().unwrap_or(DEFAULT_LLM_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.llm_model.as_deref().unwrap_or(DEFAULT_LLM_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AbstractorError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or choose --backend huggingface.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
