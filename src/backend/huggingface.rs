//! Hugging Face inference API backend.
//!
//! Runs the summarization and translation models behind an HTTP inference
//! endpoint (the hosted API, an Inference Endpoint, or a self-hosted
//! server speaking the same protocol). Generation parameters are forwarded
//! unchanged, so the server runs the same beam search the config describes.
//!
//! ## Wire format
//!
//! ```text
//! POST {base_url}/{model}
//! {"inputs": "...", "parameters": {...}, "options": {"wait_for_model": true}}
//!
//! 200 [{"summary_text": "..."}]        summarization
//! 200 [{"translation_text": "..."}]    translation
//! 503 {"error": "...", "estimated_time": 20.0}
//! ```

use super::{truncate_body, InferenceBackend};
use crate::config::{AbstractorConfig, GenerationConfig};
use crate::error::{AbstractorError, BackendError};
use crate::language::LanguageCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

const SERVICE: &str = "huggingface";

/// Inference backend for the Hugging Face HTTP inference API.
#[derive(Debug, Clone)]
pub struct HuggingFaceBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    wait_for_model: bool,
    summarization_model: String,
    translation_model: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct InferenceRequest<'a, P: Serialize> {
    inputs: &'a str,
    parameters: P,
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
    use_cache: bool,
}

#[derive(Serialize)]
struct SummarizationParameters {
    max_length: usize,
    num_beams: u32,
    length_penalty: f32,
    repetition_penalty: f32,
    early_stopping: bool,
    do_sample: bool,
    truncation: &'static str,
}

impl From<&GenerationConfig> for SummarizationParameters {
    fn from(g: &GenerationConfig) -> Self {
        Self {
            max_length: g.max_length,
            num_beams: g.num_beams,
            length_penalty: g.length_penalty,
            repetition_penalty: g.repetition_penalty,
            early_stopping: g.early_stopping,
            do_sample: false,
            truncation: "only_first",
        }
    }
}

#[derive(Serialize)]
struct TranslationParameters<'a> {
    src_lang: &'a str,
    tgt_lang: &'a str,
    truncation: &'static str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Value,
    #[serde(default)]
    estimated_time: Option<f64>,
}

impl HuggingFaceBackend {
    /// Build a backend from the model ids, endpoint and timeouts in `config`.
    pub fn from_config(config: &AbstractorConfig) -> Result<Self, AbstractorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| AbstractorError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.hf_base_url.trim_end_matches('/').to_string(),
            token: config.resolved_hf_token(),
            wait_for_model: config.hf_wait_for_model,
            summarization_model: config.summarization_model.clone(),
            translation_model: config.translation_model.clone(),
            timeout_secs: config.api_timeout_secs,
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.base_url, model)
    }

    /// POST one inference request and return the first generated text.
    async fn infer<P: Serialize + Send + Sync>(
        &self,
        model: &str,
        inputs: &str,
        parameters: P,
    ) -> Result<String, BackendError> {
        let start = Instant::now();
        let body = InferenceRequest {
            inputs,
            parameters,
            options: InferenceOptions {
                wait_for_model: self.wait_for_model,
                use_cache: true,
            },
        };

        let mut request = self.client.post(self.model_url(model)).json(&body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(SERVICE, self.timeout_secs, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::from_reqwest(SERVICE, self.timeout_secs, e))?;

        if !status.is_success() {
            return Err(classify_failure(model, status.as_u16(), &text));
        }

        let generated = first_generated_text(&text)?;
        debug!(
            "{}: {} chars in → {} chars out, {:?}",
            model,
            inputs.len(),
            generated.len(),
            start.elapsed()
        );
        Ok(generated)
    }
}

#[async_trait]
impl InferenceBackend for HuggingFaceBackend {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn summarize(
        &self,
        text: &str,
        generation: &GenerationConfig,
    ) -> Result<String, BackendError> {
        self.infer(
            &self.summarization_model,
            text,
            SummarizationParameters::from(generation),
        )
        .await
    }

    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, BackendError> {
        self.infer(
            &self.translation_model,
            text,
            TranslationParameters {
                src_lang: source.as_str(),
                tgt_lang: target.as_str(),
                truncation: "only_first",
            },
        )
        .await
    }
}

/// Map a non-success response onto [`BackendError`].
fn classify_failure(model: &str, status: u16, body: &str) -> BackendError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();

    if status == 401 || status == 403 {
        return BackendError::Auth {
            service: SERVICE.to_string(),
            detail: parsed
                .map(|b| value_to_message(&b.error))
                .unwrap_or_else(|| truncate_body(body)),
        };
    }

    if status == 503 {
        if let Some(estimated_secs) = parsed.as_ref().and_then(|b| b.estimated_time) {
            return BackendError::ModelLoading {
                model: model.to_string(),
                estimated_secs,
            };
        }
    }

    BackendError::Http {
        service: SERVICE.to_string(),
        status,
        body: parsed
            .map(|b| value_to_message(&b.error))
            .unwrap_or_else(|| truncate_body(body)),
    }
}

fn value_to_message(v: &Value) -> String {
    match v {
        Value::String(s) => truncate_body(s),
        Value::Array(items) => items
            .iter()
            .map(value_to_message)
            .collect::<Vec<_>>()
            .join("; "),
        other => truncate_body(&other.to_string()),
    }
}

/// Pull the generated text out of a pipeline response.
///
/// Accepts `[{"summary_text"}]`, `[{"translation_text"}]`,
/// `[{"generated_text"}]` and the same objects without the outer array.
fn first_generated_text(body: &str) -> Result<String, BackendError> {
    let invalid = |detail: String| BackendError::InvalidResponse {
        service: SERVICE.to_string(),
        detail,
    };

    let value: Value =
        serde_json::from_str(body).map_err(|e| invalid(format!("not JSON ({e}): {}", truncate_body(body))))?;

    let item = match &value {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| invalid("empty result array".to_string()))?,
        obj @ Value::Object(_) => obj,
        other => return Err(invalid(format!("unexpected JSON: {}", truncate_body(&other.to_string())))),
    };

    ["summary_text", "translation_text", "generated_text"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("no generated text in {}", truncate_body(&item.to_string()))))
}
