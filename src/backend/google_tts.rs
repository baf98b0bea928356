//! Google Translate text-to-speech backend.
//!
//! The endpoint speaks at most about 100 characters per request, so text is
//! split into chunks at sentence punctuation (then at spaces), each chunk is
//! fetched as its own MP3, and the MP3 frames are concatenated in order.
//! MP3 is a frame stream, so the concatenation is itself a playable file.

use super::{truncate_body, SpeechBackend};
use crate::config::AbstractorConfig;
use crate::error::{AbstractorError, BackendError};
use crate::language::LanguageCode;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::{Duration, Instant};
use tracing::debug;

const SERVICE: &str = "google-tts";

/// Longest chunk the endpoint accepts in one request.
pub const MAX_CHUNK_CHARS: usize = 100;

/// Chunks fetched in parallel per synthesis call.
const CHUNK_CONCURRENCY: usize = 4;

/// Speech backend for the Google Translate TTS endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTtsBackend {
    client: reqwest::Client,
    base_url: String,
    slow: bool,
    timeout_secs: u64,
}

impl GoogleTtsBackend {
    pub fn from_config(config: &AbstractorConfig) -> Result<Self, AbstractorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .user_agent(concat!("pdf-abstractor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AbstractorError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.tts_base_url.trim_end_matches('/').to_string(),
            slow: config.tts_slow,
            timeout_secs: config.api_timeout_secs,
        })
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        lang: &str,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}/translate_tts", self.base_url);
        let speed = if self.slow { "0.3" } else { "1" };
        let response = self
            .client
            .get(url)
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", lang),
                ("client", "tw-ob"),
                ("ttsspeed", speed),
                ("total", &total.to_string()),
                ("idx", &idx.to_string()),
                ("textlen", &chunk.chars().count().to_string()),
            ])
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(SERVICE, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::from_reqwest(SERVICE, self.timeout_secs, e))?;
        if bytes.is_empty() {
            return Err(BackendError::InvalidResponse {
                service: SERVICE.to_string(),
                detail: format!("empty audio for chunk {}/{}", idx + 1, total),
            });
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechBackend for GoogleTtsBackend {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn synthesize(
        &self,
        text: &str,
        language: &LanguageCode,
    ) -> Result<Vec<u8>, BackendError> {
        let chunks = split_for_speech(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(BackendError::Rejected(
                "no speakable text after cleanup".to_string(),
            ));
        }

        let start = Instant::now();
        let lang = language.google_tts_code();
        let total = chunks.len();

        // `buffered` keeps chunk order while fetching ahead.
        let parts: Vec<Vec<u8>> = stream::iter(chunks.into_iter().enumerate())
            .map(|(idx, chunk)| {
                let lang = lang.clone();
                async move { self.fetch_chunk(&chunk, &lang, idx, total).await }
            })
            .buffered(CHUNK_CONCURRENCY)
            .try_collect()
            .await?;

        let audio = parts.concat();
        debug!(
            "{}: {} chunks, {} bytes, {:?}",
            lang,
            total,
            audio.len(),
            start.elapsed()
        );
        Ok(audio)
    }
}

static RE_PUNCT_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?;:,\u{3002}\u{FF01}\u{FF1F}\u{060C}\u{061F}\n]+[.!?;:,\u{3002}\u{FF01}\u{FF1F}\u{060C}\u{061F}\n]*").unwrap());

static RE_ONLY_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{P}\s]*$").unwrap());

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Pieces end at sentence or clause punctuation where possible; a piece that
/// is still too long is cut at its last space before the limit, or hard at
/// the limit when it has no spaces. Adjacent short pieces are merged back up
/// to the limit, and pieces with nothing to pronounce are dropped.
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);

    let mut pieces: Vec<String> = Vec::new();
    for m in RE_PUNCT_SPLIT.find_iter(text) {
        let piece = m.as_str().trim();
        if piece.is_empty() {
            continue;
        }
        pieces.extend(cut_long(piece, max_chars));
    }

    let mut chunks: Vec<String> = Vec::new();
    for piece in pieces {
        match chunks.last_mut() {
            Some(last) if last.chars().count() + 1 + piece.chars().count() <= max_chars => {
                last.push(' ');
                last.push_str(&piece);
            }
            _ => chunks.push(piece),
        }
    }

    chunks.retain(|c| !RE_ONLY_PUNCT.is_match(c));
    chunks
}

/// Cut one piece into parts of at most `max_chars`, preferring spaces.
fn cut_long(piece: &str, max_chars: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = piece.trim();
    while rest.chars().count() > max_chars {
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = rest[..limit]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        parts.push(rest[..cut].trim_end().to_string());
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}
