//! Speech synthesis stage: text → MP3 file in the static directory.

use crate::backend::SpeechBackend;
use crate::error::{AbstractorError, Stage};
use crate::language::LanguageCode;
use crate::output::AudioArtifact;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// URL prefix under which the static directory is served.
pub const STATIC_URL_PREFIX: &str = "/static";

/// File name of the source-language summary audio for one request.
pub fn summary_audio_name(request_id: &str) -> String {
    format!("english_summary_{request_id}.mp3")
}

/// File name of the translated summary audio for one request.
pub fn translation_audio_name(target: &LanguageCode, request_id: &str) -> String {
    format!("translated_summary_{}_{request_id}.mp3", target.as_str())
}

/// Writes spoken versions of text into the static directory.
pub struct Synthesizer {
    backend: Arc<dyn SpeechBackend>,
    output_dir: PathBuf,
}

impl Synthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Fails with `UnsupportedLanguage` when the backend cannot speak `language`.
    pub fn check_language(&self, language: &LanguageCode) -> Result<(), AbstractorError> {
        if language.is_empty() || !self.backend.supports_language(language) {
            return Err(AbstractorError::UnsupportedLanguage {
                code: language.to_string(),
                stage: Stage::Synthesis,
            });
        }
        Ok(())
    }

    /// Synthesize `text` in `language` and write it as `file_name`.
    ///
    /// The file appears only once complete (temp file + rename); on any
    /// failure nothing is left at `file_name`.
    pub async fn synthesize(
        &self,
        text: &str,
        language: &LanguageCode,
        file_name: &str,
    ) -> Result<AudioArtifact, AbstractorError> {
        self.check_language(language)?;

        if text.trim().is_empty() {
            return Err(AbstractorError::SynthesisFailed {
                language: language.to_string(),
                reason: "text is empty".to_string(),
                source: None,
            });
        }

        let audio = self
            .backend
            .synthesize(text, language)
            .await
            .map_err(|e| AbstractorError::SynthesisFailed {
                language: language.to_string(),
                reason: format!("{} backend failed", self.backend.name()),
                source: Some(e),
            })?;

        if audio.is_empty() {
            return Err(AbstractorError::SynthesisFailed {
                language: language.to_string(),
                reason: "backend returned no audio".to_string(),
                source: None,
            });
        }

        let path = self.output_dir.join(file_name);
        write_atomic(&path, &audio).await?;
        debug!("Wrote {} bytes of audio to {}", audio.len(), path.display());

        Ok(AudioArtifact {
            file_name: file_name.to_string(),
            url: format!("{STATIC_URL_PREFIX}/{file_name}"),
            language: language.clone(),
            size_bytes: audio.len() as u64,
            path,
        })
    }

    /// Delete an artifact written by an earlier call.
    pub async fn discard(&self, artifact: &AudioArtifact) {
        if let Err(e) = tokio::fs::remove_file(&artifact.path).await {
            warn!("Failed to remove {}: {}", artifact.path.display(), e);
        }
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AbstractorError> {
    let write_err = |source| AbstractorError::AudioWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("mp3.tmp");
    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_names_are_request_keyed() {
        assert_eq!(summary_audio_name("abc"), "english_summary_abc.mp3");
        assert_eq!(
            translation_audio_name(&"es".into(), "abc"),
            "translated_summary_es_abc.mp3"
        );
    }

    #[tokio::test]
    async fn write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.mp3");
        write_atomic(&path, b"ID3").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3");
        assert!(!path.with_extension("mp3.tmp").exists());
    }
}
