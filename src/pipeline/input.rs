//! Input handling: validate an uploaded PDF and store it for extraction.
//!
//! pdfium opens documents by path, so uploads are written to the uploads
//! directory before extraction. We validate the PDF magic bytes (`%PDF`)
//! first so callers get a meaningful error rather than a pdfium failure.

use crate::error::AbstractorError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PDF_MAGIC: &[u8] = b"%PDF";

/// An uploaded document: raw bytes plus the file name the client sent.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reject empty uploads and anything that does not start with `%PDF`.
    pub fn validate(&self) -> Result<(), AbstractorError> {
        if self.bytes.is_empty() {
            return Err(AbstractorError::EmptyUpload {
                file_name: self.file_name.clone(),
            });
        }
        if !self.bytes.starts_with(PDF_MAGIC) {
            return Err(AbstractorError::NotAPdf {
                file_name: self.file_name.clone(),
                magic: self.bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
            });
        }
        Ok(())
    }
}

/// A validated upload written to the uploads directory.
///
/// Unless retention is on, the file is removed when this value is dropped.
#[derive(Debug)]
pub struct StoredUpload {
    path: PathBuf,
    keep: bool,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if !self.keep {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Failed to remove upload {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Validate `document` and write it as `<request_id>_<sanitised-name>.pdf`.
pub async fn store_upload(
    document: &Document,
    uploads_dir: &Path,
    request_id: &str,
    keep: bool,
) -> Result<StoredUpload, AbstractorError> {
    document.validate()?;

    let path = uploads_dir.join(format!(
        "{}_{}",
        request_id,
        sanitise_file_name(&document.file_name)
    ));

    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|source| AbstractorError::UploadWriteFailed {
            path: uploads_dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, &document.bytes)
        .await
        .map_err(|source| AbstractorError::UploadWriteFailed {
            path: path.clone(),
            source,
        })?;

    debug!("Stored upload ({} bytes): {}", document.bytes.len(), path.display());
    Ok(StoredUpload { path, keep })
}

/// Resolve a local PDF path, validating existence and magic bytes.
pub fn resolve_local(path: &Path) -> Result<PathBuf, AbstractorError> {
    use std::io::Read;

    let mut f = std::fs::File::open(path).map_err(|_| AbstractorError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    let mut magic = [0u8; 4];
    let read = f.read(&mut magic).unwrap_or(0);
    if read == 0 {
        return Err(AbstractorError::EmptyUpload {
            file_name: path.display().to_string(),
        });
    }
    if read < PDF_MAGIC.len() || magic[..] != *PDF_MAGIC {
        return Err(AbstractorError::NotAPdf {
            file_name: path.display().to_string(),
            magic: magic[..read].to_vec(),
        });
    }
    Ok(path.to_path_buf())
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory parts are dropped, anything outside `[A-Za-z0-9._-]` becomes
/// `_`, and the result always ends in `.pdf`.
pub fn sanitise_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let mut clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let stem_len = clean.trim_start_matches('.').len();
    if stem_len == 0 {
        clean = "document".to_string();
    } else {
        clean = clean.trim_start_matches('.').to_string();
    }
    if clean.len() > 100 {
        clean.truncate(100);
    }
    if !clean.to_ascii_lowercase().ends_with(".pdf") {
        clean.push_str(".pdf");
    }
    clean
}
