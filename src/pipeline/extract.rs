//! Text extraction: read every page's text layer via pdfium.
//!
//! pdfium wraps a C++ library with thread-local state, so all document work
//! runs inside `tokio::task::spawn_blocking`. Page ordering and the
//! empty-page policy live in [`assemble_pages`], which needs no native
//! library and is tested on its own.

use crate::config::{AbstractorConfig, EmptyPagePolicy};
use crate::error::AbstractorError;
use crate::output::ExtractedText;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns a stored PDF into its text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<ExtractedText, AbstractorError>;
}

/// [`TextExtractor`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor {
    password: Option<String>,
    pdfium_lib_path: Option<PathBuf>,
    policy: EmptyPagePolicy,
}

impl PdfTextExtractor {
    pub fn from_config(config: &AbstractorConfig) -> Self {
        Self {
            password: config.pdf_password.clone(),
            pdfium_lib_path: config.pdfium_lib_path.clone(),
            policy: config.empty_page_policy,
        }
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path) -> Result<ExtractedText, AbstractorError> {
        if !path.exists() {
            return Err(AbstractorError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let start = Instant::now();
        let owned_path = path.to_path_buf();
        let password = self.password.clone();
        let lib_path = self.pdfium_lib_path.clone();

        let pages = tokio::task::spawn_blocking(move || {
            read_pages_blocking(&owned_path, password.as_deref(), lib_path.as_deref())
        })
        .await
        .map_err(|e| AbstractorError::Internal(format!("Extraction task panicked: {}", e)))??;

        let extracted = assemble_pages(path, pages, self.policy)?;
        info!(
            "Extracted {} chars from {} pages in {}ms",
            extracted.text.len(),
            extracted.page_count,
            start.elapsed().as_millis()
        );
        Ok(extracted)
    }
}

/// Concatenate per-page text in ascending page order.
///
/// `pages` holds one entry per page, in document order, and the result is
/// exactly their concatenation. Pages whose text is blank are recorded in
/// `empty_pages` (1-indexed); `policy` decides whether that is silent, logged,
/// or fatal.
pub fn assemble_pages(
    path: &Path,
    pages: Vec<String>,
    policy: EmptyPagePolicy,
) -> Result<ExtractedText, AbstractorError> {
    let page_count = pages.len();
    let mut empty_pages = Vec::new();
    let mut text = String::with_capacity(pages.iter().map(String::len).sum());

    for (idx, page_text) in pages.into_iter().enumerate() {
        let page_num = idx + 1;
        if page_text.trim().is_empty() {
            match policy {
                EmptyPagePolicy::Ignore => {}
                EmptyPagePolicy::Warn => {
                    warn!("Page {} of {} has no extractable text", page_num, path.display())
                }
                EmptyPagePolicy::Reject => {
                    return Err(AbstractorError::EmptyPage {
                        path: path.to_path_buf(),
                        page: page_num,
                    })
                }
            }
            empty_pages.push(page_num);
        }
        text.push_str(&page_text);
    }

    Ok(ExtractedText {
        text,
        page_count,
        empty_pages,
    })
}

fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, AbstractorError> {
    let bound = match lib_path {
        Some(p) => pdfium_auto::bind_pdfium_from_path(p),
        None => pdfium_auto::bind_pdfium_silent(),
    };
    bound.map_err(|e| AbstractorError::PdfiumBindingFailed(e.to_string()))
}

/// Blocking implementation: open the document and read each page's text.
fn read_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<Vec<String>, AbstractorError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            AbstractorError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        } else {
            AbstractorError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| AbstractorError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?
            .all();
        debug!("Page {}: {} chars", idx + 1, text.len());
        texts.push(text);
    }
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn concatenates_in_page_order() {
        let out = assemble_pages(
            Path::new("a.pdf"),
            pages(&["First page. ", "Second page. ", "Third page."]),
            EmptyPagePolicy::Warn,
        )
        .unwrap();
        assert_eq!(out.text, "First page. Second page. Third page.");
        assert_eq!(out.page_count, 3);
        assert!(out.empty_pages.is_empty());
    }

    #[test]
    fn empty_page_contributes_nothing() {
        let out = assemble_pages(
            Path::new("a.pdf"),
            pages(&["Intro. ", "", "Outro."]),
            EmptyPagePolicy::Ignore,
        )
        .unwrap();
        assert_eq!(out.text, "Intro. Outro.");
        assert_eq!(out.empty_pages, vec![2]);
    }

    #[test]
    fn whitespace_only_page_keeps_its_separator() {
        let out = assemble_pages(
            Path::new("a.pdf"),
            pages(&["A", "\n", "B"]),
            EmptyPagePolicy::Ignore,
        )
        .unwrap();
        assert_eq!(out.text, "A\nB");
        assert_eq!(out.empty_pages, vec![2]);
    }

    #[test]
    fn reject_policy_fails_on_empty_page() {
        let err = assemble_pages(
            Path::new("a.pdf"),
            pages(&["Intro.", ""]),
            EmptyPagePolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, AbstractorError::EmptyPage { page: 2, .. }));
    }

    #[test]
    fn all_pages_empty_yields_blank_text() {
        let out = assemble_pages(Path::new("a.pdf"), pages(&["", ""]), EmptyPagePolicy::Warn)
            .unwrap();
        assert!(out.is_blank());
        assert_eq!(out.empty_pages, vec![1, 2]);
    }

    #[tokio::test]
    async fn missing_file_is_reported_before_binding() {
        let extractor = PdfTextExtractor::default();
        let err = extractor
            .extract(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AbstractorError::FileNotFound { .. }));
    }
}
