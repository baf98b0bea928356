//! Pipeline stages for PDF abstraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and backed by a different implementation.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ summarize ──▶ translate ──▶ synthesize
//! (upload)  (pdfium)    (Pegasus)     (M2M100)      (TTS → mp3)
//! ```
//!
//! 1. [`input`]:      validate the `%PDF` magic and store the upload
//! 2. [`extract`]:    read every page's text layer; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`summarize`]:  token budget in, bounded abstractive summary out
//! 4. [`translate`]:  language check first, then one generation pass
//! 5. [`synthesize`]: speech audio written atomically under the static dir
//! 6. [`postprocess`]: deterministic cleanup shared by 3 and 4

pub mod extract;
pub mod input;
pub mod postprocess;
pub mod summarize;
pub mod synthesize;
pub mod translate;
