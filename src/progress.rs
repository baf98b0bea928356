//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::AbstractorConfigBuilder::progress_callback`] to receive
//! events as a request moves through extraction, summarization, translation
//! and synthesis.
//!
//! # Example
//!
//! ```rust
//! use pdf_abstractor::{AbstractorConfig, PipelineProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, _request_id: &str, stage: Stage, elapsed_ms: u64) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//! let config = AbstractorConfig::builder()
//!     .progress_callback(cb as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::Stage;
use std::sync::Arc;

/// Called by the pipeline as each request advances.
///
/// Implementations must be `Send + Sync`: the web server runs many requests
/// at once and both synthesis calls of one request run concurrently. All
/// methods have default no-op implementations.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once when a request enters the pipeline.
    fn on_pipeline_start(&self, request_id: &str) {
        let _ = request_id;
    }

    /// Called just before a stage begins.
    fn on_stage_start(&self, request_id: &str, stage: Stage) {
        let _ = (request_id, stage);
    }

    /// Called when a stage produced its output.
    fn on_stage_complete(&self, request_id: &str, stage: Stage, elapsed_ms: u64) {
        let _ = (request_id, stage, elapsed_ms);
    }

    /// Called when a stage failed; the request is aborted afterwards.
    fn on_stage_error(&self, request_id: &str, stage: Stage, error: &str) {
        let _ = (request_id, stage, error);
    }

    /// Called once after the request finished, successfully or not.
    fn on_pipeline_complete(&self, request_id: &str, success: bool) {
        let _ = (request_id, success);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AbstractorConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
