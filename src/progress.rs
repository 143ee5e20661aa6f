//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive
//! events as the driver works through the input directory.
//!
//! # Why callbacks instead of log lines?
//!
//! The library already logs every transition through `tracing`. A callback
//! gives the host a typed view of the same events, so the CLI can drive a
//! terminal progress bar and a test can count events without scraping log
//! output.
//!
//! # Example
//!
//! ```rust
//! use paper_translate::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, name: &str, failed_translations: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name}: done ({failed_translations} paragraph failures)");
//!     }
//! }
//!
//! let config = BatchConfig::builder()
//!     .api_key("key")
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{BatchSummary, Stage};
use std::sync::Arc;

/// Called by the batch driver as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The driver is sequential, but the trait is
/// `Send + Sync` so a callback can be shared with other tasks.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after the input directory has been enumerated.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document's resume plan is computed.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in the batch
    /// * `total` — number of documents in the batch
    /// * `name`  — document base name
    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a pipeline stage begins for the current document.
    fn on_stage(&self, name: &str, stage: Stage) {
        let _ = (name, stage);
    }

    /// Called every `progress_every` paragraphs during body translation.
    fn on_paragraph_progress(&self, name: &str, done: usize, total: usize) {
        let _ = (name, done, total);
    }

    /// Called when the final artifact already existed and nothing ran.
    fn on_document_cached(&self, name: &str) {
        let _ = name;
    }

    /// Called when the final artifact has been written.
    fn on_document_complete(&self, name: &str, failed_translations: usize) {
        let _ = (name, failed_translations);
    }

    /// Called when a document was abandoned.
    fn on_document_error(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called once after the loop ends, including after an early abort.
    fn on_batch_complete(&self, summary: &BatchSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started: AtomicUsize,
        cached: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_document_start(&self, _index: usize, _total: usize, _name: &str) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_cached(&self, _name: &str) {
            self.cached.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _name: &str, _failed: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3);
        cb.on_document_start(1, 3, "paper");
        cb.on_stage("paper", Stage::Extract);
        cb.on_paragraph_progress("paper", 10, 42);
        cb.on_document_cached("paper");
        cb.on_document_complete("paper", 0);
        cb.on_document_error("paper", "HTTP 500");
        cb.on_batch_complete(&BatchSummary::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_document_start(1, 3, "a");
        tracker.on_document_complete("a", 0);
        tracker.on_document_start(2, 3, "b");
        tracker.on_document_cached("b");
        tracker.on_document_start(3, 3, "c");
        tracker.on_document_error("c", "no body text");

        assert_eq!(tracker.started.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.cached.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
