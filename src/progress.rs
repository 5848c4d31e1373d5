//! Progress-callback trait for per-document and per-chunk events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks each document's chunks.
//!
//! # Example
//!
//! ```rust
//! use putusan_extract::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     chunks: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, key: &str, chunk: usize, total: usize, _populated: usize) {
//!         self.chunks.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{key}: chunk {chunk}/{total} merged");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { chunks: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes documents and their chunks.
///
/// Implementations must be `Send + Sync`: batch runs process several
/// documents concurrently, so events for different keys may interleave.
/// Events for one key always arrive in chunk order. All methods have no-op
/// defaults so callers only override what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the document has been split.
    ///
    /// # Arguments
    /// * `key`: document key (decision number)
    /// * `total_chunks`: number of chunks that will be processed
    /// * `total_pages`: page count of the source PDF
    fn on_document_start(&self, key: &str, total_chunks: usize, total_pages: usize) {
        let _ = (key, total_chunks, total_pages);
    }

    /// Called just before the first model call for a chunk.
    fn on_chunk_start(&self, key: &str, chunk: usize, total_chunks: usize) {
        let _ = (key, chunk, total_chunks);
    }

    /// Called when a chunk's result has been merged.
    ///
    /// `populated` is the number of top-level fields now holding a value.
    fn on_chunk_complete(&self, key: &str, chunk: usize, total_chunks: usize, populated: usize) {
        let _ = (key, chunk, total_chunks, populated);
    }

    /// Called when every model failed for a chunk. The run continues.
    fn on_chunk_error(&self, key: &str, chunk: usize, total_chunks: usize, error: &str) {
        let _ = (key, chunk, total_chunks, error);
    }

    /// Called once per document with the terminal outcome.
    ///
    /// `error` is `None` when the document completed.
    fn on_document_complete(&self, key: &str, succeeded_chunks: usize, error: Option<&str>) {
        let _ = (key, succeeded_chunks, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        outcome: Mutex<Option<String>>,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_chunk_start(&self, _key: &str, _chunk: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_complete(&self, _key: &str, _chunk: usize, _total: usize, _populated: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_error(&self, _key: &str, _chunk: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, key: &str, succeeded: usize, error: Option<&str>) {
            *self.outcome.lock().unwrap() = Some(format!("{key}:{succeeded}:{error:?}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_document_start("k", 3, 25);
        cb.on_chunk_start("k", 1, 3);
        cb.on_chunk_complete("k", 1, 3, 4);
        cb.on_chunk_error("k", 2, 3, "boom");
        cb.on_document_complete("k", 2, None);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_chunk_start("k", 1, 2);
        tracker.on_chunk_complete("k", 1, 2, 5);
        tracker.on_chunk_start("k", 2, 2);
        tracker.on_chunk_error("k", 2, 2, "all models exhausted");
        tracker.on_document_complete("k", 1, None);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.outcome.lock().unwrap().as_deref(), Some("k:1:None"));
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_document_start("k", 1, 1);
    }
}
