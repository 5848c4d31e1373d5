//! Streaming batch API: emit document reports as they finish.
//!
//! [`Pipeline::run_batch`] waits for the whole batch. [`extract_stream`]
//! yields each [`DocumentReport`] as soon as its document reaches a terminal
//! state, so callers can write results and update progress while the rest of
//! the batch is still running. Reports arrive in completion order.
//!
//! ```rust,no_run
//! use putusan_extract::{extract_stream, DocumentSource, ExtractionConfig, Pipeline};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Arc::new(Pipeline::from_config(ExtractionConfig::default()).await?);
//! let sources = vec![DocumentSource::parse("123_K_Pid.Sus_2024.pdf")];
//! let mut reports = extract_stream(pipeline, sources);
//! while let Some(report) = reports.next().await {
//!     println!("{}: {}", report.key, report.state);
//! }
//! # Ok(())
//! # }
//! ```

use crate::extract::Pipeline;
use crate::output::DocumentReport;
use crate::pipeline::input::DocumentSource;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-document reports.
pub type ReportStream = Pin<Box<dyn Stream<Item = DocumentReport> + Send>>;

/// Extract `sources` with up to `concurrency` documents in flight, yielding
/// each report as it completes.
pub fn extract_stream(pipeline: Arc<Pipeline>, sources: Vec<DocumentSource>) -> ReportStream {
    let concurrency = pipeline.config().concurrency.max(1);
    info!(
        "Streaming batch of {} documents, {} at a time",
        sources.len(),
        concurrency
    );

    let s = stream::iter(sources.into_iter().map(move |source| {
        let pipeline = Arc::clone(&pipeline);
        async move { pipeline.report(source).await }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}
