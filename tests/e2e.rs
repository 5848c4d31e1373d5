//! End-to-end tests against live model APIs.
//!
//! These tests read real decisions from `./test_cases/` and call the
//! configured providers. They are gated behind `E2E_ENABLED` so they never
//! run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 GEMINI_API_KEY=... cargo test --test e2e -- --nocapture

use putusan_extract::{DocumentSource, ExtractionConfig, Pipeline, RunState};
use std::path::PathBuf;

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// First PDF under `test_cases/`, or `None` when the suite should be skipped.
fn ready() -> Option<PathBuf> {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
        return None;
    }
    let mut pdfs = putusan_extract::pipeline::input::collect_pdfs(&test_cases_dir(), Some(1))
        .unwrap_or_default();
    if pdfs.is_empty() {
        println!("SKIP: no PDF found in {}", test_cases_dir().display());
        return None;
    }
    Some(pdfs.remove(0))
}

#[tokio::test]
async fn e2e_extracts_a_real_decision() {
    let Some(path) = ready() else { return };
    let _ = tracing_subscriber::fmt()
        .with_env_filter("putusan_extract=info")
        .try_init();

    let config = ExtractionConfig::builder()
        .chunk_size(10)
        .concurrency(1)
        .build()
        .unwrap();
    let pipeline = Pipeline::from_config(config).await.unwrap();
    let report = pipeline.report(DocumentSource::Path(path.clone())).await;

    assert_eq!(report.state, RunState::Completed, "{:?}", report.error);
    let output = report.output.expect("output");
    println!(
        "{}: {}/{} chunks, {} fields, {} stage errors",
        path.display(),
        output.stats.succeeded_chunks,
        output.stats.total_chunks,
        output.record.populated_fields(),
        output.stage_errors.len()
    );
    assert!(!output.record.is_empty());
    assert!(output.record.court.has_value(), "court block missing");
    if let Some(summaries) = &output.summaries {
        assert!(!summaries.primary.trim().is_empty());
        assert!(!summaries.secondary.trim().is_empty());
    }
}
