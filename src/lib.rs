//! # putusan-extract
//!
//! Extract structured legal facts from Indonesian court-decision PDFs
//! (putusan Mahkamah Agung) with a chain of LLMs, then summarise and embed
//! them for retrieval.
//!
//! ## Why chunks?
//!
//! Decisions routinely run to hundreds of pages. Sending the whole file in
//! one call either exceeds the input limit or produces a reply long enough
//! to be cut off mid-JSON. Instead the document is split into page ranges,
//! each range is sent together with the record extracted so far, and the
//! partial replies are deep-merged into one accumulating record.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file, URL or bytes
//!  ├─ 2. Split     page ranges → sub-PDFs (lopdf, spawn_blocking)
//!  ├─ 3. Chunks    for each range, in order:
//!  │                 encode → prompt(accumulator) → invoke(model chain) → merge
//!  ├─ 4. Finalize  summaries (id + en), embeddings, persistence (best-effort)
//!  └─ 5. Output    merged record + per-chunk outcomes + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use putusan_extract::{DocumentSource, ExtractionConfig, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider from EDGEQUAKE_LLM_PROVIDER (default gemini), key from GEMINI_API_KEY
//!     let config = ExtractionConfig::builder().chunk_size(10).build()?;
//!     let pipeline = Pipeline::from_config(config).await?;
//!     let output = pipeline
//!         .run_document(&DocumentSource::parse("123_K_Pid.Sus_2024.pdf"))
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&output.record)?);
//!     eprintln!("{}/{} chunks", output.stats.succeeded_chunks, output.stats.total_chunks);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `putusan-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! putusan-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod embed;
pub mod error;
pub mod extract;
pub mod field;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod store;
pub mod stream;
pub mod summary;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{Attachment, FinishReason, LlmModelClient, ModelClient, ModelRequest, ModelResponse};
pub use config::{ChunkAttachment, EmbeddingConfig, ExtractionConfig, ExtractionConfigBuilder, StoreConfig};
pub use embed::{DocumentEmbeddings, EmbedPurpose, Embedder, EmbeddingStage, GeminiEmbedder};
pub use error::{ChunkError, ClientError, DocumentError, ExtractError, StageError, StoreError};
pub use extract::{CancelFlag, Pipeline};
pub use field::Field;
pub use output::{BatchReport, ChunkOutcome, DocumentReport, ExtractionOutput, ExtractionStats, RunState};
pub use pipeline::input::DocumentSource;
pub use pipeline::invoke::{AttemptOutcome, ModelInvoker, PartialResult};
pub use pipeline::merge::{merge, merge_into};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::ExtractionRecord;
pub use store::{ExtractionRow, ExtractionStatus, ExtractionStore, MemoryStore, SqliteStore};
pub use stream::{extract_stream, ReportStream};
pub use summary::{LlmSummarizer, Summaries, Summarizer};
