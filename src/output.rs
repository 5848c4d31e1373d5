//! Output and report types.
//!
//! Everything here is plain data and serialises to JSON, which is what the
//! CLI writes per document.

use crate::embed::DocumentEmbeddings;
use crate::error::{ChunkError, StageError};
use crate::record::ExtractionRecord;
use crate::summary::Summaries;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Controller state of one document run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Initialized,
    Splitting,
    ChunkLoop,
    Finalizing,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Initialized => "initialized",
            RunState::Splitting => "splitting",
            RunState::ChunkLoop => "chunk_loop",
            RunState::Finalizing => "finalizing",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What happened to one chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkOutcome {
    /// 0-based position in the chunk sequence.
    pub index: usize,
    pub start_page: usize,
    pub end_page: usize,
    /// Model whose output was merged; `None` when the chunk failed.
    pub model: Option<String>,
    pub attempts: u32,
    /// Top-level fields populated in the chunk's own result.
    pub populated_fields: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ChunkError>,
}

impl ChunkOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_pages: usize,
    pub total_chunks: usize,
    pub succeeded_chunks: usize,
    pub failed_chunks: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    /// Time spent in model calls for the chunk loop.
    pub extraction_duration_ms: u64,
    /// Time spent on summaries, embeddings and persistence.
    pub finalize_duration_ms: u64,
}

/// Result of a completed document run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Document key (decision number).
    pub key: String,
    pub source: String,
    pub record: ExtractionRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summaries: Option<Summaries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<DocumentEmbeddings>,
    /// Best-effort stages that failed. The run is still completed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stage_errors: Vec<StageError>,
    pub chunks: Vec<ChunkOutcome>,
    pub stats: ExtractionStats,
    /// Row id in the store, when the record was persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

/// Terminal status of one document in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub key: String,
    pub source: String,
    pub state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error kind, e.g. `all_chunks_failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ExtractionOutput>,
}

impl DocumentReport {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Completed
    }
}

/// Tally of a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn from_reports(documents: Vec<DocumentReport>) -> Self {
        let succeeded = documents.iter().filter(|d| d.succeeded()).count();
        Self {
            total: documents.len(),
            succeeded,
            failed: documents.len() - succeeded,
            documents,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Reports of failed documents, in batch order.
    pub fn failures(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents.iter().filter(|d| !d.succeeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(key: &str, state: RunState) -> DocumentReport {
        DocumentReport {
            key: key.into(),
            source: format!("{key}.pdf"),
            state,
            error: (state == RunState::Failed).then(|| "boom".to_string()),
            error_kind: None,
            output: None,
        }
    }

    #[test]
    fn batch_tally() {
        let batch = BatchReport::from_reports(vec![
            report("a", RunState::Completed),
            report("b", RunState::Failed),
            report("c", RunState::Completed),
        ]);
        assert_eq!(batch.total, 3);
        assert_eq!(batch.succeeded, 2);
        assert_eq!(batch.failed, 1);
        assert!(!batch.all_succeeded());
        assert_eq!(batch.failures().map(|d| d.key.as_str()).collect::<Vec<_>>(), ["b"]);
    }

    #[test]
    fn empty_batch_succeeds() {
        assert!(BatchReport::from_reports(Vec::new()).all_succeeded());
    }

    #[test]
    fn run_state_serialises_snake_case() {
        assert_eq!(serde_json::to_string(&RunState::ChunkLoop).unwrap(), "\"chunk_loop\"");
        assert_eq!(RunState::ChunkLoop.to_string(), "chunk_loop");
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::Finalizing.is_terminal());
    }
}
