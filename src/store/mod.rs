//! Persistence of extraction results.
//!
//! Rows are keyed by the document key and written with a coalescing upsert:
//! a `None` in the incoming row never clears a stored value, while `status`
//! and `error_message` always take the incoming value. Re-running a failed
//! document therefore keeps whatever an earlier run stored and flips the
//! status once it completes.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::record::ExtractionRecord;
use crate::summary::Summaries;
use crate::embed::DocumentEmbeddings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    /// A run has started and not yet reached a terminal state.
    Processing,
    Completed,
    Failed,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Processing => "processing",
            ExtractionStatus::Completed => "completed",
            ExtractionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(ExtractionStatus::Processing),
            "completed" => Some(ExtractionStatus::Completed),
            "failed" => Some(ExtractionStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the extraction table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRow {
    /// Document key (decision number derived from the file name).
    pub key: String,
    pub status: ExtractionStatus,
    pub record: Option<ExtractionRecord>,
    pub confidence: Option<f64>,
    pub summary_id: Option<String>,
    pub summary_en: Option<String>,
    pub embeddings: Option<DocumentEmbeddings>,
    pub error_message: Option<String>,
    pub source_file: Option<String>,
}

impl ExtractionRow {
    /// Row marking a run in progress. Carries no data, so an earlier
    /// result for the same key survives the coalescing upsert.
    pub fn processing(key: impl Into<String>, source_file: Option<String>) -> Self {
        Self {
            key: key.into(),
            status: ExtractionStatus::Processing,
            record: None,
            confidence: None,
            summary_id: None,
            summary_en: None,
            embeddings: None,
            error_message: None,
            source_file,
        }
    }

    /// Row for a completed run.
    pub fn completed(
        key: impl Into<String>,
        record: &ExtractionRecord,
        summaries: Option<&Summaries>,
        embeddings: Option<&DocumentEmbeddings>,
        source_file: Option<String>,
    ) -> Self {
        Self {
            key: key.into(),
            status: ExtractionStatus::Completed,
            record: Some(record.clone()),
            confidence: record.confidence(),
            summary_id: summaries.map(|s| s.primary.clone()),
            summary_en: summaries.map(|s| s.secondary.clone()),
            embeddings: embeddings.cloned(),
            error_message: None,
            source_file,
        }
    }

    /// Row for a failed run: only the key, the status and the error.
    pub fn failed(key: impl Into<String>, error: impl Into<String>, source_file: Option<String>) -> Self {
        Self {
            key: key.into(),
            status: ExtractionStatus::Failed,
            record: None,
            confidence: None,
            summary_id: None,
            summary_en: None,
            embeddings: None,
            error_message: Some(error.into()),
            source_file,
        }
    }

    /// Apply the coalescing rule: `incoming` onto `self`.
    pub fn coalesce(&mut self, incoming: &ExtractionRow) {
        fn keep<T: Clone>(slot: &mut Option<T>, new: &Option<T>) {
            if new.is_some() {
                slot.clone_from(new);
            }
        }
        keep(&mut self.record, &incoming.record);
        keep(&mut self.confidence, &incoming.confidence);
        keep(&mut self.summary_id, &incoming.summary_id);
        keep(&mut self.summary_en, &incoming.summary_en);
        keep(&mut self.embeddings, &incoming.embeddings);
        keep(&mut self.source_file, &incoming.source_file);
        self.status = incoming.status;
        self.error_message.clone_from(&incoming.error_message);
    }
}

#[async_trait]
pub trait ExtractionStore: Send + Sync {
    /// Insert or update the row for `row.key`; returns the stored row id.
    async fn upsert(&self, row: &ExtractionRow) -> Result<String, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<ExtractionRow>, StoreError>;
}

/// In-process store, used by tests and by runs without a database.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, (String, ExtractionRow)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ExtractionStore for MemoryStore {
    async fn upsert(&self, row: &ExtractionRow) -> Result<String, StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".into()))?;
        match rows.get_mut(&row.key) {
            Some((id, stored)) => {
                stored.coalesce(row);
                Ok(id.clone())
            }
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                rows.insert(row.key.clone(), (id.clone(), row.clone()));
                Ok(id)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<ExtractionRow>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".into()))?;
        Ok(rows.get(key).map(|(_, row)| row.clone()))
    }
}
