//! Error types for the putusan-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`]: **Fatal**: the document cannot be extracted at all
//!   (unreadable file, not a PDF, empty model chain, every chunk failed).
//!   Returned as `Err(ExtractError)` from [`crate::Pipeline::run_document`].
//!
//! * [`ChunkError`]: **Non-fatal**: a single page-range chunk failed after
//!   every candidate model was tried, but other chunks may still succeed.
//!   Stored inside [`crate::output::ChunkOutcome`] so callers can inspect
//!   partial success rather than losing the whole decision to one bad chunk.
//!
//! Collaborator errors ([`ClientError`], [`StageError`], [`StoreError`]) stay
//! local to the component that raised them; the controller decides whether
//! they are fatal.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the putusan-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The document could not be opened or parsed as a PDF with pages.
    #[error(transparent)]
    InvalidDocument(#[from] DocumentError),

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// A chunk sub-document could not be written to the scratch directory.
    #[error("Failed to write chunk '{path}': {detail}")]
    ChunkWriteFailed { path: PathBuf, detail: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Every chunk failed; there is nothing to finalise.
    #[error("All {total} chunks failed.\nFirst error: {first_error}")]
    AllChunksFailed { total: usize, first_error: String },

    /// The run observed its cancellation flag between chunks.
    #[error("Extraction of '{key}' cancelled after {completed} of {total} chunks")]
    Cancelled {
        key: String,
        completed: usize,
        total: usize,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed, or the model chain is empty.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Page-image attachments were requested but no pdfium library could be bound.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Page-image attachments need a pdfium shared library.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Or install pdfium system-wide.\n\
  • Or switch back to --attachment pdf.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Short machine-readable kind, stored next to failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::InvalidDocument(_) => "invalid_document",
            ExtractError::InvalidInput { .. } => "invalid_input",
            ExtractError::DownloadFailed { .. } => "download_failed",
            ExtractError::DownloadTimeout { .. } => "download_timeout",
            ExtractError::ChunkWriteFailed { .. } => "chunk_write_failed",
            ExtractError::AllChunksFailed { .. } => "all_chunks_failed",
            ExtractError::Cancelled { .. } => "cancelled",
            ExtractError::InvalidConfig(_) => "invalid_config",
            ExtractError::PdfiumBindingFailed(_) => "pdfium_binding_failed",
            ExtractError::Internal(_) => "internal",
        }
    }
}

/// Why a source document was rejected before any model call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("PDF file not found: '{path}'")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    #[error("Could not read '{path}': {detail}")]
    Unreadable { path: PathBuf, detail: String },

    /// The file was read but does not start with `%PDF`.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    /// Header, trailer or page tree could not be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    #[error("PDF '{path}' has no pages")]
    Empty { path: PathBuf },
}

/// A non-fatal error for a single chunk.
///
/// The overall extraction continues unless ALL chunks fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// Every candidate model was tried and none produced a usable result.
    #[error("Chunk {chunk}: all {models} models exhausted. Last error: {last_error}")]
    AllModelsExhausted {
        chunk: usize,
        models: usize,
        last_error: String,
    },

    /// The chunk content could not be turned into a model attachment.
    #[error("Chunk {chunk}: attachment could not be prepared: {detail}")]
    AttachmentFailed { chunk: usize, detail: String },
}

/// Failure reported by a [`crate::client::ModelClient`] for one call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Network blip, rate limit, 5xx, timeout. Worth retrying.
    #[error("transient model error: {0}")]
    Transient(String),

    /// The model cannot be used at all (no provider, no credentials).
    #[error("model '{model}' unavailable: {detail}")]
    Unavailable { model: String, detail: String },
}

/// Failure of a best-effort finalisation stage.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum StageError {
    #[error("summary generation failed: {0}")]
    Summary(String),

    #[error("embedding generation failed: {0}")]
    Embedding(String),

    #[error("persistence failed: {0}")]
    Store(String),
}

/// Failure of an [`crate::store::ExtractionStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_chunks_failed_display() {
        let e = ExtractError::AllChunksFailed {
            total: 3,
            first_error: "boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 3 chunks"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn document_error_is_transparent() {
        let e: ExtractError = DocumentError::Empty {
            path: PathBuf::from("x.pdf"),
        }
        .into();
        assert_eq!(e.to_string(), "PDF 'x.pdf' has no pages");
        assert_eq!(e.kind(), "invalid_document");
    }

    #[test]
    fn chunk_error_display() {
        let e = ChunkError::AllModelsExhausted {
            chunk: 2,
            models: 3,
            last_error: "truncated".into(),
        };
        assert!(e.to_string().contains("Chunk 2"));
        assert!(e.to_string().contains("truncated"));
    }

    #[test]
    fn cancelled_display() {
        let e = ExtractError::Cancelled {
            key: "123_K_PID_2024".into(),
            completed: 1,
            total: 4,
        };
        assert!(e.to_string().contains("1 of 4"));
        assert_eq!(e.kind(), "cancelled");
    }
}
