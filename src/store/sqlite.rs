//! SQLite-backed [`ExtractionStore`].

use super::{ExtractionRow, ExtractionStatus, ExtractionStore};
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS llm_extractions (
    id TEXT PRIMARY KEY,
    extraction_id TEXT NOT NULL UNIQUE,
    extraction_result TEXT,
    extraction_confidence REAL,
    summary_id TEXT,
    summary_en TEXT,
    embeddings TEXT,
    status TEXT NOT NULL DEFAULT 'processing',
    error_message TEXT,
    source_file TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
"#;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and ensure the table exists.
    ///
    /// `url` is a sqlx SQLite URL such as `sqlite://extractions.db`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        info!("Extraction store ready at {}", url);
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ExtractionStore for SqliteStore {
    async fn upsert(&self, row: &ExtractionRow) -> Result<String, StoreError> {
        let record = row.record.as_ref().map(serde_json::to_string).transpose()?;
        let embeddings = row.embeddings.as_ref().map(serde_json::to_string).transpose()?;

        // Single statement: concurrent writers for one key land on the same
        // row. On conflict the stored id is kept and returned.
        let candidate = uuid::Uuid::new_v4().to_string();
        let stored = sqlx::query(
            r#"
            INSERT INTO llm_extractions (
                id, extraction_id, extraction_result, extraction_confidence,
                summary_id, summary_en, embeddings, status, error_message, source_file
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(extraction_id) DO UPDATE SET
                extraction_result = COALESCE(excluded.extraction_result, llm_extractions.extraction_result),
                extraction_confidence = COALESCE(excluded.extraction_confidence, llm_extractions.extraction_confidence),
                summary_id = COALESCE(excluded.summary_id, llm_extractions.summary_id),
                summary_en = COALESCE(excluded.summary_en, llm_extractions.summary_en),
                embeddings = COALESCE(excluded.embeddings, llm_extractions.embeddings),
                status = excluded.status,
                error_message = excluded.error_message,
                source_file = COALESCE(excluded.source_file, llm_extractions.source_file),
                updated_at = datetime('now')
            RETURNING id
            "#,
        )
        .bind(&candidate)
        .bind(&row.key)
        .bind(record)
        .bind(row.confidence)
        .bind(&row.summary_id)
        .bind(&row.summary_en)
        .bind(embeddings)
        .bind(row.status.as_str())
        .bind(&row.error_message)
        .bind(&row.source_file)
        .fetch_one(&self.pool)
        .await?;

        let id: String = stored.try_get("id")?;
        if id == candidate {
            debug!("Stored new extraction {} as {}", row.key, id);
        } else {
            debug!("Extraction {} already stored as {}, updated", row.key, id);
        }
        Ok(id)
    }

    async fn get(&self, key: &str) -> Result<Option<ExtractionRow>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT extraction_id, extraction_result, extraction_confidence, summary_id,
                   summary_en, embeddings, status, error_message, source_file
            FROM llm_extractions WHERE extraction_id = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let record: Option<String> = row.try_get("extraction_result")?;
        let embeddings: Option<String> = row.try_get("embeddings")?;
        let status: String = row.try_get("status")?;

        Ok(Some(ExtractionRow {
            key: row.try_get("extraction_id")?,
            status: ExtractionStatus::parse(&status)
                .ok_or_else(|| StoreError::Other(format!("unknown status '{status}'")))?,
            record: record.as_deref().map(serde_json::from_str).transpose()?,
            confidence: row.try_get("extraction_confidence")?,
            summary_id: row.try_get("summary_id")?,
            summary_en: row.try_get("summary_en")?,
            embeddings: embeddings.as_deref().map(serde_json::from_str).transpose()?,
            error_message: row.try_get("error_message")?,
            source_file: row.try_get("source_file")?,
        }))
    }
}
