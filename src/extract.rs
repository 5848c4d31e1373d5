//! Per-document extraction driver and batch runner.
//!
//! ## State machine
//!
//! ```text
//! Initialized ─▶ Splitting ─▶ ChunkLoop ─▶ Finalizing ─▶ Completed
//!      │             │            │
//!      └─────────────┴────────────┴──────▶ Failed
//! ```
//!
//! Chunks of one document are processed strictly in page order because each
//! prompt carries the record accumulated so far. A chunk whose models are all
//! exhausted is logged and skipped; the document fails only when no chunk
//! succeeded. Summaries, embeddings and persistence run in `Finalizing` and
//! are best-effort: their failures are reported in
//! [`ExtractionOutput::stage_errors`] and never fail the run.
//!
//! Documents in a batch are independent and run concurrently, bounded by
//! [`ExtractionConfig::concurrency`].

use crate::client::{LlmModelClient, ModelClient, ModelRequest};
use crate::config::ExtractionConfig;
use crate::embed::{DocumentEmbeddings, Embedder, EmbeddingStage, GeminiEmbedder};
use crate::error::{ExtractError, StageError};
use crate::output::{
    BatchReport, ChunkOutcome, DocumentReport, ExtractionOutput, ExtractionStats, RunState,
};
use crate::pipeline::input::{self, DocumentSource};
use crate::pipeline::invoke::ModelInvoker;
use crate::pipeline::split::{self, Chunk};
use crate::pipeline::{encode, merge};
use crate::prompts;
use crate::record::ExtractionRecord;
use crate::store::{ExtractionRow, ExtractionStore, SqliteStore};
use crate::summary::{LlmSummarizer, Summaries, Summarizer};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Cooperative cancellation, checked before each chunk.
///
/// A call already in flight is never aborted; it finishes or times out.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Extraction pipeline with its collaborators.
///
/// Build with [`Pipeline::from_config`] for the real backends, or with
/// [`Pipeline::new`] plus the `with_*` methods to inject your own.
pub struct Pipeline {
    config: ExtractionConfig,
    invoker: ModelInvoker,
    system_prompt: String,
    summarizer: Option<Arc<dyn Summarizer>>,
    embedding: Option<EmbeddingStage>,
    store: Option<Arc<dyn ExtractionStore>>,
    cancel: CancelFlag,
}

impl Pipeline {
    /// A pipeline over `client` with no summary, embedding or store stages.
    pub fn new(config: ExtractionConfig, client: Arc<dyn ModelClient>) -> Result<Self, ExtractError> {
        let invoker = ModelInvoker::from_config(client, &config)?;
        let system_prompt = prompts::extraction_system_prompt(config.system_prompt.as_deref());
        Ok(Self {
            config,
            invoker,
            system_prompt,
            summarizer: None,
            embedding: None,
            store: None,
            cancel: CancelFlag::new(),
        })
    }

    /// Wire up every stage the configuration enables.
    ///
    /// - chat models through edgequake-llm ([`LlmModelClient`])
    /// - summaries through the same client
    /// - embeddings through the Gemini REST API, skipped with a warning when
    ///   no API key is set
    /// - a SQLite store when `store.database_url` is set
    pub async fn from_config(config: ExtractionConfig) -> Result<Self, ExtractError> {
        let client: Arc<dyn ModelClient> = Arc::new(LlmModelClient::from_config(&config));
        let mut pipeline = Self::new(config, Arc::clone(&client))?;

        if pipeline.config.summaries {
            let model = pipeline.config.summary_model.clone().unwrap_or_else(|| {
                pipeline.invoker.chain().first().cloned().unwrap_or_default()
            });
            pipeline.summarizer = Some(Arc::new(LlmSummarizer::new(client, model)));
        }

        if pipeline.config.embedding.enabled {
            let timeout = Duration::from_secs(pipeline.config.api_timeout_secs);
            match GeminiEmbedder::from_env(&pipeline.config.embedding, timeout) {
                Ok(embedder) => {
                    let embedding = pipeline.config.embedding.clone();
                    pipeline.embedding = Some(EmbeddingStage::new(Arc::new(embedder), embedding));
                }
                Err(e) => warn!("Embeddings disabled: {}", e),
            }
        }

        if pipeline.config.store.enabled {
            if let Some(url) = pipeline.config.store.database_url.clone() {
                let store = SqliteStore::connect(&url).await.map_err(|e| {
                    ExtractError::InvalidConfig(format!("Could not open database '{url}': {e}"))
                })?;
                pipeline.store = Some(Arc::new(store));
            }
        }

        Ok(pipeline)
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedding = Some(EmbeddingStage::new(embedder, self.config.embedding.clone()));
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ExtractionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    // ── Single document ──────────────────────────────────────────────────

    /// Extract one document.
    ///
    /// # Returns
    /// `Ok(ExtractionOutput)` when at least one chunk succeeded, even if some
    /// chunks or finalisation stages failed (see `output.chunks` and
    /// `output.stage_errors`).
    ///
    /// # Errors
    /// Returns `Err(ExtractError)` for unreadable input, cancellation, or when
    /// every chunk failed. A failure row is written to the store first.
    pub async fn run_document(&self, source: &DocumentSource) -> Result<ExtractionOutput, ExtractError> {
        let key = source.key();
        let mut state = RunState::Initialized;
        info!("[{}] Starting extraction of {}", key, source.display_name());

        match self.run_states(source, &key, &mut state).await {
            Ok(output) => {
                if let Some(cb) = &self.config.progress_callback {
                    cb.on_document_complete(&key, output.stats.succeeded_chunks, None);
                }
                Ok(output)
            }
            Err(e) => {
                error!("[{}] Failed during {}: {}", key, state, e);
                transition(&key, &mut state, RunState::Failed);
                self.persist_failure(&key, source, &e).await;
                if let Some(cb) = &self.config.progress_callback {
                    let completed = match &e {
                        ExtractError::Cancelled { completed, .. } => *completed,
                        _ => 0,
                    };
                    cb.on_document_complete(&key, completed, Some(&e.to_string()));
                }
                Err(e)
            }
        }
    }

    async fn run_states(
        &self,
        source: &DocumentSource,
        key: &str,
        state: &mut RunState,
    ) -> Result<ExtractionOutput, ExtractError> {
        let started = Instant::now();
        if self.cancel.is_cancelled() {
            return Err(ExtractError::Cancelled {
                key: key.to_string(),
                completed: 0,
                total: 0,
            });
        }

        self.mark_processing(key, source).await;

        // ── Splitting ────────────────────────────────────────────────────
        transition(key, state, RunState::Splitting);
        let resolved = input::resolve_source(source, self.config.download_timeout_secs).await?;
        let chunks = split::split_document(resolved.path(), self.config.chunk_size).await?;
        let total = chunks.len();
        if let Some(cb) = &self.config.progress_callback {
            cb.on_document_start(key, total, chunks.total_pages());
        }

        // ── Chunk loop ───────────────────────────────────────────────────
        transition(key, state, RunState::ChunkLoop);
        let loop_started = Instant::now();
        let mut record = ExtractionRecord::default();
        let mut outcomes: Vec<ChunkOutcome> = Vec::with_capacity(total);
        let mut succeeded = 0usize;

        for chunk in chunks.chunks() {
            if self.cancel.is_cancelled() {
                warn!("[{}] Cancelled before chunk {}/{}", key, chunk.number(), total);
                return Err(ExtractError::Cancelled {
                    key: key.to_string(),
                    completed: succeeded,
                    total,
                });
            }
            if let Some(cb) = &self.config.progress_callback {
                cb.on_chunk_start(key, chunk.number(), total);
            }

            let outcome = self.process_chunk(&mut record, chunk, total).await;
            match &outcome.error {
                None => {
                    succeeded += 1;
                    if let Some(cb) = &self.config.progress_callback {
                        cb.on_chunk_complete(key, chunk.number(), total, record.populated_fields());
                    }
                }
                Some(e) => {
                    warn!("[{}] {}", key, e);
                    if let Some(cb) = &self.config.progress_callback {
                        cb.on_chunk_error(key, chunk.number(), total, &e.to_string());
                    }
                }
            }
            outcomes.push(outcome);
        }
        let extraction_duration_ms = loop_started.elapsed().as_millis() as u64;

        if succeeded == 0 {
            let first_error = outcomes
                .iter()
                .find_map(|o| o.error.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ExtractError::AllChunksFailed { total, first_error });
        }
        info!(
            "[{}] {}/{} chunks extracted, {} fields populated",
            key,
            succeeded,
            total,
            record.populated_fields()
        );

        // ── Finalizing ───────────────────────────────────────────────────
        transition(key, state, RunState::Finalizing);
        let finalize_started = Instant::now();
        let mut stage_errors = Vec::new();

        let summaries = self.summarize(key, &record, &mut stage_errors).await;
        let embeddings = self
            .embed(key, &record, summaries.as_ref(), &mut stage_errors)
            .await;

        let mut record_id = None;
        if let Some(store) = &self.store {
            let row = ExtractionRow::completed(
                key,
                &record,
                summaries.as_ref(),
                embeddings.as_ref(),
                Some(source.display_name()),
            );
            match store.upsert(&row).await {
                Ok(id) => {
                    debug!("[{}] Stored as {}", key, id);
                    record_id = Some(id);
                }
                Err(e) => {
                    warn!("[{}] Could not persist record: {}", key, e);
                    stage_errors.push(StageError::Store(e.to_string()));
                }
            }
        }

        let stats = ExtractionStats {
            total_pages: chunks.total_pages(),
            total_chunks: total,
            succeeded_chunks: succeeded,
            failed_chunks: total - succeeded,
            total_input_tokens: outcomes.iter().map(|o| o.input_tokens as u64).sum(),
            total_output_tokens: outcomes.iter().map(|o| o.output_tokens as u64).sum(),
            total_duration_ms: started.elapsed().as_millis() as u64,
            extraction_duration_ms,
            finalize_duration_ms: finalize_started.elapsed().as_millis() as u64,
        };

        transition(key, state, RunState::Completed);
        info!(
            "[{}] Extraction complete: {}/{} chunks, {}ms total",
            key, succeeded, total, stats.total_duration_ms
        );

        Ok(ExtractionOutput {
            key: key.to_string(),
            source: source.display_name(),
            record,
            summaries,
            embeddings,
            stage_errors,
            chunks: outcomes,
            stats,
            record_id,
        })
    }

    /// Attach, prompt, invoke and merge one chunk.
    async fn process_chunk(
        &self,
        record: &mut ExtractionRecord,
        chunk: &Chunk,
        total: usize,
    ) -> ChunkOutcome {
        let started = Instant::now();
        let mut outcome = ChunkOutcome {
            index: chunk.index,
            start_page: chunk.start_page,
            end_page: chunk.end_page,
            model: None,
            attempts: 0,
            populated_fields: 0,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            error: None,
        };

        let attachments = match encode::chunk_attachments(
            chunk,
            self.config.attachment,
            self.config.max_rendered_pixels,
        )
        .await
        {
            Ok(a) => a,
            Err(e) => {
                outcome.error = Some(e);
                outcome.duration_ms = started.elapsed().as_millis() as u64;
                return outcome;
            }
        };

        let request = ModelRequest {
            system: self.system_prompt.clone(),
            prompt: prompts::chunk_prompt(record, chunk, total, self.config.attachment),
            attachments,
        };

        match self.invoker.invoke(&request, chunk.number()).await {
            Ok(partial) => {
                merge::merge_into(record, &partial.record);
                outcome.populated_fields = partial.record.populated_fields();
                outcome.model = Some(partial.model);
                outcome.attempts = partial.attempts;
                outcome.input_tokens = partial.input_tokens;
                outcome.output_tokens = partial.output_tokens;
            }
            Err(e) => outcome.error = Some(e),
        }
        outcome.duration_ms = started.elapsed().as_millis() as u64;
        outcome
    }

    async fn summarize(
        &self,
        key: &str,
        record: &ExtractionRecord,
        stage_errors: &mut Vec<StageError>,
    ) -> Option<Summaries> {
        if !self.config.summaries {
            return None;
        }
        let summarizer = self.summarizer.as_ref()?;
        match summarizer.summarize(record).await {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("[{}] {}", key, e);
                stage_errors.push(e);
                None
            }
        }
    }

    async fn embed(
        &self,
        key: &str,
        record: &ExtractionRecord,
        summaries: Option<&Summaries>,
        stage_errors: &mut Vec<StageError>,
    ) -> Option<DocumentEmbeddings> {
        if !self.config.embedding.enabled {
            return None;
        }
        let stage = self.embedding.as_ref()?;
        let title = record
            .court
            .value()
            .and_then(|c| c.verdict_number.value())
            .map(String::as_str)
            .unwrap_or(key);
        match stage.embed_document(record, summaries, Some(title)).await {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("[{}] {}", key, e);
                stage_errors.push(e);
                None
            }
        }
    }

    async fn mark_processing(&self, key: &str, source: &DocumentSource) {
        let Some(store) = &self.store else {
            return;
        };
        let row = ExtractionRow::processing(key, Some(source.display_name()));
        if let Err(e) = store.upsert(&row).await {
            warn!("[{}] Could not mark extraction as processing: {}", key, e);
        }
    }

    async fn persist_failure(&self, key: &str, source: &DocumentSource, e: &ExtractError) {
        let Some(store) = &self.store else {
            return;
        };
        let row = ExtractionRow::failed(key, e.to_string(), Some(source.display_name()));
        if let Err(store_err) = store.upsert(&row).await {
            error!("[{}] Could not write failure record: {}", key, store_err);
        }
    }

    // ── Batch ────────────────────────────────────────────────────────────

    /// Run one document and fold the result into a [`DocumentReport`].
    pub async fn report(&self, source: DocumentSource) -> DocumentReport {
        let key = source.key();
        let name = source.display_name();
        match self.run_document(&source).await {
            Ok(output) => DocumentReport {
                key,
                source: name,
                state: RunState::Completed,
                error: None,
                error_kind: None,
                output: Some(output),
            },
            Err(e) => DocumentReport {
                key,
                source: name,
                state: RunState::Failed,
                error: Some(e.to_string()),
                error_kind: Some(e.kind().to_string()),
                output: None,
            },
        }
    }

    /// Extract every source, up to `concurrency` documents at a time.
    ///
    /// One failing document never aborts the batch. Reports come back in
    /// input order.
    pub async fn run_batch(&self, sources: Vec<DocumentSource>) -> BatchReport {
        info!(
            "Batch of {} documents, {} at a time",
            sources.len(),
            self.config.concurrency
        );
        let mut reports: Vec<(usize, DocumentReport)> = stream::iter(
            sources
                .into_iter()
                .enumerate()
                .map(|(i, source)| async move { (i, self.report(source).await) }),
        )
        .buffer_unordered(self.config.concurrency.max(1))
        .collect()
        .await;
        reports.sort_by_key(|(i, _)| *i);

        let batch = BatchReport::from_reports(reports.into_iter().map(|(_, r)| r).collect());
        info!(
            "Batch finished: {} succeeded, {} failed",
            batch.succeeded, batch.failed
        );
        batch
    }
}

fn transition(key: &str, state: &mut RunState, next: RunState) {
    debug!("[{}] {} → {}", key, state, next);
    *state = next;
}
