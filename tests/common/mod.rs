//! Shared fixtures for the integration tests: synthetic PDFs and scripted
//! model, summary and embedding backends.

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::{dictionary, Document, Object, Stream};
use putusan_extract::{
    ClientError, EmbedPurpose, Embedder, ExtractionConfig, ExtractionProgressCallback,
    ExtractionRecord, ExtractionRow, ExtractionStatus, ExtractionStore, MemoryStore, ModelClient,
    ModelRequest, ModelResponse, StageError, StoreError, Summaries, Summarizer,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// ── PDFs ─────────────────────────────────────────────────────────────────────

/// A PDF with `pages` blank pages. Page `n` is `100 + n` points wide so page
/// order survives splitting and can be checked.
pub fn numbered_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(pages);
    for n in 1..=pages {
        let content = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (100 + n as i64).into(), 842.into()],
            "Contents" => content,
        });
        kids.push(page.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialise test PDF");
    out
}

/// Write a `pages`-page PDF named `name` into `dir`.
pub fn write_pdf(dir: &Path, name: &str, pages: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, numbered_pdf(pages)).expect("write test PDF");
    path
}

/// Config for tests: two-model chain, no backoff, no optional stages.
pub fn test_config(chunk_size: usize) -> ExtractionConfig {
    ExtractionConfig::builder()
        .chunk_size(chunk_size)
        .models(["primary", "fallback"])
        .max_attempts(2)
        .retry_backoff_ms(0)
        .summaries(false)
        .concurrency(2)
        .build()
        .expect("valid test config")
}

// ── Model client ─────────────────────────────────────────────────────────────

/// One recorded call: model name, chunk number parsed from the prompt, prompt.
#[derive(Debug, Clone)]
pub struct Call {
    pub model: String,
    pub chunk: usize,
    pub prompt: String,
}

type Script = dyn Fn(&str, usize) -> Result<ModelResponse, ClientError> + Send + Sync;

/// A [`ModelClient`] whose reply is a function of (model, chunk number).
pub struct ScriptedClient {
    script: Box<Script>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    pub fn new(
        script: impl Fn(&str, usize) -> Result<ModelResponse, ClientError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

/// Chunk number from "(chunk N of M)" in the chunk prompt; 0 for other prompts.
pub fn chunk_number(prompt: &str) -> usize {
    prompt
        .split("(chunk ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn complete(
        &self,
        model: &str,
        request: &ModelRequest,
    ) -> Result<ModelResponse, ClientError> {
        let chunk = chunk_number(&request.prompt);
        self.calls.lock().unwrap().push(Call {
            model: model.to_string(),
            chunk,
            prompt: request.prompt.clone(),
        });
        (self.script)(model, chunk)
    }
}

pub fn reply(json: &str) -> Result<ModelResponse, ClientError> {
    Ok(ModelResponse::complete(json))
}

// ── Summary and embedding fakes ──────────────────────────────────────────────

pub struct FixedSummarizer;

#[async_trait]
impl Summarizer for FixedSummarizer {
    async fn summarize(&self, record: &ExtractionRecord) -> Result<Summaries, StageError> {
        let name = record
            .defendant
            .value()
            .and_then(|d| d.name.value())
            .cloned()
            .unwrap_or_default();
        Ok(Summaries {
            primary: format!("Terdakwa {name} dinyatakan bersalah."),
            secondary: format!("Defendant {name} was found guilty."),
        })
    }
}

pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _record: &ExtractionRecord) -> Result<Summaries, StageError> {
        Err(StageError::Summary("quota exceeded".into()))
    }
}

/// Embeds each text as `[chars, 1.0, 0.0]`.
pub struct LengthEmbedder;

#[async_trait]
impl Embedder for LengthEmbedder {
    async fn embed_batch(
        &self,
        texts: &[String],
        _purpose: &EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, StageError> {
        Ok(texts
            .iter()
            .map(|t| vec![t.chars().count() as f32, 1.0, 0.0])
            .collect())
    }
}

pub struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    async fn embed_batch(
        &self,
        _texts: &[String],
        _purpose: &EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, StageError> {
        Err(StageError::Embedding("service down".into()))
    }
}

// ── Stores ───────────────────────────────────────────────────────────────────

/// Rejects every write.
pub struct ReadOnlyStore;

#[async_trait]
impl ExtractionStore for ReadOnlyStore {
    async fn upsert(&self, _row: &ExtractionRow) -> Result<String, StoreError> {
        Err(StoreError::Other("database is read-only".into()))
    }

    async fn get(&self, _key: &str) -> Result<Option<ExtractionRow>, StoreError> {
        Ok(None)
    }
}

/// A [`MemoryStore`] that also remembers the status of every write, in order.
#[derive(Default)]
pub struct StatusLog {
    inner: MemoryStore,
    statuses: Mutex<Vec<ExtractionStatus>>,
}

impl StatusLog {
    pub fn statuses(&self) -> Vec<ExtractionStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionStore for StatusLog {
    async fn upsert(&self, row: &ExtractionRow) -> Result<String, StoreError> {
        self.statuses.lock().unwrap().push(row.status);
        self.inner.upsert(row).await
    }

    async fn get(&self, key: &str) -> Result<Option<ExtractionRow>, StoreError> {
        self.inner.get(key).await
    }
}

// ── Progress ─────────────────────────────────────────────────────────────────

/// Records every progress event as a short string.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ExtractionProgressCallback for RecordingProgress {
    fn on_document_start(&self, key: &str, total_chunks: usize, total_pages: usize) {
        self.push(format!("start {key} {total_chunks} {total_pages}"));
    }

    fn on_chunk_start(&self, key: &str, chunk: usize, total_chunks: usize) {
        self.push(format!("chunk_start {key} {chunk}/{total_chunks}"));
    }

    fn on_chunk_complete(&self, key: &str, chunk: usize, total_chunks: usize, _populated: usize) {
        self.push(format!("chunk_ok {key} {chunk}/{total_chunks}"));
    }

    fn on_chunk_error(&self, key: &str, chunk: usize, total_chunks: usize, _error: &str) {
        self.push(format!("chunk_err {key} {chunk}/{total_chunks}"));
    }

    fn on_document_complete(&self, key: &str, succeeded_chunks: usize, error: Option<&str>) {
        let status = if error.is_some() { "failed" } else { "ok" };
        self.push(format!("done {key} {succeeded_chunks} {status}"));
    }
}
