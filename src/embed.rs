//! Embedding generation for finished extractions.
//!
//! ## Texts
//!
//! Three texts are embedded per document: the record rendered as labelled
//! plain text ([`record_to_text`]) and the two summaries. Each is cut to
//! `max_text_length` characters at a sentence or paragraph boundary
//! ([`truncate_text`]). With chunked embeddings enabled, a record text longer
//! than the limit is additionally split into overlapping windows
//! ([`chunk_text`]) and each window gets its own vector.
//!
//! ## Backend
//!
//! [`GeminiEmbedder`] calls the Gemini `batchEmbedContents` REST endpoint
//! directly with reqwest. Empty texts are never sent; they map to zero
//! vectors of the configured dimension.

use crate::config::EmbeddingConfig;
use crate::error::StageError;
use crate::field::Field;
use crate::record::{ExtractionRecord, Number};
use crate::summary::Summaries;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Retrieval role of an embedded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedPurpose {
    /// Text stored for retrieval, optionally titled (the decision number).
    Document { title: Option<String> },
    /// Search query text.
    Query,
}

impl EmbedPurpose {
    fn task_type(&self) -> &'static str {
        match self {
            EmbedPurpose::Document { .. } => "RETRIEVAL_DOCUMENT",
            EmbedPurpose::Query => "RETRIEVAL_QUERY",
        }
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in input order.
    async fn embed_batch(
        &self,
        texts: &[String],
        purpose: &EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, StageError>;
}

/// Vectors derived from one finished extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentEmbeddings {
    pub extraction: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_primary: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_secondary: Option<Vec<f32>>,
    /// Windows of a long record text, in text order. Empty unless chunked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<Vec<f32>>,
}

// ── Stage ────────────────────────────────────────────────────────────────

pub struct EmbeddingStage {
    embedder: Arc<dyn Embedder>,
    config: EmbeddingConfig,
}

impl EmbeddingStage {
    pub fn new(embedder: Arc<dyn Embedder>, config: EmbeddingConfig) -> Self {
        Self { embedder, config }
    }

    /// Embed a single text, truncated to the configured limit.
    pub async fn embed(&self, text: &str, purpose: EmbedPurpose) -> Result<Vec<f32>, StageError> {
        let text = truncate_text(text, self.config.max_text_length);
        self.embedder
            .embed_batch(&[text], &purpose)
            .await?
            .pop()
            .ok_or_else(|| StageError::Embedding("embedder returned no vector".into()))
    }

    /// Embed the record text, the summaries when present, and optional windows.
    pub async fn embed_document(
        &self,
        record: &ExtractionRecord,
        summaries: Option<&Summaries>,
        title: Option<&str>,
    ) -> Result<DocumentEmbeddings, StageError> {
        let limit = self.config.max_text_length;
        let record_text = record_to_text(record);

        let mut texts = vec![truncate_text(&record_text, limit)];
        if let Some(s) = summaries {
            texts.push(truncate_text(&s.primary, limit));
            texts.push(truncate_text(&s.secondary, limit));
        }
        let fixed = texts.len();

        if self.config.chunked && record_text.chars().count() > limit {
            let windows = chunk_text(&record_text, limit, self.config.chunk_overlap);
            debug!("Record text split into {} embedding windows", windows.len());
            texts.extend(windows);
        }

        let purpose = EmbedPurpose::Document {
            title: title.map(str::to_string),
        };
        let mut vectors = self.embedder.embed_batch(&texts, &purpose).await?;
        if vectors.len() != texts.len() {
            return Err(StageError::Embedding(format!(
                "embedding count mismatch: expected {}, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        let chunks = vectors.split_off(fixed);
        let mut fixed_vectors = vectors.into_iter();
        let extraction = fixed_vectors.next().unwrap_or_default();
        let summary_primary = fixed_vectors.next();
        let summary_secondary = fixed_vectors.next();

        info!(
            "Embedded record ({} dims), {} summaries, {} windows",
            extraction.len(),
            if summary_primary.is_some() { 2 } else { 0 },
            chunks.len()
        );

        Ok(DocumentEmbeddings {
            extraction,
            summary_primary,
            summary_secondary,
            chunks,
        })
    }
}

// ── Text preparation ─────────────────────────────────────────────────────

/// Cut `text` to at most `max_chars` characters.
///
/// The cut moves back to the last `.` or `\n` when that keeps more than 70%
/// of the limit; otherwise the text is cut hard.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }
    let head = &chars[..max_chars];
    let boundary = head.iter().rposition(|c| *c == '.' || *c == '\n');
    match boundary {
        Some(pos) if pos * 10 > max_chars * 7 => head[..=pos].iter().collect(),
        _ => head.iter().collect(),
    }
}

/// Split `text` into windows of at most `chunk_size` characters, consecutive
/// windows sharing `overlap` characters.
///
/// A window ends at the last `.` or `\n` past its midpoint when there is one.
/// A tail shorter than `overlap` is not emitted as its own window. Windows
/// are trimmed, and a window that is only whitespace is skipped.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size.saturating_sub(1));

    let mut windows = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());
        if end < chars.len() {
            let window = &chars[start..end];
            if let Some(pos) = window.iter().rposition(|c| *c == '.' || *c == '\n') {
                if pos * 2 > chunk_size {
                    end = start + pos + 1;
                }
            }
        }
        let window: String = chars[start..end].iter().collect();
        let window = window.trim();
        if !window.is_empty() {
            windows.push(window.to_string());
        }

        if end >= chars.len() {
            break;
        }
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
        if chars.len() - start < overlap {
            break;
        }
    }
    windows
}

/// Render the searchable parts of a record as labelled plain text.
pub fn record_to_text(record: &ExtractionRecord) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(d) = record.defendant.value() {
        parts.push("TERDAKWA (DEFENDANT):".into());
        line(&mut parts, "Nama", &d.name);
        line(&mut parts, "Alias", &d.alias);
        line(&mut parts, "Pekerjaan", &d.occupation);
        if let Some(addr) = d.address.value() {
            if text_of(&addr.full_address).is_some() {
                line(&mut parts, "Alamat", &addr.full_address);
            } else {
                line(&mut parts, "Kota", &addr.city);
            }
        }
    }

    if let Some(c) = record.court.value() {
        parts.push("\nPENGADILAN (COURT):".into());
        line(&mut parts, "Nama Pengadilan", &c.court_name);
        line(&mut parts, "Nomor Putusan", &c.verdict_number);
    }

    if let Some(i) = record.indictment.value() {
        parts.push("\nDAKWAAN (INDICTMENT):".into());
        line(&mut parts, "Kronologi", &i.chronology);
        line(&mut parts, "Lokasi Kejadian", &i.crime_location);
        if let Some(articles) = i.cited_articles.value() {
            let cited: Vec<&str> = articles
                .iter()
                .filter_map(|a| text_of(&a.full_citation).or_else(|| text_of(&a.article)))
                .collect();
            if !cited.is_empty() {
                parts.push(format!("Pasal yang Didakwakan: {}", cited.join(", ")));
            }
        }
    }

    if let Some(p) = record.prosecution_demand.value() {
        parts.push("\nTUNTUTAN (PROSECUTION DEMAND):".into());
        line(&mut parts, "Isi Tuntutan", &p.content);
        line(&mut parts, "Tuntutan Penjara", &p.prison_sentence_description);
    }

    if let Some(f) = record.legal_facts.value() {
        parts.push("\nFAKTA HUKUM (LEGAL FACTS):".into());
        let categories = [
            ("organizational_structure", &f.organizational_structure),
            ("standard_procedures", &f.standard_procedures),
            ("violations", &f.violations),
            ("financial_irregularities", &f.financial_irregularities),
            ("witness_testimonies", &f.witness_testimonies),
            ("documentary_evidence", &f.documentary_evidence),
            ("other_facts", &f.other_facts),
        ];
        for (category, facts) in categories {
            if let Some(facts) = facts.value().filter(|v| !v.is_empty()) {
                parts.push(format!("{category}:"));
                parts.extend(facts.iter().take(5).map(|fact| format!("  - {fact}")));
            }
        }
    }

    if let Some(v) = record.verdict.value() {
        parts.push("\nPUTUSAN (VERDICT):".into());
        line(&mut parts, "Hasil", &v.result);
        line(&mut parts, "Tanggal", &v.date);
        if let Some(s) = v.sentences.value() {
            if let Some(imp) = s.imprisonment.value() {
                line(&mut parts, "Hukuman Penjara", &imp.description);
            }
            if let Some(fine) = s.fine.value() {
                amount_line(&mut parts, "Denda", &fine.amount);
            }
        }
    }

    if let Some(l) = record.state_loss.value() {
        parts.push("\nKERUGIAN NEGARA (STATE LOSS):".into());
        amount_line(&mut parts, "Kerugian Terbukti", &l.proven_amount);
        amount_line(&mut parts, "Sudah Dikembalikan", &l.returned_amount);
    }

    if let Some(m) = record.case_metadata.value() {
        line(&mut parts, "\nKategori Tindak Pidana", &m.crime_category);
        line(&mut parts, "Instansi Terlibat", &m.institution_involved);
    }

    parts.join("\n")
}

fn text_of(field: &Field<String>) -> Option<&str> {
    field.value().map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn line(parts: &mut Vec<String>, label: &str, field: &Field<String>) {
    if let Some(text) = text_of(field) {
        parts.push(format!("{label}: {text}"));
    }
}

fn amount_line(parts: &mut Vec<String>, label: &str, field: &Field<Number>) {
    if let Some(n) = field.value().filter(|n| n.0 != 0.0) {
        parts.push(format!("{label}: Rp {}", format_rupiah(n.0)));
    }
}

/// Whole rupiah with comma thousands separators, e.g. `1,500,000`.
pub fn format_rupiah(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

// ── Gemini REST backend ──────────────────────────────────────────────────

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// [`Embedder`] over the Gemini `batchEmbedContents` endpoint.
pub struct GeminiEmbedder {
    http: reqwest::Client,
    api_key: String,
    model: String,
    dim: usize,
    max_batch: usize,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: String,
    content: EmbedContent<'a>,
    task_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct EmbedContent<'a> {
    parts: [EmbedPart<'a>; 1],
}

#[derive(Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    /// Build from `GEMINI_API_KEY` (or `GOOGLE_AI_API_KEY`).
    pub fn from_env(config: &EmbeddingConfig, timeout: Duration) -> Result<Self, StageError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_AI_API_KEY"))
            .map_err(|_| {
                StageError::Embedding("GEMINI_API_KEY or GOOGLE_AI_API_KEY is not set".into())
            })?;
        Self::new(api_key, config, timeout)
    }

    pub fn new(
        api_key: impl Into<String>,
        config: &EmbeddingConfig,
        timeout: Duration,
    ) -> Result<Self, StageError> {
        if config.dimension == 0 {
            return Err(StageError::Embedding(
                "embedding dimension must be greater than zero".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StageError::Embedding(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: config.model.clone(),
            dim: config.dimension,
            max_batch: config.batch_size.max(1),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    async fn send_batch(
        &self,
        payloads: &[&str],
        purpose: &EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, StageError> {
        let title = match purpose {
            EmbedPurpose::Document { title } => title.as_deref(),
            EmbedPurpose::Query => None,
        };
        let body = BatchEmbedRequest {
            requests: payloads
                .iter()
                .map(|text| EmbedRequest {
                    model: format!("models/{}", self.model),
                    content: EmbedContent {
                        parts: [EmbedPart { text }],
                    },
                    task_type: purpose.task_type(),
                    title,
                    output_dimensionality: self.dim,
                })
                .collect(),
        };

        let url = format!("{}/models/{}:batchEmbedContents", self.base_url, self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StageError::Embedding(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(StageError::Embedding(format!("HTTP {status}: {detail}")));
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| StageError::Embedding(format!("invalid response: {e}")))?;
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_batch(
        &self,
        texts: &[String],
        purpose: &EmbedPurpose,
    ) -> Result<Vec<Vec<f32>>, StageError> {
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut indices: Vec<usize> = Vec::new();
        let mut payloads: Vec<&str> = Vec::new();
        for (idx, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                results[idx] = Some(vec![0.0; self.dim]);
            } else {
                indices.push(idx);
                payloads.push(text.as_str());
            }
        }

        let mut offset = 0usize;
        while offset < payloads.len() {
            let end = (offset + self.max_batch).min(payloads.len());
            let slice = &payloads[offset..end];
            let vectors = self.send_batch(slice, purpose).await?;
            if vectors.len() != slice.len() {
                return Err(StageError::Embedding(format!(
                    "embedding count mismatch: expected {}, got {}",
                    slice.len(),
                    vectors.len()
                )));
            }
            for (idx, vector) in indices[offset..end].iter().zip(vectors) {
                if vector.len() != self.dim {
                    return Err(StageError::Embedding(format!(
                        "expected embedding dimension {}, got {}",
                        self.dim,
                        vector.len()
                    )));
                }
                results[*idx] = Some(vector);
            }
            debug!("Embedded batch {}..{} with {}", offset, end, self.model);
            offset = end;
        }

        results
            .into_iter()
            .map(|v| v.ok_or_else(|| StageError::Embedding("missing embedding result".into())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns `[len, index]` padded to `dim` for every text.
    struct Lengths {
        dim: usize,
        seen: Mutex<Vec<(Vec<String>, EmbedPurpose)>>,
    }

    #[async_trait]
    impl Embedder for Lengths {
        async fn embed_batch(
            &self,
            texts: &[String],
            purpose: &EmbedPurpose,
        ) -> Result<Vec<Vec<f32>>, StageError> {
            self.seen.lock().unwrap().push((texts.to_vec(), purpose.clone()));
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let mut v = vec![0.0; self.dim];
                    v[0] = t.chars().count() as f32;
                    v[1] = i as f32;
                    v
                })
                .collect())
        }
    }

    fn lengths() -> Arc<Lengths> {
        Arc::new(Lengths {
            dim: 4,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_text("short.", 100), "short.");
    }

    #[test]
    fn truncate_prefers_late_sentence_boundary() {
        let text = format!("{}. {}", "a".repeat(80), "b".repeat(50));
        let out = truncate_text(&text, 100);
        assert_eq!(out, format!("{}.", "a".repeat(80)));
    }

    #[test]
    fn truncate_cuts_hard_when_boundary_is_early() {
        let text = format!("{}. {}", "a".repeat(20), "b".repeat(200));
        let out = truncate_text(&text, 100);
        assert_eq!(out.chars().count(), 100);
    }

    #[test]
    fn truncate_is_char_safe() {
        let text = "é".repeat(50);
        assert_eq!(truncate_text(&text, 10).chars().count(), 10);
    }

    #[test]
    fn chunk_short_text_is_single_window() {
        assert_eq!(chunk_text("abc", 10, 2), vec!["abc".to_string()]);
    }

    #[test]
    fn chunk_windows_overlap_and_cover() {
        let text: String = (0..250).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let windows = chunk_text(&text, 100, 20);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].chars().count(), 100);
        assert!(windows[1].starts_with(&text[80..90]));
        assert!(text.ends_with(windows.last().unwrap().as_str()));
    }

    #[test]
    fn chunk_breaks_at_boundary_past_midpoint() {
        let text = format!("{}.{}", "a".repeat(70), "b".repeat(100));
        let windows = chunk_text(&text, 100, 10);
        assert_eq!(windows[0], format!("{}.", "a".repeat(70)));
    }

    #[test]
    fn chunk_windows_are_trimmed() {
        let text = format!("{}.\n\n   {}", "a".repeat(60), "b".repeat(80));
        let windows = chunk_text(&text, 100, 10);
        assert_eq!(windows[0], format!("{}.", "a".repeat(60)));
        for w in &windows {
            assert_eq!(w.trim(), w.as_str());
        }
        assert!(windows.last().unwrap().ends_with('b'));
    }

    #[test]
    fn chunk_always_progresses_with_large_overlap() {
        let text = "x".repeat(1000);
        let windows = chunk_text(&text, 10, 50);
        assert!(windows.len() < 1000);
        assert!(!windows.is_empty());
    }

    #[test]
    fn rupiah_grouping() {
        assert_eq!(format_rupiah(1_500_000.0), "1,500,000");
        assert_eq!(format_rupiah(999.4), "999");
        assert_eq!(format_rupiah(1000.0), "1,000");
        assert_eq!(format_rupiah(-2_000.0), "-2,000");
    }

    #[test]
    fn record_text_has_bilingual_labels() {
        let record: ExtractionRecord = serde_json::from_str(
            r#"{
                "defendant": {"name": "Budi", "address": {"city": "Medan"}},
                "court": {"court_name": "Mahkamah Agung", "verdict_number": "1 K/Pid.Sus/2024"},
                "indictment": {"cited_articles": [{"article": "Pasal 2"}, {"full_citation": "Pasal 3 UU 31/1999"}]},
                "legal_facts": {"violations": ["a", "b", "c", "d", "e", "f"]},
                "verdict": {"result": "guilty", "sentences": {"fine": {"amount": 50000000}}},
                "state_loss": {"proven_amount": 1250000.0},
                "case_metadata": {"crime_category": "Korupsi"}
            }"#,
        )
        .unwrap();
        let text = record_to_text(&record);
        assert!(text.starts_with("TERDAKWA (DEFENDANT):\nNama: Budi\nKota: Medan"));
        assert!(text.contains("Nomor Putusan: 1 K/Pid.Sus/2024"));
        assert!(text.contains("Pasal yang Didakwakan: Pasal 2, Pasal 3 UU 31/1999"));
        assert!(text.contains("violations:\n  - a"));
        assert!(text.contains("  - e"));
        assert!(!text.contains("  - f"));
        assert!(text.contains("Denda: Rp 50,000,000"));
        assert!(text.contains("Kerugian Terbukti: Rp 1,250,000"));
        assert!(text.contains("\n\nKategori Tindak Pidana: Korupsi"));
    }

    #[test]
    fn empty_record_renders_empty() {
        assert_eq!(record_to_text(&ExtractionRecord::default()), "");
    }

    #[tokio::test]
    async fn document_embeddings_split_fixed_and_windows() {
        let embedder = lengths();
        let config = EmbeddingConfig {
            chunked: true,
            max_text_length: 40,
            chunk_overlap: 5,
            ..EmbeddingConfig::default()
        };
        let stage = EmbeddingStage::new(embedder.clone(), config);
        let record: ExtractionRecord = serde_json::from_str(
            r#"{"defendant": {"name": "Budi Santoso bin Ahmad", "occupation": "Kepala Desa"}}"#,
        )
        .unwrap();
        let summaries = Summaries {
            primary: "Ringkasan.".into(),
            secondary: "Summary.".into(),
        };
        let out = stage
            .embed_document(&record, Some(&summaries), Some("1 K/Pid/2024"))
            .await
            .unwrap();

        assert_eq!(out.extraction[1], 0.0);
        assert_eq!(out.summary_primary.as_ref().unwrap()[1], 1.0);
        assert_eq!(out.summary_secondary.as_ref().unwrap()[1], 2.0);
        assert!(!out.chunks.is_empty());
        assert!(out.extraction[0] <= 40.0);

        let seen = embedder.seen.lock().unwrap();
        assert_eq!(
            seen[0].1,
            EmbedPurpose::Document {
                title: Some("1 K/Pid/2024".into())
            }
        );
    }

    #[tokio::test]
    async fn document_embeddings_without_summaries() {
        let stage = EmbeddingStage::new(lengths(), EmbeddingConfig::default());
        let out = stage
            .embed_document(&ExtractionRecord::default(), None, None)
            .await
            .unwrap();
        assert!(out.summary_primary.is_none());
        assert!(out.chunks.is_empty());
    }

    #[tokio::test]
    async fn query_embedding_uses_query_purpose() {
        let embedder = lengths();
        let stage = EmbeddingStage::new(embedder.clone(), EmbeddingConfig::default());
        let v = stage.embed("korupsi dana desa", EmbedPurpose::Query).await.unwrap();
        assert_eq!(v[0], 17.0);
        assert_eq!(embedder.seen.lock().unwrap()[0].1, EmbedPurpose::Query);
    }

    #[test]
    fn gemini_embedder_rejects_zero_dimension() {
        let config = EmbeddingConfig {
            dimension: 0,
            ..EmbeddingConfig::default()
        };
        assert!(GeminiEmbedder::new("key", &config, Duration::from_secs(5)).is_err());
    }

    #[test]
    fn batch_request_uses_camel_case() {
        let req = EmbedRequest {
            model: "models/gemini-embedding-001".into(),
            content: EmbedContent {
                parts: [EmbedPart { text: "hello" }],
            },
            task_type: EmbedPurpose::Query.task_type(),
            title: None,
            output_dimensionality: 768,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(json["outputDimensionality"], 768);
        assert_eq!(json["content"]["parts"][0]["text"], "hello");
        assert!(json.get("title").is_none());
    }
}
