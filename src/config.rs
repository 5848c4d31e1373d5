//! Configuration types for court-decision extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Embedding and persistence knobs live
//! in the nested [`EmbeddingConfig`] and [`StoreConfig`] so the CLI can map
//! each flag group onto one struct.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default fallback chain: cheapest first, strongest last.
pub const DEFAULT_MODELS: [&str; 3] = ["gemini-2.5-flash-lite", "gemini-2.5-flash", "gemini-2.5-pro"];

/// Configuration for extracting one or more court decisions.
///
/// # Example
/// ```rust
/// use putusan_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .chunk_size(8)
///     .models(["gemini-2.5-flash", "gemini-2.5-pro"])
///     .max_attempts(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.models.len(), 2);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Pages per chunk. Default: 10.
    ///
    /// Each chunk is sent to the model together with the accumulated record,
    /// so larger chunks mean fewer calls but longer responses and a higher
    /// chance of truncated JSON.
    pub chunk_size: usize,

    /// Ordered model chain: primary first, then fallbacks.
    /// Default: [`DEFAULT_MODELS`].
    pub models: Vec<String>,

    /// LLM provider name (e.g. "gemini", "openai", "vertexai").
    /// If None, `EDGEQUAKE_LLM_PROVIDER` is consulted, then "gemini".
    pub provider_name: Option<String>,

    /// Attempts per model on parse or transient errors. Default: 3.
    ///
    /// Truncated responses are never retried on the same model.
    pub max_attempts: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 1000.
    ///
    /// Doubles after each attempt: 1 s → 2 s → 4 s.
    pub retry_backoff_ms: u64,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum output tokens per call. Default: 32768.
    pub max_tokens: usize,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// How chunk content is attached to the model call. Default: [`ChunkAttachment::Pdf`].
    pub attachment: ChunkAttachment,

    /// Longest edge of rendered page images, [`ChunkAttachment::PageImages`] only. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Custom extraction system prompt. If None, uses the built-in legal prompt.
    pub system_prompt: Option<String>,

    /// Generate Indonesian and English summaries after extraction. Default: true.
    pub summaries: bool,

    /// Model used for summaries. If None, the first model of the chain.
    pub summary_model: Option<String>,

    /// Documents processed in parallel by batch runs. Default: 2.
    ///
    /// Chunks of one document are always processed sequentially.
    pub concurrency: usize,

    pub embedding: EmbeddingConfig,

    pub store: StoreConfig,

    /// Receives per-document and per-chunk events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            provider_name: None,
            max_attempts: 3,
            retry_backoff_ms: 1000,
            temperature: 0.1,
            max_tokens: 32_768,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            attachment: ChunkAttachment::default(),
            max_rendered_pixels: 2000,
            system_prompt: None,
            summaries: true,
            summary_model: None,
            concurrency: 2,
            embedding: EmbeddingConfig::default(),
            store: StoreConfig::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("chunk_size", &self.chunk_size)
            .field("models", &self.models)
            .field("provider_name", &self.provider_name)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("attachment", &self.attachment)
            .field("summaries", &self.summaries)
            .field("summary_model", &self.summary_model)
            .field("concurrency", &self.concurrency)
            .field("embedding", &self.embedding)
            .field("store", &self.store)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model used for summaries.
    pub fn summary_model(&self) -> Option<&str> {
        self.summary_model
            .as_deref()
            .or_else(|| self.models.first().map(String::as_str))
    }
}

/// Embedding stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Generate embeddings after extraction. Default: true.
    pub enabled: bool,
    /// Also embed overlapping windows of long record text. Default: false.
    pub chunked: bool,
    /// Default: "gemini-embedding-001".
    pub model: String,
    /// Output dimensionality. Default: 3072.
    pub dimension: usize,
    /// Texts per embedding request. Default: 250.
    pub batch_size: usize,
    /// Longest text embedded in one piece, in characters. Default: 8000.
    pub max_text_length: usize,
    /// Characters shared by consecutive windows. Default: 500.
    pub chunk_overlap: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunked: false,
            model: "gemini-embedding-001".to_string(),
            dimension: 3072,
            batch_size: 250,
            max_text_length: 8000,
            chunk_overlap: 500,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Write records to the store. Default: true (no-op without a URL).
    pub enabled: bool,
    /// e.g. `sqlite://extractions.db`
    pub database_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_url: None,
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn chunk_size(mut self, pages: usize) -> Self {
        self.config.chunk_size = pages;
        self
    }

    /// Replace the whole model chain.
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn attachment(mut self, mode: ChunkAttachment) -> Self {
        self.config.attachment = mode;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn summaries(mut self, enabled: bool) -> Self {
        self.config.summaries = enabled;
        self
    }

    pub fn summary_model(mut self, model: impl Into<String>) -> Self {
        self.config.summary_model = Some(model.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.config.embedding = embedding;
        self
    }

    pub fn store(mut self, store: StoreConfig) -> Self {
        self.config.store = store;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.chunk_size == 0 {
            return Err(ExtractError::InvalidConfig(
                "Chunk size must be ≥ 1 page".into(),
            ));
        }
        if c.models.iter().all(|m| m.trim().is_empty()) {
            return Err(ExtractError::InvalidConfig(
                "At least one model is required".into(),
            ));
        }
        if c.max_attempts == 0 {
            return Err(ExtractError::InvalidConfig(
                "Max attempts must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(ExtractError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        let e = &c.embedding;
        if e.enabled {
            if e.dimension == 0 || e.batch_size == 0 {
                return Err(ExtractError::InvalidConfig(
                    "Embedding dimension and batch size must be ≥ 1".into(),
                ));
            }
            if e.chunk_overlap >= e.max_text_length {
                return Err(ExtractError::InvalidConfig(format!(
                    "Embedding overlap ({}) must be smaller than max text length ({})",
                    e.chunk_overlap, e.max_text_length
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a chunk's pages are handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChunkAttachment {
    /// The chunk sub-PDF itself, as `application/pdf`. (default)
    ///
    /// Gemini reads PDFs natively, including their text layer.
    #[default]
    Pdf,
    /// One PNG per page, rendered with pdfium. For models without PDF input.
    PageImages,
}
