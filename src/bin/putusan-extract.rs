//! CLI binary for putusan-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs the batch and writes one JSON file per document.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use putusan_extract::pipeline::input::{collect_pdfs, is_url};
use putusan_extract::{
    extract_stream, BatchReport, CancelFlag, ChunkAttachment, DocumentReport, DocumentSource,
    EmbeddingConfig, ExtractionConfig, ExtractionProgressCallback, Pipeline, ProgressCallback,
    StoreConfig,
};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar for the whole batch, counting chunks. Its length grows as each
/// document is split and its chunk count becomes known.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<(String, usize), Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed(&self, key: &str, chunk: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut t| t.remove(&(key.to_string(), chunk)))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, key: &str, total_chunks: usize, total_pages: usize) {
        self.bar.inc_length(total_chunks as u64);
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(key),
            dim(&format!("{total_pages} pages, {total_chunks} chunks"))
        ));
    }

    fn on_chunk_start(&self, key: &str, chunk: usize, total_chunks: usize) {
        if let Ok(mut t) = self.start_times.lock() {
            t.insert((key.to_string(), chunk), Instant::now());
        }
        self.bar.set_message(format!("{key} {chunk}/{total_chunks}"));
    }

    fn on_chunk_complete(&self, key: &str, chunk: usize, total_chunks: usize, populated: usize) {
        let secs = self.elapsed(key, chunk);
        self.bar.println(format!(
            "  {} {} chunk {:>2}/{:<2}  {:<10}  {}",
            green("✓"),
            key,
            chunk,
            total_chunks,
            dim(&format!("{populated:>2} fields")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, key: &str, chunk: usize, total_chunks: usize, error: &str) {
        let secs = self.elapsed(key, chunk);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {} chunk {:>2}/{:<2}  {}  {}",
            red("✗"),
            key,
            chunk,
            total_chunks,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_complete(&self, key: &str, succeeded_chunks: usize, error: Option<&str>) {
        match error {
            None => self.bar.println(format!(
                "{} {}  {}",
                green("✔"),
                bold(key),
                dim(&format!("{succeeded_chunks} chunks merged"))
            )),
            Some(e) => self.bar.println(format!("{} {}  {}", red("✘"), bold(key), red(e))),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One decision, record JSON on stdout
  putusan-extract 123_K_Pid.Sus_2024.pdf

  # A directory of decisions, one JSON file per decision
  putusan-extract ./putusan/ --output-dir ./out --concurrency 4

  # Store results in SQLite
  putusan-extract ./putusan/ --database-url sqlite://extractions.db

  # Smaller chunks and a two-model chain
  putusan-extract --chunk-size 5 --models gemini-2.5-flash,gemini-2.5-pro big.pdf

  # Send rendered pages instead of sub-PDFs (needs pdfium)
  putusan-extract --attachment page-images --provider openai --models gpt-4.1 big.pdf

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (chat and embeddings)
  GOOGLE_AI_API_KEY       Alternative name for the Gemini key (embeddings)
  EDGEQUAKE_LLM_PROVIDER  Chat provider when --provider is not given (default gemini)
  PDFIUM_LIB_PATH         pdfium library for --attachment page-images
  PUTUSAN_*               Every flag can also be set as PUTUSAN_<FLAG_NAME>
  RUST_LOG                Overrides the log filter
"#;

/// Extract structured facts from court-decision PDFs with a chain of LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "putusan-extract",
    version,
    about = "Extract structured facts from court-decision PDFs with chunked LLM calls",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files, directories of PDFs, or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Process at most this many PDFs per directory.
    #[arg(long, env = "PUTUSAN_LIMIT")]
    limit: Option<usize>,

    /// Write one `<key>.json` per document into this directory.
    #[arg(short, long, env = "PUTUSAN_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Print the whole batch report as JSON on stdout.
    #[arg(long, env = "PUTUSAN_JSON")]
    json: bool,

    /// Pages per chunk.
    #[arg(long, env = "PUTUSAN_CHUNK_SIZE", default_value_t = 10)]
    chunk_size: usize,

    /// Comma-separated model chain, primary first.
    #[arg(long, env = "PUTUSAN_MODELS", value_delimiter = ',')]
    models: Option<Vec<String>>,

    /// LLM provider: gemini, openai, anthropic, vertexai, ollama.
    #[arg(long, env = "PUTUSAN_PROVIDER")]
    provider: Option<String>,

    /// Attempts per model on invalid JSON or transient errors.
    #[arg(long, env = "PUTUSAN_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Initial retry delay in milliseconds; doubles after each retry.
    #[arg(long, env = "PUTUSAN_RETRY_BACKOFF_MS", default_value_t = 1000)]
    retry_backoff_ms: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PUTUSAN_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens per model call.
    #[arg(long, env = "PUTUSAN_MAX_TOKENS", default_value_t = 32_768)]
    max_tokens: usize,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "PUTUSAN_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PUTUSAN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// How chunks are attached to the model call.
    #[arg(long, env = "PUTUSAN_ATTACHMENT", value_enum, default_value = "pdf")]
    attachment: AttachmentArg,

    /// Longest edge of rendered pages in pixels (page-images only).
    #[arg(long, env = "PUTUSAN_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Path to a text file containing a custom extraction system prompt.
    #[arg(long, env = "PUTUSAN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Skip the Indonesian and English summaries.
    #[arg(long, env = "PUTUSAN_NO_SUMMARIES")]
    no_summaries: bool,

    /// Model for summaries (default: first model of the chain).
    #[arg(long, env = "PUTUSAN_SUMMARY_MODEL")]
    summary_model: Option<String>,

    /// Skip embeddings.
    #[arg(long, env = "PUTUSAN_NO_EMBEDDINGS")]
    no_embeddings: bool,

    /// Also embed overlapping windows of long record text.
    #[arg(long, env = "PUTUSAN_CHUNKED_EMBEDDINGS")]
    chunked_embeddings: bool,

    #[arg(long, env = "PUTUSAN_EMBEDDING_MODEL", default_value = "gemini-embedding-001")]
    embedding_model: String,

    #[arg(long, env = "PUTUSAN_EMBEDDING_DIMENSION", default_value_t = 3072)]
    embedding_dimension: usize,

    #[arg(long, env = "PUTUSAN_EMBEDDING_BATCH_SIZE", default_value_t = 250)]
    embedding_batch_size: usize,

    /// Longest text embedded in one piece, in characters.
    #[arg(long, env = "PUTUSAN_EMBEDDING_MAX_TEXT_LENGTH", default_value_t = 8000)]
    embedding_max_text_length: usize,

    /// Characters shared by consecutive embedding windows.
    #[arg(long, env = "PUTUSAN_EMBEDDING_CHUNK_OVERLAP", default_value_t = 500)]
    embedding_chunk_overlap: usize,

    /// SQLite URL, e.g. sqlite://extractions.db
    #[arg(long, env = "PUTUSAN_DATABASE_URL")]
    database_url: Option<String>,

    /// Do not write to the database even if a URL is set.
    #[arg(long, env = "PUTUSAN_NO_DATABASE")]
    no_database: bool,

    /// Documents processed in parallel.
    #[arg(short, long, env = "PUTUSAN_CONCURRENCY", default_value_t = 2)]
    concurrency: usize,

    /// Disable progress bar.
    #[arg(long, env = "PUTUSAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PUTUSAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PUTUSAN_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum AttachmentArg {
    Pdf,
    PageImages,
}

impl From<AttachmentArg> for ChunkAttachment {
    fn from(v: AttachmentArg) -> Self {
        match v {
            AttachmentArg::Pdf => ChunkAttachment::Pdf,
            AttachmentArg::PageImages => ChunkAttachment::PageImages,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inputs ───────────────────────────────────────────────────────────
    let sources = expand_inputs(&cli.inputs, cli.limit)?;
    if sources.is_empty() {
        anyhow::bail!("No PDF files found in {:?}", cli.inputs);
    }

    // ── Pipeline ─────────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let cancel = CancelFlag::new();
    let pipeline = Arc::new(
        Pipeline::from_config(config)
            .await
            .context("Failed to set up the pipeline")?
            .with_cancel_flag(cancel.clone()),
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{} Interrupted, finishing in-flight chunks…", cyan("⚠"));
            cancel.cancel();
        }
    });

    if let Some(dir) = &cli.output_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let started = Instant::now();
    let mut reports: Vec<DocumentReport> = Vec::with_capacity(sources.len());
    let mut stream = extract_stream(pipeline, sources);
    while let Some(report) = stream.next().await {
        if let Some(dir) = &cli.output_dir {
            write_report(dir, &report).await?;
        } else if !cli.json {
            if let Some(output) = &report.output {
                let json = serde_json::to_string_pretty(&output.record)
                    .context("Failed to serialise record")?;
                println!("{json}");
            }
        }
        reports.push(report);
    }
    let batch = BatchReport::from_reports(reports);

    if cli.json {
        let json = serde_json::to_string_pretty(&batch).context("Failed to serialise report")?;
        println!("{json}");
    }

    if !cli.quiet {
        print_tally(&batch, started.elapsed());
    }

    if !batch.all_succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

/// Files pass through, directories expand to their PDFs, URLs are downloaded later.
fn expand_inputs(inputs: &[String], limit: Option<usize>) -> Result<Vec<DocumentSource>> {
    let mut sources = Vec::new();
    for input in inputs {
        if is_url(input) {
            sources.push(DocumentSource::Url(input.clone()));
            continue;
        }
        let path = Path::new(input);
        if path.is_dir() {
            let files = collect_pdfs(path, limit)
                .with_context(|| format!("Failed to list {}", path.display()))?;
            sources.extend(files.into_iter().map(DocumentSource::Path));
        } else {
            sources.push(DocumentSource::Path(path.to_path_buf()));
        }
    }
    Ok(sources)
}

/// Write `<key>.json`: the full output for a completed document, the report otherwise.
async fn write_report(dir: &Path, report: &DocumentReport) -> Result<()> {
    let path = dir.join(format!("{}.json", report.key));
    let json = match &report.output {
        Some(output) => serde_json::to_string_pretty(output),
        None => serde_json::to_string_pretty(report),
    }
    .context("Failed to serialise output")?;

    // Write to a sibling temp file, then rename, so readers never see half a file.
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, &path)
        .await
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

fn print_tally(batch: &BatchReport, elapsed: Duration) {
    let mark = if batch.failed == 0 {
        green("✔")
    } else if batch.succeeded == 0 {
        red("✘")
    } else {
        cyan("⚠")
    };
    eprintln!(
        "{}  {}/{} documents extracted  {}",
        mark,
        bold(&batch.succeeded.to_string()),
        batch.total,
        dim(&format!("{:.1}s", elapsed.as_secs_f64())),
    );
    for failed in batch.failures() {
        eprintln!(
            "   {} {}  {}",
            red("✗"),
            failed.key,
            dim(failed.error.as_deref().unwrap_or("unknown error"))
        );
    }
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let embedding = EmbeddingConfig {
        enabled: !cli.no_embeddings,
        chunked: cli.chunked_embeddings,
        model: cli.embedding_model.clone(),
        dimension: cli.embedding_dimension,
        batch_size: cli.embedding_batch_size,
        max_text_length: cli.embedding_max_text_length,
        chunk_overlap: cli.embedding_chunk_overlap,
    };
    let store = StoreConfig {
        enabled: !cli.no_database,
        database_url: cli.database_url.clone(),
    };

    let mut builder = ExtractionConfig::builder()
        .chunk_size(cli.chunk_size)
        .max_attempts(cli.max_attempts)
        .retry_backoff_ms(cli.retry_backoff_ms)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .attachment(cli.attachment.into())
        .max_rendered_pixels(cli.max_pixels)
        .summaries(!cli.no_summaries)
        .concurrency(cli.concurrency)
        .embedding(embedding)
        .store(store);

    if let Some(models) = &cli.models {
        builder = builder.models(models.iter().map(|m| m.trim().to_string()));
    }
    if let Some(provider) = &cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(model) = &cli.summary_model {
        builder = builder.summary_model(model.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
