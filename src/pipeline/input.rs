//! Input resolution: normalise a path, URL or byte buffer to a local PDF file.
//!
//! ## Why download to a temp file?
//!
//! The splitter and the optional page renderer both work on file-system
//! paths. Downloading (or spilling an in-memory buffer) into a `TempDir`
//! gives them a path while ensuring cleanup happens automatically when
//! `ResolvedInput` is dropped, even if the process panics. We validate the
//! PDF magic bytes (`%PDF`) before returning so callers get a meaningful
//! error rather than a parser failure deep in the chunk loop.

use crate::error::{DocumentError, ExtractError};
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Where a document comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Path(PathBuf),
    Url(String),
    /// Raw PDF bytes; `name` is used for the key and the scratch file name.
    Bytes { name: String, bytes: Vec<u8> },
}

impl DocumentSource {
    /// Classify a CLI-style argument as a URL or a local path.
    pub fn parse(input: &str) -> Self {
        if is_url(input) {
            DocumentSource::Url(input.to_string())
        } else {
            DocumentSource::Path(PathBuf::from(input))
        }
    }

    /// Human-readable origin for logs and reports.
    pub fn display_name(&self) -> String {
        match self {
            DocumentSource::Path(p) => p.display().to_string(),
            DocumentSource::Url(u) => u.clone(),
            DocumentSource::Bytes { name, .. } => name.clone(),
        }
    }

    /// The decision number this source is stored under.
    pub fn key(&self) -> String {
        match self {
            DocumentSource::Path(p) => document_key(&p.to_string_lossy()),
            DocumentSource::Url(u) => {
                let last = reqwest::Url::parse(u)
                    .ok()
                    .and_then(|parsed| {
                        parsed
                            .path_segments()
                            .and_then(|mut s| s.next_back().map(str::to_string))
                    })
                    .filter(|s| !s.is_empty());
                document_key(last.as_deref().unwrap_or(u))
            }
            DocumentSource::Bytes { name, .. } => document_key(name),
        }
    }
}

/// The resolved input: a local path, or a scratch copy kept alive until
/// processing completes.
pub enum ResolvedInput {
    Local(PathBuf),
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Derive the storage key from a file name: the base name without `.pdf`.
///
/// `"/data/putusan/123_K_Pid.Sus_2024.pdf"` → `"123_K_Pid.Sus_2024"`.
pub fn document_key(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.len().checked_sub(4) {
        Some(cut) if base.is_char_boundary(cut) && base[cut..].eq_ignore_ascii_case(".pdf") => {
            base[..cut].to_string()
        }
        _ => base.to_string(),
    }
}

/// Resolve a source to a local PDF file path.
pub async fn resolve_source(
    source: &DocumentSource,
    timeout_secs: u64,
) -> Result<ResolvedInput, ExtractError> {
    match source {
        DocumentSource::Path(p) => resolve_local(p),
        DocumentSource::Url(u) => download_url(u, timeout_secs).await,
        DocumentSource::Bytes { name, bytes } => spill_bytes(name, bytes).await,
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path: &Path) -> Result<ResolvedInput, ExtractError> {
    let mut file = std::fs::File::open(path).map_err(|e| io_to_document_error(path, e))?;

    let mut magic = [0u8; 4];
    let read = file
        .read(&mut magic)
        .map_err(|e| io_to_document_error(path, e))?;
    check_pdf_magic(path, &magic[..read])?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path.to_path_buf()))
}

/// Reject anything that does not start with `%PDF`.
pub fn check_pdf_magic(path: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(DocumentError::NotAPdf {
            path: path.to_path_buf(),
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

/// Map an I/O failure on `path` to the matching [`DocumentError`].
pub fn io_to_document_error(path: &Path, e: std::io::Error) -> DocumentError {
    match e.kind() {
        std::io::ErrorKind::NotFound => DocumentError::NotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => DocumentError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => DocumentError::Unreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    }
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    info!("Downloading PDF from: {}", url);

    if reqwest::Url::parse(url).is_err() {
        return Err(ExtractError::InvalidInput {
            input: url.to_string(),
        });
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ExtractError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let filename = format!("{}.pdf", DocumentSource::Url(url.to_string()).key());
    let resolved = write_scratch(&filename, &bytes).await?;
    info!("Downloaded to: {}", resolved.path().display());
    Ok(resolved)
}

/// Write an in-memory PDF to a scratch file.
async fn spill_bytes(name: &str, bytes: &[u8]) -> Result<ResolvedInput, ExtractError> {
    let filename = format!("{}.pdf", document_key(name));
    write_scratch(&filename, bytes).await
}

async fn write_scratch(filename: &str, bytes: &[u8]) -> Result<ResolvedInput, ExtractError> {
    let temp_dir = TempDir::new().map_err(|e| ExtractError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename);

    check_pdf_magic(&file_path, bytes)?;

    tokio::fs::write(&file_path, bytes)
        .await
        .map_err(|e| ExtractError::Internal(format!("Failed to write temp file: {}", e)))?;

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Expand a directory into its `*.pdf` files, sorted by name.
///
/// `limit` caps how many files are returned.
pub fn collect_pdfs(dir: &Path, limit: Option<usize>) -> Result<Vec<PathBuf>, ExtractError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ExtractError::InvalidDocument(io_to_document_error(dir, e)))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();

    if let Some(n) = limit {
        files.truncate(n);
    }
    debug!("Found {} PDF files in {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn keys_strip_directory_and_extension() {
        assert_eq!(document_key("/data/123_K_Pid.Sus_2024.pdf"), "123_K_Pid.Sus_2024");
        assert_eq!(document_key("C:\\in\\45_PK_PID_2023.PDF"), "45_PK_PID_2023");
        assert_eq!(document_key("no_extension"), "no_extension");
        assert_eq!(document_key("a.pdf.bak"), "a.pdf.bak");
    }

    #[test]
    fn url_key_uses_last_segment() {
        let src = DocumentSource::parse("https://putusan3.mahkamahagung.go.id/files/99_K_Pid_2022.pdf?dl=1");
        assert_eq!(src.key(), "99_K_Pid_2022");
        assert!(matches!(src, DocumentSource::Url(_)));
    }

    #[test]
    fn local_resolution_checks_magic_and_existence() {
        let dir = tempfile::tempdir().unwrap();

        let good = dir.path().join("ok.pdf");
        std::fs::write(&good, b"%PDF-1.7\n").unwrap();
        assert!(resolve_local(&good).is_ok());

        let bad = dir.path().join("bad.pdf");
        std::fs::write(&bad, b"PK\x03\x04zip").unwrap();
        assert!(matches!(
            resolve_local(&bad),
            Err(ExtractError::InvalidDocument(DocumentError::NotAPdf { .. }))
        ));

        let tiny = dir.path().join("tiny.pdf");
        std::fs::write(&tiny, b"%P").unwrap();
        assert!(resolve_local(&tiny).is_err());

        assert!(matches!(
            resolve_local(&dir.path().join("missing.pdf")),
            Err(ExtractError::InvalidDocument(DocumentError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn bytes_are_spilled_and_cleaned_up() {
        let source = DocumentSource::Bytes {
            name: "7_K_Pid_2021.pdf".into(),
            bytes: b"%PDF-1.4\n".to_vec(),
        };
        let resolved = resolve_source(&source, 5).await.unwrap();
        let path = resolved.path().to_path_buf();
        assert!(path.ends_with("7_K_Pid_2021.pdf"));
        assert!(path.exists());
        drop(resolved);
        assert!(!path.exists());
    }

    #[test]
    fn collect_pdfs_filters_sorts_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "c.txt", "d.pdf"] {
            std::fs::write(dir.path().join(name), b"%PDF").unwrap();
        }
        let all = collect_pdfs(dir.path(), None).unwrap();
        let names: Vec<_> = all
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf", "d.pdf"]);
        assert_eq!(collect_pdfs(dir.path(), Some(2)).unwrap().len(), 2);
    }
}
