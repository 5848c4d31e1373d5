//! Page splitting: cut a decision PDF into bounded page-range sub-PDFs.
//!
//! ## Why lopdf?
//!
//! Splitting only rewrites the page tree; nothing is rendered. lopdf does that
//! in pure Rust, so chunking works on machines without a pdfium library and
//! tests can build their own fixtures in memory.
//!
//! ## Lifetime of chunk files
//!
//! Every sub-PDF lives inside one `TempDir` owned by [`ChunkSet`]. Dropping
//! the set removes the directory, whichever way the run ends (success, error,
//! panic, or cancellation between chunks).

use crate::error::{DocumentError, ExtractError};
use crate::pipeline::input;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// One page-range segment of the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position in the chunk sequence.
    pub index: usize,
    /// First page, 1-indexed, inclusive.
    pub start_page: usize,
    /// Last page, 1-indexed, inclusive.
    pub end_page: usize,
    /// Sub-PDF containing exactly `start_page..=end_page`.
    pub path: PathBuf,
}

impl Chunk {
    /// 1-based chunk number, as shown to the model and in logs.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn page_count(&self) -> usize {
        self.end_page + 1 - self.start_page
    }
}

/// The ordered chunks of one document plus the directory that holds them.
#[derive(Debug)]
pub struct ChunkSet {
    chunks: Vec<Chunk>,
    total_pages: usize,
    _dir: TempDir,
}

impl ChunkSet {
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Page count of the source document.
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Scratch directory holding the chunk files.
    pub fn dir(&self) -> &Path {
        self._dir.path()
    }
}

/// Inclusive 1-indexed page ranges covering `1..=total_pages` with no gaps
/// or overlaps, each at most `chunk_size` pages long.
///
/// A `chunk_size` of 0 is treated as 1.
pub fn page_ranges(total_pages: usize, chunk_size: usize) -> Vec<(usize, usize)> {
    let size = chunk_size.max(1);
    (1..=total_pages)
        .step_by(size)
        .map(|start| (start, (start + size - 1).min(total_pages)))
        .collect()
}

/// Split the PDF at `path` into chunks of at most `chunk_size` pages.
///
/// Runs inside `spawn_blocking`: parsing and re-serialising a few hundred
/// pages is CPU-bound and would stall the Tokio workers.
pub async fn split_document(path: &Path, chunk_size: usize) -> Result<ChunkSet, ExtractError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || split_document_blocking(&path, chunk_size))
        .await
        .map_err(|e| ExtractError::Internal(format!("Split task panicked: {}", e)))?
}

/// Blocking implementation of [`split_document`].
pub fn split_document_blocking(path: &Path, chunk_size: usize) -> Result<ChunkSet, ExtractError> {
    let document = load_document(path)?;
    let total_pages = document.get_pages().len();
    info!("PDF loaded: {} pages", total_pages);

    let dir = tempfile::Builder::new()
        .prefix("putusan-chunks-")
        .tempdir()
        .map_err(|e| ExtractError::Internal(format!("Failed to create chunk dir: {}", e)))?;

    let ranges = page_ranges(total_pages, chunk_size);
    let mut chunks = Vec::with_capacity(ranges.len());

    for (index, (start, end)) in ranges.into_iter().enumerate() {
        let file = dir.path().join(format!("chunk_{:04}_{:04}.pdf", start, end));
        write_range(&document, total_pages, start, end, &file)?;
        debug!("Chunk {}: pages {}-{} → {}", index + 1, start, end, file.display());
        chunks.push(Chunk {
            index,
            start_page: start,
            end_page: end,
            path: file,
        });
    }

    info!(
        "Split into {} chunks of up to {} pages",
        chunks.len(),
        chunk_size.max(1)
    );

    Ok(ChunkSet {
        chunks,
        total_pages,
        _dir: dir,
    })
}

/// Open and parse a PDF, mapping every failure onto a [`DocumentError`].
pub fn load_document(path: &Path) -> Result<Document, DocumentError> {
    let bytes = std::fs::read(path).map_err(|e| input::io_to_document_error(path, e))?;
    input::check_pdf_magic(path, &bytes)?;

    let document = Document::load_mem(&bytes).map_err(|e| DocumentError::Corrupt {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    if document.get_pages().is_empty() {
        return Err(DocumentError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(document)
}

/// Write pages `start..=end` of `document` to `file`.
///
/// A partially written file is removed before the error is returned.
fn write_range(
    document: &Document,
    total_pages: usize,
    start: usize,
    end: usize,
    file: &Path,
) -> Result<(), ExtractError> {
    let mut sub = document.clone();
    let outside: Vec<u32> = (1..=total_pages)
        .filter(|p| *p < start || *p > end)
        .map(|p| p as u32)
        .collect();
    if !outside.is_empty() {
        sub.delete_pages(&outside);
        sub.prune_objects();
    }

    sub.save(file).map(|_| ()).map_err(|e| {
        let _ = std::fs::remove_file(file);
        ExtractError::ChunkWriteFailed {
            path: file.to_path_buf(),
            detail: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object, Stream};

    /// Build an in-memory PDF whose page `n` has MediaBox width `100 + n`.
    fn numbered_pdf(pages: usize) -> Vec<u8> {
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
        doc.save_to(&mut out).unwrap();
        out
    }

    fn page_widths(path: &Path) -> Vec<i64> {
        let doc = Document::load(path).unwrap();
        doc.get_pages()
            .values()
            .map(|id| {
                let page = doc.get_dictionary(*id).unwrap();
                page.get(b"MediaBox").unwrap().as_array().unwrap()[2]
                    .as_i64()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn ranges_for_25_pages_by_10() {
        assert_eq!(page_ranges(25, 10), vec![(1, 10), (11, 20), (21, 25)]);
    }

    #[test]
    fn ranges_edge_cases() {
        assert_eq!(page_ranges(10, 10), vec![(1, 10)]);
        assert_eq!(page_ranges(3, 10), vec![(1, 3)]);
        assert_eq!(page_ranges(3, 1), vec![(1, 1), (2, 2), (3, 3)]);
        assert_eq!(page_ranges(2, 0), vec![(1, 1), (2, 2)]);
        assert!(page_ranges(0, 10).is_empty());
    }

    #[test]
    fn ranges_cover_without_gaps_or_overlaps() {
        for total in 1..40 {
            for size in 1..12 {
                let ranges = page_ranges(total, size);
                let mut next = 1;
                for (s, e) in &ranges {
                    assert_eq!(*s, next);
                    assert!(e >= s && e - s < size);
                    next = e + 1;
                }
                assert_eq!(next, total + 1);
                assert_eq!(ranges, page_ranges(total, size));
            }
        }
    }

    #[test]
    fn split_writes_each_range_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("decision.pdf");
        std::fs::write(&src, numbered_pdf(7)).unwrap();

        let set = split_document_blocking(&src, 3).unwrap();
        assert_eq!(set.total_pages(), 7);
        assert_eq!(set.len(), 3);

        let chunks = set.chunks();
        assert_eq!((chunks[2].start_page, chunks[2].end_page), (7, 7));
        assert!(chunks[0].path.ends_with("chunk_0001_0003.pdf"));
        assert_eq!(page_widths(&chunks[0].path), vec![101, 102, 103]);
        assert_eq!(page_widths(&chunks[1].path), vec![104, 105, 106]);
        assert_eq!(page_widths(&chunks[2].path), vec![107]);
    }

    #[test]
    fn dropping_the_set_removes_chunk_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("decision.pdf");
        std::fs::write(&src, numbered_pdf(4)).unwrap();

        let set = split_document_blocking(&src, 2).unwrap();
        let scratch = set.dir().to_path_buf();
        let first = set.chunks()[0].path.clone();
        assert!(first.exists());
        drop(set);
        assert!(!first.exists());
        assert!(!scratch.exists());
    }

    #[test]
    fn rejects_missing_non_pdf_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("nope.pdf");
        assert!(matches!(
            load_document(&missing),
            Err(DocumentError::NotFound { .. })
        ));

        let text = dir.path().join("notes.pdf");
        std::fs::write(&text, b"hello world").unwrap();
        assert!(matches!(
            load_document(&text),
            Err(DocumentError::NotAPdf { .. })
        ));

        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"%PDF-1.5\ngarbage").unwrap();
        assert!(matches!(
            load_document(&broken),
            Err(DocumentError::Corrupt { .. })
        ));
    }

    #[test]
    fn zero_page_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("empty.pdf");
        std::fs::write(&src, numbered_pdf(0)).unwrap();
        let err = split_document_blocking(&src, 10).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::InvalidDocument(DocumentError::Empty { .. })
        ));
    }
}
