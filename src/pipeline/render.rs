//! Page rasterisation for [`ChunkAttachment::PageImages`] mode.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations.
//!
//! ## Binding
//!
//! `PDFIUM_LIB_PATH` (a file or a directory containing the platform library)
//! wins; otherwise the system library is used.
//!
//! [`ChunkAttachment::PageImages`]: crate::config::ChunkAttachment::PageImages

use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rasterise every page of a chunk sub-PDF, longest edge capped at `max_pixels`.
pub async fn render_chunk(
    pdf_path: &Path,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, ExtractError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || render_chunk_blocking(&path, max_pixels))
        .await
        .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))?
}

/// Bind to a pdfium library.
pub fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(raw) => {
            let path = PathBuf::from(raw);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of page rendering.
fn render_chunk_blocking(
    pdf_path: &Path,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, ExtractError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ExtractError::Internal(format!("pdfium could not open {}: {:?}", pdf_path.display(), e)))?;

    let pages = document.pages();
    info!("Rendering {} pages of {}", pages.len(), pdf_path.display());

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractError::Internal(format!("Rasterisation failed for page {}: {:?}", idx + 1, e))
        })?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push(image);
    }
    Ok(results)
}
