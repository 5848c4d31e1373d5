//! Attachment encoding: chunk sub-PDF or rendered pages → base64 attachments.
//!
//! Model APIs accept binary inputs as base64 embedded in the JSON request
//! body. In PDF mode the chunk file is sent as-is; in page-image mode each
//! rendered page becomes a lossless PNG, since JPEG artefacts on small legal
//! print degrade recognition.

use crate::client::Attachment;
use crate::config::ChunkAttachment;
use crate::error::ChunkError;
use crate::pipeline::render;
use crate::pipeline::split::Chunk;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Build the attachments for one chunk according to `mode`.
pub async fn chunk_attachments(
    chunk: &Chunk,
    mode: ChunkAttachment,
    max_pixels: u32,
) -> Result<Vec<Attachment>, ChunkError> {
    match mode {
        ChunkAttachment::Pdf => {
            let bytes = tokio::fs::read(&chunk.path)
                .await
                .map_err(|e| ChunkError::AttachmentFailed {
                    chunk: chunk.number(),
                    detail: format!("read {}: {}", chunk.path.display(), e),
                })?;
            Ok(vec![encode_pdf(&bytes)])
        }
        ChunkAttachment::PageImages => {
            let pages = render::render_chunk(&chunk.path, max_pixels)
                .await
                .map_err(|e| ChunkError::AttachmentFailed {
                    chunk: chunk.number(),
                    detail: e.to_string(),
                })?;
            pages
                .iter()
                .map(|img| {
                    encode_page(img).map_err(|e| ChunkError::AttachmentFailed {
                        chunk: chunk.number(),
                        detail: format!("Image encoding failed: {}", e),
                    })
                })
                .collect()
        }
    }
}

/// Wrap raw PDF bytes as an `application/pdf` attachment.
pub fn encode_pdf(bytes: &[u8]) -> Attachment {
    let data = STANDARD.encode(bytes);
    debug!("Encoded chunk PDF → {} bytes base64", data.len());
    Attachment {
        mime_type: "application/pdf".to_string(),
        data,
    }
}

/// Encode a rendered page as a base64 PNG attachment.
pub fn encode_page(img: &DynamicImage) -> Result<Attachment, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let data = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", data.len());

    Ok(Attachment {
        mime_type: "image/png".to_string(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::path::PathBuf;

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn encode_pdf_is_plain_base64() {
        let a = encode_pdf(b"%PDF-1.5");
        assert_eq!(a.mime_type, "application/pdf");
        assert_eq!(STANDARD.decode(&a.data).unwrap(), b"%PDF-1.5");
    }

    #[tokio::test]
    async fn pdf_mode_reads_the_chunk_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_0001_0002.pdf");
        std::fs::write(&path, b"%PDF-1.5 chunk").unwrap();
        let chunk = Chunk {
            index: 0,
            start_page: 1,
            end_page: 2,
            path,
        };
        let atts = chunk_attachments(&chunk, ChunkAttachment::Pdf, 2000).await.unwrap();
        assert_eq!(atts.len(), 1);
        assert_eq!(STANDARD.decode(&atts[0].data).unwrap(), b"%PDF-1.5 chunk");
    }

    #[tokio::test]
    async fn missing_chunk_file_is_a_chunk_error() {
        let chunk = Chunk {
            index: 4,
            start_page: 41,
            end_page: 50,
            path: PathBuf::from("/nonexistent/chunk_0041_0050.pdf"),
        };
        let err = chunk_attachments(&chunk, ChunkAttachment::Pdf, 2000)
            .await
            .unwrap_err();
        assert!(matches!(err, ChunkError::AttachmentFailed { chunk: 5, .. }));
    }
}
