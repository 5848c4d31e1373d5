//! Per-chunk stages of court-decision extraction.
//!
//! Each submodule implements exactly one step, so each is testable on its own
//! and the controller in [`crate::extract`] only wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ split ──▶ encode ──▶ invoke ──▶ merge
//! (path/URL) (lopdf)  (base64)   (LLM)     (accumulator)
//!                       │          │
//!                    render    sanitize
//!                   (pdfium)   (JSON cleanup)
//! ```
//!
//! 1. [`input`]: resolve a path, URL or byte buffer to a local PDF
//! 2. [`split`]: cut the PDF into page-range sub-PDFs in a scoped temp dir;
//!    runs in `spawn_blocking`
//! 3. [`encode`]: wrap a chunk as a base64 attachment (the sub-PDF itself,
//!    or PNG pages rendered by [`render`])
//! 4. [`invoke`]: call the model chain with retry, backoff and fallback;
//!    the only stage with network I/O
//! 5. [`sanitize`]: strip fences, invisible characters and raw control
//!    characters before parsing the JSON reply
//! 6. [`merge`]: deep-merge the chunk's partial record into the accumulator

pub mod encode;
pub mod input;
pub mod invoke;
pub mod merge;
pub mod render;
pub mod sanitize;
pub mod split;
