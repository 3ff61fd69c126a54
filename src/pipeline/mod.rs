//! Pipeline stages for document-to-image rendering.
//!
//! Each submodule implements one step and is testable on its own; the
//! external programs (the headless office engine and pdfium) sit behind the
//! [`engine::HeadlessEngine`] and [`render::PageRenderer`] traits.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ geometry ──▶ dpi ──▶ rasterize ──────────────────────────▶ sequence
//! (path)    (inches)    (u32)    engine → inspect → render           (page-N.ext)
//!                                (PDF)    (pages)   (raw images)
//! ```
//!
//! 1. [`input`]     — validate the path, classify the container kind
//! 2. [`geometry`]  — page size from the OOXML container, or from a
//!    converted PDF when that fails
//! 3. [`dpi`]       — one isotropic DPI fitting the pixel budget
//! 4. [`engine`]    — headless conversion with a Direct → via-ODT fallback
//! 5. [`inspect`]   — page count and first-page size of a PDF
//! 6. [`render`]    — pdfium worker pool writing raw page images
//! 7. [`rasterize`] — steps 4–6 for one job, then
//! 8. [`sequence`]  — rename raw images to a contiguous `page-N` sequence

pub mod dpi;
pub mod engine;
pub mod geometry;
pub mod input;
pub mod inspect;
pub mod rasterize;
pub mod render;
pub mod sequence;
