//! # doc2png
//!
//! Render word-processing documents to one image per page, at a resolution
//! derived from the document's own page size.
//!
//! ## Why derive the DPI?
//!
//! A fixed DPI makes a Letter page and an A3 page come out at wildly
//! different pixel sizes. This crate reads the physical page size first
//! (straight from the `.docx` container when it can, from a converted PDF
//! otherwise) and picks the single DPI at which the page fits a pixel budget,
//! 1600×2000 by default, without distorting its aspect ratio.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Input     validate the path, native (.docx/.docm/.dotx/.dotm) or generic
//!  ├─ 2. Geometry  page size in inches (OOXML sectPr/pgSz, else converted PDF)
//!  ├─ 3. DPI       round(min(max_w / w, max_h / h)), or an explicit override
//!  ├─ 4. Convert   soffice --headless → PDF, falling back through ODT
//!  ├─ 5. Render    pdfium worker pool, one image per page
//!  └─ 6. Sequence  page-1.png, page-2.png, … with no gaps
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2png::{render_document, RenderConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RenderConfig::default();
//!     let output = render_document("report.docx", &config)?;
//!     println!("{} pages at {} DPI in {}",
//!         output.pages.len(), output.dpi, output.output_dir.display());
//!     Ok(())
//! }
//! ```
//!
//! ## External programs
//!
//! * LibreOffice `soffice` on `PATH` (or [`RenderConfig::soffice_path`]).
//! * The pdfium shared library, from `PDFIUM_LIB_PATH` or the system
//!   library search path.
//!
//! Both can be replaced through [`RenderConfigBuilder::engine`] and
//! [`RenderConfigBuilder::page_renderer`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2png` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2png = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ImageFormat, RenderConfig, RenderConfigBuilder};
pub use convert::{inspect, render_document, render_document_async};
pub use error::Doc2PngError;
pub use output::{DocumentInspection, DpiSource, PageImage, RenderOutput, RenderStats};
pub use pipeline::engine::{HeadlessEngine, SofficeEngine};
pub use pipeline::geometry::{GeometrySource, PageGeometry};
pub use pipeline::input::DocumentKind;
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use progress::{NoopProgressCallback, ProgressCallback, RenderProgressCallback};
