//! Error types for the doc2png library.
//!
//! Every fatal failure of the pipeline surfaces as one [`Doc2PngError`]
//! variant. There is no "partial success" type: a render either
//! returns the complete, contiguous page set or one of these errors.
//!
//! Two layers never produce a `Doc2PngError` directly:
//!
//! * the native geometry path, whose failure is swallowed and triggers the
//!   conversion-based fallback (see [`crate::pipeline::geometry`]);
//! * the conversion engine, which reports failure as a value
//!   ([`crate::pipeline::engine::Conversion`]) so callers decide what a
//!   missing output means.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2png library.
#[derive(Debug, Error)]
pub enum Doc2PngError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Geometry errors ───────────────────────────────────────────────────
    /// Neither the native container nor the converted PDF yielded a page size.
    #[error("Page geometry unavailable for '{path}': {detail}")]
    GeometryUnavailable { path: PathBuf, detail: String },

    /// A page dimension was zero, negative or not finite.
    #[error("Invalid page geometry: {width_in}in × {height_in}in")]
    InvalidGeometry { width_in: f64, height_in: f64 },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The headless engine produced no output through any fallback stage.
    #[error(
        "Conversion of '{path}' to {target} failed after {attempts} attempt(s).\n\
Is LibreOffice installed and `soffice` on PATH? Override with --soffice <PATH>."
    )]
    ConversionFailed {
        path: PathBuf,
        target: String,
        attempts: usize,
    },

    /// The intermediate PDF could not be read.
    #[error("PDF '{path}' is unreadable: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── Rasterisation errors ──────────────────────────────────────────────
    /// Zero pages were produced, or the page renderer failed.
    #[error("Rasterisation failed: {detail}")]
    RasterizationFailed { detail: String },

    /// Rendered page indices were not exactly `1..=N`.
    #[error("Page sequence invariant violated: {detail}")]
    SequencingInvariantViolated { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory or move a page image into place.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium system-wide, or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
Prebuilt binaries: https://github.com/bblanchon/pdfium-binaries\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_failed_display() {
        let e = Doc2PngError::ConversionFailed {
            path: PathBuf::from("/tmp/report.docx"),
            target: "pdf".into(),
            attempts: 2,
        };
        let msg = e.to_string();
        assert!(msg.contains("report.docx"), "got: {msg}");
        assert!(msg.contains("2 attempt"), "got: {msg}");
    }

    #[test]
    fn invalid_geometry_display() {
        let e = Doc2PngError::InvalidGeometry {
            width_in: 0.0,
            height_in: 11.0,
        };
        assert!(e.to_string().contains("0in"));
    }

    #[test]
    fn sequencing_display() {
        let e = Doc2PngError::SequencingInvariantViolated {
            detail: "missing page 2".into(),
        };
        assert!(e.to_string().contains("missing page 2"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = Doc2PngError::OutputWriteFailed {
            path: PathBuf::from("/out/page-1.png"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("disk full"));
    }
}
