//! Document → ordered page images at a fixed DPI.
//!
//! ```text
//! document ──▶ ConversionEngine (→ PDF) ──▶ inspect_pdf ──▶ PageRenderer ──▶ sequence ──▶ publish
//!              soffice_convert_* dir        page count      raw names        page-N.ext   output dir
//! ```
//!
//! The intermediate PDF lives in a call-scoped `soffice_convert_*` directory
//! that is removed however the call ends. Pages are rendered and sequenced in
//! a `.doc2png_staging_*` directory inside the output directory and moved out
//! only once all of them exist, so a failed call leaves no raw files behind.
//! An output directory the call had to create is removed again on failure.

use crate::config::ImageFormat;
use crate::error::Doc2PngError;
use crate::output::PageImage;
use crate::pipeline::engine::{self, ConversionEngine, TargetFormat};
use crate::pipeline::input::Document;
use crate::pipeline::inspect;
use crate::pipeline::render::{PageRenderRequest, PageRenderer};
use crate::pipeline::sequence;
use crate::progress::ProgressCallback;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Prefix of the per-call staging directory inside the output directory.
pub const STAGING_DIR_PREFIX: &str = ".doc2png_staging_";

/// Per-job render settings besides the DPI.
#[derive(Clone, Copy)]
pub struct RasterOptions<'a> {
    pub format: ImageFormat,
    pub workers: usize,
    pub progress: Option<&'a ProgressCallback>,
}

/// Wires the conversion chain to a page renderer.
pub struct Rasterizer<'a> {
    conversion: &'a ConversionEngine,
    renderer: &'a dyn PageRenderer,
}

impl<'a> Rasterizer<'a> {
    pub fn new(conversion: &'a ConversionEngine, renderer: &'a dyn PageRenderer) -> Self {
        Self {
            conversion,
            renderer,
        }
    }

    /// Render every page of `document` into `output_dir` at `dpi`.
    ///
    /// On success `output_dir` holds exactly `page-1.<ext>` … `page-N.<ext>`
    /// among its page files; canonical pages from an earlier, longer render
    /// are removed. Files that are not page images are left alone.
    ///
    /// # Errors
    /// * [`Doc2PngError::ConversionFailed`] when no stage produced a PDF.
    /// * [`Doc2PngError::RasterizationFailed`] when the PDF is unreadable or
    ///   empty, the renderer fails, or it returns a different number of images
    ///   than the PDF has pages.
    /// * [`Doc2PngError::SequencingInvariantViolated`] from the renaming step.
    /// * [`Doc2PngError::OutputWriteFailed`] when `output_dir`, the staging
    ///   directory or the conversion directory cannot be created, or a page
    ///   cannot be moved into place.
    pub fn rasterize(
        &self,
        document: &Document,
        output_dir: &Path,
        dpi: u32,
        options: RasterOptions<'_>,
    ) -> Result<Vec<PageImage>, Doc2PngError> {
        let created = !output_dir.exists();
        fs::create_dir_all(output_dir).map_err(|e| Doc2PngError::OutputWriteFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let result = self.rasterize_into(document, output_dir, dpi, options);
        if result.is_err() && created {
            if let Err(e) = fs::remove_dir_all(output_dir) {
                warn!("Could not remove {}: {}", output_dir.display(), e);
            }
        }
        result
    }

    fn rasterize_into(
        &self,
        document: &Document,
        output_dir: &Path,
        dpi: u32,
        options: RasterOptions<'_>,
    ) -> Result<Vec<PageImage>, Doc2PngError> {
        let workdir = engine::conversion_dir().map_err(|e| Doc2PngError::OutputWriteFailed {
            path: std::env::temp_dir(),
            source: e,
        })?;

        let conversion = self
            .conversion
            .convert(document.path(), TargetFormat::Pdf, workdir.path());
        let attempts = conversion.attempts().len();
        let pdf = conversion
            .into_output()
            .ok_or_else(|| Doc2PngError::ConversionFailed {
                path: document.path().to_path_buf(),
                target: TargetFormat::Pdf.to_string(),
                attempts,
            })?;

        let info = inspect::inspect_pdf(&pdf).map_err(|e| Doc2PngError::RasterizationFailed {
            detail: e.to_string(),
        })?;
        if info.page_count == 0 {
            return Err(Doc2PngError::RasterizationFailed {
                detail: format!("{} has no pages", pdf.display()),
            });
        }
        info!("Intermediate PDF has {} pages", info.page_count);

        // Same filesystem as output_dir, so publishing is a rename.
        let staging = tempfile::Builder::new()
            .prefix(STAGING_DIR_PREFIX)
            .tempdir_in(output_dir)
            .map_err(|e| Doc2PngError::OutputWriteFailed {
                path: output_dir.to_path_buf(),
                source: e,
            })?;

        if let Some(cb) = options.progress {
            cb.on_render_start(info.page_count);
        }

        let request = PageRenderRequest {
            dpi,
            page_count: info.page_count,
            output_dir: staging.path(),
            format: options.format,
            workers: options.workers,
            progress: options.progress,
        };
        let raw = self.renderer.render_pages(&pdf, &request)?;
        if raw.len() != info.page_count {
            return Err(Doc2PngError::RasterizationFailed {
                detail: format!(
                    "renderer wrote {} images for {} pages",
                    raw.len(),
                    info.page_count
                ),
            });
        }
        debug!("Renderer wrote {} raw images", raw.len());

        let pages = sequence::publish(sequence::normalize(&raw)?, output_dir)?;
        let stale = sequence::remove_stale_pages(output_dir, &pages)?;
        if stale > 0 {
            info!("Removed {} stale pages from {}", stale, output_dir.display());
        }
        Ok(pages)
    }
}
