//! Top-level entry points.
//!
//! [`render_document`] runs the whole pipeline on the calling thread; every
//! stage blocks (child processes, file I/O, pdfium). [`render_document_async`]
//! moves the same call onto tokio's blocking pool for async callers.
//! [`inspect`] stops after the DPI is known.

use crate::config::RenderConfig;
use crate::error::Doc2PngError;
use crate::output::{DocumentInspection, DpiSource, RenderOutput, RenderStats};
use crate::pipeline::dpi::compute_dpi;
use crate::pipeline::engine::{ConversionEngine, HeadlessEngine, SofficeEngine};
use crate::pipeline::geometry::{GeometryResolver, PageGeometry};
use crate::pipeline::input::{self, Document};
use crate::pipeline::rasterize::{RasterOptions, Rasterizer};
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Render every page of a document to `page-N.<ext>` images.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`  — Path to the document (`.docx` and friends natively, anything
///   the conversion engine can open otherwise)
/// * `config` — Render configuration
///
/// # Returns
/// The output directory, the DPI used and the pages in order. On success the
/// page numbers are exactly `1..=N` where `N` is the page count of the
/// intermediate PDF.
///
/// # Errors
/// - File not found / permission denied
/// - Page geometry unavailable (unless `config.dpi` is set)
/// - Conversion, rasterisation or sequencing failure
///
/// No partial page set is returned with `Ok`.
pub fn render_document(
    input: impl AsRef<Path>,
    config: &RenderConfig,
) -> Result<RenderOutput, Doc2PngError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    info!("Starting render: {}", input.display());

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let document = input::resolve_input(input)?;
    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| input::default_output_dir(&document));

    // ── Step 2: Collaborators ────────────────────────────────────────────
    let conversion = ConversionEngine::new(resolve_engine(config));
    let renderer = resolve_renderer(config);

    // ── Step 3: Resolution ───────────────────────────────────────────────
    let geometry_start = Instant::now();
    let (dpi, dpi_source, geometry) = resolve_dpi(&document, config, &conversion)?;
    let geometry_duration_ms = geometry_start.elapsed().as_millis() as u64;
    info!("Rendering at {} DPI ({:?})", dpi, dpi_source);

    // ── Step 4: Rasterise and sequence ───────────────────────────────────
    let render_start = Instant::now();
    let options = RasterOptions {
        format: config.image_format,
        workers: config.workers,
        progress: config.progress_callback.as_ref(),
    };
    let pages = Rasterizer::new(&conversion, renderer.as_ref()).rasterize(
        &document,
        &output_dir,
        dpi,
        options,
    )?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let stats = RenderStats {
        page_count: pages.len(),
        geometry_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Render complete: {} pages in {}, {}ms total",
        stats.page_count,
        output_dir.display(),
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_render_complete(pages.len());
    }

    Ok(RenderOutput {
        output_dir,
        dpi,
        dpi_source,
        geometry,
        pages,
        stats,
    })
}

/// [`render_document`] on tokio's blocking thread pool.
///
/// Must be called from within a tokio runtime.
pub async fn render_document_async(
    input: impl AsRef<Path>,
    config: &RenderConfig,
) -> Result<RenderOutput, Doc2PngError> {
    let input = input.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || render_document(&input, &config))
        .await
        .map_err(|e| Doc2PngError::Internal(format!("render task failed: {e}")))?
}

/// Resolve page geometry and the DPI a render would use, without rendering.
///
/// Geometry is always resolved here, even when `config.dpi` is set.
pub fn inspect(
    input: impl AsRef<Path>,
    config: &RenderConfig,
) -> Result<DocumentInspection, Doc2PngError> {
    let document = input::resolve_input(input)?;
    let conversion = ConversionEngine::new(resolve_engine(config));
    let geometry = GeometryResolver::new(&conversion).resolve_geometry(&document)?;

    let (dpi, dpi_source) = match config.dpi {
        Some(dpi) => (dpi, DpiSource::Override),
        None => (budget_dpi(&geometry, config)?, DpiSource::Computed),
    };

    Ok(DocumentInspection {
        path: document.path().to_path_buf(),
        kind: document.kind(),
        geometry,
        dpi,
        dpi_source,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// An explicit DPI skips geometry entirely.
fn resolve_dpi(
    document: &Document,
    config: &RenderConfig,
    conversion: &ConversionEngine,
) -> Result<(u32, DpiSource, Option<PageGeometry>), Doc2PngError> {
    if let Some(dpi) = config.dpi {
        debug!("DPI override {}; skipping geometry", dpi);
        return Ok((dpi, DpiSource::Override, None));
    }
    let geometry = GeometryResolver::new(conversion).resolve_geometry(document)?;
    let dpi = budget_dpi(&geometry, config)?;
    Ok((dpi, DpiSource::Computed, Some(geometry)))
}

fn budget_dpi(geometry: &PageGeometry, config: &RenderConfig) -> Result<u32, Doc2PngError> {
    compute_dpi(
        geometry.width_in,
        geometry.height_in,
        config.max_width_px,
        config.max_height_px,
    )
}

/// A pre-built engine wins over `soffice_path`.
fn resolve_engine(config: &RenderConfig) -> Arc<dyn HeadlessEngine> {
    match config.engine {
        Some(ref engine) => Arc::clone(engine),
        None => Arc::new(SofficeEngine::new(config.soffice_path.clone())),
    }
}

/// A pre-built renderer wins over pdfium.
fn resolve_renderer(config: &RenderConfig) -> Arc<dyn PageRenderer> {
    match config.page_renderer {
        Some(ref renderer) => Arc::clone(renderer),
        None => Arc::new(PdfiumRenderer::new()),
    }
}
