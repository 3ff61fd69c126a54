//! PDF rasterisation: write one image per page via pdfium.
//!
//! ## Output naming
//!
//! Workers name their files `page<worker:04>-<page:0W>.<ext>`, e.g.
//! `page0002-07.png`, where `W` is the digit count of the last page (at
//! least 2). The worker prefix keeps concurrent writers from colliding; the
//! trailing number is the 1-based page index. These names are an artefact of
//! the pool, not a contract: [`crate::pipeline::sequence`] turns them into
//! `page-N.<ext>`.
//!
//! ## Worker pool
//!
//! Pages are split into contiguous chunks, one per worker, and rendered on
//! `std::thread::scope` threads sharing one [`Pdfium`] binding (the
//! `thread_safe` + `sync` features serialise calls into the library). Each
//! worker opens its own `PdfDocument`.

use crate::config::ImageFormat;
use crate::error::Doc2PngError;
use crate::pipeline::inspect::POINTS_PER_INCH;
use crate::progress::ProgressCallback;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix shared by raw page files.
pub const RAW_PAGE_PREFIX: &str = "page";

/// Everything a [`PageRenderer`] needs besides the PDF itself.
#[derive(Clone)]
pub struct PageRenderRequest<'a> {
    pub dpi: u32,
    /// Page count of the PDF, as reported by the inspector.
    pub page_count: usize,
    pub output_dir: &'a Path,
    pub format: ImageFormat,
    /// Upper bound on worker threads.
    pub workers: usize,
    pub progress: Option<&'a ProgressCallback>,
}

/// The page-to-image step.
///
/// Implementations write one image per page into `request.output_dir` and
/// return the paths they wrote, in any order, named with a trailing 1-based
/// page index in the file stem.
pub trait PageRenderer: Send + Sync {
    fn render_pages(
        &self,
        pdf_path: &Path,
        request: &PageRenderRequest<'_>,
    ) -> Result<Vec<PathBuf>, Doc2PngError>;
}

/// pdfium-backed [`PageRenderer`].
///
/// Binds `PDFIUM_LIB_PATH` when set, otherwise the system library.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new() -> Self {
        Self {
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    /// Bind a specific pdfium shared library.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, Doc2PngError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        };
        bindings
            .map(Pdfium::new)
            .map_err(|e| Doc2PngError::PdfiumBindingFailed(format!("{:?}", e)))
    }
}

impl Default for PdfiumRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_pages(
        &self,
        pdf_path: &Path,
        request: &PageRenderRequest<'_>,
    ) -> Result<Vec<PathBuf>, Doc2PngError> {
        let pdfium = self.bind()?;
        let chunks = page_chunks(request.page_count, request.workers);
        info!(
            "Rendering {} pages at {} DPI on {} workers",
            request.page_count,
            request.dpi,
            chunks.len()
        );

        let pdfium = &pdfium;
        let results = std::thread::scope(|s| {
            let handles: Vec<_> = chunks
                .iter()
                .enumerate()
                .map(|(i, pages)| {
                    let pages = pages.clone();
                    s.spawn(move || render_chunk(pdfium, pdf_path, i + 1, pages, request))
                })
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(Doc2PngError::RasterizationFailed {
                            detail: "render worker panicked".into(),
                        })
                    })
                })
                .collect::<Vec<_>>()
        });

        let mut paths = Vec::with_capacity(request.page_count);
        for result in results {
            paths.extend(result?);
        }
        Ok(paths)
    }
}

/// Blocking body of one worker.
fn render_chunk(
    pdfium: &Pdfium,
    pdf_path: &Path,
    worker: usize,
    pages: RangeInclusive<usize>,
    request: &PageRenderRequest<'_>,
) -> Result<Vec<PathBuf>, Doc2PngError> {
    let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
        Doc2PngError::RasterizationFailed {
            detail: format!("pdfium cannot open {}: {:?}", pdf_path.display(), e),
        }
    })?;

    let render_config =
        PdfRenderConfig::new().scale_page_by_factor(request.dpi as f32 / POINTS_PER_INCH as f32);
    let document_pages = document.pages();
    let mut written = Vec::with_capacity(pages.clone().count());

    for page_num in pages {
        let page = document_pages
            .get(page_index(page_num)?)
            .map_err(|e| Doc2PngError::RasterizationFailed {
                detail: format!("page {}: {:?}", page_num, e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Doc2PngError::RasterizationFailed {
                detail: format!("page {}: {:?}", page_num, e),
            }
        })?;

        let image = bitmap.as_image();
        let path = request.output_dir.join(raw_page_name(
            worker,
            page_num,
            request.page_count,
            request.format,
        ));
        save_image(image, &path, request.format)?;
        debug!(
            "Worker {} rendered page {} → {}",
            worker,
            page_num,
            path.display()
        );

        if let Some(cb) = request.progress {
            cb.on_page_rendered(page_num, request.page_count);
        }
        written.push(path);
    }

    Ok(written)
}

fn save_image(image: DynamicImage, path: &Path, format: ImageFormat) -> Result<(), Doc2PngError> {
    // JPEG has no alpha channel.
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        ImageFormat::Png => image,
    };
    image
        .save_with_format(path, format.as_image_format())
        .map_err(|e| Doc2PngError::RasterizationFailed {
            detail: format!("cannot write {}: {}", path.display(), e),
        })
}

/// Split pages `1..=page_count` into at most `workers` contiguous, non-empty chunks.
pub fn page_chunks(page_count: usize, workers: usize) -> Vec<RangeInclusive<usize>> {
    if page_count == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, page_count);
    let base = page_count / workers;
    let extra = page_count % workers;

    let mut chunks = Vec::with_capacity(workers);
    let mut start = 1;
    for i in 0..workers {
        let len = base + usize::from(i < extra);
        chunks.push(start..=start + len - 1);
        start += len;
    }
    chunks
}

/// pdfium's zero-based page index for a 1-based page number.
fn page_index(page_num: usize) -> Result<u16, Doc2PngError> {
    u16::try_from(page_num - 1).map_err(|_| Doc2PngError::RasterizationFailed {
        detail: format!("page {page_num} is beyond pdfium's page index range"),
    })
}

/// `page<worker:04>-<page:0W>.<ext>`, W = max(2, digits(page_count)).
pub fn raw_page_name(worker: usize, page_num: usize, page_count: usize, format: ImageFormat) -> String {
    let width = page_count.to_string().len().max(2);
    format!(
        "{RAW_PAGE_PREFIX}{worker:04}-{page_num:0width$}.{}",
        format.extension()
    )
}
