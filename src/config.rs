//! Configuration types for document rasterisation.
//!
//! All rendering behaviour is controlled through [`RenderConfig`], built via
//! its [`RenderConfigBuilder`]. The external collaborators (the headless
//! conversion engine and the PDF page renderer) are injectable here so that
//! an alternative engine, or a test double, can be substituted without
//! touching the pipeline.

use crate::error::Doc2PngError;
use crate::pipeline::engine::HeadlessEngine;
use crate::pipeline::render::PageRenderer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default pixel budget: width.
pub const DEFAULT_MAX_WIDTH_PX: u32 = 1600;
/// Default pixel budget: height.
pub const DEFAULT_MAX_HEIGHT_PX: u32 = 2000;
/// Default size of the page-render worker pool.
pub const DEFAULT_WORKERS: usize = 8;

/// Configuration for a document-to-images render.
///
/// # Example
/// ```rust
/// use doc2png::{ImageFormat, RenderConfig};
///
/// let config = RenderConfig::builder()
///     .max_width_px(1200)
///     .max_height_px(1600)
///     .image_format(ImageFormat::Png)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, None);
/// ```
#[derive(Clone)]
pub struct RenderConfig {
    /// Maximum page image width in pixels. Default: 1600.
    ///
    /// Together with `max_height_px` this forms the pixel budget from which
    /// an isotropic DPI is derived. The tighter of the two constraints wins,
    /// so one dimension usually ends up below its budget.
    pub max_width_px: u32,

    /// Maximum page image height in pixels. Default: 2000.
    pub max_height_px: u32,

    /// Explicit DPI. When set, page geometry is never resolved.
    pub dpi: Option<u32>,

    /// Directory receiving `page-N.<ext>`. Default: the input path with its
    /// extension stripped (`report.docx` → `report/`).
    pub output_dir: Option<PathBuf>,

    /// Encoding of the page images. Default: PNG.
    pub image_format: ImageFormat,

    /// Size of the page-render worker pool. Default: 8.
    pub workers: usize,

    /// Executable of the headless conversion engine. Default: `soffice`.
    pub soffice_path: PathBuf,

    /// Pre-constructed conversion engine. Takes precedence over `soffice_path`.
    pub engine: Option<Arc<dyn HeadlessEngine>>,

    /// Pre-constructed page renderer. Takes precedence over the pdfium default.
    pub page_renderer: Option<Arc<dyn PageRenderer>>,

    /// Receives per-page render events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_width_px: DEFAULT_MAX_WIDTH_PX,
            max_height_px: DEFAULT_MAX_HEIGHT_PX,
            dpi: None,
            output_dir: None,
            image_format: ImageFormat::default(),
            workers: DEFAULT_WORKERS,
            soffice_path: PathBuf::from("soffice"),
            engine: None,
            page_renderer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("max_width_px", &self.max_width_px)
            .field("max_height_px", &self.max_height_px)
            .field("dpi", &self.dpi)
            .field("output_dir", &self.output_dir)
            .field("image_format", &self.image_format)
            .field("workers", &self.workers)
            .field("soffice_path", &self.soffice_path)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field(
                "page_renderer",
                &self.page_renderer.as_ref().map(|_| "<dyn PageRenderer>"),
            )
            .finish()
    }
}

impl RenderConfig {
    /// Create a new builder for `RenderConfig`.
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn max_width_px(mut self, px: u32) -> Self {
        self.config.max_width_px = px;
        self
    }

    pub fn max_height_px(mut self, px: u32) -> Self {
        self.config.max_height_px = px;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = Some(dpi);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n;
        self
    }

    pub fn soffice_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.soffice_path = path.into();
        self
    }

    pub fn engine(mut self, engine: Arc<dyn HeadlessEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn page_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.config.page_renderer = Some(renderer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenderConfig, Doc2PngError> {
        let c = &self.config;
        if c.max_width_px == 0 || c.max_height_px == 0 {
            return Err(Doc2PngError::InvalidConfig(format!(
                "pixel budget must be positive, got {}x{}",
                c.max_width_px, c.max_height_px
            )));
        }
        if c.dpi == Some(0) {
            return Err(Doc2PngError::InvalidConfig("DPI must be ≥ 1".into()));
        }
        if c.workers == 0 {
            return Err(Doc2PngError::InvalidConfig("Workers must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding of the rendered page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless; keeps text edges crisp. (default)
    #[default]
    Png,
    /// Smaller files; alpha is flattened to RGB.
    Jpeg,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// Recognise a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }

    pub(crate) fn as_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
