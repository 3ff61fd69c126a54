//! Result types returned by the render entry points.

use crate::config::ImageFormat;
use crate::pipeline::geometry::PageGeometry;
use crate::pipeline::input::DocumentKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One rendered page in its canonical slot, `page-<page_number>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-indexed.
    pub page_number: usize,
    pub path: PathBuf,
    pub format: ImageFormat,
}

/// Where the resolution of a render came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DpiSource {
    /// Given explicitly in the config; geometry was never resolved.
    Override,
    /// Derived from the page geometry and the pixel budget.
    Computed,
}

/// Everything a successful render produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Directory holding the page images.
    pub output_dir: PathBuf,
    pub dpi: u32,
    pub dpi_source: DpiSource,
    /// `None` when the DPI was overridden.
    pub geometry: Option<PageGeometry>,
    /// Sorted by `page_number`, which runs 1..=N without gaps.
    pub pages: Vec<PageImage>,
    pub stats: RenderStats,
}

/// Timing and size figures for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    pub page_count: usize,
    /// Time spent resolving geometry; zero with a DPI override.
    pub geometry_duration_ms: u64,
    /// Conversion, rasterisation and renaming.
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// What [`crate::inspect`] learns about a document without rendering it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInspection {
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub geometry: PageGeometry,
    /// DPI a render with the same config would use.
    pub dpi: u32,
    pub dpi_source: DpiSource,
}
