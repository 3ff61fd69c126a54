//! Page geometry: physical page width and height in inches.
//!
//! Two strategies are tried in order until one returns `Ok`:
//!
//! 1. [`GeometrySource::NativeContainer`] — read the first section's
//!    `<w:pgSz w:w=".." w:h=".."/>` out of `word/document.xml`. Values are
//!    twips (1/1440 inch). Cheap: no external process.
//! 2. [`GeometrySource::ConvertedPdf`] — convert the document to PDF with the
//!    headless engine and read the first page's size in points.
//!
//! Generic documents only get the second strategy. A native failure is
//! logged and kept for the final error message but never returned on its own.

use crate::error::Doc2PngError;
use crate::pipeline::engine::{self, ConversionEngine, TargetFormat};
use crate::pipeline::input::{Document, DocumentKind};
use crate::pipeline::inspect::{self, POINTS_PER_INCH};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Twentieths of a point: the OOXML length unit.
pub const TWIPS_PER_INCH: f64 = 1440.0;

/// The archive entry holding the document body.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Which strategy produced a [`PageGeometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometrySource {
    NativeContainer,
    ConvertedPdf,
}

/// Physical page size of a document. Both dimensions are positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_in: f64,
    pub height_in: f64,
    pub source: GeometrySource,
}

impl PageGeometry {
    fn new(width_in: f64, height_in: f64, source: GeometrySource) -> Option<Self> {
        (width_in.is_finite() && height_in.is_finite() && width_in > 0.0 && height_in > 0.0)
            .then_some(Self {
                width_in,
                height_in,
                source,
            })
    }
}

/// Why the native path could not produce a page size.
#[derive(Debug, Error)]
pub enum NativeGeometryError {
    #[error("cannot read container: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a zip container: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("container has no 'word/document.xml' entry")]
    MissingDocumentPart,

    #[error("malformed XML in 'word/document.xml': {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("no section properties (sectPr) in the document body")]
    SectionPropertiesMissing,

    #[error("first section has no page size (pgSz)")]
    PageSizeMissing,

    #[error("page size attribute '{0}' is missing or not a number")]
    PageSizeAttribute(&'static str),

    #[error("page size {width}×{height} twips is not positive")]
    NonPositivePageSize { width: f64, height: f64 },
}

/// Resolves page geometry for documents, using `conversion` for the fallback.
pub struct GeometryResolver<'a> {
    conversion: &'a ConversionEngine,
}

impl<'a> GeometryResolver<'a> {
    pub fn new(conversion: &'a ConversionEngine) -> Self {
        Self { conversion }
    }

    /// Strategies tried for a document kind, in order.
    pub fn strategies_for(kind: DocumentKind) -> &'static [GeometrySource] {
        match kind {
            DocumentKind::Native => &[GeometrySource::NativeContainer, GeometrySource::ConvertedPdf],
            DocumentKind::Generic => &[GeometrySource::ConvertedPdf],
        }
    }

    /// Resolve the page size of `document`.
    ///
    /// # Errors
    /// [`Doc2PngError::GeometryUnavailable`] once every strategy has failed;
    /// its detail lists each strategy's reason.
    pub fn resolve_geometry(&self, document: &Document) -> Result<PageGeometry, Doc2PngError> {
        let mut failures = Vec::new();

        for &source in Self::strategies_for(document.kind()) {
            let result = match source {
                GeometrySource::NativeContainer => {
                    native_geometry(document.path()).map_err(|e| e.to_string())
                }
                GeometrySource::ConvertedPdf => self.converted_geometry(document),
            };
            match result {
                Ok(geometry) => {
                    info!(
                        "Page geometry {:.3}in × {:.3}in from {:?}",
                        geometry.width_in, geometry.height_in, source
                    );
                    return Ok(geometry);
                }
                Err(reason) => {
                    warn!("{:?} geometry failed for {}: {}", source, document.path().display(), reason);
                    failures.push(format!("{source:?}: {reason}"));
                }
            }
        }

        Err(Doc2PngError::GeometryUnavailable {
            path: document.path().to_path_buf(),
            detail: failures.join("; "),
        })
    }

    /// Convert to PDF in a scoped directory and read the first page size.
    fn converted_geometry(&self, document: &Document) -> Result<PageGeometry, String> {
        let workdir = engine::conversion_dir()
            .map_err(|e| format!("cannot create conversion directory: {e}"))?;

        let conversion = self
            .conversion
            .convert(document.path(), TargetFormat::Pdf, workdir.path());
        let pdf = conversion
            .output()
            .ok_or("engine produced no PDF through any stage")?;

        let info = inspect::inspect_pdf(pdf).map_err(|e| e.to_string())?;
        let (width_pts, height_pts) = info
            .first_page_size_pts
            .ok_or("converted PDF has no pages")?;

        PageGeometry::new(
            width_pts / POINTS_PER_INCH,
            height_pts / POINTS_PER_INCH,
            GeometrySource::ConvertedPdf,
        )
        .ok_or_else(|| format!("invalid PDF page size {width_pts}×{height_pts} pt"))
    }
}

/// Read the page size straight from an OOXML container.
pub fn native_geometry(path: &Path) -> Result<PageGeometry, NativeGeometryError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut entry = archive.by_name(DOCUMENT_PART).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => NativeGeometryError::MissingDocumentPart,
        other => NativeGeometryError::Archive(other),
    })?;

    let mut xml = Vec::new();
    entry.read_to_end(&mut xml)?;

    let (width, height) = first_section_page_size(&xml)?;
    debug!("pgSz {}×{} twips in {}", width, height, path.display());

    PageGeometry::new(
        width / TWIPS_PER_INCH,
        height / TWIPS_PER_INCH,
        GeometrySource::NativeContainer,
    )
    .ok_or(NativeGeometryError::NonPositivePageSize { width, height })
}

/// `(w, h)` in twips of the `pgSz` child of the first `sectPr` in document order.
///
/// Namespace prefixes are ignored; `sectPr` may sit under `w:body` or inside
/// a paragraph's `w:pPr`.
pub fn first_section_page_size(xml: &[u8]) -> Result<(f64, f64), NativeGeometryError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    // Depth of the open `sectPr`, once found.
    let mut section_depth: Option<usize> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                match section_depth {
                    None if e.local_name().as_ref() == b"sectPr" => section_depth = Some(depth),
                    Some(d) if depth == d + 1 && e.local_name().as_ref() == b"pgSz" => {
                        return page_size_attributes(&e);
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => match section_depth {
                // A self-closing sectPr has no children at all.
                None if e.local_name().as_ref() == b"sectPr" => {
                    return Err(NativeGeometryError::PageSizeMissing);
                }
                Some(d) if depth == d && e.local_name().as_ref() == b"pgSz" => {
                    return page_size_attributes(&e);
                }
                _ => {}
            },
            Event::End(_) => {
                if section_depth == Some(depth) {
                    return Err(NativeGeometryError::PageSizeMissing);
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(NativeGeometryError::SectionPropertiesMissing)
}

fn page_size_attributes(element: &BytesStart<'_>) -> Result<(f64, f64), NativeGeometryError> {
    let mut width = None;
    let mut height = None;
    for attr in element.attributes().filter_map(|a| a.ok()) {
        let value = String::from_utf8_lossy(&attr.value);
        match attr.key.local_name().as_ref() {
            b"w" => width = value.trim().parse::<f64>().ok(),
            b"h" => height = value.trim().parse::<f64>().ok(),
            _ => {}
        }
    }

    let width = width.ok_or(NativeGeometryError::PageSizeAttribute("w"))?;
    let height = height.ok_or(NativeGeometryError::PageSizeAttribute("h"))?;
    if width <= 0.0 || height <= 0.0 {
        return Err(NativeGeometryError::NonPositivePageSize { width, height });
    }
    Ok((width, height))
}
