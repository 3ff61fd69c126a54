//! Page-format metadata: page count and first-page size of a PDF.
//!
//! Read with `lopdf` rather than pdfium so geometry resolution never needs
//! the native rendering library. Page boxes are inheritable in PDF, so the
//! lookup walks the `/Parent` chain of the page tree.

use crate::error::Doc2PngError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Guards against cyclic `/Parent` references in malformed files.
const MAX_PARENT_DEPTH: usize = 64;

/// What the rasteriser and the geometry fallback need to know about a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfInfo {
    pub page_count: usize,
    /// `(width, height)` of page 1 in points, as displayed (rotation applied).
    /// `None` when the document has no pages.
    pub first_page_size_pts: Option<(f64, f64)>,
}

/// Inspect the PDF at `path`.
pub fn inspect_pdf(path: &Path) -> Result<PdfInfo, Doc2PngError> {
    let corrupt = |detail: String| Doc2PngError::CorruptPdf {
        path: path.to_path_buf(),
        detail,
    };

    let document = Document::load(path).map_err(|e| corrupt(e.to_string()))?;
    let pages = document.get_pages();
    let page_count = pages.len();

    let first_page_size_pts = match pages.values().next() {
        Some(&page_id) => Some(page_size(&document, page_id).map_err(corrupt)?),
        None => None,
    };

    debug!(
        "Inspected {}: {} pages, first page {:?} pt",
        path.display(),
        page_count,
        first_page_size_pts
    );
    Ok(PdfInfo {
        page_count,
        first_page_size_pts,
    })
}

/// Displayed size of a page in points.
fn page_size(document: &Document, page_id: ObjectId) -> Result<(f64, f64), String> {
    let rect = inherited(document, page_id, b"CropBox")
        .or_else(|| inherited(document, page_id, b"MediaBox"))
        .ok_or_else(|| format!("page {page_id:?} has neither CropBox nor MediaBox"))?;
    let (width, height) = rect_size(document, rect)?;

    let rotate = inherited(document, page_id, b"Rotate")
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0);
    if rotate.rem_euclid(180) == 90 {
        Ok((height, width))
    } else {
        Ok((width, height))
    }
}

/// Look a key up on the page, then on its ancestors.
fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict: &Dictionary = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(value) = dict.get(key) {
            return resolve(document, value);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = document.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn rect_size(document: &Document, rect: &Object) -> Result<(f64, f64), String> {
    let values = rect
        .as_array()
        .map_err(|e| format!("page box is not an array: {e}"))?;
    if values.len() != 4 {
        return Err(format!("page box has {} entries, expected 4", values.len()));
    }
    let mut coords = [0.0f64; 4];
    for (slot, value) in coords.iter_mut().zip(values) {
        let value = resolve(document, value).ok_or("dangling page box reference")?;
        *slot = number(value).ok_or_else(|| format!("non-numeric page box entry {value:?}"))?;
    }
    Ok(((coords[2] - coords[0]).abs(), (coords[3] - coords[1]).abs()))
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}
