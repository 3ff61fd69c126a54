//! Page sequencing: raw renderer output → `page-1.<ext>` … `page-N.<ext>`.
//!
//! Renderers name files however suits their worker pool; the only thing the
//! sequencer relies on is a trailing 1-based page index in the file stem.
//! All names are parsed and checked before the first rename, so a failed
//! call leaves the directory exactly as the renderer wrote it.
//!
//! Sequenced pages are then [`publish`]ed into the output directory, and
//! canonical files left there by an earlier, longer render are removed by
//! [`remove_stale_pages`].

use crate::config::ImageFormat;
use crate::error::Doc2PngError;
use crate::output::PageImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of canonical page files.
pub const CANONICAL_PREFIX: &str = "page-";

static RE_TRAILING_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)$").unwrap());

/// `page-N.<ext>` for every extension a page can be written with.
static RE_CANONICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^page-(\d+)\.(png|jpe?g)$").unwrap());

/// Canonical file name for a page.
pub fn canonical_name(page_number: usize, format: ImageFormat) -> String {
    format!("{CANONICAL_PREFIX}{page_number}.{}", format.extension())
}

/// Rename `raw` to canonical names and return the pages in ascending order.
///
/// # Errors
/// * [`Doc2PngError::SequencingInvariantViolated`] when a name carries no
///   index or an unknown image extension, or the indices are not exactly
///   `{1, …, raw.len()}`. Nothing is renamed in that case.
/// * [`Doc2PngError::OutputWriteFailed`] when a rename fails.
pub fn normalize(raw: &[PathBuf]) -> Result<Vec<PageImage>, Doc2PngError> {
    let mut by_index: BTreeMap<usize, (&Path, ImageFormat)> = BTreeMap::new();

    for path in raw {
        let (index, format) = parse_raw_name(path)?;
        if by_index.insert(index, (path.as_path(), format)).is_some() {
            return Err(violation(format!("page {index} appears more than once")));
        }
    }

    // Indices are distinct, so they are {1..=len} iff they all fall in range.
    if let Some((&index, (path, _))) = by_index
        .iter()
        .find(|&(&index, _)| index == 0 || index > raw.len())
    {
        return Err(violation(format!(
            "page {index} ({}) is outside 1..={}",
            path.display(),
            raw.len()
        )));
    }

    let mut pages = Vec::with_capacity(by_index.len());
    for (page_number, (path, format)) in by_index {
        let target = path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(canonical_name(page_number, format));
        if target != path {
            fs::rename(path, &target).map_err(|e| Doc2PngError::OutputWriteFailed {
                path: target.clone(),
                source: e,
            })?;
        }
        debug!("{} → {}", path.display(), target.display());
        pages.push(PageImage {
            page_number,
            path: target,
            format,
        });
    }
    Ok(pages)
}

/// Move sequenced pages into `dest` under their canonical names.
///
/// An existing file of the same name is replaced.
///
/// # Errors
/// [`Doc2PngError::OutputWriteFailed`] when a move fails. Pages moved before
/// the failure stay in `dest`.
pub fn publish(pages: Vec<PageImage>, dest: &Path) -> Result<Vec<PageImage>, Doc2PngError> {
    pages
        .into_iter()
        .map(|page| {
            let target = dest.join(canonical_name(page.page_number, page.format));
            fs::rename(&page.path, &target).map_err(|e| Doc2PngError::OutputWriteFailed {
                path: target.clone(),
                source: e,
            })?;
            Ok(PageImage {
                path: target,
                ..page
            })
        })
        .collect()
}

/// Delete `page-N.<ext>` files in `dir` that are not one of `keep`.
///
/// Returns the number of files removed. Other files are never touched.
pub fn remove_stale_pages(dir: &Path, keep: &[PageImage]) -> Result<usize, Doc2PngError> {
    let write_failed = |path: &Path, e| Doc2PngError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut removed = 0;
    for entry in fs::read_dir(dir).map_err(|e| write_failed(dir, e))? {
        let path = entry.map_err(|e| write_failed(dir, e))?.path();
        let is_canonical = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| RE_CANONICAL.is_match(n));
        if !is_canonical || !path.is_file() || keep.iter().any(|p| p.path == path) {
            continue;
        }
        fs::remove_file(&path).map_err(|e| write_failed(&path, e))?;
        debug!("Removed stale page {}", path.display());
        removed += 1;
    }
    Ok(removed)
}

fn parse_raw_name(path: &Path) -> Result<(usize, ImageFormat), Doc2PngError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| violation(format!("unreadable file name {}", path.display())))?;

    let index = RE_TRAILING_INDEX
        .captures(stem)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .ok_or_else(|| violation(format!("no page index in {}", path.display())))?;

    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension)
        .ok_or_else(|| violation(format!("not a page image: {}", path.display())))?;

    Ok((index, format))
}

fn violation(detail: String) -> Doc2PngError {
    Doc2PngError::SequencingInvariantViolated { detail }
}
