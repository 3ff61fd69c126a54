//! Input resolution: validate the user-supplied path and classify its container.
//!
//! The headless engine is launched with `--outdir` pointing elsewhere and
//! may change its working directory, so the path is made absolute here once
//! and every later stage works from that.

use crate::error::Doc2PngError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions of the OOXML word-processing family, whose `word/document.xml`
/// carries the page size directly.
const NATIVE_EXTENSIONS: &[&str] = &["docx", "docm", "dotx", "dotm"];

/// How page geometry can be obtained from a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Zip-based OOXML container; geometry is read from its XML.
    Native,
    /// Anything else the engine can open; geometry comes from a converted PDF.
    Generic,
}

/// A validated source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    kind: DocumentKind,
}

impl Document {
    /// Absolute path to the source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// File name without extension; the engine names its outputs after it.
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }
}

/// Classify a path by extension, case-insensitively.
pub fn classify(path: &Path) -> DocumentKind {
    let is_native = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            NATIVE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false);

    if is_native {
        DocumentKind::Native
    } else {
        DocumentKind::Generic
    }
}

/// Resolve a local document path, validating existence and readability.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<Document, Doc2PngError> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(Doc2PngError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Doc2PngError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(Doc2PngError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    let absolute = std::path::absolute(path).map_err(|e| {
        Doc2PngError::Internal(format!("cannot absolutise {}: {e}", path.display()))
    })?;
    let kind = classify(&absolute);

    debug!("Resolved {:?} document: {}", kind, absolute.display());
    Ok(Document {
        path: absolute,
        kind,
    })
}

/// Default output directory: the input path with its extension stripped,
/// or `<stem>_pages` beside it when the input has no extension.
pub fn default_output_dir(document: &Document) -> PathBuf {
    let path = document.path();
    let stripped = path.with_extension("");
    if stripped == path {
        path.with_file_name(format!("{}_pages", file_stem(path)))
    } else {
        stripped
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
