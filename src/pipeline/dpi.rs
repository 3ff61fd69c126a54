//! Isotropic DPI from page geometry and a pixel budget.
//!
//! One scalar drives both axes so the page keeps its aspect ratio; the
//! tighter of the two budget constraints decides it. No ceiling is applied:
//! callers wanting a fixed resolution pass an explicit DPI and skip this
//! module altogether.

use crate::error::Doc2PngError;
use tracing::warn;

/// DPI above which a warning is logged. Purely diagnostic.
const HIGH_DPI_WARNING: u32 = 1200;

/// `round(min(max_width_px / width_in, max_height_px / height_in))`.
///
/// # Errors
/// * [`Doc2PngError::InvalidGeometry`] when a dimension is ≤ 0 or not finite.
/// * [`Doc2PngError::InvalidConfig`] when the budget is so small the result
///   rounds to zero.
pub fn compute_dpi(
    width_in: f64,
    height_in: f64,
    max_width_px: u32,
    max_height_px: u32,
) -> Result<u32, Doc2PngError> {
    if !(width_in.is_finite() && height_in.is_finite()) || width_in <= 0.0 || height_in <= 0.0 {
        return Err(Doc2PngError::InvalidGeometry {
            width_in,
            height_in,
        });
    }

    let by_width = f64::from(max_width_px) / width_in;
    let by_height = f64::from(max_height_px) / height_in;
    let dpi = by_width.min(by_height).round();

    if dpi < 1.0 {
        return Err(Doc2PngError::InvalidConfig(format!(
            "pixel budget {max_width_px}x{max_height_px} is too small for a \
             {width_in:.2}in × {height_in:.2}in page"
        )));
    }

    // Saturating cast: degenerate geometry may exceed u32.
    let dpi = dpi as u32;
    if dpi > HIGH_DPI_WARNING {
        warn!(
            "Computed {} DPI for a {:.3}in × {:.3}in page; images will be very large",
            dpi, width_in, height_in
        );
    }
    Ok(dpi)
}
