//! Scoped SVG figures.
//!
//! Every figure owns its backend for the duration of one `draw_svg` call: the
//! root area is filled, drawn, presented and dropped before the call returns,
//! so no drawing state outlives the file it produced.

use std::error::Error;
use std::ops::Range;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{debug, warn};

use crate::error::AppError;

/// Default figure size in pixels.
pub const FIGURE_SIZE: (u32, u32) = (800, 600);

/// Result type of drawing closures (plotters errors are boxed on the way up).
pub type DrawResult = Result<(), Box<dyn Error>>;

pub type SvgArea<'a> = DrawingArea<SVGBackend<'a>, Shift>;

fn render<F>(path: &Path, size: (u32, u32), draw: F) -> DrawResult
where
    F: FnOnce(&SvgArea<'_>) -> DrawResult,
{
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    draw(&root)?;
    root.present()?;
    Ok(())
}

/// Draw one figure into `path`.
pub fn draw_svg<F>(path: &Path, size: (u32, u32), draw: F) -> Result<(), AppError>
where
    F: FnOnce(&SvgArea<'_>) -> DrawResult,
{
    render(path, size, draw)
        .map_err(|e| AppError::plot(format!("Failed to draw '{}': {e}", path.display())))?;
    debug!(path = %path.display(), "Wrote figure.");
    Ok(())
}

/// Drop points with a non-finite coordinate, logging how many were skipped.
pub fn finite_points(
    what: &str,
    points: impl IntoIterator<Item = (f64, f64)>,
) -> Vec<(f64, f64)> {
    let mut skipped = 0usize;
    let out: Vec<(f64, f64)> = points
        .into_iter()
        .filter(|(x, y)| {
            let keep = x.is_finite() && y.is_finite();
            if !keep {
                skipped += 1;
            }
            keep
        })
        .collect();
    if skipped > 0 {
        warn!(what, skipped, "Skipped non-finite points while plotting.");
    }
    out
}

/// Finite min..max of `values` widened by 5% on each side.
///
/// Falls back to `0..1` without finite values and to `v-1..v+1` for a
/// single distinct value.
pub fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !(lo.is_finite() && hi.is_finite()) {
        return 0.0..1.0;
    }
    let span = hi - lo;
    if span <= f64::EPSILON * hi.abs().max(1.0) {
        return (lo - 1.0)..(hi + 1.0);
    }
    let pad = 0.05 * span;
    (lo - pad)..(hi + pad)
}

/// Range for a log axis over the finite `values`, padded by a constant factor.
///
/// `None` when there is no finite value or any finite value is not positive;
/// callers fall back to a linear axis.
pub fn log_range(values: impl IntoIterator<Item = f64>) -> Option<Range<f64>> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values.into_iter().filter(|v| v.is_finite()) {
        if v <= 0.0 {
            return None;
        }
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return None;
    }
    let pad = (hi / lo).powf(0.05).max(1.5);
    Some((lo / pad)..(hi * pad))
}

/// Diverging red / pale yellow / blue map for values in `[-1, 1]`.
pub fn diverging_color(v: f64) -> RGBColor {
    const LOW: (f64, f64, f64) = (213.0, 62.0, 79.0);
    const MID: (f64, f64, f64) = (255.0, 255.0, 191.0);
    const HIGH: (f64, f64, f64) = (50.0, 136.0, 189.0);

    let t = if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
    let (from, to, f) = if t < 0.0 { (MID, LOW, -t) } else { (MID, HIGH, t) };
    let mix = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}
