use std::panic::{self, AssertUnwindSafe};

use geo::{CoordsIter, MapCoords};
use tracing::{debug, warn};

use crate::geometry::GeometryParts;

use super::buffer::inflate_polygons;
use super::KernelParams;

/// Runs `op` once, treating a panic or a non-finite coordinate in the result as failure.
fn attempt<F>(op: &F, a: &GeometryParts, b: &GeometryParts) -> Option<GeometryParts>
where
    F: Fn(&GeometryParts, &GeometryParts) -> GeometryParts,
{
    let result = panic::catch_unwind(AssertUnwindSafe(|| op(a, b))).ok()?;
    is_finite(&result).then_some(result)
}

fn is_finite(parts: &GeometryParts) -> bool {
    parts.points.iter().all(|c| c.x.is_finite() && c.y.is_finite())
        && parts
            .lines
            .iter()
            .flat_map(|l| l.coords())
            .all(|c| c.x.is_finite() && c.y.is_finite())
        && parts
            .polygons
            .iter()
            .flat_map(|p| p.coords_iter())
            .all(|c| c.x.is_finite() && c.y.is_finite())
}

/// Rounds every coordinate onto a grid of spacing `1 / scale`.
pub(super) fn snap_to_grid(parts: &GeometryParts, scale: f64) -> GeometryParts {
    let snapped = parts
        .clone()
        .into_geometry()
        .map_coords(|c| geo::Coord {
            x: (c.x * scale).round() / scale,
            y: (c.y * scale).round() / scale,
        });
    GeometryParts::from_geometry(&snapped)
}

/// Runs a kernel operation through the fallback ladder.
///
/// The operation is tried on the inputs as given, then on inputs snapped to
/// the reduced-precision grid, then with polygonal inputs inflated by the
/// fallback buffer. `None` means every rung failed.
pub(super) fn with_fallbacks<F>(
    params: &KernelParams,
    op_name: &'static str,
    a: &GeometryParts,
    b: &GeometryParts,
    op: F,
) -> Option<GeometryParts>
where
    F: Fn(&GeometryParts, &GeometryParts) -> GeometryParts,
{
    if let Some(result) = attempt(&op, a, b) {
        return Some(result);
    }

    debug!(op = op_name, scale = params.reduced_precision_scale, "retrying with reduced precision");
    let scale = params.reduced_precision_scale;
    if scale.is_finite() && scale > 0.0 {
        if let Some(result) = attempt(&op, &snap_to_grid(a, scale), &snap_to_grid(b, scale)) {
            return Some(result);
        }
    }

    debug!(op = op_name, distance = params.fallback_buffer, "retrying with buffered inputs");
    let inflated_a = inflate_polygons(a, params.fallback_buffer, params.buffer_segments);
    let inflated_b = inflate_polygons(b, params.fallback_buffer, params.buffer_segments);
    if let Some(result) = attempt(&op, &inflated_a, &inflated_b) {
        return Some(result);
    }

    warn!(op = op_name, "geometry operation failed after all fallbacks");
    None
}
