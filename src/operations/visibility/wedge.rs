use std::f64::consts::PI;

use geo::{Geometry, LineString, Polygon};

use crate::math::polygon_2d::regular_polygon;
use crate::math::{coord_from_point, Point2};

/// A triangular sector with its apex at the vantage point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilitySector {
    pub apex: Point2,
    /// End of the first boundary ray.
    pub start: Point2,
    /// End of the second boundary ray, counter-clockwise from `start`.
    pub end: Point2,
}

impl VisibilitySector {
    #[must_use]
    pub fn to_geometry(&self) -> Geometry<f64> {
        let ring: LineString<f64> = [self.apex, self.start, self.end, self.apex]
            .iter()
            .map(coord_from_point)
            .collect();
        Geometry::Polygon(Polygon::new(ring, Vec::new()))
    }
}

/// Partitions the disc of radius `radius` around `apex` into `precision`
/// sectors.
///
/// The sector tips lie on a polygon circumscribing the disc, so the sectors
/// together cover every point within `radius` of the apex.
#[must_use]
pub fn sectors(apex: &Point2, radius: f64, precision: usize) -> Vec<VisibilitySector> {
    let precision = precision.max(3);
    #[allow(clippy::cast_precision_loss)]
    let half_angle = PI / precision as f64;
    let outer = radius / half_angle.cos();
    regular_polygon(apex, outer, precision)
        .windows(2)
        .map(|w| VisibilitySector {
            apex: *apex,
            start: w[0],
            end: w[1],
        })
        .collect()
}
