use geo::{Area, Geometry, Intersects, Polygon};
use tracing::debug;

use crate::geometry::{GeometryParts, Shape, ShapeKind};
use crate::kernel::noding::dedup_points;
use crate::kernel::GeometryKernel;
use crate::math::distance_2d::polyline_length;
use crate::math::polygon_2d::square_around;
use crate::math::{coord_from_point, Point2, TOLERANCE};

use super::wedge::sectors;

/// Parameters of [`MaskedBy`].
#[derive(Debug, Clone, Copy)]
pub struct VisibilityParams {
    /// Number of sectors the perception shape is cut into. At least 4.
    pub precision: usize,
    /// Half-size of the square around the vantage point used to tell the
    /// near side of an obstacle from the far side.
    pub vantage_radius: f64,
    /// Distance by which fragments are enlarged when their union fails.
    pub enlarge_distance: f64,
    /// Quadrant segments of that enlargement.
    pub buffer_segments: usize,
}

impl Default for VisibilityParams {
    fn default() -> Self {
        Self {
            precision: 120,
            vantage_radius: 0.01,
            enlarge_distance: 0.1,
            buffer_segments: 2,
        }
    }
}

/// Computes the part of a perception shape visible from a vantage point.
///
/// The shape is cut into sectors around the vantage point. In each sector the
/// obstacles are subtracted one after the other, in the order given, and only
/// what lies on the near side of them is kept. The visible pieces of all
/// sectors are then merged.
pub struct MaskedBy {
    source: Shape,
    obstacles: Vec<Shape>,
    vantage: Point2,
    params: VisibilityParams,
}

impl MaskedBy {
    #[must_use]
    pub fn new(source: Shape, obstacles: Vec<Shape>, vantage: Point2) -> Self {
        Self {
            source,
            obstacles,
            vantage,
            params: VisibilityParams::default(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: VisibilityParams) -> Self {
        self.params = params;
        self
    }

    /// Executes the masking.
    ///
    /// Returns `None` when nothing of the source is visible. With no
    /// obstacle the source comes back unchanged. Obstacles the kernel cannot
    /// subtract are ignored for the sector where that happens.
    #[must_use]
    pub fn execute<K: GeometryKernel + ?Sized>(&self, kernel: &K) -> Option<Shape> {
        if self.obstacles.is_empty() {
            return Some(self.source.clone());
        }
        let source_kind = self.source.kind();
        if source_kind == ShapeKind::Empty {
            debug!("empty perception shape");
            return None;
        }

        let max_radius = self
            .source
            .points()
            .iter()
            .map(|p| (p - self.vantage).norm())
            .fold(0.0_f64, f64::max);
        if max_radius < TOLERANCE {
            let hidden = self
                .obstacles
                .iter()
                .any(|o| o.geometry().intersects(self.source.geometry()));
            return (!hidden).then(|| self.source.clone());
        }

        let neighbourhood = Polygon::new(
            square_around(&self.vantage, self.params.vantage_radius)
                .iter()
                .map(coord_from_point)
                .collect(),
            Vec::new(),
        );

        let mut fragments: Vec<GeometryParts> = Vec::new();
        for sector in sectors(&self.vantage, max_radius, self.params.precision.max(4)) {
            let sector = sector.to_geometry();
            let Some(piece) = kernel.intersection(&sector, self.source.geometry()) else {
                debug!("sector intersection failed, skipping sector");
                continue;
            };
            let share = coherent(GeometryParts::from_geometry(&piece), source_kind);
            if share.is_empty() {
                continue;
            }
            if let Some(visible) = self.occlude(kernel, &sector, share, &neighbourhood) {
                fragments.push(visible);
            }
        }

        if fragments.iter().any(|f| f.dimension().is_some_and(|d| d > 0)) {
            fragments.retain(|f| f.dimension().is_some_and(|d| d > 0));
        }
        if fragments.is_empty() {
            debug!("perception shape fully occluded");
            return None;
        }

        let merged = self.merge(kernel, fragments)?;
        Some(self.source.with_geometry(merged))
    }

    /// Restricts one sector's share of the source to what is visible.
    ///
    /// The obstacles are subtracted from the sector in order. After each
    /// subtraction only the pieces touching the vantage neighbourhood are
    /// kept; if none does, nothing in the sector is visible. The source share
    /// is then clipped to what remains.
    fn occlude<K: GeometryKernel + ?Sized>(
        &self,
        kernel: &K,
        sector: &Geometry<f64>,
        share: GeometryParts,
        neighbourhood: &Polygon<f64>,
    ) -> Option<GeometryParts> {
        if !self.obstacles.iter().any(|o| o.geometry().intersects(sector)) {
            return Some(share);
        }

        let mut region = sector.clone();
        for (i, obstacle) in self.obstacles.iter().enumerate() {
            if !obstacle.geometry().intersects(&region) {
                continue;
            }
            let Some(rest) = kernel.difference(&region, obstacle.geometry()) else {
                debug!(obstacle = i, "difference failed, skipping obstacle for this sector");
                continue;
            };
            let rest = GeometryParts::from_geometry(&rest).keep_highest_dimension();
            region = near_side(rest, neighbourhood)?.into_geometry();
        }

        let dimension = share.dimension();
        let share_geometry = share.into_geometry();
        let visible = match kernel.intersection(&share_geometry, &region) {
            Some(v) => of_dimension(GeometryParts::from_geometry(&v), dimension),
            None => {
                debug!("clipping to the visible sector failed, keeping the sector share");
                GeometryParts::from_geometry(&share_geometry)
            }
        };
        (!visible.is_empty()).then_some(visible)
    }

    /// Unions the visible fragments, enlarging them once if the plain union
    /// fails or comes out invalid.
    fn merge<K: GeometryKernel + ?Sized>(&self, kernel: &K, fragments: Vec<GeometryParts>) -> Option<Geometry<f64>> {
        let geometries: Vec<Geometry<f64>> = fragments.iter().cloned().map(GeometryParts::into_geometry).collect();
        if let Some(merged) = union_all(kernel, &geometries) {
            let merged = without_slivers(GeometryParts::from_geometry(&merged)).into_geometry();
            if Shape::new(merged.clone()).is_valid() {
                return Some(merged);
            }
        }

        debug!(distance = self.params.enlarge_distance, "union of visible fragments failed, enlarging");
        let enlarged: Option<Vec<Geometry<f64>>> = geometries
            .iter()
            .map(|g| kernel.buffer(g, self.params.enlarge_distance, self.params.buffer_segments))
            .collect();
        if let Some(merged) = enlarged.and_then(|e| union_all(kernel, &e)) {
            let clipped = kernel
                .intersection(&merged, self.source.geometry())
                .filter(|g| !GeometryParts::from_geometry(g).is_empty())
                .unwrap_or(merged);
            if !GeometryParts::from_geometry(&clipped).is_empty() {
                return Some(clipped);
            }
        }

        let mut all = GeometryParts::default();
        for f in fragments {
            all.extend(f);
        }
        Some(all.into_geometry())
    }
}

/// The pieces touching the vantage neighbourhood, or `None` if every piece
/// lies beyond an obstacle.
fn near_side(pieces: GeometryParts, neighbourhood: &Polygon<f64>) -> Option<GeometryParts> {
    let mut near = GeometryParts::default();
    for single in pieces.into_singles() {
        if single.clone().into_geometry().intersects(neighbourhood) {
            near.extend(single);
        }
    }
    (!near.is_empty()).then_some(near)
}

/// Restricts a sector's share of the source to constituents of the source's own kind.
fn coherent(parts: GeometryParts, source_kind: ShapeKind) -> GeometryParts {
    if source_kind == ShapeKind::Point {
        return GeometryParts {
            points: parts.points,
            ..GeometryParts::default()
        };
    }
    parts.keep_highest_dimension()
}

/// Keeps only the constituents of the given dimension.
fn of_dimension(parts: GeometryParts, dimension: Option<u8>) -> GeometryParts {
    match dimension {
        Some(0) => GeometryParts {
            points: parts.points,
            ..GeometryParts::default()
        },
        Some(1) => GeometryParts {
            lines: parts.lines,
            ..GeometryParts::default()
        },
        Some(2) => GeometryParts {
            polygons: parts.polygons,
            ..GeometryParts::default()
        },
        _ => GeometryParts::default(),
    }
}

/// Drops polygons without area and lines without length.
fn without_slivers(mut parts: GeometryParts) -> GeometryParts {
    parts.polygons.retain(|p| p.unsigned_area() > TOLERANCE);
    parts
        .lines
        .retain(|l| polyline_length(&dedup_points(l)) > TOLERANCE);
    parts
}

fn union_all<K: GeometryKernel + ?Sized>(kernel: &K, geometries: &[Geometry<f64>]) -> Option<Geometry<f64>> {
    let (first, rest) = geometries.split_first()?;
    rest.iter()
        .try_fold(first.clone(), |acc, g| kernel.union(&acc, g))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kernel::PlanarKernel;
    use approx::assert_relative_eq;
    use geo::Point;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Shape {
        Shape::polygon(&[p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1)])
    }

    /// Kernel that fails every difference.
    struct NoDifference(PlanarKernel);

    impl GeometryKernel for NoDifference {
        fn intersection(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>> {
            self.0.intersection(a, b)
        }

        fn union(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>> {
            self.0.union(a, b)
        }

        fn difference(&self, _a: &Geometry<f64>, _b: &Geometry<f64>) -> Option<Geometry<f64>> {
            None
        }

        fn buffer(&self, g: &Geometry<f64>, distance: f64, segments: usize) -> Option<Geometry<f64>> {
            self.0.buffer(g, distance, segments)
        }
    }

    #[test]
    fn no_obstacle_returns_source() {
        let source = rect(-5.0, -5.0, 5.0, 5.0).with_attribute("name", "view");
        let out = MaskedBy::new(source.clone(), Vec::new(), p(0.0, 0.0))
            .execute(&PlanarKernel::new())
            .unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn far_obstacle_leaves_area_unchanged() {
        let source = rect(-5.0, -5.0, 5.0, 5.0);
        let out = MaskedBy::new(source, vec![rect(20.0, 20.0, 21.0, 21.0)], p(0.0, 0.0))
            .execute(&PlanarKernel::new())
            .unwrap();
        assert_relative_eq!(out.area(), 100.0, max_relative = 1e-6);
    }

    #[test]
    fn wall_casts_a_shadow() {
        // Thin wall across the right half; everything beyond it is hidden.
        let source = rect(-5.0, -5.0, 5.0, 5.0);
        let wall = rect(2.0, -5.0, 2.5, 5.0);
        let out = MaskedBy::new(source, vec![wall], p(0.0, 0.0))
            .execute(&PlanarKernel::new())
            .unwrap();
        // Left half (50) plus the strip in front of the wall (2 * 10).
        assert_relative_eq!(out.area(), 70.0, max_relative = 1e-2);
    }

    #[test]
    fn fully_covered_source_is_none() {
        let source = rect(-5.0, -5.0, 5.0, 5.0);
        let out = MaskedBy::new(source, vec![rect(-10.0, -10.0, 10.0, 10.0)], p(0.0, 0.0))
            .execute(&PlanarKernel::new());
        assert!(out.is_none());
    }

    #[test]
    fn vantage_inside_obstacle_sees_nothing() {
        let source = rect(-5.0, -5.0, 5.0, 5.0);
        let obstacles = vec![rect(-1.0, -1.0, 1.0, 1.0), rect(3.0, -5.0, 3.5, 5.0)];
        let out = MaskedBy::new(source, obstacles, p(0.0, 0.0)).execute(&PlanarKernel::new());
        assert!(out.is_none(), "out={out:?}");
    }

    #[test]
    fn far_side_of_a_split_sector_is_hidden() {
        // Two walls to the right; the gap between them is behind the first.
        let source = rect(-5.0, -5.0, 5.0, 5.0);
        let obstacles = vec![rect(1.0, -2.0, 1.5, 2.0), rect(3.0, -5.0, 3.5, 5.0)];
        let out = MaskedBy::new(source, obstacles, p(0.0, 0.0))
            .execute(&PlanarKernel::new())
            .unwrap();
        let behind = Shape::polygon(&[p(2.0, -0.5), p(3.0, -0.5), p(3.0, 0.5), p(2.0, 0.5)]);
        let seen = PlanarKernel::new()
            .intersection(out.geometry(), behind.geometry())
            .map_or(0.0, |g| g.unsigned_area());
        assert!(seen < 1e-6, "seen={seen}");
    }

    #[test]
    fn failing_difference_skips_obstacle() {
        let source = rect(-5.0, -5.0, 5.0, 5.0);
        let out = MaskedBy::new(source, vec![rect(0.0, 0.0, 6.0, 6.0)], p(0.0, 0.0))
            .execute(&NoDifference(PlanarKernel::new()))
            .unwrap();
        assert_relative_eq!(out.area(), 100.0, max_relative = 1e-6);
    }

    #[test]
    fn hidden_points_are_dropped() {
        let source = Shape::new(Geometry::MultiPoint(geo::MultiPoint::new(vec![
            Point::new(1.0, 0.5),
            Point::new(5.0, 0.5),
            Point::new(-3.0, 0.5),
        ])));
        let wall = rect(2.0, -1.0, 3.0, 2.0);
        let out = MaskedBy::new(source, vec![wall], p(0.0, 0.0))
            .execute(&PlanarKernel::new())
            .unwrap();
        let mut xs: Vec<f64> = out.points().iter().map(|q| q.x).collect();
        xs.sort_by(f64::total_cmp);
        assert_eq!(xs, vec![-3.0, 1.0]);
    }

    #[test]
    fn line_behind_obstacle_is_cut() {
        let source = Shape::line(&[p(1.0, 0.5), p(10.0, 0.5)]);
        let wall = rect(4.0, -1.0, 5.0, 1.0);
        let out = MaskedBy::new(source, vec![wall], p(0.0, 0.0))
            .execute(&PlanarKernel::new())
            .unwrap();
        assert!(out.is_line());
        assert_relative_eq!(out.length(), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn vantage_point_source() {
        let source = Shape::point(p(0.0, 0.0));
        let kernel = PlanarKernel::new();
        let free = MaskedBy::new(source.clone(), vec![rect(1.0, 1.0, 2.0, 2.0)], p(0.0, 0.0)).execute(&kernel);
        assert_eq!(free, Some(source.clone()));
        let covered = MaskedBy::new(source, vec![rect(-1.0, -1.0, 1.0, 1.0)], p(0.0, 0.0)).execute(&kernel);
        assert!(covered.is_none());
    }
}
