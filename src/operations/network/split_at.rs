use geo::{Geometry, LineString};
use tracing::debug;

use crate::geometry::{Shape, ShapeKind};
use crate::kernel::noding::dedup_points;
use crate::math::distance_2d::{point_to_polyline_dist, project_onto_polyline};
use crate::math::{coord_from_point, points_coincide, Point2};

/// Splits a polyline at `point`, which is taken to lie on segment `segment`.
///
/// Returns the non-degenerate pieces before and after the point. The point
/// itself becomes the shared end vertex of both pieces.
pub(super) fn split_polyline(pts: &[Point2], segment: usize, point: Point2) -> Vec<Vec<Point2>> {
    if pts.len() < 2 || segment + 1 >= pts.len() {
        return vec![pts.to_vec()];
    }

    let mut head: Vec<Point2> = pts[..=segment].to_vec();
    while head.last().is_some_and(|p| points_coincide(p, &point)) {
        head.pop();
    }
    head.push(point);

    let mut tail = vec![point];
    tail.extend(
        pts[segment + 1..]
            .iter()
            .skip_while(|p| points_coincide(p, &point))
            .copied(),
    );

    [head, tail].into_iter().filter(|piece| piece.len() >= 2).collect()
}

pub(super) fn line_from_points(pts: &[Point2]) -> Geometry<f64> {
    Geometry::LineString(pts.iter().map(coord_from_point).collect::<LineString<f64>>())
}

/// The vertices of a single-line shape without consecutive duplicates, or
/// `None` if the shape is not exactly one line.
pub(super) fn single_line_points(shape: &Shape) -> Option<Vec<Point2>> {
    let parts = shape.parts();
    match (parts.points.is_empty(), parts.polygons.is_empty(), parts.lines.as_slice()) {
        (true, true, [line]) => Some(dedup_points(line)),
        _ => None,
    }
}

/// Splits a line shape in two at a point.
///
/// The split happens on the segment closest to the point (the first one on
/// ties). For a multi-line, only the constituent closest to the point is
/// split (the last one on ties) and the others are not returned. Both pieces
/// carry the source's attributes. When the point is at an end of the line
/// only one non-degenerate piece remains. Points, polygons and mixed shapes
/// have no line to split and give no pieces.
pub struct SplitAt<'a> {
    line: &'a Shape,
    point: Point2,
}

impl<'a> SplitAt<'a> {
    #[must_use]
    pub fn new(line: &'a Shape, point: Point2) -> Self {
        Self { line, point }
    }

    #[must_use]
    pub fn execute(&self) -> Vec<Shape> {
        if self.line.kind() != ShapeKind::Line {
            debug!(kind = ?self.line.kind(), "nothing to split");
            return Vec::new();
        }
        let Some(pts) = self.nearest_line() else {
            return Vec::new();
        };
        let Some(proj) = project_onto_polyline(&self.point, &pts) else {
            return Vec::new();
        };
        split_polyline(&pts, proj.segment, self.point)
            .iter()
            .map(|piece| self.line.with_geometry(line_from_points(piece)))
            .collect()
    }

    /// Vertices of the constituent line closest to the split point.
    fn nearest_line(&self) -> Option<Vec<Point2>> {
        let mut best: Option<(f64, Vec<Point2>)> = None;
        for line in self.line.parts().lines {
            let pts = dedup_points(&line);
            let dist = point_to_polyline_dist(&self.point, &pts);
            if best.as_ref().is_none_or(|(d, _)| dist <= *d) {
                best = Some((dist, pts));
            }
        }
        best.map(|(_, pts)| pts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::AttributeValue;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn splits_mid_segment() {
        let line = Shape::line(&[p(0.0, 0.0), p(10.0, 0.0)]).with_attribute("name", "a");
        let pieces = SplitAt::new(&line, p(4.0, 0.0)).execute();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].points(), vec![p(0.0, 0.0), p(4.0, 0.0)]);
        assert_eq!(pieces[1].points(), vec![p(4.0, 0.0), p(10.0, 0.0)]);
        for piece in &pieces {
            assert_eq!(piece.attribute("name"), Some(&AttributeValue::from("a")));
        }
    }

    #[test]
    fn keeps_interior_vertices() {
        let line = Shape::line(&[p(0.0, 0.0), p(5.0, 0.0), p(5.0, 5.0), p(10.0, 5.0)]);
        let pieces = SplitAt::new(&line, p(5.0, 2.0)).execute();
        assert_eq!(pieces[0].points(), vec![p(0.0, 0.0), p(5.0, 0.0), p(5.0, 2.0)]);
        assert_eq!(pieces[1].points(), vec![p(5.0, 2.0), p(5.0, 5.0), p(10.0, 5.0)]);
        assert_relative_eq!(pieces[0].length() + pieces[1].length(), line.length());
    }

    #[test]
    fn split_at_existing_vertex() {
        let line = Shape::line(&[p(0.0, 0.0), p(5.0, 0.0), p(10.0, 0.0)]);
        let pieces = SplitAt::new(&line, p(5.0, 0.0)).execute();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].points(), vec![p(0.0, 0.0), p(5.0, 0.0)]);
        assert_eq!(pieces[1].points(), vec![p(5.0, 0.0), p(10.0, 0.0)]);
    }

    #[test]
    fn split_at_endpoint_leaves_one_piece() {
        let line = Shape::line(&[p(0.0, 0.0), p(10.0, 0.0)]);
        let pieces = SplitAt::new(&line, p(10.0, 0.0)).execute();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].points(), line.points());
    }

    #[test]
    fn off_line_point_becomes_the_joint() {
        let line = Shape::line(&[p(0.0, 0.0), p(10.0, 0.0)]);
        let pieces = SplitAt::new(&line, p(3.0, 1.0)).execute();
        assert_eq!(pieces[0].points(), vec![p(0.0, 0.0), p(3.0, 1.0)]);
        assert_eq!(pieces[1].points(), vec![p(3.0, 1.0), p(10.0, 0.0)]);
    }

    #[test]
    fn point_and_polygon_give_nothing() {
        let poly = Shape::polygon(&[p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)]);
        assert!(SplitAt::new(&poly, p(0.5, 0.0)).execute().is_empty());
        let point = Shape::point(p(0.5, 0.0));
        assert!(SplitAt::new(&point, p(0.5, 0.0)).execute().is_empty());
    }

    #[test]
    fn multi_line_splits_the_nearest_constituent() {
        let mls = Shape::new(Geometry::MultiLineString(geo::MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            LineString::from(vec![(0.0, 5.0), (10.0, 5.0)]),
        ])))
        .with_attribute("id", 3_i64);
        let pieces = SplitAt::new(&mls, p(4.0, 4.0)).execute();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].points(), vec![p(0.0, 5.0), p(4.0, 4.0)]);
        assert_eq!(pieces[1].points(), vec![p(4.0, 4.0), p(10.0, 5.0)]);
        assert!(pieces.iter().all(|s| s.attribute("id") == Some(&AttributeValue::Int(3))));
    }

    #[test]
    fn multi_line_tie_goes_to_the_last_constituent() {
        let mls = Shape::new(Geometry::MultiLineString(geo::MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            LineString::from(vec![(0.0, 2.0), (10.0, 2.0)]),
        ])));
        let pieces = SplitAt::new(&mls, p(5.0, 1.0)).execute();
        assert_eq!(pieces[0].points(), vec![p(0.0, 2.0), p(5.0, 1.0)]);
    }
}
