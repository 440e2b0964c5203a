use geo::{BooleanOps, LineString, MultiPolygon, Polygon};

use crate::geometry::GeometryParts;
use crate::math::polygon_2d::{regular_polygon, segment_band};
use crate::math::{coord_from_point, point_from_coord, Point2};

use super::noding::dedup_points;

fn ring_polygon(ring: &[Point2]) -> Polygon<f64> {
    Polygon::new(ring.iter().map(coord_from_point).collect(), Vec::new())
}

/// Pieces whose union is the buffer of a polyline: one band per segment and
/// one disc per vertex.
fn polyline_pieces(pts: &[Point2], distance: f64, circle_segments: usize, out: &mut Vec<Polygon<f64>>) {
    for p in pts {
        out.push(ring_polygon(&regular_polygon(p, distance, circle_segments)));
    }
    for w in pts.windows(2) {
        if let Some(band) = segment_band(&w[0], &w[1], distance) {
            out.push(ring_polygon(&band));
        }
    }
}

fn ring_points(ls: &LineString<f64>) -> Vec<Point2> {
    ls.coords().map(|c| point_from_coord(*c)).collect()
}

/// Unions polygons pairwise until one multi-polygon is left.
pub(super) fn union_all(mut pieces: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while pieces.len() > 1 {
        pieces = pieces
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                [a] => a.clone(),
                _ => MultiPolygon::new(Vec::new()),
            })
            .collect();
    }
    pieces.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

/// Minkowski sum of a geometry with a disc of radius `distance`.
///
/// The disc is approximated with `4 * quadrant_segments` edges. A non-positive
/// distance returns the polygonal constituents unchanged; points and lines
/// have no area and vanish.
pub(super) fn buffer(parts: &GeometryParts, distance: f64, quadrant_segments: usize) -> GeometryParts {
    if distance <= 0.0 {
        return GeometryParts {
            polygons: parts.polygons.clone(),
            ..GeometryParts::default()
        };
    }
    let circle_segments = 4 * quadrant_segments.max(1);

    let mut pieces: Vec<Polygon<f64>> = parts.polygons.clone();
    for c in &parts.points {
        let center = point_from_coord(*c);
        pieces.push(ring_polygon(&regular_polygon(&center, distance, circle_segments)));
    }
    for ls in &parts.lines {
        polyline_pieces(&dedup_points(ls), distance, circle_segments, &mut pieces);
    }
    for p in &parts.polygons {
        polyline_pieces(&ring_points(p.exterior()), distance, circle_segments, &mut pieces);
        for hole in p.interiors() {
            polyline_pieces(&ring_points(hole), distance, circle_segments, &mut pieces);
        }
    }

    let merged = union_all(
        pieces
            .into_iter()
            .map(|p| MultiPolygon::new(vec![p]))
            .collect(),
    );
    GeometryParts {
        polygons: merged.0,
        ..GeometryParts::default()
    }
}

/// Buffers only the polygonal constituents, leaving points and lines as they are.
pub(super) fn inflate_polygons(parts: &GeometryParts, distance: f64, quadrant_segments: usize) -> GeometryParts {
    let polygons_only = GeometryParts {
        polygons: parts.polygons.clone(),
        ..GeometryParts::default()
    };
    GeometryParts {
        points: parts.points.clone(),
        lines: parts.lines.clone(),
        polygons: buffer(&polygons_only, distance, quadrant_segments).polygons,
    }
}
