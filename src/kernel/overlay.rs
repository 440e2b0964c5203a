use std::collections::HashSet;

use geo::{BooleanOps, Coord, Intersects, LineString, MultiPolygon, Point};

use crate::geometry::GeometryParts;
use crate::math::distance_2d::{point_to_polyline_dist, polyline_length};
use crate::math::intersect_2d::{segment_intersection_2d, SegmentIntersection};
use crate::math::{coord_from_point, Point2, TOLERANCE};

use super::noding::{dedup_points, node_against, node_lines};

/// Set-theoretic intersection of two flattened geometries.
pub(super) fn intersection(a: &GeometryParts, b: &GeometryParts) -> GeometryParts {
    let a_mp = a.multi_polygon();
    let b_mp = b.multi_polygon();

    let polygons = if a_mp.0.is_empty() || b_mp.0.is_empty() {
        Vec::new()
    } else {
        a_mp.intersection(&b_mp).0
    };

    let mut lines = Vec::new();
    if !b_mp.0.is_empty() && !a.lines.is_empty() {
        lines.extend(b_mp.clip(&a.multi_line_string(), false).0);
    }
    if !a_mp.0.is_empty() && !b.lines.is_empty() {
        lines.extend(a_mp.clip(&b.multi_line_string(), false).0);
    }
    let (shared_lines, crossings) = line_line_intersection(&a.lines, &b.lines);
    lines.extend(shared_lines);
    let lines = if lines.len() > 1 { node_lines(&lines) } else { lines };

    let mut points = crossings;
    points.extend(a.points.iter().filter(|c| touches(b, **c)).copied());
    points.extend(b.points.iter().filter(|c| touches(a, **c)).copied());

    let mut result = GeometryParts {
        points: Vec::new(),
        lines,
        polygons,
    };
    result.points = distinct_uncovered(points, &result);
    result
}

/// Set-theoretic union of two flattened geometries.
///
/// Linear constituents come out fully noded.
pub(super) fn union(a: &GeometryParts, b: &GeometryParts) -> GeometryParts {
    let a_mp = a.multi_polygon();
    let b_mp = b.multi_polygon();
    let polygons: MultiPolygon<f64> = match (a_mp.0.is_empty(), b_mp.0.is_empty()) {
        (true, true) => MultiPolygon::new(Vec::new()),
        (false, true) => a_mp,
        (true, false) => b_mp,
        (false, false) => a_mp.union(&b_mp),
    };

    let all_lines: Vec<LineString<f64>> = a.lines.iter().chain(&b.lines).cloned().collect();
    let mut lines = node_lines(&all_lines);
    if !polygons.0.is_empty() && !lines.is_empty() {
        lines = polygons
            .clip(&geo::MultiLineString::new(lines), true)
            .0;
    }

    let mut result = GeometryParts {
        points: Vec::new(),
        lines,
        polygons: polygons.0,
    };
    let points = a.points.iter().chain(&b.points).copied().collect();
    result.points = distinct_uncovered(points, &result);
    result
}

/// Set-theoretic difference `a - b` of two flattened geometries.
///
/// Removing a lower-dimensional set from a higher-dimensional one leaves it unchanged.
pub(super) fn difference(a: &GeometryParts, b: &GeometryParts) -> GeometryParts {
    let a_mp = a.multi_polygon();
    let b_mp = b.multi_polygon();

    let polygons = if a_mp.0.is_empty() || b_mp.0.is_empty() {
        a_mp.0
    } else {
        a_mp.difference(&b_mp).0
    };

    let mut lines = a.lines.clone();
    if !b_mp.0.is_empty() && !lines.is_empty() {
        lines = b_mp.clip(&geo::MultiLineString::new(lines), true).0;
    }
    if !b.lines.is_empty() && !lines.is_empty() {
        let cutter_pts: Vec<Vec<Point2>> = b.lines.iter().map(dedup_points).collect();
        lines = node_against(&lines, &b.lines)
            .into_iter()
            .filter(|piece| {
                let mid = midpoint(&dedup_points(piece));
                cutter_pts
                    .iter()
                    .all(|c| point_to_polyline_dist(&mid, c) > TOLERANCE)
            })
            .collect();
    }

    let points = a
        .points
        .iter()
        .filter(|c| !touches(b, **c))
        .copied()
        .collect();

    GeometryParts {
        points,
        lines,
        polygons,
    }
}

/// Returns `true` if the coordinate lies on or inside any constituent.
pub(super) fn touches(parts: &GeometryParts, c: Coord<f64>) -> bool {
    let pt = Point(c);
    parts.polygons.iter().any(|p| p.intersects(&pt))
        || parts.lines.iter().any(|l| l.intersects(&pt))
        || parts
            .points
            .iter()
            .any(|q| (q.x - c.x).hypot(q.y - c.y) <= TOLERANCE)
}

/// Points shared by two sets of lines, plus their collinear overlaps.
fn line_line_intersection(
    a: &[LineString<f64>],
    b: &[LineString<f64>],
) -> (Vec<LineString<f64>>, Vec<Coord<f64>>) {
    let mut overlaps = Vec::new();
    let mut points = Vec::new();
    for la in a {
        let pa = dedup_points(la);
        for lb in b {
            let pb = dedup_points(lb);
            for sa in pa.windows(2) {
                for sb in pb.windows(2) {
                    match segment_intersection_2d(&sa[0], &sa[1], &sb[0], &sb[1]) {
                        Some(SegmentIntersection::Point { point, .. }) => {
                            points.push(coord_from_point(&point));
                        }
                        Some(SegmentIntersection::Overlap { start, end, .. }) => {
                            overlaps.push(LineString::new(vec![
                                coord_from_point(&start),
                                coord_from_point(&end),
                            ]));
                        }
                        None => {}
                    }
                }
            }
        }
    }
    (overlaps, points)
}

/// Removes duplicates and points already covered by the lines or polygons of `within`.
fn distinct_uncovered(points: Vec<Coord<f64>>, within: &GeometryParts) -> Vec<Coord<f64>> {
    let carrier = GeometryParts {
        points: Vec::new(),
        lines: within.lines.clone(),
        polygons: within.polygons.clone(),
    };
    let mut seen = HashSet::new();
    points
        .into_iter()
        .filter(|c| seen.insert(((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())))
        .filter(|c| !touches(&carrier, *c))
        .collect()
}

/// Point halfway along a polyline.
fn midpoint(pts: &[Point2]) -> Point2 {
    let half = polyline_length(pts) / 2.0;
    let mut walked = 0.0;
    for w in pts.windows(2) {
        let len = (w[1] - w[0]).norm();
        if walked + len >= half && len > 0.0 {
            return w[0] + (w[1] - w[0]) * ((half - walked) / len);
        }
        walked += len;
    }
    pts.first().copied().unwrap_or_else(Point2::origin)
}
