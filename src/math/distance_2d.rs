use super::Point2;

/// Projects `(px, py)` onto the segment `(ax, ay) → (bx, by)`.
///
/// Returns the closest point and its parameter `t` in `[0, 1]`.
fn closest_on_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> (f64, f64, f64) {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-20 {
        // Degenerate segment (zero length).
        return (ax, ay, 0.0);
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = ((px - ax) * dx + (py - ay) * dy) / len_sq;
    let t = t.clamp(0.0, 1.0);

    (ax + t * dx, ay + t * dy, t)
}

/// The closest location on a polyline to some query point.
#[derive(Debug, Clone, Copy)]
pub struct PolylineProjection {
    /// Closest point on the polyline.
    pub point: Point2,
    /// Index of the segment holding `point`.
    pub segment: usize,
    /// Parameter of `point` on that segment, in `[0, 1]`.
    pub t: f64,
    /// Distance from the query point to `point`.
    pub distance: f64,
}

/// Finds the closest point on an open polyline to `p`.
///
/// Ties between segments resolve to the first segment. A single-vertex
/// polyline projects onto that vertex. Returns `None` for an empty polyline.
#[must_use]
pub fn project_onto_polyline(p: &Point2, points: &[Point2]) -> Option<PolylineProjection> {
    match points {
        [] => None,
        [only] => Some(PolylineProjection {
            point: *only,
            segment: 0,
            t: 0.0,
            distance: (p - only).norm(),
        }),
        _ => {
            let mut best: Option<PolylineProjection> = None;
            for (i, seg) in points.windows(2).enumerate() {
                let (cx, cy, t) = closest_on_segment(p.x, p.y, seg[0].x, seg[0].y, seg[1].x, seg[1].y);
                let point = Point2::new(cx, cy);
                let distance = (p - point).norm();
                if best.is_none_or(|b| distance < b.distance) {
                    best = Some(PolylineProjection {
                        point,
                        segment: i,
                        t,
                        distance,
                    });
                }
            }
            best
        }
    }
}

/// Returns the minimum distance from `p` to an open polyline, or `f64::INFINITY` if empty.
#[must_use]
pub fn point_to_polyline_dist(p: &Point2, points: &[Point2]) -> f64 {
    project_onto_polyline(p, points).map_or(f64::INFINITY, |proj| proj.distance)
}

/// Total length of an open polyline.
#[must_use]
pub fn polyline_length(points: &[Point2]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn segment_dist_perpendicular_projection() {
        // Point (1, 1) to segment (0,0)→(2,0). Closest at (1,0), dist = 1.
        let seg = [Point2::new(0.0, 0.0), Point2::new(2.0, 0.0)];
        let d = point_to_polyline_dist(&Point2::new(1.0, 1.0), &seg);
        assert!((d - 1.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn segment_dist_endpoint_closest() {
        let seg = [Point2::new(0.0, 0.0), Point2::new(2.0, 0.0)];
        let d = point_to_polyline_dist(&Point2::new(-1.0, 0.0), &seg);
        assert!((d - 1.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn segment_dist_degenerate() {
        // Zero-length segment: distance is point-to-point.
        let seg = [Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)];
        let d = point_to_polyline_dist(&Point2::new(3.0, 4.0), &seg);
        assert!((d - 5.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn polyline_projection_picks_closest_segment() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ];
        let proj = project_onto_polyline(&Point2::new(12.0, 6.0), &pts).unwrap();
        assert_eq!(proj.segment, 1);
        assert!((proj.point.x - 10.0).abs() < TOL);
        assert!((proj.point.y - 6.0).abs() < TOL);
        assert!((proj.t - 0.6).abs() < TOL);
        assert!((proj.distance - 2.0).abs() < TOL);
    }

    #[test]
    fn polyline_projection_tie_prefers_first_segment() {
        // Both segments are closest at the shared vertex (10, 0).
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ];
        let proj = project_onto_polyline(&Point2::new(11.0, -1.0), &pts).unwrap();
        assert_eq!(proj.segment, 0);
        assert!((proj.t - 1.0).abs() < TOL);
    }

    #[test]
    fn polyline_projection_empty() {
        assert!(project_onto_polyline(&Point2::origin(), &[]).is_none());
        assert!(point_to_polyline_dist(&Point2::origin(), &[]).is_infinite());
    }

    #[test]
    fn polyline_length_sums_segments() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 4.0),
            Point2::new(3.0, 10.0),
        ];
        assert!((polyline_length(&pts) - 11.0).abs() < TOL);
    }
}
