use super::{Point2, Vector2, PARAM_TOLERANCE, TOLERANCE};

/// The intersection of two bounded 2D segments.
///
/// Parameters `t` (on the first segment) and `u` (on the second) are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentIntersection {
    /// The segments meet in a single point.
    Point { point: Point2, t: f64, u: f64 },
    /// The segments are collinear and share a sub-segment.
    Overlap {
        start: Point2,
        t_start: f64,
        u_start: f64,
        end: Point2,
        t_end: f64,
        u_end: f64,
    },
}

/// Returns `true` if `t` lies strictly between the segment endpoints.
#[must_use]
pub fn is_interior_param(t: f64) -> bool {
    t > PARAM_TOLERANCE && t < 1.0 - PARAM_TOLERANCE
}

fn perp(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Bounded segment-segment intersection in 2D.
///
/// Hits at (or within [`PARAM_TOLERANCE`] of) a segment endpoint return that
/// endpoint's exact coordinates, so that lines split at the hit share nodes
/// bit-for-bit. Zero-length segments never intersect anything.
#[must_use]
pub fn segment_intersection_2d(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<SegmentIntersection> {
    let da = a1 - a0;
    let db = b1 - b0;
    let la = da.norm();
    let lb = db.norm();
    if la < TOLERANCE || lb < TOLERANCE {
        return None;
    }

    let cross = perp(&da, &db);
    let w = b0 - a0;

    if cross.abs() <= TOLERANCE * la * lb {
        // Parallel: only collinear segments can meet.
        let offset = perp(&da, &w) / la;
        if offset.abs() > TOLERANCE * la.max(1.0) {
            return None;
        }
        return collinear_overlap(a0, a1, b0, b1, la);
    }

    let t = perp(&w, &db) / cross;
    let u = perp(&w, &da) / cross;
    let eps = PARAM_TOLERANCE;
    if t < -eps || t > 1.0 + eps || u < -eps || u > 1.0 + eps {
        return None;
    }
    let t = t.clamp(0.0, 1.0);
    let u = u.clamp(0.0, 1.0);

    let point = if t <= eps {
        *a0
    } else if t >= 1.0 - eps {
        *a1
    } else if u <= eps {
        *b0
    } else if u >= 1.0 - eps {
        *b1
    } else {
        a0 + da * t
    };
    Some(SegmentIntersection::Point { point, t, u })
}

/// Intersection of two collinear segments.
fn collinear_overlap(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
    la: f64,
) -> Option<SegmentIntersection> {
    let da = a1 - a0;
    let db = b1 - b0;
    let la_sq = la * la;
    let lb_sq = db.norm_squared();

    let t_of = |p: &Point2| (p - a0).dot(&da) / la_sq;
    let u_of = |p: &Point2| (p - b0).dot(&db) / lb_sq;

    let tb0 = t_of(b0);
    let tb1 = t_of(b1);
    let (b_lo, tb_lo, b_hi, tb_hi) = if tb0 <= tb1 {
        (b0, tb0, b1, tb1)
    } else {
        (b1, tb1, b0, tb0)
    };

    let (start, t_start) = if tb_lo > 0.0 { (*b_lo, tb_lo) } else { (*a0, 0.0) };
    let (end, t_end) = if tb_hi < 1.0 { (*b_hi, tb_hi) } else { (*a1, 1.0) };

    if t_end < t_start - PARAM_TOLERANCE {
        return None;
    }

    let u_start = u_of(&start).clamp(0.0, 1.0);
    if (t_end - t_start) * la <= TOLERANCE {
        return Some(SegmentIntersection::Point {
            point: start,
            t: t_start.clamp(0.0, 1.0),
            u: u_start,
        });
    }

    Some(SegmentIntersection::Overlap {
        start,
        t_start: t_start.clamp(0.0, 1.0),
        u_start,
        end,
        t_end: t_end.clamp(0.0, 1.0),
        u_end: u_of(&end).clamp(0.0, 1.0),
    })
}
