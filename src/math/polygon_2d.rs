use std::f64::consts::PI;

use super::{Point2, Vector2, TOLERANCE};

/// Discretizes a circle into a closed counter-clockwise ring.
///
/// The ring has `segments` edges, so `segments + 1` vertices with the last
/// equal to the first. The first vertex lies at angle 0.
#[must_use]
pub fn regular_polygon(center: &Point2, radius: f64, segments: usize) -> Vec<Point2> {
    let segments = segments.max(3);
    #[allow(clippy::cast_precision_loss)]
    let step = 2.0 * PI / segments as f64;
    let mut ring: Vec<Point2> = (0..segments)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let angle = step * k as f64;
            center + Vector2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    ring.push(ring[0]);
    ring
}

/// Returns the closed ring of the axis-aligned square of half-size `half`
/// centered at `center`.
#[must_use]
pub fn square_around(center: &Point2, half: f64) -> Vec<Point2> {
    vec![
        Point2::new(center.x - half, center.y - half),
        Point2::new(center.x + half, center.y - half),
        Point2::new(center.x + half, center.y + half),
        Point2::new(center.x - half, center.y + half),
        Point2::new(center.x - half, center.y - half),
    ]
}

/// Returns the closed ring of the rectangle obtained by sweeping the segment
/// `a → b` by `distance` on both sides.
///
/// Returns `None` for a zero-length segment.
#[must_use]
pub fn segment_band(a: &Point2, b: &Point2, distance: f64) -> Option<Vec<Point2>> {
    let d = b - a;
    let len = d.norm();
    if len < TOLERANCE {
        return None;
    }
    let n = Vector2::new(-d.y, d.x) * (distance / len);
    Some(vec![a - n, b - n, b + n, a + n, a - n])
}
