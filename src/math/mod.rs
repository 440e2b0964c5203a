pub mod distance_2d;
pub mod intersect_2d;
pub mod polygon_2d;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Tolerance on segment parameters when deciding whether a hit lies at an endpoint.
pub const PARAM_TOLERANCE: f64 = 1e-9;

/// Converts a `geo` coordinate into a [`Point2`].
#[must_use]
pub fn point_from_coord(c: geo::Coord<f64>) -> Point2 {
    Point2::new(c.x, c.y)
}

/// Converts a [`Point2`] into a `geo` coordinate.
#[must_use]
pub fn coord_from_point(p: &Point2) -> geo::Coord<f64> {
    geo::Coord { x: p.x, y: p.y }
}

/// Returns `true` if two points coincide within [`TOLERANCE`].
#[must_use]
pub fn points_coincide(a: &Point2, b: &Point2) -> bool {
    (a - b).norm() <= TOLERANCE
}
