use geo::{Area, CoordsIter, Geometry, LineString, Point, Polygon};

use crate::error::GeometryError;
use crate::math::distance_2d::polyline_length;
use crate::math::{coord_from_point, point_from_coord, Point2, TOLERANCE};

use super::attributes::{AttributeValue, Attributes};
use super::parts::GeometryParts;

/// Coarse classification of a shape by the kind of its constituents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// No constituent at all.
    Empty,
    /// Only points.
    Point,
    /// Only lines.
    Line,
    /// Only polygons.
    Polygon,
    /// Constituents of more than one kind.
    Mixed,
}

/// A geometric value with an attribute map.
///
/// Shapes have value semantics: every operation in this crate returns new
/// shapes and never writes through to its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    geometry: Geometry<f64>,
    attributes: Attributes,
}

impl Shape {
    /// Wraps a geometry with no attributes.
    #[must_use]
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            attributes: Attributes::new(),
        }
    }

    /// Creates a point shape.
    #[must_use]
    pub fn point(p: Point2) -> Self {
        Self::new(Geometry::Point(Point(coord_from_point(&p))))
    }

    /// Creates a line shape through the given vertices.
    #[must_use]
    pub fn line(points: &[Point2]) -> Self {
        Self::new(Geometry::LineString(
            points.iter().map(coord_from_point).collect::<LineString<f64>>(),
        ))
    }

    /// Creates a polygon shape from an exterior ring. The ring is closed if needed.
    #[must_use]
    pub fn polygon(exterior: &[Point2]) -> Self {
        let ring: LineString<f64> = exterior.iter().map(coord_from_point).collect();
        Self::new(Geometry::Polygon(Polygon::new(ring, Vec::new())))
    }

    /// Replaces the attribute map.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets one attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_owned(), value.into());
        self
    }

    /// Returns a copy of `self`'s geometry carrying `source`'s attributes.
    #[must_use]
    pub fn with_attributes_of(mut self, source: &Shape) -> Self {
        self.attributes = source.attributes.clone();
        self
    }

    /// Returns a new shape with the given geometry and this shape's attributes.
    #[must_use]
    pub fn with_geometry(&self, geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            attributes: self.attributes.clone(),
        }
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    #[must_use]
    pub fn into_geometry(self) -> Geometry<f64> {
        self.geometry
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Flattened constituents of the geometry.
    #[must_use]
    pub fn parts(&self) -> GeometryParts {
        GeometryParts::from_geometry(&self.geometry)
    }

    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        let parts = self.parts();
        match (
            parts.points.is_empty(),
            parts.lines.is_empty(),
            parts.polygons.is_empty(),
        ) {
            (true, true, true) => ShapeKind::Empty,
            (false, true, true) => ShapeKind::Point,
            (true, false, true) => ShapeKind::Line,
            (true, true, false) => ShapeKind::Polygon,
            _ => ShapeKind::Mixed,
        }
    }

    #[must_use]
    pub fn is_point(&self) -> bool {
        self.kind() == ShapeKind::Point
    }

    #[must_use]
    pub fn is_line(&self) -> bool {
        self.kind() == ShapeKind::Line
    }

    #[must_use]
    pub fn is_polygon(&self) -> bool {
        self.kind() == ShapeKind::Polygon
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind() == ShapeKind::Empty
    }

    /// All vertices, in storage order.
    #[must_use]
    pub fn points(&self) -> Vec<Point2> {
        self.geometry.coords_iter().map(point_from_coord).collect()
    }

    /// Total length of the linear constituents plus the perimeter of the polygonal ones.
    #[must_use]
    pub fn length(&self) -> f64 {
        let parts = self.parts();
        let ring_len = |ls: &LineString<f64>| {
            let pts: Vec<Point2> = ls.coords().map(|c| point_from_coord(*c)).collect();
            polyline_length(&pts)
        };
        let lines: f64 = parts.lines.iter().map(ring_len).sum();
        let rings: f64 = parts
            .polygons
            .iter()
            .map(|p| ring_len(p.exterior()) + p.interiors().iter().map(ring_len).sum::<f64>())
            .sum();
        lines + rings
    }

    /// Area of the polygonal constituents.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.parts()
            .polygons
            .iter()
            .map(|p| p.unsigned_area())
            .sum()
    }

    /// Checks that the shape is usable by the network and visibility operations.
    ///
    /// # Errors
    ///
    /// - `GeometryError::NonFinite` if any coordinate is NaN or infinite
    /// - `GeometryError::Degenerate` for empty shapes, lines without two distinct
    ///   vertices and polygons without area
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self
            .geometry
            .coords_iter()
            .any(|c| !c.x.is_finite() || !c.y.is_finite())
        {
            return Err(GeometryError::NonFinite);
        }
        let parts = self.parts();
        if parts.is_empty() {
            return Err(GeometryError::Degenerate("empty geometry".into()));
        }
        for ls in &parts.lines {
            let collapsed = ls.0.windows(2).all(|w| {
                let d = w[1] - w[0];
                d.x.hypot(d.y) <= TOLERANCE
            });
            if ls.0.len() < 2 || collapsed {
                return Err(GeometryError::Degenerate("line without two distinct vertices".into()));
            }
        }
        for p in &parts.polygons {
            if p.exterior().0.len() < 4 || p.unsigned_area() <= TOLERANCE {
                return Err(GeometryError::Degenerate("polygon without area".into()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Returns one shape per constituent line, each carrying this shape's attributes.
    #[must_use]
    pub fn line_parts(&self) -> Vec<Shape> {
        self.parts()
            .lines
            .into_iter()
            .map(|ls| self.with_geometry(Geometry::LineString(ls)))
            .collect()
    }
}

impl From<Geometry<f64>> for Shape {
    fn from(geometry: Geometry<f64>) -> Self {
        Self::new(geometry)
    }
}
