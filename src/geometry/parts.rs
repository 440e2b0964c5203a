use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};

/// A geometry flattened into its point, line and polygon constituents.
///
/// Every kernel operation works on this form: collections are expanded
/// recursively, `Line`/`Rect`/`Triangle` are normalized to their
/// `LineString`/`Polygon` equivalents and empty members are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryParts {
    pub points: Vec<Coord<f64>>,
    pub lines: Vec<LineString<f64>>,
    pub polygons: Vec<Polygon<f64>>,
}

impl GeometryParts {
    /// Flattens a geometry.
    #[must_use]
    pub fn from_geometry(geometry: &Geometry<f64>) -> Self {
        let mut parts = Self::default();
        parts.push_geometry(geometry);
        parts
    }

    fn push_geometry(&mut self, geometry: &Geometry<f64>) {
        match geometry {
            Geometry::Point(p) => self.points.push(p.0),
            Geometry::MultiPoint(mp) => self.points.extend(mp.iter().map(|p| p.0)),
            Geometry::Line(l) => self.push_line(LineString::new(vec![l.start, l.end])),
            Geometry::LineString(ls) => self.push_line(ls.clone()),
            Geometry::MultiLineString(mls) => {
                for ls in mls {
                    self.push_line(ls.clone());
                }
            }
            Geometry::Polygon(p) => self.push_polygon(p.clone()),
            Geometry::MultiPolygon(mp) => {
                for p in mp {
                    self.push_polygon(p.clone());
                }
            }
            Geometry::Rect(r) => self.push_polygon(r.to_polygon()),
            Geometry::Triangle(t) => self.push_polygon(t.to_polygon()),
            Geometry::GeometryCollection(gc) => {
                for g in gc {
                    self.push_geometry(g);
                }
            }
        }
    }

    fn push_line(&mut self, ls: LineString<f64>) {
        if !ls.0.is_empty() {
            self.lines.push(ls);
        }
    }

    fn push_polygon(&mut self, p: Polygon<f64>) {
        if !p.exterior().0.is_empty() {
            self.polygons.push(p);
        }
    }

    /// Returns `true` if there is no constituent at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.lines.is_empty() && self.polygons.is_empty()
    }

    /// Returns the highest topological dimension present, or `None` if empty.
    #[must_use]
    pub fn dimension(&self) -> Option<u8> {
        if !self.polygons.is_empty() {
            Some(2)
        } else if !self.lines.is_empty() {
            Some(1)
        } else if !self.points.is_empty() {
            Some(0)
        } else {
            None
        }
    }

    /// Number of constituents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len() + self.lines.len() + self.polygons.len()
    }

    /// The polygonal constituents as a multi-polygon.
    #[must_use]
    pub fn multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.polygons.clone())
    }

    /// The linear constituents as a multi-line-string.
    #[must_use]
    pub fn multi_line_string(&self) -> MultiLineString<f64> {
        MultiLineString::new(self.lines.clone())
    }

    /// Drops the constituents below the highest dimension present.
    #[must_use]
    pub fn keep_highest_dimension(mut self) -> Self {
        match self.dimension() {
            Some(2) => {
                self.points.clear();
                self.lines.clear();
            }
            Some(1) => self.points.clear(),
            _ => {}
        }
        self
    }

    /// Splits into one `GeometryParts` per constituent, polygons first.
    #[must_use]
    pub fn into_singles(self) -> Vec<Self> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.polygons.into_iter().map(|p| Self {
            polygons: vec![p],
            ..Self::default()
        }));
        out.extend(self.lines.into_iter().map(|l| Self {
            lines: vec![l],
            ..Self::default()
        }));
        out.extend(self.points.into_iter().map(|c| Self {
            points: vec![c],
            ..Self::default()
        }));
        out
    }

    /// Merges another set of constituents into this one.
    pub fn extend(&mut self, other: Self) {
        self.points.extend(other.points);
        self.lines.extend(other.lines);
        self.polygons.extend(other.polygons);
    }

    /// Reassembles the narrowest geometry type holding all constituents.
    ///
    /// No constituent yields an empty `GeometryCollection`.
    #[must_use]
    pub fn into_geometry(self) -> Geometry<f64> {
        let Self {
            mut points,
            mut lines,
            mut polygons,
        } = self;
        let kinds = usize::from(!points.is_empty())
            + usize::from(!lines.is_empty())
            + usize::from(!polygons.is_empty());

        if kinds == 0 {
            return Geometry::GeometryCollection(GeometryCollection::new_from(Vec::new()));
        }

        let point_geom = |mut points: Vec<Coord<f64>>| match points.len() {
            1 => Geometry::Point(Point(points.remove(0))),
            _ => Geometry::MultiPoint(MultiPoint::new(points.into_iter().map(Point).collect())),
        };
        let line_geom = |mut lines: Vec<LineString<f64>>| match lines.len() {
            1 => Geometry::LineString(lines.remove(0)),
            _ => Geometry::MultiLineString(MultiLineString::new(lines)),
        };
        let polygon_geom = |mut polygons: Vec<Polygon<f64>>| match polygons.len() {
            1 => Geometry::Polygon(polygons.remove(0)),
            _ => Geometry::MultiPolygon(MultiPolygon::new(polygons)),
        };

        if kinds == 1 {
            if !points.is_empty() {
                return point_geom(points);
            }
            if !lines.is_empty() {
                return line_geom(lines);
            }
            return polygon_geom(polygons);
        }

        let mut members = Vec::with_capacity(3);
        if !polygons.is_empty() {
            members.push(polygon_geom(std::mem::take(&mut polygons)));
        }
        if !lines.is_empty() {
            members.push(line_geom(std::mem::take(&mut lines)));
        }
        if !points.is_empty() {
            members.push(point_geom(std::mem::take(&mut points)));
        }
        Geometry::GeometryCollection(GeometryCollection::new_from(members))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geo::{coord, line_string, polygon};

    #[test]
    fn flattens_nested_collections() {
        let gc = Geometry::GeometryCollection(GeometryCollection::new_from(vec![
            Geometry::Point(Point::new(1.0, 1.0)),
            Geometry::GeometryCollection(GeometryCollection::new_from(vec![Geometry::LineString(
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            )])),
            Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]),
        ]));
        let parts = GeometryParts::from_geometry(&gc);
        assert_eq!(parts.points.len(), 1);
        assert_eq!(parts.lines.len(), 1);
        assert_eq!(parts.polygons.len(), 1);
        assert_eq!(parts.dimension(), Some(2));
    }

    #[test]
    fn empty_roundtrip_is_empty_collection() {
        let g = GeometryParts::default().into_geometry();
        assert!(matches!(g, Geometry::GeometryCollection(ref gc) if gc.0.is_empty()));
        assert!(GeometryParts::from_geometry(&g).is_empty());
    }

    #[test]
    fn single_kind_narrows_type() {
        let parts = GeometryParts {
            points: vec![coord! { x: 1.0, y: 2.0 }],
            ..GeometryParts::default()
        };
        assert!(matches!(parts.into_geometry(), Geometry::Point(_)));

        let parts = GeometryParts {
            lines: vec![
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
                line_string![(x: 0.0, y: 1.0), (x: 1.0, y: 1.0)],
            ],
            ..GeometryParts::default()
        };
        assert!(matches!(parts.into_geometry(), Geometry::MultiLineString(_)));
    }

    #[test]
    fn keep_highest_dimension_drops_points_next_to_lines() {
        let parts = GeometryParts {
            points: vec![coord! { x: 5.0, y: 5.0 }],
            lines: vec![line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]],
            ..GeometryParts::default()
        }
        .keep_highest_dimension();
        assert!(parts.points.is_empty());
        assert_eq!(parts.lines.len(), 1);
    }

    #[test]
    fn into_singles_orders_polygons_first() {
        let parts = GeometryParts {
            points: vec![coord! { x: 5.0, y: 5.0 }],
            lines: vec![line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]],
            polygons: vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]],
        };
        let singles = parts.into_singles();
        assert_eq!(singles.len(), 3);
        assert_eq!(singles[0].dimension(), Some(2));
        assert_eq!(singles[2].dimension(), Some(0));
    }
}
