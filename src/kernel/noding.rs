use std::collections::HashSet;

use geo::LineString;

use crate::math::intersect_2d::{is_interior_param, segment_intersection_2d, SegmentIntersection};
use crate::math::{coord_from_point, point_from_coord, points_coincide, Point2, PARAM_TOLERANCE, TOLERANCE};

/// A cut requested on one segment of a line: parameter and exact location.
#[derive(Debug, Clone, Copy)]
struct Cut {
    t: f64,
    point: Point2,
}

/// Cuts collected for one line.
#[derive(Debug, Default)]
struct LineCuts {
    /// Interior cuts, per segment.
    segments: Vec<Vec<Cut>>,
    /// Vertices at which the line must be split.
    vertices: HashSet<usize>,
}

impl LineCuts {
    fn new(segment_count: usize) -> Self {
        Self {
            segments: vec![Vec::new(); segment_count],
            vertices: HashSet::new(),
        }
    }

    fn record(&mut self, segment: usize, t: f64, point: Point2) {
        if is_interior_param(t) {
            self.segments[segment].push(Cut { t, point });
        } else if t <= PARAM_TOLERANCE {
            self.vertices.insert(segment);
        } else {
            self.vertices.insert(segment + 1);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: Point2,
    max: Point2,
}

impl Bounds {
    fn of(a: &Point2, b: &Point2) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x + TOLERANCE
            && other.min.x <= self.max.x + TOLERANCE
            && self.min.y <= other.max.y + TOLERANCE
            && other.min.y <= self.max.y + TOLERANCE
    }
}

/// Converts a line string to points, dropping consecutive duplicates.
#[must_use]
pub fn dedup_points(ls: &LineString<f64>) -> Vec<Point2> {
    let mut pts: Vec<Point2> = Vec::with_capacity(ls.0.len());
    for c in &ls.0 {
        let p = point_from_coord(*c);
        if pts.last().is_none_or(|last| !points_coincide(last, &p)) {
            pts.push(p);
        }
    }
    pts
}

fn is_closed(pts: &[Point2]) -> bool {
    pts.len() > 3 && points_coincide(&pts[0], &pts[pts.len() - 1])
}

/// Returns `true` if segments `i < j` of a line only share the vertex between them.
fn adjacent(i: usize, j: usize, segment_count: usize, closed: bool) -> bool {
    j == i + 1 || (closed && i == 0 && j == segment_count - 1)
}

/// Returns `true` if a polyline does not intersect itself.
///
/// Consecutive segments may share their common vertex, and a closed ring may
/// meet itself at its closing vertex; any other contact, including collinear
/// backtracking, makes the line non-simple.
#[must_use]
pub fn is_simple(pts: &[Point2]) -> bool {
    let n = pts.len().saturating_sub(1);
    let closed = is_closed(pts);
    for i in 0..n {
        for j in (i + 1)..n {
            let Some(hit) = segment_intersection_2d(&pts[i], &pts[i + 1], &pts[j], &pts[j + 1]) else {
                continue;
            };
            if adjacent(i, j, n, closed) && matches!(hit, SegmentIntersection::Point { .. }) {
                continue;
            }
            return false;
        }
    }
    true
}

/// Splits `subject` lines at every point where they touch each other or one
/// of the `cutters`.
///
/// Lines are only cut where needed: an input vertex that is not an
/// intersection stays an interior vertex of its piece. Pieces that would
/// still intersect themselves (collinear backtracking) are exploded into
/// their segments. Duplicate pieces, in either direction, are emitted once.
#[must_use]
pub fn node_against(subject: &[LineString<f64>], cutters: &[LineString<f64>]) -> Vec<LineString<f64>> {
    let subject: Vec<Vec<Point2>> = subject.iter().map(dedup_points).collect();
    let cutters: Vec<Vec<Point2>> = cutters.iter().map(dedup_points).collect();

    let mut cuts: Vec<LineCuts> = subject
        .iter()
        .map(|pts| LineCuts::new(pts.len().saturating_sub(1)))
        .collect();

    for li in 0..subject.len() {
        let a = &subject[li];
        let a_closed = is_closed(a);
        let a_segs = a.len().saturating_sub(1);
        for si in 0..a_segs {
            let sb = Bounds::of(&a[si], &a[si + 1]);

            // Against itself and later subject lines.
            for (lj, b) in subject.iter().enumerate().skip(li) {
                let start = if lj == li { si + 1 } else { 0 };
                for sj in start..b.len().saturating_sub(1) {
                    if !sb.overlaps(&Bounds::of(&b[sj], &b[sj + 1])) {
                        continue;
                    }
                    let Some(hit) = segment_intersection_2d(&a[si], &a[si + 1], &b[sj], &b[sj + 1]) else {
                        continue;
                    };
                    let touching_neighbours = lj == li && adjacent(si, sj, a_segs, a_closed);
                    match hit {
                        SegmentIntersection::Point { .. } if touching_neighbours => {}
                        SegmentIntersection::Point { point, t, u } => {
                            cuts[li].record(si, t, point);
                            cuts[lj].record(sj, u, point);
                        }
                        SegmentIntersection::Overlap {
                            start,
                            t_start,
                            u_start,
                            end,
                            t_end,
                            u_end,
                        } => {
                            cuts[li].record(si, t_start, start);
                            cuts[li].record(si, t_end, end);
                            cuts[lj].record(sj, u_start, start);
                            cuts[lj].record(sj, u_end, end);
                        }
                    }
                }
            }

            for c in &cutters {
                for sj in 0..c.len().saturating_sub(1) {
                    if !sb.overlaps(&Bounds::of(&c[sj], &c[sj + 1])) {
                        continue;
                    }
                    match segment_intersection_2d(&a[si], &a[si + 1], &c[sj], &c[sj + 1]) {
                        Some(SegmentIntersection::Point { point, t, .. }) => {
                            cuts[li].record(si, t, point);
                        }
                        Some(SegmentIntersection::Overlap {
                            start,
                            t_start,
                            end,
                            t_end,
                            ..
                        }) => {
                            cuts[li].record(si, t_start, start);
                            cuts[li].record(si, t_end, end);
                        }
                        None => {}
                    }
                }
            }
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (pts, line_cuts) in subject.iter().zip(cuts) {
        for piece in cut_line(pts, line_cuts) {
            let pieces = if is_simple(&piece) {
                vec![piece]
            } else {
                piece.windows(2).map(<[Point2]>::to_vec).collect()
            };
            for piece in pieces {
                if seen.insert(piece_key(&piece)) {
                    out.push(piece.iter().map(coord_from_point).collect());
                }
            }
        }
    }
    out
}

/// Nodes a set of lines against each other.
#[must_use]
pub fn node_lines(lines: &[LineString<f64>]) -> Vec<LineString<f64>> {
    node_against(lines, &[])
}

fn cut_line(pts: &[Point2], mut cuts: LineCuts) -> Vec<Vec<Point2>> {
    if pts.len() < 2 {
        return Vec::new();
    }
    let last_vertex = pts.len() - 1;
    let mut pieces = Vec::new();
    let mut current = vec![pts[0]];

    let mut cut_at = |current: &mut Vec<Point2>, p: Point2| {
        if current.last().is_none_or(|last| !points_coincide(last, &p)) {
            current.push(p);
        }
        if current.len() >= 2 {
            pieces.push(std::mem::replace(current, vec![p]));
        }
    };

    for (si, seg_cuts) in cuts.segments.iter_mut().enumerate() {
        seg_cuts.sort_by(|a, b| a.t.total_cmp(&b.t));
        for cut in seg_cuts.iter() {
            cut_at(&mut current, cut.point);
        }
        let next = pts[si + 1];
        if current.last().is_none_or(|last| !points_coincide(last, &next)) {
            current.push(next);
        }
        if si + 1 < last_vertex && cuts.vertices.contains(&(si + 1)) {
            cut_at(&mut current, next);
        }
    }
    if current.len() >= 2 {
        pieces.push(current);
    }
    pieces
}

/// Direction-independent identity of a piece.
fn piece_key(pts: &[Point2]) -> Vec<(u64, u64)> {
    let forward: Vec<(u64, u64)> = pts
        .iter()
        .map(|p| ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits()))
        .collect();
    let mut backward = forward.clone();
    backward.reverse();
    forward.min(backward)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geo::line_string;

    fn endpoints(ls: &LineString<f64>) -> (Point2, Point2) {
        let pts = dedup_points(ls);
        (pts[0], pts[pts.len() - 1])
    }

    #[test]
    fn crossing_lines_become_four_pieces() {
        let lines = vec![
            line_string![(x: 0.0, y: 10.0), (x: 20.0, y: 10.0)],
            line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 20.0)],
        ];
        let noded = node_lines(&lines);
        assert_eq!(noded.len(), 4);
        for ls in &noded {
            let (a, b) = endpoints(ls);
            let at_node = points_coincide(&a, &Point2::new(10.0, 10.0))
                || points_coincide(&b, &Point2::new(10.0, 10.0));
            assert!(at_node, "piece {ls:?} does not touch the crossing");
        }
    }

    #[test]
    fn uncrossed_interior_vertices_are_kept() {
        let lines = vec![line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 5.0, y: 5.0)]];
        let noded = node_lines(&lines);
        assert_eq!(noded.len(), 1);
        assert_eq!(noded[0].0.len(), 3);
    }

    #[test]
    fn t_junction_splits_the_through_line_only() {
        let lines = vec![
            line_string![(x: 10.0, y: 10.0), (x: 20.0, y: 20.0)],
            line_string![(x: 10.0, y: 20.0), (x: 15.0, y: 15.0)],
        ];
        assert_eq!(node_lines(&lines).len(), 3);
    }

    #[test]
    fn shared_endpoints_do_not_split() {
        let lines = vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 1.0, y: 0.0), (x: 1.0, y: 1.0)],
        ];
        assert_eq!(node_lines(&lines).len(), 2);
    }

    #[test]
    fn duplicate_lines_collapse() {
        let lines = vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 1.0, y: 0.0), (x: 0.0, y: 0.0)],
        ];
        assert_eq!(node_lines(&lines).len(), 1);
    }

    #[test]
    fn crossing_at_interior_vertex_splits_there() {
        let lines = vec![
            line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 10.0, y: 0.0)],
            line_string![(x: 5.0, y: -5.0), (x: 5.0, y: 5.0)],
        ];
        assert_eq!(node_lines(&lines).len(), 4);
    }

    #[test]
    fn self_crossing_line_is_noded() {
        // A "figure four": the last segment crosses the first.
        let lines = vec![line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 5.0),
            (x: 5.0, y: -5.0)
        ]];
        let noded = node_lines(&lines);
        assert_eq!(noded.len(), 3);
        for ls in &noded {
            assert!(is_simple(&dedup_points(ls)));
        }
    }

    #[test]
    fn backtracking_line_is_exploded_and_deduplicated() {
        let lines = vec![line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 1.0, y: 0.0)]];
        let noded = node_lines(&lines);
        assert_eq!(noded.len(), 2);
        for ls in &noded {
            assert!(is_simple(&dedup_points(ls)));
        }
    }

    #[test]
    fn cutters_split_without_being_emitted() {
        let subject = vec![line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]];
        let cutters = vec![line_string![(x: 4.0, y: -1.0), (x: 4.0, y: 1.0)]];
        let noded = node_against(&subject, &cutters);
        assert_eq!(noded.len(), 2);
    }

    #[test]
    fn simplicity_checks() {
        let p = Point2::new;
        assert!(is_simple(&[p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)]));
        assert!(is_simple(&[p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 0.0)]));
        assert!(!is_simple(&[p(0.0, 0.0), p(2.0, 0.0), p(1.0, 0.0)]));
        assert!(!is_simple(&[p(0.0, 0.0), p(2.0, 2.0), p(2.0, 0.0), p(0.0, 2.0)]));
    }
}
