use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use geo::{Geometry, LineString, MultiLineString};
use tracing::{debug, trace, warn};

use crate::error::{OperationError, Result};
use crate::geometry::{GeometryParts, Shape, ShapeKind};
use crate::graph::{vertex_key, VertexKey};
use crate::kernel::noding::{dedup_points, is_simple, node_lines};
use crate::kernel::GeometryKernel;
use crate::math::distance_2d::polyline_length;
use crate::math::intersect_2d::{segment_intersection_2d, SegmentIntersection};
use crate::math::{coord_from_point, Point2, PARAM_TOLERANCE};

use super::split_at::{line_from_points, single_line_points, split_polyline};

/// Explodes line-kind shapes into one shape per constituent line and drops
/// everything else.
pub(super) fn explode_lines(shapes: &[Shape]) -> Vec<Shape> {
    let mut lines = Vec::with_capacity(shapes.len());
    for shape in shapes {
        if shape.kind() != ShapeKind::Line {
            debug!(kind = ?shape.kind(), "dropping non-line input");
            continue;
        }
        for part in shape.line_parts() {
            if part.is_valid() {
                lines.push(part);
            } else {
                debug!("dropping degenerate line");
            }
        }
    }
    lines
}

/// Decomposes a set of lines into segments whose interiors do not cross.
///
/// Without attribute preservation all lines are merged by one kernel union,
/// which nodes them at every intersection. With it, crossing pairs are split
/// one at a time so every fragment keeps the attributes of its source line.
pub struct SplitLines {
    lines: Vec<Shape>,
    preserve_attributes: bool,
    insertion_limit: Option<usize>,
}

/// Axis-aligned bounds of a polyline.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: Point2,
    max: Point2,
}

impl Bounds {
    fn of(pts: &[Point2]) -> Self {
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in pts {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Self { min, max }
    }

    fn overlaps(&self, other: &Self, eps: f64) -> bool {
        self.min.x <= other.max.x + eps
            && other.min.x <= self.max.x + eps
            && self.min.y <= other.max.y + eps
            && other.min.y <= self.max.y + eps
    }
}

/// A point where two worklist lines cross.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    point: Point2,
    segment_a: usize,
    segment_b: usize,
    /// Position along the first line, as segment index plus parameter.
    along_a: f64,
}

#[allow(clippy::cast_precision_loss)]
fn is_interior_position(along: f64, segment_count: usize) -> bool {
    along > PARAM_TOLERANCE && along < segment_count as f64 - PARAM_TOLERANCE
}

/// Intersections of `a` and `b` that lie inside at least one of them,
/// ordered along `a`. A collinear overlap contributes both of its ends.
#[allow(clippy::cast_precision_loss)]
fn crossings(a: &[Point2], b: &[Point2]) -> Vec<Crossing> {
    let na = a.len().saturating_sub(1);
    let nb = b.len().saturating_sub(1);
    let mut hits = Vec::new();
    let mut push = |point: Point2, i: usize, j: usize, t: f64, u: f64| {
        let along_a = i as f64 + t;
        if is_interior_position(along_a, na) || is_interior_position(j as f64 + u, nb) {
            hits.push(Crossing {
                point,
                segment_a: i,
                segment_b: j,
                along_a,
            });
        }
    };
    for i in 0..na {
        for j in 0..nb {
            match segment_intersection_2d(&a[i], &a[i + 1], &b[j], &b[j + 1]) {
                Some(SegmentIntersection::Point { point, t, u }) => push(point, i, j, t, u),
                Some(SegmentIntersection::Overlap {
                    start,
                    t_start,
                    u_start,
                    end,
                    t_end,
                    u_end,
                }) => {
                    push(start, i, j, t_start, u_start);
                    push(end, i, j, t_end, u_end);
                }
                None => {}
            }
        }
    }
    hits.sort_by(|x, y| x.along_a.total_cmp(&y.along_a));
    hits
}

/// Direction-independent identity of a polyline's exact vertices.
fn line_key(pts: &[Point2]) -> Vec<VertexKey> {
    let forward: Vec<VertexKey> = pts.iter().map(vertex_key).collect();
    let backward: Vec<VertexKey> = pts.iter().rev().map(vertex_key).collect();
    forward.min(backward)
}

/// Drops fragments that coincide exactly with an earlier one. Of coincident
/// fragments, the one cut from the earliest input line is kept, in the
/// position of the first one finished.
fn collapse_duplicates(done: Vec<(usize, Shape)>) -> Vec<Shape> {
    let mut slots: Vec<(usize, Shape)> = Vec::with_capacity(done.len());
    let mut seen: HashMap<Vec<VertexKey>, usize> = HashMap::new();
    for (origin, shape) in done {
        let Some(pts) = single_line_points(&shape) else {
            slots.push((origin, shape));
            continue;
        };
        match seen.entry(line_key(&pts)) {
            Entry::Occupied(slot) => {
                let kept = &mut slots[*slot.get()];
                trace!(kept = kept.0.min(origin), "collapsed coincident fragments");
                if origin < kept.0 {
                    *kept = (origin, shape);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(slots.len());
                slots.push((origin, shape));
            }
        }
    }
    slots.into_iter().map(|(_, shape)| shape).collect()
}

impl SplitLines {
    #[must_use]
    pub fn new(lines: Vec<Shape>) -> Self {
        Self {
            lines,
            preserve_attributes: false,
            insertion_limit: None,
        }
    }

    /// Keeps each fragment's attributes equal to its source line's.
    #[must_use]
    pub fn with_preserve_attributes(mut self, preserve: bool) -> Self {
        self.preserve_attributes = preserve;
        self
    }

    /// Overrides the worklist insertion bound of the attribute-preserving
    /// split, which is `4 * (s + 1)^2` for `s` input segments by default.
    #[must_use]
    pub(crate) fn with_insertion_limit(mut self, limit: usize) -> Self {
        self.insertion_limit = Some(limit);
        self
    }

    /// Executes the split.
    ///
    /// Non-line inputs and degenerate lines are dropped. Multi-lines are
    /// split into their constituent lines first. Where lines overlap, the
    /// shared stretch is kept once, with the attributes of the line that
    /// comes first in the input.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::NonConvergence` if the attribute-preserving
    /// fixed point needs more worklist insertions than its bound.
    pub fn execute<K: GeometryKernel + ?Sized>(&self, kernel: &K) -> Result<Vec<Shape>> {
        let lines = explode_lines(&self.lines);
        if lines.is_empty() {
            return Ok(Vec::new());
        }
        if self.preserve_attributes {
            return split_preserving(lines, self.insertion_limit);
        }
        match merge_lines(&lines, kernel) {
            Some(merged) => Ok(merged),
            None => {
                warn!("line union failed, splitting pairwise instead");
                split_preserving(lines, self.insertion_limit)
                    .map(|out| out.into_iter().map(|s| Shape::new(s.into_geometry())).collect())
            }
        }
    }
}

/// Nodes every line in one kernel union and returns the resulting segments.
fn merge_lines<K: GeometryKernel + ?Sized>(lines: &[Shape], kernel: &K) -> Option<Vec<Shape>> {
    let (first, rest) = lines.split_first()?;
    let rest: Vec<LineString<f64>> = rest.iter().flat_map(|s| s.parts().lines).collect();
    let merged = kernel.union(
        first.geometry(),
        &Geometry::MultiLineString(MultiLineString::new(rest)),
    )?;
    Some(
        GeometryParts::from_geometry(&merged)
            .lines
            .into_iter()
            .map(|ls| Shape::new(Geometry::LineString(ls)))
            .filter(Shape::is_valid)
            .collect(),
    )
}

fn segment_count(lines: &[Shape]) -> usize {
    lines
        .iter()
        .map(|l| single_line_points(l).map_or(0, |pts| pts.len().saturating_sub(1)))
        .sum()
}

/// Worklist fixed point: split crossing pairs until none remain.
///
/// Each worklist entry remembers the input line it was cut from.
fn split_preserving(lines: Vec<Shape>, insertion_limit: Option<usize>) -> Result<Vec<Shape>> {
    let s = segment_count(&lines);
    let limit = insertion_limit.unwrap_or(4 * (s + 1) * (s + 1));
    let mut insertions = 0_usize;
    let mut work: VecDeque<(usize, Shape)> = lines.into_iter().enumerate().collect();
    let mut done: Vec<(usize, Shape)> = Vec::new();

    let mut push = |work: &mut VecDeque<(usize, Shape)>, pieces: Vec<(usize, Shape)>| -> Result<()> {
        insertions += pieces.len();
        if insertions > limit {
            return Err(OperationError::NonConvergence { insertions, limit }.into());
        }
        work.extend(pieces);
        Ok(())
    };

    while let Some((origin, line)) = work.pop_front() {
        let Some(pts) = single_line_points(&line) else {
            continue;
        };
        if pts.len() < 2 {
            debug!("dropping zero-length fragment");
            continue;
        }

        if !is_simple(&pts) {
            let ls: LineString<f64> = pts.iter().map(coord_from_point).collect();
            let pieces: Vec<(usize, Shape)> = node_lines(&[ls])
                .into_iter()
                .map(|piece| (origin, line.with_geometry(line_from_points(&dedup_points(&piece)))))
                .collect();
            trace!(pieces = pieces.len(), "self-noded line");
            push(&mut work, pieces)?;
            continue;
        }

        match split_first_crossing(&line, &pts, &mut work) {
            Some((own, (other_origin, other))) => {
                let mut pieces: Vec<(usize, Shape)> = own.into_iter().map(|s| (origin, s)).collect();
                pieces.extend(other.into_iter().map(|s| (other_origin, s)));
                push(&mut work, pieces)?;
            }
            None => done.push((origin, line)),
        }
    }

    done.retain(|(_, s)| s.is_valid());
    Ok(collapse_duplicates(done))
}

/// Finds the first worklist member crossing `line` and splits both at the
/// crossing nearest the start of `line`.
///
/// The crossed member is removed from the worklist. Returns the fragments of
/// `line`, and the fragments of that member with its origin, or `None` if
/// nothing crosses `line`.
fn split_first_crossing(
    line: &Shape,
    pts: &[Point2],
    work: &mut VecDeque<(usize, Shape)>,
) -> Option<(Vec<Shape>, (usize, Vec<Shape>))> {
    let bounds = Bounds::of(pts);
    let eps = (polyline_length(pts) / 1000.0).min(0.001);

    let mut found = None;
    'scan: for (idx, (other_origin, other)) in work.iter().enumerate() {
        let Some(other_pts) = single_line_points(other) else {
            continue;
        };
        if other_pts.len() < 2 || !bounds.overlaps(&Bounds::of(&other_pts), eps) {
            continue;
        }
        for hit in crossings(pts, &other_pts) {
            let own = split_polyline(pts, hit.segment_a, hit.point);
            let theirs = split_polyline(&other_pts, hit.segment_b, hit.point);
            if own.len() < 2 && theirs.len() < 2 {
                continue;
            }
            trace!(x = hit.point.x, y = hit.point.y, "splitting crossing lines");
            let own: Vec<Shape> = own
                .iter()
                .map(|p| line.with_geometry(line_from_points(p)))
                .collect();
            let theirs: Vec<Shape> = theirs
                .iter()
                .map(|p| other.with_geometry(line_from_points(p)))
                .collect();
            found = Some((idx, own, (*other_origin, theirs)));
            break 'scan;
        }
    }

    let (idx, own, theirs) = found?;
    work.remove(idx);
    Some((own, theirs))
}
