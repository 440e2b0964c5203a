use geo::{Geometry, Intersects, LineString};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::geometry::Shape;
use crate::graph::NetworkGraph;
use crate::kernel::GeometryKernel;
use crate::math::coord_from_point;
use crate::math::distance_2d::{project_onto_polyline, PolylineProjection};
use crate::math::Point2;

use super::pool::{EdgeKey, EdgePool, PoolState};
use super::split::{explode_lines, SplitLines};
use super::split_at::{line_from_points, split_polyline};

/// Which end of a line is being reconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    First,
    Last,
}

/// Repairs the topology of a line network.
///
/// Dangling endpoints are snapped onto the closest other line when it lies
/// within the tolerance. Optionally the result is split at every crossing
/// and reduced to its largest connected component.
pub struct CleanNetwork {
    lines: Vec<Shape>,
    tolerance: f64,
    split_lines: bool,
    keep_main_component: bool,
    pass_limit: Option<usize>,
}

impl CleanNetwork {
    /// Creates a new `CleanNetwork` operation with snapping disabled.
    #[must_use]
    pub fn new(lines: Vec<Shape>) -> Self {
        Self {
            lines,
            tolerance: 0.0,
            split_lines: false,
            keep_main_component: false,
            pass_limit: None,
        }
    }

    /// Snapping distance. Zero, negative or NaN disables the repair step.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_split_lines(mut self, split_lines: bool) -> Self {
        self.split_lines = split_lines;
        self
    }

    #[must_use]
    pub fn with_keep_main_component(mut self, keep: bool) -> Self {
        self.keep_main_component = keep;
        self
    }

    /// Overrides the bound on snapping passes, `4 * (n + 1)^2` for `n` lines
    /// by default. Past it the remaining lines are kept as they are.
    #[must_use]
    pub(crate) fn with_pass_limit(mut self, limit: usize) -> Self {
        self.pass_limit = Some(limit);
        self
    }

    /// Executes the repair.
    ///
    /// Non-line and malformed inputs are dropped rather than reported. With
    /// line splitting enabled, snapping and splitting alternate until a
    /// snapping pass leaves the network unchanged, so cleaning the result
    /// again changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::NonConvergence` if line splitting is enabled
    /// and does not settle within its bound.
    pub fn execute<K: GeometryKernel + ?Sized>(&self, kernel: &K) -> Result<Vec<Shape>> {
        let lines = explode_lines(&self.lines);
        debug!(input = self.lines.len(), lines = lines.len(), "cleaning network");
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let round_limit = 2 * lines.len() + 2;
        let mut edges = self.reconnect(lines);
        debug!(edges = edges.len(), "endpoints reconnected");

        if self.split_lines {
            edges = split_all(kernel, edges)?;
            debug!(edges = edges.len(), "lines split");
            if self.tolerance > 0.0 {
                let mut rounds = 0_usize;
                loop {
                    let repaired = self.reconnect(edges.clone());
                    if repaired == edges {
                        break;
                    }
                    rounds += 1;
                    if rounds > round_limit {
                        warn!(rounds, "snapping and splitting did not settle, keeping the last split");
                        break;
                    }
                    edges = split_all(kernel, repaired)?;
                    debug!(round = rounds, edges = edges.len(), "split after further snapping");
                }
            }
        }

        if self.keep_main_component {
            let graph = NetworkGraph::from_edges(&edges);
            let main = graph.main_connected_component();
            let keep = graph.edges_touching(&main);
            debug!(vertices = main.len(), edges = keep.len(), "kept main component");
            let mut slots: Vec<Option<Shape>> = edges.into_iter().map(Some).collect();
            edges = keep.into_iter().filter_map(|i| slots.get_mut(i)?.take()).collect();
        }

        Ok(edges)
    }

    /// Snaps dangling endpoints, if enabled, and drops degenerate edges.
    fn reconnect(&self, lines: Vec<Shape>) -> Vec<Shape> {
        if self.tolerance > 0.0 {
            drop_degenerate(self.reconnect_all(lines))
        } else {
            drop_degenerate(lines)
        }
    }

    /// Runs the snapping worklist until every line is finalized.
    fn reconnect_all(&self, lines: Vec<Shape>) -> Vec<Shape> {
        let n = lines.len();
        let pass_limit = self.pass_limit.unwrap_or(4 * (n + 1) * (n + 1));
        let mut pool = EdgePool::new();
        for line in lines {
            pool.insert(line, PoolState::Pending);
        }

        let mut passes = 0_usize;
        while let Some(key) = pool.next_pending() {
            passes += 1;
            if passes > pass_limit {
                warn!(passes, limit = pass_limit, "network repair did not settle, keeping lines as they are");
                pool.finalize_all();
                break;
            }
            if self.reconnect_one(&mut pool, key) {
                pool.requeue_front(key);
            } else {
                pool.finalize(key);
            }
        }
        pool.into_shapes()
    }

    /// Tries to reconnect one endpoint of the candidate. Returns `true` if
    /// the pool changed.
    fn reconnect_one(&self, pool: &mut EdgePool, key: EdgeKey) -> bool {
        let Some(candidate) = pool.get(key) else {
            return false;
        };
        if candidate.points.len() < 2 {
            return false;
        }
        let candidate_pts = candidate.points.clone();
        let candidate_shape = candidate.shape.clone();

        for end in [End::First, End::Last] {
            let endpoint = match end {
                End::First => candidate_pts[0],
                End::Last => candidate_pts[candidate_pts.len() - 1],
            };
            let Some((other_key, proj)) = closest_other(pool, key, &endpoint) else {
                continue;
            };
            if proj.distance > self.tolerance {
                continue;
            }
            let Some(other) = pool.get(other_key) else {
                continue;
            };
            if candidate_shape.geometry().intersects(other.shape.geometry()) {
                continue;
            }

            let other_pts = other.points.clone();
            let (first, last) = (other_pts[0], other_pts[other_pts.len() - 1]);
            let target = if (proj.point - first).norm() <= self.tolerance {
                first
            } else if (proj.point - last).norm() <= self.tolerance {
                last
            } else {
                let Some(removed) = pool.remove(other_key) else {
                    continue;
                };
                for piece in split_polyline(&other_pts, proj.segment, proj.point) {
                    pool.insert(removed.shape.with_geometry(line_from_points(&piece)), removed.state);
                }
                trace!(x = proj.point.x, y = proj.point.y, "split line under dangling endpoint");
                proj.point
            };

            trace!(
                from_x = endpoint.x,
                from_y = endpoint.y,
                to_x = target.x,
                to_y = target.y,
                "snapped endpoint"
            );
            pool.replace(key, snap_endpoint(&candidate_shape, end, target));
            return true;
        }
        false
    }
}

/// The line closest to `p` other than `exclude`, with the projection onto it.
/// Ties go to the first line in arena order.
fn closest_other(pool: &EdgePool, exclude: EdgeKey, p: &Point2) -> Option<(EdgeKey, PolylineProjection)> {
    let mut best: Option<(EdgeKey, PolylineProjection)> = None;
    for (key, edge) in pool.iter() {
        if key == exclude {
            continue;
        }
        let Some(proj) = project_onto_polyline(p, &edge.points) else {
            continue;
        };
        if best.is_none_or(|(_, b)| proj.distance < b.distance) {
            best = Some((key, proj));
        }
    }
    best
}

/// A copy of `shape` with one endpoint moved to `target`.
fn snap_endpoint(shape: &Shape, end: End, target: Point2) -> Shape {
    let Some(mut line) = shape.parts().lines.into_iter().next() else {
        return shape.clone();
    };
    let slot = match end {
        End::First => line.0.first_mut(),
        End::Last => line.0.last_mut(),
    };
    if let Some(c) = slot {
        *c = coord_from_point(&target);
    }
    shape.with_geometry(Geometry::LineString(LineString::new(line.0)))
}

/// Attribute-preserving split with degenerate fragments removed.
fn split_all<K: GeometryKernel + ?Sized>(kernel: &K, edges: Vec<Shape>) -> Result<Vec<Shape>> {
    let edges = SplitLines::new(edges)
        .with_preserve_attributes(true)
        .execute(kernel)?;
    Ok(drop_degenerate(edges))
}

fn drop_degenerate(edges: Vec<Shape>) -> Vec<Shape> {
    let before = edges.len();
    let kept: Vec<Shape> = edges.into_iter().filter(Shape::is_valid).collect();
    if kept.len() < before {
        debug!(dropped = before - kept.len(), "dropped degenerate edges");
    }
    kept
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::AttributeValue;
    use crate::kernel::PlanarKernel;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn line(a: (f64, f64), b: (f64, f64)) -> Shape {
        Shape::line(&[p(a.0, a.1), p(b.0, b.1)])
    }

    fn endpoints(s: &Shape) -> (Point2, Point2) {
        let pts = s.points();
        (pts[0], pts[pts.len() - 1])
    }

    #[test]
    fn snaps_to_nearby_endpoint() {
        let out = CleanNetwork::new(vec![line((0.0, 0.0), (10.0, 0.0)), line((10.5, 0.2), (20.0, 0.0))])
            .with_tolerance(1.0)
            .execute(&PlanarKernel::new())
            .unwrap();
        assert_eq!(out.len(), 2);
        let (_, a_end) = endpoints(&out[0]);
        let (b_start, _) = endpoints(&out[1]);
        assert_eq!(a_end, b_start);
    }

    #[test]
    fn dangling_end_splits_line_underneath() {
        let out = CleanNetwork::new(vec![
            line((5.0, 1.0), (5.0, 10.0)).with_attribute("id", 1_i64),
            line((0.0, 0.0), (10.0, 0.0)).with_attribute("id", 2_i64),
        ])
        .with_tolerance(2.0)
        .execute(&PlanarKernel::new())
        .unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|s| s.points().contains(&p(5.0, 0.0))));
        let base_pieces = out
            .iter()
            .filter(|s| s.attribute("id") == Some(&AttributeValue::Int(2)))
            .count();
        assert_eq!(base_pieces, 2);
    }

    #[test]
    fn far_lines_are_untouched() {
        let input = vec![line((0.0, 0.0), (10.0, 0.0)), line((0.0, 5.0), (10.0, 5.0))];
        let out = CleanNetwork::new(input.clone())
            .with_tolerance(1.0)
            .execute(&PlanarKernel::new())
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn zero_tolerance_passes_through() {
        let input = vec![line((0.0, 0.0), (10.0, 0.0)), line((10.5, 0.0), (20.0, 0.0))];
        let out = CleanNetwork::new(input.clone())
            .execute(&PlanarKernel::new())
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn pass_limit_keeps_lines_as_they_are() {
        let input = vec![line((0.0, 0.0), (10.0, 0.0)), line((10.5, 0.2), (20.0, 0.0))];
        let out = CleanNetwork::new(input.clone())
            .with_tolerance(1.0)
            .with_pass_limit(0)
            .execute(&PlanarKernel::new())
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn end_freed_by_splitting_is_snapped() {
        // The loose end of the first line lies near the base line, which the
        // first line also crosses. Once the crossings are split, the end piece
        // no longer touches the base piece under it, gets snapped onto it and
        // collapses into the base piece it then runs along.
        let input = vec![
            line((2.0, 0.5), (6.0, -3.0)),
            line((0.0, 0.0), (10.0, 0.0)),
            line((2.4, -2.0), (2.4, 0.1)),
        ];
        let clean = |lines: &[Shape]| {
            CleanNetwork::new(lines.to_vec())
                .with_tolerance(1.0)
                .with_split_lines(true)
                .execute(&PlanarKernel::new())
                .unwrap()
        };
        let once = clean(&input);
        assert!(once.iter().all(|s| !s.points().contains(&p(2.0, 0.5))));
        assert_eq!(once.len(), 6);
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn drops_non_lines_and_degenerates() {
        let out = CleanNetwork::new(vec![
            Shape::point(p(0.0, 0.0)),
            line((1.0, 1.0), (1.0, 1.0)),
            line((0.0, 0.0), (1.0, 0.0)),
        ])
        .with_tolerance(0.5)
        .execute(&PlanarKernel::new())
        .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn keeps_main_component() {
        let out = CleanNetwork::new(vec![
            line((0.0, 0.0), (10.0, 0.0)),
            line((10.0, 0.0), (10.0, 10.0)),
            line((100.0, 100.0), (110.0, 100.0)),
        ])
        .with_keep_main_component(true)
        .execute(&PlanarKernel::new())
        .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|s| s.points()[0].x < 50.0));
    }

    #[test]
    fn empty_input() {
        let out = CleanNetwork::new(Vec::new())
            .with_tolerance(3.0)
            .with_split_lines(true)
            .with_keep_main_component(true)
            .execute(&PlanarKernel::new())
            .unwrap();
        assert!(out.is_empty());
    }
}
