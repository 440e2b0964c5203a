//! Graph view of a line network.
//!
//! Each line-kind edge contributes one graph edge between its first and last
//! vertex. Vertices are identified by exact coordinates, so only endpoints
//! that were snapped onto each other are connected.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

use crate::geometry::Shape;
use crate::math::Point2;

/// Exact identity of a vertex. `-0.0` and `0.0` map to the same key.
pub(crate) type VertexKey = (u64, u64);

pub(crate) fn vertex_key(p: &Point2) -> VertexKey {
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}

/// A set of graph vertices, looked up by coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexSet {
    keys: HashSet<VertexKey>,
}

impl VertexSet {
    #[must_use]
    pub fn contains(&self, p: &Point2) -> bool {
        self.keys.contains(&vertex_key(p))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Undirected multigraph induced by a set of network edges.
///
/// Edge weights are indices into the slice passed to [`NetworkGraph::from_edges`].
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    graph: UnGraph<Point2, usize>,
}

impl NetworkGraph {
    /// Builds the graph. Shapes with fewer than two vertices contribute nothing.
    #[must_use]
    pub fn from_edges(edges: &[Shape]) -> Self {
        let mut graph = UnGraph::<Point2, usize>::new_undirected();
        let mut nodes: HashMap<VertexKey, NodeIndex> = HashMap::new();
        let mut node_for = |graph: &mut UnGraph<Point2, usize>, p: Point2| {
            *nodes
                .entry(vertex_key(&p))
                .or_insert_with(|| graph.add_node(p))
        };

        for (i, edge) in edges.iter().enumerate() {
            let pts = edge.points();
            let (Some(first), Some(last)) = (pts.first(), pts.last()) else {
                continue;
            };
            if pts.len() < 2 {
                continue;
            }
            let a = node_for(&mut graph, *first);
            let b = node_for(&mut graph, *last);
            graph.add_edge(a, b, i);
        }
        Self { graph }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Vertices of the largest connected component.
    ///
    /// Components are compared by vertex count; on a tie the component
    /// containing the earliest-created vertex wins. An empty graph yields an
    /// empty set.
    #[must_use]
    pub fn main_connected_component(&self) -> VertexSet {
        let n = self.graph.node_count();
        let mut uf = UnionFind::<usize>::new(n);
        for e in self.graph.edge_references() {
            uf.union(e.source().index(), e.target().index());
        }

        let labels = uf.into_labeling();
        let mut sizes: HashMap<usize, usize> = HashMap::new();
        for &root in &labels {
            *sizes.entry(root).or_default() += 1;
        }

        let mut best: Option<(usize, usize)> = None;
        for &root in &labels {
            let size = sizes.get(&root).copied().unwrap_or(0);
            let larger = match best {
                Some((_, s)) => size > s,
                None => true,
            };
            if larger {
                best = Some((root, size));
            }
        }

        let Some((root, _)) = best else {
            return VertexSet::default();
        };
        let keys = self
            .graph
            .node_indices()
            .filter(|ix| labels[ix.index()] == root)
            .map(|ix| vertex_key(&self.graph[ix]))
            .collect();
        VertexSet { keys }
    }

    /// Indices of the edges with at least one endpoint in `vertices`, in input order.
    #[must_use]
    pub fn edges_touching(&self, vertices: &VertexSet) -> Vec<usize> {
        let mut touching: Vec<usize> = self
            .graph
            .edge_references()
            .filter(|e| {
                vertices.contains(&self.graph[e.source()]) || vertices.contains(&self.graph[e.target()])
            })
            .map(|e| *e.weight())
            .collect();
        touching.sort_unstable();
        touching
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(a: (f64, f64), b: (f64, f64)) -> Shape {
        Shape::line(&[Point2::new(a.0, a.1), Point2::new(b.0, b.1)])
    }

    #[test]
    fn shared_endpoints_are_one_vertex() {
        let g = NetworkGraph::from_edges(&[
            line((0.0, 0.0), (1.0, 0.0)),
            line((1.0, 0.0), (1.0, 1.0)),
        ]);
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn main_component_is_the_largest() {
        let edges = vec![
            line((100.0, 100.0), (101.0, 100.0)),
            line((0.0, 0.0), (1.0, 0.0)),
            line((1.0, 0.0), (2.0, 0.0)),
            line((2.0, 0.0), (2.0, 5.0)),
        ];
        let g = NetworkGraph::from_edges(&edges);
        let main = g.main_connected_component();
        assert_eq!(main.len(), 4);
        assert!(main.contains(&Point2::new(2.0, 5.0)));
        assert!(!main.contains(&Point2::new(100.0, 100.0)));
        assert_eq!(g.edges_touching(&main), vec![1, 2, 3]);
    }

    #[test]
    fn tie_goes_to_first_component() {
        let edges = vec![line((5.0, 5.0), (6.0, 5.0)), line((0.0, 0.0), (1.0, 0.0))];
        let g = NetworkGraph::from_edges(&edges);
        let main = g.main_connected_component();
        assert_eq!(g.edges_touching(&main), vec![0]);
    }

    #[test]
    fn parallel_edges_are_kept() {
        let edges = vec![
            line((0.0, 0.0), (1.0, 0.0)),
            Shape::line(&[Point2::new(0.0, 0.0), Point2::new(0.5, 1.0), Point2::new(1.0, 0.0)]),
        ];
        let g = NetworkGraph::from_edges(&edges);
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edges_touching(&g.main_connected_component()), vec![0, 1]);
    }

    #[test]
    fn empty_graph_has_empty_component() {
        let g = NetworkGraph::from_edges(&[]);
        assert!(g.main_connected_component().is_empty());
        assert!(g.edges_touching(&VertexSet::default()).is_empty());
    }

    #[test]
    fn signed_zero_is_one_vertex() {
        let g = NetworkGraph::from_edges(&[
            line((0.0, 0.0), (1.0, 0.0)),
            line((-0.0, -0.0), (0.0, 1.0)),
        ]);
        assert_eq!(g.vertex_count(), 3);
    }
}
