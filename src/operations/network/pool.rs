use std::collections::VecDeque;

use slotmap::{new_key_type, SlotMap};

use crate::geometry::Shape;
use crate::math::Point2;

use super::split_at::single_line_points;

new_key_type! {
    /// Key of an edge in an [`EdgePool`].
    pub struct EdgeKey;
}

/// Which pool an edge currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Still waiting to have its endpoints checked.
    Pending,
    /// Neither endpoint needs reconnecting.
    Finalized,
}

/// A network edge with its cached vertices.
#[derive(Debug, Clone)]
pub struct PooledEdge {
    pub shape: Shape,
    /// Vertices without consecutive duplicates.
    pub points: Vec<Point2>,
    pub state: PoolState,
}

/// Arena holding the worklist and the finalized pool of the network repair.
///
/// Edges are addressed by [`EdgeKey`]. Removing an edge invalidates its key,
/// and stale keys left in the worklist are skipped.
#[derive(Debug, Default)]
pub struct EdgePool {
    edges: SlotMap<EdgeKey, PooledEdge>,
    worklist: VecDeque<EdgeKey>,
}

impl EdgePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an edge in the given state. Pending edges join the back of the worklist.
    pub fn insert(&mut self, shape: Shape, state: PoolState) -> EdgeKey {
        let points = single_line_points(&shape).unwrap_or_default();
        let key = self.edges.insert(PooledEdge {
            shape,
            points,
            state,
        });
        if state == PoolState::Pending {
            self.worklist.push_back(key);
        }
        key
    }

    /// Pops the next pending edge.
    pub fn next_pending(&mut self) -> Option<EdgeKey> {
        while let Some(key) = self.worklist.pop_front() {
            if self
                .edges
                .get(key)
                .is_some_and(|e| e.state == PoolState::Pending)
            {
                return Some(key);
            }
        }
        None
    }

    /// Puts a pending edge back at the front of the worklist.
    pub fn requeue_front(&mut self, key: EdgeKey) {
        if self.edges.contains_key(key) {
            self.worklist.push_front(key);
        }
    }

    pub fn finalize(&mut self, key: EdgeKey) {
        if let Some(edge) = self.edges.get_mut(key) {
            edge.state = PoolState::Finalized;
        }
    }

    /// Finalizes every edge, leaving the worklist empty.
    pub fn finalize_all(&mut self) {
        self.worklist.clear();
        for edge in self.edges.values_mut() {
            edge.state = PoolState::Finalized;
        }
    }

    #[must_use]
    pub fn get(&self, key: EdgeKey) -> Option<&PooledEdge> {
        self.edges.get(key)
    }

    /// Replaces the geometry of an edge, keeping its key and state.
    pub fn replace(&mut self, key: EdgeKey, shape: Shape) {
        if let Some(edge) = self.edges.get_mut(key) {
            edge.points = single_line_points(&shape).unwrap_or_default();
            edge.shape = shape;
        }
    }

    pub fn remove(&mut self, key: EdgeKey) -> Option<PooledEdge> {
        self.edges.remove(key)
    }

    /// All edges, in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeKey, &PooledEdge)> {
        self.edges.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Consumes the pool, returning every edge's shape in arena order.
    #[must_use]
    pub fn into_shapes(self) -> Vec<Shape> {
        self.edges.into_iter().map(|(_, e)| e.shape).collect()
    }
}
