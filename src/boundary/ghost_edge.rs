//! Immutable copy of one block edge, exchanged between blocks.

use serde::{Deserialize, Serialize};

use crate::state::{GridState, SWEState2D};
use crate::types::{BlockIndex, Edge};

/// Cell row or column along a block edge.
///
/// Holds the interior cells adjacent to `edge` of the `source` block, as
/// they were after `source` finished the update producing step `step`.
/// Values run along the edge in increasing coordinate order (`j` for
/// left/right edges, `i` for bottom/top edges).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GhostEdge {
    pub source: BlockIndex,
    /// Edge of the source block the cells were taken from
    pub edge: Edge,
    /// Step the values are valid for
    pub step: u64,
    pub h: Vec<f64>,
    pub hu: Vec<f64>,
    pub hv: Vec<f64>,
    pub b: Vec<f64>,
}

impl GhostEdge {
    /// Copy the interior cells adjacent to `edge` of `state`.
    pub fn capture(state: &GridState, source: BlockIndex, edge: Edge, step: u64) -> Self {
        let cells = interior_cells(state, edge);
        let mut snapshot = Self {
            source,
            edge,
            step,
            h: Vec::with_capacity(cells.len()),
            hu: Vec::with_capacity(cells.len()),
            hv: Vec::with_capacity(cells.len()),
            b: Vec::with_capacity(cells.len()),
        };
        for (i, j) in cells {
            snapshot.h.push(state.h[(i, j)]);
            snapshot.hu.push(state.hu[(i, j)]);
            snapshot.hv.push(state.hv[(i, j)]);
            snapshot.b.push(state.b[(i, j)]);
        }
        snapshot
    }

    /// Constant edge state, as a coupling driver would supply it.
    pub fn uniform(source: BlockIndex, edge: Edge, step: u64, len: usize, q: SWEState2D, b: f64) -> Self {
        Self {
            source,
            edge,
            step,
            h: vec![q.h; len],
            hu: vec![q.hu; len],
            hv: vec![q.hv; len],
            b: vec![b; len],
        }
    }

    /// Number of cells along the edge.
    #[inline]
    pub fn len(&self) -> usize {
        self.h.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.h.is_empty()
    }

    /// Whether all four arrays have the same length.
    pub fn is_consistent(&self) -> bool {
        let n = self.h.len();
        self.hu.len() == n && self.hv.len() == n && self.b.len() == n
    }

    #[inline]
    pub fn cell(&self, k: usize) -> SWEState2D {
        SWEState2D::new(self.h[k], self.hu[k], self.hv[k])
    }
}

/// Padded indices of the interior cells adjacent to `edge`.
pub(crate) fn interior_cells(state: &GridState, edge: Edge) -> Vec<(usize, usize)> {
    let (nx, ny) = (state.nx(), state.ny());
    match edge {
        Edge::Left => (1..=ny).map(|j| (1, j)).collect(),
        Edge::Right => (1..=ny).map(|j| (nx, j)).collect(),
        Edge::Bottom => (1..=nx).map(|i| (i, 1)).collect(),
        Edge::Top => (1..=nx).map(|i| (i, ny)).collect(),
    }
}

/// Padded indices of the ghost cells along `edge`, same order as
/// [`interior_cells`].
pub(crate) fn ghost_cells(state: &GridState, edge: Edge) -> Vec<(usize, usize)> {
    let (nx, ny) = (state.nx(), state.ny());
    match edge {
        Edge::Left => (1..=ny).map(|j| (0, j)).collect(),
        Edge::Right => (1..=ny).map(|j| (nx + 1, j)).collect(),
        Edge::Bottom => (1..=nx).map(|i| (i, 0)).collect(),
        Edge::Top => (1..=nx).map(|i| (i, ny + 1)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BlockGeometry;

    #[test]
    fn test_capture_right_edge() {
        let mut state = GridState::new(BlockGeometry::new(3, 2, 1.0, 1.0, 0.0, 0.0));
        state.h[(3, 1)] = 1.0;
        state.h[(3, 2)] = 2.0;
        state.hu[(3, 2)] = 0.5;
        state.b[(3, 1)] = -4.0;
        let edge = GhostEdge::capture(&state, BlockIndex::new(0, 0), Edge::Right, 7);
        assert_eq!(edge.len(), 2);
        assert_eq!(edge.h, vec![1.0, 2.0]);
        assert_eq!(edge.hu, vec![0.0, 0.5]);
        assert_eq!(edge.b, vec![-4.0, 0.0]);
        assert_eq!(edge.step, 7);
        assert!(edge.is_consistent());
    }

    #[test]
    fn test_ghost_cells_follow_interior_order() {
        let state = GridState::new(BlockGeometry::new(3, 2, 1.0, 1.0, 0.0, 0.0));
        assert_eq!(ghost_cells(&state, Edge::Top), vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(interior_cells(&state, Edge::Top), vec![(1, 2), (2, 2), (3, 2)]);
        assert_eq!(ghost_cells(&state, Edge::Left), vec![(0, 1), (0, 2)]);
    }
}
