//! Strongly-typed index types for blocks, cells and edges.
//!
//! These types prevent mixing up block positions with cell indices, and
//! cell indices with the edges between cells.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a block in the block decomposition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockIndex {
    /// Column of the block (0 = leftmost)
    pub x: usize,
    /// Row of the block (0 = bottom)
    pub y: usize,
}

impl BlockIndex {
    /// Create a new block index.
    #[inline]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for BlockIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Index of a cell in the ghost-padded grid.
///
/// Interior cells run from 1 to n; 0 and n+1 are ghost cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    pub i: usize,
    pub j: usize,
}

impl CellIndex {
    #[inline]
    pub const fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell [{}, {}]", self.i, self.j)
    }
}

/// Index of an edge between two cells.
///
/// An x-edge `e` separates cells `(e, j)` and `(e + 1, j)`; a y-edge
/// separates `(i, e)` and `(i, e + 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeIndex {
    X { e: usize, j: usize },
    Y { i: usize, e: usize },
}

impl fmt::Display for EdgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeIndex::X { e, j } => write!(f, "x-edge between [{}, {}] and [{}, {}]", e, j, e + 1, j),
            EdgeIndex::Y { i, e } => write!(f, "y-edge between [{}, {}] and [{}, {}]", i, e, i, e + 1),
        }
    }
}
