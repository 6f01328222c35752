//! Block edges and per-edge values with named fields.
//!
//! Avoids array index conventions like `[left, right, bottom, top]` by
//! naming every edge of a rectangular block explicitly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four edges of a rectangular block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// x = x_min
    Left,
    /// x = x_max
    Right,
    /// y = y_min
    Bottom,
    /// y = y_max
    Top,
}

impl Edge {
    /// All edges in canonical order: left, right, bottom, top.
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];

    /// The edge a neighbouring block sees across this one.
    #[inline]
    pub fn opposite(self) -> Edge {
        match self {
            Edge::Left => Edge::Right,
            Edge::Right => Edge::Left,
            Edge::Bottom => Edge::Top,
            Edge::Top => Edge::Bottom,
        }
    }

    /// Outward unit normal of this edge.
    #[inline]
    pub fn outward_normal(self) -> (f64, f64) {
        match self {
            Edge::Left => (-1.0, 0.0),
            Edge::Right => (1.0, 0.0),
            Edge::Bottom => (0.0, -1.0),
            Edge::Top => (0.0, 1.0),
        }
    }

    /// True for the edges normal to the x-axis.
    #[inline]
    pub fn is_vertical(self) -> bool {
        matches!(self, Edge::Left | Edge::Right)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Edge::Left => "left",
            Edge::Right => "right",
            Edge::Bottom => "bottom",
            Edge::Top => "top",
        };
        f.write_str(name)
    }
}

/// A value attached to each edge of a block.
///
/// # Example
///
/// ```
/// use swe_blocks::types::{Edge, EdgeMap};
///
/// let kinds = EdgeMap::new("wall", "outflow", "wall", "wall");
/// assert_eq!(kinds[Edge::Right], "outflow");
/// assert_eq!(kinds.left, "wall");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMap<T> {
    /// Left edge (x = x_min)
    pub left: T,
    /// Right edge (x = x_max)
    pub right: T,
    /// Bottom edge (y = y_min)
    pub bottom: T,
    /// Top edge (y = y_max)
    pub top: T,
}

impl<T> EdgeMap<T> {
    /// Create a map with explicit named values.
    ///
    /// Order: left, right, bottom, top.
    pub fn new(left: T, right: T, bottom: T, top: T) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }

    /// Create with the same value on all edges.
    pub fn uniform(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            left: value.clone(),
            right: value.clone(),
            bottom: value.clone(),
            top: value,
        }
    }

    /// Build a map by evaluating `f` for every edge.
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Edge) -> T,
    {
        Self {
            left: f(Edge::Left),
            right: f(Edge::Right),
            bottom: f(Edge::Bottom),
            top: f(Edge::Top),
        }
    }

    /// Map a function over all edges.
    pub fn map<U, F>(self, mut f: F) -> EdgeMap<U>
    where
        F: FnMut(T) -> U,
    {
        EdgeMap {
            left: f(self.left),
            right: f(self.right),
            bottom: f(self.bottom),
            top: f(self.top),
        }
    }

    /// Iterate over `(edge, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Edge, &T)> {
        Edge::ALL.into_iter().map(move |edge| (edge, &self[edge]))
    }
}

impl<T: Default> Default for EdgeMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> std::ops::Index<Edge> for EdgeMap<T> {
    type Output = T;

    fn index(&self, edge: Edge) -> &T {
        match edge {
            Edge::Left => &self.left,
            Edge::Right => &self.right,
            Edge::Bottom => &self.bottom,
            Edge::Top => &self.top,
        }
    }
}

impl<T> std::ops::IndexMut<Edge> for EdgeMap<T> {
    fn index_mut(&mut self, edge: Edge) -> &mut T {
        match edge {
            Edge::Left => &mut self.left,
            Edge::Right => &mut self.right,
            Edge::Bottom => &mut self.bottom,
            Edge::Top => &mut self.top,
        }
    }
}

impl<T: fmt::Display> fmt::Display for EdgeMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L:{} R:{} B:{} T:{}",
            self.left, self.right, self.bottom, self.top
        )
    }
}
