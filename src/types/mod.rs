//! Strongly-typed domain types for safer APIs.
//!
//! - **Named fields over positional**: `EdgeMap { left, right, bottom, top }`
//! - **Distinct index types**: a [`BlockIndex`] can't be passed where a
//!   [`CellIndex`] is expected
//!
//! # Example
//!
//! ```
//! use swe_blocks::types::{Bounds2D, Edge, EdgeMap, Resolution2D};
//!
//! let bounds = Bounds2D::new(0.0, 100.0, 0.0, 100.0);
//! let res = Resolution2D::square(100);
//! assert_eq!(bounds.width() / res.nx() as f64, 1.0);
//!
//! let open = EdgeMap::from_fn(|edge| edge == Edge::Right);
//! assert!(open.right && !open.left);
//! ```

mod bounds;
mod indices;
mod resolution;
mod sides;

pub use bounds::Bounds2D;
pub use indices::{BlockIndex, CellIndex, EdgeIndex};
pub use resolution::Resolution2D;
pub use sides::{Edge, EdgeMap};
