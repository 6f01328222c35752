//! Block grid state.
//!
//! A block stores `h`, `hu`, `hv` and `b` on `(nx + 2) × (ny + 2)` cells:
//! the interior plus a one-cell ghost border filled by the
//! [boundary manager](crate::boundary) before every flux computation.

mod cell;
mod field;
mod grid;

pub use cell::SWEState2D;
pub use field::Field2D;
pub use grid::{BlockGeometry, GridState, NEGATIVE_HEIGHT_TOLERANCE};
