//! 2D grid resolution types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of interior cells in each direction.
///
/// # Example
///
/// ```
/// use swe_blocks::types::Resolution2D;
///
/// let res = Resolution2D::new(100, 50);
/// assert_eq!(res.nx(), 100);
/// assert_eq!(res.ny(), 50);
/// assert_eq!(res.total_cells(), 5000);
/// assert_eq!(res.padded_len(), 102 * 52);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution2D {
    nx: usize,
    ny: usize,
}

impl Resolution2D {
    /// Create a new resolution specification.
    ///
    /// # Panics
    ///
    /// Panics if either `nx` or `ny` is zero.
    pub fn new(nx: usize, ny: usize) -> Self {
        assert!(nx > 0, "nx must be positive, got {}", nx);
        assert!(ny > 0, "ny must be positive, got {}", ny);
        Self { nx, ny }
    }

    /// Create a square resolution (same in both directions).
    pub fn square(n: usize) -> Self {
        Self::new(n, n)
    }

    /// Number of cells in x-direction.
    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of cells in y-direction.
    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Total number of interior cells.
    #[inline]
    pub fn total_cells(&self) -> usize {
        self.nx * self.ny
    }

    /// Number of cells including the one-cell ghost layer on every side.
    #[inline]
    pub fn padded_len(&self) -> usize {
        (self.nx + 2) * (self.ny + 2)
    }

    /// Return as tuple (nx, ny).
    #[inline]
    pub fn as_tuple(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }
}

impl fmt::Display for Resolution2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.nx, self.ny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let res = Resolution2D::new(4, 3);
        assert_eq!(res.total_cells(), 12);
        assert_eq!(res.padded_len(), 30);
        assert_eq!(res.as_tuple(), (4, 3));
    }

    #[test]
    #[should_panic(expected = "nx must be positive")]
    fn test_zero_nx() {
        Resolution2D::new(0, 10);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Resolution2D::square(8)), "8×8");
    }
}
