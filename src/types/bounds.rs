//! 2D domain bounds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rectangular extent of a scenario domain or of a single block.
///
/// # Example
///
/// ```
/// use swe_blocks::types::Bounds2D;
///
/// let bounds = Bounds2D::new(-5000.0, 5000.0, -5000.0, 5000.0);
///
/// assert_eq!(bounds.width(), 10000.0);
/// assert_eq!(bounds.center(), (0.0, 0.0));
/// assert!(bounds.contains(4999.0, -4999.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds2D {
    /// Minimum x-coordinate (left edge)
    pub x_min: f64,
    /// Maximum x-coordinate (right edge)
    pub x_max: f64,
    /// Minimum y-coordinate (bottom edge)
    pub y_min: f64,
    /// Maximum y-coordinate (top edge)
    pub y_max: f64,
}

impl Bounds2D {
    /// Create new domain bounds.
    ///
    /// # Panics
    ///
    /// Panics if `x_max <= x_min` or `y_max <= y_min`.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        assert!(
            x_max > x_min,
            "x_max ({}) must be greater than x_min ({})",
            x_max,
            x_min
        );
        assert!(
            y_max > y_min,
            "y_max ({}) must be greater than y_min ({})",
            y_max,
            y_min
        );

        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Fallible constructor for bounds coming from configuration or data files.
    pub fn try_new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Option<Self> {
        let finite = [x_min, x_max, y_min, y_max].iter().all(|v| v.is_finite());
        (finite && x_max > x_min && y_max > y_min).then_some(Self {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    /// Domain width (x_max - x_min).
    #[inline]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Domain height (y_max - y_min).
    #[inline]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Domain center point.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Check if a point is inside the domain (inclusive).
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Check whether `other` lies entirely inside these bounds.
    pub fn encloses(&self, other: &Bounds2D) -> bool {
        self.contains(other.x_min, other.y_min) && self.contains(other.x_max, other.y_max)
    }

    /// Return bounds as tuple (x_min, x_max, y_min, y_max).
    #[inline]
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.x_min, self.x_max, self.y_min, self.y_max)
    }
}

impl fmt::Display for Bounds2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.2}, {:.2}] × [{:.2}, {:.2}]",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let b = Bounds2D::new(0.0, 100.0, 0.0, 50.0);
        assert_eq!(b.width(), 100.0);
        assert_eq!(b.height(), 50.0);
        assert_eq!(b.center(), (50.0, 25.0));
    }

    #[test]
    fn test_contains() {
        let b = Bounds2D::new(0.0, 100.0, 0.0, 50.0);
        assert!(b.contains(50.0, 25.0));
        assert!(b.contains(0.0, 0.0));
        assert!(b.contains(100.0, 50.0));
        assert!(!b.contains(-1.0, 25.0));
        assert!(!b.contains(50.0, 51.0));
    }

    #[test]
    fn test_encloses() {
        let outer = Bounds2D::new(0.0, 100.0, 0.0, 100.0);
        assert!(outer.encloses(&Bounds2D::new(0.0, 50.0, 50.0, 100.0)));
        assert!(!outer.encloses(&Bounds2D::new(50.0, 150.0, 0.0, 10.0)));
    }

    #[test]
    fn test_try_new_rejects_degenerate() {
        assert!(Bounds2D::try_new(0.0, 1.0, 0.0, 1.0).is_some());
        assert!(Bounds2D::try_new(1.0, 1.0, 0.0, 1.0).is_none());
        assert!(Bounds2D::try_new(0.0, f64::NAN, 0.0, 1.0).is_none());
    }

    #[test]
    #[should_panic(expected = "x_max")]
    fn test_invalid_x() {
        Bounds2D::new(10.0, 0.0, 0.0, 1.0);
    }
}
