//! Per-cell shallow water state.
//!
//! The conserved variables of the 2D shallow water equations are:
//! - h = water height
//! - hu = discharge in x (h * u)
//! - hv = discharge in y (h * v)

use std::ops::{Add, Mul, Sub};

/// 2D shallow water state: (h, hu, hv).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SWEState2D {
    /// Water height h (non-negative after every valid update)
    pub h: f64,
    /// x-discharge hu = h * u
    pub hu: f64,
    /// y-discharge hv = h * v
    pub hv: f64,
}

impl SWEState2D {
    /// Create a new 2D SWE state.
    #[inline(always)]
    pub fn new(h: f64, hu: f64, hv: f64) -> Self {
        Self { h, hu, hv }
    }

    /// Create a state from primitive variables (h, u, v).
    #[inline(always)]
    pub fn from_primitives(h: f64, u: f64, v: f64) -> Self {
        Self {
            h,
            hu: h * u,
            hv: h * v,
        }
    }

    /// Create a zero state.
    #[inline(always)]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Velocity components, zero for cells below `dry_tol`.
    #[inline(always)]
    pub fn velocity(&self, dry_tol: f64) -> (f64, f64) {
        if self.h > dry_tol {
            let h_inv = 1.0 / self.h;
            (self.hu * h_inv, self.hv * h_inv)
        } else {
            (0.0, 0.0)
        }
    }

    /// Check if this cell is dry.
    #[inline(always)]
    pub fn is_dry(&self, dry_tol: f64) -> bool {
        self.h < dry_tol
    }

    /// Wave celerity c = sqrt(g * h).
    #[inline(always)]
    pub fn celerity(&self, g: f64) -> f64 {
        (g * self.h.max(0.0)).sqrt()
    }

    /// Rotate discharges into the frame of an edge with unit normal (nx, ny).
    ///
    /// Returns (h, h*u_n, h*u_t) with u_n = u*nx + v*ny and
    /// u_t = -u*ny + v*nx.
    #[inline(always)]
    pub fn rotate_to_normal(&self, nx: f64, ny: f64) -> Self {
        Self {
            h: self.h,
            hu: self.hu * nx + self.hv * ny,
            hv: -self.hu * ny + self.hv * nx,
        }
    }

    /// Inverse of [`SWEState2D::rotate_to_normal`].
    #[inline(always)]
    pub fn rotate_from_normal(&self, nx: f64, ny: f64) -> Self {
        Self {
            h: self.h,
            hu: self.hu * nx - self.hv * ny,
            hv: self.hu * ny + self.hv * nx,
        }
    }

    #[inline(always)]
    pub fn is_finite(&self) -> bool {
        self.h.is_finite() && self.hu.is_finite() && self.hv.is_finite()
    }

    /// Convert to array representation [h, hu, hv].
    #[inline(always)]
    pub fn to_array(&self) -> [f64; 3] {
        [self.h, self.hu, self.hv]
    }
}

impl Add for SWEState2D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            h: self.h + other.h,
            hu: self.hu + other.hu,
            hv: self.hv + other.hv,
        }
    }
}

impl Sub for SWEState2D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            h: self.h - other.h,
            hu: self.hu - other.hu,
            hv: self.hv - other.hv,
        }
    }
}

impl Mul<f64> for SWEState2D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self {
        Self {
            h: self.h * scalar,
            hu: self.hu * scalar,
            hv: self.hv * scalar,
        }
    }
}

impl Mul<SWEState2D> for f64 {
    type Output = SWEState2D;

    fn mul(self, state: SWEState2D) -> SWEState2D {
        state * self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_from_primitives() {
        let s = SWEState2D::from_primitives(2.0, 1.5, -0.5);
        assert_eq!(s.hu, 3.0);
        assert_eq!(s.hv, -1.0);
        let (u, v) = s.velocity(1e-6);
        assert!((u - 1.5).abs() < TOL);
        assert!((v + 0.5).abs() < TOL);
    }

    #[test]
    fn test_dry_velocity_is_zero() {
        let s = SWEState2D::new(1e-9, 1e-3, 1e-3);
        assert!(s.is_dry(1e-6));
        assert_eq!(s.velocity(1e-6), (0.0, 0.0));
    }

    #[test]
    fn test_rotation_roundtrip() {
        let s = SWEState2D::new(1.0, 0.3, -0.7);
        let (nx, ny) = (0.6, 0.8);
        let back = s.rotate_to_normal(nx, ny).rotate_from_normal(nx, ny);
        assert!((back.hu - s.hu).abs() < TOL);
        assert!((back.hv - s.hv).abs() < TOL);
    }

    #[test]
    fn test_rotation_to_y_normal() {
        let s = SWEState2D::new(2.0, 1.0, 3.0);
        let r = s.rotate_to_normal(0.0, 1.0);
        assert_eq!(r.hu, 3.0);
        assert_eq!(r.hv, -1.0);
    }

    #[test]
    fn test_arithmetic() {
        let a = SWEState2D::new(1.0, 2.0, 3.0);
        let b = SWEState2D::new(0.5, 0.5, 0.5);
        assert_eq!((a - b).to_array(), [0.5, 1.5, 2.5]);
        assert_eq!((2.0 * (a + b)).to_array(), [3.0, 5.0, 7.0]);
    }
}
