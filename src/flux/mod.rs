//! Numerical fluxes for the finite volume update.
//!
//! - [`fwave_2d`]: well-balanced f-wave Riemann solver for one edge
//! - [`NetUpdates`]: per-edge net updates of a whole block, applied to the
//!   cells as the negative flux divergence

mod fwave;
mod net_updates;

use serde::{Deserialize, Serialize};

pub use fwave::{FWaveUpdates, fwave_2d, fwave_normal};
pub use net_updates::NetUpdates;

/// Physical parameters of the Riemann solver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluxParams {
    /// Gravitational acceleration
    pub g: f64,
    /// Cells with height below this are treated as dry
    pub dry_tolerance: f64,
}

impl FluxParams {
    pub fn new(g: f64, dry_tolerance: f64) -> Self {
        Self { g, dry_tolerance }
    }
}

impl Default for FluxParams {
    fn default() -> Self {
        Self {
            g: 9.81,
            dry_tolerance: 0.01,
        }
    }
}
