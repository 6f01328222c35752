//! Edge net-update buffers for a whole block.
//!
//! Edge layout, for a block with `nx × ny` interior cells:
//! - x-edge `e ∈ 0..=nx` in row `j ∈ 1..=ny` lies between cells `(e, j)`
//!   and `(e + 1, j)`; edges 0 and nx touch the ghost layer.
//! - y-edge `e ∈ 0..=ny` in column `i ∈ 1..=nx` lies between cells
//!   `(i, e)` and `(i, e + 1)`.
//!
//! Cell `(i, j)` is updated by
//!
//! ```text
//! Q -= dt/dx (R[i-1, j] + L[i, j]) + dt/dy (A[i, j-1] + B[i, j])
//! ```
//!
//! with L/R the left/right-going updates of x-edges and B/A the
//! below/above-going updates of y-edges.

use crate::error::{Location, Result, StepContext};
use crate::state::{GridState, SWEState2D};
use crate::time::WaveSpeedReport;
use crate::types::EdgeIndex;

use super::FluxParams;
use super::fwave::fwave_2d;

/// Net updates for every edge of one block.
#[derive(Clone, Debug)]
pub struct NetUpdates {
    nx: usize,
    ny: usize,
    x_left: Vec<SWEState2D>,
    x_right: Vec<SWEState2D>,
    y_below: Vec<SWEState2D>,
    y_above: Vec<SWEState2D>,
}

impl NetUpdates {
    /// Allocate zeroed buffers for an `nx × ny` block.
    pub fn new(nx: usize, ny: usize) -> Self {
        let n_x_edges = (nx + 1) * ny;
        let n_y_edges = nx * (ny + 1);
        Self {
            nx,
            ny,
            x_left: vec![SWEState2D::zero(); n_x_edges],
            x_right: vec![SWEState2D::zero(); n_x_edges],
            y_below: vec![SWEState2D::zero(); n_y_edges],
            y_above: vec![SWEState2D::zero(); n_y_edges],
        }
    }

    #[inline(always)]
    fn x_idx(&self, e: usize, j: usize) -> usize {
        (j - 1) * (self.nx + 1) + e
    }

    #[inline(always)]
    fn y_idx(&self, i: usize, e: usize) -> usize {
        e * self.nx + (i - 1)
    }

    /// Left- and right-going updates of x-edge `e` in row `j`.
    pub fn x_edge(&self, e: usize, j: usize) -> (SWEState2D, SWEState2D) {
        let k = self.x_idx(e, j);
        (self.x_left[k], self.x_right[k])
    }

    /// Below- and above-going updates of y-edge `e` in column `i`.
    pub fn y_edge(&self, i: usize, e: usize) -> (SWEState2D, SWEState2D) {
        let k = self.y_idx(i, e);
        (self.y_below[k], self.y_above[k])
    }

    /// Solve every edge Riemann problem of `state`.
    ///
    /// Ghost cells must be populated. Returns the largest wave speed and
    /// fails on the first edge with a non-finite speed.
    pub fn compute(
        &mut self,
        state: &GridState,
        params: &FluxParams,
        ctx: &StepContext,
    ) -> Result<WaveSpeedReport> {
        debug_assert_eq!((state.nx(), state.ny()), (self.nx, self.ny));
        let (nx, ny) = (self.nx, self.ny);
        let mut max_speed: f64 = 0.0;
        let mut location = None;

        for j in 1..=ny {
            for e in 0..=nx {
                let up = fwave_2d(
                    &state.cell(e, j),
                    &state.cell(e + 1, j),
                    state.b[(e, j)],
                    state.b[(e + 1, j)],
                    (1.0, 0.0),
                    params.g,
                    params.dry_tolerance,
                );
                let edge = EdgeIndex::X { e, j };
                if !up.max_speed.is_finite() {
                    return Err(ctx.instability(
                        Location::Edge(edge),
                        format!("non-finite wave speed {}", up.max_speed),
                    ));
                }
                if up.max_speed > max_speed {
                    max_speed = up.max_speed;
                    location = Some(edge);
                }
                let k = self.x_idx(e, j);
                self.x_left[k] = up.left;
                self.x_right[k] = up.right;
            }
        }

        for e in 0..=ny {
            for i in 1..=nx {
                let up = fwave_2d(
                    &state.cell(i, e),
                    &state.cell(i, e + 1),
                    state.b[(i, e)],
                    state.b[(i, e + 1)],
                    (0.0, 1.0),
                    params.g,
                    params.dry_tolerance,
                );
                let edge = EdgeIndex::Y { i, e };
                if !up.max_speed.is_finite() {
                    return Err(ctx.instability(
                        Location::Edge(edge),
                        format!("non-finite wave speed {}", up.max_speed),
                    ));
                }
                if up.max_speed > max_speed {
                    max_speed = up.max_speed;
                    location = Some(edge);
                }
                let k = self.y_idx(i, e);
                self.y_below[k] = up.left;
                self.y_above[k] = up.right;
            }
        }

        Ok(WaveSpeedReport {
            block: ctx.block,
            max_speed,
            min_spacing: state.geometry().min_spacing(),
            location,
        })
    }

    /// Apply the stored updates to the interior cells of `state`.
    pub fn apply(&self, state: &mut GridState, dt: f64) {
        let lambda_x = dt / state.dx();
        let lambda_y = dt / state.dy();

        for j in 1..=self.ny {
            for i in 1..=self.nx {
                let from_x = self.x_right[self.x_idx(i - 1, j)] + self.x_left[self.x_idx(i, j)];
                let from_y = self.y_above[self.y_idx(i, j - 1)] + self.y_below[self.y_idx(i, j)];
                let q = state.cell(i, j) - lambda_x * from_x - lambda_y * from_y;
                state.set_cell(i, j, q);
            }
        }
    }

    /// Net volume flux (m³/s) leaving the block through its four edges.
    ///
    /// With `M = Σ h dx dy` over interior cells, one update changes M by
    /// exactly `-dt * boundary_mass_flux`.
    pub fn boundary_mass_flux(&self, state: &GridState) -> f64 {
        let (nx, ny) = (self.nx, self.ny);
        let mut out_x = 0.0;
        for j in 1..=ny {
            // Edge flux written from the interior side of each boundary edge
            let flux_right = state.hu[(nx, j)] + self.x_left[self.x_idx(nx, j)].h;
            let flux_left = state.hu[(1, j)] - self.x_right[self.x_idx(0, j)].h;
            out_x += flux_right - flux_left;
        }
        let mut out_y = 0.0;
        for i in 1..=nx {
            let flux_top = state.hv[(i, ny)] + self.y_below[self.y_idx(i, ny)].h;
            let flux_bottom = state.hv[(i, 1)] - self.y_above[self.y_idx(i, 0)].h;
            out_y += flux_top - flux_bottom;
        }
        out_x * state.dy() + out_y * state.dx()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BlockGeometry;

    fn params() -> FluxParams {
        FluxParams::new(9.81, 1e-3)
    }

    /// 3×3 block whose ghost cells copy the interior (zero gradient).
    fn state_with(h: [f64; 9], hu: [f64; 9], hv: [f64; 9]) -> GridState {
        let mut state = GridState::new(BlockGeometry::new(3, 3, 1.0, 2.0, 0.0, 0.0));
        state.h.set_interior(&h);
        state.hu.set_interior(&hu);
        state.hv.set_interior(&hv);
        for field in [&mut state.h, &mut state.hu, &mut state.hv] {
            for k in 1..=3 {
                field[(0, k)] = field[(1, k)];
                field[(4, k)] = field[(3, k)];
                field[(k, 0)] = field[(k, 1)];
                field[(k, 4)] = field[(k, 3)];
            }
        }
        state
    }

    #[test]
    fn test_uniform_state_is_stationary() {
        let mut state = state_with([2.0; 9], [0.5; 9], [-0.25; 9]);
        let mut updates = NetUpdates::new(3, 3);
        let report = updates.compute(&state, &params(), &StepContext::default()).unwrap();
        assert!(report.max_speed > 0.0);
        updates.apply(&mut state, 0.01);
        for (_, _, h) in state.h.interior_iter() {
            assert!((h - 2.0).abs() < 1e-12);
        }
        for (_, _, hu) in state.hu.interior_iter() {
            assert!((hu - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_mass_change_equals_boundary_flux() {
        let h = [1.0, 1.5, 2.0, 1.2, 1.7, 2.2, 0.9, 1.1, 1.3];
        let hu = [0.1, -0.2, 0.3, 0.0, 0.4, -0.1, 0.2, 0.2, -0.3];
        let hv = [0.0, 0.1, -0.1, 0.3, -0.2, 0.1, 0.0, 0.05, 0.1];
        let mut state = state_with(h, hu, hv);
        let mut updates = NetUpdates::new(3, 3);
        updates.compute(&state, &params(), &StepContext::default()).unwrap();

        let dt = 0.05;
        let mass_before = state.total_mass();
        let outflow = updates.boundary_mass_flux(&state);
        updates.apply(&mut state, dt);
        let mass_after = state.total_mass();

        assert!((mass_after - (mass_before - dt * outflow)).abs() < 1e-12);
    }

    #[test]
    fn test_nan_reports_edge() {
        let mut h = [1.0; 9];
        h[4] = f64::NAN;
        let state = state_with(h, [0.0; 9], [0.0; 9]);
        let mut updates = NetUpdates::new(3, 3);
        let err = updates
            .compute(&state, &params(), &StepContext::default())
            .unwrap_err();
        assert!(err.is_numerical_instability());
        assert!(err.to_string().contains("edge"));
    }
}
