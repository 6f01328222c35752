//! Host-memory backend.

use crate::error::{Result, StepContext};
use crate::flux::{FluxParams, NetUpdates};
use crate::state::{BlockGeometry, GridState};
use crate::time::WaveSpeedReport;

use super::backend::ComputeBackend;

/// Runs the f-wave solver cell by cell on the CPU.
#[derive(Clone, Debug)]
pub struct HostBackend {
    params: FluxParams,
    updates: NetUpdates,
}

impl HostBackend {
    pub fn new(geometry: &BlockGeometry, params: FluxParams) -> Self {
        Self {
            params,
            updates: NetUpdates::new(geometry.nx, geometry.ny),
        }
    }

    pub fn net_updates(&self) -> &NetUpdates {
        &self.updates
    }
}

impl ComputeBackend for HostBackend {
    fn name(&self) -> &'static str {
        "host"
    }

    fn compute_net_updates(&mut self, state: &GridState, ctx: &StepContext) -> Result<WaveSpeedReport> {
        self.updates.compute(state, &self.params, ctx)
    }

    fn apply_updates(&mut self, state: &mut GridState, dt: f64, _ctx: &StepContext) -> Result<()> {
        self.updates.apply(state, dt);
        Ok(())
    }

    fn boundary_mass_flux(&self, state: &GridState) -> Result<f64> {
        Ok(self.updates.boundary_mass_flux(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Field2D, SWEState2D};
    use crate::types::BlockIndex;

    #[test]
    fn test_mass_change_matches_boundary_flux() {
        let geometry = BlockGeometry::new(6, 5, 2.0, 1.5, 0.0, 0.0);
        let mut state = GridState::new(geometry);
        state.h = Field2D::filled(6, 5, 3.0);
        for j in 0..=6 {
            for i in 0..=7 {
                state.set_cell(i, j, SWEState2D::new(3.0 + 0.1 * i as f64, 0.2 * j as f64, -0.1 * i as f64));
            }
        }
        let mut backend = HostBackend::new(&geometry, FluxParams::default());
        let ctx = StepContext::new(BlockIndex::new(0, 0), 0);
        let report = backend.compute_net_updates(&state, &ctx).unwrap();
        let dt = report.stable_dt(0.4).unwrap();

        let before = state.total_mass();
        let flux = backend.boundary_mass_flux(&state).unwrap();
        backend.apply_updates(&mut state, dt, &ctx).unwrap();
        let after = state.total_mass();
        assert!((after - before + dt * flux).abs() < 1e-9 * before);
    }
}
