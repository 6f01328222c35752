//! One block of a decomposed domain.

use crate::boundary::{GhostEdge, GhostLayerManager};
use crate::error::{Result, StepContext};
use crate::scenario::Scenario;
use crate::solver::ComputeBackend;
use crate::state::GridState;
use crate::time::WaveSpeedReport;
use crate::types::{BlockIndex, Edge};

use super::layout::BlockSpec;
use super::snapshot::BlockSnapshot;

/// Update-phase parameters shared by all blocks of a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepUpdate {
    pub dt: f64,
    /// Block time after the step
    pub next_time: f64,
    /// Re-evaluate bathymetry at `next_time` (moving seabed)
    pub refresh_bathymetry: bool,
    pub dry_tolerance: f64,
}

/// Grid state, ghost bookkeeping and compute backend of one block.
///
/// The block exclusively owns its state. Neighbours only ever see copies
/// of its boundary rows through [`grab_ghost_layer`](Self::grab_ghost_layer).
pub struct SweBlock {
    index: BlockIndex,
    state: GridState,
    ghosts: GhostLayerManager,
    backend: Box<dyn ComputeBackend>,
    step: u64,
}

impl SweBlock {
    pub fn new(spec: &BlockSpec, state: GridState, backend: Box<dyn ComputeBackend>, step: u64) -> Self {
        Self {
            index: spec.index,
            state,
            ghosts: GhostLayerManager::new(spec.index, spec.boundaries),
            backend,
            step,
        }
    }

    /// Initialise the block from the scenario at `time`.
    pub fn from_scenario(
        spec: &BlockSpec,
        scenario: &dyn Scenario,
        backend: Box<dyn ComputeBackend>,
        time: f64,
        step: u64,
    ) -> Result<Self> {
        let state = GridState::from_scenario(spec.geometry, scenario, time)?;
        Ok(Self::new(spec, state, backend, step))
    }

    #[inline]
    pub fn index(&self) -> BlockIndex {
        self.index
    }

    #[inline]
    pub fn state(&self) -> &GridState {
        &self.state
    }

    #[inline]
    pub fn ghosts(&self) -> &GhostLayerManager {
        &self.ghosts
    }

    /// Number of steps this block has completed.
    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// State and step counter for a restore; ghosts must be refilled after.
    pub(crate) fn restore_target(&mut self) -> (BlockIndex, &mut GridState) {
        (self.index, &mut self.state)
    }

    pub(crate) fn set_step(&mut self, step: u64) {
        self.step = step;
    }

    /// Fill WALL and OUTFLOW ghost cells for the current step.
    pub fn fill_local_ghosts(&mut self) {
        self.ghosts.fill_local(&mut self.state, self.step);
    }

    /// Copy of the interior cells along `edge`.
    pub fn grab_ghost_layer(&self, edge: Edge) -> GhostEdge {
        self.ghosts.grab_ghost_layer(&self.state, edge, self.step)
    }

    /// Populate a CONNECT or PASSIVE ghost edge for the current step.
    pub fn set_ghost_layer(&mut self, edge: Edge, snapshot: &GhostEdge) -> Result<()> {
        self.ghosts.set_ghost_layer(&mut self.state, edge, snapshot, self.step)
    }

    /// Flux phase: fails unless every ghost edge holds current data.
    pub fn compute_net_updates(&mut self) -> Result<WaveSpeedReport> {
        self.ghosts.ensure_ready(self.step)?;
        let ctx = StepContext::new(self.index, self.step);
        self.backend.compute_net_updates(&self.state, &ctx)
    }

    /// Net volume flux out of the block from the last flux phase.
    pub fn boundary_mass_flux(&self) -> Result<f64> {
        self.backend.boundary_mass_flux(&self.state)
    }

    /// Update phase: apply net updates and forcing, advance the clock.
    pub fn update(&mut self, update: &StepUpdate, scenario: &dyn Scenario) -> Result<()> {
        let ctx = StepContext::new(self.index, self.step);
        let t = self.state.time;
        self.backend.apply_updates(&mut self.state, update.dt, &ctx)?;
        if scenario.has_source_term() {
            self.state.apply_source_term(scenario, t, update.dt)?;
        }
        self.state.time = update.next_time;
        if update.refresh_bathymetry {
            self.state.refresh_bathymetry(scenario, update.next_time)?;
        }
        self.state.finalize_update(update.dry_tolerance, &ctx)?;
        self.step += 1;
        Ok(())
    }

    pub fn snapshot(&self) -> BlockSnapshot {
        BlockSnapshot::capture(&self.state, self.index, self.step)
    }
}

impl std::fmt::Debug for SweBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweBlock")
            .field("index", &self.index)
            .field("step", &self.step)
            .field("time", &self.state.time)
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryType;
    use crate::error::SweError;
    use crate::flux::FluxParams;
    use crate::scenario::DamBreakScenario;
    use crate::solver::HostBackend;
    use crate::state::{BlockGeometry, SWEState2D};
    use crate::types::EdgeMap;

    fn block(boundaries: EdgeMap<BoundaryType>) -> SweBlock {
        let spec = BlockSpec {
            index: BlockIndex::new(0, 0),
            geometry: BlockGeometry::new(10, 10, 10.0, 10.0, 0.0, 0.0),
            boundaries,
        };
        let backend = Box::new(HostBackend::new(&spec.geometry, FluxParams::default()));
        SweBlock::from_scenario(&spec, &DamBreakScenario::standard(), backend, 0.0, 0).unwrap()
    }

    #[test]
    fn test_flux_phase_requires_ghosts() {
        let mut b = block(EdgeMap::uniform(BoundaryType::Wall));
        let err = b.compute_net_updates().unwrap_err();
        assert!(matches!(err, SweError::GhostLayerNotReady { step: 0, .. }));
        b.fill_local_ghosts();
        assert!(b.compute_net_updates().is_ok());
    }

    #[test]
    fn test_passive_edge_needs_snapshot() {
        let mut b = block(EdgeMap::new(
            BoundaryType::Passive,
            BoundaryType::Wall,
            BoundaryType::Wall,
            BoundaryType::Wall,
        ));
        b.fill_local_ghosts();
        assert!(matches!(
            b.compute_net_updates(),
            Err(SweError::GhostLayerNotReady { edge: Edge::Left, .. })
        ));
        let inflow = GhostEdge::uniform(BlockIndex::new(9, 9), Edge::Right, 0, 10, SWEState2D::new(10.0, 0.0, 0.0), 0.0);
        b.set_ghost_layer(Edge::Left, &inflow).unwrap();
        assert!(b.compute_net_updates().is_ok());
    }

    #[test]
    fn test_update_advances_clock_and_step() {
        let mut b = block(EdgeMap::uniform(BoundaryType::Wall));
        b.fill_local_ghosts();
        let report = b.compute_net_updates().unwrap();
        let dt = report.stable_dt(0.4).unwrap();
        let update = StepUpdate {
            dt,
            next_time: dt,
            refresh_bathymetry: false,
            dry_tolerance: 0.01,
        };
        let mass = b.state().total_mass();
        b.update(&update, &DamBreakScenario::standard()).unwrap();
        assert_eq!(b.step(), 1);
        assert_eq!(b.state().time, dt);
        assert!((b.state().total_mass() - mass).abs() < 1e-9 * mass);
        // ghosts are stale for step 1
        assert!(b.compute_net_updates().is_err());
    }
}
