//! Simulation runner implementation.
//!
//! Drives all blocks of a run in lock step with two barriers per step:
//! after the flux phase (global timestep reduction) and after the update
//! phase (ghost-layer exchange).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::boundary::{BoundaryType, GhostEdge};
use crate::checkpoint::{Checkpoint, CheckpointManager};
use crate::error::{Result, SweError};
use crate::flux::FluxParams;
use crate::scenario::Scenario;
use crate::solver::create_backend;
use crate::time::{DtLimit, Timestep, TimestepController, WaveSpeedReport};
use crate::types::{BlockIndex, Edge, EdgeMap};

use super::block::{StepUpdate, SweBlock};
use super::config::SimulationConfig;
use super::layout::BlockLayout;
use super::snapshot::{BlockSnapshot, SnapshotObserver};

// =============================================================================
// Simulation Result
// =============================================================================

/// Why a run returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The end time was reached.
    EndTime,
    /// The cancellation flag was raised between steps.
    Cancelled,
    /// The configured step limit was hit.
    MaxSteps,
}

/// Summary of one completed step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    /// Global step counter after the step
    pub step: u64,
    /// Simulation time after the step
    pub time: f64,
    pub timestep: Timestep,
    /// Net volume flux out of the domain during the step, when tracked
    pub boundary_mass_flux: Option<f64>,
    /// Sequence number of a checkpoint written after the step
    pub checkpoint: Option<u64>,
}

/// Result of a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    /// Final simulation time reached.
    pub final_time: f64,
    /// Number of time steps taken by this run.
    pub n_steps: u64,
    /// Minimum time step used.
    pub dt_min: f64,
    /// Maximum time step used.
    pub dt_max: f64,
    /// Total wall-clock time in seconds.
    pub wall_time: f64,
    pub stop: StopReason,
}

impl SimulationResult {
    /// True when the run reached its end time.
    pub fn completed(&self) -> bool {
        self.stop == StopReason::EndTime
    }
}

// =============================================================================
// Simulation Runner
// =============================================================================

/// Block-decomposed shallow water simulation.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use swe_blocks::scenario::DamBreakScenario;
/// use swe_blocks::simulation::{Simulation, SimulationConfig};
///
/// let config = SimulationConfig::default()
///     .with_resolution(20, 20)
///     .with_blocks(2, 2)
///     .with_end_time(1.0);
/// let mut sim = Simulation::new(Arc::new(DamBreakScenario::standard()), config).unwrap();
/// let result = sim.run().unwrap();
/// assert!(result.completed());
/// assert!((sim.time() - 1.0).abs() < 1e-12);
/// ```
pub struct Simulation {
    scenario: Arc<dyn Scenario>,
    config: SimulationConfig,
    layout: BlockLayout,
    blocks: Vec<SweBlock>,
    controller: TimestepController,
    checkpoints: Option<CheckpointManager>,
    time: f64,
    step: u64,
    cancel: Arc<AtomicBool>,
}

impl Simulation {
    /// Uniform block layout over the scenario extent (or the configured
    /// sub-extent), outer edges typed by the scenario.
    pub fn new(scenario: Arc<dyn Scenario>, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let domain = scenario.boundary_extent();
        let extent = match config.extent {
            Some(extent) if !domain.encloses(&extent) => {
                return Err(SweError::InvalidConfig(format!(
                    "extent {} lies outside the {} scenario domain {}",
                    extent,
                    scenario.name(),
                    domain
                )));
            }
            Some(extent) => extent,
            None => domain,
        };
        let outer = EdgeMap::from_fn(|edge| scenario.boundary_type(edge));
        let layout = BlockLayout::uniform(extent, config.resolution, config.blocks_x, config.blocks_y, outer)?;
        Self::with_layout(scenario, config, layout)
    }

    /// Run on an explicit layout. The configured resolution, extent and
    /// block counts are ignored.
    ///
    /// A scenario with a [resume point](Scenario::resume_point) starts the
    /// clock and the step counter there.
    pub fn with_layout(scenario: Arc<dyn Scenario>, config: SimulationConfig, layout: BlockLayout) -> Result<Self> {
        config.validate()?;
        let resume = scenario.resume_point();
        let (time, step) = resume.map_or((0.0, 0), |point| (point.time, point.step));
        let params = FluxParams::new(config.g, config.dry_tolerance);

        let blocks = layout
            .blocks()
            .iter()
            .map(|spec| {
                let backend = create_backend(config.backend, &spec.geometry, params)?;
                SweBlock::from_scenario(spec, &*scenario, backend, time, step)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut controller = TimestepController::new(config.cfl, config.max_dt);
        if let Some(min_dt) = config.min_dt {
            controller = controller.with_min_dt(min_dt);
        }

        let checkpoints = match &config.checkpoint_path {
            Some(path) => {
                let mut manager = CheckpointManager::new(path, config.checkpoint_schedule);
                if let Some(keep) = config.checkpoint_retain {
                    manager = manager.with_retention(keep);
                }
                manager.continue_numbering()?;
                match resume {
                    Some(point) => manager.resume_from(point),
                    None => manager.start(time),
                }
                Some(manager)
            }
            None => None,
        };

        let mut sim = Self {
            scenario,
            config,
            layout,
            blocks,
            controller,
            checkpoints,
            time,
            step,
            cancel: Arc::new(AtomicBool::new(false)),
        };
        sim.exchange_ghost_layers()?;

        info!(
            "Initialised {} scenario: {} blocks ({}x{}), {} cells, t = {:.4}s, backend {}",
            sim.scenario.name(),
            sim.layout.len(),
            sim.layout.blocks_x(),
            sim.layout.blocks_y(),
            sim.layout.total_cells(),
            sim.time,
            sim.config.backend
        );
        Ok(sim)
    }

    /// Replace the state of every block with the latest complete
    /// checkpoint in the configured file.
    ///
    /// Bathymetry is re-evaluated from the scenario at the checkpoint time,
    /// so with the scenario of the original run the restart is exact.
    pub fn restore_latest_checkpoint(&mut self) -> Result<Checkpoint> {
        let manager = self
            .checkpoints
            .as_mut()
            .ok_or_else(|| SweError::InvalidConfig("no checkpoint file configured".into()))?;
        let checkpoint = manager.restore_into(
            self.blocks.iter_mut().map(|block| block.restore_target()),
            &*self.scenario,
        )?;
        self.time = checkpoint.time;
        self.step = checkpoint.step;
        for block in &mut self.blocks {
            block.set_step(checkpoint.step);
        }
        self.exchange_ghost_layers()?;
        info!(
            "Restored checkpoint {} (t = {:.4}s, step {})",
            checkpoint.sequence, checkpoint.time, checkpoint.step
        );
        Ok(checkpoint)
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Global step counter.
    #[inline]
    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Configured end time, else the scenario's.
    pub fn end_time(&self) -> f64 {
        self.config.end_time.unwrap_or_else(|| self.scenario.end_time())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn scenario(&self) -> &dyn Scenario {
        &*self.scenario
    }

    pub fn blocks(&self) -> &[SweBlock] {
        &self.blocks
    }

    pub fn block(&self, index: BlockIndex) -> Option<&SweBlock> {
        self.layout.position(index).map(|k| &self.blocks[k])
    }

    pub fn checkpoints(&self) -> Option<&CheckpointManager> {
        self.checkpoints.as_ref()
    }

    /// Flag that stops [`run`](Self::run) before the next step.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Total water volume over all blocks.
    pub fn total_mass(&self) -> f64 {
        self.blocks.iter().map(|block| block.state().total_mass()).sum()
    }

    /// Read-only copies of every block.
    pub fn snapshots(&self) -> impl Iterator<Item = BlockSnapshot> + '_ {
        self.blocks.iter().map(SweBlock::snapshot)
    }

    /// Hand every block snapshot to `observer`.
    pub fn observe(&self, observer: &mut dyn SnapshotObserver) -> Result<()> {
        for snapshot in self.snapshots() {
            observer.observe(&snapshot)?;
        }
        Ok(())
    }

    /// Interior cells along `edge` of `block` for an external coupling harness.
    pub fn grab_ghost_layer(&self, block: BlockIndex, edge: Edge) -> Result<GhostEdge> {
        let block = self.block(block).ok_or_else(|| unknown_block(block))?;
        Ok(block.grab_ghost_layer(edge))
    }

    /// Supply the ghost layer of a PASSIVE edge for the current step.
    pub fn set_passive_ghost_layer(&mut self, block: BlockIndex, edge: Edge, snapshot: &GhostEdge) -> Result<()> {
        let k = self.layout.position(block).ok_or_else(|| unknown_block(block))?;
        let target = &mut self.blocks[k];
        if target.ghosts().kind(edge) != BoundaryType::Passive {
            return Err(SweError::GhostLayerMismatch {
                block,
                edge,
                reason: format!("edge is {}, not passive", target.ghosts().kind(edge)),
            });
        }
        target.set_ghost_layer(edge, snapshot)
    }

    /// Advance every block by one global timestep towards [`end_time`](Self::end_time).
    pub fn step(&mut self) -> Result<StepReport> {
        let end_time = self.end_time();
        if self.time >= end_time {
            return Err(SweError::InvalidConfig(format!(
                "simulation already reached its end time {:.4}s",
                end_time
            )));
        }
        self.step_until(end_time)
    }

    fn step_until(&mut self, end_time: f64) -> Result<StepReport> {
        let scenario = Arc::clone(&self.scenario);
        let scenario = &*scenario;

        // Flux phase, then barrier for the global reduction
        let reports: Vec<WaveSpeedReport> = for_each_block(&mut self.blocks, |block| block.compute_net_updates())?;
        let mut timestep = self.controller.select(&reports, self.step)?;

        let mut landing = None;
        let schedule = scenario
            .displacement_schedule()
            .filter(|schedule| self.time < schedule.end_time);
        if let Some(schedule) = schedule {
            timestep = timestep.clamp(schedule.max_dt, DtLimit::Displacement);
            let remaining = schedule.end_time - self.time;
            if remaining <= timestep.dt {
                timestep = timestep.clamp(remaining, DtLimit::Displacement);
                landing = Some(schedule.end_time);
            }
        }
        let remaining = end_time - self.time;
        if remaining <= timestep.dt {
            timestep = timestep.clamp(remaining, DtLimit::EndTime);
            landing = Some(end_time);
        }

        let boundary_mass_flux = if self.config.track_boundary_flux {
            let mut total = 0.0;
            for block in &self.blocks {
                total += block.boundary_mass_flux()?;
            }
            Some(total)
        } else {
            None
        };

        // Update phase
        let update = StepUpdate {
            dt: timestep.dt,
            next_time: landing.unwrap_or(self.time + timestep.dt),
            refresh_bathymetry: schedule.is_some(),
            dry_tolerance: self.config.dry_tolerance,
        };
        for_each_block(&mut self.blocks, |block| block.update(&update, scenario))?;
        self.time = update.next_time;
        self.step += 1;

        // Barrier: every interior is at the new step before ghosts are read
        self.exchange_ghost_layers()?;

        debug!(
            "Step {}: t = {:.6}s, dt = {:.4e} ({:?}), max wave speed {:.4}",
            self.step, self.time, timestep.dt, timestep.limited_by, timestep.max_wave_speed
        );

        let mut checkpoint = None;
        if let Some(manager) = self.checkpoints.as_mut()
            && manager.poll(self.time)
        {
            let blocks = self.blocks.iter().map(|block| (block.index(), block.state()));
            checkpoint = Some(manager.write(blocks, self.step, scenario)?);
        }

        Ok(StepReport {
            step: self.step,
            time: self.time,
            timestep,
            boundary_mass_flux,
            checkpoint,
        })
    }

    /// Fill every ghost layer for the current step: CONNECT edges from
    /// copies of the neighbour's interior, WALL and OUTFLOW locally.
    /// PASSIVE edges are left for the external driver.
    fn exchange_ghost_layers(&mut self) -> Result<()> {
        let mut transfers = Vec::new();
        for (k, block) in self.blocks.iter().enumerate() {
            for edge in block.ghosts().connected_edges() {
                let neighbor = self
                    .layout
                    .neighbor(block.index(), edge)
                    .and_then(|index| self.layout.position(index))
                    .ok_or_else(|| {
                        SweError::InvalidConfig(format!(
                            "{} edge of block {} has no neighbour to connect to",
                            edge,
                            block.index()
                        ))
                    })?;
                transfers.push((k, edge, self.blocks[neighbor].grab_ghost_layer(edge.opposite())));
            }
        }
        for (k, edge, snapshot) in &transfers {
            self.blocks[*k].set_ghost_layer(*edge, snapshot)?;
        }
        for_each_block(&mut self.blocks, |block| {
            block.fill_local_ghosts();
            Ok(())
        })?;
        debug!("Exchanged {} ghost layers for step {}", transfers.len(), self.step);
        Ok(())
    }

    /// Run to [`end_time`](Self::end_time).
    pub fn run(&mut self) -> Result<SimulationResult> {
        let end_time = self.end_time();
        self.run_until(end_time, |_, _| {})
    }

    /// Run to [`end_time`](Self::end_time), calling `callback` after every step.
    pub fn run_with_callback<F>(&mut self, callback: F) -> Result<SimulationResult>
    where
        F: FnMut(&Simulation, &StepReport),
    {
        let end_time = self.end_time();
        self.run_until(end_time, callback)
    }

    /// Run until `end_time`, the step limit or cancellation.
    ///
    /// Cancellation is only checked between steps, so the state is always
    /// consistent and any due checkpoint has been written. Numerical and
    /// coordination errors abort the run.
    pub fn run_until<F>(&mut self, end_time: f64, mut callback: F) -> Result<SimulationResult>
    where
        F: FnMut(&Simulation, &StepReport),
    {
        let start_wall = Instant::now();
        let mut n_steps = 0;
        let mut dt_min_used = f64::INFINITY;
        let mut dt_max_used: f64 = 0.0;

        info!(
            "Starting {} run: t = {:.4}s -> {:.4}s",
            self.scenario.name(),
            self.time,
            end_time
        );

        let stop = loop {
            if self.time >= end_time {
                break StopReason::EndTime;
            }
            if self.cancel.load(Ordering::Relaxed) {
                info!("Run cancelled at step {} (t = {:.4}s)", self.step, self.time);
                break StopReason::Cancelled;
            }
            if let Some(max_steps) = self.config.max_steps
                && n_steps >= max_steps
            {
                warn!("Maximum step limit ({}) reached at t = {:.4}s", max_steps, self.time);
                break StopReason::MaxSteps;
            }

            let report = match self.step_until(end_time) {
                Ok(report) => report,
                Err(e) => {
                    error!("Run aborted at step {} (t = {:.4}s): {}", self.step, self.time, e);
                    return Err(e);
                }
            };
            n_steps += 1;
            dt_min_used = dt_min_used.min(report.timestep.dt);
            dt_max_used = dt_max_used.max(report.timestep.dt);
            callback(self, &report);
        };

        let wall_time = start_wall.elapsed().as_secs_f64();
        info!(
            "Run finished ({:?}): {} steps, t = {:.4}s, dt range [{:.2e}, {:.2e}], {:.2}s wall time",
            stop, n_steps, self.time, dt_min_used, dt_max_used, wall_time
        );

        Ok(SimulationResult {
            final_time: self.time,
            n_steps,
            dt_min: dt_min_used,
            dt_max: dt_max_used,
            wall_time,
            stop,
        })
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("scenario", &self.scenario.name())
            .field("time", &self.time)
            .field("step", &self.step)
            .field("blocks", &self.blocks)
            .finish()
    }
}

fn unknown_block(block: BlockIndex) -> SweError {
    SweError::InvalidConfig(format!("no block {} in the layout", block))
}

/// Run `f` on every block, in parallel with the `parallel` feature.
///
/// Returning is the barrier: all blocks have finished when this does.
#[cfg(feature = "parallel")]
fn for_each_block<T, F>(blocks: &mut [SweBlock], f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&mut SweBlock) -> Result<T> + Send + Sync,
{
    use rayon::prelude::*;

    blocks.par_iter_mut().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn for_each_block<T, F>(blocks: &mut [SweBlock], f: F) -> Result<Vec<T>>
where
    F: Fn(&mut SweBlock) -> Result<T>,
{
    blocks.iter_mut().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointSchedule;
    use crate::scenario::{ArtificialTsunamiScenario, DamBreakScenario, UpliftShape};
    use crate::state::SWEState2D;
    use tempfile::tempdir;

    fn dam_break(config: SimulationConfig) -> Simulation {
        Simulation::new(Arc::new(DamBreakScenario::standard()), config).unwrap()
    }

    #[test]
    fn test_run_reaches_end_time_exactly() {
        let mut sim = dam_break(SimulationConfig::default().with_resolution(20, 20).with_end_time(2.0));
        let result = sim.run().unwrap();
        assert!(result.completed());
        assert_eq!(sim.time(), 2.0);
        assert_eq!(result.n_steps, sim.step_count());
        assert!(result.dt_min <= result.dt_max);
        assert!(sim.step().is_err());
    }

    #[test]
    fn test_callback_every_step() {
        let mut sim = dam_break(SimulationConfig::default().with_resolution(10, 10).with_end_time(1.0));
        let mut calls = 0;
        let result = sim
            .run_with_callback(|sim, report| {
                calls += 1;
                assert_eq!(report.step, sim.step_count());
            })
            .unwrap();
        assert_eq!(calls, result.n_steps);
    }

    #[test]
    fn test_max_steps() {
        let mut sim = dam_break(SimulationConfig::default().with_resolution(10, 10).with_max_steps(3));
        let result = sim.run().unwrap();
        assert_eq!(result.stop, StopReason::MaxSteps);
        assert_eq!(result.n_steps, 3);
    }

    #[test]
    fn test_cancel_between_steps() {
        let mut sim = dam_break(SimulationConfig::default().with_resolution(10, 10));
        let cancel = sim.cancel_handle();
        let result = sim
            .run_with_callback(|sim, _| {
                if sim.step_count() == 2 {
                    cancel.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();
        assert_eq!(result.stop, StopReason::Cancelled);
        assert_eq!(sim.step_count(), 2);
    }

    #[test]
    fn test_extent_outside_scenario_rejected() {
        let config = SimulationConfig::default().with_extent(crate::types::Bounds2D::new(-10.0, 50.0, 0.0, 50.0));
        let err = Simulation::new(Arc::new(DamBreakScenario::standard()), config).unwrap_err();
        assert!(matches!(err, SweError::InvalidConfig(_)));
    }

    #[test]
    fn test_moving_seabed_lands_on_rise_time() {
        let scenario = ArtificialTsunamiScenario::new(UpliftShape::SineBump).with_rise_time(0.5);
        let schedule = scenario.displacement_schedule().unwrap();
        let config = SimulationConfig::default().with_resolution(20, 20).with_end_time(2.0);
        let mut sim = Simulation::new(Arc::new(scenario), config).unwrap();
        let mut landed = false;
        while sim.time() < schedule.end_time {
            let report = sim.step().unwrap();
            assert!(report.timestep.dt <= schedule.max_dt);
            landed = sim.time() == schedule.end_time;
        }
        assert!(landed);
    }

    #[test]
    fn test_passive_edge_must_be_supplied_each_step() {
        let outer = EdgeMap::new(
            BoundaryType::Passive,
            BoundaryType::Wall,
            BoundaryType::Wall,
            BoundaryType::Wall,
        );
        let extent = crate::types::Bounds2D::new(0.0, 100.0, 0.0, 100.0);
        let layout = BlockLayout::single(extent, crate::types::Resolution2D::square(10), outer).unwrap();
        let config = SimulationConfig::default().with_end_time(10.0);
        let mut sim = Simulation::with_layout(Arc::new(DamBreakScenario::standard()), config, layout).unwrap();

        let block = BlockIndex::new(0, 0);
        assert!(matches!(sim.step(), Err(SweError::GhostLayerNotReady { edge: Edge::Left, .. })));

        let inflow = |step| GhostEdge::uniform(BlockIndex::new(0, 0), Edge::Right, step, 10, SWEState2D::new(10.0, 0.0, 0.0), 0.0);
        sim.set_passive_ghost_layer(block, Edge::Left, &inflow(0)).unwrap();
        sim.step().unwrap();
        assert!(sim.step().is_err());
        sim.set_passive_ghost_layer(block, Edge::Left, &inflow(1)).unwrap();
        sim.step().unwrap();

        assert!(sim.set_passive_ghost_layer(block, Edge::Right, &inflow(2)).is_err());
    }

    #[test]
    fn test_checkpoints_written_on_schedule() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.ckpt");
        let config = SimulationConfig::default()
            .with_resolution(10, 10)
            .with_blocks(2, 1)
            .with_end_time(3.0)
            .with_checkpoints(&path, CheckpointSchedule::SimulationTime(1.0));
        let mut sim = dam_break(config);
        let mut written = Vec::new();
        sim.run_with_callback(|_, report| written.extend(report.checkpoint)).unwrap();
        assert_eq!(written, vec![0, 1, 2]);

        let checkpoints = sim.checkpoints().unwrap().file().complete_checkpoints().unwrap();
        assert_eq!(checkpoints.len(), 3);
        assert_eq!(checkpoints[2].time, 3.0);
        assert_eq!(checkpoints[2].records.len(), 2);
    }
}
