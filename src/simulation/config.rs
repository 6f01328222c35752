//! Run configuration.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointSchedule;
use crate::error::{Result, SweError};
use crate::scenario::{
    ArtificialTsunamiScenario, CheckpointScenario, DamBreakScenario, DisplacementSeries, GriddedField,
    OscillatingSourceScenario, RadialDamBreakScenario, Scenario, SeismologyScenario, TsunamiScenario,
};
use crate::solver::BackendKind;
use crate::types::{Bounds2D, Resolution2D};

/// Configuration for a simulation run.
///
/// Parsing is left to the caller; any serde format works and missing
/// fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Global cell count over the domain.
    pub resolution: Resolution2D,
    /// Sub-rectangle of the scenario extent to simulate (whole extent if None).
    pub extent: Option<Bounds2D>,
    /// Number of blocks in x.
    pub blocks_x: usize,
    /// Number of blocks in y.
    pub blocks_y: usize,
    /// CFL number for time step calculation.
    pub cfl: f64,
    /// Maximum time step, also used when no waves are present.
    pub max_dt: f64,
    /// Minimum time step (simulation fails if dt drops below this).
    pub min_dt: Option<f64>,
    /// Gravitational acceleration.
    pub g: f64,
    /// Cells with less water are dry.
    pub dry_tolerance: f64,
    /// End time (scenario's end time if None).
    pub end_time: Option<f64>,
    /// Maximum number of time steps per run.
    pub max_steps: Option<u64>,
    pub backend: BackendKind,
    /// Checkpoint file; checkpointing is off without one.
    pub checkpoint_path: Option<PathBuf>,
    pub checkpoint_schedule: CheckpointSchedule,
    /// Keep only this many checkpoints in the file.
    pub checkpoint_retain: Option<usize>,
    /// Record the mass flux through the domain boundary every step.
    pub track_boundary_flux: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution2D::square(100),
            extent: None,
            blocks_x: 1,
            blocks_y: 1,
            cfl: 0.4,
            max_dt: 1.0,
            min_dt: None,
            g: 9.81,
            dry_tolerance: 0.01,
            end_time: None,
            max_steps: None,
            backend: BackendKind::Host,
            checkpoint_path: None,
            checkpoint_schedule: CheckpointSchedule::Disabled,
            checkpoint_retain: None,
            track_boundary_flux: false,
        }
    }
}

impl SimulationConfig {
    pub fn with_resolution(mut self, nx: usize, ny: usize) -> Self {
        self.resolution = Resolution2D::new(nx, ny);
        self
    }

    pub fn with_extent(mut self, extent: Bounds2D) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn with_blocks(mut self, blocks_x: usize, blocks_y: usize) -> Self {
        self.blocks_x = blocks_x;
        self.blocks_y = blocks_y;
        self
    }

    pub fn with_cfl(mut self, cfl: f64) -> Self {
        self.cfl = cfl;
        self
    }

    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = max_dt;
        self
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = Some(min_dt);
        self
    }

    pub fn with_dry_tolerance(mut self, dry_tolerance: f64) -> Self {
        self.dry_tolerance = dry_tolerance;
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_checkpoints(mut self, path: impl Into<PathBuf>, schedule: CheckpointSchedule) -> Self {
        self.checkpoint_path = Some(path.into());
        self.checkpoint_schedule = schedule;
        self
    }

    pub fn with_checkpoint_retention(mut self, keep: usize) -> Self {
        self.checkpoint_retain = Some(keep);
        self
    }

    pub fn with_boundary_flux_tracking(mut self) -> Self {
        self.track_boundary_flux = true;
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SweError::InvalidConfig(msg));
        let (nx, ny) = self.resolution.as_tuple();
        if nx == 0 || ny == 0 {
            return invalid(format!("resolution {} has no cells", self.resolution));
        }
        if self.blocks_x == 0 || self.blocks_y == 0 {
            return invalid("at least one block is required in each direction".into());
        }
        if self.blocks_x > nx || self.blocks_y > ny {
            return invalid(format!(
                "{}x{} blocks do not fit a {} grid",
                self.blocks_x, self.blocks_y, self.resolution
            ));
        }
        if !(self.cfl > 0.0 && self.cfl < 1.0) {
            return invalid(format!("CFL factor {} must lie in (0, 1)", self.cfl));
        }
        if !(self.max_dt.is_finite() && self.max_dt > 0.0) {
            return invalid(format!("max_dt {} must be positive", self.max_dt));
        }
        if let Some(min_dt) = self.min_dt
            && !(min_dt > 0.0 && min_dt <= self.max_dt)
        {
            return invalid(format!("min_dt {} must lie in (0, max_dt]", min_dt));
        }
        if !(self.g.is_finite() && self.g > 0.0) {
            return invalid(format!("gravity {} must be positive", self.g));
        }
        // Velocities are hu / h on every cell at or above the tolerance.
        if !(self.dry_tolerance.is_finite() && self.dry_tolerance > 0.0) {
            return invalid(format!("dry tolerance {} must be positive", self.dry_tolerance));
        }
        if let Some(end_time) = self.end_time
            && !end_time.is_finite()
        {
            return invalid(format!("end time {} must be finite", end_time));
        }
        match self.checkpoint_schedule {
            CheckpointSchedule::SimulationTime(interval) if !(interval > 0.0) => {
                return invalid(format!("checkpoint interval {} must be positive", interval));
            }
            CheckpointSchedule::Disabled => {}
            _ if self.checkpoint_path.is_none() => {
                return invalid("checkpoint schedule set without a checkpoint path".into());
            }
            _ => {}
        }
        if self.checkpoint_retain == Some(0) {
            return invalid("checkpoint retention must keep at least one checkpoint".into());
        }
        Ok(())
    }
}

/// Scenario chosen by name in a configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioSelection {
    DamBreak,
    RadialDamBreak,
    ArtificialTsunami,
    OscillatingSource,
    Tsunami {
        bathymetry: PathBuf,
        displacement: Option<PathBuf>,
    },
    Seismology {
        bathymetry: PathBuf,
        displacement: PathBuf,
    },
    Checkpoint {
        path: PathBuf,
    },
}

impl ScenarioSelection {
    /// Build the scenario, loading datasets from disk where needed.
    pub fn build(&self) -> Result<Arc<dyn Scenario>> {
        let scenario: Arc<dyn Scenario> = match self {
            ScenarioSelection::DamBreak => Arc::new(DamBreakScenario::standard()),
            ScenarioSelection::RadialDamBreak => Arc::new(RadialDamBreakScenario::default()),
            ScenarioSelection::ArtificialTsunami => Arc::new(ArtificialTsunamiScenario::default()),
            ScenarioSelection::OscillatingSource => Arc::new(OscillatingSourceScenario::default()),
            ScenarioSelection::Tsunami {
                bathymetry,
                displacement,
            } => {
                let displacement = displacement.as_ref().map(GriddedField::load).transpose()?;
                Arc::new(TsunamiScenario::new(GriddedField::load(bathymetry)?, displacement)?)
            }
            ScenarioSelection::Seismology {
                bathymetry,
                displacement,
            } => Arc::new(SeismologyScenario::new(
                GriddedField::load(bathymetry)?,
                DisplacementSeries::load(displacement)?,
            )?),
            ScenarioSelection::Checkpoint { path } => Arc::new(CheckpointScenario::load(path)?),
        };
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cfl, 0.4);
        assert_eq!(config.backend, BackendKind::Host);
    }

    #[test]
    fn test_builders() {
        let config = SimulationConfig::default()
            .with_resolution(64, 32)
            .with_blocks(4, 2)
            .with_cfl(0.45)
            .with_end_time(20.0)
            .with_checkpoints("run.ckpt", CheckpointSchedule::SimulationTime(5.0));
        assert!(config.validate().is_ok());
        assert_eq!(config.resolution, Resolution2D::new(64, 32));
        assert_eq!(config.checkpoint_path, Some(PathBuf::from("run.ckpt")));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SimulationConfig::default().with_cfl(1.2).validate().is_err());
        assert!(SimulationConfig::default().with_cfl(0.0).validate().is_err());
        assert!(SimulationConfig::default().with_blocks(0, 1).validate().is_err());
        assert!(SimulationConfig::default().with_resolution(2, 2).with_blocks(3, 1).validate().is_err());
        assert!(SimulationConfig::default().with_max_dt(-1.0).validate().is_err());
        assert!(SimulationConfig::default().with_min_dt(2.0).validate().is_err());
        assert!(SimulationConfig::default().with_dry_tolerance(0.0).validate().is_err());
        assert!(SimulationConfig::default().with_dry_tolerance(-1e-3).validate().is_err());
        assert!(SimulationConfig::default().with_dry_tolerance(f64::NAN).validate().is_err());
        assert!(SimulationConfig::default().with_dry_tolerance(1e-6).validate().is_ok());

        let mut config = SimulationConfig::default();
        config.checkpoint_schedule = CheckpointSchedule::SimulationTime(1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{ "resolution": { "nx": 50, "ny": 20 }, "cfl": 0.3, "backend": "host" }"#).unwrap();
        assert_eq!(config.resolution, Resolution2D::new(50, 20));
        assert_eq!(config.cfl, 0.3);
        assert_eq!(config.blocks_x, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scenario_selection() {
        let selection: ScenarioSelection = serde_json::from_str(r#"{ "kind": "dam_break" }"#).unwrap();
        let scenario = selection.build().unwrap();
        assert_eq!(scenario.name(), "dam-break");

        let missing = ScenarioSelection::Checkpoint {
            path: PathBuf::from("/nonexistent/run.ckpt"),
        };
        assert!(missing.build().is_err());
    }
}
