//! Initial and boundary condition providers.
//!
//! A [`Scenario`] answers point queries for initial water height,
//! bathymetry, boundary types and optional forcing. The engine only ever
//! talks to the trait, so one scenario instance can back every block of a
//! decomposed domain (each block queries its own cell centres).
//!
//! # Variants
//!
//! | Scenario | Purpose |
//! |---|---|
//! | [`DamBreakScenario`] | Step in water height, flat or stepped bed |
//! | [`RadialDamBreakScenario`] | Cylindrical column collapsing |
//! | [`ArtificialTsunamiScenario`] | Synthetic seabed uplift in a 100 m deep basin |
//! | [`OscillatingSourceScenario`] | Lake at rest driven by a periodic mass source |
//! | [`TsunamiScenario`] | Loaded bathymetry and one-shot displacement |
//! | [`SeismologyScenario`] | Loaded bathymetry and time-dependent displacement |
//! | [`CheckpointScenario`] | Resume from a checkpoint file |

mod artificial_tsunami;
mod checkpoint_resume;
mod dam_break;
mod dataset;
mod oscillating_source;
mod seismology;
mod tsunami;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::boundary::BoundaryType;
use crate::types::{Bounds2D, Edge};

pub use artificial_tsunami::{ArtificialTsunamiScenario, UpliftShape};
pub use checkpoint_resume::CheckpointScenario;
pub use dam_break::{BedProfile, DamBreakScenario, RadialDamBreakScenario};
pub use dataset::{DisplacementSeries, GriddedField};
pub use oscillating_source::OscillatingSourceScenario;
pub use seismology::SeismologyScenario;
pub use tsunami::{TsunamiScenario, clamp_coastal_bathymetry};

/// Errors raised by scenario queries and dataset loading.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// A coordinate query fell outside the scenario's extent.
    #[error("point ({x}, {y}) lies outside the scenario domain {extent}")]
    OutOfDomain { x: f64, y: f64, extent: Bounds2D },

    /// Malformed dataset (axes, sizes, ordering).
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Dataset I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Period during which the seabed moves.
///
/// While `t <= end_time` the engine re-evaluates bathymetry after every
/// step and keeps `dt <= max_dt` so the uplift history is sampled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplacementSchedule {
    pub end_time: f64,
    pub max_dt: f64,
}

/// Where a resumed run picks up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResumePoint {
    /// Simulation time of the checkpoint
    pub time: f64,
    /// Step counter of the checkpoint
    pub step: u64,
    /// Sequence number of the checkpoint; new checkpoints continue after it
    pub sequence: u64,
}

/// Capability set every scenario provides.
///
/// All coordinate queries fail with [`ScenarioError::OutOfDomain`] outside
/// [`Scenario::boundary_extent`]; they never clamp.
pub trait Scenario: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Domain rectangle this scenario governs.
    fn boundary_extent(&self) -> Bounds2D;

    /// Water height at t = 0 (or at the resume time).
    fn initial_water_height(&self, x: f64, y: f64) -> Result<f64, ScenarioError>;

    /// Discharge (hu, hv) at t = 0. Defaults to water at rest.
    fn initial_momentum(&self, x: f64, y: f64) -> Result<(f64, f64), ScenarioError> {
        self.check_domain(x, y)?;
        Ok((0.0, 0.0))
    }

    /// Static bottom elevation.
    fn bathymetry(&self, x: f64, y: f64) -> Result<f64, ScenarioError>;

    /// Static bathymetry and the seabed displacement reached at time `t`.
    ///
    /// The effective bed at time `t` is the sum of both.
    fn bathymetry_and_displacement(&self, x: f64, y: f64, _t: f64) -> Result<(f64, f64), ScenarioError> {
        Ok((self.bathymetry(x, y)?, 0.0))
    }

    /// Time window of a moving seabed, `None` when the bed is static.
    fn displacement_schedule(&self) -> Option<DisplacementSchedule> {
        None
    }

    /// Boundary condition on an outer edge of the domain.
    fn boundary_type(&self, edge: Edge) -> BoundaryType;

    /// Whether [`Scenario::source_term`] needs to be evaluated.
    fn has_source_term(&self) -> bool {
        false
    }

    /// Rate of water height added at `(x, y)` and time `t` (m/s).
    fn source_term(&self, x: f64, y: f64, _t: f64) -> Result<f64, ScenarioError> {
        self.check_domain(x, y)?;
        Ok(0.0)
    }

    /// Suggested end of the simulation.
    fn end_time(&self) -> f64;

    /// Set for scenarios that continue a previous run.
    fn resume_point(&self) -> Option<ResumePoint> {
        None
    }

    /// Fail unless `(x, y)` lies inside the boundary extent.
    fn check_domain(&self, x: f64, y: f64) -> Result<(), ScenarioError> {
        let extent = self.boundary_extent();
        if extent.contains(x, y) {
            Ok(())
        } else {
            Err(ScenarioError::OutOfDomain { x, y, extent })
        }
    }
}
