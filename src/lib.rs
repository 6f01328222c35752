//! # swe-blocks
//!
//! A block-structured finite-volume engine for the 2D shallow water
//! equations.
//!
//! This crate provides:
//! - Ghost-padded Cartesian grid state (water height, momenta, bathymetry)
//! - An f-wave Riemann solver with wet/dry handling and well-balanced
//!   bathymetry source terms
//! - Block decomposition with ghost-layer exchange between neighbours
//! - Global CFL timestep control
//! - Scenarios: dam breaks, synthetic and dataset-driven tsunamis,
//!   a time-varying seabed, oscillating sources and checkpoint resume
//! - Append-only, CRC-checked checkpoint files with exact restart
//! - Host and (optionally) Burn tensor compute backends
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use swe_blocks::{DamBreakScenario, Simulation, SimulationConfig};
//!
//! let config = SimulationConfig::default().with_resolution(20, 20).with_end_time(0.5);
//! let mut sim = Simulation::new(Arc::new(DamBreakScenario::standard()), config).unwrap();
//! sim.run().unwrap();
//! ```

pub mod boundary;
pub mod checkpoint;
pub mod error;
pub mod flux;
pub mod scenario;
pub mod simulation;
pub mod solver;
pub mod state;
pub mod time;
pub mod types;

// Re-export main types for convenience
pub use boundary::{BoundaryType, GhostEdge, GhostLayerManager};
pub use checkpoint::{Checkpoint, CheckpointFile, CheckpointManager, CheckpointSchedule};
pub use error::{Result, StepContext, SweError};
pub use flux::{FluxParams, NetUpdates, fwave_2d, fwave_normal};
pub use scenario::{
    ArtificialTsunamiScenario, CheckpointScenario, DamBreakScenario, OscillatingSourceScenario,
    RadialDamBreakScenario, Scenario, SeismologyScenario, TsunamiScenario,
};
pub use simulation::{
    BlockLayout, BlockSnapshot, Simulation, SimulationConfig, SimulationResult, StepReport,
    SweBlock,
};
pub use solver::{BackendKind, ComputeBackend, HostBackend};
pub use state::{BlockGeometry, Field2D, GridState, SWEState2D};
pub use time::{Timestep, TimestepController};
pub use types::{BlockIndex, Bounds2D, Edge, EdgeMap, Resolution2D};
