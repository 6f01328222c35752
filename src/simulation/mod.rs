//! Block-decomposed simulation driver.
//!
//! A run splits the domain into a [`BlockLayout`] of [`SweBlock`]s and
//! advances them in lock step:
//! - flux phase on every block (in parallel with the `parallel` feature)
//! - global timestep reduction over the reported wave speeds
//! - update phase, then ghost-layer exchange between CONNECT neighbours
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use swe_blocks::scenario::RadialDamBreakScenario;
//! use swe_blocks::simulation::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig::default()
//!     .with_resolution(16, 16)
//!     .with_blocks(2, 2)
//!     .with_max_steps(5);
//! let mut sim = Simulation::new(Arc::new(RadialDamBreakScenario::default()), config).unwrap();
//! let mass = sim.total_mass();
//! sim.run_with_callback(|sim, report| {
//!     println!("step {} t = {:.3} dt = {:.3e}", report.step, sim.time(), report.timestep.dt)
//! })
//! .unwrap();
//! assert!((sim.total_mass() - mass).abs() < 1e-8 * mass);
//! ```

mod block;
mod config;
mod layout;
mod runner;
mod snapshot;

pub use block::{StepUpdate, SweBlock};
pub use config::{ScenarioSelection, SimulationConfig};
pub use layout::{BlockLayout, BlockSpec};
pub use runner::{Simulation, SimulationResult, StepReport, StopReason};
pub use snapshot::{BlockSnapshot, SnapshotObserver, output_file_name};
