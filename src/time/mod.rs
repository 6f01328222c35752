//! Time step control.
//!
//! Blocks advance in lock step: every block reports its wave speed bound,
//! the [`TimestepController`] reduces them to one global timestep and all
//! blocks apply their updates with it.

mod controller;

pub use controller::{DtLimit, Timestep, TimestepController, WaveSpeedReport};
