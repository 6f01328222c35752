//! Compute backends for the flux and update phases of a step.
//!
//! A [`ComputeBackend`] owns the net-update buffers of one block and
//! exposes the two phases the driver separates with the global timestep
//! reduction:
//!
//! 1. [`compute_net_updates`](ComputeBackend::compute_net_updates) solves
//!    every edge Riemann problem and reports the block's wave speed bound.
//! 2. [`apply_updates`](ComputeBackend::apply_updates) applies the stored
//!    updates with the global `dt`.
//!
//! [`HostBackend`] keeps everything in host memory. With a `burn-*`
//! feature enabled, [`burn::BurnBackend`] evaluates the same f-wave
//! formula as batched tensor operations on the selected device.

mod backend;
mod host;

#[cfg(feature = "burn")]
pub mod burn;

pub use backend::{BackendKind, ComputeBackend, create_backend};
pub use host::HostBackend;
