//! Backend trait and selection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StepContext, SweError};
use crate::flux::FluxParams;
use crate::state::{BlockGeometry, GridState};
use crate::time::WaveSpeedReport;

use super::host::HostBackend;

/// Flux computation and cell update for one block.
///
/// Both implementations satisfy the same numerical contract: conservative
/// updates, lake at rest preserved, dry cells never divided by.
pub trait ComputeBackend: Send {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Solve all edge Riemann problems of `state` and keep the net updates.
    ///
    /// Ghost cells must be populated for the current step.
    fn compute_net_updates(&mut self, state: &GridState, ctx: &StepContext) -> Result<WaveSpeedReport>;

    /// Apply the net updates from the last
    /// [`compute_net_updates`](Self::compute_net_updates) with timestep `dt`.
    fn apply_updates(&mut self, state: &mut GridState, dt: f64, ctx: &StepContext) -> Result<()>;

    /// Net volume flux leaving the block through its edges, from the last
    /// computed updates and the state they were computed on.
    fn boundary_mass_flux(&self, state: &GridState) -> Result<f64>;
}

/// Where the flux computation runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Host,
    /// Burn tensor backend chosen by the enabled `burn-*` feature
    Burn,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Host => f.write_str("host"),
            BackendKind::Burn => f.write_str("burn"),
        }
    }
}

/// Create the backend for a block of the given geometry.
///
/// # Errors
///
/// [`SweError::InvalidConfig`] for [`BackendKind::Burn`] when no `burn-*`
/// feature was compiled in.
pub fn create_backend(
    kind: BackendKind,
    geometry: &BlockGeometry,
    params: FluxParams,
) -> Result<Box<dyn ComputeBackend>> {
    match kind {
        BackendKind::Host => Ok(Box::new(HostBackend::new(geometry, params))),
        BackendKind::Burn => create_burn_backend(geometry, params),
    }
}

#[cfg(feature = "burn-cuda")]
fn create_burn_backend(geometry: &BlockGeometry, params: FluxParams) -> Result<Box<dyn ComputeBackend>> {
    Ok(Box::new(super::burn::BurnBackend::<burn_cuda::Cuda>::new(geometry, params)))
}

#[cfg(all(feature = "burn-wgpu", not(feature = "burn-cuda")))]
fn create_burn_backend(geometry: &BlockGeometry, params: FluxParams) -> Result<Box<dyn ComputeBackend>> {
    Ok(Box::new(super::burn::BurnBackend::<burn_wgpu::Wgpu>::new(geometry, params)))
}

#[cfg(all(feature = "burn-ndarray", not(feature = "burn-wgpu"), not(feature = "burn-cuda")))]
fn create_burn_backend(geometry: &BlockGeometry, params: FluxParams) -> Result<Box<dyn ComputeBackend>> {
    Ok(Box::new(super::burn::BurnBackend::<burn_ndarray::NdArray<f64>>::new(
        geometry, params,
    )))
}

#[cfg(not(any(feature = "burn-ndarray", feature = "burn-wgpu", feature = "burn-cuda")))]
fn create_burn_backend(_geometry: &BlockGeometry, _params: FluxParams) -> Result<Box<dyn ComputeBackend>> {
    Err(SweError::InvalidConfig(
        "burn backend requested but no burn-ndarray, burn-wgpu or burn-cuda feature is enabled".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_backend_is_always_available() {
        let geometry = BlockGeometry::new(4, 4, 1.0, 1.0, 0.0, 0.0);
        let backend = create_backend(BackendKind::Host, &geometry, FluxParams::default()).unwrap();
        assert_eq!(backend.name(), "host");
    }

    #[cfg(not(any(feature = "burn-ndarray", feature = "burn-wgpu", feature = "burn-cuda")))]
    #[test]
    fn test_burn_without_feature_is_config_error() {
        let geometry = BlockGeometry::new(4, 4, 1.0, 1.0, 0.0, 0.0);
        let result = create_backend(BackendKind::Burn, &geometry, FluxParams::default());
        assert!(matches!(result, Err(SweError::InvalidConfig(_))));
    }

    #[test]
    fn test_kind_serde() {
        let kind: BackendKind = serde_json::from_str("\"burn\"").unwrap();
        assert_eq!(kind, BackendKind::Burn);
        assert_eq!(BackendKind::default().to_string(), "host");
    }
}
