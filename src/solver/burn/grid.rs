//! Block compute backend on a Burn device.

use burn::prelude::*;
use tracing::debug;

use crate::error::{Location, Result, StepContext};
use crate::flux::FluxParams;
use crate::solver::ComputeBackend;
use crate::state::{BlockGeometry, Field2D, GridState};
use crate::time::WaveSpeedReport;
use crate::types::EdgeIndex;

use super::backend::{SweBackend, tensor_from_slice, tensor_to_scalar, tensor_to_vec};
use super::error::BurnError;
use super::flux::{NormalStates, fwave_batched};

/// Net updates of one block in host coordinates (h, hu, hv).
#[derive(Clone, Debug)]
struct DeviceUpdates<B: Backend> {
    /// `[ny, nx + 1]`
    x_left: [Tensor<B, 2>; 3],
    x_right: [Tensor<B, 2>; 3],
    /// `[ny + 1, nx]`
    y_below: [Tensor<B, 2>; 3],
    y_above: [Tensor<B, 2>; 3],
}

/// Runs the f-wave solver as batched tensor operations.
///
/// The padded state is uploaded at the start of every step, the interior
/// is downloaded after the update. Between the two phases the net updates
/// stay on the device.
pub struct BurnBackend<B: SweBackend> {
    device: B::Device,
    params: FluxParams,
    nx: usize,
    ny: usize,
    updates: Option<DeviceUpdates<B>>,
}

impl<B: SweBackend> BurnBackend<B> {
    /// Backend on the default device of `B`.
    pub fn new(geometry: &BlockGeometry, params: FluxParams) -> Self {
        Self::with_device(geometry, params, B::default_device())
    }

    pub fn with_device(geometry: &BlockGeometry, params: FluxParams, device: B::Device) -> Self {
        Self {
            device,
            params,
            nx: geometry.nx,
            ny: geometry.ny,
            updates: None,
        }
    }

    fn upload(&self, field: &Field2D) -> Result<Tensor<B, 2>, BurnError> {
        tensor_from_slice(field.as_slice(), [self.ny + 2, self.nx + 2], &self.device)
    }

    fn updates(&self) -> Result<&DeviceUpdates<B>, BurnError> {
        self.updates
            .as_ref()
            .ok_or_else(|| BurnError::InvalidState("net updates used before they were computed".into()))
    }

    /// First edge, x-edges before y-edges in row-major order, whose wave
    /// speed is not finite.
    fn non_finite_edge(
        &self,
        x_speed: Tensor<B, 2>,
        y_speed: Tensor<B, 2>,
    ) -> Result<Option<(EdgeIndex, f64)>, BurnError> {
        let nx = self.nx;
        let x = tensor_to_vec(x_speed)?;
        if let Some(k) = x.iter().position(|s| !s.is_finite()) {
            return Ok(Some((EdgeIndex::X { e: k % (nx + 1), j: k / (nx + 1) + 1 }, x[k])));
        }
        let y = tensor_to_vec(y_speed)?;
        Ok(y
            .iter()
            .position(|s| !s.is_finite())
            .map(|k| (EdgeIndex::Y { i: k % nx + 1, e: k / nx }, y[k])))
    }

    fn check_geometry(&self, state: &GridState) -> Result<(), BurnError> {
        if (state.nx(), state.ny()) != (self.nx, self.ny) {
            return Err(BurnError::dimension_mismatch(
                format!("{}x{} block", self.nx, self.ny),
                format!("{}x{} block", state.nx(), state.ny()),
            ));
        }
        Ok(())
    }
}

impl<B: SweBackend> ComputeBackend for BurnBackend<B> {
    fn name(&self) -> &'static str {
        "burn"
    }

    fn compute_net_updates(&mut self, state: &GridState, ctx: &StepContext) -> Result<WaveSpeedReport> {
        self.check_geometry(state)?;
        let (nx, ny) = (self.nx, self.ny);
        let h = self.upload(&state.h)?;
        let hu = self.upload(&state.hu)?;
        let hv = self.upload(&state.hv)?;
        let b = self.upload(&state.b)?;

        // x-edges, normal (1, 0): hn = hu, ht = hv
        let side = |rows: std::ops::Range<usize>, cols: std::ops::Range<usize>| NormalStates {
            h: h.clone().slice([rows.clone(), cols.clone()]),
            hn: hu.clone().slice([rows.clone(), cols.clone()]),
            ht: hv.clone().slice([rows.clone(), cols.clone()]),
            b: b.clone().slice([rows, cols]),
        };
        let x = fwave_batched(
            &side(1..ny + 1, 0..nx + 1),
            &side(1..ny + 1, 1..nx + 2),
            self.params.g,
            self.params.dry_tolerance,
        );

        // y-edges, normal (0, 1): hn = hv, ht = -hu
        let side = |rows: std::ops::Range<usize>, cols: std::ops::Range<usize>| NormalStates {
            h: h.clone().slice([rows.clone(), cols.clone()]),
            hn: hv.clone().slice([rows.clone(), cols.clone()]),
            ht: hu.clone().slice([rows.clone(), cols.clone()]).neg(),
            b: b.clone().slice([rows, cols]),
        };
        let y = fwave_batched(
            &side(0..ny + 1, 1..nx + 1),
            &side(1..ny + 2, 1..nx + 1),
            self.params.g,
            self.params.dry_tolerance,
        );

        let speed_sum = tensor_to_scalar(x.speed.clone().sum().add(y.speed.clone().sum()))?;
        if !speed_sum.is_finite() {
            let err = match self.non_finite_edge(x.speed, y.speed)? {
                Some((edge, speed)) => ctx.instability(Location::Edge(edge), format!("non-finite wave speed {}", speed)),
                None => ctx.instability(Location::Block, format!("non-finite wave speed {}", speed_sum)),
            };
            return Err(err);
        }
        let max_speed = tensor_to_scalar(x.speed.max().max_pair(y.speed.max()))?;

        // Rotate y-edge updates back: hu = -ht, hv = hn
        let from_y = |[dh, dhn, dht]: [Tensor<B, 2>; 3]| [dh, dht.neg(), dhn];
        self.updates = Some(DeviceUpdates {
            x_left: x.left,
            x_right: x.right,
            y_below: from_y(y.left),
            y_above: from_y(y.right),
        });

        debug!(
            "Block {} step {}: burn net updates, max wave speed {:.4}",
            ctx.block, ctx.step, max_speed
        );
        Ok(WaveSpeedReport {
            block: ctx.block,
            max_speed,
            min_spacing: state.geometry().min_spacing(),
            location: None,
        })
    }

    fn apply_updates(&mut self, state: &mut GridState, dt: f64, _ctx: &StepContext) -> Result<()> {
        self.check_geometry(state)?;
        let (nx, ny) = (self.nx, self.ny);
        let lambda_x = dt / state.dx();
        let lambda_y = dt / state.dy();
        let updates = self.updates()?;

        let mut interiors = Vec::with_capacity(3);
        for (k, field) in [&state.h, &state.hu, &state.hv].into_iter().enumerate() {
            let q = self.upload(field)?.slice([1..ny + 1, 1..nx + 1]);
            let from_x = updates.x_right[k]
                .clone()
                .slice([0..ny, 0..nx])
                .add(updates.x_left[k].clone().slice([0..ny, 1..nx + 1]));
            let from_y = updates.y_above[k]
                .clone()
                .slice([0..ny, 0..nx])
                .add(updates.y_below[k].clone().slice([1..ny + 1, 0..nx]));
            let q = q.sub(from_x.mul_scalar(lambda_x)).sub(from_y.mul_scalar(lambda_y));
            interiors.push(tensor_to_vec(q)?);
        }

        state.h.set_interior(&interiors[0]);
        state.hu.set_interior(&interiors[1]);
        state.hv.set_interior(&interiors[2]);
        Ok(())
    }

    fn boundary_mass_flux(&self, state: &GridState) -> Result<f64> {
        self.check_geometry(state)?;
        let (nx, ny) = (self.nx, self.ny);
        let updates = self.updates()?;

        let right_left = tensor_to_vec(updates.x_left[0].clone().slice([0..ny, nx..nx + 1]))?;
        let left_right = tensor_to_vec(updates.x_right[0].clone().slice([0..ny, 0..1]))?;
        let top_below = tensor_to_vec(updates.y_below[0].clone().slice([ny..ny + 1, 0..nx]))?;
        let bottom_above = tensor_to_vec(updates.y_above[0].clone().slice([0..1, 0..nx]))?;

        let mut out_x = 0.0;
        for j in 1..=ny {
            let flux_right = state.hu[(nx, j)] + right_left[j - 1];
            let flux_left = state.hu[(1, j)] - left_right[j - 1];
            out_x += flux_right - flux_left;
        }
        let mut out_y = 0.0;
        for i in 1..=nx {
            let flux_top = state.hv[(i, ny)] + top_below[i - 1];
            let flux_bottom = state.hv[(i, 1)] - bottom_above[i - 1];
            out_y += flux_top - flux_bottom;
        }
        Ok(out_x * state.dy() + out_y * state.dx())
    }
}
