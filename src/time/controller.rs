//! CFL-based timestep selection.
//!
//! Every block reports the largest wave speed found on its edges. The
//! global timestep is the minimum over blocks of
//!
//! ```text
//! dt_b = cfl * min(dx_b, dy_b) / s_b
//! ```
//!
//! capped by the configured maximum timestep, which is also the fallback
//! when no block carries any wave (dry or resting domain).

use crate::error::{Location, Result, SweError};
use crate::types::{BlockIndex, EdgeIndex};

/// Wave speed bound reported by one block after computing net updates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveSpeedReport {
    pub block: BlockIndex,
    /// Largest |wave speed| over the block's edges
    pub max_speed: f64,
    /// min(dx, dy) of the block
    pub min_spacing: f64,
    /// Edge where the maximum occurred, when the backend tracks it
    pub location: Option<EdgeIndex>,
}

impl WaveSpeedReport {
    /// Largest stable timestep for this block, `None` without waves.
    pub fn stable_dt(&self, cfl: f64) -> Option<f64> {
        (self.max_speed > 0.0).then(|| cfl * self.min_spacing / self.max_speed)
    }
}

/// What bounded the selected timestep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DtLimit {
    /// CFL condition of the given block
    Cfl(BlockIndex),
    /// Configured maximum timestep
    MaxDt,
    /// Clamped to land on the end time
    EndTime,
    /// Scenario's maximum step while the seabed is moving
    Displacement,
}

/// Selected global timestep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timestep {
    pub dt: f64,
    /// Minimum CFL limit over blocks, infinite without waves
    pub cfl_limit: f64,
    /// Global maximum wave speed
    pub max_wave_speed: f64,
    pub limited_by: DtLimit,
}

impl Timestep {
    /// Reduce the timestep to at most `limit`.
    pub fn clamp(mut self, limit: f64, reason: DtLimit) -> Self {
        if limit < self.dt {
            self.dt = limit;
            self.limited_by = reason;
        }
        self
    }
}

/// Timestep controller shared by all blocks of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimestepController {
    /// CFL factor, in (0, 1)
    pub cfl: f64,
    /// Upper bound on dt and fallback for wave-free domains
    pub max_dt: f64,
    /// The run fails if the CFL timestep drops below this
    pub min_dt: Option<f64>,
}

impl TimestepController {
    pub fn new(cfl: f64, max_dt: f64) -> Self {
        Self {
            cfl,
            max_dt,
            min_dt: None,
        }
    }

    /// Fail when the timestep collapses below `min_dt`.
    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = Some(min_dt);
        self
    }

    /// Global min-reduction over all block reports.
    ///
    /// # Errors
    ///
    /// [`SweError::NumericalInstability`] when a block reports a
    /// non-finite speed or the timestep collapses below `min_dt`.
    pub fn select(&self, reports: &[WaveSpeedReport], step: u64) -> Result<Timestep> {
        let mut cfl_limit = f64::INFINITY;
        let mut max_wave_speed: f64 = 0.0;
        let mut limiting_block = None;

        for report in reports {
            if !report.max_speed.is_finite() {
                return Err(SweError::NumericalInstability {
                    block: report.block,
                    step,
                    location: report.location.map_or(Location::Block, Location::Edge),
                    detail: format!("non-finite maximum wave speed {}", report.max_speed),
                });
            }
            max_wave_speed = max_wave_speed.max(report.max_speed);
            if let Some(dt) = report.stable_dt(self.cfl)
                && dt < cfl_limit
            {
                cfl_limit = dt;
                limiting_block = Some(report.block);
            }
        }

        let timestep = match limiting_block {
            Some(block) if cfl_limit <= self.max_dt => Timestep {
                dt: cfl_limit,
                cfl_limit,
                max_wave_speed,
                limited_by: DtLimit::Cfl(block),
            },
            _ => Timestep {
                dt: self.max_dt,
                cfl_limit,
                max_wave_speed,
                limited_by: DtLimit::MaxDt,
            },
        };

        if let Some(min_dt) = self.min_dt
            && timestep.dt < min_dt
        {
            let block = limiting_block.unwrap_or_default();
            let location = reports
                .iter()
                .find(|r| r.block == block)
                .and_then(|r| r.location)
                .map_or(Location::Block, Location::Edge);
            return Err(SweError::NumericalInstability {
                block,
                step,
                location,
                detail: format!(
                    "timestep {:.3e} below minimum {:.3e} (wave speed {:.3e})",
                    timestep.dt, min_dt, max_wave_speed
                ),
            });
        }

        Ok(timestep)
    }
}

impl Default for TimestepController {
    fn default() -> Self {
        Self::new(0.4, 1.0)
    }
}
