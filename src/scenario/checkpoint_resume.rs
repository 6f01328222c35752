//! Resume a run from a checkpoint.

use std::path::Path;

use crate::boundary::BoundaryType;
use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointFile, CheckpointRecord};
use crate::types::{Bounds2D, Edge, EdgeMap};

use super::{ResumePoint, Scenario, ScenarioError};

/// Initial conditions answered from a stored checkpoint.
///
/// Each query finds the block containing the point and returns the value
/// of the nearest cell. When the new run uses the checkpoint's block
/// layout every cell centre maps onto itself and the state is reproduced
/// exactly. Bathymetry comes from the bed frame each block had when the
/// checkpoint was written, so it includes any displacement reached by then.
#[derive(Clone, Debug)]
pub struct CheckpointScenario {
    checkpoint: Checkpoint,
    extent: Bounds2D,
    boundaries: EdgeMap<BoundaryType>,
    end_time: f64,
}

impl CheckpointScenario {
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, CheckpointError> {
        let extent = checkpoint
            .extent()
            .ok_or_else(|| CheckpointError::Mismatch(format!("checkpoint {} has no blocks", checkpoint.sequence)))?;
        let boundaries = checkpoint.boundaries().unwrap_or_default();
        let end_time = checkpoint.end_time().unwrap_or(checkpoint.time);
        Ok(Self {
            checkpoint,
            extent,
            boundaries,
            end_time,
        })
    }

    /// Latest complete checkpoint in `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let file = CheckpointFile::new(path.as_ref());
        let checkpoint = file.latest()?.ok_or_else(|| CheckpointError::NoValidCheckpoint {
            path: path.as_ref().to_path_buf(),
        })?;
        Self::from_checkpoint(checkpoint)
    }

    /// Run beyond the end time stored with the checkpoint.
    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = end_time;
        self
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    fn record_at(&self, x: f64, y: f64) -> Result<&CheckpointRecord, ScenarioError> {
        self.check_domain(x, y)?;
        // The union of block extents may have holes for irregular layouts.
        self.checkpoint.record_at(x, y).ok_or(ScenarioError::OutOfDomain {
            x,
            y,
            extent: self.extent,
        })
    }
}

impl Scenario for CheckpointScenario {
    fn name(&self) -> &'static str {
        "checkpoint"
    }

    fn boundary_extent(&self) -> Bounds2D {
        self.extent
    }

    fn initial_water_height(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        let record = self.record_at(x, y)?;
        Ok(record.cell(record.geometry.nearest_cell(x, y)).h)
    }

    fn initial_momentum(&self, x: f64, y: f64) -> Result<(f64, f64), ScenarioError> {
        let record = self.record_at(x, y)?;
        let q = record.cell(record.geometry.nearest_cell(x, y));
        Ok((q.hu, q.hv))
    }

    fn bathymetry(&self, x: f64, y: f64) -> Result<f64, ScenarioError> {
        let record = self.record_at(x, y)?;
        let bed = self
            .checkpoint
            .bathymetry_record(record.block())
            .ok_or(ScenarioError::OutOfDomain {
                x,
                y,
                extent: self.extent,
            })?;
        Ok(bed.bed(bed.geometry.nearest_cell(x, y)))
    }

    fn boundary_type(&self, edge: Edge) -> BoundaryType {
        self.boundaries[edge]
    }

    fn end_time(&self) -> f64 {
        self.end_time
    }

    fn resume_point(&self) -> Option<ResumePoint> {
        Some(ResumePoint {
            time: self.checkpoint.time,
            step: self.checkpoint.step,
            sequence: self.checkpoint.sequence,
        })
    }
}
