//! Read-only block copies for visualization and output writers.

use crate::error::Result;
use crate::state::{BlockGeometry, GridState};
use crate::types::BlockIndex;

/// Interior state of one block at one step.
///
/// Arrays are row-major with x varying fastest, `nx * ny` values each.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockSnapshot {
    pub block: BlockIndex,
    pub step: u64,
    pub time: f64,
    pub geometry: BlockGeometry,
    pub h: Vec<f64>,
    pub hu: Vec<f64>,
    pub hv: Vec<f64>,
    pub b: Vec<f64>,
}

impl BlockSnapshot {
    pub fn capture(state: &GridState, block: BlockIndex, step: u64) -> Self {
        Self {
            block,
            step,
            time: state.time,
            geometry: *state.geometry(),
            h: state.h.interior(),
            hu: state.hu.interior(),
            hv: state.hv.interior(),
            b: state.b.interior(),
        }
    }

    /// Offset of interior cell `(i, j)`, both 1-based.
    #[inline]
    pub fn offset(&self, i: usize, j: usize) -> usize {
        (j - 1) * self.geometry.nx + (i - 1)
    }

    /// Free surface elevation `h + b` per cell.
    pub fn surface(&self) -> Vec<f64> {
        self.h.iter().zip(&self.b).map(|(h, b)| h + b).collect()
    }

    /// Output file name for this snapshot, see [`output_file_name`].
    pub fn file_name(&self, base: &str, extension: &str) -> String {
        output_file_name(base, self.block, self.step, extension)
    }
}

/// `base_X_Y_step.ext` naming of per-block output files.
pub fn output_file_name(base: &str, block: BlockIndex, step: u64, extension: &str) -> String {
    format!("{}_{}_{}_{}.{}", base, block.x, block.y, step, extension)
}

/// Consumer of block snapshots, such as a renderer or a file writer.
pub trait SnapshotObserver {
    fn observe(&mut self, snapshot: &BlockSnapshot) -> Result<()>;
}

impl<F> SnapshotObserver for F
where
    F: FnMut(&BlockSnapshot) -> Result<()>,
{
    fn observe(&mut self, snapshot: &BlockSnapshot) -> Result<()> {
        self(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(output_file_name("tsunami", BlockIndex::new(2, 0), 150, "nc"), "tsunami_2_0_150.nc");
    }

    #[test]
    fn test_capture_interior_only() {
        let mut state = GridState::new(BlockGeometry::new(3, 2, 1.0, 1.0, 0.0, 0.0));
        state.h[(0, 1)] = 99.0;
        state.h[(3, 2)] = 4.0;
        state.b[(3, 2)] = -1.5;
        state.time = 2.5;
        let snap = BlockSnapshot::capture(&state, BlockIndex::new(1, 1), 7);
        assert_eq!(snap.h.len(), 6);
        assert!(!snap.h.contains(&99.0));
        assert_eq!(snap.h[snap.offset(3, 2)], 4.0);
        assert_eq!(snap.surface()[snap.offset(3, 2)], 2.5);
        assert_eq!(snap.file_name("out", "vtk"), "out_1_1_7.vtk");
        assert_eq!(snap.time, 2.5);
    }
}
