//! Serialized state of one block at one checkpoint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryType;
use crate::error::Result;
use crate::scenario::Scenario;
use crate::state::{BlockGeometry, GridState, SWEState2D};
use crate::types::{BlockIndex, Bounds2D, CellIndex, EdgeMap};

use super::CheckpointError;

/// Run-level data written into every record of a checkpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordStamp {
    pub sequence: u64,
    pub step: u64,
    /// Number of blocks in the decomposition
    pub block_count: usize,
    /// Boundary types of the outer domain edges
    pub boundaries: EdgeMap<BoundaryType>,
    pub end_time: f64,
}

fn check_len(name: &str, values: &[f64], n: usize) -> std::result::Result<(), String> {
    if values.len() != n {
        return Err(format!("{} has {} values, expected {}", name, values.len(), n));
    }
    Ok(())
}

fn check_header(geometry: &BlockGeometry, block_count: usize, time: f64) -> std::result::Result<(), String> {
    if !geometry.is_valid() {
        return Err(format!("invalid geometry {:?}", geometry));
    }
    if block_count == 0 {
        return Err("block count is zero".into());
    }
    if !time.is_finite() {
        return Err(format!("non-finite time {}", time));
    }
    Ok(())
}

#[inline]
fn flat(geometry: &BlockGeometry, cell: CellIndex) -> usize {
    (cell.j - 1) * geometry.nx + (cell.i - 1)
}

/// Conserved interior cells of one block, written verbatim.
///
/// Arrays are row-major over the interior (x fastest), `nx * ny` long.
/// The bed is not part of the record; see [`BathymetryRecord`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub block_x: usize,
    pub block_y: usize,
    pub block_count: usize,
    pub sequence: u64,
    pub time: f64,
    pub step: u64,
    pub geometry: BlockGeometry,
    pub boundaries: EdgeMap<BoundaryType>,
    pub end_time: f64,
    pub h: Vec<f64>,
    pub hu: Vec<f64>,
    pub hv: Vec<f64>,
}

impl CheckpointRecord {
    /// Copy the interior of `state`.
    pub fn capture(state: &GridState, block: BlockIndex, stamp: &RecordStamp) -> Self {
        Self {
            block_x: block.x,
            block_y: block.y,
            block_count: stamp.block_count,
            sequence: stamp.sequence,
            time: state.time,
            step: stamp.step,
            geometry: *state.geometry(),
            boundaries: stamp.boundaries,
            end_time: stamp.end_time,
            h: state.h.interior(),
            hu: state.hu.interior(),
            hv: state.hv.interior(),
        }
    }

    #[inline]
    pub fn block(&self) -> BlockIndex {
        BlockIndex::new(self.block_x, self.block_y)
    }

    /// Structural checks run on every record read back from disk.
    pub fn validate(&self) -> std::result::Result<(), String> {
        check_header(&self.geometry, self.block_count, self.time)?;
        let n = self.geometry.nx * self.geometry.ny;
        for (name, values) in [("h", &self.h), ("hu", &self.hu), ("hv", &self.hv)] {
            check_len(name, values, n)?;
        }
        Ok(())
    }

    /// Conserved state of an interior cell (padded indices).
    pub fn cell(&self, cell: CellIndex) -> SWEState2D {
        let k = flat(&self.geometry, cell);
        SWEState2D::new(self.h[k], self.hu[k], self.hv[k])
    }

    /// Write the conserved quantities and time into `state`.
    pub fn restore_conserved(&self, state: &mut GridState) -> std::result::Result<(), CheckpointError> {
        if *state.geometry() != self.geometry {
            return Err(CheckpointError::Mismatch(format!(
                "block {} has geometry {:?}, checkpoint has {:?}",
                self.block(),
                state.geometry(),
                self.geometry
            )));
        }
        state.h.set_interior(&self.h);
        state.hu.set_interior(&self.hu);
        state.hv.set_interior(&self.hv);
        state.time = self.time;
        Ok(())
    }
}

/// Effective bed of one block: static bathymetry plus the displacement
/// reached at `time`.
///
/// Written once when a run starts writing into a file and again only
/// after the seabed has moved. Every checkpoint uses the latest bed frame
/// of its block written before it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BathymetryRecord {
    pub block_x: usize,
    pub block_y: usize,
    pub block_count: usize,
    pub time: f64,
    pub geometry: BlockGeometry,
    pub b: Vec<f64>,
}

impl BathymetryRecord {
    pub fn capture(state: &GridState, block: BlockIndex, block_count: usize) -> Self {
        Self {
            block_x: block.x,
            block_y: block.y,
            block_count,
            time: state.time,
            geometry: *state.geometry(),
            b: state.b.interior(),
        }
    }

    #[inline]
    pub fn block(&self) -> BlockIndex {
        BlockIndex::new(self.block_x, self.block_y)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        check_header(&self.geometry, self.block_count, self.time)?;
        check_len("b", &self.b, self.geometry.nx * self.geometry.ny)
    }

    /// Bed elevation of an interior cell (padded indices).
    pub fn bed(&self, cell: CellIndex) -> f64 {
        self.b[flat(&self.geometry, cell)]
    }
}

/// One framed entry of a checkpoint file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    Bathymetry(BathymetryRecord),
    State(CheckpointRecord),
}

impl Frame {
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Frame::Bathymetry(record) => record.validate(),
            Frame::State(record) => record.validate(),
        }
    }
}

/// All records sharing one sequence number, one per block, with the bed
/// each block had when they were written.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub sequence: u64,
    pub time: f64,
    pub step: u64,
    /// Sorted by block row, then column
    pub records: Vec<CheckpointRecord>,
    /// Same order as `records`
    pub bathymetry: Vec<Arc<BathymetryRecord>>,
}

impl Checkpoint {
    pub fn record(&self, block: BlockIndex) -> Option<&CheckpointRecord> {
        self.records.iter().find(|r| r.block() == block)
    }

    pub fn bathymetry_record(&self, block: BlockIndex) -> Option<&BathymetryRecord> {
        self.bathymetry.iter().map(|b| &**b).find(|b| b.block() == block)
    }

    /// Record whose block covers `(x, y)`.
    pub fn record_at(&self, x: f64, y: f64) -> Option<&CheckpointRecord> {
        self.records.iter().find(|r| r.geometry.bounds().contains(x, y))
    }

    /// Union of all block extents.
    pub fn extent(&self) -> Option<Bounds2D> {
        let mut bounds = self.records.iter().map(|r| r.geometry.bounds());
        let first = bounds.next()?;
        let (x_min, x_max, y_min, y_max) = bounds.fold(first.as_tuple(), |(x0, x1, y0, y1), b| {
            (x0.min(b.x_min), x1.max(b.x_max), y0.min(b.y_min), y1.max(b.y_max))
        });
        Bounds2D::try_new(x_min, x_max, y_min, y_max)
    }

    pub fn boundaries(&self) -> Option<EdgeMap<BoundaryType>> {
        self.records.first().map(|r| r.boundaries)
    }

    pub fn end_time(&self) -> Option<f64> {
        self.records.first().map(|r| r.end_time)
    }

    /// Reconstruct every block from this checkpoint.
    ///
    /// Conserved quantities and time are copied verbatim; the bed is
    /// re-evaluated from the scenario at the checkpoint time.
    pub fn restore_into<'a, I>(&self, states: I, scenario: &dyn Scenario) -> Result<()>
    where
        I: IntoIterator<Item = (BlockIndex, &'a mut GridState)>,
    {
        let mut restored = 0;
        for (block, state) in states {
            let record = self.record(block).ok_or_else(|| {
                CheckpointError::Mismatch(format!("no record for block {} in checkpoint {}", block, self.sequence))
            })?;
            record.restore_conserved(state)?;
            state.refresh_bathymetry(scenario, record.time)?;
            restored += 1;
        }
        if restored != self.records.len() {
            return Err(CheckpointError::Mismatch(format!(
                "checkpoint {} has {} blocks, layout has {}",
                self.sequence,
                self.records.len(),
                restored
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::DamBreakScenario;

    fn stamp() -> RecordStamp {
        RecordStamp {
            sequence: 3,
            step: 120,
            block_count: 1,
            boundaries: EdgeMap::uniform(BoundaryType::Wall),
            end_time: 15.0,
        }
    }

    fn checkpoint_of(states: &[(BlockIndex, &GridState)]) -> Checkpoint {
        let records: Vec<CheckpointRecord> = states
            .iter()
            .map(|&(block, state)| CheckpointRecord::capture(state, block, &stamp()))
            .collect();
        Checkpoint {
            sequence: 3,
            time: records[0].time,
            step: 120,
            bathymetry: states
                .iter()
                .map(|&(block, state)| Arc::new(BathymetryRecord::capture(state, block, states.len())))
                .collect(),
            records,
        }
    }

    #[test]
    fn test_capture_and_restore_are_exact() {
        let scenario = DamBreakScenario::standard();
        let geometry = BlockGeometry::new(10, 10, 10.0, 10.0, 0.0, 0.0);
        let mut state = GridState::from_scenario(geometry, &scenario, 0.0).unwrap();
        state.hu[(4, 7)] = 0.1 + 0.2;
        state.time = 1.0 / 3.0;

        let checkpoint = checkpoint_of(&[(BlockIndex::new(0, 0), &state)]);
        let record = &checkpoint.records[0];
        assert!(record.validate().is_ok());
        assert_eq!(record.cell(CellIndex::new(4, 7)).hu, 0.1 + 0.2);

        let mut restored = GridState::new(geometry);
        checkpoint
            .restore_into([(BlockIndex::new(0, 0), &mut restored)], &scenario)
            .unwrap();
        assert_eq!(restored.h, state.h);
        assert_eq!(restored.hu, state.hu);
        assert_eq!(restored.b, state.b);
        assert_eq!(restored.time.to_bits(), state.time.to_bits());
    }

    #[test]
    fn test_validate_rejects_short_arrays() {
        let state = GridState::new(BlockGeometry::new(2, 2, 1.0, 1.0, 0.0, 0.0));
        let mut record = CheckpointRecord::capture(&state, BlockIndex::new(0, 0), &stamp());
        record.hv.pop();
        assert!(record.validate().unwrap_err().contains("hv"));

        let mut bed = BathymetryRecord::capture(&state, BlockIndex::new(0, 0), 1);
        bed.b.push(0.0);
        assert!(Frame::Bathymetry(bed).validate().unwrap_err().contains("b has 5"));
    }

    #[test]
    fn test_bed_lives_in_its_own_record() {
        let mut state = GridState::new(BlockGeometry::new(3, 2, 1.0, 1.0, 0.0, 0.0));
        state.b[(3, 2)] = -7.5;
        state.time = 2.0;
        let bed = BathymetryRecord::capture(&state, BlockIndex::new(1, 0), 2);
        assert_eq!(bed.block(), BlockIndex::new(1, 0));
        assert_eq!(bed.bed(CellIndex::new(3, 2)), -7.5);
        assert_eq!(bed.time, 2.0);

        let frame = Frame::Bathymetry(bed);
        let decoded: Frame = bincode::deserialize(&bincode::serialize(&frame).unwrap()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_geometry_mismatch() {
        let state = GridState::new(BlockGeometry::new(2, 2, 1.0, 1.0, 0.0, 0.0));
        let record = CheckpointRecord::capture(&state, BlockIndex::new(0, 0), &stamp());
        let mut other = GridState::new(BlockGeometry::new(2, 2, 1.0, 1.0, 2.0, 0.0));
        assert!(matches!(
            record.restore_conserved(&mut other),
            Err(CheckpointError::Mismatch(_))
        ));
    }

    #[test]
    fn test_extent_is_union() {
        let a = GridState::new(BlockGeometry::new(2, 2, 1.0, 1.0, 0.0, 0.0));
        let b = GridState::new(BlockGeometry::new(2, 2, 1.0, 1.0, 2.0, 0.0));
        let checkpoint = checkpoint_of(&[(BlockIndex::new(0, 0), &a), (BlockIndex::new(1, 0), &b)]);
        assert_eq!(checkpoint.extent(), Some(Bounds2D::new(0.0, 4.0, 0.0, 2.0)));
        assert_eq!(checkpoint.record_at(3.0, 1.0).map(|r| r.block()), Some(BlockIndex::new(1, 0)));
        assert_eq!(
            checkpoint.bathymetry_record(BlockIndex::new(1, 0)).map(|r| r.geometry),
            Some(*b.geometry())
        );
    }
}
