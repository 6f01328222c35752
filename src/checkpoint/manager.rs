//! Checkpoint scheduling and restart state machines.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::Result;
use crate::scenario::{ResumePoint, Scenario};
use crate::state::GridState;
use crate::types::{BlockIndex, EdgeMap};

use super::file::CheckpointFile;
use super::record::{BathymetryRecord, Checkpoint, CheckpointRecord, RecordStamp};
use super::CheckpointError;

/// When checkpoints are taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSchedule {
    #[default]
    Disabled,
    /// Every `interval` seconds of simulation time
    SimulationTime(f64),
    /// Every `interval` of wall-clock time
    WallClock(Duration),
}

/// Lifecycle of the next checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointPhase {
    /// The schedule boundary has not been crossed.
    NotScheduled,
    /// The boundary was crossed, a write is pending.
    Due,
    /// Records are being written and synced.
    Writing,
    /// The last due checkpoint is on disk.
    Written,
}

/// Lifecycle of a restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartPhase {
    Idle,
    Loading,
    Loaded,
}

/// Decides when to checkpoint, writes checkpoints and restores from them.
#[derive(Debug)]
pub struct CheckpointManager {
    file: CheckpointFile,
    schedule: CheckpointSchedule,
    phase: CheckpointPhase,
    restart: RestartPhase,
    next_sequence: u64,
    next_due_time: f64,
    last_write: Instant,
    retain: Option<usize>,
    /// Simulation time of the last bed frames this manager wrote
    bed_time: Option<f64>,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>, schedule: CheckpointSchedule) -> Self {
        Self {
            file: CheckpointFile::new(path),
            schedule,
            phase: CheckpointPhase::NotScheduled,
            restart: RestartPhase::Idle,
            next_sequence: 0,
            next_due_time: f64::INFINITY,
            last_write: Instant::now(),
            retain: None,
            bed_time: None,
        }
    }

    /// Compact the file to the `keep` most recent checkpoints after each write.
    pub fn with_retention(mut self, keep: usize) -> Self {
        self.retain = Some(keep.max(1));
        self
    }

    pub fn file(&self) -> &CheckpointFile {
        &self.file
    }

    pub fn schedule(&self) -> CheckpointSchedule {
        self.schedule
    }

    pub fn phase(&self) -> CheckpointPhase {
        self.phase
    }

    pub fn restart_phase(&self) -> RestartPhase {
        self.restart
    }

    /// Sequence number the next checkpoint is written with.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Arm the schedule for a run starting at `time`.
    pub fn start(&mut self, time: f64) {
        self.next_due_time = match self.schedule {
            CheckpointSchedule::SimulationTime(interval) if interval > 0.0 => time + interval,
            _ => f64::INFINITY,
        };
        self.last_write = Instant::now();
        self.phase = CheckpointPhase::NotScheduled;
    }

    /// Number new checkpoints after every sequence already in the file.
    pub fn continue_numbering(&mut self) -> Result<()> {
        let records = self.file.read_all()?;
        if let Some(last) = records.iter().map(|r| r.sequence).max() {
            self.next_sequence = self.next_sequence.max(last + 1);
        }
        Ok(())
    }

    /// Continue numbering after a resumed checkpoint.
    pub fn resume_from(&mut self, point: ResumePoint) {
        self.next_sequence = self.next_sequence.max(point.sequence + 1);
        self.start(point.time);
    }

    /// Bed frames go out with the first checkpoint and again while the
    /// seabed may still be moving.
    fn bed_due(&self, scenario: &dyn Scenario) -> bool {
        match (self.bed_time, scenario.displacement_schedule()) {
            (None, _) => true,
            (Some(written), Some(schedule)) => written < schedule.end_time,
            (Some(_), None) => false,
        }
    }

    /// Update the phase for simulation time `time`; true when a write is due.
    pub fn poll(&mut self, time: f64) -> bool {
        let due = match self.schedule {
            CheckpointSchedule::Disabled => false,
            CheckpointSchedule::SimulationTime(_) => time >= self.next_due_time,
            CheckpointSchedule::WallClock(interval) => self.last_write.elapsed() >= interval,
        };
        self.phase = match (due, self.phase) {
            (true, _) => CheckpointPhase::Due,
            (false, CheckpointPhase::Due) => CheckpointPhase::Due,
            (false, _) => CheckpointPhase::NotScheduled,
        };
        due
    }

    /// Write one checkpoint of every block.
    ///
    /// Returns the sequence number written. On failure the phase returns to
    /// `Due` so the caller can retry or abort.
    pub fn write<'a, I>(&mut self, blocks: I, step: u64, scenario: &dyn Scenario) -> Result<u64>
    where
        I: IntoIterator<Item = (BlockIndex, &'a GridState)>,
    {
        self.phase = CheckpointPhase::Writing;
        let blocks: Vec<(BlockIndex, &GridState)> = blocks.into_iter().collect();
        let time = blocks.first().map_or(0.0, |(_, state)| state.time);
        let stamp = RecordStamp {
            sequence: self.next_sequence,
            step,
            block_count: blocks.len(),
            boundaries: EdgeMap::from_fn(|edge| scenario.boundary_type(edge)),
            end_time: scenario.end_time(),
        };
        let records: Vec<CheckpointRecord> = blocks
            .iter()
            .map(|&(block, state)| CheckpointRecord::capture(state, block, &stamp))
            .collect();

        let beds: Vec<BathymetryRecord> = if self.bed_due(scenario) {
            blocks
                .iter()
                .map(|&(block, state)| BathymetryRecord::capture(state, block, blocks.len()))
                .collect()
        } else {
            Vec::new()
        };

        if let Err(e) = self.file.append(&beds, &records) {
            error!("Checkpoint {} at t = {:.4}s failed: {}", stamp.sequence, time, e);
            self.phase = CheckpointPhase::Due;
            return Err(e.into());
        }
        if !beds.is_empty() {
            self.bed_time = Some(time);
        }
        if let Some(keep) = self.retain {
            self.file.compact(keep)?;
        }

        if let CheckpointSchedule::SimulationTime(interval) = self.schedule {
            while self.next_due_time <= time {
                self.next_due_time += interval;
            }
        }
        self.last_write = Instant::now();
        self.next_sequence += 1;
        self.phase = CheckpointPhase::Written;
        info!(
            "Checkpoint {} written at t = {:.4}s (step {}, {} blocks, {} bed frames)",
            stamp.sequence,
            time,
            step,
            records.len(),
            beds.len()
        );
        Ok(stamp.sequence)
    }

    /// Read the most recent complete checkpoint.
    pub fn load_latest(&mut self) -> Result<Checkpoint> {
        self.restart = RestartPhase::Loading;
        match self.file.latest() {
            Ok(Some(checkpoint)) => {
                self.restart = RestartPhase::Loaded;
                self.next_sequence = self.next_sequence.max(checkpoint.sequence + 1);
                info!(
                    "Loaded checkpoint {} from {} (t = {:.4}s, step {})",
                    checkpoint.sequence,
                    self.file.path().display(),
                    checkpoint.time,
                    checkpoint.step
                );
                Ok(checkpoint)
            }
            Ok(None) => {
                self.restart = RestartPhase::Idle;
                Err(CheckpointError::NoValidCheckpoint {
                    path: self.file.path().to_path_buf(),
                }
                .into())
            }
            Err(e) => {
                self.restart = RestartPhase::Idle;
                Err(e.into())
            }
        }
    }

    /// Load the latest checkpoint and reconstruct every block from it.
    pub fn restore_into<'a, I>(&mut self, states: I, scenario: &dyn Scenario) -> Result<Checkpoint>
    where
        I: IntoIterator<Item = (BlockIndex, &'a mut GridState)>,
    {
        let checkpoint = self.load_latest()?;
        checkpoint.restore_into(states, scenario)?;
        self.start(checkpoint.time);
        Ok(checkpoint)
    }
}
