//! Crash-consistent checkpoint and restart.
//!
//! # File format
//!
//! ```text
//! [magic: 8 bytes] "SWECKPT1"
//! [version: u32 LE] 2
//! then a sequence of frames:
//! [payload length: u64 LE][CRC-32 of payload: u32 LE][bincode payload]
//! ```
//!
//! A payload is either a bed frame ([`BathymetryRecord`]) or a state frame
//! ([`CheckpointRecord`]). Bed frames are written with the first checkpoint
//! and again only while the seabed moves; each state frame uses the latest
//! bed frame of its block written before it.
//!
//! A checkpoint is the set of state frames sharing one sequence number. It
//! is complete once every block has a state frame and a bed. Readers stop at the
//! first truncated or corrupt frame, so a crash while writing loses at
//! most the checkpoint being written and the previous one stays usable.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut manager = CheckpointManager::new("run.ckpt", CheckpointSchedule::SimulationTime(10.0));
//! manager.start(0.0);
//! // after every step
//! if manager.poll(time) {
//!     manager.write(blocks, step, &scenario)?;
//! }
//! // on restart
//! let checkpoint = manager.restore_into(states, &scenario)?;
//! ```

mod crc;
mod file;
mod manager;
mod record;

use std::path::PathBuf;

use thiserror::Error;

pub use crc::crc32;
pub use file::{CheckpointFile, FORMAT_VERSION, MAGIC};
pub use manager::{CheckpointManager, CheckpointPhase, CheckpointSchedule, RestartPhase};
pub use record::{BathymetryRecord, Checkpoint, CheckpointRecord, Frame, RecordStamp};

/// Errors raised while writing or reading checkpoints.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// A frame failed validation (length, checksum, payload).
    #[error("corrupt checkpoint record at byte {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// The file is not a checkpoint file of a supported version.
    #[error("not a checkpoint file: {0}")]
    BadHeader(String),

    /// A resume was requested but the file holds no complete checkpoint.
    #[error("no complete checkpoint in {}", path.display())]
    NoValidCheckpoint { path: PathBuf },

    /// The checkpoint does not fit the blocks it is restored into.
    #[error("checkpoint does not match the block layout: {0}")]
    Mismatch(String),
}

impl CheckpointError {
    /// Corruption that is recovered by falling back to an older checkpoint.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CheckpointError::Corrupt { .. })
    }
}
