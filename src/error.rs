//! Crate-wide error type.
//!
//! Numerical and coordination failures abort a run; they carry the block,
//! the step and the offending cell or edge so the diagnostic can point at
//! the exact place the simulation stopped being trustworthy.

use std::fmt;

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::scenario::ScenarioError;
use crate::types::{BlockIndex, CellIndex, Edge, EdgeIndex};

/// Where in a block a failure was detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Cell(CellIndex),
    Edge(EdgeIndex),
    /// Reported by a reduction that does not track positions.
    Block,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Cell(cell) => write!(f, "{}", cell),
            Location::Edge(edge) => write!(f, "{}", edge),
            Location::Block => f.write_str("location not tracked"),
        }
    }
}

/// Block and step a computation runs for, used to label diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepContext {
    pub block: BlockIndex,
    pub step: u64,
}

impl StepContext {
    pub fn new(block: BlockIndex, step: u64) -> Self {
        Self { block, step }
    }

    /// Build a [`SweError::NumericalInstability`] for this block and step.
    pub fn instability(&self, location: Location, detail: impl Into<String>) -> SweError {
        SweError::NumericalInstability {
            block: self.block,
            step: self.step,
            location,
            detail: detail.into(),
        }
    }
}

/// Errors raised by the simulation engine.
#[derive(Error, Debug)]
pub enum SweError {
    /// Non-finite or divergent wave speed or state.
    #[error(
        "numerical instability in block {block} at step {step}, {location}: {detail} \
         (resume from the last checkpoint with a smaller CFL factor)"
    )]
    NumericalInstability {
        block: BlockIndex,
        step: u64,
        location: Location,
        detail: String,
    },

    /// Water height dropped below zero after an update.
    #[error("negative water height {value:e} in block {block} at step {step}, {cell}")]
    NegativeHeight {
        block: BlockIndex,
        step: u64,
        cell: CellIndex,
        value: f64,
    },

    /// A flux computation was attempted before a CONNECT/PASSIVE ghost layer was set.
    #[error("ghost layer on {edge} edge of block {block} not populated for step {step}")]
    GhostLayerNotReady {
        block: BlockIndex,
        step: u64,
        edge: Edge,
    },

    /// A ghost-layer snapshot does not fit the edge it was offered to.
    #[error("ghost layer for {edge} edge of block {block} rejected: {reason}")]
    GhostLayerMismatch {
        block: BlockIndex,
        edge: Edge,
        reason: String,
    },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Compute backend failure (device initialisation, transfers).
    #[error("Compute backend error: {0}")]
    Backend(String),
}

impl SweError {
    /// Negative heights are a specialization of numerical instability.
    pub fn is_numerical_instability(&self) -> bool {
        matches!(
            self,
            SweError::NumericalInstability { .. } | SweError::NegativeHeight { .. }
        )
    }

    /// Block the failure was detected in, if the error is tied to one.
    pub fn block(&self) -> Option<BlockIndex> {
        match self {
            SweError::NumericalInstability { block, .. }
            | SweError::NegativeHeight { block, .. }
            | SweError::GhostLayerNotReady { block, .. }
            | SweError::GhostLayerMismatch { block, .. } => Some(*block),
            _ => None,
        }
    }
}

pub type Result<T, E = SweError> = std::result::Result<T, E>;
