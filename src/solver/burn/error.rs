//! Error types for Burn tensor operations.

use thiserror::Error;

use crate::error::SweError;

/// Errors that can occur while running a block on a Burn device.
#[derive(Error, Debug)]
pub enum BurnError {
    /// Tensor shape does not match the block geometry.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Data transfer between host and device failed.
    #[error("Data transfer failed: {0}")]
    DataTransfer(String),

    /// Operation called out of order.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl BurnError {
    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<BurnError> for SweError {
    fn from(e: BurnError) -> Self {
        SweError::Backend(e.to_string())
    }
}
