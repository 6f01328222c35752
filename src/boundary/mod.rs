//! Boundary conditions and ghost-layer exchange between blocks.
//!
//! Every block carries one ring of ghost cells. Before each flux
//! computation each ghost edge must hold either a boundary rule applied to
//! the adjacent interior cells or a copy of a neighbouring block's interior
//! edge.
//!
//! # Boundary types
//!
//! | Type | Ghost content |
//! |------|---------------|
//! | `Wall` | Mirror of the interior cell, normal momentum negated |
//! | `Outflow` | Copy of the interior cell (zero gradient) |
//! | `Connect` | [`GhostEdge`] snapshot from the neighbouring block |
//! | `Passive` | [`GhostEdge`] snapshot from an external driver |
//!
//! Blocks never read each other's state. A block emits an immutable
//! [`GhostEdge`] for each connected edge after its interior update, and the
//! receiving block copies it into its ghost layer.

mod ghost_edge;
mod manager;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use ghost_edge::GhostEdge;
pub use manager::GhostLayerManager;

/// Rule that populates the ghost cells along one block edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryType {
    /// Reflective wall.
    #[default]
    Wall,
    /// Zero-gradient open boundary.
    Outflow,
    /// Shared edge with another block of the same run.
    Connect,
    /// Ghost layer supplied by an external driver.
    Passive,
}

impl BoundaryType {
    /// Whether ghost cells are derived from the block's own interior.
    #[inline]
    pub fn is_local(self) -> bool {
        matches!(self, BoundaryType::Wall | BoundaryType::Outflow)
    }

    /// Whether the ghost layer must be supplied as a [`GhostEdge`].
    #[inline]
    pub fn accepts_snapshot(self) -> bool {
        !self.is_local()
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoundaryType::Wall => "wall",
            BoundaryType::Outflow => "outflow",
            BoundaryType::Connect => "connect",
            BoundaryType::Passive => "passive",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_kinds() {
        assert!(BoundaryType::Wall.is_local());
        assert!(BoundaryType::Outflow.is_local());
        assert!(BoundaryType::Connect.accepts_snapshot());
        assert!(BoundaryType::Passive.accepts_snapshot());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&BoundaryType::Outflow).unwrap();
        assert_eq!(json, "\"outflow\"");
        let kind: BoundaryType = serde_json::from_str("\"passive\"").unwrap();
        assert_eq!(kind, BoundaryType::Passive);
    }
}
