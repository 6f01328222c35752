//! Per-block ghost-layer bookkeeping.

use tracing::debug;

use crate::error::{Result, SweError};
use crate::state::{GridState, SWEState2D};
use crate::types::{BlockIndex, Edge, EdgeMap};

use super::BoundaryType;
use super::ghost_edge::{GhostEdge, ghost_cells, interior_cells};

/// Reflect the momentum of `q` across an edge with outward normal `n`.
///
/// `m_ghost = m - 2 (m · n) n`: normal component negated, tangential kept.
#[inline]
fn reflect(q: SWEState2D, (nx, ny): (f64, f64)) -> SWEState2D {
    let mn = q.hu * nx + q.hv * ny;
    SWEState2D::new(q.h, q.hu - 2.0 * mn * nx, q.hv - 2.0 * mn * ny)
}

/// Tracks which ghost edges of one block hold data for which step.
///
/// WALL and OUTFLOW edges are filled from the block's own interior by
/// [`fill_local`](Self::fill_local). CONNECT and PASSIVE edges only
/// become ready through [`set_ghost_layer`](Self::set_ghost_layer).
#[derive(Clone, Debug)]
pub struct GhostLayerManager {
    block: BlockIndex,
    kinds: EdgeMap<BoundaryType>,
    ready: EdgeMap<Option<u64>>,
}

impl GhostLayerManager {
    pub fn new(block: BlockIndex, kinds: EdgeMap<BoundaryType>) -> Self {
        Self {
            block,
            kinds,
            ready: EdgeMap::default(),
        }
    }

    #[inline]
    pub fn block(&self) -> BlockIndex {
        self.block
    }

    #[inline]
    pub fn kind(&self, edge: Edge) -> BoundaryType {
        self.kinds[edge]
    }

    #[inline]
    pub fn kinds(&self) -> &EdgeMap<BoundaryType> {
        &self.kinds
    }

    /// Edges whose ghost layer comes from a neighbouring block.
    pub fn connected_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        Edge::ALL
            .into_iter()
            .filter(|&edge| self.kinds[edge] == BoundaryType::Connect)
    }

    /// Apply WALL and OUTFLOW rules and mark those edges ready for `step`.
    pub fn fill_local(&mut self, state: &mut GridState, step: u64) {
        for edge in Edge::ALL {
            let kind = self.kinds[edge];
            if !kind.is_local() {
                continue;
            }
            let normal = edge.outward_normal();
            let pairs = interior_cells(state, edge).into_iter().zip(ghost_cells(state, edge));
            for ((ii, ij), (gi, gj)) in pairs {
                let q = state.cell(ii, ij);
                let ghost = match kind {
                    BoundaryType::Wall => reflect(q, normal),
                    _ => q,
                };
                state.set_cell(gi, gj, ghost);
                state.b[(gi, gj)] = state.b[(ii, ij)];
            }
            self.ready[edge] = Some(step);
        }
    }

    /// Snapshot of the interior cells along `edge` for a neighbour.
    pub fn grab_ghost_layer(&self, state: &GridState, edge: Edge, step: u64) -> GhostEdge {
        GhostEdge::capture(state, self.block, edge, step)
    }

    /// Copy `snapshot` into the ghost cells along `edge`.
    ///
    /// The snapshot must come from the facing edge of the neighbour, match
    /// the edge length and be valid for `step`.
    pub fn set_ghost_layer(
        &mut self,
        state: &mut GridState,
        edge: Edge,
        snapshot: &GhostEdge,
        step: u64,
    ) -> Result<()> {
        let kind = self.kinds[edge];
        if !kind.accepts_snapshot() {
            return Err(self.mismatch(edge, format!("{} edges are filled locally", kind)));
        }
        if snapshot.edge != edge.opposite() {
            return Err(self.mismatch(
                edge,
                format!("snapshot taken from the {} edge of block {}", snapshot.edge, snapshot.source),
            ));
        }
        if snapshot.step != step {
            return Err(self.mismatch(
                edge,
                format!("snapshot is for step {}, block is at step {}", snapshot.step, step),
            ));
        }
        let cells = ghost_cells(state, edge);
        if !snapshot.is_consistent() || snapshot.len() != cells.len() {
            return Err(self.mismatch(
                edge,
                format!("snapshot has {} cells, edge has {}", snapshot.len(), cells.len()),
            ));
        }

        for (k, (gi, gj)) in cells.into_iter().enumerate() {
            state.set_cell(gi, gj, snapshot.cell(k));
            state.b[(gi, gj)] = snapshot.b[k];
        }
        self.ready[edge] = Some(step);
        debug!(
            "Block {} {} ghost layer set from block {} for step {}",
            self.block, edge, snapshot.source, step
        );
        Ok(())
    }

    /// Whether `edge` holds data for `step`.
    #[inline]
    pub fn is_ready(&self, edge: Edge, step: u64) -> bool {
        self.ready[edge] == Some(step)
    }

    /// Fail with [`SweError::GhostLayerNotReady`] unless every edge holds
    /// data for `step`.
    pub fn ensure_ready(&self, step: u64) -> Result<()> {
        match Edge::ALL.into_iter().find(|&edge| !self.is_ready(edge, step)) {
            Some(edge) => Err(SweError::GhostLayerNotReady {
                block: self.block,
                step,
                edge,
            }),
            None => Ok(()),
        }
    }

    fn mismatch(&self, edge: Edge, reason: String) -> SweError {
        SweError::GhostLayerMismatch {
            block: self.block,
            edge,
            reason,
        }
    }
}
