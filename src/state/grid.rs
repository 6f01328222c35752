//! Cell-centred grid state of one rectangular block.

use serde::{Deserialize, Serialize};

use crate::error::{Location, Result, StepContext, SweError};
use crate::scenario::{Scenario, ScenarioError};
use crate::types::{Bounds2D, CellIndex, Resolution2D};

use super::cell::SWEState2D;
use super::field::Field2D;

/// Heights this far below zero are roundoff and reset to a dry cell;
/// anything lower is reported as [`SweError::NegativeHeight`].
pub const NEGATIVE_HEIGHT_TOLERANCE: f64 = 1e-10;

/// Size, spacing and placement of a block in the global domain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockGeometry {
    /// Interior cells in x
    pub nx: usize,
    /// Interior cells in y
    pub ny: usize,
    pub dx: f64,
    pub dy: f64,
    /// x-coordinate of the block's left edge
    pub offset_x: f64,
    /// y-coordinate of the block's bottom edge
    pub offset_y: f64,
}

impl BlockGeometry {
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            nx,
            ny,
            dx,
            dy,
            offset_x,
            offset_y,
        }
    }

    /// Geometry covering `bounds` with the given resolution.
    pub fn from_bounds(bounds: &Bounds2D, resolution: Resolution2D) -> Self {
        Self {
            nx: resolution.nx(),
            ny: resolution.ny(),
            dx: bounds.width() / resolution.nx() as f64,
            dy: bounds.height() / resolution.ny() as f64,
            offset_x: bounds.x_min,
            offset_y: bounds.y_min,
        }
    }

    #[inline]
    pub fn resolution(&self) -> Resolution2D {
        Resolution2D::new(self.nx, self.ny)
    }

    /// Centre of cell `(i, j)` in padded indexing (interior is `1..=n`).
    #[inline]
    pub fn cell_center(&self, i: usize, j: usize) -> (f64, f64) {
        (
            self.offset_x + (i as f64 - 0.5) * self.dx,
            self.offset_y + (j as f64 - 0.5) * self.dy,
        )
    }

    /// Spatial extent of the interior cells.
    pub fn bounds(&self) -> Bounds2D {
        Bounds2D::new(
            self.offset_x,
            self.offset_x + self.nx as f64 * self.dx,
            self.offset_y,
            self.offset_y + self.ny as f64 * self.dy,
        )
    }

    #[inline]
    pub fn min_spacing(&self) -> f64 {
        self.dx.min(self.dy)
    }

    #[inline]
    pub fn cell_area(&self) -> f64 {
        self.dx * self.dy
    }

    /// Interior cell containing `(x, y)`, clamped to the nearest cell.
    pub fn nearest_cell(&self, x: f64, y: f64) -> CellIndex {
        let locate = |coord: f64, offset: f64, spacing: f64, n: usize| {
            let k = ((coord - offset) / spacing).floor();
            if k.is_nan() || k < 0.0 {
                1
            } else {
                (k as usize).min(n - 1) + 1
            }
        };
        CellIndex::new(
            locate(x, self.offset_x, self.dx, self.nx),
            locate(y, self.offset_y, self.dy, self.ny),
        )
    }

    /// Check that the spacing is usable for a finite volume grid.
    pub fn is_valid(&self) -> bool {
        self.nx > 0
            && self.ny > 0
            && self.dx.is_finite()
            && self.dy.is_finite()
            && self.dx > 0.0
            && self.dy > 0.0
            && self.offset_x.is_finite()
            && self.offset_y.is_finite()
    }
}

/// Conserved quantities and bathymetry of one block, ghost layer included.
#[derive(Clone, Debug)]
pub struct GridState {
    geometry: BlockGeometry,
    /// Water height
    pub h: Field2D,
    /// Discharge in x
    pub hu: Field2D,
    /// Discharge in y
    pub hv: Field2D,
    /// Bottom elevation
    pub b: Field2D,
    /// Elapsed simulation time
    pub time: f64,
}

impl GridState {
    /// Dry, flat block at time zero.
    pub fn new(geometry: BlockGeometry) -> Self {
        let (nx, ny) = (geometry.nx, geometry.ny);
        Self {
            geometry,
            h: Field2D::zeros(nx, ny),
            hu: Field2D::zeros(nx, ny),
            hv: Field2D::zeros(nx, ny),
            b: Field2D::zeros(nx, ny),
            time: 0.0,
        }
    }

    /// Initialise every interior cell from the scenario at cell centres.
    ///
    /// Bathymetry is the static bed plus the displacement reached at `time`.
    /// Ghost cells are left for the boundary manager.
    pub fn from_scenario(
        geometry: BlockGeometry,
        scenario: &dyn Scenario,
        time: f64,
    ) -> Result<Self, ScenarioError> {
        let mut state = Self::new(geometry);
        state.time = time;
        for j in 1..=geometry.ny {
            for i in 1..=geometry.nx {
                let (x, y) = geometry.cell_center(i, j);
                let (hu, hv) = scenario.initial_momentum(x, y)?;
                state.h[(i, j)] = scenario.initial_water_height(x, y)?;
                state.hu[(i, j)] = hu;
                state.hv[(i, j)] = hv;
            }
        }
        state.refresh_bathymetry(scenario, time)?;
        Ok(state)
    }

    #[inline]
    pub fn geometry(&self) -> &BlockGeometry {
        &self.geometry
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.geometry.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.geometry.ny
    }

    #[inline]
    pub fn dx(&self) -> f64 {
        self.geometry.dx
    }

    #[inline]
    pub fn dy(&self) -> f64 {
        self.geometry.dy
    }

    #[inline]
    pub fn cell(&self, i: usize, j: usize) -> SWEState2D {
        SWEState2D::new(self.h[(i, j)], self.hu[(i, j)], self.hv[(i, j)])
    }

    #[inline]
    pub fn set_cell(&mut self, i: usize, j: usize, q: SWEState2D) {
        self.h[(i, j)] = q.h;
        self.hu[(i, j)] = q.hu;
        self.hv[(i, j)] = q.hv;
    }

    /// Recompute interior bathymetry as static bed plus displacement at `time`.
    pub fn refresh_bathymetry(&mut self, scenario: &dyn Scenario, time: f64) -> Result<(), ScenarioError> {
        let geometry = self.geometry;
        for j in 1..=geometry.ny {
            for i in 1..=geometry.nx {
                let (x, y) = geometry.cell_center(i, j);
                let (bed, displacement) = scenario.bathymetry_and_displacement(x, y, time)?;
                self.b[(i, j)] = bed + displacement;
            }
        }
        Ok(())
    }

    /// Add `dt * source(x, y, t)` to the interior water height.
    pub fn apply_source_term(&mut self, scenario: &dyn Scenario, t: f64, dt: f64) -> Result<(), ScenarioError> {
        let geometry = self.geometry;
        for j in 1..=geometry.ny {
            for i in 1..=geometry.nx {
                let (x, y) = geometry.cell_center(i, j);
                self.h[(i, j)] += dt * scenario.source_term(x, y, t)?;
            }
        }
        Ok(())
    }

    /// Total water volume over interior cells.
    pub fn total_mass(&self) -> f64 {
        self.h.interior_sum() * self.geometry.cell_area()
    }

    /// Total momentum (x, y) over interior cells.
    pub fn total_momentum(&self) -> (f64, f64) {
        let area = self.geometry.cell_area();
        (self.hu.interior_sum() * area, self.hv.interior_sum() * area)
    }

    pub fn max_height(&self) -> f64 {
        self.h.interior_iter().map(|(_, _, h)| h).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_height(&self) -> f64 {
        self.h.interior_iter().map(|(_, _, h)| h).fold(f64::INFINITY, f64::min)
    }

    /// Post-update checks and cleanup of the interior cells.
    ///
    /// Non-finite values and heights below [`NEGATIVE_HEIGHT_TOLERANCE`]
    /// fail; roundoff negatives become dry and dry cells lose their
    /// momentum.
    pub fn finalize_update(&mut self, dry_tol: f64, ctx: &StepContext) -> Result<()> {
        for j in 1..=self.ny() {
            for i in 1..=self.nx() {
                let q = self.cell(i, j);
                if !q.is_finite() {
                    return Err(ctx.instability(
                        Location::Cell(CellIndex::new(i, j)),
                        format!("non-finite state (h={}, hu={}, hv={})", q.h, q.hu, q.hv),
                    ));
                }
                if q.h < -NEGATIVE_HEIGHT_TOLERANCE {
                    return Err(SweError::NegativeHeight {
                        block: ctx.block,
                        step: ctx.step,
                        cell: CellIndex::new(i, j),
                        value: q.h,
                    });
                }
                if q.h < dry_tol {
                    self.set_cell(i, j, SWEState2D::new(q.h.max(0.0), 0.0, 0.0));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockIndex;

    fn geometry() -> BlockGeometry {
        BlockGeometry::new(4, 2, 0.5, 1.0, 10.0, -1.0)
    }

    #[test]
    fn test_cell_centers() {
        let g = geometry();
        assert_eq!(g.cell_center(1, 1), (10.25, -0.5));
        assert_eq!(g.cell_center(4, 2), (11.75, 0.5));
        let b = g.bounds();
        assert_eq!(b.as_tuple(), (10.0, 12.0, -1.0, 1.0));
    }

    #[test]
    fn test_from_bounds() {
        let g = BlockGeometry::from_bounds(&Bounds2D::new(0.0, 100.0, 0.0, 50.0), Resolution2D::new(100, 25));
        assert_eq!(g.dx, 1.0);
        assert_eq!(g.dy, 2.0);
        assert_eq!(g.min_spacing(), 1.0);
    }

    #[test]
    fn test_nearest_cell_clamps() {
        let g = geometry();
        assert_eq!(g.nearest_cell(10.3, -0.9), CellIndex::new(1, 1));
        assert_eq!(g.nearest_cell(11.9, 0.9), CellIndex::new(4, 2));
        assert_eq!(g.nearest_cell(50.0, 50.0), CellIndex::new(4, 2));
        assert_eq!(g.nearest_cell(-50.0, -50.0), CellIndex::new(1, 1));
    }

    #[test]
    fn test_mass_uses_interior_only() {
        let mut state = GridState::new(geometry());
        state.h = Field2D::filled(4, 2, 2.0);
        assert!((state.total_mass() - 2.0 * 8.0 * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_momentum_uses_interior_only() {
        let mut state = GridState::new(geometry());
        state.hu = Field2D::filled(4, 2, 3.0);
        state.hv[(2, 1)] = -1.5;
        state.hv[(2, 2)] = 0.5;
        // ghost cells do not count
        state.hv[(0, 1)] = 100.0;
        state.hv[(2, 3)] = 100.0;
        let (px, py) = state.total_momentum();
        assert!((px - 3.0 * 8.0 * 0.5).abs() < 1e-12);
        assert!((py - (-1.0 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_finalize_rejects_negative_height() {
        let mut state = GridState::new(geometry());
        state.h = Field2D::filled(4, 2, 1.0);
        state.h[(3, 2)] = -0.01;
        let ctx = StepContext::new(BlockIndex::new(1, 1), 9);
        match state.finalize_update(1e-6, &ctx) {
            Err(SweError::NegativeHeight { cell, step, .. }) => {
                assert_eq!(cell, CellIndex::new(3, 2));
                assert_eq!(step, 9);
            }
            other => panic!("expected NegativeHeight, got {:?}", other),
        }
    }

    #[test]
    fn test_finalize_dries_roundoff() {
        let mut state = GridState::new(geometry());
        state.h = Field2D::filled(4, 2, 1.0);
        state.h[(1, 1)] = -1e-14;
        state.hu[(1, 1)] = 0.3;
        state.finalize_update(1e-6, &StepContext::default()).unwrap();
        assert_eq!(state.cell(1, 1), SWEState2D::zero());
    }

    #[test]
    fn test_finalize_rejects_nan() {
        let mut state = GridState::new(geometry());
        state.hv[(2, 1)] = f64::NAN;
        let err = state.finalize_update(1e-6, &StepContext::default()).unwrap_err();
        assert!(err.is_numerical_instability());
    }
}
