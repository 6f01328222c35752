//! Ghost-padded 2D scalar field.

use std::ops::{Index, IndexMut};

/// Scalar field over a block's interior plus a one-cell ghost border.
///
/// Stored row-major with x varying fastest: `(i, j)` lives at
/// `j * (nx + 2) + i`. Indices 0 and `nx + 1` (resp. `ny + 1`) are ghost
/// cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Field2D {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
}

impl Field2D {
    /// Zero-initialised field for `nx × ny` interior cells.
    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self::filled(nx, ny, 0.0)
    }

    pub fn filled(nx: usize, ny: usize, value: f64) -> Self {
        Self {
            nx,
            ny,
            data: vec![value; (nx + 2) * (ny + 2)],
        }
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Row stride of the padded layout.
    #[inline]
    pub fn stride(&self) -> usize {
        self.nx + 2
    }

    #[inline(always)]
    pub fn offset(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.nx + 2 && j < self.ny + 2);
        j * (self.nx + 2) + i
    }

    /// Raw padded storage.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Copy of the interior values, row by row (x fastest).
    pub fn interior(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.nx * self.ny);
        for j in 1..=self.ny {
            let start = self.offset(1, j);
            out.extend_from_slice(&self.data[start..start + self.nx]);
        }
        out
    }

    /// Overwrite the interior from a row-major `nx * ny` slice.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != nx * ny`.
    pub fn set_interior(&mut self, values: &[f64]) {
        assert_eq!(values.len(), self.nx * self.ny, "interior length mismatch");
        for j in 1..=self.ny {
            let start = self.offset(1, j);
            let src = (j - 1) * self.nx;
            self.data[start..start + self.nx].copy_from_slice(&values[src..src + self.nx]);
        }
    }

    /// Sum over interior cells.
    pub fn interior_sum(&self) -> f64 {
        (1..=self.ny)
            .map(|j| {
                let start = self.offset(1, j);
                self.data[start..start + self.nx].iter().sum::<f64>()
            })
            .sum()
    }

    /// Iterator over interior `(i, j, value)` triples.
    pub fn interior_iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (1..=self.ny).flat_map(move |j| (1..=self.nx).map(move |i| (i, j, self[(i, j)])))
    }
}

impl Index<(usize, usize)> for Field2D {
    type Output = f64;

    #[inline(always)]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[self.offset(i, j)]
    }
}

impl IndexMut<(usize, usize)> for Field2D {
    #[inline(always)]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        let offset = self.offset(i, j);
        &mut self.data[offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let mut f = Field2D::zeros(3, 2);
        assert_eq!(f.as_slice().len(), 20);
        f[(1, 1)] = 5.0;
        assert_eq!(f.as_slice()[6], 5.0);
        assert_eq!(f.offset(4, 3), 19);
    }

    #[test]
    fn test_interior_roundtrip_ignores_ghosts() {
        let mut f = Field2D::filled(2, 2, -1.0);
        f.set_interior(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(f[(1, 1)], 1.0);
        assert_eq!(f[(2, 1)], 2.0);
        assert_eq!(f[(1, 2)], 3.0);
        assert_eq!(f[(0, 0)], -1.0);
        assert_eq!(f.interior(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(f.interior_sum(), 10.0);
    }

    #[test]
    fn test_interior_iter_order() {
        let mut f = Field2D::zeros(2, 2);
        f.set_interior(&[1.0, 2.0, 3.0, 4.0]);
        let cells: Vec<_> = f.interior_iter().collect();
        assert_eq!(cells[1], (2, 1, 2.0));
        assert_eq!(cells[2], (1, 2, 3.0));
    }
}
