//! Sparse and dense per-cell value buffers.
//!
//! A flat `nx*ny` array per quantity, row-major indexed, rather than a
//! matrix library type.

/// A per-cell quantity where some cells may still be unknown.
///
/// Used for temperature, pressure, wind components, and each pollutant
/// immediately after grid binning, before interpolation fills every cell.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseField {
    nx: usize,
    ny: usize,
    values: Vec<Option<f64>>,
}

impl SparseField {
    /// Create an all-unknown field of the given shape.
    pub fn empty(nx: usize, ny: usize) -> Self {
        Self {
            nx,
            ny,
            values: vec![None; nx * ny],
        }
    }

    /// Grid width.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Grid height.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Flat row-major index for `(i, j)`.
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.ny + j
    }

    /// Current value at flat index `idx`, if known.
    pub fn get(&self, idx: usize) -> Option<f64> {
        self.values[idx]
    }

    /// Whether every cell has a known value.
    pub fn is_dense(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    /// Number of cells that are still unknown.
    pub fn unknown_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Bin a new observation into cell `idx`.
    ///
    /// If the cell is empty, assigns `value` directly; otherwise replaces
    /// it with the running pairwise average `(prev + new) / 2` (spec
    /// §4.A: a deliberate, order-dependent choice matching the source
    /// semantics — *not* a true running mean).
    pub fn bin(&mut self, idx: usize, value: f64) {
        self.values[idx] = Some(match self.values[idx] {
            None => value,
            Some(prev) => (prev + value) / 2.0,
        });
    }

    /// Underlying flat slice, `None` entries are unknown cells.
    pub fn as_slice(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Mutable underlying flat slice.
    pub fn as_mut_slice(&mut self) -> &mut [Option<f64>] {
        &mut self.values
    }

    /// Consume into a [`DenseField`], provided every cell is known.
    ///
    /// Returns `None` if any cell is still unknown.
    pub fn into_dense(self) -> Option<DenseField> {
        let mut out = Vec::with_capacity(self.values.len());
        for v in self.values {
            out.push(v?);
        }
        Some(DenseField {
            nx: self.nx,
            ny: self.ny,
            values: out,
        })
    }
}

/// A per-cell quantity where every cell has a known value.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseField {
    nx: usize,
    ny: usize,
    values: Vec<f64>,
}

impl DenseField {
    /// Build a dense field directly from flat values, in row-major order.
    pub fn from_flat(nx: usize, ny: usize, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), nx * ny, "dense field size mismatch");
        Self { nx, ny, values }
    }

    /// Build a dense field filled with a constant value.
    pub fn filled(nx: usize, ny: usize, value: f64) -> Self {
        Self {
            nx,
            ny,
            values: vec![value; nx * ny],
        }
    }

    /// Grid width.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Grid height.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Flat row-major index for `(i, j)`.
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.ny + j
    }

    /// Value at `(i, j)`.
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.values[self.index(i, j)]
    }

    /// Mutable access at `(i, j)`.
    pub fn at_mut(&mut self, i: usize, j: usize) -> &mut f64 {
        let idx = self.index(i, j);
        &mut self.values[idx]
    }

    /// Flat row-major slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Consume into the flat row-major `Vec`.
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// Maximum absolute value across the field.
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// Maximum value across the field.
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::MIN, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_running_average_is_order_dependent() {
        let mut f = SparseField::empty(1, 1);
        f.bin(0, 10.0);
        f.bin(0, 20.0); // (10+20)/2 = 15
        f.bin(0, 0.0); // (15+0)/2 = 7.5
        assert_eq!(f.get(0), Some(7.5));
    }

    #[test]
    fn into_dense_requires_all_known() {
        let mut f = SparseField::empty(1, 2);
        f.bin(0, 1.0);
        assert!(f.clone().into_dense().is_none());
        f.bin(1, 2.0);
        let dense = f.into_dense().expect("fully known");
        assert_eq!(dense.as_slice(), &[1.0, 2.0]);
    }
}
