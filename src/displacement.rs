//! The displacement table: relative vectors for bonded atom pairs, each with
//! its own gradient accumulator. The table is the hinge between Cartesian
//! space and the internal coordinates built on top of it.

use lin_alg::f64::Vec3;

use crate::ambient::SimCell;

/// One displacement: `posits[i] - posits[j]`, folded to the nearest periodic
/// image, together with the accumulated ∂E/∂disp.
#[derive(Clone, Copy, Debug)]
pub struct DispRow {
    pub i: usize,
    pub j: usize,
    pub disp: Vec3,
    pub grad: Vec3,
}

impl DispRow {
    pub fn new(i: usize, j: usize) -> Self {
        Self {
            i,
            j,
            disp: Vec3::new_zero(),
            grad: Vec3::new_zero(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DispList {
    pub rows: Vec<DispRow>,
}

impl DispList {
    pub fn new(pairs: &[(usize, usize)]) -> Self {
        Self {
            rows: pairs.iter().map(|&(i, j)| DispRow::new(i, j)).collect(),
        }
    }

    /// Refresh every displacement from the current positions and reset the
    /// gradient accumulators. Internal-coordinate rows read the result.
    pub fn forward(&mut self, posits: &[Vec3], cell: &SimCell) {
        for row in &mut self.rows {
            row.disp = posits[row.i] - posits[row.j];
            if cell.nvec() > 0 {
                row.disp = cell.min_image(row.disp);
            }
            row.grad = Vec3::new_zero();
        }
    }

    /// Scatter the accumulated displacement gradients onto the per-atom
    /// Cartesian gradient, with opposite signs on the two endpoints. The
    /// caller owns zeroing of `gradient` before the pipeline runs.
    pub fn back(&self, gradient: &mut [Vec3]) {
        for row in &self.rows {
            gradient[row.i] += row.grad;
            gradient[row.j] -= row.grad;
        }
    }
}
