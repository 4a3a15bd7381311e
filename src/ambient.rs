//! The periodic environment of a simulation: lattice vectors and
//! minimum-image folding of displacement vectors.

use lin_alg::f64::Vec3;

use crate::ParamError;

/// A simulation cell: zero to three real-space lattice vectors, with the
/// matching reciprocal vectors. `nvec` is the number of periodic directions;
/// 0 means an aperiodic (gas-phase) system and disables folding entirely.
///
/// Invariant: `gvecs[k].dot(rvecs[l])` is 1 for `k == l` and 0 otherwise,
/// over the spanned directions.
#[derive(Clone, Copy, Debug)]
pub struct SimCell {
    rvecs: [Vec3; 3],
    gvecs: [Vec3; 3],
    nvec: usize,
}

impl Default for SimCell {
    fn default() -> Self {
        Self::aperiodic()
    }
}

impl SimCell {
    /// A cell with no periodic directions.
    pub fn aperiodic() -> Self {
        Self {
            rvecs: [Vec3::new_zero(); 3],
            gvecs: [Vec3::new_zero(); 3],
            nvec: 0,
        }
    }

    /// Build a cell from 0-3 lattice vectors, deriving the reciprocal vectors
    /// from the Gram matrix of the spanned subspace. Fails on a degenerate
    /// (linearly dependent) vector set.
    pub fn new(rvecs: &[Vec3]) -> Result<Self, ParamError> {
        let nvec = rvecs.len();
        if nvec > 3 {
            return Err(ParamError::new("Cell takes at most 3 lattice vectors"));
        }

        let mut r = [Vec3::new_zero(); 3];
        r[..nvec].copy_from_slice(rvecs);
        let mut g = [Vec3::new_zero(); 3];

        match nvec {
            0 => {}
            1 => {
                let rr = r[0].dot(r[0]);
                if rr < 1e-12 {
                    return Err(ParamError::new("Degenerate cell: zero lattice vector"));
                }
                g[0] = r[0] * (1. / rr);
            }
            2 => {
                // Invert the 2x2 Gram matrix of the two spanning vectors.
                let (aa, ab, bb) = (r[0].dot(r[0]), r[0].dot(r[1]), r[1].dot(r[1]));
                let det = aa * bb - ab * ab;
                if det.abs() < 1e-12 {
                    return Err(ParamError::new(
                        "Degenerate cell: lattice vectors are linearly dependent",
                    ));
                }
                g[0] = (r[0] * bb - r[1] * ab) * (1. / det);
                g[1] = (r[1] * aa - r[0] * ab) * (1. / det);
            }
            _ => {
                let det = r[0].dot(r[1].cross(r[2]));
                if det.abs() < 1e-12 {
                    return Err(ParamError::new(
                        "Degenerate cell: lattice vectors are linearly dependent",
                    ));
                }
                g[0] = r[1].cross(r[2]) * (1. / det);
                g[1] = r[2].cross(r[0]) * (1. / det);
                g[2] = r[0].cross(r[1]) * (1. / det);
            }
        }

        Ok(Self {
            rvecs: r,
            gvecs: g,
            nvec,
        })
    }

    /// Build a cell from caller-supplied real and reciprocal vectors, e.g.
    /// when a collaborating layer already owns the reciprocal matrix. The
    /// duality of the two sets is the caller's responsibility.
    pub fn from_parts(rvecs: &[Vec3], gvecs: &[Vec3]) -> Result<Self, ParamError> {
        if rvecs.len() != gvecs.len() || rvecs.len() > 3 {
            return Err(ParamError::new(
                "Cell requires matching real and reciprocal vector counts, at most 3",
            ));
        }
        let nvec = rvecs.len();

        let mut r = [Vec3::new_zero(); 3];
        let mut g = [Vec3::new_zero(); 3];
        r[..nvec].copy_from_slice(rvecs);
        g[..nvec].copy_from_slice(gvecs);

        Ok(Self {
            rvecs: r,
            gvecs: g,
            nvec,
        })
    }

    /// Number of periodic directions, 0-3.
    pub fn nvec(&self) -> usize {
        self.nvec
    }

    /// The active lattice vectors.
    pub fn rvecs(&self) -> &[Vec3] {
        &self.rvecs[..self.nvec]
    }

    /// The active reciprocal vectors.
    pub fn gvecs(&self) -> &[Vec3] {
        &self.gvecs[..self.nvec]
    }

    /// Fold a displacement to the nearest periodic image: for each periodic
    /// direction in order, round off the fractional coordinate along the
    /// matching reciprocal vector. For strongly skewed triclinic cells the
    /// per-direction rounding is not guaranteed to find the global minimum;
    /// the host is expected to keep cell aspect ratios reasonable.
    pub fn min_image(&self, mut dv: Vec3) -> Vec3 {
        for k in 0..self.nvec {
            let shift = self.gvecs[k].dot(dv).round();
            dv -= self.rvecs[k] * shift;
        }
        dv
    }
}
