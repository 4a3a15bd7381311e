//! Internal coordinates: scalar geometric measures (bond lengths, bend,
//! dihedral and out-of-plane angles or their cosines) computed from
//! displacement rows, with analytic back-propagation of scalar gradients
//! onto those rows.
//!
//! Each row is evaluated in two passes. The forward pass writes `value` and
//! zeroes `grad`; an energy-term layer then accumulates ∂E/∂value into
//! `grad`; the back pass multiplies `grad` by the Jacobian of the geometric
//! reduction and adds the result to the gradient accumulators of the
//! referenced displacements.

use crate::displacement::{DispList, DispRow};

/// The geometric reduction a row applies to its displacement(s).
///
/// `BondAlt` is a second bond-length slot that dispatches identically to
/// `Bond` in both directions; some parameterisations key bond terms off two
/// distinct kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IcKind {
    Bond = 0,
    BendCos = 1,
    BendAngle = 2,
    DihedCos = 3,
    DihedAngle = 4,
    BondAlt = 5,
    OopCos = 6,
    OopAngle = 7,
}

/// One internal coordinate: up to three displacement-row indices with ±1
/// orientation flags, the computed scalar, and its incoming gradient.
///
/// The sign flags let two rows traverse a shared displacement in opposite
/// directions without duplicating its storage.
#[derive(Clone, Copy, Debug)]
pub struct IcRow {
    pub kind: IcKind,
    pub i0: usize,
    pub i1: usize,
    pub i2: usize,
    pub sign0: f64,
    pub sign1: f64,
    pub sign2: f64,
    /// Output of the forward pass.
    pub value: f64,
    /// ∂E/∂value, written by the energy-term layer between the passes.
    pub grad: f64,
}

impl IcRow {
    pub fn new(kind: IcKind, indexes: [usize; 3], signs: [f64; 3]) -> Self {
        Self {
            kind,
            i0: indexes[0],
            i1: indexes[1],
            i2: indexes[2],
            sign0: signs[0],
            sign1: signs[1],
            sign2: signs[2],
            value: 0.,
            grad: 0.,
        }
    }

    pub fn bond(i0: usize) -> Self {
        Self::new(IcKind::Bond, [i0, 0, 0], [1., 1., 1.])
    }

    pub fn bond_alt(i0: usize) -> Self {
        Self::new(IcKind::BondAlt, [i0, 0, 0], [1., 1., 1.])
    }

    pub fn bend_cos(i0: usize, i1: usize, sign0: f64, sign1: f64) -> Self {
        Self::new(IcKind::BendCos, [i0, i1, 0], [sign0, sign1, 1.])
    }

    pub fn bend_angle(i0: usize, i1: usize, sign0: f64, sign1: f64) -> Self {
        Self::new(IcKind::BendAngle, [i0, i1, 0], [sign0, sign1, 1.])
    }

    pub fn dihed_cos(i0: usize, i1: usize, i2: usize, sign0: f64, sign2: f64) -> Self {
        Self::new(IcKind::DihedCos, [i0, i1, i2], [sign0, 1., sign2])
    }

    pub fn dihed_angle(i0: usize, i1: usize, i2: usize, sign0: f64, sign2: f64) -> Self {
        Self::new(IcKind::DihedAngle, [i0, i1, i2], [sign0, 1., sign2])
    }

    pub fn oop_cos(i0: usize, i1: usize, i2: usize) -> Self {
        Self::new(IcKind::OopCos, [i0, i1, i2], [1., 1., 1.])
    }

    pub fn oop_angle(i0: usize, i1: usize, i2: usize) -> Self {
        Self::new(IcKind::OopAngle, [i0, i1, i2], [1., 1., 1.])
    }
}

#[derive(Clone, Debug, Default)]
pub struct IcList {
    pub rows: Vec<IcRow>,
}

impl IcList {
    pub fn new(rows: Vec<IcRow>) -> Self {
        Self { rows }
    }

    /// Recompute every scalar from the (already refreshed) displacement table
    /// and reset the scalar gradients.
    pub fn forward(&mut self, deltas: &DispList) {
        for ic in &mut self.rows {
            ic.value = match ic.kind {
                IcKind::Bond | IcKind::BondAlt => forward_bond(ic, &deltas.rows),
                IcKind::BendCos => forward_bend_cos(ic, &deltas.rows),
                IcKind::BendAngle => forward_bend_angle(ic, &deltas.rows),
                IcKind::DihedCos => forward_dihed_cos(ic, &deltas.rows),
                IcKind::DihedAngle => forward_dihed_angle(ic, &deltas.rows),
                IcKind::OopCos => forward_oop_cos(ic, &deltas.rows),
                IcKind::OopAngle => forward_oop_angle(ic, &deltas.rows),
            };
            ic.grad = 0.;
        }
    }

    /// Chain each row's scalar gradient onto the gradient accumulators of the
    /// displacements it reads. Must run after `forward` (and after the energy
    /// terms have filled in the scalar gradients).
    pub fn back(&self, deltas: &mut DispList) {
        for ic in &self.rows {
            match ic.kind {
                IcKind::Bond | IcKind::BondAlt => back_bond(ic, &mut deltas.rows, ic.value, ic.grad),
                IcKind::BendCos => back_bend_cos(ic, &mut deltas.rows, ic.value, ic.grad),
                IcKind::BendAngle => back_bend_angle(ic, &mut deltas.rows, ic.value, ic.grad),
                IcKind::DihedCos => back_dihed_cos(ic, &mut deltas.rows, ic.value, ic.grad),
                IcKind::DihedAngle => back_dihed_angle(ic, &mut deltas.rows, ic.value, ic.grad),
                IcKind::OopCos => back_oop_cos(ic, &mut deltas.rows, ic.value, ic.grad),
                IcKind::OopAngle => back_oop_angle(ic, &mut deltas.rows, ic.value, ic.grad),
            }
        }
    }
}

fn forward_bond(ic: &IcRow, deltas: &[DispRow]) -> f64 {
    deltas[ic.i0].disp.magnitude()
}

fn forward_bend_cos(ic: &IcRow, deltas: &[DispRow]) -> f64 {
    let d0 = deltas[ic.i0].disp;
    let d1 = deltas[ic.i1].disp;
    let n0 = d0.magnitude();
    let n1 = d1.magnitude();
    if n0 == 0. || n1 == 0. {
        return 0.;
    }
    ic.sign0 * ic.sign1 * d0.dot(d1) / (n0 * n1)
}

fn forward_bend_angle(ic: &IcRow, deltas: &[DispRow]) -> f64 {
    forward_bend_cos(ic, deltas).clamp(-1., 1.).acos()
}

fn forward_dihed_cos(ic: &IcRow, deltas: &[DispRow]) -> f64 {
    let d0 = deltas[ic.i0].disp;
    let d1 = deltas[ic.i1].disp;
    let d2 = deltas[ic.i2].disp;

    // Project the outer displacements onto the plane normal to the axis d1,
    // then take the cosine between the projections.
    let n1 = d1.magnitude();
    let p0 = d0.dot(d1) / n1;
    let p2 = d1.dot(d2) / n1;
    let a = d0 - d1 * (p0 / n1);
    let b = d2 - d1 * (p2 / n1);

    ic.sign0 * ic.sign2 * a.dot(b) / (a.magnitude() * b.magnitude())
}

fn forward_dihed_angle(ic: &IcRow, deltas: &[DispRow]) -> f64 {
    // Round-off can push the cosine just past ±1.
    forward_dihed_cos(ic, deltas).clamp(-1., 1.).acos()
}

fn forward_oop_cos(ic: &IcRow, deltas: &[DispRow]) -> f64 {
    let d0 = deltas[ic.i0].disp;
    let d1 = deltas[ic.i1].disp;
    let d2 = deltas[ic.i2].disp;

    // Normal to the plane spanned by the first two displacements.
    let n = d0.cross(d1);
    let n_sq = n.magnitude_squared();
    let d2_sq = d2.magnitude_squared();
    let dot = n.dot(d2);

    // Cosine of the angle between d2 and the plane; magnitude only, so the
    // result is non-negative.
    (1. - dot * dot / (d2_sq * n_sq)).max(0.).sqrt()
}

fn forward_oop_angle(ic: &IcRow, deltas: &[DispRow]) -> f64 {
    forward_oop_cos(ic, deltas).clamp(-1., 1.).acos()
}

fn back_bond(ic: &IcRow, deltas: &mut [DispRow], value: f64, grad: f64) {
    // d|δ|/dδ = δ/|δ|. Zero-length bonds are excluded by construction.
    let row = &mut deltas[ic.i0];
    let x = grad / value;
    row.grad += row.disp * x;
}

fn back_bend_cos(ic: &IcRow, deltas: &mut [DispRow], value: f64, grad: f64) {
    let d0 = deltas[ic.i0].disp;
    let d1 = deltas[ic.i1].disp;
    let n0 = d0.magnitude();
    let n1 = d1.magnitude();
    let e0 = d0 * (1. / n0);
    let e1 = d1 * (1. / n1);

    // Strip the orientation flags so `value` is the plain cosine e0·e1.
    let fac = ic.sign0 * ic.sign1;
    let grad = grad * fac;
    let value = value * fac;

    deltas[ic.i0].grad += (e1 - e0 * value) * (grad / n0);
    deltas[ic.i1].grad += (e0 - e1 * value) * (grad / n1);
}

fn back_bend_angle(ic: &IcRow, deltas: &mut [DispRow], value: f64, grad: f64) {
    // dcos(θ)/dθ = -sin(θ); at a collinear geometry the derivative is
    // undefined and the contribution is suppressed.
    let s = value.sin();
    let grad_cos = if s == 0. { 0. } else { -grad / s };
    back_bend_cos(ic, deltas, value.cos(), grad_cos);
}

fn back_dihed_cos(ic: &IcRow, deltas: &mut [DispRow], value: f64, grad: f64) {
    let d0 = deltas[ic.i0].disp;
    let d1 = deltas[ic.i1].disp;
    let d2 = deltas[ic.i2].disp;

    let n1_sq = d1.magnitude_squared();
    let dot0 = d0.dot(d1);
    let dot2 = d1.dot(d2);

    // The same plane projections as the forward pass.
    let a = d0 - d1 * (dot0 / n1_sq);
    let b = d2 - d1 * (dot2 / n1_sq);
    let na = a.magnitude();
    let nb = b.magnitude();

    let sign = ic.sign0 * ic.sign2;
    let value = value * sign;
    let grad = grad * sign;

    // ∂cos/∂a and ∂cos/∂b for cos = a·b/(|a||b|).
    let dcos_da = (b * (1. / nb) - a * (value / na)) * (1. / na);
    let dcos_db = (a * (1. / na) - b * (value / nb)) * (1. / nb);

    // ∂a/∂δ0 (and by symmetry ∂b/∂δ2) is the projector I - d1·d1ᵀ/|d1|²: the
    // outer rows receive the projected cosine gradients directly.
    let g0 = (dcos_da - d1 * (d1.dot(dcos_da) / n1_sq)) * grad;
    let g2 = (dcos_db - d1 * (d1.dot(dcos_db) / n1_sq)) * grad;

    // The axis row collects (∂a/∂δ1)ᵀ·∂cos/∂a + (∂b/∂δ1)ᵀ·∂cos/∂b, in closed
    // form from the dot products above.
    let ja = d1 * ((2. * dot0 * d1.dot(dcos_da) / n1_sq - d0.dot(dcos_da)) / n1_sq)
        - dcos_da * (dot0 / n1_sq);
    let jb = d1 * ((2. * dot2 * d1.dot(dcos_db) / n1_sq - d2.dot(dcos_db)) / n1_sq)
        - dcos_db * (dot2 / n1_sq);
    let g1 = (ja + jb) * grad;

    deltas[ic.i0].grad += g0;
    deltas[ic.i1].grad += g1;
    deltas[ic.i2].grad += g2;
}

fn back_dihed_angle(ic: &IcRow, deltas: &mut [DispRow], value: f64, grad: f64) {
    let s = value.sin();
    let grad_cos = if s == 0. { 0. } else { -grad / s };
    back_dihed_cos(ic, deltas, value.cos(), grad_cos);
}

fn back_oop_cos(ic: &IcRow, deltas: &mut [DispRow], value: f64, grad: f64) {
    let d0 = deltas[ic.i0].disp;
    let d1 = deltas[ic.i1].disp;
    let d2 = deltas[ic.i2].disp;

    let n = d0.cross(d1);
    let d1_x_d2 = d1.cross(d2);
    let d2_x_d0 = d2.cross(d0);

    let n_sq = n.magnitude_squared();
    let d2_sq = d2.magnitude_squared();
    let n_dot_d2 = n.dot(d2);

    // With f = n·d2/(|n||d2|), the forward value is cos(φ) = sqrt(1 - f²),
    // so every partial is -f/cos(φ) times the matching partial of f. The
    // division by `value` is singular at φ = 90°; callers must not configure
    // geometries with the third displacement normal to the plane.
    let fac = n_dot_d2 / (d2_sq * n_sq);
    let coeff = -fac / value * grad;

    deltas[ic.i0].grad += (d1_x_d2 - d1.cross(n) * (n_dot_d2 / n_sq)) * coeff;
    deltas[ic.i1].grad += (d2_x_d0 - n.cross(d0) * (n_dot_d2 / n_sq)) * coeff;
    deltas[ic.i2].grad += (n - d2 * (n_dot_d2 / d2_sq)) * coeff;
}

fn back_oop_angle(ic: &IcRow, deltas: &mut [DispRow], value: f64, grad: f64) {
    let s = value.sin();
    let grad_cos = if s == 0. { 0. } else { -grad / s };
    back_oop_cos(ic, deltas, value.cos(), grad_cos);
}
