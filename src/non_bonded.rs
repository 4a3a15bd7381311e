//! Non-bonded pair interactions: a neighbour-list scan with bonded exclusion
//! scaling, and the scalar pair kernels it drives (Lennard-Jones, and
//! electrostatics with optional Ewald real-space damping).

use std::f64::consts::FRAC_2_SQRT_PI;

use bincode::{Decode, Encode};
use lin_alg::f64::Vec3;
use serde::{Deserialize, Serialize};

use crate::ParamError;

/// One precomputed neighbour of a centre atom. A zero `image` offset is the
/// in-cell copy of the other atom; a non-zero offset is a periodic image.
/// `disp` points from the other atom (or its image) to the centre.
#[derive(Clone, Copy, Debug)]
pub struct NeighborEntry {
    pub other: usize,
    pub image: [i32; 3],
    pub disp: Vec3,
    pub dist: f64,
}

impl NeighborEntry {
    pub fn new(other: usize, image: [i32; 3], disp: Vec3) -> Self {
        Self {
            other,
            image,
            disp,
            dist: disp.magnitude(),
        }
    }
}

/// Exclusion factor for one bonded neighbour of a centre atom: 0 for 1-2 and
/// 1-3 pairs, a fractional value for 1-4 pairs, per the usual force-field
/// conventions. Lists are kept sorted ascending by `other`; the scan walks
/// them with a monotone cursor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ScalingEntry {
    pub other: usize,
    pub scale: f64,
}

/// A scalar pair potential. When a gradient is requested, `g` receives the
/// derivative of the pair energy with respect to distance, divided by the
/// distance; the scan turns that into a Cartesian force along the pair
/// displacement.
pub trait PairKernel {
    fn energy(&self, center: usize, other: usize, dist: f64, g: Option<&mut f64>) -> f64;
}

/// Per-atom Lennard-Jones parameters. Pair values use Lorentz-Berthelot
/// mixing: arithmetic-mean σ, geometric-mean ε.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct LjParams {
    /// Å
    pub sigma: Vec<f64>,
    /// Same energy unit as the rest of the force field.
    pub epsilon: Vec<f64>,
}

impl PairKernel for LjParams {
    fn energy(&self, center: usize, other: usize, dist: f64, g: Option<&mut f64>) -> f64 {
        let sigma = 0.5 * (self.sigma[center] + self.sigma[other]);
        let epsilon = (self.epsilon[center] * self.epsilon[other]).sqrt();

        let mut x = sigma / dist;
        x *= x;
        x *= x * x;

        if let Some(g) = g {
            *g = 24. * epsilon / sigma / dist / dist * x * (1. - 2. * x);
        }
        4. * epsilon * (x * (x - 1.))
    }
}

/// Per-atom point charges, with an optional Ewald real-space damping width.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct EiParams {
    pub charges: Vec<f64>,
    /// Inverse length. Positive values damp the interaction by erfc(α·d), the
    /// real-space half of an Ewald split; zero or negative gives the plain
    /// Coulomb form.
    pub alpha: f64,
}

impl PairKernel for EiParams {
    fn energy(&self, center: usize, other: usize, dist: f64, g: Option<&mut f64>) -> f64 {
        let qprod = self.charges[center] * self.charges[other];

        let pot = if self.alpha > 0. {
            let x = self.alpha * dist;
            let pot = libm::erfc(x) / dist;
            if let Some(g) = g {
                *g = (-FRAC_2_SQRT_PI * self.alpha * (-x * x).exp() - pot) / dist * (qprod / dist);
            }
            pot
        } else {
            let pot = 1. / dist;
            if let Some(g) = g {
                *g = -pot / dist * (qprod / dist);
            }
            pot
        };

        qprod * pot
    }
}

/// Descriptor for one non-bonded interaction: a pair kernel (with its
/// parameter block) and a cutoff distance. The kernel set is open; anything
/// implementing [`PairKernel`] can be attached.
#[derive(Default)]
pub struct PairPot {
    kernel: Option<Box<dyn PairKernel>>,
    cutoff: f64,
}

impl PairPot {
    pub fn new() -> Self {
        Self {
            kernel: None,
            cutoff: 0.,
        }
    }

    /// A scan can only run once a kernel (and its parameters) is attached.
    pub fn ready(&self) -> bool {
        self.kernel.is_some()
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn set_cutoff(&mut self, cutoff: f64) {
        self.cutoff = cutoff;
    }

    pub fn attach(&mut self, kernel: Box<dyn PairKernel>) {
        self.kernel = Some(kernel);
    }

    /// Drop the kernel and its parameters; `ready` reports false again.
    pub fn detach(&mut self) {
        self.kernel = None;
    }

    pub fn attach_lj(&mut self, sigma: Vec<f64>, epsilon: Vec<f64>) {
        self.attach(Box::new(LjParams { sigma, epsilon }));
    }

    pub fn attach_ei(&mut self, charges: Vec<f64>, alpha: f64) {
        self.attach(Box::new(EiParams { charges, alpha }));
    }

    /// Accumulate the non-bonded energy of one centre atom against its
    /// neighbour list, and, when a gradient buffer is supplied, the forces on
    /// the centre and each neighbour.
    ///
    /// Home-image neighbours take their scale from the sorted scaling list
    /// (default 1); periodic-image neighbours are fixed at 0.5, which undoes
    /// the double counting of pairs that appear from both centres and halves
    /// a centre's interaction with its own images.
    pub fn energy_gradient(
        &self,
        center: usize,
        nlist: &[NeighborEntry],
        scaling: &[ScalingEntry],
        mut gradient: Option<&mut [Vec3]>,
    ) -> Result<f64, ParamError> {
        let Some(kernel) = self.kernel.as_ref() else {
            return Err(ParamError::new(
                "Pair potential is not ready; no kernel attached",
            ));
        };

        let mut energy = 0.;
        let mut cursor = 0;

        for entry in nlist {
            if entry.dist >= self.cutoff {
                continue;
            }

            let s = if entry.image == [0, 0, 0] {
                scale_lookup(scaling, center, entry.other, &mut cursor)
            } else {
                0.5
            };
            if s <= 0. {
                continue;
            }

            match gradient.as_deref_mut() {
                None => {
                    energy += s * kernel.energy(center, entry.other, entry.dist, None);
                }
                Some(grad) => {
                    let mut g = 0.;
                    energy += s * kernel.energy(center, entry.other, entry.dist, Some(&mut g));
                    g *= s;
                    grad[center] += entry.disp * g;
                    grad[entry.other] -= entry.disp * g;
                }
            }
        }

        Ok(energy)
    }
}

/// Advance the cursor to the first entry at or past `other`; matched entries
/// supply their scale, anything unlisted defaults to 1. The centre atom
/// itself never interacts with its home copy.
fn scale_lookup(scaling: &[ScalingEntry], center: usize, other: usize, cursor: &mut usize) -> f64 {
    if other == center {
        return 0.;
    }
    while *cursor < scaling.len() && scaling[*cursor].other < other {
        *cursor += 1;
    }
    match scaling.get(*cursor) {
        Some(entry) if entry.other == other => entry.scale,
        _ => 1.,
    }
}
