//! Numerical core of a classical molecular-mechanics force field: the kernels
//! that turn atom positions and a periodic lattice into a potential energy and
//! its analytic Cartesian gradient.
//!
//! The evaluation is layered. A [`DispList`] materialises pair displacement
//! vectors under minimum-image conventions. An [`IcList`] reduces those to
//! scalar internal coordinates (bond lengths, bend/dihedral/out-of-plane
//! angles or cosines). Energy terms read the scalar values and write scalar
//! gradients back; the back passes then chain-rule those gradients down
//! through the displacement vectors onto the atoms. Non-bonded interactions
//! bypass the tables: [`PairPot`] scans a precomputed neighbour list and
//! accumulates energy and forces directly, honouring 1-2/1-3/1-4 exclusion
//! scaling.
//!
//! Neighbour-list construction, topology assignment, integration, and
//! long-range reciprocal-space electrostatics are deliberately left to
//! collaborating layers; this crate owns only the inner evaluation loops.

use std::{error::Error, fmt};

use lin_alg::f64::Vec3;

pub mod ambient;
pub mod displacement;
pub mod internal_coords;
pub mod non_bonded;
pub mod valence;

pub use crate::{
    ambient::SimCell,
    displacement::{DispList, DispRow},
    internal_coords::{IcKind, IcList, IcRow},
    non_bonded::{EiParams, LjParams, NeighborEntry, PairKernel, PairPot, ScalingEntry},
    valence::{ValenceKind, ValenceList, ValenceRow},
};

#[derive(Clone, Debug, PartialEq)]
pub struct ParamError {
    pub descrip: String,
}

impl ParamError {
    pub fn new(descrip: &str) -> Self {
        Self {
            descrip: descrip.to_owned(),
        }
    }
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descrip)
    }
}

impl Error for ParamError {}

/// The bonded half of a force field: the displacement and internal-coordinate
/// tables, plus the valence terms that read them. Built once by the topology
/// layer, then re-evaluated every step.
#[derive(Clone, Debug, Default)]
pub struct BondedSystem {
    pub deltas: DispList,
    pub ics: IcList,
    pub terms: ValenceList,
}

impl BondedSystem {
    pub fn new(deltas: DispList, ics: IcList, terms: ValenceList) -> Self {
        Self { deltas, ics, terms }
    }

    /// One full evaluation: refresh both tables from the positions, sum the
    /// valence energy, and, when a gradient buffer is supplied, chain the
    /// scalar gradients back onto the atoms. The caller zeroes (or seeds) the
    /// gradient buffer; contributions here are accumulated into it.
    pub fn energy_gradient(
        &mut self,
        posits: &[Vec3],
        cell: &SimCell,
        gradient: Option<&mut [Vec3]>,
    ) -> f64 {
        self.deltas.forward(posits, cell);
        self.ics.forward(&self.deltas);

        let energy = self.terms.energy(&self.ics);

        if let Some(grad) = gradient {
            self.terms.back(&mut self.ics);
            self.ics.back(&mut self.deltas);
            self.deltas.back(grad);
        }

        energy
    }
}
