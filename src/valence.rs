//! Bonded energy terms: functional forms that map internal-coordinate values
//! to energy, and feed ∂E/∂value back into the internal-coordinate table for
//! the gradient passes below it.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::internal_coords::IcList;

/// Functional form of one bonded term, applied to a single internal
/// coordinate `q`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Encode, Decode)]
pub enum ValenceKind {
    /// ½·fc·(q − rv)²
    Harmonic { fc: f64, rv: f64 },
    /// ½·fc·rv²·(1 + rv/q·(rv/q − 2)). Same rest value and curvature as
    /// `Harmonic`, but diverges as q → 0, which suits bond lengths.
    Fues { fc: f64, rv: f64 },
    /// ½·a·(1 − cos(m·(q − rv))), for dihedral angles with multiplicity m.
    Cosine { m: f64, a: f64, rv: f64 },
}

/// One bonded term and the internal-coordinate row it reads.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct ValenceRow {
    pub term: ValenceKind,
    pub ic: usize,
}

#[derive(Clone, Debug, Default)]
pub struct ValenceList {
    pub rows: Vec<ValenceRow>,
}

impl ValenceList {
    pub fn new(rows: Vec<ValenceRow>) -> Self {
        Self { rows }
    }

    /// Total bonded energy over the current internal-coordinate values.
    pub fn energy(&self, ics: &IcList) -> f64 {
        let mut result = 0.;
        for row in &self.rows {
            let q = ics.rows[row.ic].value;
            result += match row.term {
                ValenceKind::Harmonic { fc, rv } => {
                    let x = q - rv;
                    0.5 * fc * x * x
                }
                ValenceKind::Fues { fc, rv } => {
                    0.5 * fc * rv * rv * (1. + rv / q * (rv / q - 2.))
                }
                ValenceKind::Cosine { m, a, rv } => 0.5 * a * (1. - (m * (q - rv)).cos()),
            };
        }
        result
    }

    /// Accumulate each term's ∂E/∂q into the scalar gradient of its
    /// internal-coordinate row.
    pub fn back(&self, ics: &mut IcList) {
        for row in &self.rows {
            let ic = &mut ics.rows[row.ic];
            let q = ic.value;
            ic.grad += match row.term {
                ValenceKind::Harmonic { fc, rv } => fc * (q - rv),
                ValenceKind::Fues { fc, rv } => fc * rv * rv * rv / (q * q) * (1. - rv / q),
                ValenceKind::Cosine { m, a, rv } => 0.5 * a * m * (m * (q - rv)).sin(),
            };
        }
    }
}
