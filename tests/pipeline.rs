//! Whole-pipeline tests: a bonded chain plus non-bonded interactions with
//! 1-2/1-3/1-4 scaling, evaluated per-centre over half neighbour lists, and
//! the bonded pipeline folded through a periodic cell.

mod common;

use common::{FD_TOL, assert_force_sum_zero, assert_gradients_match, finite_difference_gradient};
use ff_kernels::{
    BondedSystem, DispList, IcList, IcRow, NeighborEntry, PairPot, ScalingEntry, SimCell,
    ValenceKind, ValenceList, ValenceRow,
};
use itertools::Itertools;
use lin_alg::f64::Vec3;

fn zeros(n: usize) -> Vec<Vec3> {
    vec![Vec3::new_zero(); n]
}

/// Half neighbour lists (each pair listed once, from its lower-index centre),
/// home images only.
fn half_nlists(posits: &[Vec3]) -> Vec<Vec<NeighborEntry>> {
    let mut lists = vec![Vec::new(); posits.len()];
    for (i, j) in (0..posits.len()).tuple_combinations() {
        lists[i].push(NeighborEntry::new(j, [0, 0, 0], posits[i] - posits[j]));
    }
    lists
}

fn chain_system() -> BondedSystem {
    BondedSystem::new(
        DispList::new(&[(1, 0), (2, 1), (3, 2)]),
        IcList::new(vec![
            IcRow::bond(0),
            IcRow::bond(1),
            IcRow::bond(2),
            IcRow::bend_angle(0, 1, 1., 1.),
            IcRow::bend_angle(1, 2, 1., 1.),
            IcRow::dihed_angle(0, 1, 2, 1., 1.),
        ]),
        ValenceList::new(vec![
            ValenceRow {
                term: ValenceKind::Fues { fc: 250., rv: 1.2 },
                ic: 0,
            },
            ValenceRow {
                term: ValenceKind::Harmonic { fc: 280., rv: 1.3 },
                ic: 1,
            },
            ValenceRow {
                term: ValenceKind::Harmonic { fc: 260., rv: 1.4 },
                ic: 2,
            },
            ValenceRow {
                term: ValenceKind::Harmonic { fc: 45., rv: 1.9 },
                ic: 3,
            },
            ValenceRow {
                term: ValenceKind::Harmonic { fc: 45., rv: 2.0 },
                ic: 4,
            },
            ValenceRow {
                term: ValenceKind::Cosine {
                    m: 3.,
                    a: 1.5,
                    rv: 0.,
                },
                ic: 5,
            },
        ]),
    )
}

/// Amber-style exclusions for the 4-atom chain: 1-2 and 1-3 pairs fully
/// excluded, the single 1-4 pair at half strength.
fn chain_scaling() -> Vec<Vec<ScalingEntry>> {
    vec![
        vec![
            ScalingEntry {
                other: 1,
                scale: 0.,
            },
            ScalingEntry {
                other: 2,
                scale: 0.,
            },
            ScalingEntry {
                other: 3,
                scale: 0.5,
            },
        ],
        vec![
            ScalingEntry {
                other: 2,
                scale: 0.,
            },
            ScalingEntry {
                other: 3,
                scale: 0.,
            },
        ],
        vec![ScalingEntry {
            other: 3,
            scale: 0.,
        }],
        Vec::new(),
    ]
}

#[test]
fn fd_bonded_plus_non_bonded() {
    let posits = vec![
        Vec3::new(0., 0.1, 0.3),
        Vec3::new(1.2, -0.1, 0.),
        Vec3::new(1.7, 1.1, 0.2),
        Vec3::new(2.9, 1.4, 1.0),
    ];

    let mut system = chain_system();
    let scaling = chain_scaling();
    let cell = SimCell::aperiodic();

    let mut pot = PairPot::new();
    pot.attach_lj(vec![1.; 4], vec![0.15, 0.2, 0.2, 0.15]);
    pot.set_cutoff(12.);

    let mut analytic = zeros(4);
    let mut energy = system.energy_gradient(&posits, &cell, Some(&mut analytic));
    for (i, nlist) in half_nlists(&posits).iter().enumerate() {
        energy += pot
            .energy_gradient(i, nlist, &scaling[i], Some(&mut analytic))
            .unwrap();
    }
    assert!(energy.is_finite());

    let numeric = finite_difference_gradient(&posits, |p| {
        let mut e = system.energy_gradient(p, &cell, None);
        for (i, nlist) in half_nlists(p).iter().enumerate() {
            e += pot.energy_gradient(i, nlist, &scaling[i], None).unwrap();
        }
        e
    });

    assert_gradients_match("bonded + non-bonded", &analytic, &numeric, FD_TOL);
    assert_force_sum_zero("bonded + non-bonded", &analytic);
}

#[test]
fn bonded_gradient_flows_through_periodic_fold() {
    // Two bonded atoms on opposite sides of a cell boundary; the folded bond
    // is short even though the raw displacement is not.
    let cell = SimCell::new(&[
        Vec3::new(2., 0., 0.),
        Vec3::new(0., 8., 0.),
        Vec3::new(0., 0., 8.),
    ])
    .unwrap();
    let posits = vec![Vec3::new(0.1, 1., 1.), Vec3::new(1.9, 1.2, 1.1)];

    let mut system = BondedSystem::new(
        DispList::new(&[(0, 1)]),
        IcList::new(vec![IcRow::bond(0)]),
        ValenceList::new(vec![ValenceRow {
            term: ValenceKind::Harmonic { fc: 300., rv: 0.25 },
            ic: 0,
        }]),
    );

    let mut analytic = zeros(2);
    system.energy_gradient(&posits, &cell, Some(&mut analytic));

    let folded = system.deltas.rows[0].disp;
    assert!((folded.magnitude() - system.ics.rows[0].value).abs() < 1e-12);
    assert!(system.ics.rows[0].value < 0.5, "bond did not fold");

    let numeric =
        finite_difference_gradient(&posits, |p| system.energy_gradient(p, &cell, None));
    assert_gradients_match("periodic bond", &analytic, &numeric, FD_TOL);
    assert_force_sum_zero("periodic bond", &analytic);
}

#[test]
fn newton_third_law_per_pair() {
    // Every pair contribution lands with equal magnitude and opposite sign on
    // its two endpoints; probe with a single scan against several neighbours.
    let posits = vec![
        Vec3::new(0., 0., 0.),
        Vec3::new(1.4, 0.2, -0.1),
        Vec3::new(-0.8, 1.1, 0.7),
    ];

    let mut pot = PairPot::new();
    pot.attach_ei(vec![0.6, -0.4, 0.9], 0.35);
    pot.set_cutoff(10.);

    for other in 1..3 {
        let nlist = [NeighborEntry::new(
            other,
            [0, 0, 0],
            posits[0] - posits[other],
        )];
        let mut gradient = zeros(3);
        pot.energy_gradient(0, &nlist, &[], Some(&mut gradient))
            .unwrap();

        assert_eq!(gradient[0].x, -gradient[other].x);
        assert_eq!(gradient[0].y, -gradient[other].y);
        assert_eq!(gradient[0].z, -gradient[other].z);
    }
}
