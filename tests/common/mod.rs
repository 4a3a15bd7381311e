//! Shared helpers for the integration tests: finite-difference gradients and
//! tolerance assertions.

#![allow(dead_code)]

use lin_alg::f64::Vec3;

/// Central-difference step.
pub const FD_STEP: f64 = 1e-5;
/// Per-component agreement required between analytic and numeric gradients.
pub const FD_TOL: f64 = 1e-6;

pub fn axis(v: Vec3, k: usize) -> f64 {
    match k {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

pub fn set_axis(v: &mut Vec3, k: usize, val: f64) {
    match k {
        0 => v.x = val,
        1 => v.y = val,
        _ => v.z = val,
    }
}

/// Central-difference gradient of `energy` with respect to every atom
/// coordinate.
pub fn finite_difference_gradient(
    posits: &[Vec3],
    mut energy: impl FnMut(&[Vec3]) -> f64,
) -> Vec<Vec3> {
    let mut result = Vec::with_capacity(posits.len());
    let mut work = posits.to_vec();

    for i in 0..posits.len() {
        let mut g = Vec3::new_zero();
        for k in 0..3 {
            let base = axis(posits[i], k);

            set_axis(&mut work[i], k, base + FD_STEP);
            let e_plus = energy(&work);
            set_axis(&mut work[i], k, base - FD_STEP);
            let e_minus = energy(&work);
            set_axis(&mut work[i], k, base);

            set_axis(&mut g, k, (e_plus - e_minus) / (2. * FD_STEP));
        }
        result.push(g);
    }

    result
}

/// Assert that two per-atom gradients agree component-wise.
pub fn assert_gradients_match(label: &str, analytic: &[Vec3], numeric: &[Vec3], tol: f64) {
    assert_eq!(analytic.len(), numeric.len());
    for (i, (a, n)) in analytic.iter().zip(numeric).enumerate() {
        for k in 0..3 {
            let diff = (axis(*a, k) - axis(*n, k)).abs();
            assert!(
                diff < tol,
                "{label}: gradient mismatch on atom {i} axis {k}: \
                 analytic {:.9e}, numeric {:.9e}, diff {diff:.2e}",
                axis(*a, k),
                axis(*n, k),
            );
        }
    }
}

pub fn assert_vec3_close(label: &str, a: Vec3, b: Vec3, tol: f64) {
    assert!(
        (a - b).magnitude() < tol,
        "{label}: expected {b}, got {a}",
    );
}

/// Sum of all per-atom gradient contributions; zero for any translation-
/// invariant energy (Newton's third law).
pub fn assert_force_sum_zero(label: &str, gradient: &[Vec3]) {
    let mut total = Vec3::new_zero();
    for g in gradient {
        total += *g;
    }
    assert!(
        total.magnitude() < 1e-10,
        "{label}: net force magnitude {:.2e}",
        total.magnitude()
    );
}
