//! Fits must not care about the units of the observed profile.
//!
//! Mapping the profile through `scale · p + offset` leaves shift and
//! uncertainty unchanged and transforms the fitted scale and offset the same
//! way.

mod common;

use common::*;
use phasefit_core::backend::{available_backends, BackendKind};
use phasefit_core::{shift, vonmises_profile, FitOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// (kappa, n, std, shift, scale, offset)
const CASES: [(f64, usize, f64, f64, f64, f64); 4] = [
    (1.0, 256, 0.01, 0.0, 1.0, 0.0),
    (10.0, 64, 0.01, 1.0 / 3.0, 2e-3, 0.0),
    (100.0, 1024, 0.02, 0.2, 1e4, 0.0),
    (100.0, 2048, 0.01, 0.2, 1e4, -100.0),
];

fn assert_rel(got: f64, want: f64, rtol: f64, atol: f64, what: &str) {
    assert!(
        (got - want).abs() <= atol + rtol * want.abs(),
        "{}: {} vs {}",
        what,
        got,
        want
    );
}

#[test]
fn fit_is_invariant_under_affine_rescaling() {
    for backend in available_backends(&FitOptions::default()) {
        if backend.kind() == BackendKind::Presto {
            continue;
        }
        for &(kappa, n, std, s, scale, offset) in &CASES {
            let mut rng = StdRng::seed_from_u64(0);
            let template = vonmises_profile(kappa, n, 0.0).unwrap();
            let profile = add(&shift(&template, s).unwrap(), &gaussian(&mut rng, n, std));

            let r1 = backend.fit_full(&template, &profile, None).unwrap();
            let r2 = backend
                .fit_full(&template, &affine(&profile, scale, offset), None)
                .unwrap();

            let what = format!("{} kappa={} n={}", backend.kind(), kappa, n);
            assert_phase_close(r2.shift, r1.shift, 1.0 / (32 * n) as f64, &what);
            assert_rel(r2.uncertainty, r1.uncertainty, 1e-3, 0.0, &what);
            assert_rel(r2.scale, scale * r1.scale, 1e-3, 0.0, &what);
            assert_rel(r2.offset, offset + scale * r1.offset, 1e-3, 1e-6, &what);
        }
    }
}

#[test]
fn known_noise_scales_with_the_profile() {
    let template = vonmises_profile(30.0, 512, 0.0).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let profile = add(&shift(&template, 0.1).unwrap(), &gaussian(&mut rng, 512, 0.01));
    for backend in available_backends(&FitOptions::default()) {
        if backend.kind() == BackendKind::Presto {
            continue;
        }
        let r1 = backend
            .fit_full(&template, &profile, Some(phasefit_core::NoiseStd::Uniform(0.01)))
            .unwrap();
        let r2 = backend
            .fit_full(
                &template,
                &affine(&profile, 50.0, 3.0),
                Some(phasefit_core::NoiseStd::Uniform(0.5)),
            )
            .unwrap();
        assert_rel(r2.uncertainty, r1.uncertainty, 1e-9, 0.0, backend.kind().name());
    }
}
