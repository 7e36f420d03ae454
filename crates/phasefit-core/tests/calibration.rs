//! Calibration of the reported shift uncertainty.
//!
//! For each configuration, one fit supplies the uncertainty σ, then 100 fresh
//! noise realisations are fitted and the number of shift errors inside ±σ is
//! compared against the binomial 5% to 95% band for a normal distribution. A
//! calibrated σ fails one run in ten; each test retries with new seeds and
//! only fails if every seed does.

mod common;

use common::*;
use phasefit_core::backend::{available_backends, BackendKind, FitBackend};
use phasefit_core::{fftfit_full, shift, vonmises_profile, wrap, FitOptions, NoiseStd};
use rand::rngs::StdRng;
use rand::Rng;

const TRIALS: u64 = 100;
const TRIES: u64 = 8;

/// Pulse width, profile length, noise, true shift, scale and offset.
#[derive(Debug, Clone, Copy)]
struct Case {
    kappa: f64,
    n: usize,
    std: f64,
    shift: f64,
    scale: f64,
    offset: f64,
}

const CASES: [Case; 4] = [
    Case { kappa: 1.0, n: 256, std: 0.01, shift: 0.0, scale: 1.0, offset: 0.0 },
    Case { kappa: 10.0, n: 64, std: 0.01, shift: 1.0 / 3.0, scale: 1e-6, offset: 0.0 },
    Case { kappa: 100.0, n: 1024, std: 0.002, shift: 0.2, scale: 1e4, offset: 0.0 },
    Case { kappa: 100.0, n: 1024, std: 0.02, shift: 0.2, scale: 1e4, offset: 0.0 },
];

impl Case {
    fn template(&self) -> Vec<f64> {
        vonmises_profile(self.kappa, self.n, 0.0).unwrap()
    }

    /// `scale · (shift(template) + offset + noise)`
    fn observe(&self, template: &[f64], rng: &mut StdRng) -> Vec<f64> {
        let clean = shift(template, self.shift).unwrap();
        let noise = gaussian(rng, self.n, self.std);
        let noisy = add(&clean, &noise);
        affine(&noisy, self.scale, self.scale * self.offset)
    }
}

fn pure_backends() -> Vec<Box<dyn FitBackend>> {
    available_backends(&FitOptions::default())
        .into_iter()
        .filter(|b| b.kind() != BackendKind::Presto)
        .collect()
}

fn count_within(
    backend: &dyn FitBackend,
    case: &Case,
    template: &[f64],
    sigma: f64,
    rng: &mut StdRng,
) -> u64 {
    (0..TRIALS)
        .filter(|_| {
            let profile = case.observe(template, rng);
            let got = backend.fit_full(template, &profile, None).unwrap().shift;
            wrap(got - case.shift).abs() < sigma
        })
        .count() as u64
}

fn check_own_uncertainty(estimate: bool) {
    for backend in pure_backends() {
        for case in &CASES {
            let template = case.template();
            randomized(TRIES, 0, |rng| {
                let profile = case.observe(&template, rng);
                let std = NoiseStd::Uniform(case.scale * case.std);
                let r = backend
                    .fit_full(&template, &profile, if estimate { None } else { Some(std) })
                    .unwrap();
                assert!(r.uncertainty < 0.1, "uncertainty {} too large", r.uncertainty);

                let count = count_within(backend.as_ref(), case, &template, r.uncertainty, rng);
                assert_one_sigma_count(
                    count,
                    TRIALS,
                    &format!("{} {:?} estimate={}", backend.kind(), case, estimate),
                );
            });
        }
    }
}

#[test]
fn uncertainty_calibrated_with_known_noise() {
    check_own_uncertainty(false);
}

#[test]
fn uncertainty_calibrated_with_estimated_noise() {
    check_own_uncertainty(true);
}

#[test]
fn reference_uncertainty_describes_every_backend() {
    let narrow = Case { kappa: 1000.0, n: 4096, std: 0.01, shift: 0.7, scale: 1e4, offset: 0.0 };
    let mut cases = CASES.to_vec();
    cases.push(narrow);

    for backend in available_backends(&FitOptions::default()) {
        for case in &cases {
            let template = case.template();
            randomized(TRIES, 0, |rng| {
                let profile = case.observe(&template, rng);
                let r = fftfit_full(&template, &profile, None).unwrap();
                assert!(r.uncertainty < 0.1);

                let count = count_within(backend.as_ref(), case, &template, r.uncertainty, rng);
                assert_one_sigma_count(count, TRIALS, &format!("{} {:?}", backend.kind(), case));
            });
        }
    }
}

#[test]
fn randomized_stops_at_first_passing_seed() {
    let mut calls = 0;
    randomized(5, 0, |rng| {
        calls += 1;
        // Fails for the first seed only
        assert!(calls > 1 || rng.gen::<u64>() == u64::MAX);
    });
    assert_eq!(calls, 2);
}

#[test]
#[should_panic(expected = "check failed for every seed")]
fn randomized_fails_when_every_seed_fails() {
    randomized(2, 0, |_| panic!("always"));
}

#[test]
fn binomial_band_matches_tables() {
    // scipy.stats.binom(100, 0.6827).ppf([0.05, 0.95]) == [61, 76]
    assert_eq!(binomial_ppf(100, ONE_SIGMA_FRACTION, 0.05), 61);
    assert_eq!(binomial_ppf(100, ONE_SIGMA_FRACTION, 0.95), 76);
    assert_eq!(binomial_ppf(10, 0.5, 0.0), 0);
}
