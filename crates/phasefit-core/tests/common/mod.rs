//! Shared helpers for the integration tests.
//!
//! Randomized tests draw from `StdRng` seeded explicitly, so every failure
//! names a seed that reproduces it.

#![allow(dead_code)]

use std::panic::{catch_unwind, AssertUnwindSafe};

use phasefit_core::backend::{BackendKind, FitBackend};
use phasefit_core::{vonmises_profile, wrap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Fraction of a normal distribution within one sigma of its mean.
pub const ONE_SIGMA_FRACTION: f64 = 0.682_689_492_137_085_9;

/// Run a statistical check up to `tries` times with seeds `seed, seed + 1, …`.
///
/// Passes as soon as one try passes. A correctly calibrated check that fails
/// one time in twenty then fails here about once per `20^tries` runs.
pub fn randomized<F>(tries: u64, seed: u64, mut check: F)
where
    F: FnMut(&mut StdRng),
{
    assert!(tries >= 1, "must carry out at least one try");
    let mut failed = Vec::new();
    for s in seed..seed + tries {
        let mut rng = StdRng::seed_from_u64(s);
        match catch_unwind(AssertUnwindSafe(|| check(&mut rng))) {
            Ok(()) => return,
            Err(_) => failed.push(s),
        }
    }
    panic!("check failed for every seed: {:?}", failed);
}

/// `n` independent standard normal draws scaled by `std`.
pub fn gaussian(rng: &mut StdRng, n: usize, std: f64) -> Vec<f64> {
    (0..n).map(|_| std * rng.sample::<f64, _>(StandardNormal)).collect()
}

/// Add `b` elementwise.
pub fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// `scale * p + offset` elementwise.
pub fn affine(p: &[f64], scale: f64, offset: f64) -> Vec<f64> {
    p.iter().map(|v| scale * v + offset).collect()
}

/// Von Mises pulse with a faint deterministic noise floor, so that very
/// narrow pulses still carry power in every harmonic.
pub fn noisy_vonmises(kappa: f64, n: usize, phase: f64) -> Vec<f64> {
    let floor = gaussian(&mut StdRng::seed_from_u64(0), n, 1e-3 / n as f64);
    add(&vonmises_profile(kappa, n, phase).unwrap(), &floor)
}

/// White Gaussian noise template.
pub fn random_template(rng: &mut StdRng, n: usize) -> Vec<f64> {
    gaussian(rng, n, 1.0)
}

/// Boxcar covering the first `duty` of the period; never flat.
pub fn boxcar(n: usize, duty: f64) -> Vec<f64> {
    let m = (duty * n as f64) as usize;
    let mut t = vec![0.0; n];
    t[..m.min(n)].iter_mut().for_each(|v| *v = 1.0);
    t[0] = 1.0;
    t[n - 1] = 0.0;
    t
}

/// `2^k` for k drawn from `lo..=hi`.
pub fn power_of_two(rng: &mut StdRng, lo: u32, hi: u32) -> usize {
    1 << rng.gen_range(lo..=hi)
}

/// Assert two cyclic phases agree to within `atol` turns.
pub fn assert_phase_close(a: f64, b: f64, atol: f64, context: &str) {
    let d = wrap(a - b).abs();
    assert!(d <= atol, "{}: {} vs {} differ by {:e} > {:e}", context, a, b, d, atol);
}

/// Phase tolerance for `backend`; the native routine works in single precision.
pub fn phase_tolerance(backend: &dyn FitBackend, atol: f64) -> f64 {
    match backend.kind() {
        BackendKind::Presto => atol.max(1e-6),
        _ => atol,
    }
}

/// Smallest `k` with `P(X <= k) >= q` for `X ~ Binomial(n, p)`.
pub fn binomial_ppf(n: u64, p: f64, q: f64) -> u64 {
    let ratio = p / (1.0 - p);
    let mut pmf = (1.0 - p).powi(n as i32);
    let mut cdf = pmf;
    for k in 0..n {
        if cdf >= q {
            return k;
        }
        pmf *= (n - k) as f64 / (k + 1) as f64 * ratio;
        cdf += pmf;
    }
    n
}

/// Assert that `count` of `trials` normal draws within one sigma is
/// consistent with a calibrated sigma at the 5%/95% level.
pub fn assert_one_sigma_count(count: u64, trials: u64, context: &str) {
    let lo = binomial_ppf(trials, ONE_SIGMA_FRACTION, 0.05);
    let hi = binomial_ppf(trials, ONE_SIGMA_FRACTION, 0.95);
    assert!(
        (lo..=hi).contains(&count),
        "{}: {} of {} within one sigma, expected {}..={}",
        context,
        count,
        trials,
        lo,
        hi
    );
}
