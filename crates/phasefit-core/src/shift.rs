//! Spectral Shift Operator
//!
//! Rotates a real profile by an arbitrary cyclic offset by applying a linear
//! phase ramp to its spectrum:
//!
//! ```text
//!   c_k  →  c_k · e^{-2πiks}        (s in turns, positive = later phase)
//! ```
//!
//! For whole-sample offsets `s = k/n` this is exactly the circular rotation
//! by `k` samples; for fractional offsets it moves the band-limited
//! interpolant of the profile.
//!
//! The Nyquist bin of an even-length profile is the one component a real
//! signal cannot rotate by a fraction of a sample. It is multiplied by
//! `(-1)^round(n·s)`, which matches the circular rotation for whole-sample
//! shifts and keeps `shift(shift(p, s), -s) == p` exact for every `s`.
//!
//! ## Example
//!
//! ```rust
//! use phasefit_core::shift::{rotate, shift};
//!
//! let p = vec![1.0, 0.0, 0.0, 0.0];
//! let moved = shift(&p, 0.25).unwrap();
//! let rolled = rotate(&p, 1);
//! for (a, b) in moved.iter().zip(&rolled) {
//!     assert!((a - b).abs() < 1e-12);
//! }
//! ```

use std::f64::consts::PI;

use crate::fourier::RealFft;
use crate::types::{Complex, FitError, FitOutcome, Profile};

/// Multiply a one-sided spectrum of an `n`-sample signal by the phase ramp
/// for a shift of `s` turns, in place.
pub fn apply_phase_ramp(spectrum: &mut [Complex], n: usize, s: f64) {
    let nyquist = if n % 2 == 0 { Some(n / 2) } else { None };
    for (k, c) in spectrum.iter_mut().enumerate() {
        if Some(k) == nyquist {
            if (n as f64 * s).round().rem_euclid(2.0) == 1.0 {
                *c = -*c;
            }
        } else {
            let ks = k as f64 * s;
            let (sin, cos) = (-2.0 * PI * (ks - ks.round())).sin_cos();
            *c *= Complex::new(cos, sin);
        }
    }
}

/// Cyclically shift `profile` by `s` turns towards later phase.
pub fn shift(profile: &[f64], s: f64) -> FitOutcome<Profile> {
    if profile.is_empty() {
        return Err(FitError::Shape("cannot shift an empty profile".to_string()));
    }
    if !s.is_finite() {
        return Err(FitError::Domain(format!("shift must be finite, got {}", s)));
    }
    let n = profile.len();
    let mut fft = RealFft::new(n)?;
    let mut spectrum = fft.forward(profile)?;
    apply_phase_ramp(&mut spectrum, n, s);
    fft.inverse(&spectrum)
}

/// Circularly rotate `profile` by `k` whole samples towards later indices.
///
/// Sample `t` of the input lands at index `(t + k) mod n`.
pub fn rotate(profile: &[f64], k: isize) -> Profile {
    let n = profile.len();
    if n == 0 {
        return Vec::new();
    }
    let split = (k.rem_euclid(n as isize)) as usize;
    let mut out = Vec::with_capacity(n);
    out.extend_from_slice(&profile[n - split..]);
    out.extend_from_slice(&profile[..n - split]);
    out
}
