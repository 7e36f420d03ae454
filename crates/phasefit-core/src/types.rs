//! Core types for profile alignment
//!
//! A *profile* is one period of a periodic signal sampled uniformly, stored as
//! a plain slice of `f64`. Its one-sided spectrum holds the non-negative
//! frequency half of the discrete Fourier transform:
//!
//! ```text
//!   index:   0        1 .. n/2-1          n/2
//!            DC       harmonics           Nyquist (even n only)
//! ```
//!
//! Phases and shifts are measured in *turns*: a shift of 0.25 moves the
//! pulse a quarter of a period towards later phase.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;

/// Type alias for complex spectral coefficients
pub type Complex = Complex64;

/// A single real profile sample
pub type Sample = f64;

/// An owned profile (one period of samples)
pub type Profile = Vec<Sample>;

/// An owned one-sided spectrum of length `n / 2 + 1`
pub type Spectrum = Vec<Complex>;

/// Result type for alignment operations
pub type FitOutcome<T> = Result<T, FitError>;

/// Errors that can occur while aligning profiles
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("length mismatch: template has length {template} but profile has length {profile}")]
    LengthMismatch { template: usize, profile: usize },

    #[error("invalid shape: {0}")]
    Shape(String),

    #[error("invalid domain: {0}")]
    Domain(String),

    #[error("template and profile share no power outside DC; shift is undefined")]
    NoSignal,

    #[error("shift refinement did not converge after {iterations} iterations (last step {step:e} turns)")]
    NotConverged { iterations: usize, step: f64 },

    #[error("backend '{0}' is not available in this process")]
    BackendUnavailable(BackendKind),

    #[error("native routine failed: {0}")]
    Native(String),
}

impl FitError {
    /// True for errors caused by the caller's input rather than the numerics.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            FitError::LengthMismatch { .. } | FitError::Shape(_) | FitError::Domain(_)
        )
    }
}

/// Known per-sample noise level of the observed profile.
///
/// When no noise level is supplied to a full fit, it is estimated from the
/// scatter of the fit residuals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoiseStd<'a> {
    /// Same standard deviation for every sample
    Uniform(f64),
    /// One standard deviation per sample; must match the profile length
    PerSample(&'a [f64]),
}

impl NoiseStd<'_> {
    /// Check the noise description against a profile of length `n`.
    pub fn validate(&self, n: usize) -> FitOutcome<()> {
        match *self {
            NoiseStd::Uniform(std) => check_std(std),
            NoiseStd::PerSample(stds) => {
                if stds.len() != n {
                    return Err(FitError::Shape(format!(
                        "per-sample noise has length {} but profile has length {}",
                        stds.len(),
                        n
                    )));
                }
                stds.iter().try_for_each(|&std| check_std(std))
            }
        }
    }

    /// Noise standard deviation of sample `j`.
    pub fn at(&self, j: usize) -> f64 {
        match *self {
            NoiseStd::Uniform(std) => std,
            NoiseStd::PerSample(stds) => stds[j],
        }
    }
}

fn check_std(std: f64) -> FitOutcome<()> {
    if std.is_finite() && std > 0.0 {
        Ok(())
    } else {
        Err(FitError::Domain(format!(
            "noise standard deviation must be finite and positive, got {}",
            std
        )))
    }
}

/// Outcome of a full template fit.
///
/// `profile ≈ scale * shift(template, shift) + offset`, with `uncertainty`
/// the one-sigma error on `shift` in turns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Phase offset in turns, canonical in (-0.5, 0.5]
    pub shift: f64,
    /// One-sigma uncertainty on `shift`, in turns
    pub uncertainty: f64,
    /// Multiplicative factor mapping the aligned template onto the profile
    pub scale: f64,
    /// Additive baseline
    pub offset: f64,
}

/// Reject empty, too-short or mismatched template/profile pairs.
///
/// At least one harmonic strictly between DC and Nyquist is needed to carry
/// phase information, so profiles shorter than three samples are refused.
pub fn check_pair(template: &[f64], profile: &[f64]) -> FitOutcome<usize> {
    if template.len() != profile.len() {
        return Err(FitError::LengthMismatch {
            template: template.len(),
            profile: profile.len(),
        });
    }
    let n = template.len();
    if n < 3 {
        return Err(FitError::Shape(format!(
            "profiles need at least 3 samples, got {}",
            n
        )));
    }
    if template.iter().chain(profile).any(|v| !v.is_finite()) {
        return Err(FitError::Domain(
            "template and profile must contain only finite samples".to_string(),
        ));
    }
    Ok(n)
}
