//! Von Mises Template Synthesis
//!
//! The von Mises function is the cyclic analogue of a Gaussian. Sampled over
//! one period it gives a smooth, unimodal pulse whose width is set by the
//! concentration `kappa`: for large `kappa` the pulse approaches a spike of
//! width roughly `1 / (2π·sqrt(kappa))` turns, for small `kappa` it relaxes
//! towards a single sinusoid.
//!
//! ```text
//!   p[t] = exp(kappa · (cos(2π(t/n - phase)) - 1))     t = 0 .. n-1
//! ```
//!
//! The `- 1` in the exponent pins the peak value at 1, so even very
//! concentrated pulses (kappa in the thousands) stay finite.
//!
//! ## Example
//!
//! ```rust
//! use phasefit_core::template::vonmises_profile;
//!
//! let template = vonmises_profile(10.0, 64, 0.25).unwrap();
//! let peak = template
//!     .iter()
//!     .enumerate()
//!     .max_by(|a, b| a.1.total_cmp(b.1))
//!     .map(|(i, _)| i)
//!     .unwrap();
//! assert_eq!(peak, 16);
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::types::{FitError, FitOutcome, Profile};

/// Normalization applied to a synthesized template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateNorm {
    /// Peak value of the continuous pulse is 1 (the raw form)
    #[default]
    Peak,
    /// Mean subtracted, leaving only the pulsed component
    ZeroMean,
    /// Samples sum to 1
    UnitArea,
}

/// Sample a von Mises pulse of concentration `kappa` centred on `phase`.
///
/// `kappa` must be finite and positive, `n` at least 1 and `phase` finite
/// (it is interpreted modulo one).
pub fn vonmises_profile(kappa: f64, n: usize, phase: f64) -> FitOutcome<Profile> {
    if !(kappa.is_finite() && kappa > 0.0) {
        return Err(FitError::Domain(format!(
            "von Mises concentration must be finite and positive, got {}",
            kappa
        )));
    }
    if n < 1 {
        return Err(FitError::Domain(
            "von Mises profile needs at least one sample".to_string(),
        ));
    }
    if !phase.is_finite() {
        return Err(FitError::Domain(format!(
            "von Mises phase must be finite, got {}",
            phase
        )));
    }

    let n_f = n as f64;
    Ok((0..n)
        .map(|t| {
            let theta = 2.0 * PI * (t as f64 / n_f - phase);
            (kappa * (theta.cos() - 1.0)).exp()
        })
        .collect())
}

/// Sample a von Mises pulse and apply `norm`.
pub fn vonmises_profile_normalized(
    kappa: f64,
    n: usize,
    phase: f64,
    norm: TemplateNorm,
) -> FitOutcome<Profile> {
    let mut profile = vonmises_profile(kappa, n, phase)?;
    match norm {
        TemplateNorm::Peak => {}
        TemplateNorm::ZeroMean => {
            let mean = profile.iter().sum::<f64>() / n as f64;
            profile.iter_mut().for_each(|v| *v -= mean);
        }
        TemplateNorm::UnitArea => {
            // Every sample is strictly positive, so the sum is too.
            let total: f64 = profile.iter().sum();
            profile.iter_mut().for_each(|v| *v /= total);
        }
    }
    Ok(profile)
}
