//! # Template Fitting
//!
//! Estimates the cyclic shift, amplitude scale and baseline offset that map a
//! template onto an observed profile:
//!
//! ```text
//!   profile[t] ≈ scale · template(t/n - shift) + offset + noise[t]
//! ```
//!
//! ## Method
//!
//! The shift maximises the continuous cross-correlation of the two profiles.
//! In the Fourier domain that is
//!
//! ```text
//!   CCF(x) = Σ_k w_k Re( conj(T_k) P_k e^{2πikx} )
//! ```
//!
//! which a backend locates coarsely on a grid and then refines off-grid with
//! the harmonic series evaluator. Given the shift, scale and offset follow
//! from linear least squares, and the shift uncertainty from the Fisher
//! information of the model:
//!
//! ```text
//!   σ_shift = 1 / ( |scale| · sqrt( Σ_t T'(t/n - shift)² / σ_t² ) )
//! ```
//!
//! where `T'` is the derivative of the band-limited template per turn. The
//! Nyquist bin carries no usable phase information and is left out of both
//! the correlation and the derivative.
//!
//! The free functions [`fftfit_full`] and [`fftfit_basic`] use the reference
//! backend; see [`crate::backend`] for the alternatives.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::backend::reference::ReferenceBackend;
use crate::backend::FitBackend;
use crate::fourier::RealFft;
use crate::shift::apply_phase_ramp;
use crate::types::{Complex, FitError, FitOutcome, FitResult, NoiseStd, Profile, Spectrum};

/// Default oversampling of the coarse cross-correlation grid.
pub const DEFAULT_UPSAMPLE: usize = 8;

/// Default bound on refinement iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default refinement step tolerance, in turns.
pub const DEFAULT_XTOL: f64 = 1e-12;

/// Cross power below this fraction of the total power counts as rounding noise.
const NO_SIGNAL_RTOL: f64 = 1e-12;

/// Numerical knobs shared by the pure-numeric backends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Oversampling factor of the coarse correlation grid
    pub upsample: usize,
    /// Hard bound on refinement iterations
    pub max_iterations: usize,
    /// Stop refining once a step is smaller than this (turns)
    pub xtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            upsample: DEFAULT_UPSAMPLE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            xtol: DEFAULT_XTOL,
        }
    }
}

impl FitOptions {
    #[must_use]
    pub fn with_upsample(mut self, upsample: usize) -> Self {
        self.upsample = upsample;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    /// Reject options no refinement could honour.
    pub fn validate(&self) -> FitOutcome<()> {
        if self.upsample == 0 {
            return Err(FitError::Domain("upsample must be at least 1".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(FitError::Domain(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.xtol.is_finite() && self.xtol > 0.0) {
            return Err(FitError::Domain(format!(
                "xtol must be finite and positive, got {}",
                self.xtol
            )));
        }
        Ok(())
    }
}

/// Cross spectrum `conj(T_k) · P_k` with DC and Nyquist removed.
///
/// Fails with [`FitError::NoSignal`] when nothing is left, since the shift is
/// then undefined.
pub(crate) fn cross_spectrum(
    template_spectrum: &[Complex],
    profile_spectrum: &[Complex],
    n: usize,
) -> FitOutcome<Spectrum> {
    let mut ccf: Spectrum = template_spectrum
        .iter()
        .zip(profile_spectrum)
        .map(|(t, p)| t.conj() * p)
        .collect();
    ccf[0] = Complex::new(0.0, 0.0);
    if n % 2 == 0 {
        ccf[n / 2] = Complex::new(0.0, 0.0);
    }
    let cross: f64 = ccf.iter().map(|c| c.norm()).sum();
    let energy = |spectrum: &[Complex]| spectrum.iter().map(|c| c.norm_sqr()).sum::<f64>();
    let reference = (energy(template_spectrum) * energy(profile_spectrum)).sqrt();
    if !(cross > NO_SIGNAL_RTOL * reference) {
        return Err(FitError::NoSignal);
    }
    Ok(ccf)
}

/// Lag of the largest correlation magnitude on a sampled grid.
///
/// An inverted profile matches the template at a trough of the correlation,
/// so the peak is taken in magnitude. When that extreme is negative the
/// returned spectrum is the negated `ccf`, which turns it back into a maximum
/// for the refinement.
pub(crate) fn strongest_lag(grid: &[f64], ccf: &[Complex]) -> FitOutcome<(usize, Spectrum)> {
    let (i, &peak) = grid
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .ok_or(FitError::NoSignal)?;
    let oriented = if peak < 0.0 {
        ccf.iter().map(|c| -c).collect()
    } else {
        ccf.to_vec()
    };
    Ok((i, oriented))
}

/// Least-squares scale and offset of an aligned template.
#[derive(Debug, Clone)]
pub struct AffineFit {
    pub scale: f64,
    pub offset: f64,
    /// `scale · shift(template, s) + offset`
    pub model: Profile,
}

impl AffineFit {
    /// Profile minus model.
    pub fn residuals(&self, profile: &[f64]) -> Vec<f64> {
        profile.iter().zip(&self.model).map(|(p, m)| p - m).collect()
    }
}

/// Fit `profile ≈ scale · shift(template, s) + offset` by linear least squares.
pub fn affine_fit(
    fft: &mut RealFft,
    template_spectrum: &[Complex],
    profile: &[f64],
    s: f64,
) -> FitOutcome<AffineFit> {
    let mut rotated = template_spectrum.to_vec();
    apply_phase_ramp(&mut rotated, fft.size(), s);
    let aligned = fft.inverse(&rotated)?;

    let n = profile.len() as f64;
    let mean_t = aligned.iter().sum::<f64>() / n;
    let mean_p = profile.iter().sum::<f64>() / n;
    let (cross, power) = aligned
        .iter()
        .zip(profile)
        .fold((0.0, 0.0), |(cross, power), (&t, &p)| {
            let dt = t - mean_t;
            (cross + dt * (p - mean_p), power + dt * dt)
        });
    if power == 0.0 {
        return Err(FitError::NoSignal);
    }

    let scale = cross / power;
    let offset = mean_p - scale * mean_t;
    let model = aligned.iter().map(|&t| scale * t + offset).collect();
    Ok(AffineFit {
        scale,
        offset,
        model,
    })
}

/// Residual standard deviation with three fitted parameters removed.
pub fn residual_std(residuals: &[f64]) -> f64 {
    let dof = residuals.len().saturating_sub(3).max(1) as f64;
    (residuals.iter().map(|r| r * r).sum::<f64>() / dof).sqrt()
}

/// One-sigma shift uncertainty from the Fisher information of the model.
///
/// `noise` gives the per-sample standard deviation; when absent it is
/// estimated from the residuals of `fit`.
pub fn shift_uncertainty(
    fft: &mut RealFft,
    template_spectrum: &[Complex],
    s: f64,
    fit: &AffineFit,
    profile: &[f64],
    noise: Option<NoiseStd<'_>>,
) -> FitOutcome<f64> {
    let n = fft.size();
    let mut derivative = template_spectrum.to_vec();
    apply_phase_ramp(&mut derivative, n, s);
    for (k, c) in derivative.iter_mut().enumerate() {
        *c *= Complex::new(0.0, 2.0 * PI * k as f64);
    }
    if n % 2 == 0 {
        derivative[n / 2] = Complex::new(0.0, 0.0);
    }
    let slope = fft.inverse(&derivative)?;

    let information: f64 = match noise {
        Some(noise) => slope
            .iter()
            .enumerate()
            .map(|(j, d)| (d / noise.at(j)).powi(2))
            .sum(),
        None => {
            let std = residual_std(&fit.residuals(profile));
            slope.iter().map(|d| d * d).sum::<f64>() / (std * std)
        }
    };

    let uncertainty = 1.0 / (fit.scale.abs() * information.sqrt());
    Ok(if uncertainty.is_nan() {
        f64::INFINITY
    } else {
        uncertainty
    })
}

/// Full fit of `profile` against `template` with the reference backend.
///
/// `std` is the known noise level of `profile`; pass `None` to estimate it
/// from the fit residuals.
pub fn fftfit_full(
    template: &[f64],
    profile: &[f64],
    std: Option<NoiseStd<'_>>,
) -> FitOutcome<FitResult> {
    ReferenceBackend::default().fit_full(template, profile, std)
}

/// Shift of `profile` relative to `template` with the reference backend.
pub fn fftfit_basic(template: &[f64], profile: &[f64]) -> FitOutcome<f64> {
    ReferenceBackend::default().fit_basic(template, profile)
}
