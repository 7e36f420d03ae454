//! Reference backend: upsampled cross-correlation with Newton refinement.
//!
//! 1. Cross spectrum `conj(T_k) P_k` (DC and Nyquist dropped).
//! 2. Coarse peak of the magnitude of its inverse transform, zero-padded so
//!    the lag grid is at least `upsample` times finer than the profile
//!    sampling. A negative extreme means an inverted profile.
//! 3. Safeguarded Newton on the continuous correlation between the two
//!    neighbouring grid points. Steps that leave the bracket, or land where
//!    the curvature is not negative, fall back to golden-section steps.
//! 4. Least-squares scale/offset and Fisher uncertainty (see [`crate::fit`]).

use crate::backend::{BackendKind, FitBackend};
use crate::fit::{affine_fit, cross_spectrum, shift_uncertainty, strongest_lag, FitOptions};
use crate::fourier::{irfft, HarmonicSeries, RealFft};
use crate::phase::wrap;
use crate::types::{check_pair, Complex, FitError, FitOutcome, FitResult, NoiseStd};

/// Golden-section fraction used when a Newton step is rejected.
const GOLDEN: f64 = 0.381_966_011_250_105_1;

/// Pure-numeric backend used by [`crate::fftfit_full`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceBackend {
    options: FitOptions,
}

impl ReferenceBackend {
    pub fn new(options: FitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Locate the correlation peak, returning the unwrapped phase in turns.
    fn locate_peak(&self, ccf: &[Complex]) -> FitOutcome<f64> {
        let n_long = (2 * ccf.len() * self.options.upsample).next_power_of_two();
        let grid = irfft(ccf, n_long)?;
        let (i, oriented) = strongest_lag(&grid, ccf)?;
        let spacing = 1.0 / n_long as f64;
        let coarse = i as f64 * spacing;
        tracing::debug!(
            lag = i,
            grid = n_long,
            coarse,
            inverted = grid[i] < 0.0,
            "Coarse correlation peak"
        );

        let series = HarmonicSeries::new(&oriented, n_long)?;
        newton_maximize(
            &series,
            coarse - spacing,
            coarse,
            coarse + spacing,
            &self.options,
        )
    }
}

impl FitBackend for ReferenceBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Reference
    }

    fn fit_full(
        &self,
        template: &[f64],
        profile: &[f64],
        std: Option<NoiseStd<'_>>,
    ) -> FitOutcome<FitResult> {
        let n = check_pair(template, profile)?;
        if let Some(noise) = &std {
            noise.validate(n)?;
        }
        self.options.validate()?;

        let mut fft = RealFft::new(n)?;
        let template_spectrum = fft.forward(template)?;
        let profile_spectrum = fft.forward(profile)?;
        let ccf = cross_spectrum(&template_spectrum, &profile_spectrum, n)?;

        let shift = wrap(self.locate_peak(&ccf)?);
        let fit = affine_fit(&mut fft, &template_spectrum, profile, shift)?;
        let uncertainty =
            shift_uncertainty(&mut fft, &template_spectrum, shift, &fit, profile, std)?;

        Ok(FitResult {
            shift,
            uncertainty,
            scale: fit.scale,
            offset: fit.offset,
        })
    }

    fn fit_basic(&self, template: &[f64], profile: &[f64]) -> FitOutcome<f64> {
        let n = check_pair(template, profile)?;
        self.options.validate()?;

        let mut fft = RealFft::new(n)?;
        let template_spectrum = fft.forward(template)?;
        let profile_spectrum = fft.forward(profile)?;
        let ccf = cross_spectrum(&template_spectrum, &profile_spectrum, n)?;
        Ok(wrap(self.locate_peak(&ccf)?))
    }
}

/// Maximise `series` within `(lo, hi)` starting from `x`, where
/// `series(x) >= series(lo), series(hi)`.
///
/// Each iteration takes the Newton step on the derivative when the curvature
/// is negative and the step stays inside the bracket, and a golden-section
/// step uphill otherwise. The bracket shrinks every iteration, so the loop
/// either meets `xtol` or runs out of iterations.
pub(crate) fn newton_maximize(
    series: &HarmonicSeries<'_>,
    mut lo: f64,
    mut x: f64,
    mut hi: f64,
    options: &FitOptions,
) -> FitOutcome<f64> {
    let (mut value, mut slope, mut curvature) = series.eval(x);
    let mut step = hi - lo;

    for iteration in 1..=options.max_iterations {
        let newton = if curvature < 0.0 {
            Some(x - slope / curvature)
        } else {
            None
        };
        let candidate = match newton {
            Some(u) if u > lo && u < hi => u,
            _ => {
                let uphill = if slope != 0.0 {
                    slope > 0.0
                } else {
                    hi - x > x - lo
                };
                if uphill {
                    x + GOLDEN * (hi - x)
                } else {
                    x - GOLDEN * (x - lo)
                }
            }
        };
        step = candidate - x;

        if step.abs() <= options.xtol || hi - lo <= options.xtol {
            tracing::trace!(iteration, x, "Refinement converged");
            return Ok(x);
        }

        let (cand_value, cand_slope, cand_curvature) = series.eval(candidate);
        if cand_value >= value {
            if candidate > x {
                lo = x;
            } else {
                hi = x;
            }
            x = candidate;
            value = cand_value;
            slope = cand_slope;
            curvature = cand_curvature;
        } else if candidate > x {
            hi = candidate;
        } else {
            lo = candidate;
        }
        tracing::trace!(iteration, x, step, "Refinement step");
    }

    Err(FitError::NotConverged {
        iterations: options.max_iterations,
        step,
    })
}
