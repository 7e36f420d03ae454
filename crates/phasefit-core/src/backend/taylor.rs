//! Taylor backend: the classic FFTFIT formulation, done in the Fourier domain.
//!
//! Following Taylor (1992, Phil. Trans. R. Soc. A 341, 117), the shift
//! minimises
//!
//! ```text
//!   χ²(a, s) = Σ_k |P_k - a T_k e^{-2πiks}|² / σ_F²       0 < k < n/2
//! ```
//!
//! which is the same as maximising the magnitude of the cross-correlation
//! (a negative scale turns the peak into a trough). The extreme is found on
//! the integer-lag grid, bracketed by its neighbours and refined with Brent's
//! minimiser, then polished with Newton steps on the derivative. Scale comes
//! from the phase-aligned cross power, offset from DC, and the uncertainty
//! from the observed curvature of χ² at its minimum:
//!
//! ```text
//!   σ_s² = σ_F² / ( a · Σ_k (2πk)² Re(conj(T_k e^{-2πiks}) P_k) )
//! ```
//!
//! with `σ_F²` the per-component noise variance of a Fourier coefficient.

use std::f64::consts::PI;

use crate::backend::{BackendKind, FitBackend};
use crate::backend::reference::newton_maximize;
use crate::fit::{cross_spectrum, strongest_lag, FitOptions};
use crate::fourier::{irfft, HarmonicSeries, RealFft};
use crate::phase::wrap;
use crate::shift::apply_phase_ramp;
use crate::types::{check_pair, Complex, FitError, FitOutcome, FitResult, NoiseStd};

const CGOLD: f64 = 0.381_966_011_250_105_1;
/// Fractional precision Brent can reach on function values alone.
const BRENT_RTOL: f64 = 1.5e-8;
const BRENT_ZEPS: f64 = 1e-15;

/// Pure-numeric backend in the style of Taylor's FFTFIT.
#[derive(Debug, Clone, Default)]
pub struct TaylorBackend {
    options: FitOptions,
}

impl TaylorBackend {
    pub fn new(options: FitOptions) -> Self {
        Self { options }
    }

    fn locate_peak(&self, ccf: &[Complex], n: usize) -> FitOutcome<f64> {
        let lags = irfft(ccf, n)?;
        let (i, oriented) = strongest_lag(&lags, ccf)?;
        let spacing = 1.0 / n as f64;
        let coarse = i as f64 * spacing;
        tracing::debug!(
            lag = i,
            coarse,
            inverted = lags[i] < 0.0,
            "Integer-lag correlation peak"
        );

        let (lo, hi) = (coarse - spacing, coarse + spacing);
        let series = HarmonicSeries::new(&oriented, n)?;
        let x = brent_maximize(&series, lo, coarse, hi, &self.options)?;
        // Brent's bracket is only as tight as function values allow and may
        // exclude the true peak; polish inside the lag bracket instead.
        newton_maximize(&series, lo, x, hi, &self.options)
    }
}

impl FitBackend for TaylorBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Taylor
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
        let shift = wrap(self.locate_peak(&ccf, n)?);

        // Harmonics carrying phase: everything between DC and Nyquist.
        let harmonics = (n - 1) / 2;
        let mut aligned = template_spectrum.clone();
        apply_phase_ramp(&mut aligned, n, shift);

        let mut cross = 0.0;
        let mut template_power = 0.0;
        let mut curvature = 0.0;
        for k in 1..=harmonics {
            let c = (aligned[k].conj() * profile_spectrum[k]).re;
            let omega = 2.0 * PI * k as f64;
            cross += c;
            template_power += aligned[k].norm_sqr();
            curvature += omega * omega * c;
        }
        if template_power == 0.0 {
            return Err(FitError::NoSignal);
        }
        let scale = cross / template_power;
        let offset = (profile_spectrum[0].re - scale * template_spectrum[0].re) / n as f64;

        let component_variance = match std {
            Some(NoiseStd::Uniform(std)) => n as f64 * std * std / 2.0,
            Some(NoiseStd::PerSample(stds)) => stds.iter().map(|s| s * s).sum::<f64>() / 2.0,
            None => {
                let chi2: f64 = (1..=harmonics)
                    .map(|k| (profile_spectrum[k] - aligned[k] * scale).norm_sqr())
                    .sum();
                let dof = (2 * harmonics).saturating_sub(2).max(1);
                chi2 / dof as f64
            }
        };

        let information = scale * curvature;
        let uncertainty = if information > 0.0 {
            (component_variance / information).sqrt()
        } else {
            f64::INFINITY
        };

        Ok(FitResult {
            shift,
            uncertainty,
            scale,
            offset,
        })
    }

    fn fit_basic(&self, template: &[f64], profile: &[f64]) -> FitOutcome<f64> {
        let n = check_pair(template, profile)?;
        self.options.validate()?;

        let mut fft = RealFft::new(n)?;
        let template_spectrum = fft.forward(template)?;
        let profile_spectrum = fft.forward(profile)?;
        let ccf = cross_spectrum(&template_spectrum, &profile_spectrum, n)?;
        Ok(wrap(self.locate_peak(&ccf, n)?))
    }
}

/// Brent's minimiser applied to `-series`, bracketed by `lo < x < hi` with
/// `series(x)` not below either end.
///
/// Converges to roughly `sqrt(ε)` relative precision in `x`.
fn brent_maximize(
    series: &HarmonicSeries<'_>,
    lo: f64,
    x0: f64,
    hi: f64,
    options: &FitOptions,
) -> FitOutcome<f64> {
    let f = |x: f64| -series.value(x);
    let (mut a, mut b) = (lo, hi);
    let (mut x, mut w, mut v) = (x0, x0, x0);
    let mut fx = f(x);
    let (mut fw, mut fv) = (fx, fx);
    let mut d: f64 = 0.0;
    let mut e: f64 = 0.0;

    for iteration in 1..=options.max_iterations {
        let xm = 0.5 * (a + b);
        let tol1 = BRENT_RTOL * x.abs() + BRENT_ZEPS;
        let tol2 = 2.0 * tol1;
        if (x - xm).abs() <= tol2 - 0.5 * (b - a) {
            tracing::trace!(iteration, x, "Brent converged");
            return Ok(x);
        }

        let mut golden = true;
        if e.abs() > tol1 {
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            let previous = e;
            e = d;
            if !(p.abs() >= (0.5 * q * previous).abs() || p <= q * (a - x) || p >= q * (b - x)) {
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = tol1.copysign(xm - x);
                }
                golden = false;
            }
        }
        if golden {
            e = if x >= xm { a - x } else { b - x };
            d = CGOLD * e;
        }

        let u = if d.abs() >= tol1 {
            x + d
        } else {
            x + tol1.copysign(d)
        };
        let fu = f(u);
        if fu <= fx {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            fv = fw;
            w = x;
            fw = fx;
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }

    Err(FitError::NotConverged {
        iterations: options.max_iterations,
        step: b - a,
    })
}
