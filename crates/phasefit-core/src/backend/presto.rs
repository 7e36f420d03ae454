//! PRESTO backend: adapter over the native `fftfit` routine.
//!
//! The routine works in single precision on power-of-two profiles and takes
//! the template as amplitudes and phases of its harmonics. It reports the
//! shift in bins, measured from a different origin than the pure-numeric
//! backends; [`PRESTO_BIN_OFFSET`] converts between the two. Scale and offset
//! are recomputed here by least squares so every backend agrees on them.
//!
//! Without the `native` feature, or when no library can be loaded, the
//! backend reports itself absent and every fit fails with
//! [`FitError::BackendUnavailable`].

use crate::backend::{BackendKind, FitBackend};
use crate::fit::{affine_fit, cross_spectrum};
use crate::fourier::RealFft;
use crate::phase::wrap;
use crate::types::{check_pair, Complex, FitError, FitOutcome, FitResult, NoiseStd};

#[cfg(feature = "native")]
use crate::backend::presto_ffi;

/// Bins to add to PRESTO's shift before converting to turns.
///
/// Determined empirically against the pure-numeric backends; the routine's
/// shift is referenced one bin earlier.
pub const PRESTO_BIN_OFFSET: f64 = 1.0;

/// Largest profile the routine's internal work arrays accept.
pub const PRESTO_MAX_SAMPLES: usize = 8192;

/// Whether the native routine resolved in this process.
pub fn is_available() -> bool {
    #[cfg(feature = "native")]
    {
        presto_ffi::is_available()
    }
    #[cfg(not(feature = "native"))]
    {
        false
    }
}

/// Backend delegating the shift search to PRESTO.
#[derive(Debug, Clone, Default)]
pub struct PrestoBackend;

impl PrestoBackend {
    pub fn new() -> Self {
        Self
    }

    fn check_length(n: usize) -> FitOutcome<()> {
        if !n.is_power_of_two() {
            return Err(FitError::Shape(format!(
                "PRESTO fftfit needs a power-of-two length, got {}",
                n
            )));
        }
        if n > PRESTO_MAX_SAMPLES {
            return Err(FitError::Shape(format!(
                "PRESTO fftfit handles at most {} samples, got {}",
                PRESTO_MAX_SAMPLES, n
            )));
        }
        Ok(())
    }
}

/// Shift and its uncertainty in turns.
#[cfg(feature = "native")]
fn run_native(template_spectrum: &[Complex], profile: &[f64]) -> FitOutcome<(f64, f64)> {
    let n = profile.len();
    let harmonics = &template_spectrum[1..=n / 2];
    let amplitudes: Vec<f32> = harmonics.iter().map(|c| c.norm() as f32).collect();
    let phases: Vec<f32> = harmonics.iter().map(|c| c.arg() as f32).collect();
    let samples: Vec<f32> = profile.iter().map(|&v| v as f32).collect();

    let out = presto_ffi::fftfit(&samples, &amplitudes, &phases)
        .ok_or(FitError::BackendUnavailable(BackendKind::Presto))?;
    tracing::debug!(
        shift = out.shift,
        eshift = out.eshift,
        snr = out.snr,
        ngood = out.ngood,
        "PRESTO fftfit returned"
    );
    if !(out.shift.is_finite() && out.eshift.is_finite()) {
        return Err(FitError::Native(format!(
            "fftfit returned shift {} ± {}",
            out.shift, out.eshift
        )));
    }

    let bins = n as f64;
    Ok((
        wrap((out.shift as f64 + PRESTO_BIN_OFFSET) / bins),
        out.eshift as f64 / bins,
    ))
}

#[cfg(not(feature = "native"))]
fn run_native(_template_spectrum: &[Complex], _profile: &[f64]) -> FitOutcome<(f64, f64)> {
    Err(FitError::BackendUnavailable(BackendKind::Presto))
}

impl FitBackend for PrestoBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Presto
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
            tracing::debug!("PRESTO estimates its own noise; supplied std ignored");
        }
        Self::check_length(n)?;
        if !is_available() {
            return Err(FitError::BackendUnavailable(BackendKind::Presto));
        }

        let mut fft = RealFft::new(n)?;
        let template_spectrum = fft.forward(template)?;
        let profile_spectrum = fft.forward(profile)?;
        cross_spectrum(&template_spectrum, &profile_spectrum, n)?;

        let (shift, uncertainty) = run_native(&template_spectrum, profile)?;
        let fit = affine_fit(&mut fft, &template_spectrum, profile, shift)?;
        Ok(FitResult {
            shift,
            uncertainty,
            scale: fit.scale,
            offset: fit.offset,
        })
    }
}
