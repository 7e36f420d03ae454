//! Real-Signal Fourier Utilities
//!
//! Forward and inverse real transforms with the one-sided spectral
//! convention, plus direct evaluation of the truncated Fourier series at
//! arbitrary (non-grid) phases.
//!
//! ## One-sided Convention
//!
//! A real profile of length `n` has a Hermitian spectrum, so only bins
//! `0 ..= n/2` are kept:
//!
//! ```text
//!   p[t] = (1/n) · [ Re c0 + 2 Σ_{0<k<n/2} Re(c_k e^{2πikt/n}) + Re c_{n/2} (-1)^t ]
//!                                                               └ even n only ┘
//! ```
//!
//! Replacing `t/n` by a continuous phase `x` turns the sum into the
//! band-limited interpolant of the profile. That is what makes sub-bin
//! alignment possible: the cross-correlation of two profiles can be
//! evaluated, and differentiated, between grid points.

use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use crate::types::{Complex, FitError, FitOutcome, Profile, Spectrum};

/// Planned forward/inverse transform pair for one profile length.
pub struct RealFft {
    /// Transform length
    size: usize,
    /// Forward FFT instance
    fft_forward: Arc<dyn Fft<f64>>,
    /// Inverse FFT instance
    fft_inverse: Arc<dyn Fft<f64>>,
    /// Scratch buffer shared by both directions
    scratch: Vec<Complex>,
}

impl fmt::Debug for RealFft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealFft").field("size", &self.size).finish()
    }
}

impl RealFft {
    /// Plan transforms of length `size` (must be at least 1).
    pub fn new(size: usize) -> FitOutcome<Self> {
        if size == 0 {
            return Err(FitError::Shape(
                "transform length must be greater than zero".to_string(),
            ));
        }
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(size);
        let fft_inverse = planner.plan_fft_inverse(size);
        let scratch_len = fft_forward
            .get_inplace_scratch_len()
            .max(fft_inverse.get_inplace_scratch_len());

        Ok(Self {
            size,
            fft_forward,
            fft_inverse,
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        })
    }

    /// Transform length
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of one-sided bins, `size / 2 + 1`
    pub fn spectrum_len(&self) -> usize {
        self.size / 2 + 1
    }

    /// One-sided spectrum of a real profile of exactly `size` samples.
    pub fn forward(&mut self, input: &[f64]) -> FitOutcome<Spectrum> {
        if input.len() != self.size {
            return Err(FitError::Shape(format!(
                "transform planned for {} samples, got {}",
                self.size,
                input.len()
            )));
        }
        let mut buffer: Vec<Complex> = input.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.fft_forward
            .process_with_scratch(&mut buffer, &mut self.scratch);
        buffer.truncate(self.spectrum_len());
        Ok(buffer)
    }

    /// Real profile of `size` samples synthesized from a one-sided spectrum.
    ///
    /// Bins beyond `size / 2` are ignored and missing bins are treated as
    /// zero. The imaginary parts of DC and (for even sizes) Nyquist cannot be
    /// represented by a real signal and are dropped.
    pub fn inverse(&mut self, spectrum: &[Complex]) -> FitOutcome<Profile> {
        if spectrum.is_empty() {
            return Err(FitError::Shape(
                "cannot invert an empty spectrum".to_string(),
            ));
        }
        let n = self.size;
        let mut buffer = vec![Complex::new(0.0, 0.0); n];
        buffer[0] = Complex::new(spectrum[0].re, 0.0);
        for (k, &c) in spectrum
            .iter()
            .enumerate()
            .take(self.spectrum_len())
            .skip(1)
        {
            if 2 * k == n {
                buffer[k] = Complex::new(c.re, 0.0);
            } else {
                buffer[k] = c;
                buffer[n - k] = c.conj();
            }
        }
        self.fft_inverse
            .process_with_scratch(&mut buffer, &mut self.scratch);

        let scale = 1.0 / n as f64;
        Ok(buffer.iter().map(|c| c.re * scale).collect())
    }
}

/// One-sided spectrum of a real profile.
pub fn rfft(input: &[f64]) -> FitOutcome<Spectrum> {
    RealFft::new(input.len())?.forward(input)
}

/// Inverse of [`rfft`], producing `n` real samples.
pub fn irfft(spectrum: &[Complex], n: usize) -> FitOutcome<Profile> {
    RealFft::new(n)?.inverse(spectrum)
}

/// Truncated Fourier series of a one-sided spectrum, evaluated off-grid.
///
/// Holds the per-bin weights so that the value and its first two
/// derivatives (with respect to phase in turns) come out of a single pass.
#[derive(Debug, Clone, Copy)]
pub struct HarmonicSeries<'a> {
    coeffs: &'a [Complex],
    n: usize,
    /// Last coefficient is the Nyquist bin of an even-length signal
    nyquist: bool,
}

impl<'a> HarmonicSeries<'a> {
    /// Wrap `coeffs`, the one-sided spectrum of a signal of `n` samples.
    ///
    /// Requires at least one coefficient and `n >= 2 * (coeffs.len() - 1)`.
    pub fn new(coeffs: &'a [Complex], n: usize) -> FitOutcome<Self> {
        if coeffs.is_empty() {
            return Err(FitError::Shape(
                "need at least one Fourier coefficient".to_string(),
            ));
        }
        let highest = coeffs.len() - 1;
        if n == 0 || n < 2 * highest {
            return Err(FitError::Shape(format!(
                "{} coefficients cannot describe a real signal of {} samples",
                coeffs.len(),
                n
            )));
        }
        Ok(Self {
            coeffs,
            n,
            nyquist: highest > 0 && n == 2 * highest,
        })
    }

    #[inline]
    fn weight(&self, k: usize) -> f64 {
        if k == 0 || (self.nyquist && k == self.coeffs.len() - 1) {
            1.0
        } else {
            2.0
        }
    }

    /// Rotation `e^{2πikx}` with the argument reduced modulo one turn first.
    #[inline]
    fn twiddle(k: usize, x: f64) -> Complex {
        let kx = k as f64 * x;
        let (sin, cos) = (2.0 * PI * (kx - kx.round())).sin_cos();
        Complex::new(cos, sin)
    }

    /// Signal value at phase `x` (turns).
    pub fn value(&self, x: f64) -> f64 {
        let sum: f64 = self
            .coeffs
            .iter()
            .enumerate()
            .map(|(k, &c)| self.weight(k) * (c * Self::twiddle(k, x)).re)
            .sum();
        sum / self.n as f64
    }

    /// Value, first and second derivative at phase `x` (turns).
    pub fn eval(&self, x: f64) -> (f64, f64, f64) {
        let mut value = 0.0;
        let mut slope = 0.0;
        let mut curvature = 0.0;
        for (k, &c) in self.coeffs.iter().enumerate() {
            let w = self.weight(k);
            let rotated = c * Self::twiddle(k, x);
            let omega = 2.0 * PI * k as f64;
            value += w * rotated.re;
            slope -= w * omega * rotated.im;
            curvature -= w * omega * omega * rotated.re;
        }
        let scale = 1.0 / self.n as f64;
        (value * scale, slope * scale, curvature * scale)
    }
}

/// Evaluate the inverse real transform of `coeffs` at phase `x` (turns).
///
/// On the grid `x = t / n` this reproduces [`irfft`] sample `t`.
pub fn irfft_value(coeffs: &[Complex], x: f64, n: usize) -> FitOutcome<f64> {
    Ok(HarmonicSeries::new(coeffs, n)?.value(x))
}

/// Evaluate the inverse real transform of `coeffs` at every phase in `xs`.
pub fn irfft_values(coeffs: &[Complex], xs: &[f64], n: usize) -> FitOutcome<Vec<f64>> {
    let series = HarmonicSeries::new(coeffs, n)?;
    Ok(xs.iter().map(|&x| series.value(x)).collect())
}
