//! # Pulse Profile Phase Fitting
//!
//! Measures the sub-sample cyclic shift between an observed pulse profile and
//! a reference template by frequency-domain cross-correlation, together with
//! the amplitude scale, baseline offset and a calibrated shift uncertainty.
//!
//! ## Overview
//!
//! A pulse profile is one period of a periodic signal sampled at `n` equally
//! spaced phases. Shifts are measured in turns (fractions of a period) and
//! reported in (-0.5, 0.5]. The model fitted is
//!
//! ```text
//!   profile[t] ≈ scale · template(t/n - shift) + offset + noise[t]
//! ```
//!
//! Building blocks, leaves first:
//!
//! - **Phase wrap** ([`phase`]): canonical representative of a cyclic phase
//! - **Templates** ([`template`]): von Mises pulse synthesis
//! - **Fourier evaluation** ([`fourier`]): real transforms and off-grid
//!   evaluation of the band-limited interpolant
//! - **Shift operator** ([`shift`]): fractional cyclic shifts
//! - **Fit engine** ([`fit`], [`backend`]): interchangeable backends behind
//!   one contract
//!
//! ## Data Flow
//!
//! ```text
//! template ─┐                  ┌─ coarse peak ─ refinement ─┐
//!           ├─ rfft ─ conj·× ──┤                            ├─ FitResult
//! profile ──┘                  └─ least squares ─ Fisher σ ─┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use phasefit_core::prelude::*;
//!
//! let template = vonmises_profile(10.0, 64, 0.0).unwrap();
//! let profile: Vec<f64> = shift(&template, 1.0 / 3.0)
//!     .unwrap()
//!     .iter()
//!     .map(|v| 2.0 * v + 0.5)
//!     .collect();
//!
//! let r = fftfit_full(&template, &profile, None).unwrap();
//! assert!((r.shift - 1.0 / 3.0).abs() < 1e-8);
//! assert!((r.scale - 2.0).abs() < 1e-8);
//! assert!((r.offset - 0.5).abs() < 1e-8);
//! ```

pub mod backend;
pub mod config;
pub mod fit;
pub mod fourier;
pub mod observe;
pub mod phase;
pub mod shift;
pub mod template;
pub mod types;

pub use backend::{
    available_backends, create_backend, select_backend, BackendKind, FitBackend, PrestoBackend,
    ReferenceBackend, TaylorBackend,
};
pub use config::{ConfigError, PhasefitConfig};
pub use fit::{fftfit_basic, fftfit_full, FitOptions};
pub use fourier::{irfft, irfft_value, irfft_values, rfft, HarmonicSeries, RealFft};
pub use phase::{phase_distance, wrap, wrap_slice};
pub use shift::{rotate, shift};
pub use template::{vonmises_profile, vonmises_profile_normalized, TemplateNorm};
pub use types::{Complex, FitError, FitOutcome, FitResult, NoiseStd, Profile, Spectrum};

/// Prelude for common imports
pub mod prelude {
    pub use crate::backend::{available_backends, BackendKind, FitBackend};
    pub use crate::fit::{fftfit_basic, fftfit_full, FitOptions};
    pub use crate::phase::wrap;
    pub use crate::shift::shift;
    pub use crate::template::vonmises_profile;
    pub use crate::types::{FitError, FitResult, NoiseStd};
}
