//! # Fit Backends
//!
//! Interchangeable implementations of the same template-fit contract:
//!
//! | Backend     | Coarse search               | Refinement              | Always present |
//! |-------------|-----------------------------|-------------------------|----------------|
//! | `reference` | upsampled CCF grid          | safeguarded Newton      | yes            |
//! | `taylor`    | integer-lag CCF             | Brent + Newton polish   | yes            |
//! | `presto`    | PRESTO's native `fftfit`    | (inside the routine)    | if loadable    |
//!
//! Every backend takes two equal-length real profiles and returns a
//! [`FitResult`] whose shift is wrapped to (-0.5, 0.5]. The native backend is
//! resolved once per process; ask [`BackendKind::is_available`] before
//! dispatching to it, or use [`available_backends`] to iterate over whatever
//! this process can run.
//!
//! ```rust
//! use phasefit_core::backend::{available_backends, BackendKind};
//! use phasefit_core::shift::shift;
//! use phasefit_core::template::vonmises_profile;
//! use phasefit_core::FitOptions;
//!
//! let template = vonmises_profile(20.0, 256, 0.0).unwrap();
//! let profile = shift(&template, 0.125).unwrap();
//!
//! for backend in available_backends(&FitOptions::default()) {
//!     let s = backend.fit_basic(&template, &profile).unwrap();
//!     assert!((s - 0.125).abs() < 1e-4, "{}: {}", backend.kind(), s);
//! }
//! assert!(BackendKind::Reference.is_available());
//! ```

pub mod presto;
#[cfg(feature = "native")]
pub mod presto_ffi;
pub mod reference;
pub mod taylor;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::fit::FitOptions;
use crate::types::{FitError, FitOutcome, FitResult, NoiseStd};

pub use presto::PrestoBackend;
pub use reference::ReferenceBackend;
pub use taylor::TaylorBackend;

/// Identifies a backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Upsampled cross-correlation with Newton refinement
    #[default]
    Reference,
    /// Integer-lag cross-correlation with Brent refinement
    Taylor,
    /// PRESTO's native `fftfit`, loaded at runtime
    Presto,
}

impl BackendKind {
    /// Every backend, in order of preference.
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Reference,
        BackendKind::Taylor,
        BackendKind::Presto,
    ];

    /// Short lowercase name, as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Reference => "reference",
            BackendKind::Taylor => "taylor",
            BackendKind::Presto => "presto",
        }
    }

    /// Whether this process can run the backend.
    ///
    /// The pure-numeric backends are always available. The native backend
    /// reports the outcome of its one-time library resolution.
    pub fn is_available(&self) -> bool {
        match self {
            BackendKind::Reference | BackendKind::Taylor => true,
            BackendKind::Presto => presto::is_available(),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reference" => Ok(BackendKind::Reference),
            "taylor" => Ok(BackendKind::Taylor),
            "presto" => Ok(BackendKind::Presto),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Common contract of every fit backend.
pub trait FitBackend: Send + Sync {
    /// Which implementation this is.
    fn kind(&self) -> BackendKind;

    /// Estimate shift, uncertainty, scale and offset of `profile` against
    /// `template`.
    ///
    /// `std` is the known per-sample noise; `None` asks the backend to
    /// estimate it from the fit residuals.
    fn fit_full(
        &self,
        template: &[f64],
        profile: &[f64],
        std: Option<NoiseStd<'_>>,
    ) -> FitOutcome<FitResult>;

    /// Estimate only the shift of `profile` against `template`.
    fn fit_basic(&self, template: &[f64], profile: &[f64]) -> FitOutcome<f64> {
        self.fit_full(template, profile, None).map(|r| r.shift)
    }
}

/// Construct the backend `kind`, failing if it is absent in this process.
pub fn create_backend(kind: BackendKind, options: &FitOptions) -> FitOutcome<Box<dyn FitBackend>> {
    options.validate()?;
    if !kind.is_available() {
        return Err(FitError::BackendUnavailable(kind));
    }
    Ok(match kind {
        BackendKind::Reference => Box::new(ReferenceBackend::new(*options)),
        BackendKind::Taylor => Box::new(TaylorBackend::new(*options)),
        BackendKind::Presto => Box::new(PrestoBackend::new()),
    })
}

/// Construct `preferred`, or the reference backend if `preferred` is absent
/// and `fallback` allows it.
pub fn select_backend(
    preferred: BackendKind,
    fallback: bool,
    options: &FitOptions,
) -> FitOutcome<Box<dyn FitBackend>> {
    match create_backend(preferred, options) {
        Err(FitError::BackendUnavailable(kind)) if fallback => {
            tracing::warn!(
                backend = %kind,
                "Preferred backend unavailable, falling back to reference"
            );
            create_backend(BackendKind::Reference, options)
        }
        other => other,
    }
}

/// Every backend this process can run.
pub fn available_backends(options: &FitOptions) -> Vec<Box<dyn FitBackend>> {
    BackendKind::ALL
        .iter()
        .filter_map(|&kind| create_backend(kind, options).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.name().parse::<BackendKind>().unwrap(), kind);
            assert_eq!(format!("{}", kind), kind.name());
        }
        assert!("fortran".parse::<BackendKind>().is_err());
        assert_eq!("TAYLOR".parse::<BackendKind>().unwrap(), BackendKind::Taylor);
    }

    #[test]
    fn test_pure_backends_always_available() {
        assert!(BackendKind::Reference.is_available());
        assert!(BackendKind::Taylor.is_available());
        let kinds: Vec<BackendKind> = available_backends(&FitOptions::default())
            .iter()
            .map(|b| b.kind())
            .collect();
        assert!(kinds.starts_with(&[BackendKind::Reference, BackendKind::Taylor]));
    }

    #[test]
    fn test_presto_absence_is_discoverable() {
        let result = create_backend(BackendKind::Presto, &FitOptions::default());
        if BackendKind::Presto.is_available() {
            assert_eq!(result.unwrap().kind(), BackendKind::Presto);
        } else {
            assert!(matches!(
                result,
                Err(FitError::BackendUnavailable(BackendKind::Presto))
            ));
        }
    }

    #[test]
    fn test_select_backend_fallback() {
        let backend = select_backend(BackendKind::Presto, true, &FitOptions::default()).unwrap();
        if !BackendKind::Presto.is_available() {
            assert_eq!(backend.kind(), BackendKind::Reference);
        }
    }

    #[test]
    fn test_create_backend_rejects_bad_options() {
        let options = FitOptions::default().with_upsample(0);
        assert!(matches!(
            create_backend(BackendKind::Reference, &options),
            Err(FitError::Domain(_))
        ));
    }
}
