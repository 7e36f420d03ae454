//! # PRESTO FFI Bindings
//!
//! Runtime binding to the Fortran `fftfit` routine shipped in PRESTO's shared
//! library.
//!
//! The library is opened with `libloading` the first time anything asks for
//! it, so the same binary runs with or without PRESTO installed. Lookup order:
//!
//! 1. a path given to [`configure`] before first use (from the config file),
//! 2. the `PHASEFIT_PRESTO_LIB` environment variable,
//! 3. the platform library names in [`LIB_NAMES`].
//!
//! ## Calling Convention
//!
//! gfortran passes every argument by reference and appends an underscore to
//! the symbol name:
//!
//! ```text
//! subroutine fftfit(prof, s, phi, nmax, shift, eshift, snr, esnr, b, errb, ngood)
//!   real*4  prof(nmax), s(nmax/2), phi(nmax/2)
//!   integer nmax, ngood
//!   real*4  shift, eshift, snr, esnr, b, errb
//! ```

use std::ffi::c_int;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use libloading::Library;

/// Environment variable naming the PRESTO shared library explicitly.
pub const LIBRARY_ENV: &str = "PHASEFIT_PRESTO_LIB";

type FftfitFn = unsafe extern "C" fn(
    prof: *const f32,
    amp: *const f32,
    pha: *const f32,
    nmax: *const c_int,
    shift: *mut f32,
    eshift: *mut f32,
    snr: *mut f32,
    esnr: *mut f32,
    b: *mut f32,
    errb: *mut f32,
    ngood: *mut c_int,
);

/// Loaded PRESTO library and the resolved routine.
struct PrestoLib {
    // Keeps the code behind `fftfit` mapped.
    _lib: Library,
    fftfit: FftfitFn,
    origin: String,
}

/// Global library instance (loaded once).
static PRESTO_LIB: OnceLock<Option<PrestoLib>> = OnceLock::new();

/// Explicit library path, honoured only if set before the first lookup.
static CONFIGURED_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Library names to try on different platforms.
#[cfg(target_os = "linux")]
pub const LIB_NAMES: &[&str] = &["libpresto.so", "libpresto.so.0"];

#[cfg(target_os = "macos")]
pub const LIB_NAMES: &[&str] = &["libpresto.dylib", "libpresto.0.dylib"];

#[cfg(target_os = "windows")]
pub const LIB_NAMES: &[&str] = &["presto.dll", "libpresto.dll"];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const LIB_NAMES: &[&str] = &[];

/// Output of one `fftfit` call, in PRESTO's own units (bins).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FftfitOutput {
    pub shift: f32,
    pub eshift: f32,
    pub snr: f32,
    pub esnr: f32,
    pub b: f32,
    pub errb: f32,
    pub ngood: i32,
}

/// Record an explicit library path to try first.
///
/// Returns `false` if a path was already configured or the library has
/// already been resolved, in which case the call has no effect.
pub fn configure(path: impl AsRef<Path>) -> bool {
    if PRESTO_LIB.get().is_some() {
        return false;
    }
    CONFIGURED_PATH.set(path.as_ref().to_path_buf()).is_ok()
}

fn candidates() -> Vec<String> {
    let mut names = Vec::new();
    if let Some(path) = CONFIGURED_PATH.get() {
        names.push(path.to_string_lossy().into_owned());
    }
    if let Ok(path) = std::env::var(LIBRARY_ENV) {
        if !path.is_empty() {
            names.push(path);
        }
    }
    names.extend(LIB_NAMES.iter().map(|s| s.to_string()));
    names
}

/// Load the PRESTO library.
fn load_library() -> Option<PrestoLib> {
    for name in candidates() {
        let lib = match unsafe { Library::new(&name) } {
            Ok(lib) => lib,
            Err(e) => {
                tracing::trace!(library = %name, error = %e, "PRESTO candidate not loadable");
                continue;
            }
        };
        // The fn pointer stays valid for as long as `lib` is held alongside it.
        let fftfit = match unsafe { lib.get::<FftfitFn>(b"fftfit_\0") } {
            Ok(symbol) => *symbol,
            Err(e) => {
                tracing::debug!(library = %name, error = %e, "Library has no fftfit_ symbol");
                continue;
            }
        };
        tracing::info!("Loaded PRESTO library: {}", name);
        return Some(PrestoLib {
            _lib: lib,
            fftfit,
            origin: name,
        });
    }
    tracing::debug!("PRESTO library not found");
    None
}

/// Get the loaded library, initializing if necessary.
fn get_lib() -> Option<&'static PrestoLib> {
    PRESTO_LIB.get_or_init(load_library).as_ref()
}

/// Check if PRESTO's `fftfit` could be resolved.
pub fn is_available() -> bool {
    get_lib().is_some()
}

/// Name or path the routine was loaded from.
pub fn library_origin() -> Option<&'static str> {
    get_lib().map(|lib| lib.origin.as_str())
}

/// Call `fftfit` on a profile of `n = profile.len()` samples.
///
/// `amplitudes` and `phases` describe the template's harmonics 1..=n/2.
/// Returns `None` if the library is absent or the slice lengths disagree.
pub fn fftfit(profile: &[f32], amplitudes: &[f32], phases: &[f32]) -> Option<FftfitOutput> {
    let lib = get_lib()?;
    let n = profile.len();
    if amplitudes.len() != n / 2 || phases.len() != n / 2 {
        return None;
    }
    let nmax = c_int::try_from(n).ok()?;

    let mut out = FftfitOutput {
        shift: 0.0,
        eshift: 0.0,
        snr: 0.0,
        esnr: 0.0,
        b: 0.0,
        errb: 0.0,
        ngood: 0,
    };
    unsafe {
        (lib.fftfit)(
            profile.as_ptr(),
            amplitudes.as_ptr(),
            phases.as_ptr(),
            &nmax,
            &mut out.shift,
            &mut out.eshift,
            &mut out.snr,
            &mut out.esnr,
            &mut out.b,
            &mut out.errb,
            &mut out.ngood,
        );
    }
    Some(out)
}
