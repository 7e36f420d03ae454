//! Cyclic Phase Wrapping
//!
//! Shifts are measured in turns, and only their value modulo one is
//! meaningful. [`wrap`] picks the canonical representative in the half-open
//! interval (-0.5, 0.5].
//!
//! ## Example
//!
//! ```rust
//! use phasefit_core::phase::{wrap, wrap_slice};
//!
//! assert!((wrap(1.25) - 0.25).abs() < 1e-12);
//! assert_eq!(wrap(-0.5), 0.5);
//!
//! let wrapped = wrap_slice(&[0.75, 3.0, -1.1]);
//! assert!((wrapped[0] + 0.25).abs() < 1e-12);
//! ```

/// Wrap a phase in turns to (-0.5, 0.5].
///
/// Uses round-half-to-even and then maps the -0.5 edge onto +0.5. NaN
/// propagates, and infinities map to NaN.
#[inline]
pub fn wrap(x: f64) -> f64 {
    let w = x - x.round_ties_even();
    if w == -0.5 {
        0.5
    } else {
        w
    }
}

/// Wrap every phase in a slice to (-0.5, 0.5].
pub fn wrap_slice(input: &[f64]) -> Vec<f64> {
    input.iter().map(|&x| wrap(x)).collect()
}

/// Cyclic distance between two phases, in [0, 0.5].
#[inline]
pub fn phase_distance(a: f64, b: f64) -> f64 {
    wrap(a - b).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_in_range() {
        assert_eq!(wrap(0.0), 0.0);
        assert!((wrap(0.3) - 0.3).abs() < 1e-15);
        assert!((wrap(-0.3) + 0.3).abs() < 1e-15);
    }

    #[test]
    fn test_wrap_half_open_edge() {
        assert_eq!(wrap(0.5), 0.5);
        assert_eq!(wrap(-0.5), 0.5);
        assert_eq!(wrap(1.5), 0.5);
        assert_eq!(wrap(-2.5), 0.5);
    }

    #[test]
    fn test_wrap_integer_offsets() {
        for k in -5..=5 {
            let w = wrap(0.2 + k as f64);
            assert!((w - 0.2).abs() < 1e-12, "k={}: got {}", k, w);
        }
    }

    #[test]
    fn test_wrap_idempotent() {
        for &x in &[0.7, -3.2, 12.49, 0.5, -0.5, 1e6 + 0.125] {
            assert_eq!(wrap(wrap(x)), wrap(x));
        }
    }

    #[test]
    fn test_wrap_non_finite() {
        assert!(wrap(f64::NAN).is_nan());
        assert!(wrap(f64::INFINITY).is_nan());
    }

    #[test]
    fn test_wrap_slice() {
        let wrapped = wrap_slice(&[0.75, 3.0, -1.1]);
        assert!((wrapped[0] + 0.25).abs() < 1e-12);
        assert_eq!(wrapped[1], 0.0);
        assert!((wrapped[2] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_phase_distance() {
        assert!((phase_distance(0.95, 0.05) - 0.1).abs() < 1e-12);
        assert!((phase_distance(0.05, 0.95) - 0.1).abs() < 1e-12);
    }
}
