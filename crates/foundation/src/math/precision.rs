//! Deterministic float ordering.
//!
//! Cluster search breaks distance ties on insertion order, which only works if
//! float comparisons never depend on NaN payloads or the sign of zero.

use core::cmp::Ordering;

/// Folds `-0.0` into `0.0` and every NaN into one NaN.
pub fn canonical_f64(v: f64) -> f64 {
    match v {
        v if v == 0.0 => 0.0,
        v if v.is_nan() => f64::NAN,
        v => v,
    }
}

/// Total order on canonical floats; equal distances compare `Equal`.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}
