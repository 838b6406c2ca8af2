//! Numeric utility functions

/// Round to two decimal places, half away from zero.
///
/// Ratings are means of values in 1..=5, so the half-away-from-zero
/// behavior of `f64::round` is half-up here.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
