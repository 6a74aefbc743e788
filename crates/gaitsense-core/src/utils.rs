//! Common utility functions for the gaitsense pipeline.
//!
//! This module provides the small numeric helpers used throughout the crates.

/// Arithmetic mean of a slice. Returns 0.0 for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation. Returns 0.0 with fewer than two samples.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn std_deviation(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let avg = mean(data);
    let variance = data.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Mean with linearly increasing weights, oldest sample first.
///
/// The newest sample carries the largest weight. Returns 0.0 for an
/// empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linear_weighted_mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (i, value) in data.iter().enumerate() {
        let weight = (i + 1) as f64;
        weighted_sum += value * weight;
        weight_total += weight;
    }
    weighted_sum / weight_total
}

/// Linearly interpolates between two values.
#[must_use]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    (b - a).mul_add(t, a)
}

/// Converts degrees to radians.
#[must_use]
pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees.to_radians()
}

/// Converts radians to degrees.
#[must_use]
pub fn rad_to_deg(radians: f64) -> f64 {
    radians.to_degrees()
}
