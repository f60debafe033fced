//! Small descriptive statistics used by the estimators

use std::f64::consts::TAU;

/// Minutes in a day, the period of the clock used for circular statistics
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Upper bound reported for circular spread when start times are uniformly scattered
const MAX_CIRCULAR_SPREAD_MINUTES: f64 = MINUTES_PER_DAY / 2.0;

/// Median; even counts average the two middle values
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Circular standard deviation of clock times given in minutes since midnight,
/// returned in minutes. Uses `sqrt(-2 ln R)` where R is the mean resultant length.
pub fn circular_std_dev_minutes(minutes: &[f64]) -> Option<f64> {
    if minutes.is_empty() {
        return None;
    }

    let n = minutes.len() as f64;
    let (sin_sum, cos_sum) = minutes.iter().fold((0.0, 0.0), |(s, c), m| {
        let angle = m / MINUTES_PER_DAY * TAU;
        (s + angle.sin(), c + angle.cos())
    });
    let resultant = ((sin_sum / n).powi(2) + (cos_sum / n).powi(2)).sqrt();

    if resultant >= 1.0 {
        return Some(0.0);
    }
    if resultant <= f64::EPSILON {
        return Some(MAX_CIRCULAR_SPREAD_MINUTES);
    }

    let radians = (-2.0 * resultant.ln()).sqrt();
    Some((radians / TAU * MINUTES_PER_DAY).min(MAX_CIRCULAR_SPREAD_MINUTES))
}

/// Round to one decimal place for reporting
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
