//! Small vector primitives shared by the spectrum and calibration routines.
//!
//! Empty inputs return neutral values (0.0) rather than failing, matching how
//! the calibration pipeline treats missing signal. Index and shape misuse is
//! an explicit error, never an out-of-bounds access.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VectorError {
    #[error("vector lengths must match, got {left} and {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("fractional index {index} is outside the valid range [0, {last}]")]
    IndexOutOfRange { index: String, last: usize },
}

/// Largest value and the index where it first occurs. Empty input yields (0.0, 0).
pub fn max_value(values: &[f64]) -> (f64, usize) {
    let mut max = match values.first() {
        Some(first) => *first,
        None => return (0.0, 0),
    };
    let mut idx = 0;
    for (ii, &value) in values.iter().enumerate().skip(1) {
        if value > max {
            max = value;
            idx = ii;
        }
    }
    (max, idx)
}

/// Smallest value and the index where it first occurs. Empty input yields (0.0, 0).
pub fn min_value(values: &[f64]) -> (f64, usize) {
    let mut min = match values.first() {
        Some(first) => *first,
        None => return (0.0, 0),
    };
    let mut idx = 0;
    for (ii, &value) in values.iter().enumerate().skip(1) {
        if value < min {
            min = value;
            idx = ii;
        }
    }
    (min, idx)
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    sum(values) / values.len() as f64
}

/// Population variance; zero for fewer than two samples.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let mean = average(values);
    let accumulated: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    accumulated / values.len() as f64
}

pub fn stdev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

pub fn remove_mean(values: &mut [f64]) {
    let mean = average(values);
    for value in values.iter_mut() {
        *value -= mean;
    }
}

/// Rescales the values into [0, 1]. A constant vector is left unchanged.
pub fn normalize(values: &mut [f64]) {
    let (min, _) = min_value(values);
    let (max, _) = max_value(values);
    let span = max - min;
    if span.abs() <= f64::EPSILON {
        return;
    }
    for value in values.iter_mut() {
        *value = (*value - min) / span;
    }
}

pub fn sum_of_squared_differences(a: &[f64], b: &[f64]) -> Result<f64, VectorError> {
    if a.len() != b.len() {
        return Err(VectorError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let mut accumulated = 0.0;
    for (&left, &right) in a.iter().zip(b.iter()) {
        let diff = left - right;
        accumulated += diff * diff;
    }
    Ok(accumulated)
}

/// Linear interpolation between the two samples surrounding a fractional index.
pub fn value_at_fractional_index(values: &[f64], index: f64) -> Result<f64, VectorError> {
    if values.is_empty() || !index.is_finite() || index < 0.0 || index > (values.len() - 1) as f64 {
        return Err(VectorError::IndexOutOfRange {
            index: format!("{index}"),
            last: values.len().saturating_sub(1),
        });
    }
    let below = index.floor() as usize;
    let above = index.ceil() as usize;
    let alpha = index - index.floor();
    Ok(values[below] * (1.0 - alpha) + values[above] * alpha)
}

/// Evenly spaced grid from `min` to `max` inclusive. A single-point grid holds `min`.
pub fn generate_linear_grid(min: f64, max: f64, length: usize) -> Vec<f64> {
    if length == 0 {
        return Vec::new();
    }
    if length == 1 {
        return vec![min];
    }
    (0..length)
        .map(|ii| min + (max - min) * ii as f64 / (length - 1) as f64)
        .collect()
}
