//! Peak and valley detection.
//!
//! Keypoints are located where the finite-difference derivative of the
//! intensity changes sign. The sub-pixel position is refined by linearly
//! interpolating the derivative's zero crossing between the two samples.

use super::{Spectrum, SpectrumDataPoint, SpectrumPointType};

/// First-order finite-difference derivative with respect to the pixel index.
/// The first and last samples are set to zero.
pub fn derivative(data: &[f64]) -> Vec<f64> {
    let mut result = vec![0.0; data.len()];
    if data.len() < 3 {
        return result;
    }
    for ii in 1..data.len() - 1 {
        result[ii] = 0.5 * (data[ii + 1] - data[ii - 1]);
    }
    result
}

/// Locates all peaks with intensity at or above `minimum_intensity`.
///
/// When the spectrum carries a wavelength axis the returned points have
/// their wavelength filled in.
pub fn find_peaks(spectrum: &Spectrum, minimum_intensity: f64) -> Vec<SpectrumDataPoint> {
    find_extrema(spectrum, minimum_intensity, SpectrumPointType::Peak)
}

/// Locates all valleys with intensity at or above `minimum_intensity`.
pub fn find_valleys(spectrum: &Spectrum, minimum_intensity: f64) -> Vec<SpectrumDataPoint> {
    find_extrema(spectrum, minimum_intensity, SpectrumPointType::Valley)
}

fn find_extrema(
    spectrum: &Spectrum,
    minimum_intensity: f64,
    point_type: SpectrumPointType,
) -> Vec<SpectrumDataPoint> {
    let data = spectrum.data();
    let slope = derivative(data);
    let mut result = Vec::new();

    // The endpoint derivatives are zeroed placeholders; a crossing test that
    // touched them would turn any ramp into the edge into a fake extremum.
    for ii in 1..slope.len().saturating_sub(2) {
        let before = slope[ii];
        let after = slope[ii + 1];
        let crosses = match point_type {
            SpectrumPointType::Peak => before > 0.0 && after <= 0.0,
            SpectrumPointType::Valley => before < 0.0 && after >= 0.0,
            SpectrumPointType::Other => false,
        };
        if !crosses {
            continue;
        }

        // Sub-pixel refinement from the derivative's zero crossing.
        let span = before - after;
        let alpha = if span.abs() > f64::EPSILON {
            before / span
        } else {
            0.0
        };
        let pixel = ii as f64 + alpha;

        let intensity = data[ii].max(data[ii + 1]);
        let extremal_intensity = match point_type {
            SpectrumPointType::Valley => data[ii].min(data[ii + 1]),
            _ => intensity,
        };
        if extremal_intensity < minimum_intensity {
            continue;
        }

        result.push(SpectrumDataPoint {
            pixel,
            wavelength: spectrum.wavelength_at(pixel),
            intensity: extremal_intensity,
            point_type,
        });
    }

    result
}
