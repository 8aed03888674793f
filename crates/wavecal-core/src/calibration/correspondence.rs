//! Candidate correspondence construction and scoring.
//!
//! A correspondence connects one keypoint in the measured spectrum with one
//! keypoint in the theoretical (Fraunhofer) spectrum. The builder enumerates
//! every pairing allowed by the pixel-distance bound, scores each by the
//! shape similarity of the two spectra around the keypoints, and keeps the
//! best fraction. Resolving conflicting pairings is left to the consensus
//! loop unless per-keypoint uniqueness is asked for explicitly.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ConfigurationError;
use crate::numerics::{remove_mean, stdev, sum_of_squared_differences};
use crate::spectra::{Spectrum, SpectrumDataPoint};

use super::ransac::RansacWavelengthCalibrationSettings;

/// Error value given to correspondences whose similarity window runs off
/// either spectrum. Such pairs are kept out of the selected set by the
/// sort-and-retain step rather than by failing.
pub const UNMEASURABLE_CORRESPONDENCE_ERROR: f64 = 1.0e30;

/// A proposed match between a measured keypoint and a theoretical keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Correspondence {
    /// Index of the keypoint in the measured spectrum (its rounded pixel).
    pub measured_idx: usize,
    /// Value of the measured keypoint: a pixel in the measured spectrum.
    pub measured_value: f64,
    /// Index of the keypoint in the theoretical spectrum (its rounded pixel,
    /// on the same detector grid as the measured spectrum).
    pub theoretical_idx: usize,
    /// Value of the theoretical keypoint: a wavelength in nm.
    pub theoretical_value: f64,
    /// Similarity error between the two keypoints, lower is better.
    /// Zero until the correspondence has been scored.
    pub error: f64,
}

/// Settings deciding which keypoints make up good correspondences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrespondenceSelectionSettings {
    /// Width, in pixels, of the region around each keypoint used to gauge
    /// the error of a correspondence. Covers a full valley or peak at the
    /// default keypoint density.
    pub pixel_region_for_error_measurement: usize,
    /// The fraction of the scored correspondences to keep, lowest error first.
    pub fraction_of_correspondences_to_select: f64,
    /// First measured pixel to include. Signal tends to fall off at the
    /// short-wavelength edge of the detector.
    pub measured_pixel_start: usize,
    /// One past the last measured pixel to include. Must exceed the start.
    pub measured_pixel_stop: usize,
    /// When set, each measured keypoint keeps only its single best-scoring
    /// pairing. Off by default; the consensus loop resolves conflicts.
    pub enforce_unique_measured_keypoint: bool,
}

impl Default for CorrespondenceSelectionSettings {
    fn default() -> Self {
        Self {
            pixel_region_for_error_measurement: 20,
            fraction_of_correspondences_to_select: 0.2,
            measured_pixel_start: 650,
            measured_pixel_stop: 2100,
            enforce_unique_measured_keypoint: false,
        }
    }
}

impl CorrespondenceSelectionSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.measured_pixel_start >= self.measured_pixel_stop {
            return Err(ConfigurationError::EmptyMeasuredPixelRange {
                start: self.measured_pixel_start,
                stop: self.measured_pixel_stop,
            });
        }
        if self.pixel_region_for_error_measurement == 0 {
            return Err(ConfigurationError::EmptyErrorMeasurementRegion);
        }
        let fraction = self.fraction_of_correspondences_to_select;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigurationError::InvalidSelectionFraction { value: fraction });
        }
        Ok(())
    }
}

/// Measures the similarity between the two spectra around the keypoints of
/// the given correspondence and stores it in `correspondence.error`.
///
/// The similarity is the sum of squared differences between the two regions
/// after each has been normalized to zero mean and unit scale, so absolute
/// intensity differences between the spectra do not bias the score.
/// A window running off either spectrum sets a sentinel error instead of
/// failing; keypoints near the edges are expected to sometimes be excluded.
pub fn measure_correspondence_error(
    correspondence: &mut Correspondence,
    measured_spectrum: &Spectrum,
    theoretical_spectrum: &Spectrum,
    settings: &CorrespondenceSelectionSettings,
) {
    let width = settings.pixel_region_for_error_measurement;

    let measured_window =
        extract_window(measured_spectrum.data(), correspondence.measured_idx, width);
    let theoretical_window = extract_window(
        theoretical_spectrum.data(),
        correspondence.theoretical_idx,
        width,
    );

    let (Some(mut measured_window), Some(mut theoretical_window)) =
        (measured_window, theoretical_window)
    else {
        correspondence.error = UNMEASURABLE_CORRESPONDENCE_ERROR;
        return;
    };

    normalize_window(&mut measured_window);
    normalize_window(&mut theoretical_window);

    correspondence.error = sum_of_squared_differences(&measured_window, &theoretical_window)
        .unwrap_or(UNMEASURABLE_CORRESPONDENCE_ERROR);
}

/// Generates the list of all reasonable correspondences between the measured
/// and theoretical keypoints. This runs as a preparatory step before the
/// consensus loop.
///
/// Measured keypoints outside the configured pixel range are dropped, each
/// surviving keypoint is paired with every theoretical keypoint within the
/// maximum-pixel-distance bound, every pairing is scored, and the lowest-error
/// fraction is returned sorted ascending by error.
pub fn list_possible_correspondences(
    measured_keypoints: &[SpectrumDataPoint],
    measured_spectrum: &Spectrum,
    theoretical_keypoints: &[SpectrumDataPoint],
    theoretical_spectrum: &Spectrum,
    ransac_settings: &RansacWavelengthCalibrationSettings,
    selection_settings: &CorrespondenceSelectionSettings,
) -> Result<Vec<Correspondence>, ConfigurationError> {
    selection_settings.validate()?;
    ransac_settings.validate()?;

    let pixel_start = selection_settings.measured_pixel_start as f64;
    let pixel_stop = selection_settings.measured_pixel_stop as f64;
    let maximum_distance =
        ransac_settings.maximum_pixel_distance_for_possible_correspondence as f64;

    let mut candidates = Vec::new();
    for measured in measured_keypoints.iter() {
        if measured.pixel < pixel_start || measured.pixel >= pixel_stop {
            continue;
        }
        for theoretical in theoretical_keypoints.iter() {
            // The theoretical keypoint's pixel is expressed on the measured
            // detector grid through the initial calibration, which makes the
            // two positions directly comparable.
            if (measured.pixel - theoretical.pixel).abs() > maximum_distance {
                continue;
            }
            let mut correspondence = Correspondence {
                measured_idx: measured.pixel.round().max(0.0) as usize,
                measured_value: measured.pixel,
                theoretical_idx: theoretical.pixel.round().max(0.0) as usize,
                theoretical_value: theoretical.wavelength.unwrap_or(theoretical.pixel),
                error: 0.0,
            };
            measure_correspondence_error(
                &mut correspondence,
                measured_spectrum,
                theoretical_spectrum,
                selection_settings,
            );
            candidates.push(correspondence);
        }
    }

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    candidates.sort_by(|a, b| a.error.total_cmp(&b.error));

    if selection_settings.enforce_unique_measured_keypoint {
        candidates = deduplicate_by_measured_keypoint(candidates);
    }

    let retain = ((candidates.len() as f64
        * selection_settings.fraction_of_correspondences_to_select)
        .round() as usize)
        .clamp(1, candidates.len());
    candidates.truncate(retain);

    debug!(
        selected = candidates.len(),
        "selected correspondence candidates"
    );
    Ok(candidates)
}

fn extract_window(data: &[f64], center: usize, width: usize) -> Option<Vec<f64>> {
    let start = center.checked_sub(width)?;
    let stop = center + width;
    if stop > data.len() {
        return None;
    }
    Some(data[start..stop].to_vec())
}

fn normalize_window(window: &mut [f64]) {
    remove_mean(window);
    let scale = stdev(window);
    if scale > f64::EPSILON {
        for value in window.iter_mut() {
            *value /= scale;
        }
    }
}

fn deduplicate_by_measured_keypoint(sorted: Vec<Correspondence>) -> Vec<Correspondence> {
    let mut seen = std::collections::HashSet::new();
    sorted
        .into_iter()
        .filter(|correspondence| seen.insert(correspondence.measured_idx))
        .collect()
}
