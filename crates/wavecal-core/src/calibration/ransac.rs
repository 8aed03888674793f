//! The RANSAC consensus loop for pixel-to-wavelength calibration.
//!
//! Each iteration draws a minimal set of correspondences, fits a low-order
//! polynomial mapping measured pixel to wavelength, and counts how many of
//! the remaining correspondences agree with the fitted model within the
//! inlier tolerance. The model with the largest consensus set wins; ties are
//! broken by the smaller residual error. Failure to converge is an expected
//! operational outcome and is reported through the result fields, never as
//! an error.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ConfigurationError;
use crate::numerics::{fit_polynomial, polynomial_value_at};

use super::correspondence::Correspondence;

/// Settings for one RANSAC wavelength calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacWavelengthCalibrationSettings {
    /// Order of the pixel-to-wavelength polynomial.
    pub model_polynomial_order: usize,
    /// Fixed iteration budget; the sole bound on worst-case latency.
    pub number_of_ransac_iterations: usize,
    /// Correspondences drawn per iteration. Must be at least
    /// `model_polynomial_order + 1` to determine the polynomial.
    pub sample_size: usize,
    /// How close, in nm, a keypoint must be to the model prediction to
    /// count as an inlier.
    pub inlier_limit_in_wavelength: f64,
    /// Largest pixel error tolerated in the initial calibration when
    /// pairing measured and theoretical keypoints.
    pub maximum_pixel_distance_for_possible_correspondence: usize,
    /// Re-fit the winning model on its full consensus set afterwards.
    pub refine: bool,
}

impl Default for RansacWavelengthCalibrationSettings {
    fn default() -> Self {
        Self {
            model_polynomial_order: 3,
            number_of_ransac_iterations: 500_000,
            sample_size: 4,
            inlier_limit_in_wavelength: 0.2,
            maximum_pixel_distance_for_possible_correspondence: 150,
            refine: true,
        }
    }
}

impl RansacWavelengthCalibrationSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.model_polynomial_order == 0 {
            return Err(ConfigurationError::ZeroPolynomialOrder);
        }
        if self.number_of_ransac_iterations == 0 {
            return Err(ConfigurationError::ZeroIterations);
        }
        let required = self.model_polynomial_order + 1;
        if self.sample_size < required {
            return Err(ConfigurationError::SampleSizeTooSmall {
                sample_size: self.sample_size,
                order: self.model_polynomial_order,
                required,
            });
        }
        if !self.inlier_limit_in_wavelength.is_finite() || self.inlier_limit_in_wavelength <= 0.0 {
            return Err(ConfigurationError::InvalidInlierLimit {
                value: self.inlier_limit_in_wavelength,
            });
        }
        Ok(())
    }
}

/// Outcome of one calibration run.
///
/// Callers must judge the calibration quality from
/// `highest_number_of_inliers` against `number_of_possible_correlations`
/// before trusting the coefficients: a run that never found a valid model
/// reports zero inliers, all-zero coefficients and a sentinel error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RansacWavelengthCalibrationResult {
    /// Pixel-to-wavelength polynomial coefficients, 0th order first.
    pub best_fitting_model_coefficients: Vec<f64>,
    /// Order of the fitted polynomial.
    pub model_polynomial_order: usize,
    /// Size of the consensus set of the best model.
    pub highest_number_of_inliers: usize,
    /// Which of the incoming correspondences is an inlier. The number of
    /// true entries equals `highest_number_of_inliers`.
    pub correspondence_is_inlier: Vec<bool>,
    /// Sum of squared residuals of the best model over its inliers.
    pub smallest_error: f64,
    /// Total number of incoming correspondences, the upper bound for
    /// `highest_number_of_inliers`.
    pub number_of_possible_correlations: usize,
}

impl RansacWavelengthCalibrationResult {
    fn empty(order: usize, number_of_correspondences: usize) -> Self {
        Self {
            best_fitting_model_coefficients: vec![0.0; order + 1],
            model_polynomial_order: order,
            highest_number_of_inliers: 0,
            correspondence_is_inlier: vec![false; number_of_correspondences],
            smallest_error: f64::MAX,
            number_of_possible_correlations: number_of_correspondences,
        }
    }
}

/// The immutable setup of a calibration run. Holds only the settings, so one
/// setup may serve concurrent calls as long as each call brings its own
/// random generator.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacWavelengthCalibrationSetup {
    settings: RansacWavelengthCalibrationSettings,
}

impl RansacWavelengthCalibrationSetup {
    pub fn new(
        settings: RansacWavelengthCalibrationSettings,
    ) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &RansacWavelengthCalibrationSettings {
        &self.settings
    }

    /// Runs the calibration with a generator seeded from `seed`. The same
    /// seed and input always give the same result.
    pub fn do_wavelength_calibration_seeded(
        &self,
        possible_correspondences: &[Correspondence],
        seed: u64,
    ) -> RansacWavelengthCalibrationResult {
        let mut rng = StdRng::seed_from_u64(seed);
        self.do_wavelength_calibration(possible_correspondences, &mut rng)
    }

    /// Performs the calibration of a measured spectrum against a high
    /// resolution Fraunhofer spectrum, expressed as a set of possible
    /// correspondences between the two.
    pub fn do_wavelength_calibration(
        &self,
        possible_correspondences: &[Correspondence],
        rng: &mut impl Rng,
    ) -> RansacWavelengthCalibrationResult {
        let order = self.settings.model_polynomial_order;
        let sample_size = self.settings.sample_size;
        let total = possible_correspondences.len();

        let mut result = RansacWavelengthCalibrationResult::empty(order, total);
        if total < sample_size {
            debug!(
                correspondences = total,
                sample_size, "too few correspondences for a single sample"
            );
            return result;
        }

        let mut sample_pixels = vec![0.0; sample_size];
        let mut sample_wavelengths = vec![0.0; sample_size];
        let mut inlier_mask = vec![false; total];

        for iteration in 0..self.settings.number_of_ransac_iterations {
            // Distinct indices, uniformly without replacement (partial
            // Fisher-Yates over the index range).
            let sample = rand::seq::index::sample(rng, total, sample_size);
            for (slot, idx) in sample.iter().enumerate() {
                sample_pixels[slot] = possible_correspondences[idx].measured_value;
                sample_wavelengths[slot] = possible_correspondences[idx].theoretical_value;
            }

            // A singular sample (duplicate pixels) is skipped, not surfaced.
            let Ok(coefficients) = fit_polynomial(&sample_pixels, &sample_wavelengths, order)
            else {
                continue;
            };

            let (inlier_count, residual_error) = count_inliers(
                &coefficients,
                possible_correspondences,
                self.settings.inlier_limit_in_wavelength,
                &mut inlier_mask,
            );
            if inlier_count == 0 {
                continue;
            }

            let improves = inlier_count > result.highest_number_of_inliers
                || (inlier_count == result.highest_number_of_inliers
                    && residual_error < result.smallest_error);
            if improves {
                result.highest_number_of_inliers = inlier_count;
                result.smallest_error = residual_error;
                result.best_fitting_model_coefficients = coefficients;
                result.correspondence_is_inlier.copy_from_slice(&inlier_mask);
                debug!(
                    iteration,
                    inliers = inlier_count,
                    residual = residual_error,
                    "improved consensus model"
                );
            }

            if result.highest_number_of_inliers == total {
                debug!(iteration, "perfect consensus reached, stopping early");
                break;
            }
        }

        if self.settings.refine && result.highest_number_of_inliers > 0 {
            self.refine_from_inliers(possible_correspondences, &mut result, &mut inlier_mask);
        }

        result
    }

    /// Re-fits the polynomial on every inlier of the winning model. The
    /// consensus set is larger than the minimal sample, so this usually
    /// tightens the fit. The refit is rejected when it loses inliers.
    fn refine_from_inliers(
        &self,
        possible_correspondences: &[Correspondence],
        result: &mut RansacWavelengthCalibrationResult,
        scratch_mask: &mut [bool],
    ) {
        let mut pixels = Vec::with_capacity(result.highest_number_of_inliers);
        let mut wavelengths = Vec::with_capacity(result.highest_number_of_inliers);
        for (correspondence, &is_inlier) in possible_correspondences
            .iter()
            .zip(result.correspondence_is_inlier.iter())
        {
            if is_inlier {
                pixels.push(correspondence.measured_value);
                wavelengths.push(correspondence.theoretical_value);
            }
        }

        let Ok(refined) =
            fit_polynomial(&pixels, &wavelengths, self.settings.model_polynomial_order)
        else {
            return;
        };

        let (inlier_count, residual_error) = count_inliers(
            &refined,
            possible_correspondences,
            self.settings.inlier_limit_in_wavelength,
            scratch_mask,
        );
        if inlier_count < result.highest_number_of_inliers {
            debug!(
                inliers = inlier_count,
                previous = result.highest_number_of_inliers,
                "refined model lost inliers, keeping the sampled model"
            );
            return;
        }

        result.highest_number_of_inliers = inlier_count;
        result.smallest_error = residual_error;
        result.best_fitting_model_coefficients = refined;
        result.correspondence_is_inlier.copy_from_slice(scratch_mask);
    }
}

/// Marks every correspondence within the inlier limit of the model and
/// returns the inlier count together with the summed squared residuals over
/// the inliers.
fn count_inliers(
    coefficients: &[f64],
    correspondences: &[Correspondence],
    inlier_limit: f64,
    mask: &mut [bool],
) -> (usize, f64) {
    let mut count = 0;
    let mut residual_error = 0.0;
    for (correspondence, flag) in correspondences.iter().zip(mask.iter_mut()) {
        let predicted = polynomial_value_at(coefficients, correspondence.measured_value);
        let residual = predicted - correspondence.theoretical_value;
        if residual.abs() <= inlier_limit {
            *flag = true;
            count += 1;
            residual_error += residual * residual;
        } else {
            *flag = false;
        }
    }
    (count, residual_error)
}
