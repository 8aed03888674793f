mod keypoints;

pub use keypoints::{derivative, find_peaks, find_valleys};

use serde::{Deserialize, Serialize};

use crate::domain::ConfigurationError;
use crate::numerics::value_at_fractional_index;

/// Classification of a spectrum keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectrumPointType {
    Peak,
    Valley,
    #[default]
    Other,
}

/// A locally extremal point in a spectrum, used as a matching landmark.
///
/// The wavelength is filled in when the spectrum the point was extracted from
/// carries a pixel-to-wavelength axis, otherwise it is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumDataPoint {
    /// The (fractional) spectrometer pixel where this point is found.
    pub pixel: f64,
    /// The wavelength in nm where this point is found, when known.
    pub wavelength: Option<f64>,
    /// The intensity of the spectrum at this point.
    pub intensity: f64,
    #[serde(default)]
    pub point_type: SpectrumPointType,
}

/// An ordered sequence of intensity samples, optionally carrying a wavelength
/// for each pixel. Read-only for the duration of a calibration run.
/// Built through the constructors so the axis length invariant holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    data: Vec<f64>,
    wavelengths: Option<Vec<f64>>,
}

impl Spectrum {
    pub fn new(data: Vec<f64>) -> Self {
        Self {
            data,
            wavelengths: None,
        }
    }

    pub fn with_wavelengths(
        data: Vec<f64>,
        wavelengths: Vec<f64>,
    ) -> Result<Self, ConfigurationError> {
        if wavelengths.len() != data.len() {
            return Err(ConfigurationError::WavelengthAxisMismatch {
                wavelengths: wavelengths.len(),
                samples: data.len(),
            });
        }
        Ok(Self {
            data,
            wavelengths: Some(wavelengths),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn wavelengths(&self) -> Option<&[f64]> {
        self.wavelengths.as_deref()
    }

    /// Wavelength at a fractional pixel, interpolated from the axis.
    /// `None` when the spectrum has no wavelength axis or the pixel is out of range.
    pub fn wavelength_at(&self, pixel: f64) -> Option<f64> {
        let axis = self.wavelengths.as_deref()?;
        value_at_fractional_index(axis, pixel).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wavelength_axis_must_match_sample_count() {
        let result = Spectrum::with_wavelengths(vec![1.0, 2.0, 3.0], vec![300.0, 301.0]);
        assert!(matches!(
            result,
            Err(ConfigurationError::WavelengthAxisMismatch {
                wavelengths: 2,
                samples: 3
            })
        ));
    }

    #[test]
    fn wavelength_lookup_interpolates_between_pixels() {
        let spectrum =
            Spectrum::with_wavelengths(vec![0.0, 0.0, 0.0], vec![300.0, 302.0, 304.0]).unwrap();
        assert_eq!(spectrum.wavelength_at(0.5), Some(301.0));
        assert_eq!(spectrum.wavelength_at(2.0), Some(304.0));
        assert_eq!(spectrum.wavelength_at(2.5), None);

        let uncalibrated = Spectrum::new(vec![0.0; 3]);
        assert_eq!(uncalibrated.wavelength_at(1.0), None);
    }
}
