//! Fraunhofer reference spectrum generation.
//!
//! The calibration consumes a high-resolution solar reference resampled onto
//! the instrument's pixel grid. Generation is behind a trait so different
//! solar-atlas sources can be plugged in; the concrete generator here works
//! from an in-memory atlas and convolves it with a sampled instrument line
//! shape. Loading atlas files from disk is out of scope.

use crate::domain::ConfigurationError;
use crate::spectra::Spectrum;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FraunhoferError {
    #[error("solar atlas must hold at least 2 samples, got {actual}")]
    AtlasTooSmall { actual: usize },
    #[error("solar atlas wavelength axis has {wavelengths} entries but {intensities} intensities")]
    AtlasLengthMismatch {
        wavelengths: usize,
        intensities: usize,
    },
    #[error("instrument line shape must hold at least one sample")]
    EmptyLineShape,
    #[error("instrument line shape weights sum to zero")]
    DegenerateLineShape,
    #[error("pixel-to-wavelength mapping is empty")]
    EmptyWavelengthMapping,
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// An inclusive wavelength interval in nm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthRange {
    pub low: f64,
    pub high: f64,
}

impl WavelengthRange {
    pub fn is_empty(&self) -> bool {
        self.low >= self.high
    }
}

/// A sampled instrument line shape: wavelength offsets from the line center
/// together with the relative response at each offset.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentLineShape {
    pub wavelength_offsets: Vec<f64>,
    pub amplitudes: Vec<f64>,
}

impl InstrumentLineShape {
    /// A Gaussian line shape with the given full width at half maximum,
    /// sampled out to three standard deviations.
    pub fn gaussian(fwhm: f64, samples_per_side: usize) -> Self {
        // Zero samples per side degenerates to a delta at the line center.
        if samples_per_side == 0 {
            return Self {
                wavelength_offsets: vec![0.0],
                amplitudes: vec![1.0],
            };
        }
        let sigma = fwhm / (8.0 * 2.0_f64.ln()).sqrt();
        let reach = 3.0 * sigma;
        let count = 2 * samples_per_side + 1;
        let mut wavelength_offsets = Vec::with_capacity(count);
        let mut amplitudes = Vec::with_capacity(count);
        for ii in 0..count {
            let offset = -reach + 2.0 * reach * ii as f64 / (count - 1) as f64;
            wavelength_offsets.push(offset);
            amplitudes.push((-offset * offset / (2.0 * sigma * sigma)).exp());
        }
        Self {
            wavelength_offsets,
            amplitudes,
        }
    }
}

/// Produces a reference spectrum for a given pixel-to-wavelength mapping and
/// instrument line shape.
pub trait FraunhoferSpectrumGenerator {
    /// The wavelength range over which generated spectra are valid for the
    /// given mapping, limited by the extent of the underlying atlas.
    fn fraunhofer_range(&self, pixel_to_wavelength: &[f64]) -> WavelengthRange;

    /// The atlas convolved with the line shape and resampled at each pixel's
    /// wavelength. The returned spectrum carries the mapping as its axis.
    fn fraunhofer_spectrum(
        &self,
        pixel_to_wavelength: &[f64],
        line_shape: &InstrumentLineShape,
    ) -> Result<Spectrum, FraunhoferError>;
}

/// Generator backed by an in-memory high-resolution solar atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarAtlasFraunhoferGenerator {
    atlas_wavelengths: Vec<f64>,
    atlas_intensities: Vec<f64>,
}

impl SolarAtlasFraunhoferGenerator {
    pub fn new(
        atlas_wavelengths: Vec<f64>,
        atlas_intensities: Vec<f64>,
    ) -> Result<Self, FraunhoferError> {
        if atlas_wavelengths.len() != atlas_intensities.len() {
            return Err(FraunhoferError::AtlasLengthMismatch {
                wavelengths: atlas_wavelengths.len(),
                intensities: atlas_intensities.len(),
            });
        }
        if atlas_wavelengths.len() < 2 {
            return Err(FraunhoferError::AtlasTooSmall {
                actual: atlas_wavelengths.len(),
            });
        }
        Ok(Self {
            atlas_wavelengths,
            atlas_intensities,
        })
    }

    /// Linear interpolation on the atlas grid, clamped at both ends.
    fn atlas_value_at(&self, wavelength: f64) -> f64 {
        let grid = &self.atlas_wavelengths;
        let last = grid.len() - 1;
        if wavelength <= grid[0] {
            return self.atlas_intensities[0];
        }
        if wavelength >= grid[last] {
            return self.atlas_intensities[last];
        }
        let above = grid.partition_point(|&w| w < wavelength);
        let below = above - 1;
        let span = grid[above] - grid[below];
        if span <= f64::EPSILON {
            return self.atlas_intensities[below];
        }
        let alpha = (wavelength - grid[below]) / span;
        self.atlas_intensities[below] * (1.0 - alpha) + self.atlas_intensities[above] * alpha
    }
}

impl FraunhoferSpectrumGenerator for SolarAtlasFraunhoferGenerator {
    fn fraunhofer_range(&self, pixel_to_wavelength: &[f64]) -> WavelengthRange {
        let atlas_low = self.atlas_wavelengths[0];
        let atlas_high = self.atlas_wavelengths[self.atlas_wavelengths.len() - 1];
        let mapping_low = pixel_to_wavelength
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let mapping_high = pixel_to_wavelength
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        WavelengthRange {
            low: atlas_low.max(mapping_low),
            high: atlas_high.min(mapping_high),
        }
    }

    fn fraunhofer_spectrum(
        &self,
        pixel_to_wavelength: &[f64],
        line_shape: &InstrumentLineShape,
    ) -> Result<Spectrum, FraunhoferError> {
        if pixel_to_wavelength.is_empty() {
            return Err(FraunhoferError::EmptyWavelengthMapping);
        }
        if line_shape.amplitudes.is_empty()
            || line_shape.amplitudes.len() != line_shape.wavelength_offsets.len()
        {
            return Err(FraunhoferError::EmptyLineShape);
        }
        let weight_sum: f64 = line_shape.amplitudes.iter().sum();
        if weight_sum.abs() <= f64::EPSILON {
            return Err(FraunhoferError::DegenerateLineShape);
        }

        let data: Vec<f64> = pixel_to_wavelength
            .iter()
            .map(|&wavelength| {
                let mut accumulated = 0.0;
                for (&offset, &amplitude) in line_shape
                    .wavelength_offsets
                    .iter()
                    .zip(line_shape.amplitudes.iter())
                {
                    accumulated += amplitude * self.atlas_value_at(wavelength + offset);
                }
                accumulated / weight_sum
            })
            .collect();

        Ok(Spectrum::with_wavelengths(
            data,
            pixel_to_wavelength.to_vec(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::generate_linear_grid;

    fn flat_atlas() -> SolarAtlasFraunhoferGenerator {
        let wavelengths = generate_linear_grid(290.0, 320.0, 3001);
        let intensities = vec![1.0; wavelengths.len()];
        SolarAtlasFraunhoferGenerator::new(wavelengths, intensities).unwrap()
    }

    #[test]
    fn atlas_and_intensity_lengths_must_match() {
        let result = SolarAtlasFraunhoferGenerator::new(vec![300.0, 301.0], vec![1.0]);
        assert!(matches!(
            result,
            Err(FraunhoferError::AtlasLengthMismatch { .. })
        ));
    }

    #[test]
    fn range_is_the_intersection_of_atlas_and_mapping() {
        let generator = flat_atlas();
        let mapping = generate_linear_grid(280.0, 310.0, 100);
        let range = generator.fraunhofer_range(&mapping);
        assert_eq!(range.low, 290.0);
        assert_eq!(range.high, 310.0);
        assert!(!range.is_empty());
    }

    #[test]
    fn flat_atlas_convolves_to_a_flat_spectrum() {
        let generator = flat_atlas();
        let mapping = generate_linear_grid(295.0, 315.0, 64);
        let line_shape = InstrumentLineShape::gaussian(0.5, 10);

        let spectrum = generator
            .fraunhofer_spectrum(&mapping, &line_shape)
            .expect("generation should succeed");
        assert_eq!(spectrum.len(), 64);
        for &value in spectrum.data() {
            assert!((value - 1.0).abs() < 1.0e-9);
        }
        assert_eq!(spectrum.wavelengths().unwrap()[0], 295.0);
    }

    #[test]
    fn absorption_line_survives_convolution_at_its_center() {
        // An atlas with a single narrow absorption line at 305 nm.
        let wavelengths = generate_linear_grid(300.0, 310.0, 10001);
        let intensities: Vec<f64> = wavelengths
            .iter()
            .map(|&w| {
                let d: f64 = w - 305.0;
                1.0 - 0.8 * (-d * d / (2.0 * 0.05_f64.powi(2))).exp()
            })
            .collect();
        let generator = SolarAtlasFraunhoferGenerator::new(wavelengths, intensities).unwrap();

        let mapping = generate_linear_grid(302.0, 308.0, 61);
        let line_shape = InstrumentLineShape::gaussian(0.3, 20);
        let spectrum = generator
            .fraunhofer_spectrum(&mapping, &line_shape)
            .unwrap();

        let (_, min_idx) = crate::numerics::min_value(spectrum.data());
        let minimum_wavelength = spectrum.wavelengths().unwrap()[min_idx];
        assert!((minimum_wavelength - 305.0).abs() < 0.2);
    }

    #[test]
    fn single_sample_line_shape_is_a_delta_at_the_center() {
        let line_shape = InstrumentLineShape::gaussian(0.5, 0);
        assert_eq!(line_shape.wavelength_offsets, vec![0.0]);
        assert_eq!(line_shape.amplitudes, vec![1.0]);

        // Convolving with a delta reproduces the atlas at each pixel.
        let generator = flat_atlas();
        let mapping = generate_linear_grid(295.0, 315.0, 16);
        let spectrum = generator
            .fraunhofer_spectrum(&mapping, &line_shape)
            .expect("generation should succeed");
        for &value in spectrum.data() {
            assert!(value.is_finite());
            assert!((value - 1.0).abs() < 1.0e-12);
        }
    }

    #[test]
    fn degenerate_line_shape_is_rejected() {
        let generator = flat_atlas();
        let mapping = generate_linear_grid(295.0, 315.0, 16);
        let line_shape = InstrumentLineShape {
            wavelength_offsets: vec![-0.1, 0.1],
            amplitudes: vec![1.0, -1.0],
        };
        assert!(matches!(
            generator.fraunhofer_spectrum(&mapping, &line_shape),
            Err(FraunhoferError::DegenerateLineShape)
        ));
    }
}
