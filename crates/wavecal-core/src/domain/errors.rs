/// Errors raised when a settings value or an input container is shaped in a
/// way the calibration routines cannot accept. These indicate programmer
/// errors and are reported at construction or call entry, never from inside
/// the sampling loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("measured pixel range is empty: start {start} must be smaller than stop {stop}")]
    EmptyMeasuredPixelRange { start: usize, stop: usize },
    #[error(
        "sample size {sample_size} cannot determine a polynomial of order {order}, need at least {required} correspondences per sample"
    )]
    SampleSizeTooSmall {
        sample_size: usize,
        order: usize,
        required: usize,
    },
    #[error("model polynomial order must be at least 1")]
    ZeroPolynomialOrder,
    #[error("number of ransac iterations must be at least 1")]
    ZeroIterations,
    #[error("inlier limit must be finite and > 0, got {value}")]
    InvalidInlierLimit { value: f64 },
    #[error("fraction of correspondences to select must be in (0, 1], got {value}")]
    InvalidSelectionFraction { value: f64 },
    #[error("correspondence error window must be at least 1 pixel wide")]
    EmptyErrorMeasurementRegion,
    #[error("wavelength axis has {wavelengths} entries but the spectrum has {samples} samples")]
    WavelengthAxisMismatch { wavelengths: usize, samples: usize },
}

pub type WavecalResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::ConfigurationError;

    #[test]
    fn configuration_errors_render_actionable_messages() {
        let error = ConfigurationError::EmptyMeasuredPixelRange {
            start: 2100,
            stop: 650,
        };
        assert!(error.to_string().contains("2100"));
        assert!(error.to_string().contains("650"));

        let error = ConfigurationError::SampleSizeTooSmall {
            sample_size: 3,
            order: 3,
            required: 4,
        };
        assert!(error.to_string().contains("order 3"));
    }
}
