//! Pixel-to-wavelength calibration for dispersive spectrometers.
//!
//! The calibration matches keypoints (peaks and valleys) of a measured
//! spectrum against keypoints of a high-resolution Fraunhofer reference,
//! then robustly fits a low-order pixel-to-wavelength polynomial with a
//! RANSAC consensus loop that tolerates false correspondences.
//!
//! The typical flow is:
//! 1. detect keypoints in both spectra ([`spectra::find_peaks`],
//!    [`spectra::find_valleys`]);
//! 2. build and score candidate pairings
//!    ([`calibration::list_possible_correspondences`]);
//! 3. run the consensus loop
//!    ([`calibration::RansacWavelengthCalibrationSetup`]).

pub mod calibration;
pub mod domain;
pub mod numerics;
pub mod spectra;

pub use calibration::{
    list_possible_correspondences, Correspondence, CorrespondenceSelectionSettings,
    RansacWavelengthCalibrationResult, RansacWavelengthCalibrationSettings,
    RansacWavelengthCalibrationSetup,
};
pub use domain::ConfigurationError;
pub use spectra::{Spectrum, SpectrumDataPoint, SpectrumPointType};
