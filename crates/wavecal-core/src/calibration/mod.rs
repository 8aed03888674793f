pub mod correspondence;
pub mod fraunhofer;
pub mod ransac;

pub use correspondence::{
    list_possible_correspondences, measure_correspondence_error, Correspondence,
    CorrespondenceSelectionSettings,
};
pub use fraunhofer::{
    FraunhoferError, FraunhoferSpectrumGenerator, InstrumentLineShape,
    SolarAtlasFraunhoferGenerator, WavelengthRange,
};
pub use ransac::{
    RansacWavelengthCalibrationResult, RansacWavelengthCalibrationSettings,
    RansacWavelengthCalibrationSetup,
};
