use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use wavecal_core::calibration::{
    list_possible_correspondences, CorrespondenceSelectionSettings,
    RansacWavelengthCalibrationSettings, RansacWavelengthCalibrationSetup,
};
use wavecal_core::spectra::{find_peaks, find_valleys, Spectrum, SpectrumDataPoint};

#[derive(clap::Args)]
pub struct CalibrateArgs {
    /// Calibration input document (JSON)
    #[arg(long)]
    pub input: PathBuf,

    /// Result output path; stdout when omitted
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Seed for the random sampling loop
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Override the iteration budget from the input document
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Override the polynomial order from the input document
    #[arg(long)]
    pub order: Option<usize>,
}

/// The JSON calibration input. Spectra are plain intensity arrays with an
/// optional per-pixel wavelength axis; this is deliberately not any
/// instrument's file format.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CalibrationDocument {
    measured_spectrum: SpectrumDocument,
    theoretical_spectrum: SpectrumDocument,
    #[serde(default)]
    measured_keypoints: Option<Vec<SpectrumDataPoint>>,
    #[serde(default)]
    theoretical_keypoints: Option<Vec<SpectrumDataPoint>>,
    #[serde(default)]
    keypoint_minimum_intensity: f64,
    #[serde(default)]
    selection_settings: CorrespondenceSelectionSettings,
    #[serde(default)]
    ransac_settings: RansacWavelengthCalibrationSettings,
}

#[derive(Debug, Deserialize)]
struct SpectrumDocument {
    data: Vec<f64>,
    #[serde(default)]
    wavelengths: Option<Vec<f64>>,
}

impl SpectrumDocument {
    fn into_spectrum(self) -> anyhow::Result<Spectrum> {
        match self.wavelengths {
            Some(axis) => Spectrum::with_wavelengths(self.data, axis)
                .context("spectrum wavelength axis does not match the sample count"),
            None => Ok(Spectrum::new(self.data)),
        }
    }
}

pub fn run_calibrate(args: &CalibrateArgs) -> anyhow::Result<i32> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read input '{}'", args.input.display()))?;
    let document: CalibrationDocument = serde_json::from_str(&source)
        .with_context(|| format!("failed to parse input '{}'", args.input.display()))?;

    let mut ransac_settings = document.ransac_settings;
    if let Some(iterations) = args.iterations {
        ransac_settings.number_of_ransac_iterations = iterations;
    }
    if let Some(order) = args.order {
        ransac_settings.model_polynomial_order = order;
        ransac_settings.sample_size = ransac_settings.sample_size.max(order + 1);
    }

    let minimum_intensity = document.keypoint_minimum_intensity;
    let measured_spectrum = document.measured_spectrum.into_spectrum()?;
    let theoretical_spectrum = document.theoretical_spectrum.into_spectrum()?;

    let measured_keypoints = document
        .measured_keypoints
        .unwrap_or_else(|| detect_keypoints(&measured_spectrum, minimum_intensity));
    let theoretical_keypoints = document
        .theoretical_keypoints
        .unwrap_or_else(|| detect_keypoints(&theoretical_spectrum, minimum_intensity));
    info!(
        measured = measured_keypoints.len(),
        theoretical = theoretical_keypoints.len(),
        "keypoints ready"
    );

    let correspondences = list_possible_correspondences(
        &measured_keypoints,
        &measured_spectrum,
        &theoretical_keypoints,
        &theoretical_spectrum,
        &ransac_settings,
        &document.selection_settings,
    )
    .context("invalid calibration settings")?;
    info!(candidates = correspondences.len(), "correspondences selected");

    let setup = RansacWavelengthCalibrationSetup::new(ransac_settings)
        .context("invalid ransac settings")?;
    let result = setup.do_wavelength_calibration_seeded(&correspondences, args.seed);
    info!(
        inliers = result.highest_number_of_inliers,
        total = result.number_of_possible_correlations,
        "calibration finished"
    );

    let rendered =
        serde_json::to_string_pretty(&result).context("failed to serialize the result")?;
    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create '{}'", parent.display()))?;
            }
            fs::write(path, rendered)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
        }
        None => println!("{rendered}"),
    }

    // A calibration that found no consensus is an expected outcome and is
    // reported in the result document, not through the exit code.
    Ok(0)
}

fn detect_keypoints(spectrum: &Spectrum, minimum_intensity: f64) -> Vec<SpectrumDataPoint> {
    let mut keypoints = find_valleys(spectrum, minimum_intensity);
    keypoints.extend(find_peaks(spectrum, minimum_intensity));
    keypoints.sort_by(|a, b| a.pixel.total_cmp(&b.pixel));
    keypoints
}
