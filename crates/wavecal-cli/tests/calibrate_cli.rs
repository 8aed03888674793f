use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const DETECTOR_PIXELS: usize = 512;
const LINE_PIXELS: [f64; 6] = [62.0, 148.0, 231.0, 329.0, 402.0, 465.0];

fn synthetic_data() -> Vec<f64> {
    (0..DETECTOR_PIXELS)
        .map(|p| {
            let mut value = 1.0;
            for (k, &center) in LINE_PIXELS.iter().enumerate() {
                let sigma = 2.5 + 0.7 * (k % 3) as f64;
                let d = p as f64 - center;
                value -= 0.8 * (-d * d / (2.0 * sigma * sigma)).exp();
            }
            value
        })
        .collect()
}

fn mapping(pixel: f64) -> f64 {
    300.0 + 0.05 * pixel
}

fn write_input(path: &Path) {
    let data = synthetic_data();
    let axis: Vec<f64> = (0..DETECTOR_PIXELS).map(|p| mapping(p as f64)).collect();
    let document = json!({
        "measured_spectrum": { "data": data },
        "theoretical_spectrum": { "data": data, "wavelengths": axis },
        "keypoint_minimum_intensity": -10.0,
        "selection_settings": {
            "pixel_region_for_error_measurement": 6,
            "fraction_of_correspondences_to_select": 0.4,
            "measured_pixel_start": 20,
            "measured_pixel_stop": 500,
            "enforce_unique_measured_keypoint": false
        },
        "ransac_settings": {
            "number_of_ransac_iterations": 20000
        }
    });
    fs::write(path, serde_json::to_string_pretty(&document).unwrap())
        .expect("input document should be written");
}

#[test]
fn calibrate_command_recovers_the_reference_mapping() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input_path = temp.path().join("calibration-input.json");
    let output_path = temp.path().join("out/result.json");
    write_input(&input_path);

    let status = Command::new(env!("CARGO_BIN_EXE_wavecal-rs"))
        .arg("calibrate")
        .arg("--input")
        .arg(&input_path)
        .arg("--output")
        .arg(&output_path)
        .arg("--seed")
        .arg("11")
        .status()
        .expect("binary should run");
    assert!(status.success());

    let rendered = fs::read_to_string(&output_path).expect("result should exist");
    let result: Value = serde_json::from_str(&rendered).expect("result should be JSON");

    let inliers = result["highest_number_of_inliers"].as_u64().unwrap();
    assert!(
        inliers >= LINE_PIXELS.len() as u64,
        "every synthetic line should support the model, got {inliers}"
    );

    let coefficients: Vec<f64> = result["best_fitting_model_coefficients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(coefficients.len(), 4);

    // The spectra share the detector grid, so the recovered mapping must
    // reproduce the reference axis.
    for &pixel in &[60.0, 230.0, 460.0] {
        let predicted: f64 = coefficients
            .iter()
            .rev()
            .fold(0.0, |accumulated, &c| accumulated * pixel + c);
        assert!(
            (predicted - mapping(pixel)).abs() < 0.1,
            "mapping off at pixel {pixel}: {predicted}"
        );
    }

    let mask = result["correspondence_is_inlier"].as_array().unwrap();
    let total = result["number_of_possible_correlations"].as_u64().unwrap();
    assert_eq!(mask.len() as u64, total);
}

#[test]
fn invalid_settings_fail_with_a_diagnostic() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input_path = temp.path().join("broken.json");
    let document = json!({
        "measured_spectrum": { "data": [1.0, 2.0, 3.0] },
        "theoretical_spectrum": { "data": [1.0, 2.0, 3.0] },
        "selection_settings": {
            "measured_pixel_start": 400,
            "measured_pixel_stop": 100
        }
    });
    fs::write(&input_path, document.to_string()).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_wavecal-rs"))
        .arg("calibrate")
        .arg("--input")
        .arg(&input_path)
        .output()
        .expect("binary should run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("measured pixel range"),
        "diagnostic should name the invalid range, got: {stderr}"
    );
}

#[test]
fn no_consensus_is_reported_in_the_document_not_the_exit_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input_path = temp.path().join("sparse.json");
    let output_path = temp.path().join("sparse-result.json");

    // Flat spectra produce no keypoints at all.
    let document = json!({
        "measured_spectrum": { "data": vec![1.0; 64] },
        "theoretical_spectrum": { "data": vec![1.0; 64] },
        "selection_settings": {
            "measured_pixel_start": 0,
            "measured_pixel_stop": 64,
            "pixel_region_for_error_measurement": 4
        },
        "ransac_settings": { "number_of_ransac_iterations": 100 }
    });
    fs::write(&input_path, document.to_string()).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_wavecal-rs"))
        .arg("calibrate")
        .arg("--input")
        .arg(&input_path)
        .arg("--output")
        .arg(&output_path)
        .status()
        .expect("binary should run");
    assert!(status.success());

    let result: Value =
        serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(result["highest_number_of_inliers"], 0);
    assert_eq!(result["number_of_possible_correlations"], 0);
}
