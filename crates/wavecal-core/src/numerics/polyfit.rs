//! Least-squares polynomial fitting.
//!
//! The fit assembles the normal equations of the Vandermonde system into a
//! dense matrix and solves them with partially pivoted Gaussian elimination.
//! Singular systems (for example, duplicate x values in a minimal RANSAC
//! sample) are reported as an error so the caller can skip that sample.

use faer::Mat;

const SINGULAR_PIVOT_EPSILON: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolyfitError {
    #[error("polynomial fit requires matching sample counts, got x={x_len} and y={y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[error("fitting a polynomial of order {order} requires at least {required} samples, got {actual}")]
    InsufficientSamples {
        order: usize,
        required: usize,
        actual: usize,
    },
    #[error("normal equations are singular at pivot index {pivot_index}")]
    SingularSystem { pivot_index: usize },
}

/// Evaluates a polynomial with ascending-order coefficients at `x`.
pub fn polynomial_value_at(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |accumulated, &c| accumulated * x + c)
}

/// Fits a polynomial of the given order to the (x, y) samples.
///
/// Returns the coefficients in ascending order, `order + 1` of them, in the
/// original x basis. The fit itself runs in a centered and scaled variable
/// `t = (x - center) / scale`: pixel values in the thousands raised to the
/// sixth power would otherwise wreck the conditioning of the normal
/// equations.
pub fn fit_polynomial(xs: &[f64], ys: &[f64], order: usize) -> Result<Vec<f64>, PolyfitError> {
    if xs.len() != ys.len() {
        return Err(PolyfitError::LengthMismatch {
            x_len: xs.len(),
            y_len: ys.len(),
        });
    }
    let unknowns = order + 1;
    if xs.len() < unknowns {
        return Err(PolyfitError::InsufficientSamples {
            order,
            required: unknowns,
            actual: xs.len(),
        });
    }

    let center = xs.iter().sum::<f64>() / xs.len() as f64;
    let scale = xs
        .iter()
        .map(|&x| (x - center).abs())
        .fold(0.0_f64, f64::max);
    if scale <= SINGULAR_PIVOT_EPSILON {
        // All x values coincide; the system has no unique solution.
        return Err(PolyfitError::SingularSystem { pivot_index: 0 });
    }

    // Normal equations in t: (V^T V) c = V^T y with V the Vandermonde matrix.
    let mut system = Mat::<f64>::zeros(unknowns, unknowns);
    let mut rhs = vec![0.0; unknowns];
    let mut powers = vec![0.0; unknowns];
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let t = (x - center) / scale;
        let mut power = 1.0;
        for entry in powers.iter_mut() {
            *entry = power;
            power *= t;
        }
        for row in 0..unknowns {
            for col in 0..unknowns {
                system[(row, col)] += powers[row] * powers[col];
            }
            rhs[row] += powers[row] * y;
        }
    }

    solve_in_place(&mut system, &mut rhs)?;
    Ok(expand_scaled_basis(&rhs, center, scale))
}

/// Rewrites coefficients of p(t), t = (x - center) / scale, as coefficients
/// in x, by Horner composition with the linear map.
fn expand_scaled_basis(scaled: &[f64], center: f64, scale: f64) -> Vec<f64> {
    let a = 1.0 / scale;
    let b = -center / scale;

    let mut expanded = vec![*scaled.last().unwrap_or(&0.0)];
    for &coefficient in scaled.iter().rev().skip(1) {
        let mut next = vec![0.0; expanded.len() + 1];
        for (power, &value) in expanded.iter().enumerate() {
            next[power] += value * b;
            next[power + 1] += value * a;
        }
        next[0] += coefficient;
        expanded = next;
    }
    expanded
}

fn solve_in_place(system: &mut Mat<f64>, rhs: &mut [f64]) -> Result<(), PolyfitError> {
    let dimension = rhs.len();
    let scale = matrix_infinity_norm(system).max(1.0);

    for pivot_col in 0..dimension {
        let mut pivot_row = pivot_col;
        let mut pivot_magnitude = system[(pivot_col, pivot_col)].abs();
        for row in (pivot_col + 1)..dimension {
            let magnitude = system[(row, pivot_col)].abs();
            if magnitude > pivot_magnitude {
                pivot_magnitude = magnitude;
                pivot_row = row;
            }
        }
        if pivot_magnitude <= SINGULAR_PIVOT_EPSILON * scale {
            return Err(PolyfitError::SingularSystem {
                pivot_index: pivot_col,
            });
        }
        if pivot_row != pivot_col {
            for col in 0..dimension {
                let held = system[(pivot_col, col)];
                system[(pivot_col, col)] = system[(pivot_row, col)];
                system[(pivot_row, col)] = held;
            }
            rhs.swap(pivot_col, pivot_row);
        }

        let pivot = system[(pivot_col, pivot_col)];
        for row in (pivot_col + 1)..dimension {
            let multiplier = system[(row, pivot_col)] / pivot;
            if multiplier == 0.0 {
                continue;
            }
            for col in pivot_col..dimension {
                let updated = system[(row, col)] - multiplier * system[(pivot_col, col)];
                system[(row, col)] = updated;
            }
            rhs[row] -= multiplier * rhs[pivot_col];
        }
    }

    for row in (0..dimension).rev() {
        let mut value = rhs[row];
        for col in (row + 1)..dimension {
            value -= system[(row, col)] * rhs[col];
        }
        rhs[row] = value / system[(row, row)];
    }
    Ok(())
}

fn matrix_infinity_norm(matrix: &Mat<f64>) -> f64 {
    let mut norm = 0.0_f64;
    for row in 0..matrix.nrows() {
        let mut row_sum = 0.0;
        for col in 0..matrix.ncols() {
            row_sum += matrix[(row, col)].abs();
        }
        norm = norm.max(row_sum);
    }
    norm
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn polynomial_evaluation_uses_ascending_coefficients() {
        // 2 + 3x + x^2
        let coefficients = [2.0, 3.0, 1.0];
        assert_eq!(polynomial_value_at(&coefficients, 0.0), 2.0);
        assert_eq!(polynomial_value_at(&coefficients, 2.0), 12.0);
        assert_eq!(polynomial_value_at(&[], 5.0), 0.0);
    }

    #[test]
    fn exact_cubic_is_recovered() {
        let coefficients = [1.5, -0.25, 0.01, 2.0e-4];
        let xs: Vec<f64> = (0..12).map(|ii| ii as f64 * 3.0).collect();
        let ys: Vec<f64> = xs
            .iter()
            .map(|&x| polynomial_value_at(&coefficients, x))
            .collect();

        let fitted = fit_polynomial(&xs, &ys, 3).expect("fit should succeed");
        assert_eq!(fitted.len(), 4);
        for (fit, exact) in fitted.iter().zip(coefficients.iter()) {
            assert_close(*fit, *exact, 1.0e-8);
        }
    }

    #[test]
    fn duplicate_x_values_report_singular_system() {
        let xs = [1.0, 1.0, 1.0, 1.0];
        let ys = [2.0, 3.0, 4.0, 5.0];
        assert!(matches!(
            fit_polynomial(&xs, &ys, 3),
            Err(PolyfitError::SingularSystem { .. })
        ));
    }

    #[test]
    fn too_few_samples_are_rejected_up_front() {
        assert!(matches!(
            fit_polynomial(&[1.0, 2.0], &[1.0, 2.0], 3),
            Err(PolyfitError::InsufficientSamples {
                order: 3,
                required: 4,
                actual: 2
            })
        ));
        assert!(matches!(
            fit_polynomial(&[1.0], &[1.0, 2.0], 1),
            Err(PolyfitError::LengthMismatch { x_len: 1, y_len: 2 })
        ));
    }

    #[test]
    fn overdetermined_linear_fit_averages_noise() {
        let xs: Vec<f64> = (0..50).map(|ii| ii as f64).collect();
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(ii, &x)| 4.0 + 0.5 * x + if ii % 2 == 0 { 0.01 } else { -0.01 })
            .collect();
        let fitted = fit_polynomial(&xs, &ys, 1).expect("fit should succeed");
        assert_close(fitted[0], 4.0, 0.01);
        assert_close(fitted[1], 0.5, 0.001);
    }
}
