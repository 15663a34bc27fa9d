// fit/lm.rs
// Levenberg-Marquardt least squares with a forward-difference Jacobian

use super::FitError;

const MAX_ITERATIONS: usize = 500;
const TOLERANCE: f64 = 1e-12;
const LAMBDA_START: f64 = 1e-3;
const LAMBDA_LIMIT: f64 = 1e14;

fn cost(observed: &[f64], predicted: &[f64]) -> f64 {
    observed
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum()
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Minimise `sum((observed - model(params))^2)` starting from `initial`.
///
/// `model` maps a parameter vector to one prediction per observation.
/// Returns the best parameters found once the step or the cost change
/// falls below tolerance, or when damping can no longer make progress.
pub(crate) fn levenberg_marquardt<F>(model: F, observed: &[f64], initial: &[f64]) -> Result<Vec<f64>, FitError>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let m = initial.len();
    let mut params = initial.to_vec();
    let mut predicted = model(&params);
    if predicted.len() != observed.len() || !all_finite(&predicted) {
        return Err(FitError::NonFinite);
    }
    let mut current = cost(observed, &predicted);
    let mut lambda = LAMBDA_START;

    for _ in 0..MAX_ITERATIONS {
        if current == 0.0 {
            break;
        }

        // jacobian[i][j] = d prediction_i / d param_j
        let mut jacobian = vec![vec![0.0; m]; observed.len()];
        for j in 0..m {
            let h = f64::EPSILON.sqrt() * params[j].abs().max(1e-3);
            let mut shifted = params.clone();
            shifted[j] += h;
            let shifted_prediction = model(&shifted);
            for (i, row) in jacobian.iter_mut().enumerate() {
                row[j] = (shifted_prediction[i] - predicted[i]) / h;
            }
        }
        if jacobian.iter().any(|row| !all_finite(row)) {
            break;
        }

        let mut normal = vec![vec![0.0; m]; m];
        let mut gradient = vec![0.0; m];
        for (i, row) in jacobian.iter().enumerate() {
            let residual = observed[i] - predicted[i];
            for a in 0..m {
                gradient[a] += row[a] * residual;
                for b in 0..m {
                    normal[a][b] += row[a] * row[b];
                }
            }
        }

        let mut improved = false;
        while lambda < LAMBDA_LIMIT {
            let mut damped = normal.clone();
            for (k, row) in damped.iter_mut().enumerate() {
                row[k] += lambda * normal[k][k].max(1e-12);
            }
            let Some(step) = solve(damped, gradient.clone()) else {
                lambda *= 10.0;
                continue;
            };
            let candidate: Vec<f64> = params.iter().zip(&step).map(|(p, s)| p + s).collect();
            let candidate_prediction = model(&candidate);
            if !all_finite(&candidate_prediction) {
                lambda *= 10.0;
                continue;
            }
            let candidate_cost = cost(observed, &candidate_prediction);
            if candidate_cost < current {
                let small_step = step
                    .iter()
                    .zip(&candidate)
                    .all(|(s, p)| s.abs() <= TOLERANCE.sqrt() * (p.abs() + TOLERANCE.sqrt()));
                let small_gain = current - candidate_cost <= TOLERANCE * current;
                params = candidate;
                predicted = candidate_prediction;
                current = candidate_cost;
                lambda = (lambda / 10.0).max(1e-12);
                improved = true;
                if small_step || small_gain {
                    return Ok(params);
                }
                break;
            }
            lambda *= 10.0;
        }
        if !improved {
            break;
        }
    }
    Ok(params)
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&r, &s| a[r][col].abs().total_cmp(&a[s][col].abs()))?;
        if a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    if all_finite(&x) {
        Some(x)
    } else {
        None
    }
}
