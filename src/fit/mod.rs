// fit/mod.rs
// Curve fits for the aggregated series: linear, log-linearised and logistic models

use serde::Serialize;
use thiserror::Error;

mod lm;
pub mod logistic;

pub use logistic::{logistic_fit, verhulst_fit, LogisticFit, VerhulstFit};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("x and y series differ in length ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },

    #[error("need at least {needed} points, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("{series} value {value} cannot be log-transformed")]
    NonPositive { series: &'static str, value: f64 },

    #[error("x values must be non-decreasing and non-negative")]
    InvalidGrid,

    #[error("series is constant or never positive")]
    Degenerate,

    #[error("normal equations are singular")]
    Singular,

    #[error("model produced non-finite values at the initial guess")]
    NonFinite,
}

/// A fitted model that can be evaluated and summarised.
pub trait Model {
    fn predict(&self, x: f64) -> f64;

    fn r2(&self) -> f64;

    fn describe(&self) -> String;
}

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// A constant series has `SS_tot = 0`; it scores 1 when the prediction is
/// exact and 0 otherwise.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let mean = observed[..n].iter().sum::<f64>() / n as f64;
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    let ss_tot: f64 = observed[..n].iter().map(|y| (y - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

fn check_lengths(xs: &[f64], ys: &[f64], needed: usize) -> Result<(), FitError> {
    if xs.len() != ys.len() {
        return Err(FitError::LengthMismatch {
            x: xs.len(),
            y: ys.len(),
        });
    }
    if xs.len() < needed {
        return Err(FitError::InsufficientData {
            needed,
            got: xs.len(),
        });
    }
    Ok(())
}

fn log_series(series: &'static str, values: &[f64]) -> Result<Vec<f64>, FitError> {
    values
        .iter()
        .map(|&value| {
            if value > 0.0 && value.is_finite() {
                Ok(value.ln())
            } else {
                Err(FitError::NonPositive { series, value })
            }
        })
        .collect()
}

/// `y = a * x + b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub a: f64,
    pub b: f64,
    pub r2: f64,
}

impl Model for LinearFit {
    fn predict(&self, x: f64) -> f64 {
        self.a * x + self.b
    }

    fn r2(&self) -> f64 {
        self.r2
    }

    fn describe(&self) -> String {
        format!("y = {:.4} * x + {:.4}, R^2 = {:.3}", self.a, self.b, self.r2)
    }
}

pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Result<LinearFit, FitError> {
    check_lengths(xs, ys, 2)?;
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxx += (x - mean_x).powi(2);
        sxy += (x - mean_x) * (y - mean_y);
    }
    if sxx == 0.0 {
        return Err(FitError::Singular);
    }
    let a = sxy / sxx;
    let b = mean_y - a * mean_x;
    let predicted: Vec<f64> = xs.iter().map(|x| a * x + b).collect();
    Ok(LinearFit {
        a,
        b,
        r2: r_squared(ys, &predicted),
    })
}

/// `y = a * b^x`, fitted on `ln y`. R² is measured in log space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExponentialFit {
    pub a: f64,
    pub b: f64,
    pub r2: f64,
}

impl Model for ExponentialFit {
    fn predict(&self, x: f64) -> f64 {
        self.a * self.b.powf(x)
    }

    fn r2(&self) -> f64 {
        self.r2
    }

    fn describe(&self) -> String {
        format!("y = {:.4} * {:.4}^x, R^2 = {:.3}", self.a, self.b, self.r2)
    }
}

pub fn exponential_fit(xs: &[f64], ys: &[f64]) -> Result<ExponentialFit, FitError> {
    check_lengths(xs, ys, 2)?;
    let log_ys = log_series("y", ys)?;
    let line = linear_fit(xs, &log_ys)?;
    Ok(ExponentialFit {
        a: line.b.exp(),
        b: line.a.exp(),
        r2: line.r2,
    })
}

/// `y = a * x^b`, fitted on `ln y` against `ln x`. R² is measured in log space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerFit {
    pub a: f64,
    pub b: f64,
    pub r2: f64,
}

impl Model for PowerFit {
    fn predict(&self, x: f64) -> f64 {
        self.a * x.powf(self.b)
    }

    fn r2(&self) -> f64 {
        self.r2
    }

    fn describe(&self) -> String {
        format!("y = {:.3e} * x^{:.3}, R^2 = {:.3}", self.a, self.b, self.r2)
    }
}

pub fn power_fit(xs: &[f64], ys: &[f64]) -> Result<PowerFit, FitError> {
    check_lengths(xs, ys, 2)?;
    let log_xs = log_series("x", xs)?;
    let log_ys = log_series("y", ys)?;
    let line = linear_fit(&log_xs, &log_ys)?;
    Ok(PowerFit {
        a: line.b.exp(),
        b: line.a,
        r2: line.r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * b.abs().max(1.0)
    }

    #[test]
    fn exponential_recovers_noiseless_parameters() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|&x| 2.0 * 3f64.powf(x)).collect();
        let fit = exponential_fit(&xs, &ys).unwrap();
        assert!(close(fit.a, 2.0, 1e-9), "a = {}", fit.a);
        assert!(close(fit.b, 3.0, 1e-9), "b = {}", fit.b);
        assert!(close(fit.r2, 1.0, 1e-9), "r2 = {}", fit.r2);
        assert!(close(fit.predict(4.0), 162.0, 1e-9));
    }

    #[test]
    fn linear_recovers_line() {
        let xs = [0.05, 0.06, 0.07, 0.08];
        let ys: Vec<f64> = xs.iter().map(|&x| 120.0 * x - 4.0).collect();
        let fit = linear_fit(&xs, &ys).unwrap();
        assert!(close(fit.a, 120.0, 1e-9));
        assert!(close(fit.b, -4.0, 1e-9));
        assert!(close(fit.r2, 1.0, 1e-9));
    }

    #[test]
    fn power_recovers_inverse_law() {
        let xs: [f64; 4] = [0.05, 0.06, 0.08, 0.1];
        let ys: Vec<f64> = xs.iter().map(|&x| 30.0 * x.powf(-2.5)).collect();
        let fit = power_fit(&xs, &ys).unwrap();
        assert!(close(fit.a, 30.0, 1e-9));
        assert!(close(fit.b, -2.5, 1e-9));
    }

    #[test]
    fn log_fits_reject_non_positive_values() {
        assert_eq!(
            exponential_fit(&[0.0, 1.0], &[1.0, 0.0]),
            Err(FitError::NonPositive { series: "y", value: 0.0 })
        );
        assert!(matches!(
            power_fit(&[0.0, 1.0], &[1.0, 2.0]),
            Err(FitError::NonPositive { series: "x", .. })
        ));
    }

    #[test]
    fn degenerate_input_is_reported() {
        assert_eq!(
            linear_fit(&[1.0], &[1.0]),
            Err(FitError::InsufficientData { needed: 2, got: 1 })
        );
        assert_eq!(
            linear_fit(&[1.0, 2.0], &[1.0]),
            Err(FitError::LengthMismatch { x: 2, y: 1 })
        );
        assert_eq!(linear_fit(&[3.0, 3.0], &[1.0, 2.0]), Err(FitError::Singular));
    }

    #[test]
    fn r_squared_of_constant_series() {
        assert_eq!(r_squared(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r_squared(&[2.0, 2.0], &[1.0, 2.0]), 0.0);
        let r2 = r_squared(&[1.0, 2.0, 3.0], &[1.0, 2.0, 4.0]);
        assert!(close(r2, 0.5, 1e-12));
    }
}
