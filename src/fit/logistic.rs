// fit/logistic.rs
// Logistic curve and Verhulst growth fits (nonlinear least squares)

use serde::Serialize;

use super::lm::levenberg_marquardt;
use super::{check_lengths, r_squared, FitError, Model};
use crate::stats;

/// `y = a / (1 + b * c^x)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogisticFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub r2: f64,
}

fn logistic(a: f64, b: f64, c: f64, x: f64) -> f64 {
    a / (1.0 + b * c.powf(x))
}

impl Model for LogisticFit {
    fn predict(&self, x: f64) -> f64 {
        logistic(self.a, self.b, self.c, x)
    }

    fn r2(&self) -> f64 {
        self.r2
    }

    fn describe(&self) -> String {
        format!(
            "y = {:.0} / (1 + {:.2} * {:.2}^x), R^2 = {:.3}",
            self.a, self.b, self.c, self.r2
        )
    }
}

/// Initial guess is `[max(y), median(y), 1]`.
pub fn logistic_fit(xs: &[f64], ys: &[f64]) -> Result<LogisticFit, FitError> {
    check_lengths(xs, ys, 3)?;
    let top = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let middle = stats::median(ys).unwrap_or(1.0);
    let model = |p: &[f64]| xs.iter().map(|&x| logistic(p[0], p[1], p[2], x)).collect::<Vec<_>>();
    let p = levenberg_marquardt(model, ys, &[top, middle, 1.0])?;
    let predicted: Vec<f64> = xs.iter().map(|&x| logistic(p[0], p[1], p[2], x)).collect();
    Ok(LogisticFit {
        a: p[0],
        b: p[1],
        c: p[2],
        r2: r_squared(ys, &predicted),
    })
}

/// Solution of `dy/dx = a * y * (1 - y / k)` with `y(0) = 1`, sampled on the
/// observed grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerhulstFit {
    pub a: f64,
    pub k: f64,
    pub r2: f64,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Model for VerhulstFit {
    fn predict(&self, x: f64) -> f64 {
        integrate_verhulst(self.a, self.k, &[x], step_for_rate(self.a, x))
            .first()
            .copied()
            .unwrap_or(f64::NAN)
    }

    fn r2(&self) -> f64 {
        self.r2
    }

    fn describe(&self) -> String {
        format!("a = {:.1e}, k = {:.2}, R^2 = {:.3}", self.a, self.k, self.r2)
    }
}

const VERHULST_START: f64 = 1.0;
const MAX_GROWTH_PER_STEP: f64 = 0.1;
const MAX_SUBSTEPS: usize = 10_000;

fn verhulst_rate(a: f64, k: f64, y: f64) -> f64 {
    a * y * (1.0 - y / k)
}

/// Step size keeping `|a| * h` below 0.1, bounded so that `span` needs at
/// most `MAX_SUBSTEPS` steps.
fn step_for_rate(a: f64, span: f64) -> f64 {
    let step = MAX_GROWTH_PER_STEP / a.abs().max(f64::MIN_POSITIVE);
    step.max(span / MAX_SUBSTEPS as f64)
}

/// RK4 integration from `x = 0`, `y = 1`, reporting `y` at each grid point.
/// The step size is fixed by the caller so the result is smooth in `a` and `k`.
fn integrate_verhulst(a: f64, k: f64, grid: &[f64], max_step: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(grid.len());
    let mut x = 0.0;
    let mut y = VERHULST_START;
    for &target in grid {
        let span = target - x;
        if span > 0.0 {
            let substeps = ((span / max_step).ceil() as usize).clamp(1, MAX_SUBSTEPS);
            let h = span / substeps as f64;
            for _ in 0..substeps {
                let k1 = verhulst_rate(a, k, y);
                let k2 = verhulst_rate(a, k, y + 0.5 * h * k1);
                let k3 = verhulst_rate(a, k, y + 0.5 * h * k2);
                let k4 = verhulst_rate(a, k, y + h * k3);
                y += h / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4);
            }
            x = target;
        }
        out.push(y);
    }
    out
}

fn initial_rate(xs: &[f64], ys: &[f64], k: f64) -> f64 {
    let half = k / 2.0;
    let anchor = xs
        .iter()
        .zip(ys)
        .filter(|&(&x, &y)| x > 0.0 && y > VERHULST_START && y < k)
        .min_by(|a, b| (a.1 - half).abs().total_cmp(&(b.1 - half).abs()));
    let fallback = 1.0 / xs.last().copied().unwrap_or(1.0).max(1.0);
    match anchor {
        // invert the closed form y = k / (1 + (k - 1) e^{-a x})
        Some((&x, &y)) if k > VERHULST_START => {
            let rate = -((k / y - 1.0) / (k - 1.0)).ln() / x;
            if rate.is_finite() && rate > 0.0 {
                rate
            } else {
                fallback
            }
        }
        _ => fallback,
    }
}

/// Fit the Verhulst growth model to a population series.
///
/// `xs` must be non-negative and non-decreasing. The carrying capacity
/// starts slightly above the largest observation and the rate from the
/// observation closest to half of it.
pub fn verhulst_fit(xs: &[f64], ys: &[f64]) -> Result<VerhulstFit, FitError> {
    check_lengths(xs, ys, 2)?;
    if xs.iter().any(|&x| x < 0.0 || !x.is_finite()) || xs.windows(2).any(|w| w[0] > w[1]) {
        return Err(FitError::InvalidGrid);
    }
    let top = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bottom = ys.iter().copied().fold(f64::INFINITY, f64::min);
    if !(top > 0.0) || top == bottom {
        return Err(FitError::Degenerate);
    }
    let k0 = (top * 1.05).max(VERHULST_START * 1.05);
    let a0 = initial_rate(xs, ys, k0);
    let span = xs.last().copied().unwrap_or(0.0);
    let step = step_for_rate(a0, span);
    let model = |p: &[f64]| integrate_verhulst(p[0], p[1], xs, step);
    let p = levenberg_marquardt(model, ys, &[a0, k0])?;
    let y = integrate_verhulst(p[0], p[1], xs, step_for_rate(p[0], span));
    Ok(VerhulstFit {
        a: p[0],
        k: p[1],
        r2: r_squared(ys, &y),
        x: xs.to_vec(),
        y,
    })
}
