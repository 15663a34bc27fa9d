// experiments/param_sweep.rs
// Experiment 6: mean DHI per (alpha, beta) parameter pair

use super::{Experiment, Input};
use crate::error::{AnalysisError, Result};
use crate::groups::OrderedGroups;
use crate::io::Line;
use crate::output::{Table, Value};
use crate::parse::{parse_float, parse_int, split_exact, split_once};
use crate::stats;

#[derive(Debug, Default)]
pub struct ParamSweep {
    samples: OrderedGroups<(i64, i64), Vec<f64>>,
    means: Vec<(i64, i64, f64)>,
}

impl ParamSweep {
    pub fn new() -> Self {
        Self::default()
    }
}

/// `alpha=<int>,beta=<int>: <dhi>`
fn parse_line(line: &Line) -> Result<((i64, i64), f64)> {
    let (key, dhi) = split_once(line, &line.text, ": ")?;
    let parts = split_exact(line, key, ",", 2)?;
    let mut values = [0i64; 2];
    for (slot, (part, name)) in values.iter_mut().zip(parts.iter().zip(["alpha", "beta"])) {
        let (_, value) = split_once(line, part, "=")?;
        *slot = parse_int(line, name, value)?;
    }
    Ok(((values[0], values[1]), parse_float(line, "dhi", dhi)?))
}

impl Experiment for ParamSweep {
    fn name(&self) -> &'static str {
        "param-sweep"
    }

    fn collect(&mut self, input: Input) -> Result<()> {
        for line in input.into_lines() {
            let (key, dhi) = parse_line(&line)?;
            self.samples.push(key, dhi);
        }
        if self.samples.is_empty() {
            return Err(AnalysisError::NoData("param-sweep: no samples"));
        }
        Ok(())
    }

    fn refine(&mut self) -> Result<()> {
        self.means = self
            .samples
            .iter()
            .filter_map(|(&(alpha, beta), dhis)| stats::mean(dhis).map(|m| (alpha, beta, m)))
            .collect();
        Ok(())
    }

    fn table(&self) -> Table {
        let mut table = Table::new(&["alpha", "beta", "mean_dhi"]);
        for &(alpha, beta, mean) in &self.means {
            table.push(vec![Value::Int(alpha), Value::Int(beta), Value::Float(mean)]);
        }
        table
    }

    fn notes(&self) -> Vec<String> {
        self.means
            .iter()
            .max_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(alpha, beta, mean)| vec![format!("highest mean DHI {mean:.4} at alpha={alpha}, beta={beta}")])
            .unwrap_or_default()
    }
}
