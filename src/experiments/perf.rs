// experiments/perf.rs
// Experiment 7: simulator frame rates across modes, grid sizes and workloads

use super::{fit_note, Experiment, Input, InputKind};
use crate::error::{AnalysisError, Result};
use crate::fit::{logistic_fit, power_fit};
use crate::groups::{FloatKey, OrderedGroups};
use crate::io::Line;
use crate::output::{Table, Value};
use crate::parse::{parse_float, parse_int, split_once, Fields};
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PerfAction {
    /// Frame rate over time, graphical vs headless (headed)
    #[value(name = "base_time")]
    BaseTime,
    /// Frame rate over time with the GUI on/off (headed)
    #[value(name = "base_gui")]
    BaseGui,
    /// Frame rate over time with OpenCL on/off (headed)
    #[value(name = "cl")]
    Cl,
    /// Frame rate per grid size (headed)
    #[value(name = "grid")]
    Grid,
    /// Frame rate per world dimension
    #[value(name = "base_dim")]
    BaseDim,
    /// Frame rate per DPE
    #[value(name = "base_dpe")]
    BaseDpe,
    /// Frame rate per view scope
    #[value(name = "base_scope")]
    BaseScope,
}

impl PerfAction {
    fn is_headed(self) -> bool {
        matches!(self, PerfAction::BaseTime | PerfAction::BaseGui | PerfAction::Cl | PerfAction::Grid)
    }

    /// Every key is an integer except the DPE.
    fn integral_keys(self) -> bool {
        self != PerfAction::BaseDpe
    }
}

pub struct Perf {
    action: PerfAction,
    samples: OrderedGroups<String, OrderedGroups<FloatKey, Vec<f64>>>,
    medians: Vec<(String, Vec<(f64, f64)>)>,
}

impl Perf {
    pub fn new(action: PerfAction) -> Self {
        Self {
            action,
            samples: OrderedGroups::new(),
            medians: Vec::new(),
        }
    }

    /// The series key and the frame rates of one line.
    fn parse_line(&self, line: &Line) -> Result<(f64, Vec<f64>)> {
        let (key, rest) = split_once(line, &line.text, ": ")?;
        let key = match self.action {
            PerfAction::BaseTime | PerfAction::BaseGui | PerfAction::Cl => {
                return Ok((parse_int(line, "time", key)? as f64, vec![parse_float(line, "fps", rest)?]));
            }
            PerfAction::Grid => {
                let inner = key.trim().strip_prefix('(').ok_or_else(|| line.error("grid key must start with '('"))?;
                let first = inner.split(',').next().unwrap_or_default();
                parse_int(line, "grid size", first)? as f64
            }
            PerfAction::BaseDim => {
                let first = key.split(',').next().unwrap_or_default();
                parse_int(line, "dimension", first)? as f64
            }
            PerfAction::BaseScope => parse_float(line, "scope", key)?.trunc(),
            PerfAction::BaseDpe => parse_float(line, "dpe", key)?,
        };
        let rates = Fields::new(line, "frame rates", rest).floats_from(0)?;
        Ok((key, rates))
    }

    fn x_value(&self, x: f64) -> Value {
        if self.action.integral_keys() {
            Value::Int(x as i64)
        } else {
            Value::Float(x)
        }
    }
}

impl Experiment for Perf {
    fn name(&self) -> &'static str {
        "perf"
    }

    fn input_kind(&self) -> InputKind {
        if self.action.is_headed() {
            InputKind::Headed
        } else {
            InputKind::Plain
        }
    }

    fn collect(&mut self, input: Input) -> Result<()> {
        for (mode, lines) in input.into_groups() {
            let parsed = lines
                .iter()
                .map(|line| self.parse_line(line))
                .collect::<Result<Vec<_>>>()?;
            let series = self.samples.entry(mode);
            for (key, rates) in parsed {
                series.entry(FloatKey(key)).extend(rates);
            }
        }
        if self.samples.values().all(|series| series.is_empty()) {
            return Err(AnalysisError::NoData("perf: no frame rate samples"));
        }
        Ok(())
    }

    fn refine(&mut self) -> Result<()> {
        self.medians = self
            .samples
            .iter()
            .map(|(mode, series)| {
                let points = series
                    .iter()
                    .filter_map(|(key, rates)| stats::median(rates).map(|m| (key.value(), m)))
                    .collect();
                (mode.clone(), points)
            })
            .collect();
        Ok(())
    }

    fn table(&self) -> Table {
        let headed = self.action.is_headed();
        let mut table = if headed {
            Table::new(&["mode", "x", "median_fps"])
        } else {
            Table::new(&["x", "median_fps"])
        };
        for (mode, points) in &self.medians {
            for &(x, fps) in points {
                let mut row = Vec::with_capacity(3);
                if headed {
                    row.push(Value::from(mode.as_str()));
                }
                row.push(self.x_value(x));
                row.push(Value::Float(fps));
                table.push(row);
            }
        }
        table
    }

    fn notes(&self) -> Vec<String> {
        self.medians
            .iter()
            .map(|(mode, points)| {
                let label = if mode.is_empty() { "fps".to_string() } else { mode.clone() };
                let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
                if self.action == PerfAction::Grid {
                    // grid sizes are fitted by rank, 1..=n
                    let xs: Vec<f64> = (1..=ys.len()).map(|i| i as f64).collect();
                    fit_note(&label, logistic_fit(&xs, &ys))
                } else {
                    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
                    fit_note(&label, power_fit(&xs, &ys))
                }
            })
            .collect()
    }
}
