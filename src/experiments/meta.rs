// experiments/meta.rs
// Average spore and cell sizes, the source of the structure-size constants

use super::{Experiment, Input};
use crate::error::{AnalysisError, Result};
use crate::output::{Table, Value};
use crate::parse::{tick_prefix, Fields};
use crate::stats::safe_div;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    magenta: u64,
    blue: u64,
    yellow: u64,
    cells: u64,
    spores: u64,
}

/// Lines `<tick>: w0 .. w10` with magenta, blue and yellow particle counts
/// at w0, w2, w4 and cluster, cell and spore counts at w6, w8, w10.
#[derive(Debug, Default)]
pub struct Meta {
    samples: Vec<Sample>,
    spore_size: f64,
    cell_size: f64,
    spore_hits: usize,
    cell_hits: usize,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Experiment for Meta {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn collect(&mut self, input: Input) -> Result<()> {
        for line in input.into_lines() {
            let (_, rest) = tick_prefix(&line)?;
            let words = Fields::new(&line, "counts", rest);
            // w6 (clusters) must be present even though it is unused
            words.count(6)?;
            self.samples.push(Sample {
                magenta: words.count(0)?,
                blue: words.count(2)?,
                yellow: words.count(4)?,
                cells: words.count(8)?,
                spores: words.count(10)?,
            });
        }
        if self.samples.is_empty() {
            return Err(AnalysisError::NoData("meta: no count lines"));
        }
        Ok(())
    }

    fn refine(&mut self) -> Result<()> {
        let mut spore_sum = 0.0;
        let mut cell_sum = 0.0;
        for s in &self.samples {
            if s.spores != 0 {
                self.spore_hits += 1;
                spore_sum += s.magenta as f64 / s.spores as f64;
            }
            if s.cells != 0 {
                self.cell_hits += 1;
                cell_sum += (s.blue + s.yellow) as f64 / s.cells as f64;
            }
        }
        self.spore_size = safe_div(spore_sum, self.spore_hits as f64);
        self.cell_size = safe_div(cell_sum, self.cell_hits as f64);
        Ok(())
    }

    fn table(&self) -> Table {
        let mut table = Table::new(&["avg_spore_size", "avg_cell_size"]);
        table.push(vec![Value::Float(self.spore_size), Value::Float(self.cell_size)]);
        table
    }

    fn notes(&self) -> Vec<String> {
        vec![format!(
            "{} lines, {} with spores, {} with cells",
            self.samples.len(),
            self.spore_hits,
            self.cell_hits
        )]
    }
}
