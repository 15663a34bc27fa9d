// experiments/heatmap.rs
// Experiment 3: frequency of left/right neighbour-count configurations

use super::{Experiment, Input};
use crate::error::{AnalysisError, Result};
use crate::groups::OrderedGroups;
use crate::output::{Table, Value};
use crate::parse::Fields;

/// Lines of `", "`-separated particles `<id> <colour> <left> <right>`; the
/// first particle of a line carries a leading instance number.
#[derive(Debug, Default)]
pub struct Heatmap {
    pairs: Vec<(i64, i64)>,
    counts: OrderedGroups<(i64, i64), usize>,
}

impl Heatmap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Experiment for Heatmap {
    fn name(&self) -> &'static str {
        "heatmap"
    }

    fn collect(&mut self, input: Input) -> Result<()> {
        for line in input.into_lines() {
            for (i, particle) in line.text.split(", ").enumerate() {
                let words = Fields::new(&line, "particle", particle);
                // skip the instance number
                let offset = usize::from(i == 0);
                let left = words.int(offset + 2)?;
                let right = words.int(offset + 3)?;
                self.pairs.push((left, right));
            }
        }
        if self.pairs.is_empty() {
            return Err(AnalysisError::NoData("heatmap: no particles"));
        }
        Ok(())
    }

    fn refine(&mut self) -> Result<()> {
        for &pair in &self.pairs {
            *self.counts.entry(pair) += 1;
        }
        Ok(())
    }

    fn table(&self) -> Table {
        let mut table = Table::new(&["left", "right", "count"]);
        for (&(left, right), &count) in self.counts.iter() {
            table.push(vec![Value::Int(left), Value::Int(right), Value::from(count)]);
        }
        table
    }

    fn notes(&self) -> Vec<String> {
        let hottest = self
            .counts
            .iter()
            .fold(None, |best: Option<(&(i64, i64), usize)>, (pair, &count)| match best {
                Some((_, top)) if top >= count => best,
                _ => Some((pair, count)),
            });
        match hottest {
            Some(((left, right), count)) => vec![format!(
                "hottest {left}:{right} with {count} of {} particles",
                self.pairs.len()
            )],
            None => Vec::new(),
        }
    }
}
