// experiments/occupancy.rs
// Experiment 1: distribution of nearest-neighbour distance classes per tick

use super::{Experiment, Input};
use crate::binning::{assign, BinEdges, RangePolicy};
use crate::error::{AnalysisError, Result};
use crate::groups::OrderedGroups;
use crate::output::{Table, Value};
use crate::parse::{tick_prefix, Fields};

/// Distances at or beyond this many unit classes are rejected.
pub const MAX_CLASSES: usize = 100_000;

/// Lines `<tick>: <distance> <distance> ...`. Distances are floored into
/// unit classes and reported as fractions of the tick's sample count.
#[derive(Debug, Default)]
pub struct Occupancy {
    distances: OrderedGroups<i64, Vec<f64>>,
    classes: usize,
    fractions: Vec<(i64, Vec<f64>)>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Experiment for Occupancy {
    fn name(&self) -> &'static str {
        "occupancy"
    }

    fn collect(&mut self, input: Input) -> Result<()> {
        for line in input.into_lines() {
            let (tick, rest) = tick_prefix(&line)?;
            let values = Fields::new(&line, "distances", rest).floats_from(0)?;
            if let Some(bad) = values.iter().find(|d| !(**d >= 0.0 && d.is_finite())) {
                return Err(line.error(format!("distance {bad} is not a non-negative number")));
            }
            if let Some(far) = values.iter().find(|d| **d >= MAX_CLASSES as f64) {
                return Err(line.error(format!("distance {far} exceeds the {MAX_CLASSES} class limit")));
            }
            self.distances.entry(tick).extend(values);
        }
        if self.distances.is_empty() {
            return Err(AnalysisError::NoData("occupancy: no tick lines"));
        }
        Ok(())
    }

    fn refine(&mut self) -> Result<()> {
        let largest = self
            .distances
            .values()
            .flatten()
            .copied()
            .fold(0.0f64, f64::max);
        self.classes = largest.floor() as usize + 1;
        let edges = BinEdges::new((0..self.classes).map(|c| c as f64).collect())?;
        self.fractions = self
            .distances
            .iter()
            .map(|(&tick, values)| -> Result<(i64, Vec<f64>)> {
                let assignment = assign(&edges, values.iter().copied(), RangePolicy::OpenTail)?;
                Ok((tick, assignment.fractions()))
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn table(&self) -> Table {
        let mut columns = vec!["class".to_string()];
        columns.extend(self.fractions.iter().map(|(tick, _)| format!("t{tick}")));
        let mut table = Table::with_columns(columns);
        for class in 0..self.classes {
            let mut row = vec![Value::from(class)];
            row.extend(self.fractions.iter().map(|(_, f)| Value::Float(f[class])));
            table.push(row);
        }
        table
    }

    fn notes(&self) -> Vec<String> {
        self.fractions
            .iter()
            .map(|(tick, fractions)| {
                let samples = self.distances.get(tick).map_or(0, Vec::len);
                let modal = fractions
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
                    .map_or(0, |(class, _)| class);
                format!("tick {tick}: {samples} samples, modal class {modal}")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::testing::{plain, reduce, rows};

    #[test]
    fn classes_are_floored_fractions_per_tick() {
        let mut exp = Occupancy::new();
        let table = reduce(&mut exp, plain("0: 0.5 1.2 1.7 2.9\n100: 0.1 0.2\n"));
        assert_eq!(table.columns, ["class", "t0", "t100"]);
        assert_eq!(rows(&table), ["0 0.25 1.0", "1 0.5 0.0", "2 0.25 0.0"]);
    }

    #[test]
    fn each_tick_sums_to_one() {
        let mut exp = Occupancy::new();
        let table = reduce(&mut exp, plain("5: 3.3 0.0 7.9 7.1 2.2 4.0\n6: 1 1 1\n"));
        for column in 1..table.columns.len() {
            let total: f64 = table
                .records()
                .map(|row| match row[column] {
                    Value::Float(f) => f,
                    _ => 0.0,
                })
                .sum();
            assert!((total - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_tick_reports_zeros() {
        let mut exp = Occupancy::new();
        let table = reduce(&mut exp, plain("1: 0.5\n2:\n"));
        assert_eq!(rows(&table), ["0 1.0 0.0"]);
        assert_eq!(table.notes[1], "tick 2: 0 samples, modal class 0");
    }

    #[test]
    fn huge_distance_is_an_error_not_a_panic() {
        let mut exp = Occupancy::new();
        let err = exp.collect(plain("0: 0.5 1e300\n")).unwrap_err();
        assert!(err.to_string().contains("test.log:1"), "{err}");
        assert!(err.to_string().contains("class limit"), "{err}");

        let mut exp = Occupancy::new();
        let err = exp.collect(plain("0: 1e10\n")).unwrap_err();
        assert!(err.to_string().contains("class limit"), "{err}");
    }

    #[test]
    fn distance_just_below_the_limit_is_kept() {
        let mut exp = Occupancy::new();
        let edge = (MAX_CLASSES - 1) as f64 + 0.5;
        exp.collect(plain(&format!("0: {edge}\n"))).unwrap();
        exp.refine().unwrap();
        assert_eq!(exp.classes, MAX_CLASSES);
    }

    #[test]
    fn negative_distance_is_an_error() {
        let mut exp = Occupancy::new();
        let err = exp.collect(plain("1: 0.5 -2\n")).unwrap_err();
        assert!(err.to_string().contains("test.log:1"), "{err}");
    }
}
