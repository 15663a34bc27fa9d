// experiments/size_noise.rs
// Experiment 5: structure size, lifetime and noise sensitivity per DPE

use super::survival::{item_changes, Change, ChangeKind, MethodChanges};
use super::{Experiment, Input, InputKind};
use crate::binning::{assign, frequency_median, BinEdges, RangePolicy};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::groups::OrderedGroups;
use crate::io::Line;
use crate::output::{Table, Value};
use crate::parse::{split_exact, split_once, Fields};
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SizeNoiseAction {
    /// Histogram of per-run median structure sizes
    Median,
    /// Summed structure counts per size
    Size,
    /// Distribution of run end ticks
    Lifetime,
    /// Quartiles of change ticks per noise level
    Noise,
}

/// One run: how it ended and its `(size, count)` table.
#[derive(Debug, Clone, PartialEq)]
struct Run {
    change: Change,
    sizes: Vec<(i64, u64)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct MethodRuns {
    est: Vec<Run>,
    dbscan: Vec<Run>,
}

/// One DPE's rows: class labels and a value per method.
#[derive(Debug, Clone, PartialEq)]
struct Histogram {
    dpe: String,
    classes: Vec<i64>,
    est: Vec<Value>,
    dbscan: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
struct NoiseQuartiles {
    dpe: String,
    noise: i64,
    est: Vec<f64>,
    dbscan: Vec<f64>,
}

pub struct SizeNoise {
    action: SizeNoiseAction,
    config: AnalysisConfig,
    runs: OrderedGroups<String, MethodRuns>,
    noise: OrderedGroups<String, OrderedGroups<i64, MethodChanges>>,
    histograms: Vec<Histogram>,
    quartiles: Vec<NoiseQuartiles>,
    summary: Vec<String>,
}

/// `<when> <how> <ignored> <size> <count>, <size> <count>, ...`
fn parse_run(line: &Line, text: &str) -> Result<Run> {
    let mut pieces = text.split(", ");
    let head = Fields::new(line, "run", pieces.next().unwrap_or_default());
    let change = Change {
        when: head.int(0)?,
        kind: ChangeKind::from_char(head.first_char(1)?),
    };
    let mut sizes = Vec::new();
    if head.len() > 3 {
        sizes.push((head.count(3)? as i64, head.count(4)?));
    }
    for piece in pieces {
        let pair = Fields::new(line, "size count", piece);
        sizes.push((pair.count(0)? as i64, pair.count(1)?));
    }
    Ok(Run { change, sizes })
}

/// Add `by` to `class`, growing the histogram when the class is new.
fn bump(histogram: &mut Vec<u64>, class: usize, by: u64) {
    if class >= histogram.len() {
        histogram.resize(class + 1, 0);
    }
    histogram[class] += by;
}

fn peak(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > 0.0)
        .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(i, _)| i)
}

fn format_quartiles(q: Option<Vec<f64>>) -> String {
    match q {
        Some(q) => q.iter().map(|v| format!("{v}")).collect::<Vec<_>>().join(" "),
        None => "n/a".to_string(),
    }
}

impl SizeNoise {
    pub fn new(action: SizeNoiseAction, config: &AnalysisConfig) -> Self {
        Self {
            action,
            config: config.clone(),
            runs: OrderedGroups::new(),
            noise: OrderedGroups::new(),
            histograms: Vec::new(),
            quartiles: Vec::new(),
            summary: Vec::new(),
        }
    }

    fn collect_runs(&mut self, dpe: String, lines: &[Line]) -> Result<()> {
        let runs = self.runs.entry(dpe);
        for line in lines {
            let (_, body) = split_once(line, &line.text, ": ")?;
            let parts = split_exact(line, body, "; ", 2)?;
            runs.est.push(parse_run(line, parts[0])?);
            runs.dbscan.push(parse_run(line, parts[1])?);
        }
        Ok(())
    }

    fn collect_noise(&mut self, dpe: String, lines: &[Line]) -> Result<()> {
        let levels = self.noise.entry(dpe);
        for line in lines {
            let (_, body) = split_once(line, &line.text, ": ")?;
            for item in body.split("; ") {
                let words = Fields::new(line, "item", item);
                let noise = words.int(0)?;
                let (est, dbscan) = item_changes(&words)?;
                let changes = levels.entry(noise);
                changes.est.push(est);
                changes.dbscan.push(dbscan);
            }
        }
        Ok(())
    }

    /// Median and size histograms, indexed by size class.
    fn size_histogram(&self, runs: &[Run]) -> Vec<u64> {
        let mut histogram = vec![0u64; self.config.size_classes];
        for run in runs {
            match self.action {
                SizeNoiseAction::Median => match frequency_median(&run.sizes) {
                    Some(median) => bump(&mut histogram, median.max(0) as usize, 1),
                    None => log::debug!("run ending at {} has no sizes", run.change.when),
                },
                _ => {
                    for &(size, count) in &run.sizes {
                        bump(&mut histogram, size as usize, count);
                    }
                }
            }
        }
        histogram
    }

    fn refine_sizes(&mut self) {
        for (dpe, runs) in self.runs.iter() {
            let mut est = self.size_histogram(&runs.est);
            let mut dbscan = self.size_histogram(&runs.dbscan);
            let len = est.len().max(dbscan.len());
            est.resize(len, 0);
            dbscan.resize(len, 0);
            for (method, histogram) in [("est", &est), ("dbscan", &dbscan)] {
                let as_float: Vec<f64> = histogram.iter().map(|&c| c as f64).collect();
                self.summary.push(format!(
                    "dpe {dpe} {method}: peak class {}, quartiles {}",
                    peak(&as_float).map_or("n/a".to_string(), |p| p.to_string()),
                    format_quartiles(stats::frequency_quantiles(histogram, 4))
                ));
            }
            self.histograms.push(Histogram {
                dpe: dpe.clone(),
                classes: (0..len as i64).collect(),
                est: est.into_iter().map(Value::from).collect(),
                dbscan: dbscan.into_iter().map(Value::from).collect(),
            });
        }
    }

    fn lifetime_edges(&self) -> Result<BinEdges> {
        let run_length = self.config.run_length_ticks as f64;
        let edges = BinEdges::uniform(0.0, run_length, self.config.lifetime_bin_width as f64)?
            .with_closing_edge(run_length)?;
        Ok(edges)
    }

    fn refine_lifetimes(&mut self) -> Result<()> {
        let edges = self.lifetime_edges()?;
        let classes: Vec<i64> = edges.edges().iter().map(|&e| e as i64).collect();
        for (dpe, runs) in self.runs.iter() {
            let mut columns = Vec::with_capacity(2);
            for (method, list) in [("est", &runs.est), ("dbscan", &runs.dbscan)] {
                let whens: Vec<f64> = list.iter().map(|r| r.change.when as f64).collect();
                let fractions = assign(&edges, whens.iter().copied(), RangePolicy::OpenTail)?.fractions();
                self.summary.push(format!(
                    "dpe {dpe} {method}: peak tick {}, quartiles {}",
                    peak(&fractions).map_or("n/a".to_string(), |p| classes[p].to_string()),
                    format_quartiles(stats::quantiles(&whens, 4))
                ));
                columns.push(fractions);
            }
            let dbscan = columns.pop().unwrap_or_default();
            let est = columns.pop().unwrap_or_default();
            self.histograms.push(Histogram {
                dpe: dpe.clone(),
                classes: classes.clone(),
                est: est.into_iter().map(Value::Float).collect(),
                dbscan: dbscan.into_iter().map(Value::Float).collect(),
            });
        }
        Ok(())
    }

    fn refine_noise(&mut self) {
        let ticks = |changes: &[Change]| -> Vec<f64> { changes.iter().map(|c| c.when as f64).collect() };
        for (dpe, levels) in self.noise.iter() {
            for (&noise, changes) in levels.iter() {
                self.quartiles.push(NoiseQuartiles {
                    dpe: dpe.clone(),
                    noise,
                    est: stats::quantiles(&ticks(&changes.est), 4).unwrap_or_default(),
                    dbscan: stats::quantiles(&ticks(&changes.dbscan), 4).unwrap_or_default(),
                });
            }
            self.summary.push(format!("dpe {dpe}: {} noise levels", levels.len()));
        }
    }
}

impl Experiment for SizeNoise {
    fn name(&self) -> &'static str {
        "size-noise"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Headed
    }

    fn collect(&mut self, input: Input) -> Result<()> {
        for (dpe, lines) in input.into_groups() {
            match self.action {
                SizeNoiseAction::Noise => self.collect_noise(dpe, &lines)?,
                _ => self.collect_runs(dpe, &lines)?,
            }
        }
        if self.runs.is_empty() && self.noise.is_empty() {
            return Err(AnalysisError::NoData("size-noise: no DPE groups"));
        }
        Ok(())
    }

    fn refine(&mut self) -> Result<()> {
        match self.action {
            SizeNoiseAction::Median | SizeNoiseAction::Size => self.refine_sizes(),
            SizeNoiseAction::Lifetime => self.refine_lifetimes()?,
            SizeNoiseAction::Noise => self.refine_noise(),
        }
        Ok(())
    }

    fn table(&self) -> Table {
        if self.action == SizeNoiseAction::Noise {
            let mut table = Table::new(&[
                "dpe", "noise", "est_q1", "est_q2", "est_q3", "dbscan_q1", "dbscan_q2", "dbscan_q3",
            ]);
            for q in &self.quartiles {
                let mut row = vec![Value::from(q.dpe.as_str()), Value::Int(q.noise)];
                for method in [&q.est, &q.dbscan] {
                    row.extend((0..3).map(|i| Value::Float(method.get(i).copied().unwrap_or(0.0))));
                }
                table.push(row);
            }
            return table;
        }
        let mut table = Table::new(&["dpe", "class", "est", "dbscan"]);
        for histogram in &self.histograms {
            for (i, &class) in histogram.classes.iter().enumerate() {
                table.push(vec![
                    Value::from(histogram.dpe.as_str()),
                    Value::Int(class),
                    histogram.est[i].clone(),
                    histogram.dbscan[i].clone(),
                ]);
            }
        }
        table
    }

    fn notes(&self) -> Vec<String> {
        self.summary.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::testing::{headed, reduce, rows};

    fn size_noise(action: SizeNoiseAction) -> SizeNoise {
        SizeNoise::new(action, &AnalysisConfig::default())
    }

    const RUNS: &str = "\
r1: 1000 decay x 2 3, 3 1; 1200 grow x 2 1
r2: 26000 end x 1 1, 4 2; 500 decay x 2 2, 5 1
";

    #[test]
    fn median_histogram_counts_run_medians() {
        let mut exp = size_noise(SizeNoiseAction::Median);
        let table = reduce(&mut exp, headed(&[("0.05", RUNS)]));
        let rendered = rows(&table);
        assert_eq!(rendered.len(), 100);
        // est medians: {2:3, 3:1} -> 2, {1:1, 4:2} -> 4; dbscan: 2, {2:2, 5:1} -> 2
        assert_eq!(rendered[2], "0.05 2 1 2");
        assert_eq!(rendered[4], "0.05 4 1 0");
        assert!(table.notes[1].starts_with("dpe 0.05 dbscan: peak class 2"), "{}", table.notes[1]);
    }

    #[test]
    fn size_histogram_sums_counts_and_grows() {
        let log = "r: 10 d x 2 3, 150 1; 10 d x 2 1\n";
        let mut exp = size_noise(SizeNoiseAction::Size);
        let table = reduce(&mut exp, headed(&[("0.07", log), ("0.07", "r: 10 d x 2 4; 10 d x 3 1\n")]));
        let rendered = rows(&table);
        assert_eq!(rendered.len(), 151);
        assert_eq!(rendered[2], "0.07 2 7 1");
        assert_eq!(rendered[3], "0.07 3 0 1");
        assert_eq!(rendered[150], "0.07 150 1 0");
    }

    #[test]
    fn lifetime_fractions_per_tick_bin() {
        let mut exp = size_noise(SizeNoiseAction::Lifetime);
        let table = reduce(&mut exp, headed(&[("0.05", RUNS), ("0.06", "r: 300 d x 1 1; 300 d x 1 1\n")]));
        let rendered = rows(&table);
        assert_eq!(rendered.len(), 202);
        // est ticks 1000 and 26000 (open last bin); dbscan 1200 and 500
        assert_eq!(rendered[2], "0.05 500 0.0 0.5");
        assert_eq!(rendered[4], "0.05 1000 0.5 0.5");
        assert_eq!(rendered[100], "0.05 25000 0.5 0.0");
        assert_eq!(rendered[101 + 1], "0.06 250 1.0 1.0");
    }

    #[test]
    fn noise_quartiles_per_level() {
        let log = "\
a: 1 100 d x 10 d; 1 200 d x 20 d; 2 50 e x 5 e
b: 1 300 d x 30 d; 1 400 d x 40 d
";
        let mut exp = size_noise(SizeNoiseAction::Noise);
        let table = reduce(&mut exp, headed(&[("0.05", log)]));
        let rendered = rows(&table);
        assert_eq!(
            rendered,
            [
                "0.05 1 125.0 250.0 375.0 12.5 25.0 37.5",
                "0.05 2 50.0 50.0 50.0 5.0 5.0 5.0",
            ]
        );
        assert_eq!(table.notes, ["dpe 0.05: 2 noise levels"]);
    }

    #[test]
    fn run_lines_need_both_methods() {
        let mut exp = size_noise(SizeNoiseAction::Size);
        let err = exp.collect(headed(&[("0.05", "r: 10 d x 2 3\n")])).unwrap_err();
        assert!(err.to_string().contains("'; '-separated"), "{err}");
    }
}
