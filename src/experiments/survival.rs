// experiments/survival.rs
// Experiment 4: time to replicate, survival time and emergence per DPE

use super::{fit_note, float_label, Experiment, Input};
use crate::binning::{discretise, BinEdges, Occurrence, RangePolicy};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::fit::{linear_fit, power_fit};
use crate::groups::{FloatKey, OrderedGroups};
use crate::io::Line;
use crate::output::{Table, Value};
use crate::parse::{parse_float, split_exact, split_once, Fields};
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SurvivalAction {
    /// Replication ticks per DPE, with a power-law fit
    Ttr,
    /// Distribution of decay times as a fraction of the run
    Survive,
    /// Emerged structure counts per DPE, with linear fits
    Emerge,
}

/// What ended a structure's tracked life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Decay,
    Grow,
    Replicate,
    End,
    Other(char),
}

impl ChangeKind {
    pub(crate) fn from_char(c: char) -> Self {
        match c {
            'd' => ChangeKind::Decay,
            'g' => ChangeKind::Grow,
            'r' => ChangeKind::Replicate,
            'e' => ChangeKind::End,
            other => ChangeKind::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Change {
    pub when: i64,
    pub kind: ChangeKind,
}

/// The estimated and the clustered view of the same runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodChanges {
    pub est: Vec<Change>,
    pub dbscan: Vec<Change>,
}

/// The two changes of an item `<key> <est_tick> <est_how> <ignored>
/// <dbscan_tick> <dbscan_how>`; the key is left to the caller.
pub(crate) fn item_changes(words: &Fields) -> Result<(Change, Change)> {
    let est = Change {
        when: words.int(1)?,
        kind: ChangeKind::from_char(words.first_char(2)?),
    };
    let dbscan = Change {
        when: words.int(4)?,
        kind: ChangeKind::from_char(words.first_char(5)?),
    };
    Ok((est, dbscan))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Emergence {
    magenta: i64,
    blue: i64,
    yellow: i64,
    clusters: i64,
}

#[derive(Debug, Clone, PartialEq)]
struct SurviveBins {
    dpe: f64,
    est: Vec<Occurrence>,
    dbscan: Vec<Occurrence>,
}

pub struct Survival {
    action: SurvivalAction,
    config: AnalysisConfig,
    changes: OrderedGroups<FloatKey, MethodChanges>,
    emergences: OrderedGroups<FloatKey, Vec<Emergence>>,
    ttr: Vec<(f64, i64, i64)>,
    survive: Vec<SurviveBins>,
    emerge: Vec<(f64, f64, i64)>,
}

impl Survival {
    pub fn new(action: SurvivalAction, config: &AnalysisConfig) -> Self {
        Self {
            action,
            config: config.clone(),
            changes: OrderedGroups::new(),
            emergences: OrderedGroups::new(),
            ttr: Vec::new(),
            survive: Vec::new(),
            emerge: Vec::new(),
        }
    }

    fn collect_changes(&mut self, line: &Line) -> Result<()> {
        let (_, body) = split_once(line, &line.text, ": ")?;
        for item in body.split("; ") {
            let words = Fields::new(line, "item", item);
            let dpe = words.float(0)?;
            let (est, dbscan) = item_changes(&words)?;
            let changes = self.changes.entry(FloatKey(dpe));
            changes.est.push(est);
            changes.dbscan.push(dbscan);
        }
        Ok(())
    }

    /// `<label>: <dpe>: <m> .., <b> .., <y> ..: <clusters> .., <cells> .., <spores> ..`
    fn collect_emergence(&mut self, line: &Line) -> Result<()> {
        let parts = split_exact(line, &line.text, ": ", 4)?;
        let dpe = parse_float(line, "dpe", parts[1])?;
        let colours = leading_counts(line, parts[2])?;
        let structures = leading_counts(line, parts[3])?;
        self.emergences.push(
            FloatKey(dpe),
            Emergence {
                magenta: colours[0],
                blue: colours[1],
                yellow: colours[2],
                clusters: structures[0],
            },
        );
        Ok(())
    }

    fn refine_ttr(&mut self) {
        let replicated = |change: Option<&Change>| match change {
            Some(c) if c.kind == ChangeKind::Replicate => c.when,
            _ => 0,
        };
        for (dpe, changes) in self.changes.iter() {
            for i in 0..changes.est.len().max(changes.dbscan.len()) {
                self.ttr.push((
                    dpe.value(),
                    replicated(changes.est.get(i)),
                    replicated(changes.dbscan.get(i)),
                ));
            }
        }
    }

    fn survive_edges(&self) -> Result<BinEdges> {
        let edges = BinEdges::uniform(0.0, self.config.survive_bin_limit, self.config.survive_bin_width)?
            .with_closing_edge(self.config.survive_closing_edge)?;
        Ok(edges)
    }

    fn refine_survive(&mut self) -> Result<()> {
        let edges = self.survive_edges()?;
        let run_length = self.config.run_length_ticks as f64;
        // only a decay gives the tick meaning; anything else survived the run
        let survived = |changes: &[Change]| -> Vec<f64> {
            changes
                .iter()
                .map(|c| match c.kind {
                    ChangeKind::Decay => c.when as f64 / run_length,
                    _ => 1.0,
                })
                .collect()
        };
        for (dpe, changes) in self.changes.iter() {
            self.survive.push(SurviveBins {
                dpe: dpe.value(),
                est: discretise(&edges, survived(&changes.est), RangePolicy::OpenTail)?,
                dbscan: discretise(&edges, survived(&changes.dbscan), RangePolicy::OpenTail)?,
            });
        }
        Ok(())
    }

    fn refine_emerge(&mut self) {
        let cell_size = self.config.avg_cell_size;
        let spore_size = self.config.avg_spore_size;
        for (dpe, records) in self.emergences.iter() {
            for e in records {
                let estimated = (e.blue + e.yellow) as f64 / cell_size + e.magenta as f64 / spore_size;
                self.emerge.push((dpe.value(), estimated, e.clusters));
            }
        }
    }

    fn ttr_notes(&self) -> Vec<String> {
        let small = self.config.ttr_zero_substitute;
        let est: Vec<(f64, f64)> = self.ttr.iter().map(|&(dpe, e, _)| (dpe, e as f64)).collect();
        let (xs, ys) = medians(&est);
        let start = ys.iter().position(|&y| y != 0.0).unwrap_or(ys.len());
        let substitute = |v: &f64| if *v == 0.0 { small } else { *v };
        let xs: Vec<f64> = xs[start..].iter().map(substitute).collect();
        let ys: Vec<f64> = ys[start..].iter().map(substitute).collect();
        vec![fit_note("ttr est", power_fit(&xs, &ys))]
    }

    fn emerge_notes(&self) -> Vec<String> {
        let threshold = self.config.emerge_fit_threshold;
        let est: Vec<(f64, f64)> = self.emerge.iter().map(|&(dpe, e, _)| (dpe, e)).collect();
        let dbscan: Vec<(f64, f64)> = self.emerge.iter().map(|&(dpe, _, c)| (dpe, c as f64)).collect();
        [("emerge est", est), ("emerge dbscan", dbscan)]
            .into_iter()
            .map(|(label, rows)| {
                let (xs, ys) = medians(&rows);
                let start = ys.iter().position(|&y| y > threshold).unwrap_or(0);
                fit_note(label, linear_fit(&xs[start..], &ys[start..]))
            })
            .collect()
    }
}

/// Per-DPE medians of `(dpe, value)` rows, DPEs in first-seen order.
fn medians(rows: &[(f64, f64)]) -> (Vec<f64>, Vec<f64>) {
    let mut grouped: OrderedGroups<FloatKey, Vec<f64>> = OrderedGroups::new();
    for &(dpe, value) in rows {
        grouped.push(FloatKey(dpe), value);
    }
    grouped
        .iter()
        .filter_map(|(dpe, values)| stats::median(values).map(|m| (dpe.value(), m)))
        .unzip()
}

/// First integer of each `", "`-separated part; exactly three parts.
fn leading_counts(line: &Line, text: &str) -> Result<[i64; 3]> {
    let parts = split_exact(line, text, ", ", 3)?;
    let mut counts = [0i64; 3];
    for (slot, part) in counts.iter_mut().zip(parts) {
        *slot = Fields::new(line, "count", part).int(0)?;
    }
    Ok(counts)
}

impl Experiment for Survival {
    fn name(&self) -> &'static str {
        "survival"
    }

    fn collect(&mut self, input: Input) -> Result<()> {
        for line in input.into_lines() {
            match self.action {
                SurvivalAction::Ttr | SurvivalAction::Survive => self.collect_changes(&line)?,
                SurvivalAction::Emerge => self.collect_emergence(&line)?,
            }
        }
        if self.changes.is_empty() && self.emergences.is_empty() {
            return Err(AnalysisError::NoData("survival: no records"));
        }
        Ok(())
    }

    fn refine(&mut self) -> Result<()> {
        match self.action {
            SurvivalAction::Ttr => self.refine_ttr(),
            SurvivalAction::Survive => self.refine_survive()?,
            SurvivalAction::Emerge => self.refine_emerge(),
        }
        Ok(())
    }

    fn table(&self) -> Table {
        match self.action {
            SurvivalAction::Ttr => {
                let mut table = Table::new(&["dpe", "est_tick", "dbscan_tick"]);
                for &(dpe, est, dbscan) in &self.ttr {
                    table.push(vec![Value::Float(dpe), Value::Int(est), Value::Int(dbscan)]);
                }
                table
            }
            SurvivalAction::Survive => {
                let mut table = Table::new(&[
                    "dpe",
                    "est_bin",
                    "est_frac",
                    "est_count",
                    "dbscan_bin",
                    "dbscan_frac",
                    "dbscan_count",
                ]);
                let cells = |o: Option<&Occurrence>| match o {
                    Some(o) => [Value::from(o.bin), Value::Float(o.lower), Value::from(o.count)],
                    None => [Value::Int(0), Value::Float(0.0), Value::Int(0)],
                };
                for bins in &self.survive {
                    for i in 0..bins.est.len().max(bins.dbscan.len()) {
                        let mut row = vec![Value::Float(bins.dpe)];
                        row.extend(cells(bins.est.get(i)));
                        row.extend(cells(bins.dbscan.get(i)));
                        table.push(row);
                    }
                }
                table
            }
            SurvivalAction::Emerge => {
                let mut table = Table::new(&["dpe", "est_clusters", "dbscan_clusters"]);
                for &(dpe, est, clusters) in &self.emerge {
                    table.push(vec![Value::Float(dpe), Value::Float(est), Value::Int(clusters)]);
                }
                table
            }
        }
    }

    fn notes(&self) -> Vec<String> {
        match self.action {
            SurvivalAction::Ttr => self.ttr_notes(),
            SurvivalAction::Emerge => self.emerge_notes(),
            SurvivalAction::Survive => self
                .changes
                .iter()
                .map(|(dpe, changes)| {
                    let decays = |list: &[Change]| list.iter().filter(|c| c.kind == ChangeKind::Decay).count();
                    format!(
                        "dpe {}: est {} of {} decayed, dbscan {} of {} decayed",
                        float_label(dpe.value()),
                        decays(&changes.est),
                        changes.est.len(),
                        decays(&changes.dbscan),
                        changes.dbscan.len()
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::testing::{plain, reduce, rows};

    fn survival(action: SurvivalAction) -> Survival {
        Survival::new(action, &AnalysisConfig::default())
    }

    #[test]
    fn ttr_reports_only_replications() {
        let log = "\
run 1: 0.05 1200 replicate x 900 decay; 0.06 800 replicate x 700 replicate
run 2: 0.05 5000 decay x 1000 replicate
";
        let mut exp = survival(SurvivalAction::Ttr);
        let table = reduce(&mut exp, plain(log));
        assert_eq!(rows(&table), ["0.05 1200 0", "0.05 0 1000", "0.06 800 700"]);
    }

    #[test]
    fn ttr_fit_follows_power_law() {
        // T = 2 * DPE^-2, one replication per DPE
        let dpes = [0.05, 0.1, 0.2, 0.25];
        let items: Vec<String> = dpes
            .iter()
            .map(|&d: &f64| format!("{d} {} r x 0 e", (2.0 * d.powf(-2.0)).round() as i64))
            .collect();
        let log = format!("run: {}\n", items.join("; "));
        let mut exp = survival(SurvivalAction::Ttr);
        let table = reduce(&mut exp, plain(&log));
        let note = &table.notes[0];
        assert!(note.starts_with("ttr est: y = "), "{note}");
        assert!(note.contains("x^-2.000"), "{note}");
    }

    #[test]
    fn ttr_fit_skips_leading_zero_medians() {
        let log = "run: 0.01 0 e x 0 e; 0.02 100 r x 0 e; 0.04 25 r x 0 e\n";
        let mut exp = survival(SurvivalAction::Ttr);
        let table = reduce(&mut exp, plain(log));
        assert!(table.notes[0].contains("x^-2.000"), "{}", table.notes[0]);
    }

    #[test]
    fn survive_bins_decays_and_forces_survivors_to_the_end() {
        // 2500/25000 = 0.1 -> bin 3; non-decays -> 1.0 in bin 29, [0.9667, 1.1)
        let log = "\
a: 0.05 2500 decay x 2500 grow; 0.05 9000 replicate x 2500 decay
b: 0.05 2500 decay x 24999 end
";
        let mut exp = survival(SurvivalAction::Survive);
        let table = reduce(&mut exp, plain(log));
        let rendered = rows(&table);
        assert_eq!(rendered.len(), 2);
        let est: Vec<_> = rendered[0].split(' ').collect();
        assert_eq!(est[0], "0.05");
        assert_eq!((est[1], est[3]), ("3", "2"));
        let second: Vec<_> = rendered[1].split(' ').collect();
        assert_eq!((second[1], second[3]), ("29", "1"));
        // dbscan uses its own change kinds
        assert_eq!((est[4], est[6]), ("29", "2"));
        assert_eq!((second[4], second[6]), ("3", "1"));
        assert_eq!(table.notes, ["dpe 0.05: est 2 of 3 decayed, dbscan 1 of 3 decayed"]);
    }

    #[test]
    fn survive_pads_the_shorter_method() {
        let log = "a: 0.05 2500 decay x 2500 grow; 0.05 12500 decay x 2500 grow\n";
        let mut exp = survival(SurvivalAction::Survive);
        let table = reduce(&mut exp, plain(log));
        let rendered = rows(&table);
        assert_eq!(rendered.len(), 2);
        assert!(rendered[1].ends_with(" 0 0.0 0"), "{}", rendered[1]);
    }

    #[test]
    fn emerge_estimates_clusters() {
        let log = "\
x: 0.05: 18 m, 24 b, 24 y: 3 c, 1 cells, 1 spores
x: 0.06: 36 m, 48 b, 48 y: 4 c, 2 cells, 2 spores
";
        let mut exp = survival(SurvivalAction::Emerge);
        let table = reduce(&mut exp, plain(log));
        assert_eq!(rows(&table), ["0.05 2.0 3", "0.06 4.0 4"]);
        assert_eq!(table.notes.len(), 2);
        assert!(table.notes[0].starts_with("emerge est: y = "), "{}", table.notes[0]);
    }

    #[test]
    fn emerge_rejects_missing_sections() {
        let mut exp = survival(SurvivalAction::Emerge);
        assert!(exp.collect(plain("x: 0.05: 18 m, 24 b, 24 y")).is_err());
    }

    #[test]
    fn short_item_is_an_error() {
        let mut exp = survival(SurvivalAction::Ttr);
        let err = exp.collect(plain("run: 0.05 1200 r x")).unwrap_err();
        assert!(err.to_string().contains("expected at least 5 fields"), "{err}");
    }
}
