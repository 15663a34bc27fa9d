// experiments/stability.rs
// Experiment 2: structure counts over time and colour-change balance

use super::{fit_note, Experiment, Input};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::fit::verhulst_fit;
use crate::groups::OrderedGroups;
use crate::io::Line;
use crate::output::{Table, Value};
use crate::parse::{tick_prefix, Fields};

const TYPES_PREFIX: &str = "types:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StabilityAction {
    /// Estimated and clustered cell/spore counts per tick
    Count,
    /// Net colour transitions per history
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Magenta,
    Blue,
    Yellow,
    White,
    Green,
}

impl Colour {
    const ALL: [Colour; 5] = [Colour::Magenta, Colour::Blue, Colour::Yellow, Colour::White, Colour::Green];

    fn parse(line: &Line, word: &str) -> Result<Self> {
        match word {
            "m" => Ok(Colour::Magenta),
            "b" => Ok(Colour::Blue),
            "y" => Ok(Colour::Yellow),
            "w" => Ok(Colour::White),
            "g" => Ok(Colour::Green),
            other => Err(line.error(format!("unknown colour code '{other}'"))),
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn code(self) -> &'static str {
        match self {
            Colour::Magenta => "m",
            Colour::Blue => "b",
            Colour::Yellow => "y",
            Colour::White => "w",
            Colour::Green => "g",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Counts {
    magenta: u64,
    blue: u64,
    yellow: u64,
    clusters: u64,
    cells: u64,
    spores: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Population {
    tick: i64,
    est_cells: f64,
    est_spores: f64,
    dbscan_cells: u64,
    dbscan_spores: u64,
}

/// Transition counts `[from][to]` for one history.
type Transitions = [[i64; 5]; 5];

pub struct Stability {
    action: StabilityAction,
    config: AnalysisConfig,
    counts: OrderedGroups<i64, Counts>,
    histories: Vec<Vec<Vec<Colour>>>,
    populations: Vec<Population>,
    transitions: Vec<Transitions>,
}

impl Stability {
    pub fn new(action: StabilityAction, config: &AnalysisConfig) -> Self {
        Self {
            action,
            config: config.clone(),
            counts: OrderedGroups::new(),
            histories: Vec::new(),
            populations: Vec::new(),
            transitions: Vec::new(),
        }
    }

    fn collect_counts(&mut self, lines: Vec<Line>) -> Result<()> {
        for line in lines {
            if line.text.trim_start().starts_with(TYPES_PREFIX) {
                continue;
            }
            let (tick, rest) = tick_prefix(&line)?;
            let words = Fields::new(&line, "counts", rest);
            let counts = Counts {
                magenta: words.count(0)?,
                blue: words.count(2)?,
                yellow: words.count(4)?,
                clusters: words.count(8)?,
                cells: words.count(10)?,
                spores: words.count(12)?,
            };
            log::debug!("tick {tick}: {} clusters", counts.clusters);
            // a repeated tick keeps its position but takes the latest counts
            *self.counts.entry_or_insert_with(tick, || counts) = counts;
        }
        Ok(())
    }

    fn collect_changes(&mut self, lines: Vec<Line>) -> Result<()> {
        for line in lines {
            let Some(body) = line.text.trim_start().strip_prefix(TYPES_PREFIX) else {
                continue;
            };
            let mut history = Vec::new();
            for particle in body.split(',') {
                let words = Fields::new(&line, "particle", particle);
                let colours = (1..words.len())
                    .map(|i| Colour::parse(&line, words.word(i)?))
                    .collect::<Result<Vec<_>>>()?;
                history.push(colours);
            }
            self.histories.push(history);
        }
        Ok(())
    }
}

fn series(populations: &[Population]) -> [(&'static str, Vec<f64>); 4] {
    [
        ("est_cells", populations.iter().map(|p| p.est_cells).collect()),
        ("est_spores", populations.iter().map(|p| p.est_spores).collect()),
        ("dbscan_cells", populations.iter().map(|p| p.dbscan_cells as f64).collect()),
        ("dbscan_spores", populations.iter().map(|p| p.dbscan_spores as f64).collect()),
    ]
}

fn count_transitions(history: &[Vec<Colour>]) -> Transitions {
    let mut transitions = [[0i64; 5]; 5];
    for particle in history {
        for pair in particle.windows(2) {
            if pair[0] != pair[1] {
                transitions[pair[0].index()][pair[1].index()] += 1;
            }
        }
    }
    transitions
}

impl Experiment for Stability {
    fn name(&self) -> &'static str {
        "stability"
    }

    fn collect(&mut self, input: Input) -> Result<()> {
        let lines = input.into_lines();
        match self.action {
            StabilityAction::Count => self.collect_counts(lines)?,
            StabilityAction::Change => self.collect_changes(lines)?,
        }
        if self.counts.is_empty() && self.histories.is_empty() {
            return Err(AnalysisError::NoData("stability: no matching lines"));
        }
        Ok(())
    }

    fn refine(&mut self) -> Result<()> {
        let cell_size = self.config.avg_cell_size;
        let spore_size = self.config.avg_spore_size;
        self.populations = self
            .counts
            .iter()
            .map(|(&tick, c)| Population {
                tick,
                est_cells: (c.blue + c.yellow) as f64 / cell_size,
                est_spores: c.magenta as f64 / spore_size,
                dbscan_cells: c.cells,
                dbscan_spores: c.spores,
            })
            .collect();
        self.transitions = self.histories.iter().map(|h| count_transitions(h)).collect();
        Ok(())
    }

    fn table(&self) -> Table {
        match self.action {
            StabilityAction::Count => {
                let mut table = Table::new(&["tick", "est_cells", "est_spores", "dbscan_cells", "dbscan_spores"]);
                for p in &self.populations {
                    table.push(vec![
                        Value::Int(p.tick),
                        Value::Float(p.est_cells),
                        Value::Float(p.est_spores),
                        Value::from(p.dbscan_cells),
                        Value::from(p.dbscan_spores),
                    ]);
                }
                table
            }
            StabilityAction::Change => {
                let mut table = Table::new(&["from", "to", "net"]);
                for t in &self.transitions {
                    for (i, &from) in Colour::ALL.iter().enumerate() {
                        for &to in &Colour::ALL[i + 1..] {
                            let net = t[from.index()][to.index()] - t[to.index()][from.index()];
                            table.push(vec![
                                Value::from(from.code()),
                                Value::from(to.code()),
                                Value::Int(net),
                            ]);
                        }
                    }
                    table.push_break();
                }
                table
            }
        }
    }

    fn notes(&self) -> Vec<String> {
        if self.action != StabilityAction::Count {
            return vec![format!("{} histories", self.transitions.len())];
        }
        let mut ordered = self.populations.clone();
        ordered.sort_by_key(|p| p.tick);
        let ticks: Vec<f64> = ordered.iter().map(|p| p.tick as f64).collect();
        series(&ordered)
            .into_iter()
            .map(|(label, ys)| fit_note(label, verhulst_fit(&ticks, &ys)))
            .collect()
    }
}
