// experiments/mod.rs
// The collect -> refine -> report pipeline shared by every experiment

use std::path::PathBuf;

use crate::error::Result;
use crate::fit::{FitError, Model};
use crate::groups::OrderedGroups;
use crate::io::{self, Line};
use crate::output::Table;
use crate::profile_scope;

pub mod heatmap;
pub mod meta;
pub mod occupancy;
pub mod param_sweep;
pub mod perf;
pub mod size_noise;
pub mod stability;
pub mod survival;

/// How input files are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Lines of every file, concatenated.
    Plain,
    /// The first line of each file labels the rest (a mode or a DPE).
    Headed,
}

#[derive(Debug, Clone)]
pub enum Input {
    Plain(Vec<Line>),
    Headed(OrderedGroups<String, Vec<Line>>),
}

impl Input {
    /// All lines; headed groups are flattened in group order.
    pub fn into_lines(self) -> Vec<Line> {
        match self {
            Input::Plain(lines) => lines,
            Input::Headed(groups) => groups.into_iter().flat_map(|(_, lines)| lines).collect(),
        }
    }

    /// Labelled groups; plain input forms a single unlabelled group.
    pub fn into_groups(self) -> OrderedGroups<String, Vec<Line>> {
        match self {
            Input::Headed(groups) => groups,
            Input::Plain(lines) => {
                let mut groups: OrderedGroups<String, Vec<Line>> = OrderedGroups::new();
                groups.entry(String::new()).extend(lines);
                groups
            }
        }
    }
}

/// One reduction over the simulation logs.
pub trait Experiment {
    fn name(&self) -> &'static str;

    fn input_kind(&self) -> InputKind {
        InputKind::Plain
    }

    /// Parse the input into records.
    fn collect(&mut self, input: Input) -> Result<()>;

    /// Reduce the records to the reported quantities.
    fn refine(&mut self) -> Result<()>;

    /// Output rows.
    fn table(&self) -> Table;

    /// Summary lines: fits, peaks, quartiles.
    fn notes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Read `paths`, then collect, refine and tabulate.
pub fn run_experiment(experiment: &mut dyn Experiment, paths: &[PathBuf]) -> Result<Table> {
    io::check_inputs(paths)?;
    let input = {
        profile_scope!(Read);
        match experiment.input_kind() {
            InputKind::Plain => Input::Plain(io::read_all(paths)?),
            InputKind::Headed => Input::Headed(io::read_headed(paths)?),
        }
    };
    {
        profile_scope!(Collect);
        experiment.collect(input)?;
    }
    {
        profile_scope!(Refine);
        experiment.refine()?;
    }
    profile_scope!(Tabulate);
    let mut table = experiment.table();
    table.notes = experiment.notes();
    log::info!(
        "{}: {} rows, {} notes",
        experiment.name(),
        table.rows.len(),
        table.notes.len()
    );
    Ok(table)
}

/// A summary line for a fit. A failed fit is reported, not fatal.
pub(crate) fn fit_note<M: Model>(label: &str, fit: core::result::Result<M, FitError>) -> String {
    match fit {
        Ok(model) => format!("{label}: {}", model.describe()),
        Err(e) => {
            log::warn!("{label}: fit failed: {e}");
            format!("{label}: fit failed ({e})")
        }
    }
}

/// Compact label for a DPE or other float key ("0.05", "1.0").
pub(crate) fn float_label(value: f64) -> String {
    format!("{value:?}")
}
