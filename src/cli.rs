// cli.rs
// Command line: experiment subcommands, output options and dispatch

use clap::{ArgAction, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::experiments::heatmap::Heatmap;
use crate::experiments::meta::Meta;
use crate::experiments::occupancy::Occupancy;
use crate::experiments::param_sweep::ParamSweep;
use crate::experiments::perf::{Perf, PerfAction};
use crate::experiments::size_noise::{SizeNoise, SizeNoiseAction};
use crate::experiments::stability::{Stability, StabilityAction};
use crate::experiments::survival::{Survival, SurvivalAction};
use crate::experiments::{run_experiment, Experiment};
use crate::output::{write_table, OutputFormat, OutputOptions};

/// Reduce cell/spore simulation logs to plottable rows
#[derive(Parser, Debug)]
#[command(name = "spore_stats", version)]
pub struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Space, global = true)]
    pub format: OutputFormat,

    /// Print a `#` column header before space-separated rows
    #[arg(long, global = true)]
    pub header: bool,

    /// Append fit parameters, peaks and quartiles as `#` lines
    #[arg(long, global = true)]
    pub summary: bool,

    /// TOML file overriding the reduction constants
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub experiment: ExperimentCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExperimentCommand {
    /// 1: nearest-neighbour distance classes per tick
    #[command(visible_alias = "1")]
    Occupancy {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 2: cell/spore counts over time, colour change balance
    #[command(visible_alias = "2")]
    Stability {
        #[arg(value_enum)]
        action: StabilityAction,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 3: left/right neighbour configurations
    #[command(visible_alias = "3")]
    Heatmap {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 4: replication time, survival and emergence per DPE
    #[command(visible_alias = "4")]
    Survival {
        #[arg(value_enum)]
        action: SurvivalAction,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 5: structure sizes, lifetimes and noise per DPE (first line of each file is the DPE)
    #[command(visible_alias = "5")]
    SizeNoise {
        #[arg(value_enum)]
        action: SizeNoiseAction,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 6: mean DHI per alpha/beta pair
    #[command(visible_alias = "6")]
    ParamSweep {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 7: frame rates (time/gui/cl/grid files start with a mode line)
    #[command(visible_alias = "7")]
    Perf {
        #[arg(value_enum)]
        action: PerfAction,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Average spore and cell sizes
    Meta {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl ExperimentCommand {
    /// The subcommand's canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            ExperimentCommand::Occupancy { .. } => "occupancy",
            ExperimentCommand::Stability { .. } => "stability",
            ExperimentCommand::Heatmap { .. } => "heatmap",
            ExperimentCommand::Survival { .. } => "survival",
            ExperimentCommand::SizeNoise { .. } => "size-noise",
            ExperimentCommand::ParamSweep { .. } => "param-sweep",
            ExperimentCommand::Perf { .. } => "perf",
            ExperimentCommand::Meta { .. } => "meta",
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        match self {
            ExperimentCommand::Occupancy { files }
            | ExperimentCommand::Stability { files, .. }
            | ExperimentCommand::Heatmap { files }
            | ExperimentCommand::Survival { files, .. }
            | ExperimentCommand::SizeNoise { files, .. }
            | ExperimentCommand::ParamSweep { files }
            | ExperimentCommand::Perf { files, .. }
            | ExperimentCommand::Meta { files } => files,
        }
    }

    fn build(&self, config: &AnalysisConfig) -> Box<dyn Experiment> {
        match *self {
            ExperimentCommand::Occupancy { .. } => Box::new(Occupancy::new()),
            ExperimentCommand::Stability { action, .. } => Box::new(Stability::new(action, config)),
            ExperimentCommand::Heatmap { .. } => Box::new(Heatmap::new()),
            ExperimentCommand::Survival { action, .. } => Box::new(Survival::new(action, config)),
            ExperimentCommand::SizeNoise { action, .. } => Box::new(SizeNoise::new(action, config)),
            ExperimentCommand::ParamSweep { .. } => Box::new(ParamSweep::new()),
            ExperimentCommand::Perf { action, .. } => Box::new(Perf::new(action)),
            ExperimentCommand::Meta { .. } => Box::new(Meta::new()),
        }
    }
}

impl Cli {
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            format: self.format,
            header: self.header,
            summary: self.summary,
        }
    }
}

/// Run the selected experiment and write its table to `out`.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let config = AnalysisConfig::load(cli.config.as_deref())?;
    let mut experiment = cli.experiment.build(&config);
    log::info!(
        "running {} over {} file(s)",
        experiment.name(),
        cli.experiment.files().len()
    );
    let table = run_experiment(experiment.as_mut(), cli.experiment.files())?;
    write_table(&table, &cli.output_options(), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["spore_stats", "1", "a.log"], "occupancy")]
    #[case(&["spore_stats", "stability", "count", "a.log"], "stability")]
    #[case(&["spore_stats", "4", "ttr", "a.log", "b.log"], "survival")]
    #[case(&["spore_stats", "size-noise", "lifetime", "a.log"], "size-noise")]
    #[case(&["spore_stats", "6", "a.log"], "param-sweep")]
    #[case(&["spore_stats", "perf", "base_time", "a.log"], "perf")]
    #[case(&["spore_stats", "meta", "a.log"], "meta")]
    fn experiments_parse_by_name_or_number(#[case] args: &[&str], #[case] name: &str) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.experiment.name(), name);
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["spore_stats", "3", "a.log", "--format", "csv", "-vv", "--summary"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Csv);
        assert_eq!(cli.verbose, 2);
        assert!(cli.summary && !cli.header);
        assert_eq!(cli.experiment.files(), [PathBuf::from("a.log")]);
    }

    #[rstest]
    #[case(&["spore_stats", "2", "grow", "a.log"])]
    #[case(&["spore_stats", "9", "a.log"])]
    #[case(&["spore_stats", "1"])]
    #[case(&["spore_stats", "perf", "base-time", "a.log"])]
    fn bad_invocations_are_usage_errors(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
