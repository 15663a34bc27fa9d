// main.rs
// Entry point: parse arguments, set up logging, run one experiment

use clap::{CommandFactory, Parser};
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use spore_stats::cli::{self, Cli};
use spore_stats::AnalysisError;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn print_usage(subcommand: &str) {
    let mut command = Cli::command();
    command.build();
    if let Some(sub) = command.find_subcommand_mut(subcommand) {
        eprintln!("{}", sub.render_usage());
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = cli::run(&cli, &mut out).and_then(|()| out.flush().map_err(AnalysisError::Output));

    #[cfg(feature = "profiling")]
    spore_stats::PROFILER.lock().log_and_clear();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            if matches!(e, AnalysisError::MissingFile(_)) {
                print_usage(cli.experiment.name());
            }
            ExitCode::FAILURE
        }
    }
}
