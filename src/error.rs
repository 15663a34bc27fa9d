// error.rs
// Error types shared by the parsers, reducers and the CLI

use std::path::PathBuf;
use thiserror::Error;

use crate::binning::BinningError;
use crate::fit::FitError;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}: empty input file, expected a header line", .0.display())]
    MissingHeader(PathBuf),

    #[error("no data: {0}")]
    NoData(&'static str),

    #[error("binning error: {0}")]
    Binning(#[from] BinningError),

    #[error("fit error: {0}")]
    Fit(#[from] FitError),

    #[error("config error in {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("output error: {0}")]
    Output(#[source] std::io::Error),
}

pub type Result<T> = core::result::Result<T, AnalysisError>;
