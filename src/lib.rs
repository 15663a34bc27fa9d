// lib.rs
// Reductions of cell/spore simulation logs into plottable tables

pub mod binning;
pub mod cli;
pub mod config;
pub mod error;
pub mod experiments;
pub mod fit;
pub mod groups;
pub mod io;
pub mod output;
pub mod parse;
pub mod profiler;
pub mod stats;

pub use error::{AnalysisError, Result};

#[cfg(feature = "profiling")]
use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
use parking_lot::Mutex;

#[cfg(feature = "profiling")]
pub static PROFILER: Lazy<Mutex<profiler::Profiler>> =
    Lazy::new(|| Mutex::new(profiler::Profiler::new()));
