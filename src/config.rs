// config.rs
// Reduction constants and their optional TOML overrides

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AnalysisError, Result};

// ====================
// Structure sizes
// ====================
pub const AVG_CELL_SIZE: f64 = 48.0; // particles per cell (blue + yellow)
pub const AVG_SPORE_SIZE: f64 = 18.0; // particles per spore (magenta)

// ====================
// Run timing
// ====================
pub const RUN_LENGTH_TICKS: i64 = 25_000;
pub const LIFETIME_BIN_WIDTH: i64 = 250;

// ====================
// Survival binning
// ====================
pub const SURVIVE_BIN_WIDTH: f64 = 0.033_333_33;
pub const SURVIVE_BIN_LIMIT: f64 = 0.98;
pub const SURVIVE_CLOSING_EDGE: f64 = 1.1;

// ====================
// Fits
// ====================
/// Emergence fits start at the first per-DPE median above this.
pub const EMERGE_FIT_THRESHOLD: f64 = 1.3;
/// Stand-in for zeros before a log-log fit.
pub const TTR_ZERO_SUBSTITUTE: f64 = 1e-8;

/// Initial number of size classes in the size and median histograms.
pub const SIZE_CLASSES: usize = 100;

/// Runtime view of the constants above. Every field may be overridden from
/// a TOML file; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub avg_cell_size: f64,
    pub avg_spore_size: f64,
    pub run_length_ticks: i64,
    pub lifetime_bin_width: i64,
    pub survive_bin_width: f64,
    pub survive_bin_limit: f64,
    pub survive_closing_edge: f64,
    pub emerge_fit_threshold: f64,
    pub ttr_zero_substitute: f64,
    pub size_classes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            avg_cell_size: AVG_CELL_SIZE,
            avg_spore_size: AVG_SPORE_SIZE,
            run_length_ticks: RUN_LENGTH_TICKS,
            lifetime_bin_width: LIFETIME_BIN_WIDTH,
            survive_bin_width: SURVIVE_BIN_WIDTH,
            survive_bin_limit: SURVIVE_BIN_LIMIT,
            survive_closing_edge: SURVIVE_CLOSING_EDGE,
            emerge_fit_threshold: EMERGE_FIT_THRESHOLD,
            ttr_zero_substitute: TTR_ZERO_SUBSTITUTE,
            size_classes: SIZE_CLASSES,
        }
    }
}

impl AnalysisConfig {
    /// Defaults, or the defaults overridden by the TOML file at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| AnalysisError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::info!("loaded config overrides from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("avg_cell_size", self.avg_cell_size),
            ("avg_spore_size", self.avg_spore_size),
            ("survive_bin_width", self.survive_bin_width),
            ("ttr_zero_substitute", self.ttr_zero_substitute),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AnalysisError::InvalidConfig(format!("{name} must be positive, got {value}")));
            }
        }
        if self.run_length_ticks <= 0 || self.lifetime_bin_width <= 0 {
            return Err(AnalysisError::InvalidConfig(
                "run_length_ticks and lifetime_bin_width must be positive".to_string(),
            ));
        }
        if self.survive_closing_edge <= self.survive_bin_limit {
            return Err(AnalysisError::InvalidConfig(format!(
                "survive_closing_edge ({}) must lie above survive_bin_limit ({})",
                self.survive_closing_edge, self.survive_bin_limit
            )));
        }
        Ok(())
    }
}
