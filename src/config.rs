//! Analysis Configuration
//! Settings read from an optional JSON file; every field has a default.

use crate::data::SynonymMatching;
use crate::stats::{AggregationMode, AggregatorError, YearRange};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    YearRange(#[from] AggregatorError),
}

/// User settings for an analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub year_min: i64,
    pub year_max: i64,
    pub mode: AggregationMode,
    pub synonym_matching: SynonymMatching,
    pub output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let years = YearRange::default();
        Self {
            year_min: years.min(),
            year_max: years.max(),
            mode: AggregationMode::default(),
            synonym_matching: SynonymMatching::default(),
            output_dir: PathBuf::from("outputs"),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn year_range(&self) -> Result<YearRange, ConfigError> {
        Ok(YearRange::new(self.year_min, self.year_max)?)
    }
}
