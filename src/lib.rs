//! SNIES Stats - enrollment export reconciliation & per-program statistics
//!
//! Spreadsheet exports with inconsistent headers are mapped onto a canonical
//! schema, validated, searched by keyword and aggregated into one row per
//! program and year.

pub mod config;
pub mod data;
pub mod logging;
pub mod report;
pub mod stats;

pub use config::{AnalysisConfig, ConfigError};
pub use data::{
    CanonicalColumn, DataLoader, NormalizedTable, Program, ProgramFilter, SchemaNormalizer,
    SourceTable, SynonymMatching, TableReport,
};
pub use report::{ReportExporter, ReportFormat};
pub use stats::{AggregationMode, StatisticsAggregator, StatisticsRow, YearRange};
