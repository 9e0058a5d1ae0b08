//! Report module - result export

mod export;

pub use export::{ExportError, ReportExporter, ReportFormat};
