//! Report Export Module
//! Writes aggregated statistics as delimited text, JSON records or an
//! Excel workbook.

use crate::stats::{rows_to_dataframe, StatisticsRow, RESULT_COLUMNS};
use polars::prelude::*;
use rust_xlsxwriter::{Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Excel error: {0}")]
    Xlsx(#[from] XlsxError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Csv, ReportFormat::Json, ReportFormat::Xlsx];

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
            ReportFormat::Xlsx => "xlsx",
        }
    }
}

/// Exporter for statistics reports
pub struct ReportExporter;

impl ReportExporter {
    /// Write `rows` to `path` in the given format.
    pub fn write(rows: &[StatisticsRow], format: ReportFormat, path: &Path) -> Result<(), ExportError> {
        match format {
            ReportFormat::Csv => {
                let mut writer = BufWriter::new(File::create(path)?);
                let mut df = rows_to_dataframe(rows)?;
                CsvWriter::new(&mut writer)
                    .include_header(true)
                    .with_separator(b',')
                    .finish(&mut df)?;
                writer.flush()?;
            }
            ReportFormat::Json => {
                let mut writer = BufWriter::new(File::create(path)?);
                serde_json::to_writer_pretty(&mut writer, rows)?;
                writer.flush()?;
            }
            ReportFormat::Xlsx => Self::write_xlsx(rows, path)?,
        }

        info!(path = %path.display(), rows = rows.len(), "report written");
        Ok(())
    }

    /// One sheet: the result column names on the first row, one row per record.
    fn write_xlsx(rows: &[StatisticsRow], path: &Path) -> Result<(), ExportError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet().set_name("resultados")?;

        for (col, name) in RESULT_COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *name)?;
        }
        for (i, row) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            sheet.write_string(r, 0, &row.programa)?;
            let values = [
                row.anio,
                row.inscritos,
                row.admitidos,
                row.nuevos_matriculados,
                row.total_matriculados,
                row.graduados,
            ];
            for (col, value) in values.into_iter().enumerate() {
                sheet.write_number(r, col as u16 + 1, value as f64)?;
            }
        }

        workbook.save(path)?;
        Ok(())
    }

    /// Write every format into `dir` as `<stem>.<ext>`, creating `dir` if needed.
    pub fn write_all(rows: &[StatisticsRow], dir: &Path, stem: &str) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(dir)?;
        ReportFormat::ALL
            .into_iter()
            .map(|format| {
                let path = dir.join(format!("{stem}.{}", format.extension()));
                Self::write(rows, format, &path)?;
                Ok(path)
            })
            .collect()
    }
}
