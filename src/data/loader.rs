//! Spreadsheet Loader Module
//! Reads SNIES exports (.xlsx/.xls/.ods via calamine, .csv via Polars) into
//! raw tables keyed by file name.

use super::normalizer::{unique_names, RawTable};
use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to build table: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Failed to read workbook: {0}")]
    WorkbookError(#[from] calamine::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Workbook {0} has no sheets")]
    NoSheets(PathBuf),
    #[error("Unsupported file type: {0}")]
    UnsupportedFile(PathBuf),
}

const SPREADSHEET_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "ods"];

/// Loads raw tables from disk.
pub struct DataLoader;

impl DataLoader {
    /// Whether `path` has an extension this loader can read.
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                e == "csv" || SPREADSHEET_EXTENSIONS.contains(&e.as_str())
            })
            .unwrap_or(false)
    }

    /// Load one file into a raw table.
    pub fn load_file(path: &Path) -> Result<RawTable, LoaderError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Self::load_csv(path),
            e if SPREADSHEET_EXTENSIONS.contains(&e) => Self::load_workbook(path),
            _ => Err(LoaderError::UnsupportedFile(path.to_path_buf())),
        }
    }

    /// Load a CSV file using Polars.
    pub fn load_csv(path: &Path) -> Result<RawTable, LoaderError> {
        let df = LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;
        Ok(df)
    }

    /// Load the first worksheet of a workbook. The first row holds the
    /// headers; every cell is kept as text and empty cells become nulls.
    /// Repeated header texts are suffixed (`SEXO`, `SEXO_2`) so the sheet
    /// still loads.
    pub fn load_workbook(path: &Path) -> Result<RawTable, LoaderError> {
        let mut workbook = open_workbook_auto(path)?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| LoaderError::NoSheets(path.to_path_buf()))?;
        let range = workbook.worksheet_range(&sheet)?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(row) => unique_names(row.iter().enumerate().map(|(i, cell)| {
                cell_text(cell).unwrap_or_else(|| format!("column_{}", i + 1))
            })),
            None => return Ok(DataFrame::empty()),
        };

        let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for row in rows {
            for (i, column) in values.iter_mut().enumerate() {
                column.push(row.get(i).and_then(cell_text));
            }
        }

        let columns: Vec<Column> = headers
            .into_iter()
            .zip(values)
            .map(|(name, data)| Column::new(name.into(), data))
            .collect();

        Ok(DataFrame::new(columns)?)
    }

    /// Load every supported file in `dir`, sorted by file name. Files that
    /// fail to load are logged and skipped.
    pub fn load_dir(dir: &Path) -> Result<Vec<(String, RawTable)>, LoaderError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && Self::is_supported(p))
            .collect();
        paths.sort();

        let mut tables = Vec::with_capacity(paths.len());
        for path in paths {
            let source_id = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            match Self::load_file(&path) {
                Ok(df) => {
                    debug!(source = %source_id, rows = df.height(), "file read");
                    tables.push((source_id, df));
                }
                Err(e) => error!(source = %source_id, "failed to load: {e}"),
            }
        }
        Ok(tables)
    }
}

/// Render a cell as text; integral floats lose their decimals.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Data::Float(n) => Some(if n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", *n as i64)
        } else {
            format!("{}", n)
        }),
        Data::Int(n) => Some(n.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => Some(dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Error(_) => None,
    }
}
