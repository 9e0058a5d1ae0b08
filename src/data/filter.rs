//! Program Filter Module
//! Keyword search over normalized tables and the resulting program records.

use super::normalizer::SourceTable;
use super::schema::CanonicalColumn;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("No loaded table has a '{}' column", CanonicalColumn::ProgramaAcademico)]
    MissingProgramColumn,
}

/// An academic program, identified by its SNIES code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub code: String,
    pub name: String,
    pub institution: Option<String>,
    pub level: Option<String>,
    pub campus: Option<String>,
}

impl Program {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            institution: None,
            level: None,
            campus: None,
        }
    }

    /// Multi-line human readable description.
    pub fn summary(&self) -> String {
        let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        format!(
            "Programa: {}\nUniversidad: {}\nCódigo SNIES: {}\nNivel: {}\nCampus: {}\n",
            self.name,
            or_dash(&self.institution),
            self.code,
            or_dash(&self.level),
            or_dash(&self.campus),
        )
    }
}

/// Normalize a program code for comparison. Codes read as floats
/// ("1001.0") compare equal to their integer form.
pub fn code_key(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_suffix(".0") {
        Some(int) if !int.is_empty() && int.chars().all(|c| c.is_ascii_digit()) => int.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Split comma separated keywords, trimming blanks and dropping duplicates.
pub fn parse_keywords(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(',')
        .map(str::trim)
        .filter(|k| is_valid_keyword(k))
        .filter(|k| seen.insert(k.to_string()))
        .map(str::to_string)
        .collect()
}

pub fn is_valid_keyword(keyword: &str) -> bool {
    !keyword.trim().is_empty()
}

/// Read a column as optional strings; absent columns read as all-null.
fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, PolarsError> {
    match df.column(name) {
        Ok(column) => {
            let cast = column.cast(&DataType::String)?;
            Ok(cast
                .str()?
                .into_iter()
                .map(|v| v.map(|s| s.trim().to_string()))
                .collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

/// Keyword search plus the list of programs picked for analysis.
#[derive(Debug, Default)]
pub struct ProgramFilter {
    selected: Vec<Program>,
}

impl ProgramFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs whose name contains any keyword (case-insensitive), across
    /// all tables, de-duplicated by code in table then row order.
    pub fn search(keywords: &[String], tables: &[SourceTable]) -> Result<Vec<Program>, FilterError> {
        let name_col = CanonicalColumn::ProgramaAcademico.name();
        if !tables.iter().any(|t| t.table.contains(name_col)) {
            return Err(FilterError::MissingProgramColumn);
        }

        let needles: Vec<String> = keywords
            .iter()
            .filter(|k| is_valid_keyword(k))
            .map(|k| k.trim().to_lowercase())
            .collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut found = Vec::new();

        for source in tables {
            let df = source.table.dataframe();
            if !source.table.contains(name_col) {
                debug!(source = %source.source_id, "no program column; skipped by filter");
                continue;
            }

            let names = string_values(df, name_col)?;
            let codes = string_values(df, CanonicalColumn::CodigoSnies.name())?;
            let institutions = string_values(df, CanonicalColumn::Institucion.name())?;
            let levels = string_values(df, "nivel_formacion")?;
            let campuses = string_values(df, "municipio_oferta_programa")?;

            for i in 0..df.height() {
                let (Some(name), Some(code)) = (&names[i], &codes[i]) else {
                    continue;
                };
                let lowered = name.to_lowercase();
                if !needles.iter().any(|n| lowered.contains(n.as_str())) {
                    continue;
                }
                let code = code_key(code);
                if !seen.insert(code.clone()) {
                    continue;
                }
                found.push(Program {
                    code,
                    name: name.clone(),
                    institution: institutions[i].clone(),
                    level: levels[i].clone(),
                    campus: campuses[i].clone(),
                });
            }
        }

        info!(keywords = ?keywords, matches = found.len(), "program search");
        Ok(found)
    }

    /// Add a program to the selection; returns false if its code is already selected.
    pub fn select(&mut self, program: Program) -> bool {
        if self.selected.iter().any(|p| p.code == program.code) {
            debug!(program = %program.name, "already selected");
            return false;
        }
        debug!(program = %program.name, "selected");
        self.selected.push(program);
        true
    }

    pub fn selected(&self) -> &[Program] {
        &self.selected
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}
