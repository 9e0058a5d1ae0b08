//! Schema Normalizer Module
//! Rewrites raw spreadsheet headers onto the canonical vocabulary and
//! checks which canonical columns a table carries.

use super::schema::{expected_metrics, synonym_entries, CanonicalColumn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{error, info, warn};

/// A table exactly as it came out of the loader.
pub type RawTable = DataFrame;

#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("Failed to rename columns: {0}")]
    PolarsError(#[from] PolarsError),
}

/// How headers are compared against the literal synonym table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynonymMatching {
    /// Byte-for-byte match; a header differing only in case falls through
    /// to the lowercased passthrough form.
    #[default]
    Exact,
    /// Headers and synonyms are lowercased before comparison.
    CaseInsensitive,
}

/// Rewrite a single header.
pub fn normalize_header(header: &str, matching: SynonymMatching) -> String {
    let found = match matching {
        SynonymMatching::Exact => synonym_entries()
            .find(|(_, synonyms)| synonyms.contains(&header))
            .map(|(canonical, _)| canonical),
        SynonymMatching::CaseInsensitive => {
            let folded = header.trim().to_lowercase();
            synonym_entries()
                .find(|(_, synonyms)| synonyms.iter().any(|s| s.to_lowercase() == folded))
                .map(|(canonical, _)| canonical)
        }
    };

    match found {
        Some(canonical) => canonical.to_string(),
        None => header.trim().to_lowercase().replace(' ', "_"),
    }
}

/// Rewrite a full header row. Names that collapse onto an earlier one get a
/// numeric suffix so every column stays addressable.
pub fn normalize_headers<S: AsRef<str>>(headers: &[S], matching: SynonymMatching) -> Vec<String> {
    unique_names(headers.iter().map(|h| normalize_header(h.as_ref(), matching)))
}

/// Suffix repeated names with `_2`, `_3`, ... in order of appearance.
pub(crate) fn unique_names<I: IntoIterator<Item = String>>(names: I) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();

    for base in names {
        let mut name = base.clone();
        while taken.contains(&name) {
            let n = counts.entry(base.clone()).or_insert(1);
            *n += 1;
            name = format!("{base}_{n}");
        }
        taken.insert(name.clone());
        out.push(name);
    }
    out
}

/// A table whose headers have been rewritten onto the canonical vocabulary.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    df: DataFrame,
    headers: HashSet<String>,
}

impl NormalizedTable {
    fn from_dataframe(df: DataFrame) -> Self {
        let headers = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self { df, headers }
    }

    pub fn has_column(&self, column: CanonicalColumn) -> bool {
        self.headers.contains(column.name())
    }

    pub fn contains(&self, header: &str) -> bool {
        self.headers.contains(header)
    }

    /// Column names in table order.
    pub fn columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_dataframe(self) -> DataFrame {
        self.df
    }
}

/// A normalized table tagged with the identifier of the file it came from.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub source_id: String,
    pub table: NormalizedTable,
}

impl SourceTable {
    pub fn new(source_id: impl Into<String>, table: NormalizedTable) -> Self {
        Self {
            source_id: source_id.into(),
            table,
        }
    }
}

/// Validation outcome for one source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub source_id: String,
    pub missing_required: Vec<CanonicalColumn>,
    pub missing_optional: Vec<CanonicalColumn>,
}

impl TableReport {
    /// A table is accepted iff it carries every required column.
    pub fn is_acceptable(&self) -> bool {
        self.missing_required.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.missing_optional.is_empty()
    }
}

/// Maps heterogeneous headers onto canonical names and validates presence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaNormalizer {
    matching: SynonymMatching,
}

impl SchemaNormalizer {
    pub fn new(matching: SynonymMatching) -> Self {
        Self { matching }
    }

    pub fn matching(&self) -> SynonymMatching {
        self.matching
    }

    /// Rewrite every header of `table`. Column count and order are kept.
    pub fn normalize(&self, mut table: RawTable) -> Result<NormalizedTable, NormalizerError> {
        let original: Vec<String> = table
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let renamed = normalize_headers(&original, self.matching);
        table.set_column_names(renamed)?;
        Ok(NormalizedTable::from_dataframe(table))
    }

    /// Check required and source-expected optional columns.
    pub fn validate(&self, table: &NormalizedTable, source_id: &str) -> TableReport {
        let missing_required = CanonicalColumn::REQUIRED
            .into_iter()
            .filter(|c| !table.has_column(*c))
            .collect();
        let missing_optional = expected_metrics(source_id)
            .iter()
            .copied()
            .filter(|c| !table.has_column(*c))
            .collect();

        TableReport {
            source_id: source_id.to_string(),
            missing_required,
            missing_optional,
        }
    }

    /// Normalize, validate and log the outcome. The table is handed back only
    /// when it is acceptable for aggregation.
    pub fn ingest(
        &self,
        source_id: &str,
        raw: RawTable,
    ) -> Result<(TableReport, Option<SourceTable>), NormalizerError> {
        let table = self.normalize(raw)?;
        let report = self.validate(&table, source_id);

        if !report.is_acceptable() {
            error!(
                source = source_id,
                missing = ?report.missing_required,
                "table lacks required columns; excluded"
            );
            return Ok((report, None));
        }

        if report.has_warnings() {
            warn!(
                source = source_id,
                missing = ?report.missing_optional,
                "table lacks expected optional columns"
            );
        }
        info!(source = source_id, rows = table.height(), "table loaded");

        Ok((report, Some(SourceTable::new(source_id, table))))
    }
}
