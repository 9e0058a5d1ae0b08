//! Data module - spreadsheet loading, schema normalization and program search

mod filter;
mod loader;
mod normalizer;
mod schema;

pub use filter::{code_key, is_valid_keyword, parse_keywords, FilterError, Program, ProgramFilter};
pub use loader::{DataLoader, LoaderError};
pub use normalizer::{
    normalize_header, normalize_headers, NormalizedTable, NormalizerError, RawTable,
    SchemaNormalizer, SourceTable, SynonymMatching, TableReport,
};
pub use schema::{expected_metrics, synonym_entries, CanonicalColumn, DESCRIPTIVE_SYNONYMS};
