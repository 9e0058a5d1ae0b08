//! Statistics Aggregator Module
//! Per-program, per-year metric sums across any number of normalized tables.

use crate::data::{code_key, CanonicalColumn, Program, SourceTable};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Invalid year range: {min}..={max}")]
    InvalidYearRange { min: i64, max: i64 },
}

/// Widest range `YearRange::new` accepts, counted in years.
pub const MAX_YEAR_SPAN: i64 = 500;

/// Inclusive range of years covered by the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    min: i64,
    max: i64,
}

impl Default for YearRange {
    fn default() -> Self {
        Self { min: 2020, max: 2023 }
    }
}

impl YearRange {
    /// Rejects inverted bounds and ranges wider than `MAX_YEAR_SPAN` years.
    pub fn new(min: i64, max: i64) -> Result<Self, AggregatorError> {
        match max.checked_sub(min) {
            Some(span) if (0..MAX_YEAR_SPAN).contains(&span) => Ok(Self { min, max }),
            _ => Err(AggregatorError::InvalidYearRange { min, max }),
        }
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn contains(&self, year: i64) -> bool {
        (self.min..=self.max).contains(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = i64> {
        self.min..=self.max
    }

    pub fn year_count(&self) -> usize {
        (self.max - self.min + 1) as usize
    }
}

/// Whether rows from different tables are kept apart or summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// One row per (program, table, year).
    #[default]
    PerSource,
    /// One row per (program, year), summed over all tables.
    Merged,
}

/// Aggregated metrics of one program for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsRow {
    pub programa: String,
    pub anio: i64,
    pub inscritos: i64,
    pub admitidos: i64,
    pub nuevos_matriculados: i64,
    pub total_matriculados: i64,
    pub graduados: i64,
}

impl StatisticsRow {
    fn empty(programa: &str, anio: i64) -> Self {
        Self {
            programa: programa.to_string(),
            anio,
            inscritos: 0,
            admitidos: 0,
            nuevos_matriculados: 0,
            total_matriculados: 0,
            graduados: 0,
        }
    }

    fn metric_mut(&mut self, metric: CanonicalColumn) -> Option<&mut i64> {
        match metric {
            CanonicalColumn::Inscritos => Some(&mut self.inscritos),
            CanonicalColumn::Admitidos => Some(&mut self.admitidos),
            CanonicalColumn::NuevosMatriculados => Some(&mut self.nuevos_matriculados),
            CanonicalColumn::TotalMatriculados => Some(&mut self.total_matriculados),
            CanonicalColumn::Graduados => Some(&mut self.graduados),
            _ => None,
        }
    }

    fn add(&mut self, other: &StatisticsRow) {
        self.inscritos += other.inscritos;
        self.admitidos += other.admitidos;
        self.nuevos_matriculados += other.nuevos_matriculados;
        self.total_matriculados += other.total_matriculados;
        self.graduados += other.graduados;
    }
}

/// Output column order.
pub const RESULT_COLUMNS: [&str; 7] = [
    "programa",
    "anio",
    "inscritos",
    "admitidos",
    "nuevos_matriculados",
    "total_matriculados",
    "graduados",
];

/// Build the flat result frame.
pub fn rows_to_dataframe(rows: &[StatisticsRow]) -> PolarsResult<DataFrame> {
    let pick = |f: fn(&StatisticsRow) -> i64| rows.iter().map(f).collect::<Vec<i64>>();
    let programa: Vec<&str> = rows.iter().map(|r| r.programa.as_str()).collect();

    DataFrame::new(vec![
        Column::new(RESULT_COLUMNS[0].into(), programa),
        Column::new(RESULT_COLUMNS[1].into(), pick(|r| r.anio)),
        Column::new(RESULT_COLUMNS[2].into(), pick(|r| r.inscritos)),
        Column::new(RESULT_COLUMNS[3].into(), pick(|r| r.admitidos)),
        Column::new(RESULT_COLUMNS[4].into(), pick(|r| r.nuevos_matriculados)),
        Column::new(RESULT_COLUMNS[5].into(), pick(|r| r.total_matriculados)),
        Column::new(RESULT_COLUMNS[6].into(), pick(|r| r.graduados)),
    ])
}

/// Column values of one table, coerced once and shared by every program.
struct TableView {
    codes: Vec<Option<String>>,
    years: Vec<i64>,
    metrics: Vec<(CanonicalColumn, Vec<f64>)>,
}

impl TableView {
    /// Years that fail to parse become 0; metric cells that fail become 0.
    /// Without a code or year column no row can match.
    fn extract(df: &DataFrame) -> PolarsResult<Self> {
        let code_col = df.column(CanonicalColumn::CodigoSnies.name()).ok();
        let year_col = df.column(CanonicalColumn::Anio.name()).ok();

        let (codes, years) = match (code_col, year_col) {
            (Some(code_col), Some(year_col)) => {
                let codes = code_col
                    .cast(&DataType::String)?
                    .str()?
                    .into_iter()
                    .map(|v| v.map(code_key))
                    .collect();
                let years = year_col
                    .cast(&DataType::Int64)?
                    .i64()?
                    .into_iter()
                    .map(|v| v.unwrap_or(0))
                    .collect();
                (codes, years)
            }
            _ => (Vec::new(), Vec::new()),
        };

        let mut metrics = Vec::new();
        for metric in CanonicalColumn::METRICS {
            if let Ok(column) = df.column(metric.name()) {
                let values = column
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
                    .collect();
                metrics.push((metric, values));
            }
        }

        Ok(Self {
            codes,
            years,
            metrics,
        })
    }

    /// One zero-filled row per year, with the program's rows summed in.
    fn program_rows(&self, program: &Program, range: YearRange) -> Vec<StatisticsRow> {
        let mut sums = vec![[0.0f64; CanonicalColumn::METRICS.len()]; range.year_count()];

        let matching = self
            .codes
            .iter()
            .zip(&self.years)
            .enumerate()
            .filter(|(_, (code, year))| {
                code.as_deref() == Some(program.code.as_str()) && range.contains(**year)
            });

        for (row, (_, year)) in matching {
            let slot = (year - range.min()) as usize;
            for (k, (_, values)) in self.metrics.iter().enumerate() {
                sums[slot][k] += values[row];
            }
        }

        range
            .years()
            .zip(sums)
            .map(|(year, totals)| {
                let mut out = StatisticsRow::empty(&program.name, year);
                for ((metric, _), total) in self.metrics.iter().zip(totals) {
                    if let Some(field) = out.metric_mut(*metric) {
                        *field = total.round() as i64;
                    }
                }
                out
            })
            .collect()
    }
}

/// Computes per-program yearly statistics over a set of normalized tables.
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    range: YearRange,
    mode: AggregationMode,
    programs: Vec<Program>,
    results: Vec<StatisticsRow>,
}

impl StatisticsAggregator {
    pub fn new(range: YearRange) -> Self {
        Self {
            range,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: AggregationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn range(&self) -> YearRange {
        self.range
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// Replace the working set of programs. Duplicates are kept and produce
    /// duplicate output rows.
    pub fn set_selected_programs(&mut self, programs: Vec<Program>) {
        self.programs = programs;
    }

    pub fn selected_programs(&self) -> &[Program] {
        &self.programs
    }

    /// Recompute the statistics, replacing the previous results.
    ///
    /// Rows are ordered by selected program, then by table, then by year.
    /// In [`AggregationMode::Merged`] the table level is summed away.
    pub fn aggregate(&mut self, tables: &[SourceTable]) -> Result<&[StatisticsRow], AggregatorError> {
        let views = tables
            .iter()
            .map(|t| {
                debug!(source = %t.source_id, rows = t.table.height(), "extracting table");
                TableView::extract(t.table.dataframe())
            })
            .collect::<PolarsResult<Vec<_>>>()?;

        let range = self.range;
        let mode = self.mode;

        let per_program: Vec<Vec<StatisticsRow>> = self
            .programs
            .par_iter()
            .map(|program| {
                let per_table = views.iter().map(|view| view.program_rows(program, range));
                match mode {
                    AggregationMode::PerSource => per_table.flatten().collect(),
                    AggregationMode::Merged => {
                        let mut merged: Vec<StatisticsRow> = range
                            .years()
                            .map(|year| StatisticsRow::empty(&program.name, year))
                            .collect();
                        for rows in per_table {
                            for (acc, row) in merged.iter_mut().zip(&rows) {
                                acc.add(row);
                            }
                        }
                        merged
                    }
                }
            })
            .collect();

        self.results = per_program.into_iter().flatten().collect();
        info!(
            programs = self.programs.len(),
            tables = tables.len(),
            rows = self.results.len(),
            "statistics computed"
        );
        Ok(&self.results)
    }

    /// Results of the most recent aggregation.
    pub fn results(&self) -> &[StatisticsRow] {
        &self.results
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        rows_to_dataframe(&self.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SchemaNormalizer;

    fn source(id: &str, columns: Vec<Column>) -> SourceTable {
        let df = DataFrame::new(columns).unwrap();
        SourceTable::new(id, SchemaNormalizer::default().normalize(df).unwrap())
    }

    fn biologia() -> Vec<Program> {
        vec![Program::new("1001", "Biología")]
    }

    #[test]
    fn year_range_rejects_inverted_bounds() {
        assert!(YearRange::new(2023, 2020).is_err());
        let r = YearRange::new(2021, 2021).unwrap();
        assert_eq!(r.year_count(), 1);
        assert_eq!(YearRange::default().years().collect::<Vec<_>>(), vec![2020, 2021, 2022, 2023]);
    }

    #[test]
    fn year_range_rejects_extreme_spans() {
        assert!(YearRange::new(i64::MIN, i64::MAX).is_err());
        assert!(YearRange::new(i64::MIN, 0).is_err());
        assert!(YearRange::new(0, 1_000_000_000).is_err());
        assert!(YearRange::new(2000, 2000 + MAX_YEAR_SPAN).is_err());

        let widest = YearRange::new(2000, 2000 + MAX_YEAR_SPAN - 1).unwrap();
        assert_eq!(widest.year_count(), MAX_YEAR_SPAN as usize);
        let far = YearRange::new(i64::MAX - 1, i64::MAX).unwrap();
        assert_eq!(far.year_count(), 2);
    }

    #[test]
    fn every_year_gets_a_row() {
        let t = source(
            "inscritos.xlsx",
            vec![
                Column::new("CÓDIGO SNIES DEL PROGRAMA".into(), [1001i64]),
                Column::new("AÑO".into(), [2021i64]),
                Column::new("INSCRITOS".into(), [50i64]),
            ],
        );
        let mut agg = StatisticsAggregator::new(YearRange::default());
        agg.set_selected_programs(biologia());
        let rows = agg.aggregate(&[t]).unwrap();

        assert_eq!(rows.len(), 4);
        let inscritos: Vec<i64> = rows.iter().map(|r| r.inscritos).collect();
        assert_eq!(inscritos, vec![0, 50, 0, 0]);
        assert!(rows.iter().all(|r| r.graduados == 0 && r.admitidos == 0));
    }

    #[test]
    fn missing_key_columns_zero_fill() {
        let t = source("x.xlsx", vec![Column::new("INSCRITOS".into(), [7i64])]);
        let mut agg = StatisticsAggregator::new(YearRange::default());
        agg.set_selected_programs(biologia());
        let rows = agg.aggregate(&[t]).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.inscritos == 0));
    }

    #[test]
    fn unparsable_years_become_zero_without_dropping_others() {
        let t = source(
            "graduados.xlsx",
            vec![
                Column::new("CÓDIGO SNIES DEL PROGRAMA".into(), ["1001", "1001", "1001"]),
                Column::new("AÑO".into(), ["2022", "n/a", "2022"]),
                Column::new("GRADUADOS".into(), ["3", "100", "abc"]),
            ],
        );
        let mut agg = StatisticsAggregator::new(YearRange::default());
        agg.set_selected_programs(biologia());
        let rows = agg.aggregate(&[t]).unwrap();
        let graduados: Vec<i64> = rows.iter().map(|r| r.graduados).collect();
        assert_eq!(graduados, vec![0, 0, 3, 0]);
    }

    #[test]
    fn year_zero_is_reachable_when_in_range() {
        let t = source(
            "x.xlsx",
            vec![
                Column::new("CÓDIGO SNIES DEL PROGRAMA".into(), ["1001"]),
                Column::new("AÑO".into(), ["bad"]),
                Column::new("ADMITIDOS".into(), [9i64]),
            ],
        );
        let mut agg = StatisticsAggregator::new(YearRange::new(0, 0).unwrap());
        agg.set_selected_programs(biologia());
        assert_eq!(agg.aggregate(&[t]).unwrap()[0].admitidos, 9);
    }

    #[test]
    fn float_codes_match_integer_codes() {
        let t = source(
            "x.xlsx",
            vec![
                Column::new("CÓDIGO SNIES DEL PROGRAMA".into(), [1001.0f64]),
                Column::new("AÑO".into(), [2020.0f64]),
                Column::new("MATRICULADOS".into(), [12.0f64]),
            ],
        );
        let mut agg = StatisticsAggregator::new(YearRange::default());
        agg.set_selected_programs(biologia());
        let rows = agg.aggregate(&[t]).unwrap();
        assert_eq!(rows[0].total_matriculados, 12);
    }

    #[test]
    fn ordering_is_program_then_table_then_year() {
        let t = |id: &str| {
            source(
                id,
                vec![
                    Column::new("CÓDIGO SNIES DEL PROGRAMA".into(), [1i64, 2]),
                    Column::new("AÑO".into(), [2020i64, 2021]),
                    Column::new("INSCRITOS".into(), [1i64, 2]),
                ],
            )
        };
        let mut agg = StatisticsAggregator::new(YearRange::new(2020, 2021).unwrap());
        agg.set_selected_programs(vec![Program::new("2", "B"), Program::new("1", "A")]);
        let rows = agg.aggregate(&[t("t1"), t("t2")]).unwrap();

        let keys: Vec<(&str, i64, i64)> = rows
            .iter()
            .map(|r| (r.programa.as_str(), r.anio, r.inscritos))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("B", 2020, 0),
                ("B", 2021, 2),
                ("B", 2020, 0),
                ("B", 2021, 2),
                ("A", 2020, 1),
                ("A", 2021, 0),
                ("A", 2020, 1),
                ("A", 2021, 0),
            ]
        );
    }

    #[test]
    fn duplicate_programs_duplicate_rows() {
        let t = source("x", vec![Column::new("AÑO".into(), [2020i64])]);
        let mut agg = StatisticsAggregator::new(YearRange::default());
        agg.set_selected_programs(vec![Program::new("1", "A"), Program::new("1", "A")]);
        assert_eq!(agg.aggregate(&[t]).unwrap().len(), 8);
    }

    #[test]
    fn results_are_replaced_on_each_call() {
        let t = source("x", vec![Column::new("AÑO".into(), [2020i64])]);
        let mut agg = StatisticsAggregator::new(YearRange::default());
        agg.set_selected_programs(biologia());
        agg.aggregate(&[t.clone(), t.clone()]).unwrap();
        assert_eq!(agg.results().len(), 8);
        agg.aggregate(&[t]).unwrap();
        assert_eq!(agg.results().len(), 4);
        agg.set_selected_programs(Vec::new());
        assert!(agg.aggregate(&[]).unwrap().is_empty());
    }

    #[test]
    fn result_frame_has_fixed_columns() {
        let t = source("x", vec![Column::new("AÑO".into(), [2020i64])]);
        let mut agg = StatisticsAggregator::new(YearRange::default());
        agg.set_selected_programs(biologia());
        agg.aggregate(&[t]).unwrap();
        let df = agg.to_dataframe().unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, RESULT_COLUMNS.to_vec());
        assert_eq!(df.height(), 4);
    }
}
