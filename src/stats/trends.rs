//! Trend Series Module
//! Reduces aggregated rows to the series a chart collaborator plots.

use super::aggregator::{rows_to_dataframe, StatisticsRow};
use polars::prelude::*;
use serde::Serialize;

/// Total new applicants of one program in one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub programa: String,
    pub anio: i64,
    pub inscritos: i64,
}

/// Sum `inscritos` per (program, year), sorted by program then year.
/// Per-source rows of the same program and year collapse into one point.
pub fn enrollment_trends(rows: &[StatisticsRow]) -> PolarsResult<Vec<TrendPoint>> {
    let grouped = rows_to_dataframe(rows)?
        .lazy()
        .group_by([col("programa"), col("anio")])
        .agg([col("inscritos").sum()])
        .sort(["programa", "anio"], SortMultipleOptions::default())
        .collect()?;

    let programa = grouped.column("programa")?.str()?;
    let anio = grouped.column("anio")?.i64()?;
    let inscritos = grouped.column("inscritos")?.i64()?;

    Ok(programa
        .into_iter()
        .zip(anio)
        .zip(inscritos)
        .filter_map(|((p, a), i)| {
            Some(TrendPoint {
                programa: p?.to_string(),
                anio: a?,
                inscritos: i.unwrap_or(0),
            })
        })
        .collect())
}

/// Total graduates per program over the whole range, sorted by program.
pub fn graduates_by_program(rows: &[StatisticsRow]) -> PolarsResult<Vec<(String, i64)>> {
    let grouped = rows_to_dataframe(rows)?
        .lazy()
        .group_by([col("programa")])
        .agg([col("graduados").sum()])
        .sort(["programa"], SortMultipleOptions::default())
        .collect()?;

    let programa = grouped.column("programa")?.str()?;
    let graduados = grouped.column("graduados")?.i64()?;

    Ok(programa
        .into_iter()
        .zip(graduados)
        .filter_map(|(p, g)| Some((p?.to_string(), g.unwrap_or(0))))
        .collect())
}
