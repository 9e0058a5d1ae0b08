use polars::prelude::*;
use snies_stats::data::{DataLoader, ProgramFilter, SchemaNormalizer, SourceTable};
use snies_stats::stats::enrollment_trends;
use snies_stats::{AggregationMode, Program, ReportExporter, StatisticsAggregator, YearRange};
use std::fs;

fn ingest(source_id: &str, df: DataFrame) -> SourceTable {
    let (report, table) = SchemaNormalizer::default().ingest(source_id, df).unwrap();
    assert!(report.is_acceptable(), "{report:?}");
    table.unwrap()
}

fn inscritos_table(source_id: &str, year: i64, inscritos: i64) -> SourceTable {
    let df = DataFrame::new(vec![
        Column::new("CÓDIGO DE LA INSTITUCIÓN".into(), [1701i64]),
        Column::new("INSTITUCIÓN DE EDUCACIÓN SUPERIOR (IES)".into(), ["Universidad de Caldas"]),
        Column::new("CÓDIGO SNIES DEL PROGRAMA".into(), [1001i64]),
        Column::new("PROGRAMA ACADÉMICO".into(), ["Biología"]),
        Column::new("AÑO".into(), [year]),
        Column::new("SEMESTRE".into(), [1i64]),
        Column::new("INSCRITOS".into(), [inscritos]),
    ])
    .unwrap();
    ingest(source_id, df)
}

#[test]
fn single_table_fills_every_year() {
    let df = DataFrame::new(vec![
        Column::new("CÓDIGO SNIES DEL PROGRAMA".into(), [1001i64]),
        Column::new("PROGRAMA ACADÉMICO".into(), ["Biología"]),
        Column::new("AÑO".into(), [2021i64]),
        Column::new("INSCRITOS".into(), [50i64]),
    ])
    .unwrap();
    let table = SourceTable::new("A", SchemaNormalizer::default().normalize(df).unwrap());

    let mut aggregator = StatisticsAggregator::new(YearRange::new(2020, 2023).unwrap());
    aggregator.set_selected_programs(vec![Program::new("1001", "Biología")]);
    let rows = aggregator.aggregate(&[table]).unwrap();

    assert_eq!(rows.len(), 4);
    for row in rows {
        assert_eq!(row.programa, "Biología");
        assert_eq!(row.inscritos, if row.anio == 2021 { 50 } else { 0 });
        assert_eq!(row.admitidos, 0);
        assert_eq!(row.graduados, 0);
        assert_eq!(row.nuevos_matriculados, 0);
        assert_eq!(row.total_matriculados, 0);
    }
}

#[test]
fn overlapping_tables_stay_separate_per_source() {
    let tables = vec![
        inscritos_table("inscritos_2021_a.xlsx", 2021, 20),
        inscritos_table("inscritos_2021_b.xlsx", 2021, 30),
    ];
    let mut aggregator = StatisticsAggregator::new(YearRange::default());
    aggregator.set_selected_programs(vec![Program::new("1001", "Biología")]);
    let rows = aggregator.aggregate(&tables).unwrap();

    assert_eq!(rows.len(), 8);
    let hits: Vec<i64> = rows
        .iter()
        .filter(|r| r.anio == 2021)
        .map(|r| r.inscritos)
        .collect();
    assert_eq!(hits, vec![20, 30]);

    let trends = enrollment_trends(rows).unwrap();
    assert_eq!(trends.iter().find(|p| p.anio == 2021).unwrap().inscritos, 50);
}

#[test]
fn overlapping_tables_merge_when_requested() {
    let tables = vec![
        inscritos_table("a.xlsx", 2021, 20),
        inscritos_table("b.xlsx", 2021, 30),
    ];
    let mut aggregator =
        StatisticsAggregator::new(YearRange::default()).with_mode(AggregationMode::Merged);
    aggregator.set_selected_programs(vec![Program::new("1001", "Biología")]);
    let rows = aggregator.aggregate(&tables).unwrap();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1].anio, 2021);
    assert_eq!(rows[1].inscritos, 50);
}

#[test]
fn case_mismatched_header_fails_validation() {
    let df = DataFrame::new(vec![
        Column::new("CÓDIGO DE LA INSTITUCIÓN".into(), [1i64]),
        Column::new("INSTITUCIÓN DE EDUCACIÓN SUPERIOR (IES)".into(), ["U"]),
        Column::new("Código SNIES del Programa".into(), [1001i64]),
        Column::new("PROGRAMA ACADÉMICO".into(), ["Biología"]),
        Column::new("AÑO".into(), [2021i64]),
        Column::new("SEMESTRE".into(), [1i64]),
    ])
    .unwrap();
    let (report, table) = SchemaNormalizer::default().ingest("inscritos.xlsx", df).unwrap();

    assert!(table.is_none());
    assert!(!report.is_acceptable());
    assert_eq!(report.missing_required.len(), 1);
    assert_eq!(report.missing_required[0].name(), "codigo_snies");
}

#[test]
fn csv_exports_flow_through_to_reports() {
    let input = tempfile::tempdir().unwrap();
    fs::write(
        input.path().join("inscritos_2021.csv"),
        "CÓDIGO DE LA INSTITUCIÓN,INSTITUCIÓN DE EDUCACIÓN SUPERIOR (IES),CÓDIGO SNIES DEL PROGRAMA,PROGRAMA ACADÉMICO,AÑO,SEMESTRE,INSCRITOS\n\
         1701,Universidad de Caldas,1001,Biología,2021,1,40\n\
         1701,Universidad de Caldas,1001,Biología,2021,2,10\n\
         1701,Universidad de Caldas,2002,Medicina,2021,1,99\n",
    )
    .unwrap();
    fs::write(
        input.path().join("graduados_2022.csv"),
        "CÓDIGO SNIES DEL PROGRAMA,PROGRAMA ACADÉMICO,AÑO\n1001,Biología,2022\n",
    )
    .unwrap();

    let normalizer = SchemaNormalizer::default();
    let mut tables = Vec::new();
    let mut rejected = Vec::new();
    for (source_id, df) in DataLoader::load_dir(input.path()).unwrap() {
        match normalizer.ingest(&source_id, df).unwrap() {
            (_, Some(table)) => tables.push(table),
            (report, None) => rejected.push(report.source_id),
        }
    }
    assert_eq!(rejected, vec!["graduados_2022.csv"]);

    let programs = ProgramFilter::search(&["bio".to_string()], &tables).unwrap();
    assert_eq!(programs.len(), 1);
    assert_eq!(programs[0].code, "1001");

    let mut aggregator = StatisticsAggregator::new(YearRange::default());
    aggregator.set_selected_programs(programs);
    let rows = aggregator.aggregate(&tables).unwrap();
    assert_eq!(rows[1].inscritos, 50);

    let output = tempfile::tempdir().unwrap();
    let written = ReportExporter::write_all(rows, output.path(), "resultados").unwrap();
    assert_eq!(written.len(), 3);
    assert!(written[2].ends_with("resultados.xlsx"));
    let csv = fs::read_to_string(&written[0]).unwrap();
    assert!(csv.contains("Biología,2021,50,0,0,0,0"));
}
