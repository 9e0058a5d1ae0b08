//! SNIES Stats - command line driver
//!
//! Loads every export in a directory, reconciles the headers, searches
//! programs by keyword and writes the yearly statistics.

use anyhow::{bail, Context, Result};
use clap::Parser;
use snies_stats::data::{parse_keywords, DataLoader, ProgramFilter, SchemaNormalizer};
use snies_stats::logging::{init_logging, log_failure};
use snies_stats::stats::enrollment_trends;
use snies_stats::{AggregationMode, AnalysisConfig, ReportExporter, StatisticsAggregator, SynonymMatching};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "snies-stats", about = "Per-program enrollment statistics from SNIES exports")]
struct Args {
    /// Directory holding the .xlsx/.csv exports
    #[arg(short, long)]
    input: PathBuf,

    /// Comma separated keywords matched against program names
    #[arg(short, long)]
    keywords: String,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    year_min: Option<i64>,

    #[arg(long)]
    year_max: Option<i64>,

    /// Sum rows of the same program and year across files
    #[arg(long)]
    merge: bool,

    /// Match header synonyms regardless of case
    #[arg(long)]
    case_insensitive: bool,

    /// Directory for the CSV, JSON and Excel reports
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(AnalysisConfig, PathBuf, String)> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(min) = self.year_min {
            config.year_min = min;
        }
        if let Some(max) = self.year_max {
            config.year_max = max;
        }
        if self.merge {
            config.mode = AggregationMode::Merged;
        }
        if self.case_insensitive {
            config.synonym_matching = SynonymMatching::CaseInsensitive;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        Ok((config, self.input, self.keywords))
    }
}

fn main() -> Result<()> {
    init_logging();
    let (config, input, keywords) = Args::parse().into_config()?;
    log_failure("run", || run(&config, input, &keywords))
}

fn run(config: &AnalysisConfig, input: PathBuf, keywords: &str) -> Result<()> {
    let range = config.year_range()?;
    let keywords = parse_keywords(keywords);
    if keywords.is_empty() {
        bail!("no usable keywords given");
    }

    let raw = DataLoader::load_dir(&input)
        .with_context(|| format!("reading {}", input.display()))?;
    let normalizer = SchemaNormalizer::new(config.synonym_matching);

    let mut tables = Vec::with_capacity(raw.len());
    let mut rejected = 0;
    for (source_id, df) in raw {
        let (_, table) = normalizer.ingest(&source_id, df)?;
        match table {
            Some(table) => tables.push(table),
            None => rejected += 1,
        }
    }
    info!(accepted = tables.len(), rejected, "tables ready");
    if tables.is_empty() {
        bail!("no usable tables in {}", input.display());
    }

    let programs = ProgramFilter::search(&keywords, &tables)?;
    if programs.is_empty() {
        warn!(?keywords, "no programs matched");
        return Ok(());
    }
    for program in &programs {
        info!(code = %program.code, name = %program.name, "program selected");
    }

    let mut aggregator = StatisticsAggregator::new(range).with_mode(config.mode);
    aggregator.set_selected_programs(programs);
    aggregator.aggregate(&tables)?;

    println!("{}", aggregator.to_dataframe()?);
    for point in enrollment_trends(aggregator.results())? {
        info!(programa = %point.programa, anio = point.anio, inscritos = point.inscritos, "trend");
    }

    let written = ReportExporter::write_all(aggregator.results(), &config.output_dir, "resultados")?;
    for path in written {
        info!(path = %path.display(), "saved");
    }
    Ok(())
}
