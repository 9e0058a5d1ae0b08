//! Stats module - per-program yearly aggregation

mod aggregator;
mod trends;

pub use aggregator::{
    rows_to_dataframe, AggregationMode, AggregatorError, StatisticsAggregator, StatisticsRow,
    YearRange, RESULT_COLUMNS,
};
pub use trends::{enrollment_trends, graduates_by_program, TrendPoint};
