use crate::schema::{
    MOVIE_ID, RATING, RATING_MOVIE_ID, RATING_PREFIX, RATING_TIMESTAMP, RATING_USER_ID,
};
use crate::sources;
use crate::storage::{TableSink, WriteMode};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float64Type, TimeUnit};
use common::Result;
use common::config::RatingsConfig;
use datafusion::common::JoinType;
use datafusion::functions_aggregate::expr_fn::{count, sum};
use datafusion::logical_expr::{cast, when};
use datafusion::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

const PAIR_COUNT: &str = "pair_count";

/// Histogram column for one rating value: `rating_5.0`, `rating_0.5`.
pub fn rating_column_name(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}{:.1}", RATING_PREFIX, value)
    } else {
        format!("{}{}", RATING_PREFIX, value)
    }
}

pub struct RatingAggregator {
    ctx: SessionContext,
}

impl RatingAggregator {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// The ratings log with `timestamp` as a real timestamp.
    pub async fn load(&self, path: &Path) -> Result<DataFrame> {
        let batches = sources::read_ratings(path)?;
        let df = self.ctx.read_batches(batches)?;
        Ok(df.select(vec![
            col(RATING_USER_ID),
            col(RATING_MOVIE_ID),
            col(RATING),
            cast(
                col(RATING_TIMESTAMP),
                DataType::Timestamp(TimeUnit::Second, None),
            )
            .alias(RATING_TIMESTAMP),
        ])?)
    }

    /// One row per movie, one count column per distinct rating value in
    /// ascending order. A movie never rated at a value has no count there.
    pub async fn pivot(&self, ratings: DataFrame) -> Result<DataFrame> {
        let values = distinct_ratings(ratings.clone()).await?;

        let counts = ratings.aggregate(
            vec![col(RATING_MOVIE_ID), col(RATING)],
            vec![count(col(RATING_USER_ID)).alias(PAIR_COUNT)],
        )?;

        let mut columns = Vec::with_capacity(values.len());
        for value in &values {
            let at_value = when(col(RATING).eq(lit(*value)), col(PAIR_COUNT)).end()?;
            columns.push(sum(at_value).alias(rating_column_name(*value)));
        }

        let histogram = counts
            .aggregate(vec![col(RATING_MOVIE_ID)], columns)?
            .sort(vec![col(RATING_MOVIE_ID).sort(true, false)])?;
        info!(rating_values = values.len(), "Pivoted ratings");
        Ok(histogram)
    }

    /// Left-joins the histogram onto the movie table by `kaggle_id`.
    pub fn merge(&self, movies: DataFrame, histogram: DataFrame) -> Result<DataFrame> {
        let joined = movies.join(
            histogram,
            JoinType::Left,
            &[MOVIE_ID],
            &[RATING_MOVIE_ID],
            None,
        )?;
        let keep: Vec<Expr> = joined
            .schema()
            .fields()
            .iter()
            .filter(|f| f.name() != RATING_MOVIE_ID)
            .map(|f| ident(f.name()).alias(f.name()))
            .collect();
        Ok(joined.select(keep)?)
    }
}

async fn distinct_ratings(ratings: DataFrame) -> Result<Vec<f64>> {
    let batches = ratings.select(vec![col(RATING)])?.distinct()?.collect().await?;
    let mut values: Vec<f64> = batches
        .iter()
        .flat_map(|b| {
            let column = b.column(0).as_primitive::<Float64Type>();
            (0..column.len())
                .filter(|i| column.is_valid(*i))
                .map(|i| column.value(i))
                .collect::<Vec<_>>()
        })
        .collect();
    values.sort_by(f64::total_cmp);
    Ok(values)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub chunks: usize,
    pub rows_read: u64,
    pub rows_written: u64,
    pub rows_skipped: u64,
}

/// Re-reads the ratings file in fixed-size chunks and writes them to `table`.
/// The first chunk replaces the table. Later chunks append while the rows
/// read before them stay within `append_row_cap`, unless
/// `append_all_chunks` is set; the rest are skipped.
pub async fn export_ratings(
    path: &Path,
    sink: &dyn TableSink,
    table: &str,
    config: &RatingsConfig,
) -> Result<ExportReport> {
    let started = Instant::now();
    let mut report = ExportReport::default();

    for chunk in sources::ratings_chunks(path, config.chunk_size)? {
        let chunk = chunk?;
        let rows = chunk.num_rows() as u64;
        let start = report.rows_read;
        report.chunks += 1;
        report.rows_read += rows;

        let mode = if start == 0 {
            Some(WriteMode::Replace)
        } else if config.append_all_chunks || start <= config.append_row_cap {
            Some(WriteMode::Append)
        } else {
            None
        };

        match mode {
            Some(mode) => {
                report.rows_written += sink
                    .write_table(table, chunk.schema(), &[chunk], mode)
                    .await?;
                info!(
                    from = start,
                    to = start + rows,
                    %mode,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Imported ratings rows"
                );
            }
            None => {
                report.rows_skipped += rows;
                warn!(
                    from = start,
                    to = start + rows,
                    cap = config.append_row_cap,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Skipped ratings rows beyond the append cap"
                );
            }
        }
    }

    info!(
        chunks = report.chunks,
        written = report.rows_written,
        skipped = report.rows_skipped,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Ratings export finished"
    );
    Ok(report)
}
