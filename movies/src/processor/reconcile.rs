use crate::schema::{
    FALLBACK_PAIRS, IMDB_ID, KAGGLE_SUFFIX, MOVIE_COLUMNS, WIKI_DROPPED_AFTER_JOIN, WIKI_SUFFIX,
};
use arrow::datatypes::{DataType, Date32Type};
use chrono::NaiveDate;
use common::Result;
use common::config::ReconcileConfig;
use datafusion::common::JoinType;
use datafusion::logical_expr::{cast, when};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use std::collections::HashSet;
use tracing::{debug, info, warn};

const RELEASE_DATE: &str = "release_date";

/// Joins the wiki and metadata tables into the movie table.
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub async fn reconcile(&self, wiki: DataFrame, kaggle: DataFrame) -> Result<DataFrame> {
        let joined = join_on_imdb_id(wiki, kaggle)?;
        let filtered = self.drop_anomalies(joined)?;
        let resolved = self.resolve_columns(filtered)?;
        let movies = project_movie_columns(resolved)?;
        info!(columns = movies.schema().fields().len(), "Reconciled movie table");
        Ok(movies)
    }

    /// Wiki release date after one bound and metadata release date before the
    /// other marks a mis-paired record. Rows with either date absent stay.
    fn drop_anomalies(&self, df: DataFrame) -> Result<DataFrame> {
        let columns = column_names(&df);
        let wiki_date = format!("{}{}", RELEASE_DATE, WIKI_SUFFIX);
        let kaggle_date = format!("{}{}", RELEASE_DATE, KAGGLE_SUFFIX);
        let (Some(wiki_date), Some(kaggle_date)) = (
            resolve(&columns, &wiki_date),
            resolve(&columns, &kaggle_date),
        ) else {
            warn!("Release dates missing, anomaly filter skipped");
            return Ok(df);
        };

        let anomaly = ident(wiki_date)
            .gt(date_literal(self.config.anomaly_wiki_after))
            .and(ident(kaggle_date).lt(date_literal(self.config.anomaly_kaggle_before)));
        Ok(df.filter(anomaly.is_not_true())?)
    }

    /// Drops the wiki columns the metadata side supersedes, then fills
    /// sentinel metadata values from their wiki donor and drops the donor.
    fn resolve_columns(&self, df: DataFrame) -> Result<DataFrame> {
        let columns = column_names(&df);
        let mut dropped: HashSet<&str> = WIKI_DROPPED_AFTER_JOIN.into_iter().collect();
        let mut replaced = Vec::new();

        for (target, donor) in FALLBACK_PAIRS {
            let Some(target) = resolve(&columns, target) else {
                continue;
            };
            if !columns.iter().any(|c| c == donor) {
                debug!(column = target, donor, "Fallback donor absent, metadata value kept");
                continue;
            }
            let metadata = cast(ident(target), DataType::Float64);
            let filled = when(
                metadata.clone().eq(lit(self.config.fallback_sentinel)),
                cast(ident(donor), DataType::Float64),
            )
            .otherwise(metadata)?;
            replaced.push((target.to_string(), filled));
            dropped.insert(donor);
        }

        let exprs: Vec<Expr> = columns
            .iter()
            .filter(|c| !dropped.contains(c.as_str()))
            .map(|c| match replaced.iter().find(|(t, _)| t == c) {
                Some((_, filled)) => filled.clone().alias(c.as_str()),
                None => ident(c.as_str()).alias(c.as_str()),
            })
            .collect();

        Ok(df.select(exprs)?)
    }
}

/// Inner join on `imdb_id`; every other shared name gets its source suffix.
fn join_on_imdb_id(wiki: DataFrame, kaggle: DataFrame) -> Result<DataFrame> {
    let wiki_columns = column_names(&wiki);
    let kaggle_columns = column_names(&kaggle);
    let shared: HashSet<&String> = wiki_columns
        .iter()
        .filter(|c| c.as_str() != IMDB_ID && kaggle_columns.contains(c))
        .collect();

    let kaggle_key = format!("{}{}", IMDB_ID, KAGGLE_SUFFIX);
    let suffixed = |columns: &[String], suffix: &str, key: &str| -> Vec<Expr> {
        columns
            .iter()
            .map(|c| {
                let name = if c == IMDB_ID {
                    key.to_string()
                } else if shared.contains(c) {
                    format!("{}{}", c, suffix)
                } else {
                    c.clone()
                };
                ident(c.as_str()).alias(name)
            })
            .collect()
    };

    let wiki = wiki.select(suffixed(&wiki_columns, WIKI_SUFFIX, IMDB_ID))?;
    let kaggle = kaggle.select(suffixed(&kaggle_columns, KAGGLE_SUFFIX, &kaggle_key))?;
    debug!(shared = shared.len(), "Joining wiki and metadata tables");

    let joined = wiki.join(kaggle, JoinType::Inner, &[IMDB_ID], &[kaggle_key.as_str()], None)?;
    let keep: Vec<Expr> = column_names(&joined)
        .iter()
        .filter(|c| **c != kaggle_key)
        .map(|c| ident(c.as_str()).alias(c.as_str()))
        .collect();
    Ok(joined.select(keep)?)
}

/// Fixed output projection; absent sources are skipped.
fn project_movie_columns(df: DataFrame) -> Result<DataFrame> {
    let columns = column_names(&df);
    let mut exprs = Vec::with_capacity(MOVIE_COLUMNS.len());
    for (source, output) in MOVIE_COLUMNS {
        match resolve(&columns, source) {
            Some(name) => exprs.push(ident(name).alias(output)),
            None => warn!(column = source, "Output column missing from joined table"),
        }
    }
    Ok(df.select(exprs)?)
}

/// Exact name, or for a `_kaggle` name the unsuffixed one when nothing collided.
fn resolve<'a>(columns: &'a [String], name: &str) -> Option<&'a str> {
    let exact = columns.iter().find(|c| *c == name);
    let bare = || {
        let stripped = name
            .strip_suffix(KAGGLE_SUFFIX)
            .or_else(|| name.strip_suffix(WIKI_SUFFIX))?;
        columns.iter().find(|c| *c == stripped)
    };
    exact.or_else(bare).map(String::as_str)
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.schema().fields().iter().map(|f| f.name().clone()).collect()
}

fn date_literal(date: NaiveDate) -> Expr {
    lit(ScalarValue::Date32(Some(Date32Type::from_naive_date(date))))
}
