pub mod headers;
pub mod parse;

pub use headers::{WikiRecord, canonicalize_headers, clean_record, fold_alt_titles};

use crate::processor::udf;
use crate::schema::{
    DIRECTOR_HEADERS, EPISODE_COUNT_HEADER, IMDB_ID, IMDB_LINK, WIKI_PARSED_COLUMNS, WikiParse,
    is_parsed_source,
};
use arrow::array::{ArrayRef, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use common::Result;
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

static IMDB_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"tt[0-9]{7}").expect("valid imdb id regex"));

/// A movie has a director, an IMDb link and no episode count.
pub fn keep_record(record: &WikiRecord) -> bool {
    DIRECTOR_HEADERS.iter().any(|h| record.contains_key(*h))
        && record.contains_key(IMDB_LINK)
        && !record.contains_key(EPISODE_COUNT_HEADER)
}

pub fn extract_imdb_id(link: &Value) -> Option<String> {
    let link = link.as_str()?;
    IMDB_ID_PATTERN.find(link).map(|m| m.as_str().to_string())
}

/// A cleaned record plus the identifier pulled from its link.
#[derive(Debug, Clone)]
pub struct WikiRow {
    pub imdb_id: Option<String>,
    pub fields: WikiRecord,
}

/// Keep the first row per identifier. Rows without one share a single
/// "missing" key.
pub fn dedup_by_imdb_id(records: Vec<WikiRecord>) -> Vec<WikiRow> {
    let mut seen: HashSet<Option<String>> = HashSet::new();
    records
        .into_iter()
        .map(|fields| WikiRow {
            imdb_id: fields.get(IMDB_LINK).and_then(extract_imdb_id),
            fields,
        })
        .filter(|row| seen.insert(row.imdb_id.clone()))
        .collect()
}

/// Column names in first-seen order, with `imdb_id` appended last.
pub fn column_order(rows: &[WikiRow]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for row in rows {
        for key in row.fields.keys() {
            if key != IMDB_ID && seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns.push(IMDB_ID.to_string());
    columns
}

fn is_populated(row: &WikiRow, column: &str) -> bool {
    if column == IMDB_ID {
        return row.imdb_id.is_some();
    }
    row.fields.get(column).is_some_and(|v| !v.is_null())
}

/// Drop columns whose non-null count is below `min_coverage` of the rows.
pub fn prune_sparse_columns(
    columns: Vec<String>,
    rows: &[WikiRow],
    min_coverage: f64,
) -> Vec<String> {
    let min_count = min_coverage * rows.len() as f64;
    columns
        .into_iter()
        .filter(|column| {
            let count = rows.iter().filter(|row| is_populated(row, column)).count();
            let keep = count as f64 >= min_count;
            if !keep {
                debug!(column = %column, count, "Dropping sparse wiki column");
            }
            keep
        })
        .collect()
}

fn cell_text(column: &str, value: &Value) -> Option<String> {
    if is_parsed_source(column) {
        return parse::joined_text(value);
    }
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// All kept columns as text. Parse sources hold the joined text the parsers
/// expect; other non-string values are kept as JSON.
fn rows_to_batch(columns: &[String], rows: &[WikiRow]) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());

    for column in columns {
        let mut builder = StringBuilder::new();
        for row in rows {
            let text = if column == IMDB_ID {
                row.imdb_id.clone()
            } else {
                row.fields.get(column).and_then(|v| cell_text(column, v))
            };
            builder.append_option(text);
        }
        fields.push(Field::new(column, DataType::Utf8, true));
        arrays.push(Arc::new(builder.finish()));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

pub struct WikiNormalizer {
    ctx: SessionContext,
    min_column_coverage: f64,
}

impl WikiNormalizer {
    pub fn new(ctx: SessionContext, min_column_coverage: f64) -> Self {
        Self {
            ctx,
            min_column_coverage,
        }
    }

    /// Raw records to the normalized wiki table.
    pub async fn normalize(&self, raw: Vec<WikiRecord>) -> Result<DataFrame> {
        let total = raw.len();
        let cleaned: Vec<WikiRecord> = raw
            .iter()
            .filter(|record| keep_record(record))
            .map(clean_record)
            .collect();
        let kept = cleaned.len();

        let rows = dedup_by_imdb_id(cleaned);
        let columns = prune_sparse_columns(column_order(&rows), &rows, self.min_column_coverage);

        info!(
            total,
            kept,
            unique = rows.len(),
            columns = columns.len(),
            "Wiki: filtered and deduplicated records"
        );

        let batch = rows_to_batch(&columns, &rows)?;
        let df = self.ctx.read_batch(batch)?;
        self.parse_columns(df, &columns)
    }

    /// Swap each free-text source column for its parsed column.
    fn parse_columns(&self, df: DataFrame, columns: &[String]) -> Result<DataFrame> {
        let mut select_exprs: Vec<Expr> = columns
            .iter()
            .filter(|c| !is_parsed_source(c))
            .map(|c| ident(c.as_str()).alias(c.as_str()))
            .collect();

        for (source, target, kind) in WIKI_PARSED_COLUMNS {
            let expr = if columns.iter().any(|c| c == source) {
                let parser = df.registry().udf(udf_name(kind))?;
                parser.call(vec![ident(source)])
            } else {
                lit(absent_value(kind))
            };
            select_exprs.push(expr.alias(target));
        }

        Ok(df.select(select_exprs)?)
    }
}

fn udf_name(kind: WikiParse) -> &'static str {
    match kind {
        WikiParse::Currency => udf::PARSE_CURRENCY,
        WikiParse::Budget => udf::PARSE_BUDGET,
        WikiParse::ReleaseDate => udf::PARSE_RELEASE_DATE,
        WikiParse::RunningTime => udf::PARSE_RUNNING_TIME,
    }
}

fn absent_value(kind: WikiParse) -> ScalarValue {
    match kind {
        WikiParse::ReleaseDate => ScalarValue::Date32(None),
        _ => ScalarValue::Float64(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::new_session_context;
    use arrow::array::{Array, AsArray};
    use arrow::compute::concat_batches;
    use arrow::datatypes::{Date32Type, Float64Type};
    use chrono::NaiveDate;
    use serde_json::json;

    fn records(value: Value) -> Vec<WikiRecord> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    async fn collect(df: DataFrame) -> RecordBatch {
        let schema = Arc::new(df.schema().as_arrow().clone());
        let batches = df.collect().await.unwrap();
        concat_batches(&schema, &batches).unwrap()
    }

    fn movie(i: usize) -> Value {
        json!({
            "title": format!("Movie {}", i),
            "Director": "Someone",
            "imdb_link": format!("https://www.imdb.com/title/tt{:07}/", i),
        })
    }

    #[test]
    fn test_filter_rules() {
        let rows = records(json!([
            {"title": "No director", "imdb_link": "https://www.imdb.com/title/tt0000001/"},
            {"title": "Series", "Directed by": "X", "imdb_link": "https://www.imdb.com/title/tt0000002/", "No. of episodes": 10},
            {"title": "No link", "Director": "X"},
            {"title": "Ok", "Directed by": "X", "imdb_link": "https://www.imdb.com/title/tt0000003/"},
        ]));
        let kept: Vec<bool> = rows.iter().map(keep_record).collect();
        assert_eq!(kept, vec![false, false, false, true]);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let rows = records(json!([
            {"title": "A", "imdb_link": "https://www.imdb.com/title/tt1234567/"},
            {"title": "B", "imdb_link": "https://www.imdb.com/title/tt1234567/?ref=x"},
            {"title": "C", "imdb_link": "no id here"},
            {"title": "D", "imdb_link": "still none"},
        ]));
        let deduped = dedup_by_imdb_id(rows);
        let titles: Vec<&str> = deduped
            .iter()
            .map(|r| r.fields["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["A", "C"]);
        assert_eq!(deduped[0].imdb_id.as_deref(), Some("tt1234567"));
        assert_eq!(deduped[1].imdb_id, None);
    }

    #[test]
    fn test_sparse_column_pruning_threshold() {
        let mut raw = Vec::new();
        for i in 0..20 {
            let mut m = movie(i).as_object().cloned().unwrap();
            if i < 1 {
                m.insert("Rare".to_string(), json!("5%"));
            }
            if i < 3 {
                m.insert("Uncommon".to_string(), json!("15%"));
            }
            raw.push(m);
        }
        let rows = dedup_by_imdb_id(raw);
        let columns = prune_sparse_columns(column_order(&rows), &rows, 0.1);
        assert!(!columns.contains(&"Rare".to_string()));
        assert!(columns.contains(&"Uncommon".to_string()));
        assert_eq!(columns.last().map(String::as_str), Some(IMDB_ID));
    }

    #[tokio::test]
    async fn test_normalize_end_to_end() {
        let ctx = new_session_context().unwrap();
        let normalizer = WikiNormalizer::new(ctx, 0.1);
        let raw = records(json!([
            {"title": "No director", "imdb_link": "https://www.imdb.com/title/tt0000001/"},
            {"title": "A series", "Director": "X", "imdb_link": "https://www.imdb.com/title/tt0000002/", "No. of episodes": 22},
            {
                "title": "Valid",
                "Directed by": "Y",
                "imdb_link": "https://www.imdb.com/title/tt0000003/",
                "Box office": "$200 million",
                "Budget": ["$50 million", "[2]"],
                "Release date": "January 1, 2010",
                "Running time": "1 hour 30 minutes",
                "Japanese": "ヴァリッド"
            }
        ]));

        let batch = collect(normalizer.normalize(raw).await.unwrap()).await;
        assert_eq!(batch.num_rows(), 1);

        let schema = batch.schema();
        let column = |name: &str| batch.column(schema.index_of(name).unwrap()).clone();

        assert_eq!(column("box_office").as_primitive::<Float64Type>().value(0), 200_000_000.0);
        assert_eq!(column("budget").as_primitive::<Float64Type>().value(0), 50_000_000.0);
        assert_eq!(column("running_time").as_primitive::<Float64Type>().value(0), 90.0);
        assert_eq!(
            column("release_date").as_primitive::<Date32Type>().value_as_date(0),
            NaiveDate::from_ymd_opt(2010, 1, 1)
        );
        assert_eq!(column("imdb_id").as_string::<i32>().value(0), "tt0000003");
        assert_eq!(column("Director").as_string::<i32>().value(0), "Y");
        assert_eq!(
            column("alt_titles").as_string::<i32>().value(0),
            r#"{"Japanese":"ヴァリッド"}"#
        );
        for raw_name in ["Box office", "Budget", "Release date", "Running time", "Directed by"] {
            assert!(schema.index_of(raw_name).is_err(), "{} should be gone", raw_name);
        }
    }

    #[tokio::test]
    async fn test_missing_parse_source_yields_absent_column() {
        let ctx = new_session_context().unwrap();
        let normalizer = WikiNormalizer::new(ctx, 0.1);
        let raw = records(json!([movie(1), movie(2)]));

        let batch = collect(normalizer.normalize(raw).await.unwrap()).await;
        let schema = batch.schema();
        let box_office = batch.column(schema.index_of("box_office").unwrap());
        assert_eq!(box_office.null_count(), 2);
        assert_eq!(schema.field_with_name("release_date").unwrap().data_type(), &DataType::Date32);
    }
}
