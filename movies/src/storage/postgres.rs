use super::{TableSink, WriteMode};
use crate::utils::arrow::{SqlValue, batch_rows, sql_type};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use common::Result;
use common::config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

/// Postgres caps a statement at this many bind parameters.
const BIND_LIMIT: usize = 65_535;

pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&config.connection_string()?)
            .await?;
        info!(host = %config.host, database = %config.name, "Connected to Postgres");
        Ok(Self { pool })
    }
}

#[async_trait]
impl TableSink for PostgresSink {
    async fn write_table(
        &self,
        table: &str,
        schema: SchemaRef,
        batches: &[RecordBatch],
        mode: WriteMode,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        if mode == WriteMode::Replace {
            let drop_sql = format!("DROP TABLE IF EXISTS {}", quote_ident(table));
            sqlx::query(&drop_sql).execute(&mut *tx).await?;
        }
        let create = create_table_sql(table, &schema);
        sqlx::query(&create).execute(&mut *tx).await?;

        let insert = insert_prefix(table, &schema);
        let rows_per_statement = (BIND_LIMIT / schema.fields().len().max(1)).max(1);
        let mut written = 0u64;

        for batch in batches {
            let rows = batch_rows(batch)?;
            for chunk in rows.chunks(rows_per_statement) {
                let mut builder = QueryBuilder::<Postgres>::new(&insert);
                builder.push_values(chunk, |mut values, row| {
                    for value in row {
                        push_value(&mut values, value);
                    }
                });
                builder.build().execute(&mut *tx).await?;
                written += chunk.len() as u64;
            }
        }

        tx.commit().await?;
        debug!(table, %mode, rows = written, "Table written");
        Ok(written)
    }
}

fn push_value(values: &mut Separated<'_, '_, Postgres, &'static str>, value: &SqlValue) {
    match value {
        SqlValue::Text(v) => values.push_bind(v.clone()),
        SqlValue::Float(v) => values.push_bind(*v),
        SqlValue::Int(v) => values.push_bind(*v),
        SqlValue::Bool(v) => values.push_bind(*v),
        SqlValue::Date(v) => values.push_bind(*v),
        SqlValue::Timestamp(v) => values.push_bind(*v),
    };
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS`; a replace has already dropped the table.
fn create_table_sql(table: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| format!("{} {}", quote_ident(f.name()), sql_type(f.data_type())))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        columns.join(", ")
    )
}

fn insert_prefix(table: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema.fields().iter().map(|f| quote_ident(f.name())).collect();
    format!("INSERT INTO {} ({}) ", quote_ident(table), columns.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field};

    #[test]
    fn test_create_table_sql() {
        let schema = Schema::new(vec![
            Field::new("kaggle_id", DataType::Int64, true),
            Field::new("rating_5.0", DataType::Int64, true),
            Field::new("release_date", DataType::Date32, true),
            Field::new("genres", DataType::Utf8, true),
        ]);
        assert_eq!(
            create_table_sql("movies", &schema),
            "CREATE TABLE IF NOT EXISTS \"movies\" (\"kaggle_id\" BIGINT, \"rating_5.0\" BIGINT, \
             \"release_date\" DATE, \"genres\" TEXT)"
        );
    }

    #[test]
    fn test_insert_prefix_quotes_columns() {
        let schema = Schema::new(vec![
            Field::new("Writer(s)", DataType::Utf8, true),
            Field::new("odd\"name", DataType::Utf8, true),
        ]);
        assert_eq!(
            insert_prefix("movies", &schema),
            "INSERT INTO \"movies\" (\"Writer(s)\", \"odd\"\"name\") "
        );
    }
}
