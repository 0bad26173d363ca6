use super::{TableSink, WriteMode};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use common::Result;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct StoredTable {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

/// Keeps written tables in memory; used for dry runs and tests.
#[derive(Default)]
pub struct MemorySink {
    tables: Mutex<HashMap<String, StoredTable>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<String, StoredTable>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn batches(&self, table: &str) -> Vec<RecordBatch> {
        self.tables()
            .get(table)
            .map(|t| t.batches.clone())
            .unwrap_or_default()
    }

    pub fn schema(&self, table: &str) -> Option<SchemaRef> {
        self.tables().get(table).map(|t| t.schema.clone())
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables()
            .get(table)
            .map(|t| t.batches.iter().map(RecordBatch::num_rows).sum())
            .unwrap_or(0)
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl TableSink for MemorySink {
    async fn write_table(
        &self,
        table: &str,
        schema: SchemaRef,
        batches: &[RecordBatch],
        mode: WriteMode,
    ) -> Result<u64> {
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        let mut tables = self.tables();
        match mode {
            WriteMode::Replace => {
                tables.insert(
                    table.to_string(),
                    StoredTable {
                        schema,
                        batches: batches.to_vec(),
                    },
                );
            }
            WriteMode::Append => {
                tables
                    .entry(table.to_string())
                    .or_insert_with(|| StoredTable {
                        schema,
                        batches: Vec::new(),
                    })
                    .batches
                    .extend_from_slice(batches);
            }
        }
        Ok(rows as u64)
    }
}
