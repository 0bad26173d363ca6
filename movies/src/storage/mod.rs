pub mod memory;
pub mod postgres;

pub use memory::MemorySink;
pub use postgres::PostgresSink;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use common::Result;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Drop whatever is there and recreate the table.
    Replace,
    Append,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Replace => write!(f, "replace"),
            WriteMode::Append => write!(f, "append"),
        }
    }
}

/// Destination for finished tables.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Writes `batches` into `table` and returns the number of rows written.
    async fn write_table(
        &self,
        table: &str,
        schema: SchemaRef,
        batches: &[RecordBatch],
        mode: WriteMode,
    ) -> Result<u64>;
}
