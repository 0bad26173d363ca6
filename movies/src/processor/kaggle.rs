use crate::schema::{ADULT, METADATA_TYPES, VIDEO};
use crate::sources;
use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, StringArray};
use arrow::compute::{CastOptions, cast_with_options, filter_record_batch};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::display::FormatOptions;
use common::{Error, Result};
use datafusion::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Loads the metadata CSV and gives it real types.
pub struct MetadataLoader {
    ctx: SessionContext,
}

impl MetadataLoader {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    pub async fn load(&self, path: &Path) -> Result<DataFrame> {
        let raw = sources::read_text_csv(path)?;
        let total = raw.num_rows();
        let typed = type_metadata(raw)?;
        info!(total, kept = typed.num_rows(), "Metadata: kept non-adult rows");
        Ok(self.ctx.read_batch(typed)?)
    }
}

fn text_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let index = batch
        .schema()
        .index_of(name)
        .map_err(|_| Error::MissingColumn(name.to_string()))?;
    batch
        .column(index)
        .as_string_opt::<i32>()
        .ok_or_else(|| Error::InvalidInput(format!("column '{}' is not text", name)))
}

/// Keep `adult == "False"` rows, drop `adult`, type the known columns.
/// A value that does not fit its type aborts with [`Error::Coercion`].
pub fn type_metadata(batch: RecordBatch) -> Result<RecordBatch> {
    let adult = text_column(&batch, ADULT)?;
    let keep: BooleanArray = adult.iter().map(|v| Some(v == Some("False"))).collect();
    let batch = filter_record_batch(&batch, &keep)?;

    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (field, column) in batch.schema().fields().iter().zip(batch.columns()) {
        let name = field.name().as_str();
        if name == ADULT {
            continue;
        }
        let text = column
            .as_string_opt::<i32>()
            .ok_or_else(|| Error::InvalidInput(format!("column '{}' is not text", name)))?;

        let typed: ArrayRef = if name == VIDEO {
            Arc::new(text.iter().map(|v| Some(v == Some("True"))).collect::<BooleanArray>())
        } else if let Some((_, data_type)) = METADATA_TYPES.iter().find(|(n, _)| *n == name) {
            coerce(name, text, data_type)?
        } else {
            column.clone()
        };

        fields.push(Field::new(name, typed.data_type().clone(), true));
        columns.push(typed);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Strict cast; blank cells become nulls first.
fn coerce(name: &str, text: &StringArray, data_type: &DataType) -> Result<ArrayRef> {
    let trimmed: StringArray = text
        .iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty()))
        .collect();

    let options = CastOptions {
        safe: false,
        format_options: FormatOptions::default(),
    };
    cast_with_options(&trimmed, data_type, &options).map_err(|e| Error::Coercion {
        column: name.to_string(),
        message: e.to_string(),
    })
}
