use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type,
    TimeUnit, TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt8Type, UInt16Type, UInt32Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{NaiveDate, NaiveDateTime};
use common::Result;

/// One cell ready to be bound into a SQL statement. Nulls keep the column's
/// type so the bind parameter stays typed.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Float(Option<f64>),
    Int(Option<i64>),
    Bool(Option<bool>),
    Date(Option<NaiveDate>),
    Timestamp(Option<NaiveDateTime>),
}

/// Postgres column type for an Arrow type.
pub fn sql_type(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Float32 | DataType::Float64 => "DOUBLE PRECISION",
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => "BIGINT",
        DataType::Boolean => "BOOLEAN",
        DataType::Date32 => "DATE",
        DataType::Timestamp(_, _) => "TIMESTAMP",
        _ => "TEXT",
    }
}

pub fn batch_rows(batch: &RecordBatch) -> Result<Vec<Vec<SqlValue>>> {
    let mut rows = Vec::with_capacity(batch.num_rows());
    for row_idx in 0..batch.num_rows() {
        let row = batch
            .columns()
            .iter()
            .map(|column| sql_value(column.as_ref(), row_idx))
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn sql_value(array: &dyn Array, index: usize) -> Result<SqlValue> {
    let valid = array.is_valid(index);

    Ok(match array.data_type() {
        DataType::Utf8 => {
            SqlValue::Text(valid.then(|| array.as_string::<i32>().value(index).to_string()))
        }
        DataType::Float64 => {
            SqlValue::Float(valid.then(|| array.as_primitive::<Float64Type>().value(index)))
        }
        DataType::Float32 => SqlValue::Float(
            valid.then(|| array.as_primitive::<Float32Type>().value(index) as f64),
        ),
        DataType::Int64 => {
            SqlValue::Int(valid.then(|| array.as_primitive::<Int64Type>().value(index)))
        }
        DataType::Int32 => SqlValue::Int(
            valid.then(|| array.as_primitive::<Int32Type>().value(index) as i64),
        ),
        DataType::Int16 => SqlValue::Int(
            valid.then(|| array.as_primitive::<Int16Type>().value(index) as i64),
        ),
        DataType::Int8 => {
            SqlValue::Int(valid.then(|| array.as_primitive::<Int8Type>().value(index) as i64))
        }
        DataType::UInt32 => SqlValue::Int(
            valid.then(|| array.as_primitive::<UInt32Type>().value(index) as i64),
        ),
        DataType::UInt16 => SqlValue::Int(
            valid.then(|| array.as_primitive::<UInt16Type>().value(index) as i64),
        ),
        DataType::UInt8 => SqlValue::Int(
            valid.then(|| array.as_primitive::<UInt8Type>().value(index) as i64),
        ),
        DataType::Boolean => SqlValue::Bool(valid.then(|| array.as_boolean().value(index))),
        DataType::Date32 => SqlValue::Date(if valid {
            array.as_primitive::<Date32Type>().value_as_date(index)
        } else {
            None
        }),
        DataType::Timestamp(unit, _) => SqlValue::Timestamp(if valid {
            match unit {
                TimeUnit::Second => array
                    .as_primitive::<TimestampSecondType>()
                    .value_as_datetime(index),
                TimeUnit::Millisecond => array
                    .as_primitive::<TimestampMillisecondType>()
                    .value_as_datetime(index),
                TimeUnit::Microsecond => array
                    .as_primitive::<TimestampMicrosecondType>()
                    .value_as_datetime(index),
                TimeUnit::Nanosecond => array
                    .as_primitive::<TimestampNanosecondType>()
                    .value_as_datetime(index),
            }
        } else {
            None
        }),
        _ => {
            if !valid {
                return Ok(SqlValue::Text(None));
            }
            let formatter = ArrayFormatter::try_new(array, &FormatOptions::default())?;
            SqlValue::Text(Some(formatter.value(index).to_string()))
        }
    })
}
