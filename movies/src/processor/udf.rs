use super::wiki::parse;
use common::Result;
use datafusion::arrow::array::{ArrayRef, AsArray, Date32Array, Float64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, Date32Type};
use datafusion::common::DataFusionError;
use datafusion::execution::context::SessionContext;
use datafusion::logical_expr::ColumnarValue;
use datafusion::logical_expr::{Volatility, create_udf};
use std::sync::Arc;

pub const PARSE_CURRENCY: &str = "parse_currency";
pub const PARSE_BUDGET: &str = "parse_budget";
pub const PARSE_RELEASE_DATE: &str = "parse_release_date";
pub const PARSE_RUNNING_TIME: &str = "parse_running_time";

/// Registers the wiki field parsers with the SessionContext
pub fn register_udfs(ctx: &SessionContext) -> Result<()> {
    let parse_currency = create_udf(
        PARSE_CURRENCY,
        vec![DataType::Utf8],
        DataType::Float64,
        Volatility::Immutable,
        Arc::new(|args: &[ColumnarValue]| currency_column(args, parse::parse_currency).map_err(|e| DataFusionError::Internal(e.to_string()))),
    );

    let parse_budget = create_udf(
        PARSE_BUDGET,
        vec![DataType::Utf8],
        DataType::Float64,
        Volatility::Immutable,
        Arc::new(|args: &[ColumnarValue]| currency_column(args, parse::parse_budget).map_err(|e| DataFusionError::Internal(e.to_string()))),
    );

    let parse_release_date = create_udf(
        PARSE_RELEASE_DATE,
        vec![DataType::Utf8],
        DataType::Date32,
        Volatility::Immutable,
        Arc::new(|args: &[ColumnarValue]| release_date_column(args).map_err(|e| DataFusionError::Internal(e.to_string()))),
    );

    let parse_running_time = create_udf(
        PARSE_RUNNING_TIME,
        vec![DataType::Utf8],
        DataType::Float64,
        Volatility::Immutable,
        Arc::new(|args: &[ColumnarValue]| running_time_column(args).map_err(|e| DataFusionError::Internal(e.to_string()))),
    );

    ctx.register_udf(parse_currency);
    ctx.register_udf(parse_budget);
    ctx.register_udf(parse_release_date);
    ctx.register_udf(parse_running_time);

    Ok(())
}

fn string_arg(args: &[ColumnarValue]) -> Result<&StringArray> {
    match args.first() {
        Some(ColumnarValue::Array(array)) => array.as_string_opt::<i32>().ok_or_else(|| {
            DataFusionError::Internal(format!("Expected string array, got {}", array.data_type())).into()
        }),
        Some(ColumnarValue::Scalar(_)) => {
            Err(DataFusionError::Internal("Scalar inputs not supported".to_string()).into())
        }
        None => Err(DataFusionError::Internal("Missing argument".to_string()).into()),
    }
}

fn currency_column(args: &[ColumnarValue], parser: fn(&str) -> Option<f64>) -> Result<ColumnarValue> {
    let result: Float64Array = string_arg(args)?
        .iter()
        .map(|text| text.and_then(parser))
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result) as ArrayRef))
}

fn release_date_column(args: &[ColumnarValue]) -> Result<ColumnarValue> {
    let result: Date32Array = string_arg(args)?
        .iter()
        .map(|text| text.and_then(parse::parse_release_date).map(Date32Type::from_naive_date))
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}

/// Absent text stays absent; present text always yields minutes.
fn running_time_column(args: &[ColumnarValue]) -> Result<ColumnarValue> {
    let result: Float64Array = string_arg(args)?
        .iter()
        .map(|text| text.map(parse::parse_running_time))
        .collect();

    Ok(ColumnarValue::Array(Arc::new(result)))
}
