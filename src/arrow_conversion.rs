//! Conversion of decoded rows into Arrow record batches.
//!
//! The schema follows the canonical column types:
//!
//! | canonical | Arrow |
//! |---|---|
//! | text, binary-as-text | `Utf8` |
//! | integer | `Int64` |
//! | float | `Float64` |
//! | boolean | `Boolean` |
//! | date | `Date32` |
//! | datetime | `Timestamp(Microsecond, "UTC")` |
//! | time | `Time64(Microsecond)` |
//!
//! Every field is nullable.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, Float64Builder, Int64Builder, RecordBatch,
    RecordBatchOptions, StringBuilder, Time64MicrosecondBuilder, TimestampMicrosecondBuilder,
};
use arrow::datatypes::{Field, Schema, SchemaRef};
use chrono::{Datelike, Timelike};

use crate::error::ConversionError;
use crate::types::{CanonicalType, ColumnDescriptor, Row, Value};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Builds Arrow schemas and record batches from cursor rows.
pub struct ArrowConverter;

impl ArrowConverter {
    /// Build the Arrow schema for a column list.
    ///
    /// # Errors
    /// Returns `ConversionError::Arrow` if a column has no Arrow representation.
    pub fn build_schema(columns: &[ColumnDescriptor]) -> Result<SchemaRef, ConversionError> {
        let fields = columns
            .iter()
            .map(|column| {
                column
                    .canonical_type
                    .to_arrow()
                    .map(|data_type| Field::new(&column.name, data_type, column.nullable()))
                    .ok_or_else(|| {
                        ConversionError::Arrow(format!(
                            "Column '{}' of type {} has no Arrow representation",
                            column.name, column.canonical_type
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Arc::new(Schema::new(fields)))
    }

    /// Convert rows aligned to `columns` into one record batch.
    ///
    /// # Errors
    /// Returns `ConversionError::InvalidValue` when a value does not match its
    /// column's canonical type, or `ConversionError::Arrow` if Arrow rejects the batch.
    pub fn rows_to_record_batch(
        columns: &[ColumnDescriptor],
        rows: &[Row],
    ) -> Result<RecordBatch, ConversionError> {
        let schema = Self::build_schema(columns)?;

        let arrays = columns
            .iter()
            .enumerate()
            .map(|(index, column)| build_column(column, index, rows))
            .collect::<Result<Vec<_>, _>>()?;

        let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
        Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
    }
}

fn mismatch(column: &ColumnDescriptor, value: &Value) -> ConversionError {
    ConversionError::InvalidValue {
        column: column.name.clone(),
        target: column.canonical_type.to_string(),
        value: value.to_string(),
    }
}

fn build_column(
    column: &ColumnDescriptor,
    index: usize,
    rows: &[Row],
) -> Result<ArrayRef, ConversionError> {
    let values = rows.iter().map(|row| row.get(index).unwrap_or(&Value::Null));

    match column.canonical_type {
        CanonicalType::Text | CanonicalType::BinaryText => {
            let mut builder = StringBuilder::with_capacity(rows.len(), rows.len() * 16);
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Text(s) | Value::BinaryText(s) => builder.append_value(s),
                    other => return Err(mismatch(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        CanonicalType::Integer => {
            let mut builder = Int64Builder::with_capacity(rows.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Integer(i) => builder.append_value(*i),
                    other => return Err(mismatch(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        CanonicalType::Float => {
            let mut builder = Float64Builder::with_capacity(rows.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Float(f) => builder.append_value(*f),
                    other => return Err(mismatch(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        CanonicalType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(rows.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Boolean(b) => builder.append_value(*b),
                    other => return Err(mismatch(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        CanonicalType::Date => {
            let mut builder = Date32Builder::with_capacity(rows.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Date(d) => {
                        builder.append_value(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
                    }
                    other => return Err(mismatch(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        CanonicalType::Datetime => {
            let mut builder =
                TimestampMicrosecondBuilder::with_capacity(rows.len()).with_timezone("UTC");
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Datetime(dt) => builder.append_value(dt.timestamp_micros()),
                    other => return Err(mismatch(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        CanonicalType::Time => {
            let mut builder = Time64MicrosecondBuilder::with_capacity(rows.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Time(t) => builder.append_value(
                        i64::from(t.num_seconds_from_midnight()) * 1_000_000
                            + i64::from(t.nanosecond() / 1_000),
                    ),
                    other => return Err(mismatch(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        CanonicalType::Unsupported => Err(ConversionError::Arrow(format!(
            "Column '{}' has an unsupported type",
            column.name
        ))),
    }
}
