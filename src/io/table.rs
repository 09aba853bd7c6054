//! Storing Arrow RecordBatches as grids.
//!
//! A table is written column-oriented: every table column becomes one grid
//! row holding the column name, optionally its dtype name, and then its
//! values in row order. Loading reverses the layout and, when types were
//! preserved, rebuilds typed Arrow arrays from the string cells.

use std::sync::Arc;

use arrow::array::timezone::Tz;
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanBuilder, DurationNanosecondBuilder, Float32Builder,
    Float64Builder, Int32Builder, Int64Builder, RecordBatch, RecordBatchOptions, StringBuilder,
    TimestampNanosecondBuilder,
};
use arrow::datatypes::{
    ArrowTimestampType, DataType, DurationMicrosecondType, DurationMillisecondType, DurationNanosecondType,
    DurationSecondType, Field, Float32Type, Float64Type, Int32Type, Int64Type, Schema, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use arrow::temporal_conversions::{as_datetime, as_datetime_with_timezone};
use chrono::TimeDelta;
use redis::aio::ConnectionLike;

use crate::client::grid::GridClient;
use crate::codec::{
    Ack, Column, DumpReply, EncodedGrid, Grid, decode_columns, encode_columns, metadata_width,
};
use crate::error::{Error, Result};
use crate::schema::{ColumnType, TypedColumn};
use crate::value::GridValue;

/// Encode a RecordBatch into the arguments of a `GRID.DIM` call.
///
/// With `preserve_types` every column carries the dtype name derived from
/// its Arrow type. Timestamps lose sub-second precision, and zoned ones keep
/// their local wall time but not the timezone.
pub fn encode_record_batch(batch: &RecordBatch, preserve_types: bool) -> Result<EncodedGrid> {
    let schema = batch.schema();
    let mut columns = Vec::with_capacity(batch.num_columns());

    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let column_type = ColumnType::from_arrow_type(field.data_type()).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "column '{}' has unsupported type {}",
                field.name(),
                field.data_type()
            ))
        })?;

        let column = Column::new(field.name().clone(), array_values(field.name(), array)?);
        columns.push(if preserve_types {
            column.with_dtype(column_type.dtype_name())
        } else {
            column
        });
    }

    encode_columns(&columns, preserve_types)
}

/// Rebuild a RecordBatch from a grid written by [`encode_record_batch`].
///
/// Without `preserve_types` every column is read back as Utf8.
pub fn decode_record_batch(grid: &Grid, preserve_types: bool) -> Result<RecordBatch> {
    let typed = decode_columns(grid, preserve_types)?
        .into_iter()
        .map(TypedColumn::coerce)
        .collect::<Result<Vec<_>>>()?;

    let num_rows = grid.columns().saturating_sub(metadata_width(preserve_types));
    let fields: Vec<Field> = typed
        .iter()
        .map(|c| Field::new(&c.name, c.column_type.to_arrow_type(), true))
        .collect();
    let arrays = typed
        .iter()
        .map(build_column)
        .collect::<Result<Vec<ArrayRef>>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)
        .map_err(|e| Error::MalformedReply(format!("failed to create RecordBatch: {}", e)))
}

/// Read the values of an Arrow array as grid values.
fn array_values(name: &str, array: &ArrayRef) -> Result<Vec<GridValue>> {
    let values = match array.data_type() {
        DataType::Utf8 => array.as_string::<i32>().iter().map(GridValue::from).collect(),
        DataType::LargeUtf8 => array.as_string::<i64>().iter().map(GridValue::from).collect(),
        DataType::Int64 => array
            .as_primitive::<Int64Type>()
            .iter()
            .map(GridValue::from)
            .collect(),
        DataType::Int32 => array
            .as_primitive::<Int32Type>()
            .iter()
            .map(GridValue::from)
            .collect(),
        DataType::Float64 => array
            .as_primitive::<Float64Type>()
            .iter()
            .map(GridValue::from)
            .collect(),
        DataType::Float32 => array
            .as_primitive::<Float32Type>()
            .iter()
            .map(GridValue::from)
            .collect(),
        DataType::Boolean => array.as_boolean().iter().map(GridValue::from).collect(),
        DataType::Timestamp(unit, tz) => timestamp_values(name, array, *unit, tz.as_deref())?,
        DataType::Duration(unit) => duration_values(name, array, *unit)?,
        other => {
            return Err(Error::InvalidArgument(format!(
                "column '{}' has unsupported type {}",
                name, other
            )));
        }
    };
    Ok(values)
}

/// Zoned timestamps are written as local wall time in the array's
/// timezone, the same rule `GridValue::TimestampTz` follows.
fn timestamp_values(
    name: &str,
    array: &ArrayRef,
    unit: TimeUnit,
    timezone: Option<&str>,
) -> Result<Vec<GridValue>> {
    let tz = timezone
        .map(|tz| {
            tz.parse::<Tz>().map_err(|e| {
                Error::InvalidArgument(format!(
                    "column '{}' has an unsupported timezone '{}': {}",
                    name, tz, e
                ))
            })
        })
        .transpose()?;

    match unit {
        TimeUnit::Second => wall_times::<TimestampSecondType>(name, array, tz),
        TimeUnit::Millisecond => wall_times::<TimestampMillisecondType>(name, array, tz),
        TimeUnit::Microsecond => wall_times::<TimestampMicrosecondType>(name, array, tz),
        TimeUnit::Nanosecond => wall_times::<TimestampNanosecondType>(name, array, tz),
    }
}

fn wall_times<T: ArrowTimestampType>(
    name: &str,
    array: &ArrayRef,
    tz: Option<Tz>,
) -> Result<Vec<GridValue>> {
    array
        .as_primitive::<T>()
        .iter()
        .map(|value| match value {
            None => Ok(GridValue::Null),
            Some(v) => {
                let wall = match tz {
                    Some(tz) => as_datetime_with_timezone::<T>(v, tz).map(|dt| dt.naive_local()),
                    None => as_datetime::<T>(v),
                };
                wall.map(GridValue::Timestamp).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "column '{}' holds an out of range timestamp {}",
                        name, v
                    ))
                })
            }
        })
        .collect()
}

fn duration_values(name: &str, array: &ArrayRef, unit: TimeUnit) -> Result<Vec<GridValue>> {
    let raw: Vec<Option<i64>> = match unit {
        TimeUnit::Second => array.as_primitive::<DurationSecondType>().iter().collect(),
        TimeUnit::Millisecond => array
            .as_primitive::<DurationMillisecondType>()
            .iter()
            .collect(),
        TimeUnit::Microsecond => array
            .as_primitive::<DurationMicrosecondType>()
            .iter()
            .collect(),
        TimeUnit::Nanosecond => array
            .as_primitive::<DurationNanosecondType>()
            .iter()
            .collect(),
    };
    let convert = |v: i64| match unit {
        TimeUnit::Second => TimeDelta::try_seconds(v),
        TimeUnit::Millisecond => TimeDelta::try_milliseconds(v),
        TimeUnit::Microsecond => Some(TimeDelta::microseconds(v)),
        TimeUnit::Nanosecond => Some(TimeDelta::nanoseconds(v)),
    };

    raw.into_iter()
        .map(|value| match value {
            None => Ok(GridValue::Null),
            Some(v) => convert(v).map(GridValue::Duration).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "column '{}' holds an out of range duration {}",
                    name, v
                ))
            }),
        })
        .collect()
}

/// Build an Arrow array for a single typed column.
fn build_column(column: &TypedColumn) -> Result<ArrayRef> {
    let len = column.values.len();
    let name = column.name.as_str();

    let array: ArrayRef = match column.column_type {
        ColumnType::Utf8 => {
            let mut builder = StringBuilder::with_capacity(len, len * 16);
            for value in &column.values {
                match value {
                    GridValue::Str(s) => builder.append_value(s),
                    GridValue::Null => builder.append_null(),
                    other => builder.append_value(other.encode()),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Int64 => {
            let mut builder = Int64Builder::with_capacity(len);
            for value in &column.values {
                match value {
                    GridValue::Int(i) => builder.append_value(*i),
                    GridValue::Null => builder.append_null(),
                    other => return Err(unexpected(name, "int64", other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Int32 => {
            let mut builder = Int32Builder::with_capacity(len);
            for value in &column.values {
                match value {
                    GridValue::Int(i) => builder.append_value(
                        i32::try_from(*i).map_err(|_| unexpected(name, "int32", value))?,
                    ),
                    GridValue::Null => builder.append_null(),
                    other => return Err(unexpected(name, "int32", other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Float64 => {
            let mut builder = Float64Builder::with_capacity(len);
            for value in &column.values {
                match value {
                    GridValue::Float(f) => builder.append_value(*f),
                    GridValue::Null => builder.append_null(),
                    other => return Err(unexpected(name, "float64", other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Float32 => {
            let mut builder = Float32Builder::with_capacity(len);
            for value in &column.values {
                match value {
                    GridValue::Float(f) => builder.append_value(*f as f32),
                    GridValue::Null => builder.append_null(),
                    other => return Err(unexpected(name, "float32", other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(len);
            for value in &column.values {
                match value {
                    GridValue::Bool(b) => builder.append_value(*b),
                    GridValue::Null => builder.append_null(),
                    other => return Err(unexpected(name, "bool", other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Datetime => {
            let mut builder = TimestampNanosecondBuilder::with_capacity(len);
            for value in &column.values {
                match value {
                    GridValue::Timestamp(ts) => {
                        let nanos = ts
                            .and_utc()
                            .timestamp_nanos_opt()
                            .ok_or_else(|| unexpected(name, "datetime64[ns]", value))?;
                        builder.append_value(nanos);
                    }
                    GridValue::Null => builder.append_null(),
                    other => return Err(unexpected(name, "datetime64[ns]", other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Duration => {
            let mut builder = DurationNanosecondBuilder::with_capacity(len);
            for value in &column.values {
                match value {
                    GridValue::Duration(d) => {
                        let nanos = d
                            .num_nanoseconds()
                            .ok_or_else(|| unexpected(name, "timedelta64[ns]", value))?;
                        builder.append_value(nanos);
                    }
                    GridValue::Null => builder.append_null(),
                    other => return Err(unexpected(name, "timedelta64[ns]", other)),
                }
            }
            Arc::new(builder.finish())
        }
    };

    Ok(array)
}

fn unexpected(column: &str, expected: &str, value: &GridValue) -> Error {
    Error::type_coercion(
        column,
        format!("value '{}' does not fit {}", value.encode(), expected),
    )
}

impl<C> GridClient<C>
where
    C: ConnectionLike + Send,
{
    /// Store a RecordBatch at `key`, replacing any grid already there.
    ///
    /// With `preserve_types` the dtype of every column is stored next to its
    /// name so [`GridClient::grid_load_table`] can restore it.
    pub async fn grid_save_table(
        &mut self,
        key: &str,
        batch: &RecordBatch,
        preserve_types: bool,
    ) -> Result<Ack> {
        let encoded = encode_record_batch(batch, preserve_types)?;
        tracing::debug!(
            key,
            table_columns = batch.num_columns(),
            table_rows = batch.num_rows(),
            preserve_types,
            "saving table as grid"
        );
        self.grid_dim(key, encoded.rows, encoded.columns, encoded.args)
            .await
    }

    /// Load a RecordBatch stored with [`GridClient::grid_save_table`].
    ///
    /// `preserve_types` must match the value used when saving.
    pub async fn grid_load_table(&mut self, key: &str, preserve_types: bool) -> Result<RecordBatch> {
        match self.grid_dump(key).await? {
            DumpReply::Grid(grid) => decode_record_batch(&grid, preserve_types),
            DumpReply::Queued(_) => {
                tracing::warn!(key, "GRID.DUMP was queued, no table to load");
                Err(Error::MalformedReply(format!(
                    "GRID.DUMP for '{}' was queued instead of executed",
                    key
                )))
            }
        }
    }
}
