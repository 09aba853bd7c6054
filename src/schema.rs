//! Column types of tables stored as grids.
//!
//! The grid module stores everything as strings, so a table saved with its
//! types carries a dtype name per column. The names are the ones written by
//! the other grid clients (pandas dtype names), which keeps tables readable
//! across clients.

use chrono::{NaiveDateTime, TimeDelta};

use crate::codec::{Cell, RawColumn};
use crate::error::{Error, Result};
use crate::value::{GridValue, TIMESTAMP_FORMAT};

/// Supported column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// UTF-8 string (no conversion needed).
    Utf8,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit floating point.
    Float64,
    /// 32-bit floating point.
    Float32,
    /// Boolean (parsed from "true"/"false", "1"/"0", etc.).
    Boolean,
    /// Timestamp with seconds precision on the wire.
    Datetime,
    /// Duration written as total seconds.
    Duration,
}

impl ColumnType {
    /// Look up a column type by its dtype name.
    ///
    /// Besides the names written by this crate, the pandas dtype families
    /// are accepted: sized and unsigned integers, `float16`, tz-aware
    /// `datetime64[ns, <tz>]` and any `timedelta*` or `bool*` name.
    pub fn from_dtype_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "object" | "str" | "string" | "utf8" => return Some(ColumnType::Utf8),
            _ => {}
        }

        if let Some(bits) = name.strip_prefix("uint").and_then(integer_width) {
            // uint32 does not fit an i32
            return Some(if bits < 32 {
                ColumnType::Int32
            } else {
                ColumnType::Int64
            });
        }
        if let Some(bits) = name.strip_prefix("int").and_then(integer_width) {
            return Some(if bits <= 32 {
                ColumnType::Int32
            } else {
                ColumnType::Int64
            });
        }
        if let Some(bits) = name.strip_prefix("float").and_then(integer_width) {
            return Some(if bits <= 32 {
                ColumnType::Float32
            } else {
                ColumnType::Float64
            });
        }
        if name.starts_with("datetime") {
            return Some(ColumnType::Datetime);
        }
        if name.starts_with("timedelta") {
            return Some(ColumnType::Duration);
        }
        if name.starts_with("bool") {
            return Some(ColumnType::Boolean);
        }
        None
    }

    /// The dtype name written to the grid.
    pub fn dtype_name(&self) -> &'static str {
        match self {
            ColumnType::Utf8 => "object",
            ColumnType::Int64 => "int64",
            ColumnType::Int32 => "int32",
            ColumnType::Float64 => "float64",
            ColumnType::Float32 => "float32",
            ColumnType::Boolean => "bool",
            ColumnType::Datetime => "datetime64[ns]",
            ColumnType::Duration => "timedelta64[ns]",
        }
    }

    /// Parse one raw cell of `column` according to this type.
    ///
    /// Nil cells are null for every type. Empty cells and the pandas
    /// missing-value markers are null for every type but
    /// [`ColumnType::Utf8`].
    pub fn parse_cell(&self, column: &str, cell: &Cell) -> Result<GridValue> {
        let Some(value) = cell.as_deref() else {
            return Ok(GridValue::Null);
        };
        if *self != ColumnType::Utf8 && (value.is_empty() || is_missing_marker(value)) {
            return Ok(GridValue::Null);
        }

        let fail = |expected: &str| {
            Error::type_coercion(column, format!("failed to parse '{}' as {}", value, expected))
        };

        match self {
            ColumnType::Utf8 => Ok(GridValue::Str(value.to_string())),
            ColumnType::Int64 => value
                .parse::<i64>()
                .map(GridValue::Int)
                .map_err(|_| fail("int64")),
            ColumnType::Int32 => value
                .parse::<i32>()
                .map(|v| GridValue::Int(i64::from(v)))
                .map_err(|_| fail("int32")),
            ColumnType::Float64 | ColumnType::Float32 => value
                .parse::<f64>()
                .map(GridValue::Float)
                .map_err(|_| fail("float")),
            ColumnType::Boolean => parse_boolean(value)
                .map(GridValue::Bool)
                .ok_or_else(|| fail("bool")),
            ColumnType::Datetime => parse_timestamp(value)
                .map(GridValue::Timestamp)
                .ok_or_else(|| fail("datetime")),
            ColumnType::Duration => parse_duration(value)
                .map(GridValue::Duration)
                .ok_or_else(|| fail("duration in seconds")),
        }
    }
}

/// Bit width following a numeric dtype prefix (`int8` -> 8). A bare
/// prefix (`int`, `float`) means 64 bits.
fn integer_width(suffix: &str) -> Option<u32> {
    if suffix.is_empty() {
        return Some(64);
    }
    match suffix.parse::<u32>() {
        Ok(bits @ (8 | 16 | 32 | 64)) => Some(bits),
        _ => None,
    }
}

/// Missing-value markers written by pandas (`nan`, `NaN`, `NaT`).
fn is_missing_marker(s: &str) -> bool {
    s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("nat")
}

/// Parse a string as a boolean value.
///
/// Accepts: "true", "false", "1", "0", "yes", "no" (case-insensitive).
fn parse_boolean(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "f" | "n" => Some(false),
        _ => None,
    }
}

/// Parse a wire timestamp. A fractional part and a space separator are
/// tolerated for grids written by other tools.
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT))
        .ok()
}

/// Parse a duration written as decimal seconds.
fn parse_duration(s: &str) -> Option<TimeDelta> {
    let seconds = s.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let nanos = (seconds * 1_000_000_000.0).round();
    if nanos < i64::MIN as f64 || nanos > i64::MAX as f64 {
        return None;
    }
    Some(TimeDelta::nanoseconds(nanos as i64))
}

/// A table column with its values converted to the declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub values: Vec<GridValue>,
}

impl TypedColumn {
    /// Apply the column's declared dtype to its raw cells.
    ///
    /// Columns without a dtype are read as [`ColumnType::Utf8`]. An unknown
    /// dtype or a cell that does not parse fails with
    /// [`Error::TypeCoercion`] naming the column.
    pub fn coerce(raw: RawColumn) -> Result<Self> {
        let column_type = match raw.dtype.as_deref() {
            None => ColumnType::Utf8,
            Some(name) => ColumnType::from_dtype_name(name).ok_or_else(|| {
                Error::type_coercion(&raw.name, format!("unknown dtype '{}'", name))
            })?,
        };

        let values = raw
            .values
            .iter()
            .map(|cell| column_type.parse_cell(&raw.name, cell))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: raw.name,
            column_type,
            values,
        })
    }
}

#[cfg(feature = "dataframe")]
mod arrow_types {
    use arrow::datatypes::{DataType, TimeUnit};

    use super::ColumnType;

    impl ColumnType {
        /// Convert to Arrow DataType.
        pub fn to_arrow_type(&self) -> DataType {
            match self {
                ColumnType::Utf8 => DataType::Utf8,
                ColumnType::Int64 => DataType::Int64,
                ColumnType::Int32 => DataType::Int32,
                ColumnType::Float64 => DataType::Float64,
                ColumnType::Float32 => DataType::Float32,
                ColumnType::Boolean => DataType::Boolean,
                ColumnType::Datetime => DataType::Timestamp(TimeUnit::Nanosecond, None),
                ColumnType::Duration => DataType::Duration(TimeUnit::Nanosecond),
            }
        }

        /// Map an Arrow DataType to the column type it is stored as.
        pub fn from_arrow_type(data_type: &DataType) -> Option<Self> {
            match data_type {
                DataType::Utf8 | DataType::LargeUtf8 => Some(ColumnType::Utf8),
                DataType::Int64 => Some(ColumnType::Int64),
                DataType::Int32 => Some(ColumnType::Int32),
                DataType::Float64 => Some(ColumnType::Float64),
                DataType::Float32 => Some(ColumnType::Float32),
                DataType::Boolean => Some(ColumnType::Boolean),
                DataType::Timestamp(_, _) => Some(ColumnType::Datetime),
                DataType::Duration(_) => Some(ColumnType::Duration),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cell(s: &str) -> Cell {
        Some(s.to_string())
    }

    #[test]
    fn test_dtype_names_round_trip() {
        for ty in [
            ColumnType::Utf8,
            ColumnType::Int64,
            ColumnType::Int32,
            ColumnType::Float64,
            ColumnType::Float32,
            ColumnType::Boolean,
            ColumnType::Datetime,
            ColumnType::Duration,
        ] {
            assert_eq!(ColumnType::from_dtype_name(ty.dtype_name()), Some(ty));
        }
        assert_eq!(ColumnType::from_dtype_name("str"), Some(ColumnType::Utf8));
        assert_eq!(ColumnType::from_dtype_name("category"), None);
    }

    #[test]
    fn test_pandas_dtype_families() {
        let cases = [
            ("int8", ColumnType::Int32),
            ("int16", ColumnType::Int32),
            ("uint16", ColumnType::Int32),
            ("uint32", ColumnType::Int64),
            ("uint64", ColumnType::Int64),
            ("Int64", ColumnType::Int64),
            ("float16", ColumnType::Float32),
            ("float", ColumnType::Float64),
            ("datetime64[ns, UTC]", ColumnType::Datetime),
            ("datetime64[us]", ColumnType::Datetime),
            ("timedelta64[s]", ColumnType::Duration),
            ("boolean", ColumnType::Boolean),
        ];
        for (name, expected) in cases {
            assert_eq!(ColumnType::from_dtype_name(name), Some(expected), "{}", name);
        }

        assert_eq!(ColumnType::from_dtype_name("interval"), None);
        assert_eq!(ColumnType::from_dtype_name("int128"), None);
        assert_eq!(ColumnType::from_dtype_name("floating"), None);
    }

    #[test]
    fn test_missing_markers_are_null() {
        assert_eq!(
            ColumnType::Float64.parse_cell("x", &cell("nan")).unwrap(),
            GridValue::Null
        );
        assert_eq!(
            ColumnType::Int64.parse_cell("x", &cell("NaN")).unwrap(),
            GridValue::Null
        );
        assert_eq!(
            ColumnType::Datetime.parse_cell("x", &cell("NaT")).unwrap(),
            GridValue::Null
        );
        assert_eq!(
            ColumnType::Utf8.parse_cell("x", &cell("nan")).unwrap(),
            GridValue::Str("nan".to_string())
        );
    }

    #[test]
    fn test_parse_int64() {
        assert_eq!(
            ColumnType::Int64.parse_cell("a", &cell("42")).unwrap(),
            GridValue::Int(42)
        );
        assert_eq!(
            ColumnType::Int64.parse_cell("a", &cell("-100")).unwrap(),
            GridValue::Int(-100)
        );
        assert!(ColumnType::Int64.parse_cell("a", &cell("not_a_number")).is_err());
        assert!(ColumnType::Int32.parse_cell("a", &cell("3000000000")).is_err());
    }

    #[test]
    fn test_parse_boolean() {
        let parse = |s: &str| ColumnType::Boolean.parse_cell("flag", &cell(s));
        assert_eq!(parse("true").unwrap(), GridValue::Bool(true));
        assert_eq!(parse("FALSE").unwrap(), GridValue::Bool(false));
        assert_eq!(parse("1").unwrap(), GridValue::Bool(true));
        assert_eq!(parse("no").unwrap(), GridValue::Bool(false));
        assert!(parse("maybe").is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        for s in [
            "2024-01-15T10:30:00",
            "2024-01-15 10:30:00",
            "2024-01-15T10:30:00.000",
        ] {
            assert_eq!(
                ColumnType::Datetime.parse_cell("ts", &cell(s)).unwrap(),
                GridValue::Timestamp(expected)
            );
        }
    }

    #[test]
    fn test_parse_duration_seconds() {
        assert_eq!(
            ColumnType::Duration.parse_cell("d", &cell("90.5")).unwrap(),
            GridValue::Duration(TimeDelta::milliseconds(90_500))
        );
        assert!(ColumnType::Duration.parse_cell("d", &cell("inf")).is_err());
    }

    #[test]
    fn test_empty_and_nil_cells_are_null() {
        assert_eq!(
            ColumnType::Int64.parse_cell("a", &cell("")).unwrap(),
            GridValue::Null
        );
        assert_eq!(
            ColumnType::Int64.parse_cell("a", &None).unwrap(),
            GridValue::Null
        );
        assert_eq!(
            ColumnType::Utf8.parse_cell("a", &cell("")).unwrap(),
            GridValue::Str(String::new())
        );
    }

    #[test]
    fn test_coerce_unknown_dtype_names_column() {
        let raw = RawColumn {
            name: "price".to_string(),
            dtype: Some("decimal128".to_string()),
            values: vec![cell("1.0")],
        };
        let err = TypedColumn::coerce(raw).unwrap_err();
        assert!(matches!(err, Error::TypeCoercion { ref column, .. } if column == "price"));
    }

    #[test]
    fn test_coerce_bad_cell_names_column() {
        let raw = RawColumn {
            name: "age".to_string(),
            dtype: Some("int64".to_string()),
            values: vec![cell("30"), cell("thirty")],
        };
        let err = TypedColumn::coerce(raw).unwrap_err();
        assert!(matches!(err, Error::TypeCoercion { ref column, .. } if column == "age"));
    }

    #[test]
    fn test_coerce_without_dtype_is_utf8() {
        let raw = RawColumn {
            name: "name".to_string(),
            dtype: None,
            values: vec![cell("Alice"), None],
        };
        let typed = TypedColumn::coerce(raw).unwrap();
        assert_eq!(typed.column_type, ColumnType::Utf8);
        assert_eq!(
            typed.values,
            vec![GridValue::Str("Alice".to_string()), GridValue::Null]
        );
    }

    #[cfg(feature = "dataframe")]
    #[test]
    fn test_arrow_type_mapping() {
        use arrow::datatypes::{DataType, TimeUnit};

        assert_eq!(ColumnType::Int64.to_arrow_type(), DataType::Int64);
        assert_eq!(
            ColumnType::from_arrow_type(&DataType::Timestamp(
                TimeUnit::Millisecond,
                Some("UTC".into())
            )),
            Some(ColumnType::Datetime)
        );
        assert_eq!(ColumnType::from_arrow_type(&DataType::LargeUtf8), Some(ColumnType::Utf8));
        assert_eq!(ColumnType::from_arrow_type(&DataType::Binary), None);
    }
}
