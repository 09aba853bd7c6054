//! Wire encoding of scalar values.
//!
//! The grid module stores every cell as a string. [`GridValue`] is the typed
//! form of a cell on its way to the server; [`GridValue::encode`] produces the
//! exact string that is sent.
//!
//! The encoding is one-way and lossy for temporal values: timestamps are
//! written with seconds precision and without an offset, durations as their
//! total number of seconds.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use redis::{RedisWrite, ToRedisArgs};

/// Format used for timestamps on the wire.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A scalar value to be written into a grid cell.
#[derive(Debug, Clone, PartialEq)]
pub enum GridValue {
    /// Missing value, written as an empty string.
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Timestamp without timezone.
    Timestamp(NaiveDateTime),
    /// Timestamp with an offset. The offset is not written.
    TimestampTz(DateTime<FixedOffset>),
    Duration(TimeDelta),
}

impl GridValue {
    /// Encode the value to its wire string.
    pub fn encode(&self) -> String {
        match self {
            GridValue::Null => String::new(),
            GridValue::Str(s) => s.clone(),
            GridValue::Int(i) => i.to_string(),
            GridValue::Float(f) => f.to_string(),
            GridValue::Bool(b) => b.to_string(),
            GridValue::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            GridValue::TimestampTz(ts) => ts.naive_local().format(TIMESTAMP_FORMAT).to_string(),
            GridValue::Duration(d) => total_seconds(d).to_string(),
        }
    }

    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, GridValue::Null)
    }
}

/// Total duration in seconds, including the fractional part.
fn total_seconds(d: &TimeDelta) -> f64 {
    // subsec_nanos carries the sign of the delta
    d.num_seconds() as f64 + f64::from(d.subsec_nanos()) / 1_000_000_000.0
}

impl ToRedisArgs for GridValue {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.encode().as_bytes());
    }
}

impl From<&str> for GridValue {
    fn from(value: &str) -> Self {
        GridValue::Str(value.to_string())
    }
}

impl From<String> for GridValue {
    fn from(value: String) -> Self {
        GridValue::Str(value)
    }
}

impl From<&String> for GridValue {
    fn from(value: &String) -> Self {
        GridValue::Str(value.clone())
    }
}

impl From<i64> for GridValue {
    fn from(value: i64) -> Self {
        GridValue::Int(value)
    }
}

impl From<i32> for GridValue {
    fn from(value: i32) -> Self {
        GridValue::Int(i64::from(value))
    }
}

impl From<f64> for GridValue {
    fn from(value: f64) -> Self {
        GridValue::Float(value)
    }
}

impl From<f32> for GridValue {
    fn from(value: f32) -> Self {
        GridValue::Float(f64::from(value))
    }
}

impl From<bool> for GridValue {
    fn from(value: bool) -> Self {
        GridValue::Bool(value)
    }
}

impl From<NaiveDateTime> for GridValue {
    fn from(value: NaiveDateTime) -> Self {
        GridValue::Timestamp(value)
    }
}

impl From<DateTime<FixedOffset>> for GridValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        GridValue::TimestampTz(value)
    }
}

impl From<TimeDelta> for GridValue {
    fn from(value: TimeDelta) -> Self {
        GridValue::Duration(value)
    }
}

impl<T: Into<GridValue>> From<Option<T>> for GridValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(GridValue::Null)
    }
}
