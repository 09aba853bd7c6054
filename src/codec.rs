//! Encoding and decoding of grid module replies.
//!
//! The grid module answers `GRID.DUMP` with a flat array
//! `[rows, columns, cell, cell, ...]` holding the cells in row-major order,
//! and `GRID.RANGE` with the same cells but without the two header values.
//! This module turns those replies into [`Grid`] values and back, and
//! implements the column-oriented layout used to store tables:
//!
//! ```text
//! wire row 0: [name, dtype?, v0, v1, ..., vN-1]   <- table column 0
//! wire row 1: [name, dtype?, v0, v1, ..., vN-1]   <- table column 1
//! ```
//!
//! All functions here are pure; sending the commands is left to
//! [`crate::client`].

use redis::Value;

use crate::error::{Error, Result};
use crate::value::GridValue;

/// Reply sent by the server for a command queued inside MULTI.
pub const QUEUED: &str = "QUEUED";

/// A grid cell as returned by the server. Unset cells may come back as nil.
pub type Cell = Option<String>;

/// A rectangular grid of cells stored in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    rows: usize,
    columns: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build a grid from its shape and row-major cells.
    ///
    /// Fails with [`Error::MalformedReply`] when the number of cells is not
    /// `rows * columns`.
    pub fn from_cells(rows: usize, columns: usize, cells: Vec<Cell>) -> Result<Self> {
        let expected = rows.checked_mul(columns).ok_or_else(|| {
            Error::MalformedReply(format!("grid shape {}x{} overflows", rows, columns))
        })?;
        if cells.len() != expected {
            return Err(Error::MalformedReply(format!(
                "grid declares {} rows x {} columns ({} cells) but carries {} cells",
                rows,
                columns,
                expected,
                cells.len()
            )));
        }
        Ok(Self {
            rows,
            columns,
            cells,
        })
    }

    /// Build a grid from a list of rows.
    ///
    /// All rows must have the same length, otherwise
    /// [`Error::InvalidArgument`] is returned.
    pub fn from_rows<R, V>(rows: R) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<GridValue>,
    {
        let mut cells = Vec::new();
        let mut row_count = 0;
        let mut columns = None;

        for row in rows {
            let before = cells.len();
            cells.extend(row.into_iter().map(|v| {
                let value: GridValue = v.into();
                if value.is_null() {
                    None
                } else {
                    Some(value.encode())
                }
            }));
            let width = cells.len() - before;
            match columns {
                None => columns = Some(width),
                Some(expected) if expected != width => {
                    return Err(Error::InvalidArgument(format!(
                        "row {} has {} values, expected {}",
                        row_count, width, expected
                    )));
                }
                Some(_) => {}
            }
            row_count += 1;
        }

        Ok(Self {
            rows: row_count,
            columns: columns.unwrap_or(0),
            cells,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Get the cell at `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> Option<&Cell> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.cells.get(row * self.columns + column)
    }

    /// Get the cells of one row.
    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.columns;
        Some(&self.cells[start..start + self.columns])
    }

    /// Iterate over rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[Cell]> {
        (0..self.rows).map(move |r| {
            let start = r * self.columns;
            &self.cells[start..start + self.columns]
        })
    }

    /// The flat row-major cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Consume the grid, returning the flat row-major cells.
    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// Consume the grid, returning one vector per row.
    pub fn into_rows(self) -> Vec<Vec<Cell>> {
        if self.columns == 0 {
            return vec![Vec::new(); self.rows];
        }
        let mut rows = Vec::with_capacity(self.rows);
        let mut cells = self.cells.into_iter();
        for _ in 0..self.rows {
            rows.push(cells.by_ref().take(self.columns).collect());
        }
        rows
    }

    /// Cells as command arguments; unset cells are sent as empty strings.
    pub(crate) fn wire_args(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|c| c.as_deref().unwrap_or(""))
    }
}

/// Decoded reply of `GRID.DUMP`.
#[derive(Debug, Clone, PartialEq)]
pub enum DumpReply {
    /// The grid stored at the key.
    Grid(Grid),
    /// The command was queued rather than executed; the raw reply is kept.
    Queued(Value),
}

impl DumpReply {
    /// Whether the dump was queued.
    pub fn is_queued(&self) -> bool {
        matches!(self, DumpReply::Queued(_))
    }

    /// Return the grid, or `None` if the command was queued.
    pub fn into_grid(self) -> Option<Grid> {
        match self {
            DumpReply::Grid(grid) => Some(grid),
            DumpReply::Queued(_) => None,
        }
    }
}

/// Decoded acknowledgement of `GRID.DIM` and `GRID.SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Ok,
    Queued,
}

impl Ack {
    pub fn is_ok(&self) -> bool {
        matches!(self, Ack::Ok)
    }
}

/// Check whether a reply is the queued sentinel.
pub fn is_queued(value: &Value) -> bool {
    match value {
        Value::SimpleString(s) => s == QUEUED,
        Value::BulkString(bytes) => bytes.as_slice() == QUEUED.as_bytes(),
        _ => false,
    }
}

/// Decode a single cell.
pub fn decode_cell(value: Value) -> Result<Cell> {
    match value {
        Value::Nil => Ok(None),
        Value::BulkString(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Value::SimpleString(s) => Ok(Some(s)),
        Value::Okay => Ok(Some("OK".to_string())),
        Value::Int(i) => Ok(Some(i.to_string())),
        Value::Double(d) => Ok(Some(d.to_string())),
        Value::VerbatimString { format: _, text } => Ok(Some(text)),
        other => Err(Error::MalformedReply(format!(
            "expected a scalar cell, got {:?}",
            other
        ))),
    }
}

/// Decode a flat cell array, as returned by `GRID.RANGE`.
pub fn decode_cells(value: Value) -> Result<Vec<Cell>> {
    match value {
        Value::Array(items) => items.into_iter().map(decode_cell).collect(),
        Value::Nil => Ok(Vec::new()),
        other => Err(Error::MalformedReply(format!(
            "expected an array of cells, got {:?}",
            other
        ))),
    }
}

/// Decode a non-negative integer header value.
fn decode_count(value: &Value, what: &str) -> Result<usize> {
    let parsed = match value {
        Value::Int(i) => usize::try_from(*i).ok(),
        Value::BulkString(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<usize>().ok()),
        Value::SimpleString(s) => s.parse::<usize>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        Error::MalformedReply(format!(
            "{} must be a non-negative integer, got {:?}",
            what, value
        ))
    })
}

/// Decode a `GRID.DUMP` reply.
///
/// The queued sentinel is passed through untouched.
pub fn decode_dump(value: Value) -> Result<DumpReply> {
    if is_queued(&value) {
        tracing::trace!("GRID.DUMP reply is queued, passing through");
        return Ok(DumpReply::Queued(value));
    }

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(Error::MalformedReply(format!(
                "expected a dump array, got {:?}",
                other
            )));
        }
    };

    if items.len() < 2 {
        return Err(Error::MalformedReply(format!(
            "dump must start with rows and columns, got {} values",
            items.len()
        )));
    }

    let rows = decode_count(&items[0], "row count")?;
    let columns = decode_count(&items[1], "column count")?;
    let cells = items
        .into_iter()
        .skip(2)
        .map(decode_cell)
        .collect::<Result<Vec<_>>>()?;

    tracing::trace!(rows, columns, cells = cells.len(), "decoded GRID.DUMP reply");
    Grid::from_cells(rows, columns, cells).map(DumpReply::Grid)
}

/// Decode a `GRID.SHAPE` reply into `(rows, columns)`.
pub fn decode_shape(value: Value) -> Result<(usize, usize)> {
    match value {
        Value::Array(items) if items.len() == 2 => Ok((
            decode_count(&items[0], "row count")?,
            decode_count(&items[1], "column count")?,
        )),
        other => Err(Error::MalformedReply(format!(
            "expected a [rows, columns] pair, got {:?}",
            other
        ))),
    }
}

/// Decode the acknowledgement of a write command.
pub fn decode_ack(value: Value) -> Result<Ack> {
    if is_queued(&value) {
        return Ok(Ack::Queued);
    }
    match value {
        Value::Okay => Ok(Ack::Ok),
        Value::SimpleString(ref s) if s == "OK" => Ok(Ack::Ok),
        Value::BulkString(ref b) if b.as_slice() == b"OK" => Ok(Ack::Ok),
        other => Err(Error::MalformedReply(format!(
            "expected OK, got {:?}",
            other
        ))),
    }
}

/// One table column prepared for storage as a wire row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Dtype name written after the column name when types are preserved.
    pub dtype: Option<String>,
    pub values: Vec<GridValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<GridValue>) -> Self {
        Self {
            name: name.into(),
            dtype: None,
            values,
        }
    }

    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = Some(dtype.into());
        self
    }
}

/// One table column read back from a wire row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub dtype: Option<String>,
    pub values: Vec<Cell>,
}

/// Arguments of a `GRID.DIM` call that stores a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedGrid {
    /// Number of wire rows (table columns).
    pub rows: usize,
    /// Cells per wire row: table rows plus the metadata prefix.
    pub columns: usize,
    /// Flat values in wire row-major order.
    pub args: Vec<String>,
}

/// Number of metadata cells leading every wire row.
pub fn metadata_width(preserve_types: bool) -> usize {
    if preserve_types { 2 } else { 1 }
}

/// Encode table columns into the column-oriented wire layout.
///
/// Every column must have the same number of values, and when
/// `preserve_types` is set every column must carry a dtype.
pub fn encode_columns(columns: &[Column], preserve_types: bool) -> Result<EncodedGrid> {
    let table_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
    let width = table_rows + metadata_width(preserve_types);
    let mut args = Vec::with_capacity(columns.len() * width);

    for column in columns {
        if column.values.len() != table_rows {
            return Err(Error::InvalidArgument(format!(
                "column '{}' has {} values, expected {}",
                column.name,
                column.values.len(),
                table_rows
            )));
        }

        args.push(column.name.clone());
        if preserve_types {
            let dtype = column.dtype.as_ref().ok_or_else(|| {
                Error::InvalidArgument(format!("column '{}' has no dtype", column.name))
            })?;
            args.push(dtype.clone());
        }
        args.extend(column.values.iter().map(GridValue::encode));
    }

    Ok(EncodedGrid {
        rows: columns.len(),
        columns: width,
        args,
    })
}

/// Split a grid stored in the column-oriented layout back into columns.
pub fn decode_columns(grid: &Grid, preserve_types: bool) -> Result<Vec<RawColumn>> {
    let prefix = metadata_width(preserve_types);
    if grid.rows() > 0 && grid.columns() < prefix {
        return Err(Error::MalformedReply(format!(
            "table rows need at least {} metadata cells, grid has {} columns",
            prefix,
            grid.columns()
        )));
    }

    grid.iter_rows()
        .enumerate()
        .map(|(i, row)| {
            let name = row[0].clone().ok_or_else(|| {
                Error::MalformedReply(format!("table column {} has no name", i))
            })?;
            let dtype = if preserve_types {
                let dtype = row[1].clone().ok_or_else(|| {
                    Error::type_coercion(&name, "missing dtype, the column was stored without types")
                })?;
                Some(dtype)
            } else {
                None
            };
            Ok(RawColumn {
                name,
                dtype,
                values: row[prefix..].to_vec(),
            })
        })
        .collect()
}
