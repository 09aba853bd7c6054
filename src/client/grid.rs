//! Grid module commands over an async Redis connection.
//!
//! [`GridClient`] wraps anything implementing
//! [`redis::aio::ConnectionLike`] (a multiplexed connection, a
//! connection manager, a cluster connection) and exposes one method per
//! module command. Arguments are validated before a command is built, and
//! each reply is decoded by the matching function of [`crate::codec`].
//!
//! ```ignore
//! use redis_grid::{GridClient, RedisConnection};
//!
//! let conn = RedisConnection::new("redis://localhost:6379")?
//!     .get_async_connection()
//!     .await?;
//! let mut grid = GridClient::new(conn);
//!
//! grid.grid_dim("a1", 2, 3, [1, 2, 3, 4, 5, 6]).await?;
//! let dump = grid.grid_dump("a1").await?;
//! ```

use redis::Value;
use redis::aio::ConnectionLike;

use crate::args::{GridIndex, RangeBounds, dimension};
use crate::codec::{
    Ack, DumpReply, Grid, decode_ack, decode_cells, decode_dump, decode_shape,
};
use crate::error::{Error, Result};
use crate::value::GridValue;

/// Build a `GRID.DIM` command.
pub(crate) fn dim_command<I>(
    key: &str,
    rows: impl GridIndex,
    columns: impl GridIndex,
    values: I,
) -> Result<redis::Cmd>
where
    I: IntoIterator,
    I::Item: Into<GridValue>,
{
    let rows = dimension(&rows, "rows")?;
    let columns = dimension(&columns, "columns")?;
    let values: Vec<GridValue> = values.into_iter().map(Into::into).collect();
    check_dim_values(rows, columns, values.len())?;

    let mut cmd = redis::cmd("GRID.DIM");
    cmd.arg(key).arg(rows).arg(columns).arg(values);
    Ok(cmd)
}

/// `GRID.DIM` takes either no values or exactly one per cell.
pub(crate) fn check_dim_values(rows: usize, columns: usize, count: usize) -> Result<()> {
    if count != 0 && Some(count) != rows.checked_mul(columns) {
        return Err(Error::InvalidArgument(format!(
            "a {}x{} grid needs {} values, got {}",
            rows,
            columns,
            rows.saturating_mul(columns),
            count
        )));
    }
    Ok(())
}

/// Build a `GRID.SET` command.
pub(crate) fn set_command<I>(key: &str, bounds: RangeBounds, values: I) -> Result<redis::Cmd>
where
    I: IntoIterator,
    I::Item: Into<GridValue>,
{
    let values: Vec<GridValue> = values.into_iter().map(Into::into).collect();

    if let Some((rows, columns)) = bounds.spans()
        && rows * columns != values.len()
    {
        return Err(Error::InvalidArgument(format!(
            "range covers {} cells, got {} values",
            rows * columns,
            values.len()
        )));
    }

    let mut cmd = redis::cmd("GRID.SET");
    cmd.arg(key)
        .arg(bounds.row_start)
        .arg(bounds.row_end)
        .arg(bounds.column_start)
        .arg(bounds.column_end)
        .arg(values);
    Ok(cmd)
}

/// Build a `GRID.RANGE` command.
pub(crate) fn range_command(key: &str, bounds: RangeBounds) -> redis::Cmd {
    let mut cmd = redis::cmd("GRID.RANGE");
    cmd.arg(key)
        .arg(bounds.row_start)
        .arg(bounds.row_end)
        .arg(bounds.column_start)
        .arg(bounds.column_end);
    cmd
}

/// Build a single-key command (`GRID.SHAPE`, `GRID.DUMP`).
pub(crate) fn key_command(name: &str, key: &str) -> redis::Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(key);
    cmd
}

/// Grid module client over an async connection.
pub struct GridClient<C> {
    conn: C,
}

impl<C> GridClient<C>
where
    C: ConnectionLike + Send,
{
    /// Wrap an async connection.
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// Borrow the underlying connection.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Unwrap the underlying connection.
    pub fn into_inner(self) -> C {
        self.conn
    }

    async fn send(&mut self, cmd: &redis::Cmd) -> Result<Value> {
        cmd.query_async(&mut self.conn)
            .await
            .map_err(Error::Connection)
    }

    /// Create or redimension the grid at `key`.
    ///
    /// `values` is either empty or holds `rows * columns` cells in row-major
    /// order. Without values an existing grid keeps its cells where they fit.
    pub async fn grid_dim<I>(
        &mut self,
        key: &str,
        rows: impl GridIndex,
        columns: impl GridIndex,
        values: I,
    ) -> Result<Ack>
    where
        I: IntoIterator,
        I::Item: Into<GridValue>,
    {
        let cmd = dim_command(key, rows, columns, values)?;
        tracing::debug!(key, "GRID.DIM");
        decode_ack(self.send(&cmd).await?)
    }

    /// Store `grid` at `key` with its own shape.
    pub async fn grid_dim_grid(&mut self, key: &str, grid: &Grid) -> Result<Ack> {
        self.grid_dim(key, grid.rows(), grid.columns(), grid.wire_args())
            .await
    }

    /// Overwrite the cells between the given bounds (inclusive).
    pub async fn grid_set<I>(
        &mut self,
        key: &str,
        row_start: impl GridIndex,
        row_end: impl GridIndex,
        column_start: impl GridIndex,
        column_end: impl GridIndex,
        values: I,
    ) -> Result<Ack>
    where
        I: IntoIterator,
        I::Item: Into<GridValue>,
    {
        let bounds = RangeBounds::new(row_start, row_end, column_start, column_end)?;
        let cmd = set_command(key, bounds, values)?;
        tracing::debug!(key, ?bounds, "GRID.SET");
        decode_ack(self.send(&cmd).await?)
    }

    /// Write `grid` into the grid at `key` with its top-left cell at
    /// `(row, column)`.
    pub async fn grid_set_grid(
        &mut self,
        key: &str,
        row: impl GridIndex,
        column: impl GridIndex,
        grid: &Grid,
    ) -> Result<Ack> {
        if grid.is_empty() {
            return Err(Error::InvalidArgument(
                "cannot set an empty grid".to_string(),
            ));
        }
        let row = dimension(&row, "row")? as i64;
        let column = dimension(&column, "column")? as i64;
        self.grid_set(
            key,
            row,
            row + grid.rows() as i64 - 1,
            column,
            column + grid.columns() as i64 - 1,
            grid.wire_args(),
        )
        .await
    }

    /// Read the cells between the given bounds (inclusive).
    ///
    /// Negative bounds count from the end; they are resolved with an extra
    /// `GRID.SHAPE` call so the reply can be reshaped.
    pub async fn grid_range(
        &mut self,
        key: &str,
        row_start: impl GridIndex,
        row_end: impl GridIndex,
        column_start: impl GridIndex,
        column_end: impl GridIndex,
    ) -> Result<Grid> {
        let mut bounds = RangeBounds::new(row_start, row_end, column_start, column_end)?;
        if !bounds.is_absolute() {
            let (rows, columns) = self.grid_shape(key).await?;
            tracing::debug!(key, rows, columns, "resolving negative range bounds");
            bounds = bounds.resolve(rows, columns);
        }

        tracing::debug!(key, ?bounds, "GRID.RANGE");
        let cells = decode_cells(self.send(&range_command(key, bounds)).await?)?;
        // spans() is only None for bounds still negative after resolving,
        // which the server rejects before replying.
        let (rows, columns) = bounds.spans().unwrap_or((0, 0));
        Grid::from_cells(rows, columns, cells)
    }

    /// Get the `(rows, columns)` of the grid at `key`.
    pub async fn grid_shape(&mut self, key: &str) -> Result<(usize, usize)> {
        tracing::debug!(key, "GRID.SHAPE");
        decode_shape(self.send(&key_command("GRID.SHAPE", key)).await?)
    }

    /// Read the whole grid at `key`.
    pub async fn grid_dump(&mut self, key: &str) -> Result<DumpReply> {
        tracing::debug!(key, "GRID.DUMP");
        decode_dump(self.send(&key_command("GRID.DUMP", key)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &redis::Cmd) -> Vec<String> {
        cmd.args_iter()
            .map(|arg| match arg {
                redis::Arg::Simple(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                redis::Arg::Cursor => "<cursor>".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_dim_command_args() {
        let cmd = dim_command("a1", 2, 3, [1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(
            args(&cmd),
            vec!["GRID.DIM", "a1", "2", "3", "1", "2", "3", "4", "5", "6"]
        );
    }

    #[test]
    fn test_dim_command_without_values() {
        let cmd = dim_command("a1", 4, 4, Vec::<GridValue>::new()).unwrap();
        assert_eq!(args(&cmd), vec!["GRID.DIM", "a1", "4", "4"]);
    }

    #[test]
    fn test_dim_command_rejects_wrong_value_count() {
        let err = dim_command("a1", 2, 2, [1, 2, 3]).err().unwrap();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_dim_command_rejects_non_integer_dimensions() {
        assert!(dim_command("a1", "two", 2, Vec::<GridValue>::new()).is_err());
        assert!(dim_command("a1", 2, 1.5f64, Vec::<GridValue>::new()).is_err());
        assert!(dim_command("a1", -2, 2, Vec::<GridValue>::new()).is_err());
    }

    #[test]
    fn test_set_command_args() {
        let bounds = RangeBounds::new(0, 1, 2, 2).unwrap();
        let cmd = set_command("g", bounds, ["x", "y"]).unwrap();
        assert_eq!(
            args(&cmd),
            vec!["GRID.SET", "g", "0", "1", "2", "2", "x", "y"]
        );
    }

    #[test]
    fn test_set_command_checks_area_of_absolute_ranges() {
        let bounds = RangeBounds::new(0, 1, 0, 1).unwrap();
        assert!(set_command("g", bounds, ["x"]).is_err());

        // Relative bounds cannot be checked locally.
        let relative = RangeBounds::new(0, -1, 0, 0).unwrap();
        assert!(set_command("g", relative, ["x"]).is_ok());
    }

    #[test]
    fn test_range_command_args() {
        let bounds = RangeBounds::new(1, 0, 0, -1).unwrap();
        assert_eq!(
            args(&range_command("g", bounds)),
            vec!["GRID.RANGE", "g", "1", "0", "0", "-1"]
        );
    }
}
