//! Synchronous grid client.
//!
//! [`BlockingGridClient`] owns a tokio runtime and drives a [`GridClient`]
//! on it, for callers that are not async themselves. The connection is
//! opened on first use and reused by later calls.
//!
//! ```ignore
//! use redis_grid::BlockingGridClient;
//!
//! let mut client = BlockingGridClient::new("redis://localhost:6379")?;
//! client.grid_dim("a1", 2, 3, [1, 2, 3, 4, 5, 6])?;
//! let (rows, columns) = client.grid_shape("a1")?;
//! ```

use redis::aio::MultiplexedConnection;
use tokio::runtime::Runtime;

use crate::args::{GridIndex, RangeBounds, dimension};
use crate::client::grid::{GridClient, check_dim_values};
use crate::codec::{Ack, DumpReply, Grid};
use crate::connection::{ConnectionConfig, RedisConnection};
use crate::error::{Error, Result};
use crate::value::GridValue;

/// Grid module client with a blocking API.
pub struct BlockingGridClient {
    connection: RedisConnection,
    client: Option<GridClient<MultiplexedConnection>>,
    runtime: Runtime,
}

impl BlockingGridClient {
    /// Create a client for the given URL.
    ///
    /// No connection is made until the first command.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(ConnectionConfig::new(url))
    }

    /// Create a client from a connection config.
    pub fn with_config(config: ConnectionConfig) -> Result<Self> {
        let connection = RedisConnection::with_config(config)?;
        let runtime = Runtime::new()
            .map_err(|e| Error::Runtime(format!("Failed to create runtime: {}", e)))?;

        Ok(Self {
            connection,
            client: None,
            runtime,
        })
    }

    /// Whether a connection has been opened.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Run `f` against the async client, connecting first if needed.
    fn run<T, F>(&mut self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut GridClient<MultiplexedConnection>) -> Result<T>,
    {
        let Self {
            connection,
            client,
            runtime,
        } = self;

        runtime.block_on(async {
            if client.is_none() {
                let conn = connection.get_async_connection().await?;
                *client = Some(GridClient::new(conn));
            }
            match client.as_mut() {
                Some(grid) => f(grid).await,
                None => Err(Error::Runtime("connection was not opened".to_string())),
            }
        })
    }

    /// See [`GridClient::grid_dim`].
    pub fn grid_dim<I>(
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
        // Validate before touching the connection.
        let rows = dimension(&rows, "rows")?;
        let columns = dimension(&columns, "columns")?;
        let values: Vec<GridValue> = values.into_iter().map(Into::into).collect();
        check_dim_values(rows, columns, values.len())?;
        self.run(async |grid| grid.grid_dim(key, rows, columns, values).await)
    }

    /// See [`GridClient::grid_dim_grid`].
    pub fn grid_dim_grid(&mut self, key: &str, grid: &Grid) -> Result<Ack> {
        self.grid_dim(key, grid.rows(), grid.columns(), grid.wire_args())
    }

    /// See [`GridClient::grid_set`].
    pub fn grid_set<I>(
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
        let values: Vec<GridValue> = values.into_iter().map(Into::into).collect();
        self.run(async |grid| {
            grid.grid_set(
                key,
                bounds.row_start,
                bounds.row_end,
                bounds.column_start,
                bounds.column_end,
                values,
            )
            .await
        })
    }

    /// See [`GridClient::grid_set_grid`].
    pub fn grid_set_grid(
        &mut self,
        key: &str,
        row: impl GridIndex,
        column: impl GridIndex,
        grid: &Grid,
    ) -> Result<Ack> {
        let row = row.to_index("row")?;
        let column = column.to_index("column")?;
        self.run(async |client| client.grid_set_grid(key, row, column, grid).await)
    }

    /// See [`GridClient::grid_range`].
    pub fn grid_range(
        &mut self,
        key: &str,
        row_start: impl GridIndex,
        row_end: impl GridIndex,
        column_start: impl GridIndex,
        column_end: impl GridIndex,
    ) -> Result<Grid> {
        let bounds = RangeBounds::new(row_start, row_end, column_start, column_end)?;
        self.run(async |grid| {
            grid.grid_range(
                key,
                bounds.row_start,
                bounds.row_end,
                bounds.column_start,
                bounds.column_end,
            )
            .await
        })
    }

    /// See [`GridClient::grid_shape`].
    pub fn grid_shape(&mut self, key: &str) -> Result<(usize, usize)> {
        self.run(async |grid| grid.grid_shape(key).await)
    }

    /// See [`GridClient::grid_dump`].
    pub fn grid_dump(&mut self, key: &str) -> Result<DumpReply> {
        self.run(async |grid| grid.grid_dump(key).await)
    }

    /// See [`GridClient::grid_save_table`].
    #[cfg(feature = "dataframe")]
    pub fn grid_save_table(
        &mut self,
        key: &str,
        batch: &arrow::array::RecordBatch,
        preserve_types: bool,
    ) -> Result<Ack> {
        self.run(async |grid| grid.grid_save_table(key, batch, preserve_types).await)
    }

    /// See [`GridClient::grid_load_table`].
    #[cfg(feature = "dataframe")]
    pub fn grid_load_table(
        &mut self,
        key: &str,
        preserve_types: bool,
    ) -> Result<arrow::array::RecordBatch> {
        self.run(async |grid| grid.grid_load_table(key, preserve_types).await)
    }
}
