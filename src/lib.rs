//! # redis-grid
//!
//! Client bindings for the Redis grid module.
//!
//! The grid module stores a two-dimensional array of string cells under a
//! single key. This crate wraps its commands, decodes their replies into
//! typed values, and stores Arrow tables in grids using a column-oriented
//! layout that can preserve column types.
//!
//! ## Commands
//!
//! | Command | Method | Reply |
//! |---------|--------|-------|
//! | `GRID.DIM key rows columns [values...]` | [`GridClient::grid_dim`] | [`Ack`] |
//! | `GRID.SET key r0 r1 c0 c1 values...` | [`GridClient::grid_set`] | [`Ack`] |
//! | `GRID.RANGE key r0 r1 c0 c1` | [`GridClient::grid_range`] | [`Grid`] |
//! | `GRID.SHAPE key` | [`GridClient::grid_shape`] | `(rows, columns)` |
//! | `GRID.DUMP key` | [`GridClient::grid_dump`] | [`DumpReply`] |
//!
//! ## Quick Start
//!
//! ```no_run
//! use redis_grid::{GridClient, RedisConnection};
//!
//! # async fn run() -> redis_grid::Result<()> {
//! let conn = RedisConnection::new("redis://localhost:6379")?
//!     .get_async_connection()
//!     .await?;
//! let mut grid = GridClient::new(conn);
//!
//! grid.grid_dim("a1", 2, 3, [1, 2, 3, 4, 5, 6]).await?;
//! let (rows, columns) = grid.grid_shape("a1").await?;
//! assert_eq!((rows, columns), (2, 3));
//!
//! let corner = grid.grid_range("a1", 0, 1, 1, 2).await?;
//! println!("{:?}", corner.into_rows());
//! # Ok(())
//! # }
//! ```
//!
//! ### Storing a table
//!
//! ```ignore
//! use redis_grid::{GridClient, RedisConnection};
//!
//! grid.grid_save_table("prices", &batch, true).await?;
//! let restored = grid.grid_load_table("prices", true).await?;
//! assert_eq!(restored.schema(), batch.schema());
//! ```
//!
//! ## Features
//!
//! - `dataframe` - Arrow RecordBatch marshalling (enabled by default)
//! - `cluster` - Async Redis Cluster connections

// Module organization:
// - client/   : Command wrappers (async, blocking, pipeline)
// - io/       : Arrow table storage
// - (top-level): Codec, values, schema and shared infrastructure

pub mod args;
pub mod client;
pub mod codec;
mod connection;
mod error;
pub mod io;
pub mod schema;
pub mod value;

// Connection
pub use connection::{ConnectionConfig, DEFAULT_URL, RedisConnection, URL_ENV_VAR};

// Error handling
pub use error::{Error, Result};

// Clients
pub use client::blocking::BlockingGridClient;
pub use client::grid::GridClient;
pub use client::pipeline::{GridPipeline, GridReply, PipelineResult};

// Codec and values
pub use args::{GridIndex, RangeBounds};
pub use codec::{
    Ack, Cell, Column, DumpReply, EncodedGrid, Grid, QUEUED, RawColumn, decode_ack, decode_cells,
    decode_columns, decode_dump, decode_shape, encode_columns, is_queued,
};
pub use schema::{ColumnType, TypedColumn};
pub use value::{GridValue, TIMESTAMP_FORMAT};

// Table storage
#[cfg(feature = "dataframe")]
pub use io::table::{decode_record_batch, encode_record_batch};
