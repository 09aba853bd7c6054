//! Pipeline and transaction support for batched grid commands.
//!
//! [`GridPipeline`] queues grid module commands and sends them in a single
//! round-trip. Every reply is decoded by the codec according to the command
//! that produced it.
//!
//! ```ignore
//! use redis_grid::client::pipeline::GridPipeline;
//!
//! let mut pipe = GridPipeline::new();
//! pipe.dim("a1", 2, 2, ["a", "b", "c", "d"])?
//!     .shape("a1")
//!     .dump("a1");
//!
//! let results = pipe.execute(&mut conn).await?;
//! assert!(results.all_succeeded());
//! ```
//!
//! # Transactions
//!
//! [`GridPipeline::atomic`] wraps the queued commands in MULTI/EXEC.

use redis::{ErrorKind, RedisError, Value};
use redis::aio::ConnectionLike;

use crate::args::{GridIndex, RangeBounds};
use crate::client::grid::{dim_command, key_command, range_command, set_command};
use crate::codec::{
    Ack, Cell, DumpReply, Grid, decode_ack, decode_cells, decode_dump, decode_shape,
};
use crate::error::{Error, Result};
use crate::value::GridValue;

/// Decoded reply of a single pipelined command.
#[derive(Debug, Clone, PartialEq)]
pub enum GridReply {
    /// Reply of `GRID.DIM` or `GRID.SET`.
    Ack,
    /// Reply of `GRID.SHAPE`.
    Shape(usize, usize),
    /// Reply of `GRID.DUMP`, or of `GRID.RANGE` with absolute bounds.
    Grid(Grid),
    /// Reply of `GRID.RANGE` with negative bounds, in reply order.
    Cells(Vec<Cell>),
    /// The command was queued by the server instead of executed.
    Queued,
    /// The command failed.
    Error(String),
}

impl GridReply {
    /// Check if the reply is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, GridReply::Error(_))
    }

    /// Get the grid if this is a dump or range reply.
    pub fn as_grid(&self) -> Option<&Grid> {
        match self {
            GridReply::Grid(grid) => Some(grid),
            _ => None,
        }
    }

    /// Get the shape if this is a shape reply.
    pub fn as_shape(&self) -> Option<(usize, usize)> {
        match self {
            GridReply::Shape(rows, columns) => Some((*rows, *columns)),
            _ => None,
        }
    }
}

/// Result of executing a pipeline.
#[derive(Debug)]
pub struct PipelineResult {
    /// Results for each command in order.
    pub results: Vec<GridReply>,
    /// Number of commands that succeeded.
    pub succeeded: usize,
    /// Number of commands that failed.
    pub failed: usize,
}

impl PipelineResult {
    fn empty() -> Self {
        Self {
            results: Vec::new(),
            succeeded: 0,
            failed: 0,
        }
    }

    /// Check if all commands succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Get the result at a specific index.
    pub fn get(&self, index: usize) -> Option<&GridReply> {
        self.results.get(index)
    }

    /// Iterate over results.
    pub fn iter(&self) -> impl Iterator<Item = &GridReply> {
        self.results.iter()
    }
}

/// How to decode the reply of a queued command.
#[derive(Debug, Clone, Copy)]
enum ReplyKind {
    Ack,
    Shape,
    Dump,
    Range(Option<(usize, usize)>),
}

#[derive(Clone)]
struct QueuedCommand {
    cmd: redis::Cmd,
    kind: ReplyKind,
}

/// Pipeline for batching grid commands.
#[derive(Clone, Default)]
pub struct GridPipeline {
    commands: Vec<QueuedCommand>,
    atomic: bool,
}

impl GridPipeline {
    /// Create an empty, non-atomic pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute the queued commands inside MULTI/EXEC.
    pub fn atomic(&mut self) -> &mut Self {
        self.atomic = true;
        self
    }

    /// Get the number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Clear all queued commands.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    fn push(&mut self, cmd: redis::Cmd, kind: ReplyKind) -> &mut Self {
        self.commands.push(QueuedCommand { cmd, kind });
        self
    }

    /// Queue a `GRID.DIM` command.
    pub fn dim<I>(
        &mut self,
        key: &str,
        rows: impl GridIndex,
        columns: impl GridIndex,
        values: I,
    ) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<GridValue>,
    {
        let cmd = dim_command(key, rows, columns, values)?;
        Ok(self.push(cmd, ReplyKind::Ack))
    }

    /// Queue a `GRID.SET` command.
    pub fn set<I>(
        &mut self,
        key: &str,
        row_start: impl GridIndex,
        row_end: impl GridIndex,
        column_start: impl GridIndex,
        column_end: impl GridIndex,
        values: I,
    ) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<GridValue>,
    {
        let bounds = RangeBounds::new(row_start, row_end, column_start, column_end)?;
        let cmd = set_command(key, bounds, values)?;
        Ok(self.push(cmd, ReplyKind::Ack))
    }

    /// Queue a `GRID.RANGE` command.
    ///
    /// Negative bounds are not resolved here; their reply comes back as
    /// [`GridReply::Cells`].
    pub fn range(
        &mut self,
        key: &str,
        row_start: impl GridIndex,
        row_end: impl GridIndex,
        column_start: impl GridIndex,
        column_end: impl GridIndex,
    ) -> Result<&mut Self> {
        let bounds = RangeBounds::new(row_start, row_end, column_start, column_end)?;
        Ok(self.push(range_command(key, bounds), ReplyKind::Range(bounds.spans())))
    }

    /// Queue a `GRID.SHAPE` command.
    pub fn shape(&mut self, key: &str) -> &mut Self {
        self.push(key_command("GRID.SHAPE", key), ReplyKind::Shape)
    }

    /// Queue a `GRID.DUMP` command.
    pub fn dump(&mut self, key: &str) -> &mut Self {
        self.push(key_command("GRID.DUMP", key), ReplyKind::Dump)
    }

    /// Execute all queued commands and return their decoded replies.
    ///
    /// The queue is drained whether or not the round-trip succeeds.
    pub async fn execute<C>(&mut self, conn: &mut C) -> Result<PipelineResult>
    where
        C: ConnectionLike + Send,
    {
        if self.commands.is_empty() {
            return Ok(PipelineResult::empty());
        }

        let commands = std::mem::take(&mut self.commands);

        let mut pipe = redis::pipe();
        if self.atomic {
            pipe.atomic();
        }
        for queued in &commands {
            pipe.add_command(queued.cmd.clone());
        }

        tracing::debug!(
            commands = commands.len(),
            atomic = self.atomic,
            "executing grid pipeline"
        );
        // Sent packed rather than through `query_async`, which turns the
        // first in-band server error into an error for the whole batch.
        let values = if self.atomic {
            let reply = conn
                .req_packed_commands(&pipe, commands.len() + 1, 1)
                .await
                .map_err(Error::Connection)?;
            unwrap_exec_reply(reply)?
        } else {
            conn.req_packed_commands(&pipe, 0, commands.len())
                .await
                .map_err(Error::Connection)?
        };

        if values.len() != commands.len() {
            return Err(Error::MalformedReply(format!(
                "pipeline sent {} commands but got {} replies",
                commands.len(),
                values.len()
            )));
        }

        let mut result = PipelineResult::empty();
        for (queued, value) in commands.iter().zip(values) {
            let reply = decode_reply(queued.kind, value);
            if reply.is_error() {
                result.failed += 1;
            } else {
                result.succeeded += 1;
            }
            result.results.push(reply);
        }
        Ok(result)
    }
}

/// Extract the per-command replies from the reply to EXEC.
fn unwrap_exec_reply(mut reply: Vec<Value>) -> Result<Vec<Value>> {
    match reply.pop() {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Nil) => Err(Error::MalformedReply(
            "transaction was aborted, EXEC returned nil".to_string(),
        )),
        Some(Value::ServerError(err)) => Err(Error::Connection(RedisError::from((
            ErrorKind::ExecAbortError,
            "transaction was aborted",
            server_error_message(err.code(), err.details()),
        )))),
        other => Err(Error::MalformedReply(format!(
            "expected the EXEC reply array, got {:?}",
            other
        ))),
    }
}

// `redis::ServerError` is not re-exported by redis 0.32, so take its parts.
fn server_error_message(code: &str, details: Option<&str>) -> String {
    match details {
        Some(details) => format!("{} {}", code, details),
        None => code.to_string(),
    }
}

fn decode_reply(kind: ReplyKind, value: Value) -> GridReply {
    if let Value::ServerError(err) = &value {
        return GridReply::Error(server_error_message(err.code(), err.details()));
    }

    let decoded = match kind {
        ReplyKind::Ack => decode_ack(value).map(|ack| match ack {
            Ack::Ok => GridReply::Ack,
            Ack::Queued => GridReply::Queued,
        }),
        ReplyKind::Shape => decode_shape(value).map(|(rows, columns)| GridReply::Shape(rows, columns)),
        ReplyKind::Dump => decode_dump(value).map(|dump| match dump {
            DumpReply::Grid(grid) => GridReply::Grid(grid),
            DumpReply::Queued(_) => GridReply::Queued,
        }),
        ReplyKind::Range(spans) => decode_cells(value).and_then(|cells| match spans {
            Some((rows, columns)) => Grid::from_cells(rows, columns, cells).map(GridReply::Grid),
            None => Ok(GridReply::Cells(cells)),
        }),
    };

    decoded.unwrap_or_else(|e| GridReply::Error(e.to_string()))
}
