//! Common utilities for integration tests.
//!
//! Most tests drive the clients through [`MockConnection`], a scripted
//! in-memory connection that records every command and answers with
//! canned replies. Tests marked `#[ignore]` talk to a real Redis with the
//! grid module loaded.
//!
//! ## Environment Variables
//!
//! - `REDIS_URL`: Redis connection URL for live tests (default:
//!   `redis://localhost:6379`)

#![allow(dead_code)]

use std::collections::VecDeque;

use redis::aio::ConnectionLike;
use redis::{Cmd, ErrorKind, Pipeline, RedisError, RedisFuture, RedisResult, Value};

/// Redis URL for live tests.
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

/// Unique key for a live test, so parallel tests do not collide.
pub fn test_key(name: &str) -> String {
    format!("redis_grid_test:{}:{}", name, std::process::id())
}

/// Scripted connection returning queued replies in order.
#[derive(Default)]
pub struct MockConnection {
    replies: VecDeque<RedisResult<Value>>,
    /// Every command received, as its arguments rendered to strings.
    pub sent: Vec<Vec<String>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next command.
    pub fn reply(mut self, value: Value) -> Self {
        self.replies.push_back(Ok(value));
        self
    }

    /// Queue a server error for the next command.
    pub fn fail(mut self, message: &'static str) -> Self {
        self.replies
            .push_back(Err(RedisError::from((ErrorKind::ResponseError, message))));
        self
    }

    /// Names of the commands received, in order.
    pub fn command_names(&self) -> Vec<&str> {
        self.sent.iter().map(|args| args[0].as_str()).collect()
    }

    fn record(&mut self, cmd: &Cmd) {
        let args = cmd
            .args_iter()
            .map(|arg| match arg {
                redis::Arg::Simple(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                redis::Arg::Cursor => "<cursor>".to_string(),
            })
            .collect();
        self.sent.push(args);
    }

    fn next_reply(&mut self) -> RedisResult<Value> {
        self.replies.pop_front().unwrap_or_else(|| {
            Err(RedisError::from((
                ErrorKind::ClientError,
                "mock connection has no reply left",
            )))
        })
    }
}

impl ConnectionLike for MockConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        self.record(cmd);
        let reply = self.next_reply();
        Box::pin(async move { reply })
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        pipeline: &'a Pipeline,
        offset: usize,
        _count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        let mut replies = Vec::new();
        let mut failure = None;
        for cmd in pipeline.cmd_iter() {
            self.record(cmd);
            match self.next_reply() {
                Ok(value) => replies.push(value),
                Err(e) => failure = failure.or(Some(e)),
            }
        }

        // A non-zero offset means MULTI/EXEC; the server answers the whole
        // transaction with a single EXEC array.
        let result = match failure {
            Some(e) => Err(e),
            None if offset > 0 => Ok(vec![Value::Array(replies)]),
            None => Ok(replies),
        };
        Box::pin(async move { result })
    }

    fn get_db(&self) -> i64 {
        0
    }
}

/// Bulk string reply.
pub fn bulk(s: &str) -> Value {
    Value::BulkString(s.as_bytes().to_vec())
}

/// `GRID.DUMP` reply for the given shape and cells.
pub fn dump_reply(rows: i64, columns: i64, cells: &[&str]) -> Value {
    let mut items = vec![Value::Int(rows), Value::Int(columns)];
    items.extend(cells.iter().map(|c| bulk(c)));
    Value::Array(items)
}

/// `GRID.RANGE` reply holding the given cells.
pub fn range_reply(cells: &[&str]) -> Value {
    Value::Array(cells.iter().map(|c| bulk(c)).collect())
}

/// `GRID.SHAPE` reply.
pub fn shape_reply(rows: i64, columns: i64) -> Value {
    Value::Array(vec![Value::Int(rows), Value::Int(columns)])
}

/// Queued sentinel, as sent inside MULTI.
pub fn queued() -> Value {
    Value::SimpleString("QUEUED".to_string())
}

/// In-band error reply, as the server sends for one failed command.
pub fn server_error(message: &str) -> Value {
    redis::parse_redis_value(format!("-{}\r\n", message).as_bytes())
        .unwrap_or_else(|e| panic!("invalid error reply '{}': {}", message, e))
}
