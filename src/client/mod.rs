//! Grid module clients.
//!
//! ## Submodules
//!
//! - [`grid`] - Async client, one method per module command
//! - [`blocking`] - Synchronous wrapper driving the async client
//! - [`pipeline`] - Batched and transactional grid commands

pub mod blocking;
pub mod grid;
pub mod pipeline;

pub use blocking::BlockingGridClient;
pub use grid::GridClient;
pub use pipeline::{GridPipeline, GridReply, PipelineResult};
