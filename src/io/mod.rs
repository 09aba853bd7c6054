//! DataFrame I/O for grids.
//!
//! This module contains the functionality for storing Arrow RecordBatches
//! in the grid module and reading them back.
//!
//! ## Submodules
//!
//! - [`table`] - Column-oriented table layout over `GRID.DIM` / `GRID.DUMP`

#[cfg(feature = "dataframe")]
pub mod table;
