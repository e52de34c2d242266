//! CLI module
//!
//! Command-line front end for driving an export outside a query engine.
//!
//! # Commands
//!
//! - `export` - Stream JSON Lines rows into a sink
//! - `schema` - Print the Parquet schema derived from a projection

mod commands;
mod runner;

pub use commands::{Cli, Commands, ExportArgs};
pub use runner::{export_rows, read_rows, row_from_json, ExportSummary, Runner};
