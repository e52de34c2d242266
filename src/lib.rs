// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Export Sink
//!
//! Streams the rows of a `SELECT ... INTO 's3://bucket/key'` statement into
//! a single S3 object, either as delimited text or as Parquet.
//!
//! ## Features
//!
//! - **CSV**: header line from the column index, configurable delimiter
//!   (tab by default), trimmed values
//! - **Parquet**: schema derived from the projection, Snappy compression,
//!   size-bounded row groups, dictionary-encoded string columns
//! - **Credentials**: ambient chain or an assumed role (STS), retrieved at open time
//! - **Object options**: canned ACL, SSE-KMS, region, custom endpoint
//! - **Streaming upload**: bounded-concurrency multipart upload, aborted on failure
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use export_sink::{column_index, sink, ExportContext, ProjectedColumn, SinkConfig, Sink, Value, ValueType};
//!
//! #[tokio::main]
//! async fn main() -> export_sink::Result<()> {
//!     let projection = vec![
//!         ProjectedColumn::new("name", ValueType::String),
//!         ProjectedColumn::new("age", ValueType::Int),
//!     ];
//!     let ctx = ExportContext::new(projection);
//!     let config = SinkConfig::new().with_format("parquet");
//!
//!     let mut sink = sink::create(&ctx, "s3://bucket/people.parquet", &config).await?;
//!     let index = column_index(ctx.projection());
//!     sink.next(&[Value::from("Alice"), Value::from(30)], &index).await?;
//!     sink.close().await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │            create(ctx, destination, config)                │
//! │        open ──► next(row, index)* ──► close                │
//! └────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────┬──────────────┴──┬──────────────┬────────────┐
//! │ Destination │   Credentials   │    Schema    │  Storage   │
//! ├─────────────┼─────────────────┼──────────────┼────────────┤
//! │ s3://b/key  │ Ambient         │ Integer64    │ S3 client  │
//! │             │ AssumeRole/STS  │ Float64      │ ACL/SSE    │
//! │             │ cached provider │ Boolean      │ multipart  │
//! │             │                 │ Utf8String   │ upload     │
//! └─────────────┴─────────────────┴──────────────┴────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Sink configuration
pub mod config;

/// Destination parsing
pub mod destination;

/// Credential resolution and role assumption
pub mod credentials;

/// Object storage client and upload
pub mod storage;

/// Output schema derivation
pub mod schema;

/// Per-statement export context
pub mod context;

/// CSV and Parquet sinks
pub mod sink;

/// Command-line interface
pub mod cli;

#[cfg(test)]
mod test_util;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::SinkConfig;
pub use context::ExportContext;
pub use destination::Destination;
pub use error::{Error, ErrorKind, Result};
pub use sink::{create, CsvSink, ExportSink, ParquetSink, Sink};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
