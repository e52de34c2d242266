//! Export sinks
//!
//! A sink receives the ordered rows of one `SELECT ... INTO` statement and
//! streams them into object storage.
//!
//! # Lifecycle
//!
//! ```text
//! create ─► open ─► next* ─► close
//!   │        │        │        │
//!   │   Created→Open  │   Open→Closed
//!   └─ any open/next failure → Failed (close aborts the upload)
//! ```
//!
//! Two variants exist: [`CsvSink`] (delimited text) and [`ParquetSink`]
//! (columnar). [`create`] picks one from the configured format and opens it.

mod buffer;
mod csv;
mod parquet;

pub use self::csv::CsvSink;
pub use self::parquet::ParquetSink;

use crate::config::SinkConfig;
use crate::context::ExportContext;
use crate::credentials;
use crate::destination::Destination;
use crate::error::Result;
use crate::schema::ColumnSchema;
use crate::storage::{self, StoreRequest};
use crate::types::{ColumnIndex, OutputFormat, SinkState, Value};
use async_trait::async_trait;
use object_store::buffered::BufWriter;
use tracing::{debug, error};

/// The capability shared by all sink variants
#[async_trait]
pub trait Sink: Send {
    /// Parse the destination, resolve credentials and open the upload
    async fn open(
        &mut self,
        ctx: &ExportContext,
        destination: &str,
        config: &SinkConfig,
    ) -> Result<()>;

    /// Write one row. The column index is fixed by the first call. Rows are
    /// refused once the sink is closed or has failed.
    async fn next(&mut self, row: &[Value], column_index: &ColumnIndex) -> Result<()>;

    /// Flush, finalize and release the upload.
    ///
    /// Safe to call after a failed open and more than once.
    async fn close(&mut self) -> Result<()>;

    /// Drop the upload without committing an object. The sink ends `Failed`
    /// unless it was already closed.
    async fn abort(&mut self) -> Result<()>;

    /// Current lifecycle state
    fn state(&self) -> SinkState;

    /// Rows accepted so far
    fn rows_written(&self) -> u64;
}

/// A sink of either output format
#[derive(Debug)]
pub enum ExportSink {
    /// Delimited text
    Csv(CsvSink),
    /// Columnar Parquet
    Parquet(ParquetSink),
}

impl ExportSink {
    /// Unopened sink for a format
    pub fn for_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => ExportSink::Csv(CsvSink::new()),
            OutputFormat::Parquet => ExportSink::Parquet(ParquetSink::new()),
        }
    }

    /// Output format of this sink
    pub fn format(&self) -> OutputFormat {
        match self {
            ExportSink::Csv(_) => OutputFormat::Csv,
            ExportSink::Parquet(_) => OutputFormat::Parquet,
        }
    }

    /// Derived column schema (Parquet only, after open)
    pub fn schema(&self) -> Option<&ColumnSchema> {
        match self {
            ExportSink::Csv(_) => None,
            ExportSink::Parquet(sink) => sink.schema(),
        }
    }

    /// Parsed destination (after open)
    pub fn destination(&self) -> Option<&Destination> {
        match self {
            ExportSink::Csv(sink) => sink.destination(),
            ExportSink::Parquet(sink) => sink.destination(),
        }
    }
}

#[async_trait]
impl Sink for ExportSink {
    async fn open(
        &mut self,
        ctx: &ExportContext,
        destination: &str,
        config: &SinkConfig,
    ) -> Result<()> {
        match self {
            ExportSink::Csv(sink) => sink.open(ctx, destination, config).await,
            ExportSink::Parquet(sink) => sink.open(ctx, destination, config).await,
        }
    }

    async fn next(&mut self, row: &[Value], column_index: &ColumnIndex) -> Result<()> {
        match self {
            ExportSink::Csv(sink) => sink.next(row, column_index).await,
            ExportSink::Parquet(sink) => sink.next(row, column_index).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            ExportSink::Csv(sink) => sink.close().await,
            ExportSink::Parquet(sink) => sink.close().await,
        }
    }

    async fn abort(&mut self) -> Result<()> {
        match self {
            ExportSink::Csv(sink) => sink.abort().await,
            ExportSink::Parquet(sink) => sink.abort().await,
        }
    }

    fn state(&self) -> SinkState {
        match self {
            ExportSink::Csv(sink) => sink.state(),
            ExportSink::Parquet(sink) => sink.state(),
        }
    }

    fn rows_written(&self) -> u64 {
        match self {
            ExportSink::Csv(sink) => sink.rows_written(),
            ExportSink::Parquet(sink) => sink.rows_written(),
        }
    }
}

/// Create and open a sink for `destination`.
///
/// `config.format == "parquet"` selects Parquet, anything else CSV. The
/// sink is only returned once open succeeded.
pub async fn create(
    ctx: &ExportContext,
    destination: &str,
    config: &SinkConfig,
) -> Result<ExportSink> {
    let format = config.output_format();
    debug!(%format, destination, "Creating export sink");

    let mut sink = ExportSink::for_format(format);
    if let Err(e) = sink.open(ctx, destination, config).await {
        error!(%format, destination, error = %e, "Failed to open export sink");
        return Err(e);
    }
    Ok(sink)
}

/// Resolve credentials, connect to storage and open the upload stream
pub(crate) async fn connect_upload(
    ctx: &ExportContext,
    destination: &Destination,
    config: &SinkConfig,
    region: Option<&str>,
) -> Result<BufWriter> {
    let credentials = credentials::resolve(config.role_arn(), ctx.assumer().clone()).await?;

    let request = StoreRequest {
        destination,
        region,
        credentials: &credentials,
        acl: config.acl.as_deref(),
        sse_kms_key_id: config.sse_kms_key_id.as_deref(),
        endpoint: config.endpoint.as_deref(),
        allow_http: config.allow_http,
    };
    let store = ctx.connector().connect(&request)?;
    Ok(storage::open_upload(store, destination))
}

/// Column names ordered by their position in the index
pub(crate) fn header_names(column_index: &ColumnIndex) -> Vec<&str> {
    let mut columns: Vec<(&str, usize)> = column_index
        .iter()
        .map(|(name, pos)| (name.as_str(), *pos))
        .collect();
    columns.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    columns.into_iter().map(|(name, _)| name).collect()
}
