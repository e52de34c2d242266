//! Columnar (Parquet) sink
//!
//! Rows are collected into string column builders, handed to the Parquet
//! writer in batches, and the encoded bytes are streamed to the upload as
//! row groups complete. Row groups are cut by size, not row count.

use super::buffer::SharedBuffer;
use super::{connect_upload, Sink};
use crate::config::{SinkConfig, ROW_BATCH_SIZE, ROW_GROUP_SIZE_BYTES};
use crate::context::ExportContext;
use crate::destination::Destination;
use crate::error::{Error, Result, ResultExt};
use crate::schema::ColumnSchema;
use crate::types::{ColumnIndex, SinkState, Value};
use ::parquet::arrow::ArrowWriter;
use ::parquet::basic::Compression;
use ::parquet::file::properties::WriterProperties;
use ::parquet::schema::types::ColumnPath;
use arrow::array::{ArrayRef, StringBuilder};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use object_store::buffered::BufWriter;
use std::fmt;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

const STAGING_BUFFER_CAPACITY: usize = 8 * 1024 * 1024;

/// Streams rows into a Snappy-compressed Parquet file
pub struct ParquetSink {
    state: SinkState,
    destination: Option<Destination>,
    schema: Option<ColumnSchema>,
    arrow_schema: Option<SchemaRef>,
    writer: Option<ArrowWriter<SharedBuffer>>,
    buffer: SharedBuffer,
    builders: Vec<StringBuilder>,
    pending_rows: usize,
    upload: Option<BufWriter>,
    rows_written: u64,
}

impl ParquetSink {
    /// Create an unopened sink
    pub fn new() -> Self {
        Self {
            state: SinkState::Created,
            destination: None,
            schema: None,
            arrow_schema: None,
            writer: None,
            buffer: SharedBuffer::new(STAGING_BUFFER_CAPACITY),
            builders: Vec::new(),
            pending_rows: 0,
            upload: None,
            rows_written: 0,
        }
    }

    /// Derived column schema (after open)
    pub fn schema(&self) -> Option<&ColumnSchema> {
        self.schema.as_ref()
    }

    /// Parsed destination (after open)
    pub fn destination(&self) -> Option<&Destination> {
        self.destination.as_ref()
    }

    /// Writer properties: Snappy, size-bounded row groups, dictionary
    /// encoding on string columns only
    fn writer_properties(schema: &ColumnSchema) -> WriterProperties {
        let mut builder = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_max_row_group_size(usize::MAX)
            .set_dictionary_enabled(false);

        for col in schema.columns() {
            if col.column_type.is_dictionary_encoded() {
                builder = builder.set_column_dictionary_enabled(ColumnPath::from(col.name.clone()), true);
            }
        }

        builder.build()
    }

    async fn try_open(
        &mut self,
        ctx: &ExportContext,
        destination: &str,
        config: &SinkConfig,
    ) -> Result<()> {
        let destination = Destination::parse(destination)?;
        let region = config.region_or_default();
        info!(
            bucket = destination.bucket(),
            key = destination.key(),
            region,
            "Opening Parquet export"
        );
        debug!(
            acl = ?config.acl,
            sse_kms = config.sse_kms_key_id.is_some(),
            assume_role = ?config.role_arn(),
            "Parquet sink configuration"
        );

        let schema = ColumnSchema::derive(ctx.projection());
        if schema.is_empty() {
            return Err(Error::config("Parquet export needs at least one column"));
        }
        debug!(schema = ?schema.describe(), "Derived Parquet schema");

        let upload = connect_upload(ctx, &destination, config, Some(region)).await?;

        let arrow_schema = schema.to_arrow_schema();
        let writer = ArrowWriter::try_new(
            self.buffer.clone(),
            arrow_schema.clone(),
            Some(Self::writer_properties(&schema)),
        )
        .map_err(|e| Error::config(format!("Failed to create Parquet writer: {e}")))?;

        self.builders = (0..schema.len()).map(|_| StringBuilder::new()).collect();
        self.writer = Some(writer);
        self.arrow_schema = Some(arrow_schema);
        self.upload = Some(upload);
        self.schema = Some(schema);
        self.destination = Some(destination);
        Ok(())
    }

    async fn write_row(&mut self, row: &[Value]) -> Result<()> {
        if self.writer.is_none() || self.upload.is_none() {
            return Err(Error::write("nil writer, open call must have failed"));
        }
        if row.len() != self.builders.len() {
            return Err(Error::write(format!(
                "Row has {} values but the schema has {} columns",
                row.len(),
                self.builders.len()
            )));
        }

        for (builder, value) in self.builders.iter_mut().zip(row) {
            builder.append_value(value.to_text());
        }
        self.pending_rows += 1;
        self.rows_written += 1;

        if self.pending_rows >= ROW_BATCH_SIZE {
            self.write_pending()?;
            self.drain_to_upload().await?;
        }
        Ok(())
    }

    /// Hand buffered rows to the Parquet writer, cutting a row group when
    /// the in-progress size passes the target
    fn write_pending(&mut self) -> Result<()> {
        if self.pending_rows == 0 {
            return Ok(());
        }
        let (Some(writer), Some(schema)) = (self.writer.as_mut(), self.arrow_schema.as_ref()) else {
            return Err(Error::write("Parquet writer is not open"));
        };

        let columns: Vec<ArrayRef> = self
            .builders
            .iter_mut()
            .map(|b| Arc::new(b.finish()) as ArrayRef)
            .collect();
        let batch = RecordBatch::try_new(schema.clone(), columns)?;
        writer.write(&batch)?;
        self.pending_rows = 0;

        let in_progress_size = writer.in_progress_size();
        if in_progress_size > ROW_GROUP_SIZE_BYTES {
            debug!(
                in_progress_size,
                threshold = ROW_GROUP_SIZE_BYTES,
                rows = self.rows_written,
                "Flushing row group"
            );
            writer.flush()?;
        }
        Ok(())
    }

    /// Move encoded bytes from the staging buffer into the upload
    async fn drain_to_upload(&mut self) -> Result<()> {
        let encoded = self.buffer.take();
        if encoded.is_empty() {
            return Ok(());
        }
        let upload = self
            .upload
            .as_mut()
            .ok_or_else(|| Error::write("Upload is not open"))?;
        upload
            .write_all(&encoded)
            .await
            .write_context("Failed to write row group")
    }

    /// Write remaining rows, row groups and the footer
    async fn finalize(&mut self, upload: &mut BufWriter) -> Result<()> {
        self.write_pending()
            .map_err(|e| Error::finalize(format!("Failed to write final rows: {e}")))?;
        let writer = self
            .writer
            .take()
            .ok_or_else(|| Error::finalize("Parquet writer is not open"))?;
        let metadata = writer
            .close()
            .finalize_context("Failed to write Parquet footer")?;
        debug!(
            num_rows = metadata.num_rows,
            row_groups = metadata.row_groups.len(),
            "Parquet footer written"
        );

        let encoded = self.buffer.take();
        upload
            .write_all(&encoded)
            .await
            .finalize_context("Failed to write Parquet footer")?;
        upload
            .flush()
            .await
            .finalize_context("Failed to flush upload")
    }
}

impl Default for ParquetSink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParquetSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParquetSink")
            .field("state", &self.state)
            .field("destination", &self.destination)
            .field("schema", &self.schema)
            .field("pending_rows", &self.pending_rows)
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Sink for ParquetSink {
    async fn open(
        &mut self,
        ctx: &ExportContext,
        destination: &str,
        config: &SinkConfig,
    ) -> Result<()> {
        if self.state != SinkState::Created {
            return Err(Error::config("Parquet sink has already been opened"));
        }
        match self.try_open(ctx, destination, config).await {
            Ok(()) => {
                self.state = SinkState::Open;
                Ok(())
            }
            Err(e) => {
                self.state = SinkState::Failed;
                Err(e)
            }
        }
    }

    /// The column index is not consulted; values are written in schema order
    async fn next(&mut self, row: &[Value], _column_index: &ColumnIndex) -> Result<()> {
        match self.state {
            SinkState::Closed => return Err(Error::write("Parquet sink is closed")),
            SinkState::Failed if self.upload.is_some() => {
                return Err(Error::write("Parquet sink has failed, close it to abort the upload"));
            }
            _ => {}
        }
        let result = self.write_row(row).await;
        if result.is_err() {
            self.state = SinkState::Failed;
        }
        result
    }

    /// Finalize failures are returned. A failure completing the upload
    /// afterwards is logged only and does not change the result.
    async fn close(&mut self) -> Result<()> {
        let Some(mut upload) = self.upload.take() else {
            return Ok(());
        };

        if self.state == SinkState::Failed {
            self.writer = None;
            warn!(
                destination = ?self.destination,
                rows = self.rows_written,
                "Aborting Parquet export after failure"
            );
            return upload
                .abort()
                .await
                .finalize_context("Failed to abort upload");
        }

        if let Err(e) = self.finalize(&mut upload).await {
            self.state = SinkState::Failed;
            if let Err(abort_err) = upload.abort().await {
                warn!(error = %abort_err, "Failed to abort upload after finalize error");
            }
            return Err(e);
        }

        if let Err(e) = upload.shutdown().await {
            error!(
                destination = ?self.destination.as_ref().map(ToString::to_string),
                error = %e,
                "Parquet upload close error"
            );
        }
        self.state = SinkState::Closed;
        info!(
            destination = ?self.destination.as_ref().map(ToString::to_string),
            rows = self.rows_written,
            "Parquet file successfully written"
        );
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        if self.state != SinkState::Closed {
            self.state = SinkState::Failed;
        }
        self.close().await
    }

    fn state(&self) -> SinkState {
        self.state
    }

    fn rows_written(&self) -> u64 {
        self.rows_written
    }
}
