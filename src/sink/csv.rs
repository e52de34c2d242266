//! Delimited-text sink

use super::buffer::SharedBuffer;
use super::{connect_upload, header_names, Sink};
use crate::config::SinkConfig;
use crate::context::ExportContext;
use crate::destination::Destination;
use crate::error::{Error, Result, ResultExt};
use crate::types::{ColumnIndex, SinkState, Value};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::buffered::BufWriter;
use std::fmt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const ENCODE_BUFFER_CAPACITY: usize = 64 * 1024;

/// Streams rows as delimited text: one header line, then one line per row
pub struct CsvSink {
    state: SinkState,
    destination: Option<Destination>,
    delimiter: u8,
    upload: Option<BufWriter>,
    encoder: Option<::csv::Writer<SharedBuffer>>,
    buffer: SharedBuffer,
    headers_written: bool,
    rows_written: u64,
}

impl CsvSink {
    /// Create an unopened sink
    pub fn new() -> Self {
        Self {
            state: SinkState::Created,
            destination: None,
            delimiter: crate::config::DEFAULT_DELIMITER,
            upload: None,
            encoder: None,
            buffer: SharedBuffer::new(ENCODE_BUFFER_CAPACITY),
            headers_written: false,
            rows_written: 0,
        }
    }

    /// Parsed destination (after open)
    pub fn destination(&self) -> Option<&Destination> {
        self.destination.as_ref()
    }

    /// Field delimiter in use
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    async fn try_open(
        &mut self,
        ctx: &ExportContext,
        destination: &str,
        config: &SinkConfig,
    ) -> Result<()> {
        self.delimiter = config.delimiter_byte()?;
        let destination = Destination::parse(destination)?;
        debug!(
            delimiter = %char::from(self.delimiter).escape_default(),
            acl = ?config.acl,
            "CSV sink configuration"
        );

        let upload = connect_upload(ctx, &destination, config, config.region.as_deref()).await?;

        let encoder = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .terminator(::csv::Terminator::Any(b'\n'))
            .from_writer(self.buffer.clone());

        info!(
            bucket = destination.bucket(),
            key = destination.key(),
            "Opened CSV export"
        );
        self.upload = Some(upload);
        self.encoder = Some(encoder);
        self.destination = Some(destination);
        Ok(())
    }

    async fn write_row(&mut self, row: &[Value], column_index: &ColumnIndex) -> Result<()> {
        let (Some(upload), Some(encoder)) = (self.upload.as_mut(), self.encoder.as_mut()) else {
            return Err(Error::write("nil writer, open call must have failed"));
        };

        if !self.headers_written {
            let separator = char::from(self.delimiter).to_string();
            let header = header_names(column_index).join(&separator) + "\n";
            upload
                .write_all(header.as_bytes())
                .await
                .write_context("Failed to write header")?;
            self.headers_written = true;
        }

        let fields: Vec<String> = row.iter().map(Value::to_text).collect();
        let encoded = if fields.iter().all(String::is_empty) && fields.len() <= 1 {
            // The encoder would quote a lone empty field as `""`
            Bytes::from_static(b"\n")
        } else {
            encoder.write_record(&fields)?;
            encoder.flush()?;
            self.buffer.take()
        };
        upload
            .write_all(&encoded)
            .await
            .write_context("Failed to write row")?;
        self.rows_written += 1;
        Ok(())
    }
}

impl Default for CsvSink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CsvSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvSink")
            .field("state", &self.state)
            .field("destination", &self.destination)
            .field("delimiter", &char::from(self.delimiter))
            .field("headers_written", &self.headers_written)
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Sink for CsvSink {
    async fn open(
        &mut self,
        ctx: &ExportContext,
        destination: &str,
        config: &SinkConfig,
    ) -> Result<()> {
        if self.state != SinkState::Created {
            return Err(Error::config("CSV sink has already been opened"));
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

    async fn next(&mut self, row: &[Value], column_index: &ColumnIndex) -> Result<()> {
        match self.state {
            SinkState::Closed => return Err(Error::write("CSV sink is closed")),
            SinkState::Failed if self.upload.is_some() => {
                return Err(Error::write("CSV sink has failed, close it to abort the upload"));
            }
            _ => {}
        }
        let result = self.write_row(row, column_index).await;
        if result.is_err() {
            self.state = SinkState::Failed;
        }
        result
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut upload) = self.upload.take() else {
            return Ok(());
        };
        self.encoder = None;

        if self.state == SinkState::Failed {
            warn!(
                destination = ?self.destination,
                rows = self.rows_written,
                "Aborting CSV export after failure"
            );
            return upload
                .abort()
                .await
                .finalize_context("Failed to abort upload");
        }

        let remaining = self.buffer.take();
        let result = async {
            if !remaining.is_empty() {
                upload.write_all(&remaining).await?;
            }
            upload.shutdown().await
        }
        .await
        .finalize_context("Failed to complete upload");

        match result {
            Ok(()) => {
                self.state = SinkState::Closed;
                info!(
                    destination = ?self.destination.as_ref().map(ToString::to_string),
                    rows = self.rows_written,
                    "CSV export complete"
                );
                Ok(())
            }
            Err(e) => {
                self.state = SinkState::Failed;
                Err(e)
            }
        }
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
