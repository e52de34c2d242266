//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, ExportArgs};
use crate::config::SinkConfig;
use crate::context::ExportContext;
use crate::credentials::RoleAssumer;
use crate::error::{Error, Result};
use crate::schema::ColumnSchema;
use crate::sink::{self, Sink};
use crate::storage::StoreConnector;
use crate::types::{column_index, parse_columns, OutputFormat, ProjectedColumn, Value};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Result of one export, printed as a JSON line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Normalized destination URL
    pub destination: String,
    /// Format that was written
    pub format: OutputFormat,
    /// Rows accepted by the sink
    pub rows: u64,
}

/// CLI runner
#[derive(Debug)]
pub struct Runner {
    cli: Cli,
    connector: Option<Arc<dyn StoreConnector>>,
    assumer: Option<Arc<dyn RoleAssumer>>,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            connector: None,
            assumer: None,
        }
    }

    /// Use this storage connector instead of S3
    #[must_use]
    pub fn with_store_connector(mut self, connector: Arc<dyn StoreConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Use this role assumer instead of STS
    #[must_use]
    pub fn with_role_assumer(mut self, assumer: Arc<dyn RoleAssumer>) -> Self {
        self.assumer = Some(assumer);
        self
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Export(args) => {
                let summary = self.export(args).await?;
                Self::output_message(&summary)
            }
            Commands::Schema { columns } => {
                let schema = Self::schema(columns)?;
                Self::output_message(&schema)
            }
        }
    }

    /// Run the `export` command
    pub async fn export(&self, args: &ExportArgs) -> Result<ExportSummary> {
        let config = Self::build_config(args)?;
        let columns = parse_columns(&args.columns)?;
        if columns.is_empty() {
            return Err(Error::config("No columns specified (use --columns)"));
        }
        info!(
            input = %args.input.display(),
            columns = columns.len(),
            "Streaming input rows"
        );

        let ctx = self.context(columns);
        let rows = read_rows(&args.input, ctx.projection())?;
        export_rows(&ctx, &args.to, &config, rows).await
    }

    /// Run the `schema` command
    pub fn schema(columns: &str) -> Result<ColumnSchema> {
        let columns = parse_columns(columns)?;
        Ok(ColumnSchema::derive(&columns))
    }

    /// Sink configuration: the config file first, then flag overrides
    pub fn build_config(args: &ExportArgs) -> Result<SinkConfig> {
        let mut config = match &args.config {
            Some(path) => SinkConfig::from_file(path)?,
            None => SinkConfig::new(),
        };

        override_with(&mut config.format, &args.format);
        override_with(&mut config.delimiter, &args.delimiter);
        override_with(&mut config.assume_role_arn, &args.assume_role_arn);
        override_with(&mut config.acl, &args.acl);
        override_with(&mut config.sse_kms_key_id, &args.sse_kms_key_id);
        override_with(&mut config.region, &args.region);
        override_with(&mut config.endpoint, &args.endpoint);
        config.allow_http |= args.allow_http;

        Ok(config)
    }

    fn context(&self, columns: Vec<ProjectedColumn>) -> ExportContext {
        let mut ctx = ExportContext::new(columns);
        if let Some(connector) = &self.connector {
            ctx = ctx.with_store_connector(connector.clone());
        }
        if let Some(assumer) = &self.assumer {
            ctx = ctx.with_role_assumer(assumer.clone());
        }
        ctx
    }

    /// Output a message
    fn output_message<T: Serialize>(msg: &T) -> Result<()> {
        println!("{}", serde_json::to_string(msg)?);
        Ok(())
    }
}

fn override_with(target: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

/// Drive one sink through open, every row and close.
///
/// A failing row (from the input or from the sink) aborts the upload, so no
/// partial object is committed, and that error is returned.
pub async fn export_rows<I>(
    ctx: &ExportContext,
    destination: &str,
    config: &SinkConfig,
    rows: I,
) -> Result<ExportSummary>
where
    I: IntoIterator<Item = Result<Vec<Value>>>,
{
    let start = Instant::now();
    let mut sink = sink::create(ctx, destination, config).await?;
    let index = column_index(ctx.projection());

    for row in rows {
        let result = match row {
            Ok(row) => sink.next(&row, &index).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            if let Err(abort_err) = sink.abort().await {
                warn!(error = %abort_err, "Failed to abort export after row error");
            }
            return Err(e);
        }
    }
    sink.close().await?;

    let summary = ExportSummary {
        destination: sink
            .destination()
            .map_or_else(|| destination.to_string(), ToString::to_string),
        format: sink.format(),
        rows: sink.rows_written(),
    };
    info!(
        destination = %summary.destination,
        format = %summary.format,
        rows = summary.rows,
        duration_ms = start.elapsed().as_millis() as u64,
        "Export finished"
    );
    Ok(summary)
}

/// Stream a JSON Lines file as rows ordered by `columns`.
///
/// The file is opened eagerly; lines are read and decoded one at a time.
/// Blank lines are skipped.
pub fn read_rows<'a>(
    path: &Path,
    columns: &'a [ProjectedColumn],
) -> Result<impl Iterator<Item = Result<Vec<Value>>> + 'a> {
    let file = File::open(path).map_err(|e| {
        Error::config(format!("Failed to read input file {}: {e}", path.display()))
    })?;

    let rows = BufReader::new(file)
        .lines()
        .enumerate()
        .filter_map(move |(n, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(
                serde_json::from_str(&line)
                    .map_err(Error::from)
                    .and_then(|value| row_from_json(value, columns))
                    .map_err(|e| Error::invalid_value("input", format!("line {}: {e}", n + 1))),
            ),
            Err(e) => Some(Err(Error::from(e))),
        });
    Ok(rows)
}

/// Map a JSON object to a row; missing fields become null
pub fn row_from_json(value: serde_json::Value, columns: &[ProjectedColumn]) -> Result<Vec<Value>> {
    let serde_json::Value::Object(object) = value else {
        return Err(Error::write("expected a JSON object"));
    };
    Ok(columns
        .iter()
        .map(|col| object.get(&col.name).cloned().map_or(Value::Null, Value::from))
        .collect())
}
