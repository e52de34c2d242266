//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Export query results to S3 as delimited text or Parquet
#[derive(Parser, Debug)]
#[command(name = "export-sink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream JSON Lines rows into an export sink
    Export(ExportArgs),

    /// Print the Parquet column schema derived from a projection
    Schema {
        /// Projected columns (`name:type,...`)
        #[arg(long)]
        columns: String,
    },
}

/// Arguments of the `export` command.
///
/// Flags override values loaded from `--config`.
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Destination (`s3://bucket/key`)
    #[arg(long)]
    pub to: String,

    /// JSON Lines input, one object per row
    #[arg(short, long)]
    pub input: PathBuf,

    /// Projected columns (`name:type,...`)
    #[arg(long)]
    pub columns: String,

    /// Sink configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format (`parquet` or anything else for CSV)
    #[arg(short, long)]
    pub format: Option<String>,

    /// CSV field delimiter
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Role to assume before writing
    #[arg(long)]
    pub assume_role_arn: Option<String>,

    /// Canned ACL for the object
    #[arg(long)]
    pub acl: Option<String>,

    /// KMS key id for server-side encryption
    #[arg(long)]
    pub sse_kms_key_id: Option<String>,

    /// Storage region
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3 endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Allow plain HTTP to the endpoint
    #[arg(long)]
    pub allow_http: bool,
}
