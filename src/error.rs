//! Error types for the export sink
//!
//! Every public API returns `Result<T, Error>` with the error defined here.
//! Variants are grouped by the phase of the export that raises them, and
//! [`Error::kind`] collapses them into the four kinds callers act on.

use thiserror::Error;

/// The main error type for the export sink
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// General configuration problem
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// Destination has no bucket
    #[error("No bucket specified in destination '{path}'")]
    MissingBucket {
        /// The destination as given
        path: String,
    },

    /// Destination has no object key
    #[error("No object key specified in destination '{path}'")]
    MissingKey {
        /// The destination as given
        path: String,
    },

    /// A parameter is present but unusable
    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue {
        /// Parameter name
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// Malformed YAML config file
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Malformed JSON input
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Storage client could not be built
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    // ============================================================================
    // Credential Errors
    // ============================================================================
    /// Role assumption or credential retrieval failed
    #[error("Credential error: {message}")]
    Credential {
        /// What failed
        message: String,
    },

    // ============================================================================
    // Write Errors
    // ============================================================================
    /// A row or part could not be written
    #[error("Write error: {message}")]
    Write {
        /// What failed
        message: String,
    },

    /// Delimited encoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Building a record batch failed
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet encoding failed
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Reading input or writing to the upload failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Finalize Errors
    // ============================================================================
    /// Completing the object failed
    #[error("Finalize error: {message}")]
    Finalize {
        /// What failed
        message: String,
    },
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed destination or configuration; open never succeeds
    Config,
    /// Role assumption or credential retrieval failed; open never succeeds
    Credential,
    /// Writing a header, row or part failed
    Write,
    /// Completing or closing the remote object failed
    Finalize,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a credential error
    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
        }
    }

    /// Create a write error
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Create a finalize error
    pub fn finalize(message: impl Into<String>) -> Self {
        Self::Finalize {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config { .. }
            | Error::MissingBucket { .. }
            | Error::MissingKey { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::JsonParse(_)
            | Error::ObjectStore(_) => ErrorKind::Config,
            Error::Credential { .. } => ErrorKind::Credential,
            Error::Write { .. }
            | Error::Csv(_)
            | Error::Arrow(_)
            | Error::Parquet(_)
            | Error::Io(_) => ErrorKind::Write,
            Error::Finalize { .. } => ErrorKind::Finalize,
        }
    }
}

/// Result type alias for the export sink
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for turning foreign errors into a specific [`ErrorKind`]
pub trait ResultExt<T> {
    /// Map any error into a write error with context
    fn write_context(self, message: impl Into<String>) -> Result<T>;

    /// Map any error into a finalize error with context
    fn finalize_context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn write_context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::write(format!("{}: {e}", message.into())))
    }

    fn finalize_context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::finalize(format!("{}: {e}", message.into())))
    }
}
