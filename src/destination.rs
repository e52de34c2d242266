//! Export destination parsing
//!
//! Splits `s3://bucket/key` into its bucket and object key.

use crate::error::{Error, Result};
use object_store::path::Path;
use std::fmt;

const SCHEME: &str = "s3://";

/// Parsed export destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    bucket: String,
    key: String,
    path: Path,
}

impl Destination {
    /// Parse a destination path.
    ///
    /// The `s3://` scheme is matched case-insensitively and is optional.
    /// Everything before the first `/` is the bucket, everything after it
    /// is the object key; both must be non-empty. The key is used verbatim:
    /// one the object store cannot address exactly (empty segments, `.` or
    /// `..` segments, control characters, a trailing `/`) is rejected.
    pub fn parse(path: &str) -> Result<Self> {
        let rest = match path.get(..SCHEME.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME) => &path[SCHEME.len()..],
            _ => path,
        };

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));

        if bucket.is_empty() {
            return Err(Error::MissingBucket {
                path: path.to_string(),
            });
        }
        if key.is_empty() {
            return Err(Error::MissingKey {
                path: path.to_string(),
            });
        }

        let object_path = Path::parse(key)
            .map_err(|e| Error::invalid_value("destination", format!("bad object key '{key}': {e}")))?;
        if object_path.as_ref() != key {
            return Err(Error::invalid_value(
                "destination",
                format!("object key '{key}' would be stored as '{object_path}'"),
            ));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            path: object_path,
        })
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key within the bucket
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Object key as an object store path
    pub fn object_path(&self) -> Path {
        self.path.clone()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}", self.bucket, self.key)
    }
}
