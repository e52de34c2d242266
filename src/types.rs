//! Common types used throughout the export sink
//!
//! Row values as they arrive from the executor, projection metadata from the
//! planner, and small enums shared by both sink variants.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Mapping from output column name to its position in a row
pub type ColumnIndex = HashMap<String, usize>;

/// Statement parameters as handed over by the planner (`WITH` options)
pub type ParamMap = HashMap<String, String>;

// ============================================================================
// Row Values
// ============================================================================

/// One value of an output row
#[derive(Clone)]
pub enum Value {
    /// Native or engine string value
    Text(String),
    /// Engine boolean value
    Boolean(bool),
    /// Any other value, rendered through its display form
    Other(Arc<dyn fmt::Display + Send + Sync>),
    /// SQL NULL
    Null,
}

impl Value {
    /// Wrap an arbitrary displayable value
    pub fn other<T: fmt::Display + Send + Sync + 'static>(value: T) -> Self {
        Value::Other(Arc::new(value))
    }

    /// Render the value as whitespace-trimmed text
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.trim().to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Other(v) => v.to_string().trim().to_string(),
            Value::Null => String::new(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Other(v) => f.debug_tuple("Other").field(&v.to_string()).finish(),
            Value::Null => f.write_str("Null"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Other(a), Value::Other(b)) => a.to_string() == b.to_string(),
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::other(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::other(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::other(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::other(n)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(ts: chrono::DateTime<chrono::Utc>) -> Self {
        Value::other(ts.to_rfc3339())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::other(other),
        }
    }
}

// ============================================================================
// Projection Metadata
// ============================================================================

/// Value type of a projected column, as reported by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Integer
    Int,
    /// Floating point
    Number,
    /// Boolean
    Bool,
    /// Text
    String,
    /// Timestamp
    Time,
    /// Raw bytes
    Bytes,
    /// List of strings
    Strings,
    /// Key/value map
    Map,
    /// List of values
    Slice,
    /// JSON document
    Json,
    /// Not reported by the planner
    #[default]
    Unknown,
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "bigint" | "long" => Ok(ValueType::Int),
            "number" | "float" | "double" | "decimal" => Ok(ValueType::Number),
            "bool" | "boolean" => Ok(ValueType::Bool),
            "string" | "text" | "varchar" => Ok(ValueType::String),
            "time" | "timestamp" | "datetime" => Ok(ValueType::Time),
            "bytes" | "binary" => Ok(ValueType::Bytes),
            "strings" => Ok(ValueType::Strings),
            "map" => Ok(ValueType::Map),
            "slice" | "array" => Ok(ValueType::Slice),
            "json" => Ok(ValueType::Json),
            "unknown" => Ok(ValueType::Unknown),
            other => Err(Error::invalid_value("column type", format!("unknown type '{other}'"))),
        }
    }
}

/// One column of the query projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedColumn {
    /// Output name (the `AS` alias when present)
    pub name: String,
    /// Planner value type
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
}

impl ProjectedColumn {
    /// Create a projected column
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

impl FromStr for ProjectedColumn {
    type Err = Error;

    /// Parse `name:type`; a bare `name` is a string column
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, ty)) if !name.trim().is_empty() => {
                Ok(Self::new(name.trim(), ty.parse()?))
            }
            None if !s.trim().is_empty() => Ok(Self::new(s.trim(), ValueType::String)),
            _ => Err(Error::invalid_value("columns", format!("bad column spec '{s}'"))),
        }
    }
}

/// Parse a comma-separated list of `name:type` column specs
pub fn parse_columns(spec: &str) -> Result<Vec<ProjectedColumn>, Error> {
    spec.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Build the column index for a projection (name -> position)
pub fn column_index(columns: &[ProjectedColumn]) -> ColumnIndex {
    columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.clone(), i))
        .collect()
}

// ============================================================================
// Output Format
// ============================================================================

/// Output encoding of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Delimited text (the default)
    #[default]
    Csv,
    /// Columnar Parquet
    Parquet,
}

impl OutputFormat {
    /// Select the format from the statement's `format` parameter.
    ///
    /// Only the exact string `parquet` selects Parquet.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("parquet") => OutputFormat::Parquet,
            _ => OutputFormat::Csv,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Parquet => write!(f, "parquet"),
        }
    }
}

// ============================================================================
// Sink Lifecycle
// ============================================================================

/// Lifecycle state of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkState {
    /// Not opened yet
    #[default]
    Created,
    /// Accepting rows
    Open,
    /// Object committed; terminal
    Closed,
    /// Open or a row failed; no further rows are accepted and close aborts
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_value_to_text_trims() {
        assert_eq!(Value::from("  Alice \t").to_text(), "Alice");
        assert_eq!(Value::Boolean(true).to_text(), "true");
        assert_eq!(Value::Boolean(false).to_text(), "false");
        assert_eq!(Value::from(30_i64).to_text(), "30");
        assert_eq!(Value::other(" padded ").to_text(), "padded");
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::from(2.5_f64).to_text(), "2.5");
    }

    #[test]
    fn test_value_from_json() {
        assert_eq!(Value::from(serde_json::json!("x")), Value::from("x"));
        assert_eq!(Value::from(serde_json::json!(true)), Value::Boolean(true));
        assert_eq!(Value::from(serde_json::Value::Null), Value::Null);
        assert_eq!(Value::from(serde_json::json!(42)).to_text(), "42");
        assert_eq!(
            Value::from(serde_json::json!({"a": 1})).to_text(),
            r#"{"a":1}"#
        );
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::from("a"));
    }

    #[test_case("int", ValueType::Int)]
    #[test_case("Integer", ValueType::Int)]
    #[test_case("float", ValueType::Number)]
    #[test_case("bool", ValueType::Bool)]
    #[test_case("string", ValueType::String)]
    #[test_case("timestamp", ValueType::Time)]
    #[test_case("map", ValueType::Map)]
    fn test_value_type_from_str(input: &str, expected: ValueType) {
        assert_eq!(input.parse::<ValueType>().unwrap(), expected);
    }

    #[test]
    fn test_value_type_unknown_name() {
        assert!("wat".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_parse_columns() {
        let cols = parse_columns("name:string, age:int,flag").unwrap();
        assert_eq!(
            cols,
            vec![
                ProjectedColumn::new("name", ValueType::String),
                ProjectedColumn::new("age", ValueType::Int),
                ProjectedColumn::new("flag", ValueType::String),
            ]
        );
        assert!(parse_columns(":int").is_err());
    }

    #[test]
    fn test_column_index() {
        let cols = parse_columns("name,age:int").unwrap();
        let index = column_index(&cols);
        assert_eq!(index["name"], 0);
        assert_eq!(index["age"], 1);
    }

    #[test]
    fn test_output_format_from_param() {
        assert_eq!(OutputFormat::from_param(Some("parquet")), OutputFormat::Parquet);
        assert_eq!(OutputFormat::from_param(Some("Parquet")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_param(Some("csv")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_param(None), OutputFormat::Csv);
    }
}
