//! Schema types

use crate::types::{ProjectedColumn, ValueType};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Field metadata key holding the derived column type
pub const LOGICAL_TYPE_KEY: &str = "export.logical_type";

/// Primitive type of an output column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit signed integer
    Integer64,
    /// 64-bit float
    Float64,
    /// Boolean
    Boolean,
    /// UTF-8 text; every unmapped value type lands here
    Utf8String,
}

impl ColumnType {
    /// Map a planner value type to an output column type
    pub fn from_value_type(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Int => ColumnType::Integer64,
            ValueType::Number => ColumnType::Float64,
            ValueType::Bool => ColumnType::Boolean,
            _ => ColumnType::Utf8String,
        }
    }

    /// Parquet physical/logical type name
    pub fn parquet_name(self) -> &'static str {
        match self {
            ColumnType::Integer64 => "INT64",
            ColumnType::Float64 => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Utf8String => "UTF8",
        }
    }

    /// Whether the column is dictionary encoded
    pub fn is_dictionary_encoded(self) -> bool {
        self == ColumnType::Utf8String
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer64 => write!(f, "Integer64"),
            ColumnType::Float64 => write!(f, "Float64"),
            ColumnType::Boolean => write!(f, "Boolean"),
            ColumnType::Utf8String => write!(f, "Utf8String"),
        }
    }
}

/// One output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name from the projection
    pub name: String,
    /// Derived primitive type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Ordered output columns of a Parquet export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSchema {
    columns: Vec<ColumnDef>,
}

impl ColumnSchema {
    /// Derive the schema from a projection, keeping its order
    pub fn derive(projection: &[ProjectedColumn]) -> Self {
        let columns = projection
            .iter()
            .map(|col| ColumnDef {
                name: col.name.clone(),
                column_type: ColumnType::from_value_type(col.value_type),
            })
            .collect();
        Self { columns }
    }

    /// Columns in output order
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether there are no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column types in output order
    pub fn types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }

    /// Arrow schema of the written file.
    ///
    /// Every field is nullable UTF-8; the derived type is kept in the field
    /// metadata.
    pub fn to_arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|col| {
                Field::new(&col.name, DataType::Utf8, true).with_metadata(HashMap::from([(
                    LOGICAL_TYPE_KEY.to_string(),
                    col.column_type.to_string(),
                )]))
            })
            .collect();
        Arc::new(Schema::new(fields))
    }

    /// Human-readable layout, e.g. `name=age, type=INT64`
    pub fn describe(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|col| {
                let mut line = format!("name={}, type={}", col.name, col.column_type.parquet_name());
                if col.column_type.is_dictionary_encoded() {
                    line.push_str(", encoding=PLAIN_DICTIONARY");
                }
                line
            })
            .collect()
    }
}
