//! Output schema derivation
//!
//! The Parquet sink derives its column layout once, at open time, from the
//! query projection. Integer, float and boolean projections keep their
//! type; everything else (strings, times, composites, unknown) becomes a
//! dictionary-encoded UTF-8 column.
//!
//! Note: the file itself stores every column as UTF-8 text. The derived
//! type is carried in each field's metadata under [`LOGICAL_TYPE_KEY`] so
//! readers can recover it.

mod types;

pub use types::{ColumnDef, ColumnSchema, ColumnType, LOGICAL_TYPE_KEY};
