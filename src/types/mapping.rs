//! Type mapping between remote SQL type tags and canonical scalar types.

use arrow::datatypes::{DataType, TimeUnit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical scalar kind every remote column type is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalType {
    /// Character data
    Text,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    /// Boolean
    Boolean,
    /// Calendar date without time
    Date,
    /// Date and time with offset
    Datetime,
    /// Time of day
    Time,
    /// Binary data carried as its base64 text
    BinaryText,
    /// Nested, array, geo and unknown types; such columns are dropped
    Unsupported,
}

impl CanonicalType {
    /// Whether columns of this type are presented to callers.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, CanonicalType::Unsupported)
    }

    /// Arrow data type used when a batch of rows is converted to a `RecordBatch`.
    ///
    /// Returns `None` for [`CanonicalType::Unsupported`].
    #[must_use]
    pub fn to_arrow(&self) -> Option<DataType> {
        match self {
            CanonicalType::Text | CanonicalType::BinaryText => Some(DataType::Utf8),
            CanonicalType::Integer => Some(DataType::Int64),
            CanonicalType::Float => Some(DataType::Float64),
            CanonicalType::Boolean => Some(DataType::Boolean),
            CanonicalType::Date => Some(DataType::Date32),
            CanonicalType::Datetime => Some(DataType::Timestamp(
                TimeUnit::Microsecond,
                Some("UTC".into()),
            )),
            CanonicalType::Time => Some(DataType::Time64(TimeUnit::Microsecond)),
            CanonicalType::Unsupported => None,
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CanonicalType::Text => "text",
            CanonicalType::Integer => "integer",
            CanonicalType::Float => "float",
            CanonicalType::Boolean => "boolean",
            CanonicalType::Date => "date",
            CanonicalType::Datetime => "datetime",
            CanonicalType::Time => "time",
            CanonicalType::BinaryText => "binary-as-text",
            CanonicalType::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Maps remote column type tags to [`CanonicalType`].
///
/// The standard endpoint reports SQL-flavoured names (`datetime`, `bigint`),
/// the legacy endpoint reports native engine names (`date`, `long`). Both
/// vocabularies are accepted, case-insensitively.
pub struct TypeMapper;

impl TypeMapper {
    /// Map a remote type tag. Never fails: unknown tags yield `Unsupported`.
    #[must_use]
    pub fn map(remote_type: &str) -> CanonicalType {
        let normalized = remote_type.trim().to_ascii_lowercase();

        if normalized.starts_with("interval_") {
            return CanonicalType::Text;
        }
        if normalized.starts_with("array") {
            return CanonicalType::Unsupported;
        }

        match normalized.as_str() {
            "text" | "keyword" | "constant_keyword" | "wildcard" | "match_only_text"
            | "version" | "varchar" | "char" | "string" | "null" => CanonicalType::Text,

            "byte" | "short" | "integer" | "long" | "tinyint" | "smallint" | "int"
            | "bigint" => CanonicalType::Integer,

            "float" | "half_float" | "double" | "scaled_float" | "real"
            | "double precision" => CanonicalType::Float,

            "boolean" | "bool" => CanonicalType::Boolean,

            "date" | "date_nanos" | "datetime" | "timestamp" => CanonicalType::Datetime,

            "time" | "time_with_time_zone" => CanonicalType::Time,

            "binary" => CanonicalType::BinaryText,

            _ => CanonicalType::Unsupported,
        }
    }
}
