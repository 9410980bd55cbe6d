//! Column descriptors presented to callers.

use super::mapping::{CanonicalType, TypeMapper};
use serde::Serialize;

/// Description of one result column.
///
/// Descriptors are derived once, from the first page of a result, and never
/// re-derived from later pages. Columns whose remote type maps to
/// [`CanonicalType::Unsupported`] never get a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Column label (the alias when the remote reports one)
    pub name: String,
    /// Type tag exactly as the remote reported it
    pub remote_type: String,
    /// Position among the presented (filtered) columns, starting at 0
    pub ordinal: usize,
    /// Canonical type the remote type maps to
    pub canonical_type: CanonicalType,
}

impl ColumnDescriptor {
    /// Create a descriptor, mapping the remote type tag.
    pub fn new(name: impl Into<String>, remote_type: impl Into<String>, ordinal: usize) -> Self {
        let remote_type = remote_type.into();
        Self {
            name: name.into(),
            canonical_type: TypeMapper::map(&remote_type),
            remote_type,
            ordinal,
        }
    }

    /// All columns may hold NULL; the remote does not report nullability.
    #[must_use]
    pub fn nullable(&self) -> bool {
        true
    }
}
