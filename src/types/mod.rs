//! Canonical types, values and column descriptors.

pub(crate) mod conversion;
mod mapping;
mod schema;
mod value;

pub use conversion::{convert_value, parse_date, parse_datetime, parse_time};
pub use mapping::{CanonicalType, TypeMapper};
pub use schema::ColumnDescriptor;
pub use value::{Row, Value};
