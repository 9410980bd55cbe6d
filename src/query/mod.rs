//! Query execution and result handling.
//!
//! The query module is organized into:
//! - `statement` - SQL statement data container with parameter binding
//! - `executor` - submits a statement and decodes the first page
//! - `cursor` - pages through the rest of the result on demand

pub mod cursor;
pub mod executor;
pub mod statement;

// Re-export commonly used types
pub use cursor::{CursorState, ResultCursor};
pub use executor::QueryExecutor;
pub use statement::{Parameter, Statement};
