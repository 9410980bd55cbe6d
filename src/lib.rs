//! # esarrow-rs
//!
//! Client-side cursor and type-mapping engine for the SQL endpoints of an
//! Elasticsearch-compatible search cluster, with Apache Arrow output.
//!
//! Two remote dialects are supported:
//!
//! - **standard**: the `_sql` endpoint, paged with opaque cursor tokens and
//!   released with an explicit close call
//! - **legacy**: the Open Distro `_opendistro/_sql` endpoint, paged by restating
//!   the query alongside a cursor marker
//!
//! The dialect is chosen once per connection. Statements produce a
//! [`ResultCursor`] that fetches pages lazily, maps every remote column type onto
//! a small canonical set, silently drops columns whose type has no canonical
//! equivalent, and yields rows in received order.
//!
//! ## Features
//!
//! - **Cursor**: lazy, bounded-memory paging with explicit `Open`/`Exhausted`/`Closed` states
//! - **Type mapping**: both remote type vocabularies mapped onto [`CanonicalType`]
//! - **Arrow**: any batch of rows as an Arrow `RecordBatch`
//! - **DB-API shape**: [`Connection`] and [`Cursor`], with blocking wrappers
//! - **Pluggable transport**: bring your own [`Transport`] (e.g. for signed requests)
//!
//! ## Query Example
//!
//! ```no_run
//! use esarrow_rs::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = Connection::builder()
//!     .host("localhost")
//!     .port(9200)
//!     .fetch_size(500)
//!     .build()?;
//! let connection = Connection::open(params)?;
//!
//! let statement = Statement::new("SELECT Carrier, AvgTicketPrice FROM flights WHERE Dest = %(dest)s")
//!     .bind("dest", "Venice Marco Polo Airport");
//! let mut cursor = connection.execute_statement(&statement).await?;
//!
//! for column in cursor.columns() {
//!     println!("{} ({})", column.name, column.canonical_type);
//! }
//! while let Some(batch) = cursor.next_record_batch(1024).await? {
//!     println!("Rows: {}", batch.num_rows());
//! }
//! cursor.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Legacy Dialect Example
//!
//! ```no_run
//! use esarrow_rs::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = Connection::builder()
//!     .dialect(Dialect::Legacy)
//!     .username("admin")
//!     .password("admin")
//!     .build()?;
//! let connection = Connection::open(params)?;
//!
//! let mut cursor = connection.execute("SELECT COUNT(*) FROM flights").await?;
//! let rows = cursor.fetch_all().await?;
//! println!("{:?}", rows);
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod arrow_conversion;
pub mod codec;
pub mod connection;
pub mod dbapi;
pub mod error;
pub mod query;
pub mod transport;
pub mod types;

// =============================================================================
// Connection Facade
// =============================================================================

/// Re-export connection and cursor facade types.
pub use dbapi::{Connection, Cursor};

/// Re-export connection configuration.
pub use connection::{ConnectionBuilder, ConnectionParams};

// =============================================================================
// Query Execution Types
// =============================================================================

/// Query execution and result handling types.
pub use query::{CursorState, Parameter, QueryExecutor, ResultCursor, Statement};

// =============================================================================
// Dialects and Transport
// =============================================================================

pub use codec::{Dialect, DialectCodec, LegacyCodec, Page, StandardCodec};
pub use transport::{HttpTransport, OutboundRequest, RawResponse, Transport};

// =============================================================================
// Arrow Conversion
// =============================================================================

/// Re-export Arrow conversion utilities.
pub use arrow_conversion::ArrowConverter;

// =============================================================================
// Error Types
// =============================================================================

/// Re-export error types for convenient error handling.
pub use error::{ConnectionError, ConversionError, EsError, QueryError, TransportError};

// =============================================================================
// Type System
// =============================================================================

/// Re-export type mapping utilities.
pub use types::{CanonicalType, ColumnDescriptor, Row, TypeMapper, Value};
