//! Connection and cursor facade.
//!
//! Mirrors the usual database-driver shape: a [`Connection`] creates
//! [`Cursor`]s, a cursor executes statements and yields rows. All I/O is async;
//! `blocking_*` variants drive a shared runtime for synchronous callers.

pub mod connection;
pub mod cursor;

pub use connection::Connection;
pub use cursor::{Cursor, DEFAULT_ARRAY_SIZE};
