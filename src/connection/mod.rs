//! Connection configuration.
//!
//! This module resolves the endpoint, dialect, paging defaults and credentials
//! a connection runs with.

pub mod params;

pub use params::{
    ConnectionBuilder, ConnectionParams, DEFAULT_FETCH_SIZE, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_TIME_ZONE,
};
