//! Connection facade.
//!
//! A [`Connection`] binds one transport to one dialect and hands out
//! [`Cursor`]s. The cluster's SQL endpoints are read-only and stateless, so
//! opening a connection performs no I/O and `commit` has nothing to do.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::runtime::Runtime;
use tracing::debug;

use super::cursor::Cursor;
use crate::codec::Dialect;
use crate::connection::{ConnectionBuilder, ConnectionParams};
use crate::error::{ConnectionError, QueryError};
use crate::query::{QueryExecutor, ResultCursor, Statement};
use crate::transport::{HttpTransport, Transport};

/// Global tokio runtime for blocking operations.
///
/// Lazily initialized on first use and shared by every `blocking_*` method.
pub(crate) fn blocking_runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime for blocking operations")
    })
}

/// Connection to a cluster's SQL endpoint.
pub struct Connection {
    executor: QueryExecutor,
    params: ConnectionParams,
    closed: Arc<AtomicBool>,
}

impl Connection {
    /// Open a connection over HTTP.
    ///
    /// # Errors
    /// Returns `ConnectionError` if the parameters are invalid or the HTTP
    /// client cannot be built.
    pub fn open(params: ConnectionParams) -> Result<Self, ConnectionError> {
        params.validate()?;
        let transport = HttpTransport::new(&params)?;
        debug!(url = %transport.base_url(), dialect = %params.dialect, "connection opened");
        Ok(Self::with_transport(params, Arc::new(transport)))
    }

    /// Create a connection over a caller-supplied transport.
    pub fn with_transport(params: ConnectionParams, transport: Arc<dyn Transport>) -> Self {
        Self {
            executor: QueryExecutor::from_params(transport, &params),
            params,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a builder for connection parameters.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Parameters the connection was opened with.
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Dialect of the endpoint.
    pub fn dialect(&self) -> Dialect {
        self.executor.dialect()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Create a new cursor.
    ///
    /// # Errors
    /// Returns `QueryError::ConnectionClosed` after [`close`](Self::close).
    pub fn cursor(&self) -> Result<Cursor, QueryError> {
        self.check_open()?;
        Ok(Cursor::new(self.executor.clone(), Arc::clone(&self.closed)))
    }

    /// Execute SQL on a fresh cursor and return that cursor.
    ///
    /// # Errors
    /// `ConnectionClosed` after close, otherwise as [`Cursor::execute`].
    pub async fn execute(&self, sql: impl Into<String>) -> Result<Cursor, QueryError> {
        let mut cursor = self.cursor()?;
        cursor.execute(&Statement::new(sql)).await?;
        Ok(cursor)
    }

    /// Execute a statement and return the raw result cursor.
    ///
    /// # Errors
    /// `ConnectionClosed` after close, otherwise as [`QueryExecutor::execute`].
    pub async fn execute_statement(&self, statement: &Statement) -> Result<ResultCursor, QueryError> {
        self.check_open()?;
        self.executor.execute(statement).await
    }

    /// No-op: the endpoint has no transactions.
    ///
    /// # Errors
    /// Returns `QueryError::ConnectionClosed` after close.
    pub fn commit(&self) -> Result<(), QueryError> {
        self.check_open()
    }

    /// Always fails: the endpoint has no transactions.
    ///
    /// # Errors
    /// Returns `QueryError::NotSupported`.
    pub fn rollback(&self) -> Result<(), QueryError> {
        Err(QueryError::NotSupported(
            "rollback: the SQL endpoint has no transactions".to_string(),
        ))
    }

    /// Close the connection. Closing twice does nothing.
    ///
    /// Cursors created from it are closed on their next call, which releases
    /// any server-side cursor they still hold and fails with `CursorClosed`
    /// (`ConnectionClosed` from `execute`).
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("connection closed");
        }
    }

    /// Blocking version of [`execute`](Self::execute).
    ///
    /// Must not be called from within an async context.
    pub fn blocking_execute(&self, sql: impl Into<String>) -> Result<Cursor, QueryError> {
        blocking_runtime().block_on(self.execute(sql))
    }

    fn check_open(&self) -> Result<(), QueryError> {
        if self.is_closed() {
            Err(QueryError::ConnectionClosed)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("params", &self.params)
            .field("closed", &self.is_closed())
            .finish()
    }
}
