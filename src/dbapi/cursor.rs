//! Row cursor facade in the DB-API shape.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::connection::blocking_runtime;
use crate::error::QueryError;
use crate::query::{QueryExecutor, ResultCursor, Statement};
use crate::types::{ColumnDescriptor, Row};

/// Default number of rows returned by [`Cursor::next_batch`] without a size.
pub const DEFAULT_ARRAY_SIZE: usize = 1;

/// A reusable cursor. Each [`execute`](Cursor::execute) replaces the current
/// result; the previous one is closed first.
///
/// Closing the owning connection closes the cursor too: the next call on it
/// releases the server-side cursor and fails.
pub struct Cursor {
    executor: QueryExecutor,
    connection_closed: Arc<AtomicBool>,
    result: Option<ResultCursor>,
    closed: bool,
    /// Rows returned by `next_batch(None)`
    pub array_size: usize,
}

impl Cursor {
    pub(crate) fn new(executor: QueryExecutor, connection_closed: Arc<AtomicBool>) -> Self {
        Self {
            executor,
            connection_closed,
            result: None,
            closed: false,
            array_size: DEFAULT_ARRAY_SIZE,
        }
    }

    /// Execute a statement.
    ///
    /// # Errors
    /// `CursorClosed` after close, `ConnectionClosed` once the connection is
    /// closed, otherwise as [`QueryExecutor::execute`].
    pub async fn execute(&mut self, statement: &Statement) -> Result<&mut Self, QueryError> {
        if self.closed {
            return Err(QueryError::CursorClosed);
        }
        if self.connection_closed() {
            self.close().await;
            return Err(QueryError::ConnectionClosed);
        }
        if let Some(mut previous) = self.result.take() {
            previous.close().await;
        }

        self.result = Some(self.executor.execute(statement).await?);
        Ok(self)
    }

    /// Always fails: the SQL endpoint is read-only.
    ///
    /// # Errors
    /// Returns `QueryError::NotSupported`.
    pub async fn execute_many(&mut self, _statements: &[Statement]) -> Result<(), QueryError> {
        Err(QueryError::NotSupported(
            "execute_many: the SQL endpoint is read-only".to_string(),
        ))
    }

    /// Next row of the current result, `None` once exhausted.
    ///
    /// # Errors
    /// `NotYetExecuted` before execute, `CursorClosed` after close of the
    /// cursor or its connection.
    pub async fn next_row(&mut self) -> Result<Option<Row>, QueryError> {
        self.result_mut().await?.next_row().await
    }

    /// Up to `size` rows (default [`array_size`](Self::array_size)).
    ///
    /// # Errors
    /// As [`next_row`](Self::next_row).
    pub async fn next_batch(&mut self, size: Option<usize>) -> Result<Vec<Row>, QueryError> {
        let size = size.unwrap_or(self.array_size);
        self.result_mut().await?.next_batch(size).await
    }

    /// All remaining rows.
    ///
    /// # Errors
    /// As [`next_row`](Self::next_row).
    pub async fn fetch_all(&mut self) -> Result<Vec<Row>, QueryError> {
        self.result_mut().await?.fetch_all().await
    }

    /// Columns of the current result.
    ///
    /// # Errors
    /// `NotYetExecuted` before execute, `CursorClosed` after close of the
    /// cursor or its connection.
    pub fn columns(&self) -> Result<&[ColumnDescriptor], QueryError> {
        if self.is_closed() {
            return Err(QueryError::CursorClosed);
        }
        self.result
            .as_ref()
            .map(ResultCursor::columns)
            .ok_or(QueryError::NotYetExecuted)
    }

    /// Rows received for the current result; 0 before execute.
    pub fn rows_fetched(&self) -> u64 {
        self.result.as_ref().map_or(0, ResultCursor::rows_fetched)
    }

    /// Whether the cursor or its connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed || self.connection_closed()
    }

    /// Close the cursor and its current result. Closing twice does nothing.
    pub async fn close(&mut self) {
        if let Some(mut result) = self.result.take() {
            result.close().await;
        }
        self.closed = true;
    }

    /// Blocking version of [`execute`](Self::execute).
    ///
    /// Must not be called from within an async context.
    pub fn blocking_execute(&mut self, statement: &Statement) -> Result<&mut Self, QueryError> {
        blocking_runtime().block_on(self.execute(statement))
    }

    /// Blocking version of [`fetch_all`](Self::fetch_all).
    pub fn blocking_fetch_all(&mut self) -> Result<Vec<Row>, QueryError> {
        blocking_runtime().block_on(self.fetch_all())
    }

    /// Blocking version of [`close`](Self::close).
    pub fn blocking_close(&mut self) {
        blocking_runtime().block_on(self.close());
    }

    fn connection_closed(&self) -> bool {
        self.connection_closed.load(Ordering::Acquire)
    }

    async fn result_mut(&mut self) -> Result<&mut ResultCursor, QueryError> {
        if !self.closed && self.connection_closed() {
            debug!("connection closed; closing cursor");
            self.close().await;
        }
        if self.closed {
            return Err(QueryError::CursorClosed);
        }
        self.result.as_mut().ok_or(QueryError::NotYetExecuted)
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("result", &self.result)
            .field("closed", &self.closed)
            .field("array_size", &self.array_size)
            .finish()
    }
}
