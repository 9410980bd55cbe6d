//! Result cursor over a paged remote result.
//!
//! A [`ResultCursor`] is an explicit state machine:
//!
//! ```text
//! Open --(buffer empty, token present)--> fetch --> Open
//! Open --(buffer empty, no token)-------> Exhausted
//! Open | Exhausted --(close)------------> Closed
//! Open --(page arrived, not decodable)---> Closed
//! ```
//!
//! At most one page of rows is buffered. A page is fetched only when the buffer
//! is empty and the remote handed out a continuation token; pages that arrive
//! empty but carry a token are followed. There is no prefetch and no retry.
//!
//! A page that arrives but cannot be used (error status, malformed body, cell
//! conversion failure) is fatal: the server-side cursor is released and the
//! cursor closes. Only a transport failure, where no page arrived, leaves the
//! cursor open with its token for another attempt.
//!
//! All mutating methods take `&mut self`, so one cursor is driven by one caller
//! at a time. Independent cursors share nothing but the transport.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use arrow::array::RecordBatch;
use tracing::{debug, trace, warn};

use crate::arrow_conversion::ArrowConverter;
use crate::codec::{Dialect, DialectCodec, Page};
use crate::dbapi::connection::blocking_runtime;
use crate::error::QueryError;
use crate::transport::{OutboundRequest, Transport};
use crate::types::{ColumnDescriptor, Row};

/// Lifecycle state of a [`ResultCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Rows may remain, in the buffer or behind a continuation token
    Open,
    /// The terminal page has been drained
    Exhausted,
    /// Closed by the caller; absorbing
    Closed,
}

/// Forward-only cursor over the rows of one executed statement.
pub struct ResultCursor {
    transport: Arc<dyn Transport>,
    codec: Box<dyn DialectCodec>,
    columns: Vec<ColumnDescriptor>,
    buffer: VecDeque<Row>,
    token: Option<String>,
    state: CursorState,
    rows_fetched: u64,
    pages_fetched: u64,
    total_rows: Option<u64>,
}

impl ResultCursor {
    /// Create a cursor positioned before the first row of `first_page`.
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        codec: Box<dyn DialectCodec>,
        columns: Vec<ColumnDescriptor>,
        first_page: Page,
    ) -> Self {
        let Page {
            rows,
            continuation_token,
            total_rows,
        } = first_page;

        Self {
            transport,
            codec,
            columns,
            rows_fetched: rows.len() as u64,
            buffer: rows.into(),
            token: continuation_token,
            state: CursorState::Open,
            pages_fetched: 1,
            total_rows,
        }
    }

    /// Column descriptors, fixed for the lifetime of the cursor.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Dialect of the codec driving this cursor.
    pub fn dialect(&self) -> Dialect {
        self.codec.dialect()
    }

    /// Rows received from the remote so far, across all pages.
    pub fn rows_fetched(&self) -> u64 {
        self.rows_fetched
    }

    /// Pages received from the remote so far, including the first.
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Total matching rows, when the remote reports it.
    pub fn total_rows(&self) -> Option<u64> {
        self.total_rows
    }

    /// Whether a continuation token is held.
    pub fn has_more_pages(&self) -> bool {
        self.token.is_some()
    }

    /// Return the next row, or `None` once the result is exhausted.
    ///
    /// # Errors
    /// `CursorClosed` after [`close`](Self::close). A `Transport` failure leaves
    /// the cursor open with its token in place, so the call may be repeated.
    /// Any other fetch failure closes the cursor.
    pub async fn next_row(&mut self) -> Result<Option<Row>, QueryError> {
        loop {
            match self.state {
                CursorState::Closed => return Err(QueryError::CursorClosed),
                CursorState::Exhausted => return Ok(None),
                CursorState::Open => {}
            }

            if let Some(row) = self.buffer.pop_front() {
                return Ok(Some(row));
            }

            match self.token.clone() {
                Some(token) => self.fetch_next(&token).await?,
                None => {
                    debug!(
                        rows = self.rows_fetched,
                        pages = self.pages_fetched,
                        "cursor exhausted"
                    );
                    self.state = CursorState::Exhausted;
                }
            }
        }
    }

    /// Return up to `max_n` rows, fetching as many pages as needed.
    ///
    /// Fewer than `max_n` rows are returned only when the result is exhausted;
    /// an empty batch signals exhaustion. `max_n == 0` returns an empty batch
    /// without fetching.
    ///
    /// # Errors
    /// As [`next_row`](Self::next_row). When the cursor stays open after a
    /// failed fetch, rows collected before it are returned to the buffer.
    pub async fn next_batch(&mut self, max_n: usize) -> Result<Vec<Row>, QueryError> {
        if self.state == CursorState::Closed {
            return Err(QueryError::CursorClosed);
        }

        let mut batch = Vec::with_capacity(max_n.min(self.buffer.len()));
        while batch.len() < max_n {
            match self.next_row().await {
                Ok(Some(row)) => batch.push(row),
                Ok(None) => break,
                Err(e) => {
                    if self.state == CursorState::Open {
                        for row in batch.into_iter().rev() {
                            self.buffer.push_front(row);
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(batch)
    }

    /// Drain every remaining row.
    ///
    /// # Errors
    /// As [`next_batch`](Self::next_batch).
    pub async fn fetch_all(&mut self) -> Result<Vec<Row>, QueryError> {
        self.next_batch(usize::MAX).await
    }

    /// Return up to `max_n` rows as an Arrow record batch, or `None` once exhausted.
    ///
    /// # Errors
    /// As [`next_batch`](Self::next_batch), plus `Conversion` if Arrow rejects the rows.
    pub async fn next_record_batch(
        &mut self,
        max_n: usize,
    ) -> Result<Option<RecordBatch>, QueryError> {
        let rows = self.next_batch(max_n).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(ArrowConverter::rows_to_record_batch(
            &self.columns,
            &rows,
        )?))
    }

    /// Close the cursor.
    ///
    /// If the cursor is still open and holds a token, the dialect's close
    /// request is sent. Failures are logged, never returned. The cursor ends
    /// `Closed` in every case; closing again does nothing.
    pub async fn close(&mut self) {
        let previous = std::mem::replace(&mut self.state, CursorState::Closed);
        self.buffer.clear();

        let token = self.token.take();
        if previous != CursorState::Open {
            return;
        }
        let Some(request) = token.and_then(|t| self.codec.encode_close(&t)) else {
            return;
        };

        release(self.transport.as_ref(), &request).await;
    }

    /// Blocking version of [`next_row`](Self::next_row).
    ///
    /// Must not be called from within an async context.
    pub fn blocking_next_row(&mut self) -> Result<Option<Row>, QueryError> {
        blocking_runtime().block_on(self.next_row())
    }

    /// Blocking version of [`next_batch`](Self::next_batch).
    pub fn blocking_next_batch(&mut self, max_n: usize) -> Result<Vec<Row>, QueryError> {
        blocking_runtime().block_on(self.next_batch(max_n))
    }

    /// Blocking version of [`fetch_all`](Self::fetch_all).
    pub fn blocking_fetch_all(&mut self) -> Result<Vec<Row>, QueryError> {
        blocking_runtime().block_on(self.fetch_all())
    }

    /// Blocking version of [`close`](Self::close).
    pub fn blocking_close(&mut self) {
        blocking_runtime().block_on(self.close());
    }

    async fn fetch_next(&mut self, token: &str) -> Result<(), QueryError> {
        let request = self.codec.encode_continuation_request(token);
        trace!(page = self.pages_fetched + 1, "fetching next page");

        let response = self.transport.send(&request).await?;
        let decoded = if response.is_success() {
            self.codec.decode_next(&response)
        } else {
            Err(QueryError::from_remote(response.status, &response.body))
        };
        let page = match decoded {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "page could not be used; closing cursor");
                self.close().await;
                return Err(e);
            }
        };

        self.pages_fetched += 1;
        self.rows_fetched += page.rows.len() as u64;
        if page.total_rows.is_some() {
            self.total_rows = page.total_rows;
        }
        debug!(
            page = self.pages_fetched,
            rows = page.rows.len(),
            terminal = page.is_terminal(),
            "page decoded"
        );

        self.token = page.continuation_token;
        self.buffer.extend(page.rows);
        Ok(())
    }
}

impl Drop for ResultCursor {
    fn drop(&mut self) {
        if self.state != CursorState::Open {
            return;
        }
        let Some(request) = self
            .token
            .take()
            .and_then(|t| self.codec.encode_close(&t))
        else {
            return;
        };

        let transport = Arc::clone(&self.transport);
        let task = async move { release(transport.as_ref(), &request).await };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => {
                blocking_runtime().spawn(task);
            }
        }
    }
}

/// Send a close request, logging instead of returning failures.
pub(crate) async fn release(transport: &dyn Transport, request: &OutboundRequest) {
    debug!(path = %request.path, "releasing server-side cursor");
    match transport.send(request).await {
        Ok(response) if response.is_success() => {}
        Ok(response) => warn!(
            status = response.status,
            body = %response.body,
            "cursor close rejected by remote"
        ),
        Err(e) => warn!(error = %e, "cursor close failed"),
    }
}

impl fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCursor")
            .field("dialect", &self.codec.dialect())
            .field("columns", &self.columns.len())
            .field("buffered", &self.buffer.len())
            .field("has_token", &self.token.is_some())
            .field("state", &self.state)
            .field("rows_fetched", &self.rows_fetched)
            .field("pages_fetched", &self.pages_fetched)
            .finish()
    }
}
