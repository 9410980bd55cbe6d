//! Statement execution.

use std::sync::Arc;

use tracing::{debug, warn};

use super::cursor::{release, ResultCursor};
use super::statement::Statement;
use crate::codec::{response_token, CodecOptions, Dialect};
use crate::connection::ConnectionParams;
use crate::error::QueryError;
use crate::transport::Transport;

/// Submits statements and hands back cursors positioned on page 1.
///
/// The dialect is fixed when the executor is built; it is never detected per
/// statement.
#[derive(Clone)]
pub struct QueryExecutor {
    transport: Arc<dyn Transport>,
    dialect: Dialect,
    options: CodecOptions,
}

impl QueryExecutor {
    /// Create an executor for `dialect`.
    pub fn new(transport: Arc<dyn Transport>, dialect: Dialect, options: CodecOptions) -> Self {
        Self {
            transport,
            dialect,
            options,
        }
    }

    /// Create an executor with the dialect and defaults of `params`.
    pub fn from_params(transport: Arc<dyn Transport>, params: &ConnectionParams) -> Self {
        Self::new(transport, params.dialect, CodecOptions::from_params(params))
    }

    /// Dialect statements are encoded for.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Execute `statement` and return a cursor over its result.
    ///
    /// # Errors
    /// - `ExecutionError` when the remote rejects the statement; the remote
    ///   payload is carried verbatim and no cursor is created
    /// - `Transport` for network failures (never retried)
    /// - `MalformedResponse`, `Conversion` or `MissingParameter` as raised by the
    ///   codec; a cursor the first page opened is released before returning
    pub async fn execute(&self, statement: &Statement) -> Result<ResultCursor, QueryError> {
        let mut codec = self.dialect.codec(self.options.clone());
        let request = codec.encode_initial_request(statement)?;
        debug!(dialect = %self.dialect, path = %request.path, "submitting statement");

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            debug!(status = response.status, "statement rejected");
            return Err(QueryError::from_remote(response.status, &response.body));
        }

        let (columns, page) = match codec.decode_first(&response) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "first page could not be used");
                let close = response_token(&response).and_then(|t| codec.encode_close(&t));
                if let Some(close) = close {
                    release(self.transport.as_ref(), &close).await;
                }
                return Err(e);
            }
        };
        debug!(
            columns = columns.len(),
            rows = page.rows.len(),
            terminal = page.is_terminal(),
            "first page decoded"
        );

        Ok(ResultCursor::new(
            Arc::clone(&self.transport),
            codec,
            columns,
            page,
        ))
    }
}
