//! Error types for esarrow-rs.
//!
//! Errors are grouped by the layer that raises them:
//! - [`TransportError`] - opaque failures of the HTTP collaborator
//! - [`ConversionError`] - a cell value that does not fit its column's canonical type
//! - [`QueryError`] - execution, decoding and cursor protocol errors
//! - [`ConnectionError`] - invalid connection parameters
//!
//! [`EsError`] wraps all of them for callers that only want one error type.

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum EsError {
    /// Connection configuration error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Query execution or cursor error
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Value conversion error
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Errors raised while resolving connection parameters.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// A parameter has an invalid value
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// The HTTP client could not be constructed
    #[error("Failed to build transport: {0}")]
    Transport(#[from] TransportError),
}

/// Errors raised by the transport collaborator.
///
/// The core never interprets these beyond passing them through; there are no retries.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read
    #[error("Request failed: {0}")]
    Request(String),

    /// The request timed out
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The response could not be read as text
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The HTTP client could not be created
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Errors raised while converting a JSON cell into a canonical value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// The cell cannot be represented as the column's canonical type
    #[error("Cannot convert value {value} of column '{column}' to {target}")]
    InvalidValue {
        column: String,
        target: String,
        value: String,
    },

    /// Arrow could not assemble a record batch
    #[error("Arrow error: {0}")]
    Arrow(String),
}

impl From<arrow::error::ArrowError> for ConversionError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ConversionError::Arrow(err.to_string())
    }
}

/// Errors raised by statement execution and result cursors.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The response body lacks a field the dialect requires
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The remote rejected the statement
    #[error("Execution failed (status {status}): {message}")]
    ExecutionError {
        /// HTTP status of the response that carried the error
        status: u16,
        /// Human-readable reason extracted from the payload
        message: String,
        /// The remote error payload, verbatim
        payload: String,
    },

    /// The cursor was used after `close()`
    #[error("Cursor already closed")]
    CursorClosed,

    /// Result metadata was requested before a statement was executed
    #[error("Called before execute")]
    NotYetExecuted,

    /// The connection was used after `close()`
    #[error("Connection already closed")]
    ConnectionClosed,

    /// A `%(name)s` placeholder has no bound parameter
    #[error("Missing value for parameter '{0}'")]
    MissingParameter(String),

    /// The operation is not available on a read-only SQL endpoint
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Transport failure, passed through unchanged
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A cell could not be converted to its canonical type
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),
}

impl QueryError {
    /// Build an [`QueryError::ExecutionError`] from a remote error payload.
    ///
    /// Both dialects nest the diagnostic under `error`; the standard endpoint
    /// uses `error.reason`, the legacy endpoint adds `error.details`.
    pub(crate) fn from_remote(status: u16, payload: &serde_json::Value) -> Self {
        let error = payload.get("error").unwrap_or(payload);
        let message = match error {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Object(_) => {
                let reason = error
                    .get("reason")
                    .and_then(|r| r.as_str())
                    .unwrap_or("unknown error");
                match error.get("details").and_then(|d| d.as_str()) {
                    Some(details) => format!("({reason}): {details}"),
                    None => reason.to_string(),
                }
            }
            other => other.to_string(),
        };

        QueryError::ExecutionError {
            status,
            message,
            payload: match payload {
                serde_json::Value::String(raw) => raw.clone(),
                other => other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_error_from_standard_payload() {
        let payload = json!({
            "error": {
                "root_cause": [{"type": "verification_exception", "reason": "Unknown index [nope]"}],
                "type": "verification_exception",
                "reason": "Found 1 problem\nline 1:15: Unknown index [nope]"
            },
            "status": 400
        });

        match QueryError::from_remote(400, &payload) {
            QueryError::ExecutionError {
                status,
                message,
                payload: raw,
            } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("Found 1 problem"));
                assert!(raw.contains("verification_exception"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_execution_error_from_legacy_payload() {
        let payload = json!({
            "error": {
                "reason": "Invalid SQL query",
                "details": "Field [nope] cannot be found",
                "type": "SemanticAnalysisException"
            },
            "status": 400
        });

        let err = QueryError::from_remote(200, &payload);
        assert_eq!(
            err.to_string(),
            "Execution failed (status 200): (Invalid SQL query): Field [nope] cannot be found"
        );
    }

    #[test]
    fn test_execution_error_from_plain_text() {
        let payload = serde_json::Value::String("Bad Gateway".to_string());
        let err = QueryError::from_remote(502, &payload);
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_es_error_wraps_layers() {
        let err: EsError = QueryError::CursorClosed.into();
        assert_eq!(err.to_string(), "Cursor already closed");

        let err: EsError = TransportError::Timeout { timeout_ms: 50 }.into();
        assert_eq!(err.to_string(), "Request timed out after 50ms");
    }
}
