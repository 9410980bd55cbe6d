//! Wire codecs for the two remote SQL dialects.
//!
//! The standard endpoint (`_sql`) and the legacy endpoint (`_opendistro/_sql`)
//! accept the same capability with different request and response shapes:
//!
//! | | standard | legacy |
//! |---|---|---|
//! | column metadata | `columns[{name, type}]` | `schema[{name, alias?, type}]` |
//! | row container | `rows` (arrays) | `datarows` (arrays or objects) |
//! | continuation | `{"cursor": token}` | restated query + `cursor` |
//! | close | `POST <path>/close` | nothing to release |
//! | errors | non-2xx status | `error` object, often with status 200 |
//!
//! Both implement [`DialectCodec`], so the cursor never branches on dialect.

mod legacy;
mod standard;

pub use legacy::LegacyCodec;
pub use standard::StandardCodec;

use crate::connection::{ConnectionParams, DEFAULT_FETCH_SIZE};
use crate::error::QueryError;
use crate::query::Statement;
use crate::transport::{OutboundRequest, RawResponse};
use crate::types::{convert_value, ColumnDescriptor, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use tracing::{debug, trace};

/// SQL dialect of a connection. Chosen once per connection, never per statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// The `_sql` endpoint with cursor tokens and an explicit close call
    #[default]
    Standard,
    /// The `_opendistro/_sql` endpoint
    Legacy,
}

impl Dialect {
    /// Default SQL endpoint path.
    #[must_use]
    pub fn default_sql_path(&self) -> &'static str {
        match self {
            Dialect::Standard => "_sql",
            Dialect::Legacy => "_opendistro/_sql",
        }
    }

    /// Create a fresh codec for one statement execution.
    #[must_use]
    pub fn codec(&self, options: CodecOptions) -> Box<dyn DialectCodec> {
        match self {
            Dialect::Standard => Box::new(StandardCodec::new(options)),
            Dialect::Legacy => Box::new(LegacyCodec::new(options)),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Standard => f.write_str("standard"),
            Dialect::Legacy => f.write_str("legacy"),
        }
    }
}

/// Connection-level defaults a codec embeds into requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOptions {
    /// SQL endpoint path without leading slash
    pub sql_path: String,
    /// Rows per page unless the statement overrides it
    pub fetch_size: u32,
    /// Time zone unless the statement overrides it (standard dialect only)
    pub time_zone: String,
}

impl CodecOptions {
    /// Options for the given connection parameters.
    pub fn from_params(params: &ConnectionParams) -> Self {
        Self {
            sql_path: params.resolved_sql_path(),
            fetch_size: params.fetch_size,
            time_zone: params.time_zone.clone(),
        }
    }
}

impl CodecOptions {
    /// Page size for `statement`: its override, else the connection default.
    ///
    /// A zero anywhere falls back to the next source, ending at
    /// [`DEFAULT_FETCH_SIZE`].
    #[must_use]
    pub fn fetch_size_for(&self, statement: &Statement) -> u32 {
        statement
            .fetch_size()
            .filter(|&n| n > 0)
            .or(Some(self.fetch_size).filter(|&n| n > 0))
            .unwrap_or(DEFAULT_FETCH_SIZE)
    }
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self::from_params(&ConnectionParams::default())
    }
}

/// One decoded page of results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Rows in received order, aligned to the filtered column list
    pub rows: Vec<Row>,
    /// Token for the next page; `None` marks the terminal page
    pub continuation_token: Option<String>,
    /// Total number of matching rows, when the remote reports it
    pub total_rows: Option<u64>,
}

impl Page {
    /// Whether no further fetch is required.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.continuation_token.is_none()
    }
}

/// Request encoding and response decoding for one dialect.
///
/// A codec instance serves exactly one statement: `decode_first` records the
/// column projection that `decode_next` applies to every later page.
pub trait DialectCodec: Send + Sync + fmt::Debug {
    /// The dialect this codec speaks.
    fn dialect(&self) -> Dialect;

    /// Encode the request that executes `statement` and returns page 1.
    ///
    /// # Errors
    /// Returns `QueryError::MissingParameter` if the statement cannot be rendered.
    fn encode_initial_request(&mut self, statement: &Statement)
        -> Result<OutboundRequest, QueryError>;

    /// Decode the first page, including column metadata.
    ///
    /// # Errors
    /// `MalformedResponse` if required fields are missing, `ExecutionError` if the
    /// body carries a remote error, `Conversion` if a cell does not fit its type.
    fn decode_first(
        &mut self,
        response: &RawResponse,
    ) -> Result<(Vec<ColumnDescriptor>, Page), QueryError>;

    /// Decode a continuation page. Column metadata is not expected.
    ///
    /// # Errors
    /// As [`decode_first`](Self::decode_first); `NotYetExecuted` if called before it.
    fn decode_next(&self, response: &RawResponse) -> Result<Page, QueryError>;

    /// Encode the request for the page after `token`.
    fn encode_continuation_request(&self, token: &str) -> OutboundRequest;

    /// Encode the request releasing the server-side cursor behind `token`,
    /// or `None` when the dialect has nothing to release.
    fn encode_close(&self, token: &str) -> Option<OutboundRequest>;
}

/// A column as reported by the remote, before filtering.
#[derive(Debug, Clone)]
pub(crate) struct RemoteColumn {
    /// Label presented to callers
    pub label: String,
    /// Key used when rows arrive as objects
    pub key: String,
    /// Remote type tag
    pub remote_type: String,
}

/// Maps remote rows onto the filtered column list.
#[derive(Debug, Clone, Default)]
pub(crate) struct Projection {
    declared: usize,
    kept: Vec<usize>,
    keys: Vec<String>,
    columns: Vec<ColumnDescriptor>,
}

impl Projection {
    /// Build the projection, dropping columns whose type is unsupported.
    pub fn new(remote: Vec<RemoteColumn>) -> Self {
        let declared = remote.len();
        let mut kept = Vec::new();
        let mut keys = Vec::new();
        let mut columns = Vec::new();

        for (index, column) in remote.into_iter().enumerate() {
            let descriptor = ColumnDescriptor::new(column.label, column.remote_type, columns.len());
            if descriptor.canonical_type.is_supported() {
                kept.push(index);
                keys.push(column.key);
                columns.push(descriptor);
            } else {
                debug!(
                    column = %descriptor.name,
                    remote_type = %descriptor.remote_type,
                    "dropping column with unsupported type"
                );
            }
        }

        Self {
            declared,
            kept,
            keys,
            columns,
        }
    }

    /// Descriptors of the presented columns.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Decode the row container at `field` of `body`.
    ///
    /// Object rows are only accepted when `allow_objects` is set.
    pub fn decode_rows(
        &self,
        body: &JsonValue,
        field: &str,
        allow_objects: bool,
    ) -> Result<Vec<Row>, QueryError> {
        let rows = body
            .get(field)
            .and_then(JsonValue::as_array)
            .ok_or_else(|| missing_field(field))?;

        rows.iter()
            .map(|row| match row {
                JsonValue::Array(values) => self.project_array(values),
                JsonValue::Object(map) if allow_objects => self.project_object(map),
                other => Err(QueryError::MalformedResponse(format!(
                    "Row in '{field}' is not an array: {other}"
                ))),
            })
            .collect()
    }

    fn project_array(&self, values: &[JsonValue]) -> Result<Row, QueryError> {
        if values.len() < self.declared {
            return Err(QueryError::MalformedResponse(format!(
                "Row has {} values but {} columns were declared",
                values.len(),
                self.declared
            )));
        }
        if values.len() > self.declared {
            trace!(
                received = values.len(),
                declared = self.declared,
                "truncating row to declared columns"
            );
        }

        self.kept
            .iter()
            .zip(&self.columns)
            .map(|(&index, column)| convert_value(column, &values[index]).map_err(QueryError::from))
            .collect()
    }

    fn project_object(&self, map: &Map<String, JsonValue>) -> Result<Row, QueryError> {
        self.keys
            .iter()
            .zip(&self.columns)
            .map(|(key, column)| {
                let raw = map
                    .get(key)
                    .or_else(|| map.get(&column.name))
                    .unwrap_or(&JsonValue::Null);
                convert_value(column, raw).map_err(QueryError::from)
            })
            .collect()
    }
}

pub(crate) fn missing_field(field: &str) -> QueryError {
    QueryError::MalformedResponse(format!("Response is missing the '{field}' field"))
}

/// Require an object body and surface a remote error payload.
pub(crate) fn check_body(response: &RawResponse) -> Result<&JsonValue, QueryError> {
    let body = &response.body;
    if !body.is_object() {
        return Err(QueryError::MalformedResponse(format!(
            "Expected a JSON object, got: {body}"
        )));
    }
    match body.get("error") {
        Some(JsonValue::Null) | None => Ok(body),
        Some(_) => {
            let status = body
                .get("status")
                .and_then(JsonValue::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or(response.status);
            Err(QueryError::from_remote(status, body))
        }
    }
}

/// Field both dialects carry the continuation token in.
pub(crate) const CURSOR_FIELD: &str = "cursor";

/// Best-effort read of the continuation token of a response whose page could
/// not be decoded.
pub(crate) fn response_token(response: &RawResponse) -> Option<String> {
    parse_token(&response.body, CURSOR_FIELD).ok().flatten()
}

/// Read the continuation token at `field`. Absent, null and empty all mean
/// "terminal page".
pub(crate) fn parse_token(body: &JsonValue, field: &str) -> Result<Option<String>, QueryError> {
    match body.get(field) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(token)) if token.is_empty() => Ok(None),
        Some(JsonValue::String(token)) => Ok(Some(token.clone())),
        Some(other) => Err(QueryError::MalformedResponse(format!(
            "Field '{field}' must be a string or null, got: {other}"
        ))),
    }
}

/// Read the `name`/`alias`/`type` triple of one column object.
pub(crate) fn parse_remote_column(
    column: &JsonValue,
    container: &str,
) -> Result<RemoteColumn, QueryError> {
    let field = |name: &str| column.get(name).and_then(JsonValue::as_str);

    let name = field("name").ok_or_else(|| {
        QueryError::MalformedResponse(format!("Column in '{container}' has no name: {column}"))
    })?;
    let remote_type = field("type").ok_or_else(|| {
        QueryError::MalformedResponse(format!("Column '{name}' in '{container}' has no type"))
    })?;
    let label = field("alias").filter(|a| !a.is_empty()).unwrap_or(name);

    Ok(RemoteColumn {
        label: label.to_string(),
        key: name.to_string(),
        remote_type: remote_type.to_string(),
    })
}
