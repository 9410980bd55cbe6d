//! Codec for the legacy `_opendistro/_sql` endpoint.
//!
//! The legacy engine keeps no state a client can address by token alone, so a
//! continuation restates the rendered query and page size next to the cursor.
//! Errors frequently arrive with status 200 and an `error` object in the body.

use serde_json::{json, Value as JsonValue};

use super::{
    check_body, missing_field, parse_remote_column, parse_token, CodecOptions, Dialect,
    DialectCodec, Page, Projection, CURSOR_FIELD,
};
use crate::error::QueryError;
use crate::query::Statement;
use crate::transport::{OutboundRequest, RawResponse};
use crate::types::ColumnDescriptor;

const SCHEMA_FIELD: &str = "schema";
const ROWS_FIELD: &str = "datarows";
const TOTAL_FIELD: &str = "total";

/// Codec for the legacy dialect.
///
/// Remembers the rendered query and page size of the statement it encoded so
/// continuations can restate them. There is nothing to release on close.
#[derive(Debug, Clone)]
pub struct LegacyCodec {
    options: CodecOptions,
    sql: Option<String>,
    fetch_size: u32,
    projection: Option<Projection>,
}

impl LegacyCodec {
    /// Create a codec with connection defaults.
    pub fn new(options: CodecOptions) -> Self {
        let fetch_size = options.fetch_size;
        Self {
            options,
            sql: None,
            fetch_size,
            projection: None,
        }
    }

    fn page(&self, projection: &Projection, body: &JsonValue) -> Result<Page, QueryError> {
        Ok(Page {
            rows: projection.decode_rows(body, ROWS_FIELD, true)?,
            continuation_token: parse_token(body, CURSOR_FIELD)?,
            total_rows: body.get(TOTAL_FIELD).and_then(JsonValue::as_u64),
        })
    }
}

impl DialectCodec for LegacyCodec {
    fn dialect(&self) -> Dialect {
        Dialect::Legacy
    }

    fn encode_initial_request(
        &mut self,
        statement: &Statement,
    ) -> Result<OutboundRequest, QueryError> {
        let sql = statement.build_sql()?;
        self.fetch_size = self.options.fetch_size_for(statement);

        let body = json!({
            "query": sql,
            "fetch_size": self.fetch_size,
        });
        self.sql = Some(sql);

        Ok(OutboundRequest::new(self.options.sql_path.clone(), body))
    }

    fn decode_first(
        &mut self,
        response: &RawResponse,
    ) -> Result<(Vec<ColumnDescriptor>, Page), QueryError> {
        let body = check_body(response)?;

        let remote = body
            .get(SCHEMA_FIELD)
            .and_then(JsonValue::as_array)
            .ok_or_else(|| missing_field(SCHEMA_FIELD))?
            .iter()
            .map(|column| parse_remote_column(column, SCHEMA_FIELD))
            .collect::<Result<Vec<_>, _>>()?;

        let projection = Projection::new(remote);
        let page = self.page(&projection, body)?;
        let columns = projection.columns().to_vec();
        self.projection = Some(projection);

        Ok((columns, page))
    }

    fn decode_next(&self, response: &RawResponse) -> Result<Page, QueryError> {
        let projection = self.projection.as_ref().ok_or(QueryError::NotYetExecuted)?;
        let body = check_body(response)?;
        self.page(projection, body)
    }

    fn encode_continuation_request(&self, token: &str) -> OutboundRequest {
        let mut body = json!({
            "fetch_size": self.fetch_size,
            "cursor": token,
        });
        if let Some(sql) = &self.sql {
            body["query"] = JsonValue::String(sql.clone());
        }
        OutboundRequest::new(self.options.sql_path.clone(), body)
    }

    fn encode_close(&self, _token: &str) -> Option<OutboundRequest> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionBuilder;
    use crate::types::{CanonicalType, Value};

    fn codec() -> LegacyCodec {
        let params = ConnectionBuilder::new()
            .dialect(Dialect::Legacy)
            .build()
            .unwrap();
        LegacyCodec::new(CodecOptions::from_params(&params))
    }

    #[test]
    fn test_initial_request_has_no_time_zone() {
        let mut codec = codec();
        let stmt = Statement::new("SELECT * FROM flights").with_time_zone("Europe/Lisbon");
        let request = codec.encode_initial_request(&stmt).unwrap();

        assert_eq!(request.path, "_opendistro/_sql");
        assert_eq!(
            request.body,
            json!({"query": "SELECT * FROM flights", "fetch_size": 10000})
        );
    }

    #[test]
    fn test_decode_schema_with_alias_and_object_rows() {
        let mut codec = codec();
        let response = RawResponse::new(
            200,
            json!({
                "schema": [
                    {"name": "FlightNum", "alias": "flight", "type": "keyword"},
                    {"name": "OriginLocation", "type": "geo_point"},
                    {"name": "AvgTicketPrice", "type": "float"}
                ],
                "datarows": [
                    ["9HY9SWR", {"lat": "-33.9", "lon": "151.1"}, 841.26],
                    {"FlightNum": "X98CCZO", "AvgTicketPrice": 882.98}
                ],
                "total": 13059,
                "size": 2,
                "status": 200
            }),
        );

        let (columns, page) = codec.decode_first(&response).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "flight");
        assert_eq!(columns[1].canonical_type, CanonicalType::Float);
        assert_eq!(
            page.rows,
            vec![
                vec![Value::from("9HY9SWR"), Value::Float(841.26)],
                vec![Value::from("X98CCZO"), Value::Float(882.98)],
            ]
        );
        assert_eq!(page.total_rows, Some(13059));
        assert!(page.is_terminal());
    }

    #[test]
    fn test_error_with_success_status() {
        let mut codec = codec();
        let response = RawResponse::new(
            200,
            json!({
                "error": {
                    "reason": "Invalid SQL query",
                    "details": "no such index [nope]",
                    "type": "IndexNotFoundException"
                },
                "status": 404
            }),
        );

        match codec.decode_first(&response) {
            Err(QueryError::ExecutionError {
                status, message, ..
            }) => {
                assert_eq!(status, 404);
                assert!(message.contains("no such index"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_continuation_restates_query() {
        let mut codec = codec();
        codec
            .encode_initial_request(&Statement::new("SELECT a FROM t").with_fetch_size(5))
            .unwrap();

        let request = codec.encode_continuation_request("c2");
        assert_eq!(request.path, "_opendistro/_sql");
        assert_eq!(
            request.body,
            json!({"query": "SELECT a FROM t", "fetch_size": 5, "cursor": "c2"})
        );
        assert!(codec.encode_close("c2").is_none());
    }

    #[test]
    fn test_decode_next_page() {
        let mut codec = codec();
        codec
            .decode_first(&RawResponse::new(
                200,
                json!({"schema": [{"name": "a", "type": "integer"}], "datarows": [[1]], "cursor": "c1"}),
            ))
            .unwrap();

        let page = codec
            .decode_next(&RawResponse::new(200, json!({"datarows": [[2]], "cursor": "c2"})))
            .unwrap();
        assert_eq!(page.rows, vec![vec![Value::Integer(2)]]);
        assert_eq!(page.continuation_token.as_deref(), Some("c2"));
    }
}
