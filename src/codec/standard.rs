//! Codec for the standard `_sql` endpoint.

use serde_json::{json, Value as JsonValue};

use super::{
    check_body, missing_field, parse_remote_column, parse_token, CodecOptions, Dialect,
    DialectCodec, Page, Projection, CURSOR_FIELD,
};
use crate::error::QueryError;
use crate::query::Statement;
use crate::transport::{OutboundRequest, RawResponse};
use crate::types::ColumnDescriptor;

const COLUMNS_FIELD: &str = "columns";
const ROWS_FIELD: &str = "rows";

/// Codec for the standard dialect.
///
/// Continuations post `{"cursor": token}`; abandoned cursors are released via
/// `<sql_path>/close`.
#[derive(Debug, Clone)]
pub struct StandardCodec {
    options: CodecOptions,
    projection: Option<Projection>,
}

impl StandardCodec {
    /// Create a codec with connection defaults.
    pub fn new(options: CodecOptions) -> Self {
        Self {
            options,
            projection: None,
        }
    }
}

impl DialectCodec for StandardCodec {
    fn dialect(&self) -> Dialect {
        Dialect::Standard
    }

    fn encode_initial_request(
        &mut self,
        statement: &Statement,
    ) -> Result<OutboundRequest, QueryError> {
        let body = json!({
            "query": statement.build_sql()?,
            "fetch_size": self.options.fetch_size_for(statement),
            "time_zone": statement.time_zone().unwrap_or(&self.options.time_zone),
        });
        Ok(OutboundRequest::new(self.options.sql_path.clone(), body))
    }

    fn decode_first(
        &mut self,
        response: &RawResponse,
    ) -> Result<(Vec<ColumnDescriptor>, Page), QueryError> {
        let body = check_body(response)?;

        let remote = body
            .get(COLUMNS_FIELD)
            .and_then(JsonValue::as_array)
            .ok_or_else(|| missing_field(COLUMNS_FIELD))?
            .iter()
            .map(|column| parse_remote_column(column, COLUMNS_FIELD))
            .collect::<Result<Vec<_>, _>>()?;

        let projection = Projection::new(remote);
        let page = Page {
            rows: projection.decode_rows(body, ROWS_FIELD, false)?,
            continuation_token: parse_token(body, CURSOR_FIELD)?,
            total_rows: None,
        };
        let columns = projection.columns().to_vec();
        self.projection = Some(projection);

        Ok((columns, page))
    }

    fn decode_next(&self, response: &RawResponse) -> Result<Page, QueryError> {
        let projection = self.projection.as_ref().ok_or(QueryError::NotYetExecuted)?;
        let body = check_body(response)?;

        Ok(Page {
            rows: projection.decode_rows(body, ROWS_FIELD, false)?,
            continuation_token: parse_token(body, CURSOR_FIELD)?,
            total_rows: None,
        })
    }

    fn encode_continuation_request(&self, token: &str) -> OutboundRequest {
        OutboundRequest::new(self.options.sql_path.clone(), json!({ "cursor": token }))
    }

    fn encode_close(&self, token: &str) -> Option<OutboundRequest> {
        Some(OutboundRequest::new(
            format!("{}/close", self.options.sql_path),
            json!({ "cursor": token }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CanonicalType, Value};

    fn codec() -> StandardCodec {
        StandardCodec::new(CodecOptions::default())
    }

    #[test]
    fn test_initial_request_embeds_defaults() {
        let request = codec()
            .encode_initial_request(&Statement::new("SELECT Carrier FROM flights"))
            .unwrap();

        assert_eq!(request.path, "_sql");
        assert_eq!(
            request.body,
            json!({
                "query": "SELECT Carrier FROM flights",
                "fetch_size": 10000,
                "time_zone": "UTC"
            })
        );
    }

    #[test]
    fn test_initial_request_statement_overrides() {
        let stmt = Statement::new("SELECT 1")
            .with_fetch_size(2)
            .with_time_zone("America/New_York");
        let request = codec().encode_initial_request(&stmt).unwrap();
        assert_eq!(request.body["fetch_size"], 2);
        assert_eq!(request.body["time_zone"], "America/New_York");
    }

    #[test]
    fn test_zero_fetch_size_is_not_sent() {
        let stmt = Statement::new("SELECT 1").with_fetch_size(0);
        let request = codec().encode_initial_request(&stmt).unwrap();
        assert_eq!(request.body["fetch_size"], 10000);
    }

    #[test]
    fn test_decode_first_page() {
        let mut codec = codec();
        let response = RawResponse::new(
            200,
            json!({
                "columns": [
                    {"name": "Carrier", "type": "text"},
                    {"name": "Cancelled", "type": "boolean"},
                    {"name": "timestamp", "type": "datetime"}
                ],
                "rows": [
                    ["Kibana Airlines", false, "2018-01-01T00:00:00.000Z"],
                    ["JetBeats", true, null]
                ],
                "cursor": "sDXF1ZXJ5QW5kRmV0Y2gBAAAAAAAAAAEWWWdrRlVfSS1TbDYtcW9lc1FJNmlYdw=="
            }),
        );

        let (columns, page) = codec.decode_first(&response).unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[2].canonical_type, CanonicalType::Datetime);
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[1][0], Value::from("JetBeats"));
        assert_eq!(page.rows[1][2], Value::Null);
        assert!(!page.is_terminal());
    }

    #[test]
    fn test_decode_first_requires_columns() {
        let mut codec = codec();
        let response = RawResponse::new(200, json!({"datarows": [], "schema": []}));
        assert!(matches!(
            codec.decode_first(&response),
            Err(QueryError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_decode_next_page() {
        let mut codec = codec();
        codec
            .decode_first(&RawResponse::new(
                200,
                json!({"columns": [{"name": "n", "type": "long"}], "rows": [[1]], "cursor": "t1"}),
            ))
            .unwrap();

        let page = codec
            .decode_next(&RawResponse::new(200, json!({"rows": [[2], [3]]})))
            .unwrap();
        assert_eq!(page.rows, vec![vec![Value::Integer(2)], vec![Value::Integer(3)]]);
        assert!(page.is_terminal());
    }

    #[test]
    fn test_decode_next_rejects_non_string_token() {
        let mut codec = codec();
        codec
            .decode_first(&RawResponse::new(
                200,
                json!({"columns": [{"name": "n", "type": "long"}], "rows": []}),
            ))
            .unwrap();

        let result = codec.decode_next(&RawResponse::new(200, json!({"rows": [], "cursor": 5})));
        assert!(matches!(result, Err(QueryError::MalformedResponse(_))));
    }

    #[test]
    fn test_decode_next_before_first() {
        let result = codec().decode_next(&RawResponse::new(200, json!({"rows": []})));
        assert!(matches!(result, Err(QueryError::NotYetExecuted)));
    }

    #[test]
    fn test_continuation_and_close_requests() {
        let codec = codec();
        let next = codec.encode_continuation_request("tok");
        assert_eq!(next.path, "_sql");
        assert_eq!(next.body, json!({"cursor": "tok"}));

        let close = codec.encode_close("tok").unwrap();
        assert_eq!(close.path, "_sql/close");
        assert_eq!(close.body, json!({"cursor": "tok"}));
    }
}
