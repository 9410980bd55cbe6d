//! Connection and cursor facade tests.

mod common;

use common::{standard_first_page, standard_page, ScriptedTransport};
use esarrow_rs::{Connection, ConnectionParams, Dialect, QueryError, Statement, Value};
use serde_json::json;
use std::sync::Arc;

fn connection(transport: &Arc<ScriptedTransport>) -> Connection {
    Connection::with_transport(ConnectionParams::default(), transport.clone())
}

#[tokio::test]
async fn test_cursor_before_execute() {
    let transport = ScriptedTransport::new();
    let connection = connection(&transport);
    let mut cursor = connection.cursor().unwrap();

    assert!(matches!(cursor.columns(), Err(QueryError::NotYetExecuted)));
    assert!(matches!(cursor.next_row().await, Err(QueryError::NotYetExecuted)));
    assert_eq!(cursor.rows_fetched(), 0);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_execute_and_fetch() {
    let transport = ScriptedTransport::new()
        .ok(standard_first_page(&[1, 2], Some("t1")))
        .ok(standard_page(&[3], None));
    let connection = connection(&transport);

    let mut cursor = connection.execute("SELECT n FROM t").await.unwrap();
    assert_eq!(cursor.columns().unwrap()[0].name, "n");

    // array_size defaults to one row
    assert_eq!(cursor.next_batch(None).await.unwrap(), vec![vec![Value::Integer(1)]]);
    cursor.array_size = 5;
    assert_eq!(
        cursor.next_batch(None).await.unwrap(),
        vec![vec![Value::Integer(2)], vec![Value::Integer(3)]]
    );
    assert!(cursor.next_row().await.unwrap().is_none());
    assert_eq!(cursor.rows_fetched(), 3);

    assert_eq!(
        transport.requests()[0].body,
        json!({"query": "SELECT n FROM t", "fetch_size": 10000, "time_zone": "UTC"})
    );
}

#[tokio::test]
async fn test_reexecute_closes_previous_result() {
    let transport = ScriptedTransport::new()
        .ok(standard_first_page(&[1], Some("t1")))
        .ok(json!({"succeeded": true}))
        .ok(standard_first_page(&[9], None));
    let connection = connection(&transport);

    let mut cursor = connection.cursor().unwrap();
    cursor.execute(&Statement::new("SELECT n FROM a")).await.unwrap();
    cursor.execute(&Statement::new("SELECT n FROM b")).await.unwrap();

    let paths: Vec<_> = transport.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["_sql", "_sql/close", "_sql"]);
    assert_eq!(cursor.fetch_all().await.unwrap(), vec![vec![Value::Integer(9)]]);
}

#[tokio::test]
async fn test_closed_cursor_and_connection() {
    let transport = ScriptedTransport::new().ok(standard_first_page(&[1], None));
    let connection = connection(&transport);

    let mut cursor = connection.cursor().unwrap();
    cursor.execute(&Statement::new("SELECT n FROM t")).await.unwrap();
    cursor.close().await;
    cursor.close().await;
    assert!(cursor.is_closed());
    assert!(matches!(cursor.columns(), Err(QueryError::CursorClosed)));
    assert!(matches!(cursor.fetch_all().await, Err(QueryError::CursorClosed)));

    let mut other = connection.cursor().unwrap();
    connection.close();
    assert!(matches!(
        other.execute(&Statement::new("SELECT 1")).await,
        Err(QueryError::ConnectionClosed)
    ));
    assert!(matches!(
        connection.execute("SELECT 1").await,
        Err(QueryError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_connection_close_closes_open_cursors() {
    let transport = ScriptedTransport::new()
        .ok(standard_first_page(&[1, 2], Some("t1")))
        .ok(json!({"succeeded": true}));
    let connection = connection(&transport);

    let mut cursor = connection.execute("SELECT n FROM t").await.unwrap();
    assert_eq!(cursor.next_row().await.unwrap(), Some(vec![Value::Integer(1)]));

    connection.close();
    assert!(cursor.is_closed());
    assert!(matches!(cursor.columns(), Err(QueryError::CursorClosed)));
    assert!(matches!(cursor.next_row().await, Err(QueryError::CursorClosed)));
    assert!(matches!(cursor.fetch_all().await, Err(QueryError::CursorClosed)));

    let closes = transport.requests_to("_sql/close");
    assert_eq!(closes.len(), 1);
    assert_eq!(closes[0].body, json!({"cursor": "t1"}));
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_execute_after_connection_close_releases_result() {
    let transport = ScriptedTransport::new()
        .ok(standard_first_page(&[1], Some("t1")))
        .ok(json!({"succeeded": true}));
    let connection = connection(&transport);

    let mut cursor = connection.execute("SELECT n FROM t").await.unwrap();
    connection.close();
    assert!(matches!(
        cursor.execute(&Statement::new("SELECT n FROM t")).await,
        Err(QueryError::ConnectionClosed)
    ));
    assert_eq!(transport.requests_to("_sql/close").len(), 1);
    assert!(matches!(cursor.next_row().await, Err(QueryError::CursorClosed)));
}

#[tokio::test]
async fn test_execute_many_not_supported() {
    let transport = ScriptedTransport::new();
    let connection = connection(&transport);
    let mut cursor = connection.cursor().unwrap();
    assert!(matches!(
        cursor.execute_many(&[Statement::new("SELECT 1")]).await,
        Err(QueryError::NotSupported(_))
    ));
}

#[tokio::test]
async fn test_parameters_and_legacy_dialect() {
    let transport = ScriptedTransport::new().ok(json!({
        "schema": [{"name": "Carrier", "type": "keyword"}],
        "datarows": [["JetBeats"]]
    }));
    let params = ConnectionParams::builder()
        .dialect(Dialect::Legacy)
        .fetch_size(50)
        .build()
        .unwrap();
    let connection = Connection::with_transport(params, transport.clone());
    assert_eq!(connection.dialect(), Dialect::Legacy);

    let statement = Statement::new("SELECT Carrier FROM flights WHERE Carrier = %(c)s").bind("c", "JetBeats");
    let mut cursor = connection.execute_statement(&statement).await.unwrap();
    assert_eq!(cursor.fetch_all().await.unwrap(), vec![vec![Value::from("JetBeats")]]);

    assert_eq!(
        transport.requests()[0].body,
        json!({
            "query": "SELECT Carrier FROM flights WHERE Carrier = 'JetBeats'",
            "fetch_size": 50
        })
    );
}

#[test]
fn test_blocking_execute() {
    let transport = ScriptedTransport::new().ok(standard_first_page(&[4, 5], None));
    let connection = connection(&transport);

    let mut cursor = connection.blocking_execute("SELECT n FROM t").unwrap();
    assert_eq!(
        cursor.blocking_fetch_all().unwrap(),
        vec![vec![Value::Integer(4)], vec![Value::Integer(5)]]
    );
    cursor.blocking_close();
}

#[test]
fn test_cursor_dropped_outside_runtime_releases_server_cursor() {
    let transport = ScriptedTransport::new()
        .ok(standard_first_page(&[1], Some("t1")))
        .ok(json!({"succeeded": true}));
    let connection = connection(&transport);

    let cursor = connection.blocking_execute("SELECT n FROM t").unwrap();
    drop(cursor);

    // The close runs on the shared runtime in the background
    for _ in 0..200 {
        if !transport.requests_to("_sql/close").is_empty() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    let closes = transport.requests_to("_sql/close");
    assert_eq!(closes.len(), 1);
    assert_eq!(closes[0].body, json!({"cursor": "t1"}));
}
