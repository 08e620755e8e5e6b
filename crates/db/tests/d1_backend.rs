//! The D1 backend against a local stand-in for the Cloudflare query API.

use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use db::{D1Config, D1Storage, Db, Statement, StorageError};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

async fn query(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (axum::http::StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    recorded.auth.lock().unwrap().push(auth);
    recorded.bodies.lock().unwrap().push(body.clone());

    let sql = body["sql"].as_str().unwrap_or_default();
    if sql.contains("broken") {
        return (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "errors": [{ "code": 7500, "message": "no such table: broken" }],
                "result": []
            })),
        );
    }
    if sql.starts_with("SELECT") {
        return (
            axum::http::StatusCode::OK,
            Json(json!({
                "success": true,
                "errors": [],
                "result": [{
                    "results": [{ "id": 1, "title": "Inbox" }, { "id": 2, "title": "Later" }],
                    "meta": { "changes": 0, "last_row_id": 0 }
                }]
            })),
        );
    }
    (
        axum::http::StatusCode::OK,
        Json(json!({
            "success": true,
            "errors": [],
            "result": [{ "results": [], "meta": { "changes": 1, "last_row_id": 42 } }]
        })),
    )
}

async fn spawn_stub() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route(
            "/accounts/{account}/d1/database/{database}/query",
            post(query),
        )
        .with_state(recorded.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), recorded)
}

fn storage(base: &str) -> Db {
    Db::new(
        D1Storage::new(D1Config {
            account_id: "acc".into(),
            database_id: "dbid".into(),
            api_token: "secret-token".into(),
            api_base: Some(base.to_string()),
        })
        .unwrap(),
    )
}

#[derive(Debug, serde::Deserialize)]
struct Title {
    id: i64,
    title: String,
}

#[tokio::test]
async fn select_returns_typed_rows_and_sends_params() {
    let (base, recorded) = spawn_stub().await;
    let db = storage(&base);

    let rows: Vec<Title> = db
        .all(Statement::new("SELECT id, title FROM boards WHERE user_id = ?").bind(7))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].id, rows[0].title.as_str()), (1, "Inbox"));
    let bodies = recorded.bodies.lock().unwrap();
    assert_eq!(bodies[0]["params"], json!([7]));
    assert_eq!(recorded.auth.lock().unwrap()[0], "Bearer secret-token");
    assert_eq!(db.backend(), "d1");
}

#[tokio::test]
async fn run_reports_meta() {
    let (base, _recorded) = spawn_stub().await;
    let db = storage(&base);

    let result = db
        .run(Statement::new("INSERT INTO boards (title) VALUES (?)").bind("New"))
        .await
        .unwrap();
    assert_eq!(result.changes, 1);
    assert_eq!(result.last_row_id, 42);
}

#[tokio::test]
async fn failures_surface_the_remote_message_and_stop_a_batch() {
    let (base, recorded) = spawn_stub().await;
    let db = storage(&base);

    let err = db
        .batch(vec![
            Statement::new("UPDATE boards SET title = 'a'"),
            Statement::new("UPDATE broken SET x = 1"),
            Statement::new("UPDATE boards SET title = 'c'"),
        ])
        .await
        .unwrap_err();

    match err {
        StorageError::Remote(message) => assert!(message.contains("no such table: broken")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(recorded.bodies.lock().unwrap().len(), 2);
}
