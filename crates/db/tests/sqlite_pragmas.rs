//! Connection setup of the local SQLite backend.
//!
//! Every pooled connection must run in WAL mode with foreign keys enforced,
//! since board and project deletion rely on `ON DELETE CASCADE`.

use db::{Db, SqliteStorage, Statement};
use sqlx::Row;
use tempfile::TempDir;

#[tokio::test]
async fn open_creates_missing_directories() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("nested").join("data").join("boardroom.db");

    let storage = SqliteStorage::open(&db_path, 2)
        .await
        .expect("Failed to open database");
    assert!(db_path.exists());
    storage.close().await;
}

#[tokio::test]
async fn connections_use_wal_and_foreign_keys() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = SqliteStorage::open(&temp_dir.path().join("test.db"), 3)
        .await
        .expect("Failed to open database");

    // Check several connections, not just the first one handed out.
    for _ in 0..3 {
        let mut conn = storage.pool().acquire().await.expect("acquire");
        let journal: String = sqlx::query("PRAGMA journal_mode")
            .fetch_one(&mut *conn)
            .await
            .expect("journal_mode")
            .get(0);
        assert_eq!(journal.to_lowercase(), "wal");

        let foreign_keys: i64 = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(&mut *conn)
            .await
            .expect("foreign_keys")
            .get(0);
        assert_eq!(foreign_keys, 1);

        let temp_store: i64 = sqlx::query("PRAGMA temp_store")
            .fetch_one(&mut *conn)
            .await
            .expect("temp_store")
            .get(0);
        assert_eq!(temp_store, 2);
    }
    storage.close().await;
}

#[tokio::test]
async fn deleting_a_user_cascades_to_boards() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = SqliteStorage::open(&temp_dir.path().join("test.db"), 2)
        .await
        .expect("Failed to open database");
    let db = Db::new(storage);

    let user_id = db
        .run(
            Statement::new("INSERT INTO users (username, password_hash) VALUES (?, ?)")
                .bind("alice")
                .bind("hash"),
        )
        .await
        .expect("insert user")
        .last_row_id;
    db.run(
        Statement::new("INSERT INTO boards (user_id, title) VALUES (?, ?)")
            .bind(user_id)
            .bind("Roadmap"),
    )
    .await
    .expect("insert board");

    db.run(Statement::new("DELETE FROM users WHERE id = ?").bind(user_id))
        .await
        .expect("delete user");

    let remaining: Option<i64> = db
        .scalar(Statement::new("SELECT COUNT(*) FROM boards"))
        .await
        .expect("count boards");
    assert_eq!(remaining, Some(0));
}

#[tokio::test]
async fn reopening_keeps_migrations_idempotent() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("test.db");

    let first = SqliteStorage::open(&path, 1).await.expect("first open");
    first.close().await;
    let second = SqliteStorage::open(&path, 1).await.expect("second open");
    second.migrate().await.expect("migrate again");
    second.close().await;
}
