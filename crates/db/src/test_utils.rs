//! Test utilities for database tests.
//!
//! Every test gets its own migrated SQLite file. Migrations run once into a
//! template database which is then copied, which keeps the suite fast.

use std::sync::OnceLock;

use tempfile::TempDir;
use tokio::sync::OnceCell;

use crate::storage::{Db, Statement, sqlite::SqliteStorage};

/// Shared template database with migrations already applied.
static TEMPLATE_DIR: OnceLock<TempDir> = OnceLock::new();
static TEMPLATE_READY: OnceCell<()> = OnceCell::const_new();

fn template_dir() -> &'static TempDir {
    TEMPLATE_DIR.get_or_init(|| TempDir::new().expect("Failed to create template temp dir"))
}

async fn ensure_template_ready() {
    TEMPLATE_READY
        .get_or_init(|| async {
            let template_path = template_dir().path().join("template.db");
            let storage = SqliteStorage::open(&template_path, 1)
                .await
                .expect("Failed to create template database");
            // Checkpoint and close so the copy below sees a complete file.
            storage.close().await;
            tracing::debug!("Template database ready at {:?}", template_path);
        })
        .await;
}

/// Create a migrated test database.
///
/// Returns the handle and a TempDir that must be kept alive for the duration of the test.
pub async fn create_test_db() -> (Db, TempDir) {
    ensure_template_ready().await;

    let temp_dir = TempDir::new().expect("Failed to create test temp dir");
    let db_path = temp_dir.path().join("test.db");
    let template_path = template_dir().path().join("template.db");
    std::fs::copy(&template_path, &db_path).expect("Failed to copy template database");

    let storage = SqliteStorage::open(&db_path, 5)
        .await
        .expect("Failed to open test database");
    (Db::new(storage), temp_dir)
}

/// Insert a user and return its id.
pub async fn seed_user(db: &Db, username: &str) -> i64 {
    db.run(
        Statement::new("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind("$2b$10$test.hash.not.used.for.login........................"),
    )
    .await
    .expect("Failed to seed user")
    .last_row_id
}

/// Insert a project owned by `user_id` and return its id.
pub async fn seed_project(db: &Db, user_id: i64, title: &str) -> i64 {
    db.run(
        Statement::new("INSERT INTO projects (user_id, title, position) VALUES (?, ?, 0)")
            .bind(user_id)
            .bind(title),
    )
    .await
    .expect("Failed to seed project")
    .last_row_id
}
