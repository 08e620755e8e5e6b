use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError};

/// A free-standing page owned directly by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandaloneDocument {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl StandaloneDocument {
    pub async fn find_for_user(db: &Db, user_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT id, title, content, created_at, updated_at FROM standalone_documents \
                 WHERE user_id = ? ORDER BY updated_at DESC, id DESC",
            )
            .bind(user_id),
        )
        .await
    }

    pub async fn find(db: &Db, user_id: i64, id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, title, content, created_at, updated_at FROM standalone_documents \
                 WHERE id = ? AND user_id = ?",
            )
            .bind(id)
            .bind(user_id),
        )
        .await
    }

    pub async fn create(db: &Db, user_id: i64, title: &str) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new("INSERT INTO standalone_documents (user_id, title) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(title),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn save(
        db: &Db,
        user_id: i64,
        id: i64,
        title: &str,
        content: Option<&str>,
    ) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "UPDATE standalone_documents \
                     SET title = ?, content = ?, updated_at = CURRENT_TIMESTAMP \
                     WHERE id = ? AND user_id = ?",
                )
                .bind(title)
                .bind(content)
                .bind(id)
                .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }

    pub async fn delete(db: &Db, user_id: i64, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new("DELETE FROM standalone_documents WHERE id = ? AND user_id = ?")
                    .bind(id)
                    .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }
}
