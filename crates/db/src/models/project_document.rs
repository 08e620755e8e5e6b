use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectDocument {
    pub id: i64,
    pub project_id: i64,
    pub project_board_id: Option<i64>,
    pub title: String,
    pub content: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

const COLUMNS: &str = "id, project_id, project_board_id, title, content, created_at, updated_at";

impl ProjectDocument {
    pub async fn find_by_project(db: &Db, project_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {COLUMNS} FROM project_documents WHERE project_id = ? \
                 ORDER BY updated_at DESC, id DESC"
            ))
            .bind(project_id),
        )
        .await
    }

    pub async fn recent(db: &Db, project_id: i64, limit: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {COLUMNS} FROM project_documents WHERE project_id = ? \
                 ORDER BY updated_at DESC, id DESC LIMIT ?"
            ))
            .bind(project_id)
            .bind(limit),
        )
        .await
    }

    pub async fn find_by_id(db: &Db, id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!("SELECT {COLUMNS} FROM project_documents WHERE id = ?")).bind(id),
        )
        .await
    }

    pub async fn create(
        db: &Db,
        project_id: i64,
        title: &str,
        project_board_id: Option<i64>,
    ) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO project_documents (project_id, project_board_id, title, content) \
                     VALUES (?, ?, ?, '')",
                )
                .bind(project_id)
                .bind(project_board_id)
                .bind(title),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn save(
        db: &Db,
        project_id: i64,
        id: i64,
        title: &str,
        content: Option<&str>,
    ) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "UPDATE project_documents SET title = ?, content = ?, \
                     updated_at = CURRENT_TIMESTAMP WHERE id = ? AND project_id = ?",
                )
                .bind(title)
                .bind(content.unwrap_or(""))
                .bind(id)
                .bind(project_id),
            )
            .await?;
        Ok(result.changes)
    }

    pub async fn delete(db: &Db, project_id: i64, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new("DELETE FROM project_documents WHERE id = ? AND project_id = ?")
                    .bind(id)
                    .bind(project_id),
            )
            .await?;
        Ok(result.changes)
    }
}
