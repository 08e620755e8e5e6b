//! Hierarchical pages hanging off a board or a card.
//!
//! Both kinds live in the `documents` table and form a tree through
//! `parent_id`. Root pages (`parent_id IS NULL`) are created by dedicated
//! operations; everything created through the tree editor is a sub-page.

use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError};

/// Root board pages and direct sub-pages of a board root are both capped.
pub const MAX_BOARD_CHILDREN: i64 = 3;

pub const BOARD_DOCUMENT_PLACEHOLDER: &str = "<p>Start typing here...</p>";
pub const CARD_DOCUMENT_PLACEHOLDER: &str = "<p>Start writing this card's document here...</p>";

/// Which container a document tree belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentScope {
    Board(i64),
    Card(i64),
}

impl DocumentScope {
    fn column(self) -> &'static str {
        match self {
            DocumentScope::Board(_) => "board_id",
            DocumentScope::Card(_) => "card_id",
        }
    }

    fn id(self) -> i64 {
        match self {
            DocumentScope::Board(id) | DocumentScope::Card(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: i64,
    pub board_id: Option<i64>,
    pub card_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub title: String,
    pub content: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Document {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocument {
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveDocument {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

const COLUMNS: &str =
    "id, board_id, card_id, parent_id, title, content, created_at, updated_at";

impl Document {
    pub async fn find_by_id(db: &Db, id: i64) -> Result<Option<Self>, StorageError> {
        db.first(Statement::new(format!("SELECT {COLUMNS} FROM documents WHERE id = ?")).bind(id))
            .await
    }

    pub async fn find_in_scope(
        db: &Db,
        scope: DocumentScope,
        id: i64,
    ) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!(
                "SELECT {COLUMNS} FROM documents WHERE id = ? AND {} = ?",
                scope.column()
            ))
            .bind(id)
            .bind(scope.id()),
        )
        .await
    }

    /// Whole tree of a board or card: roots first, then by creation time.
    pub async fn tree(db: &Db, scope: DocumentScope) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {COLUMNS} FROM documents WHERE {} = ? \
                 ORDER BY parent_id NULLS FIRST, created_at ASC, id ASC",
                scope.column()
            ))
            .bind(scope.id()),
        )
        .await
    }

    pub async fn count_roots(db: &Db, scope: DocumentScope) -> Result<i64, StorageError> {
        Ok(db
            .scalar(
                Statement::new(format!(
                    "SELECT COUNT(*) FROM documents WHERE {} = ? AND parent_id IS NULL",
                    scope.column()
                ))
                .bind(scope.id()),
            )
            .await?
            .unwrap_or(0))
    }

    pub async fn count_children(db: &Db, parent_id: i64) -> Result<i64, StorageError> {
        Ok(db
            .scalar(Statement::new("SELECT COUNT(*) FROM documents WHERE parent_id = ?").bind(parent_id))
            .await?
            .unwrap_or(0))
    }

    pub async fn find_root(db: &Db, scope: DocumentScope) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!(
                "SELECT {COLUMNS} FROM documents WHERE {} = ? AND parent_id IS NULL ORDER BY id LIMIT 1",
                scope.column()
            ))
            .bind(scope.id()),
        )
        .await
    }

    /// Insert a root page owned by `user_id` on a board.
    pub async fn create_board_root(
        db: &Db,
        board_id: i64,
        user_id: i64,
        title: &str,
    ) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO documents (user_id, board_id, title, content) VALUES (?, ?, ?, ?)",
                )
                .bind(user_id)
                .bind(board_id)
                .bind(title)
                .bind(BOARD_DOCUMENT_PLACEHOLDER),
            )
            .await?;
        Ok(result.last_row_id)
    }

    /// Return the card's root page, creating it from the card title when missing.
    pub async fn ensure_card_root(
        db: &Db,
        card_id: i64,
        card_title: &str,
    ) -> Result<Self, StorageError> {
        let scope = DocumentScope::Card(card_id);
        if let Some(root) = Self::find_root(db, scope).await? {
            return Ok(root);
        }
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO documents (card_id, title, content, parent_id) VALUES (?, ?, ?, NULL)",
                )
                .bind(card_id)
                .bind(card_title)
                .bind(CARD_DOCUMENT_PLACEHOLDER),
            )
            .await?;
        tracing::debug!(card_id, document_id = result.last_row_id, "created card root page");
        Self::find_by_id(db, result.last_row_id)
            .await?
            .ok_or(StorageError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn create_child(
        db: &Db,
        scope: DocumentScope,
        parent_id: i64,
        title: &str,
        content: &str,
    ) -> Result<i64, StorageError> {
        let sql = format!(
            "INSERT INTO documents ({}, title, content, parent_id) VALUES (?, ?, ?, ?)",
            scope.column()
        );
        let result = db
            .run(
                Statement::new(sql)
                    .bind(scope.id())
                    .bind(title)
                    .bind(content)
                    .bind(parent_id),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn rename(db: &Db, id: i64, title: &str) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "UPDATE documents SET title = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(title)
            .bind(id),
        )
        .await?;
        Ok(())
    }

    /// Save title and content; returns false when the page is not in `scope`.
    pub async fn save(
        db: &Db,
        scope: DocumentScope,
        id: i64,
        data: &SaveDocument,
    ) -> Result<bool, StorageError> {
        let result = db
            .run(
                Statement::new(format!(
                    "UPDATE documents SET title = ?, content = ?, updated_at = CURRENT_TIMESTAMP \
                     WHERE id = ? AND {} = ?",
                    scope.column()
                ))
                .bind(&data.title)
                .bind(&data.content)
                .bind(id)
                .bind(scope.id()),
            )
            .await?;
        Ok(result.changes > 0)
    }

    /// Single-page editor: overwrite the card root's content, creating it if needed.
    pub async fn save_card_content(
        db: &Db,
        card_id: i64,
        card_title: &str,
        content: &str,
    ) -> Result<Self, StorageError> {
        let root = Self::ensure_card_root(db, card_id, card_title).await?;
        db.run(
            Statement::new(
                "UPDATE documents SET content = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(content)
            .bind(root.id),
        )
        .await?;
        Ok(Self {
            content: Some(content.to_string()),
            ..root
        })
    }

    /// Sub-pages go with their parent through the foreign-key cascade.
    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(Statement::new("DELETE FROM documents WHERE id = ?").bind(id))
            .await?;
        Ok(result.changes)
    }
}
