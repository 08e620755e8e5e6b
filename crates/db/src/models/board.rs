use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError, int_bool};

/// Maximum number of root documents a board may carry.
pub const MAX_BOARD_DOCUMENTS: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Board {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub position: i64,
    pub project_id: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardList {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: i64,
    pub list_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub position: i64,
    pub title_color: Option<String>,
    pub description_color: Option<String>,
    pub due_date_color: Option<String>,
    pub title_bg_color: Option<String>,
    pub description_bg_color: Option<String>,
    pub border_color: Option<String>,
    #[serde(deserialize_with = "int_bool")]
    pub discord_notify: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardDocumentSummary {
    pub id: i64,
    pub title: String,
}

/// Everything the board screen renders in one load.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub board: Board,
    pub lists: Vec<BoardList>,
    pub cards: Vec<Card>,
    pub documents: Vec<BoardDocumentSummary>,
}

/// Full replacement of a card's editable fields. Empty strings are stored as NULL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCard {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub title_color: Option<String>,
    pub description_color: Option<String>,
    pub due_date_color: Option<String>,
    pub title_bg_color: Option<String>,
    pub description_bg_color: Option<String>,
    pub border_color: Option<String>,
    pub discord_notify: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CardPlacement {
    pub id: i64,
    pub list_id: i64,
    pub position: i64,
}

const BOARD_COLUMNS: &str = "id, user_id, title, position, project_id, created_at, updated_at";

const CARD_COLUMNS: &str = "c.id, c.list_id, c.title, c.description, c.due_date, c.position, \
     c.title_color, c.description_color, c.due_date_color, \
     c.title_bg_color, c.description_bg_color, c.border_color, c.discord_notify";

fn blank_to_null(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Board {
    pub async fn find_by_user(db: &Db, user_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {BOARD_COLUMNS} FROM boards WHERE user_id = ? ORDER BY position"
            ))
            .bind(user_id),
        )
        .await
    }

    pub async fn find_by_id(db: &Db, id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = ?")).bind(id),
        )
        .await
    }

    pub async fn find_by_project(db: &Db, project_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {BOARD_COLUMNS} FROM boards WHERE project_id = ? ORDER BY position"
            ))
            .bind(project_id),
        )
        .await
    }

    /// Append a board after the user's last one.
    pub async fn create(db: &Db, user_id: i64, title: &str) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO boards (user_id, title, position) \
                     SELECT ?, ?, COALESCE(MAX(position), -1) + 1 FROM boards WHERE user_id = ?",
                )
                .bind(user_id)
                .bind(title)
                .bind(user_id),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn rename(db: &Db, id: i64, title: &str) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "UPDATE boards SET title = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(title)
            .bind(id),
        )
        .await?;
        Ok(())
    }

    /// Lists, cards and documents go with the board through foreign-key cascades.
    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(Statement::new("DELETE FROM boards WHERE id = ?").bind(id))
            .await?;
        Ok(result.changes)
    }

    /// Attach the board to a project, or detach it with `None`.
    pub async fn set_project(
        db: &Db,
        id: i64,
        project_id: Option<i64>,
    ) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "UPDATE boards SET project_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(project_id)
            .bind(id),
        )
        .await?;
        Ok(())
    }

    pub async fn view(db: &Db, board: Board) -> Result<BoardView, StorageError> {
        let lists = BoardList::find_by_board(db, board.id).await?;
        let cards = Card::find_by_board(db, board.id).await?;
        let documents = db
            .all(
                Statement::new(
                    "SELECT id, title FROM documents \
                     WHERE board_id = ? AND parent_id IS NULL ORDER BY id LIMIT ?",
                )
                .bind(board.id)
                .bind(MAX_BOARD_DOCUMENTS),
            )
            .await?;
        Ok(BoardView {
            board,
            lists,
            cards,
            documents,
        })
    }
}

impl BoardList {
    pub async fn find_by_board(db: &Db, board_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT id, board_id, title, position FROM lists WHERE board_id = ? ORDER BY position",
            )
            .bind(board_id),
        )
        .await
    }

    pub async fn create(db: &Db, board_id: i64, title: &str) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO lists (board_id, title, position) \
                     SELECT ?, ?, COALESCE(MAX(position), -1) + 1 FROM lists WHERE board_id = ?",
                )
                .bind(board_id)
                .bind(title)
                .bind(board_id),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn rename(db: &Db, id: i64, title: &str) -> Result<(), StorageError> {
        db.run(
            Statement::new("UPDATE lists SET title = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
                .bind(title)
                .bind(id),
        )
        .await?;
        Ok(())
    }

    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(Statement::new("DELETE FROM lists WHERE id = ?").bind(id))
            .await?;
        Ok(result.changes)
    }
}

impl Card {
    pub async fn find_by_id(db: &Db, id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!("SELECT {CARD_COLUMNS} FROM cards c WHERE c.id = ?")).bind(id),
        )
        .await
    }

    /// Cards of every list on the board, ordered by position within the board.
    pub async fn find_by_board(db: &Db, board_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {CARD_COLUMNS} FROM cards c JOIN lists l ON c.list_id = l.id \
                 WHERE l.board_id = ? ORDER BY c.position"
            ))
            .bind(board_id),
        )
        .await
    }

    pub async fn create(db: &Db, list_id: i64, title: &str) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO cards (list_id, title, position) \
                     SELECT ?, ?, COALESCE(MAX(position), -1) + 1 FROM cards WHERE list_id = ?",
                )
                .bind(list_id)
                .bind(title)
                .bind(list_id),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn update(db: &Db, id: i64, data: &UpdateCard) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "UPDATE cards SET title = ?, description = ?, due_date = ?, title_color = ?, \
                 description_color = ?, due_date_color = ?, title_bg_color = ?, \
                 description_bg_color = ?, border_color = ?, discord_notify = ?, \
                 updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(&data.title)
            .bind(blank_to_null(&data.description))
            .bind(blank_to_null(&data.due_date))
            .bind(blank_to_null(&data.title_color))
            .bind(blank_to_null(&data.description_color))
            .bind(blank_to_null(&data.due_date_color))
            .bind(blank_to_null(&data.title_bg_color))
            .bind(blank_to_null(&data.description_bg_color))
            .bind(blank_to_null(&data.border_color))
            .bind(data.discord_notify)
            .bind(id),
        )
        .await?;
        Ok(())
    }

    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(Statement::new("DELETE FROM cards WHERE id = ?").bind(id))
            .await?;
        Ok(result.changes)
    }

    fn placement_statement(placement: &CardPlacement) -> Statement {
        Statement::new(
            "UPDATE cards SET list_id = ?, position = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(placement.list_id)
        .bind(placement.position)
        .bind(placement.id)
    }

    pub async fn place(db: &Db, placement: &CardPlacement) -> Result<(), StorageError> {
        db.run(Self::placement_statement(placement)).await?;
        Ok(())
    }

    /// Apply several placements as one batch.
    pub async fn reorder(db: &Db, placements: &[CardPlacement]) -> Result<(), StorageError> {
        db.batch(placements.iter().map(Self::placement_statement).collect())
            .await?;
        Ok(())
    }
}
