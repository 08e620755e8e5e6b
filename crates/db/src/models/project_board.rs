//! Kanban boards that belong to a project rather than directly to a user.

use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectBoard {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub position: i64,
    pub created_at: Option<String>,
    pub list_count: i64,
    pub card_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectList {
    pub id: i64,
    pub project_board_id: i64,
    pub title: String,
    pub position: i64,
    #[serde(default)]
    pub cards: Vec<ProjectCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectCard {
    pub id: i64,
    pub project_list_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub position: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectCard {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
}

/// Project board page: every board plus the lists and cards of the selected one.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectBoardsView {
    pub boards: Vec<ProjectBoard>,
    pub selected_board: Option<ProjectBoard>,
    pub lists: Vec<ProjectList>,
}

const BOARD_SELECT: &str = "SELECT pb.id, pb.project_id, pb.title, pb.position, pb.created_at, \
       (SELECT COUNT(*) FROM project_lists pl WHERE pl.project_board_id = pb.id) AS list_count, \
       (SELECT COUNT(*) FROM project_cards pc \
          JOIN project_lists pl ON pc.project_list_id = pl.id \
         WHERE pl.project_board_id = pb.id) AS card_count \
     FROM project_boards pb";

fn blank_to_null(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ProjectBoard {
    pub async fn find_by_project(db: &Db, project_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "{BOARD_SELECT} WHERE pb.project_id = ? ORDER BY pb.position"
            ))
            .bind(project_id),
        )
        .await
    }

    pub async fn recent(db: &Db, project_id: i64, limit: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "{BOARD_SELECT} WHERE pb.project_id = ? ORDER BY pb.created_at DESC, pb.id DESC LIMIT ?"
            ))
            .bind(project_id)
            .bind(limit),
        )
        .await
    }

    pub async fn view(
        db: &Db,
        project_id: i64,
        selected: Option<i64>,
    ) -> Result<ProjectBoardsView, StorageError> {
        let boards = Self::find_by_project(db, project_id).await?;
        let selected_board = selected.and_then(|id| boards.iter().find(|b| b.id == id).cloned());
        let lists = match &selected_board {
            Some(board) => ProjectList::find_with_cards(db, board.id).await?,
            None => Vec::new(),
        };
        Ok(ProjectBoardsView {
            boards,
            selected_board,
            lists,
        })
    }

    pub async fn create(db: &Db, project_id: i64, title: &str) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO project_boards (project_id, title, position) \
                     SELECT ?, ?, COALESCE(MAX(position), -1) + 1 FROM project_boards WHERE project_id = ?",
                )
                .bind(project_id)
                .bind(title)
                .bind(project_id),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(Statement::new("DELETE FROM project_boards WHERE id = ?").bind(id))
            .await?;
        Ok(result.changes)
    }
}

impl ProjectList {
    /// Lists of a board in position order, each with its cards in position order.
    pub async fn find_with_cards(db: &Db, board_id: i64) -> Result<Vec<Self>, StorageError> {
        let mut lists: Vec<ProjectList> = db
            .all(
                Statement::new(
                    "SELECT id, project_board_id, title, position FROM project_lists \
                     WHERE project_board_id = ? ORDER BY position",
                )
                .bind(board_id),
            )
            .await?;
        let cards: Vec<ProjectCard> = db
            .all(
                Statement::new(
                    "SELECT pc.id, pc.project_list_id, pc.title, pc.description, pc.due_date, pc.position \
                     FROM project_cards pc JOIN project_lists pl ON pc.project_list_id = pl.id \
                     WHERE pl.project_board_id = ? ORDER BY pc.position",
                )
                .bind(board_id),
            )
            .await?;
        for card in cards {
            if let Some(list) = lists.iter_mut().find(|l| l.id == card.project_list_id) {
                list.cards.push(card);
            }
        }
        Ok(lists)
    }

    pub async fn create(db: &Db, board_id: i64, title: &str) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO project_lists (project_board_id, title, position) \
                     SELECT ?, ?, COALESCE(MAX(position), -1) + 1 FROM project_lists WHERE project_board_id = ?",
                )
                .bind(board_id)
                .bind(title)
                .bind(board_id),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(Statement::new("DELETE FROM project_lists WHERE id = ?").bind(id))
            .await?;
        Ok(result.changes)
    }
}

impl ProjectCard {
    pub async fn create(db: &Db, list_id: i64, title: &str) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO project_cards (project_list_id, title, position) \
                     SELECT ?, ?, COALESCE(MAX(position), -1) + 1 FROM project_cards WHERE project_list_id = ?",
                )
                .bind(list_id)
                .bind(title)
                .bind(list_id),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn update(db: &Db, id: i64, data: &UpdateProjectCard) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "UPDATE project_cards SET title = ?, description = ?, due_date = ?, \
                 updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(&data.title)
            .bind(blank_to_null(&data.description))
            .bind(blank_to_null(&data.due_date))
            .bind(id),
        )
        .await?;
        Ok(())
    }

    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(Statement::new("DELETE FROM project_cards WHERE id = ?").bind(id))
            .await?;
        Ok(result.changes)
    }
}
