use std::fmt;

use crate::storage::{Db, Statement, StorageError};

/// Anything a user can own, addressed by its row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Board(i64),
    List(i64),
    Card(i64),
    BoardDocument(i64),
    CardDocument(i64),
    Note(i64),
    NoteCategory(i64),
    StandaloneDocument(i64),
    Project(i64),
    ProjectBoard(i64),
    ProjectList(i64),
    ProjectCard(i64),
    ProjectDocument(i64),
    ProjectGoal(i64),
    KpiGoal(i64),
    ScheduledPost(i64),
    YoutubeChannel(i64),
}

impl Resource {
    pub fn id(self) -> i64 {
        match self {
            Resource::Board(id)
            | Resource::List(id)
            | Resource::Card(id)
            | Resource::BoardDocument(id)
            | Resource::CardDocument(id)
            | Resource::Note(id)
            | Resource::NoteCategory(id)
            | Resource::StandaloneDocument(id)
            | Resource::Project(id)
            | Resource::ProjectBoard(id)
            | Resource::ProjectList(id)
            | Resource::ProjectCard(id)
            | Resource::ProjectDocument(id)
            | Resource::ProjectGoal(id)
            | Resource::KpiGoal(id)
            | Resource::ScheduledPost(id)
            | Resource::YoutubeChannel(id) => id,
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Resource::Board(_) => "board",
            Resource::List(_) => "list",
            Resource::Card(_) => "card",
            Resource::BoardDocument(_) => "board document",
            Resource::CardDocument(_) => "card document",
            Resource::Note(_) => "note",
            Resource::NoteCategory(_) => "note category",
            Resource::StandaloneDocument(_) => "document",
            Resource::Project(_) => "project",
            Resource::ProjectBoard(_) => "project board",
            Resource::ProjectList(_) => "project list",
            Resource::ProjectCard(_) => "project card",
            Resource::ProjectDocument(_) => "project document",
            Resource::ProjectGoal(_) => "goal",
            Resource::KpiGoal(_) => "KPI goal",
            Resource::ScheduledPost(_) => "scheduled post",
            Resource::YoutubeChannel(_) => "YouTube channel",
        }
    }

    /// A query selecting 1 when row `?1` belongs to user `?2`.
    fn ownership_sql(self) -> &'static str {
        match self {
            Resource::Board(_) => "SELECT 1 FROM boards WHERE id = ? AND user_id = ?",
            Resource::List(_) => {
                "SELECT 1 FROM lists l JOIN boards b ON l.board_id = b.id \
                 WHERE l.id = ? AND b.user_id = ?"
            }
            Resource::Card(_) => {
                "SELECT 1 FROM cards c JOIN lists l ON c.list_id = l.id \
                 JOIN boards b ON l.board_id = b.id WHERE c.id = ? AND b.user_id = ?"
            }
            Resource::BoardDocument(_) => {
                "SELECT 1 FROM documents d JOIN boards b ON d.board_id = b.id \
                 WHERE d.id = ? AND b.user_id = ?"
            }
            Resource::CardDocument(_) => {
                "SELECT 1 FROM documents d JOIN cards c ON d.card_id = c.id \
                 JOIN lists l ON c.list_id = l.id JOIN boards b ON l.board_id = b.id \
                 WHERE d.id = ? AND b.user_id = ?"
            }
            Resource::Note(_) => "SELECT 1 FROM notes WHERE id = ? AND user_id = ?",
            Resource::NoteCategory(_) => {
                "SELECT 1 FROM note_categories WHERE id = ? AND user_id = ?"
            }
            Resource::StandaloneDocument(_) => {
                "SELECT 1 FROM standalone_documents WHERE id = ? AND user_id = ?"
            }
            Resource::Project(_) => "SELECT 1 FROM projects WHERE id = ? AND user_id = ?",
            Resource::ProjectBoard(_) => {
                "SELECT 1 FROM project_boards pb JOIN projects p ON pb.project_id = p.id \
                 WHERE pb.id = ? AND p.user_id = ?"
            }
            Resource::ProjectList(_) => {
                "SELECT 1 FROM project_lists pl JOIN project_boards pb ON pl.project_board_id = pb.id \
                 JOIN projects p ON pb.project_id = p.id WHERE pl.id = ? AND p.user_id = ?"
            }
            Resource::ProjectCard(_) => {
                "SELECT 1 FROM project_cards pc JOIN project_lists pl ON pc.project_list_id = pl.id \
                 JOIN project_boards pb ON pl.project_board_id = pb.id \
                 JOIN projects p ON pb.project_id = p.id WHERE pc.id = ? AND p.user_id = ?"
            }
            Resource::ProjectDocument(_) => {
                "SELECT 1 FROM project_documents pd JOIN projects p ON pd.project_id = p.id \
                 WHERE pd.id = ? AND p.user_id = ?"
            }
            Resource::ProjectGoal(_) => {
                "SELECT 1 FROM project_goals g JOIN projects p ON g.project_id = p.id \
                 WHERE g.id = ? AND p.user_id = ?"
            }
            Resource::KpiGoal(_) => {
                "SELECT 1 FROM project_kpi_goals k JOIN projects p ON k.project_id = p.id \
                 WHERE k.id = ? AND p.user_id = ?"
            }
            Resource::ScheduledPost(_) => {
                "SELECT 1 FROM twitter_scheduled_posts sp \
                 JOIN twitter_accounts ta ON sp.account_id = ta.id \
                 JOIN projects p ON ta.project_id = p.id WHERE sp.id = ? AND p.user_id = ?"
            }
            Resource::YoutubeChannel(_) => {
                "SELECT 1 FROM youtube_channels WHERE id = ? AND user_id = ?"
            }
        }
    }

    pub async fn owned_by(self, db: &Db, user_id: i64) -> Result<bool, StorageError> {
        db.exists(
            Statement::new(self.ownership_sql())
                .bind(self.id())
                .bind(user_id),
        )
        .await
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}
