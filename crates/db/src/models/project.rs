use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError};

pub const DEFAULT_PROJECT_COLOR: &str = "#3B82F6";
pub const DEFAULT_PROJECT_STATUS: &str = "active";
pub const DEFAULT_TAG_COLOR: &str = "#6B7280";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub color: String,
    pub position: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectTag {
    pub id: i64,
    pub name: String,
    pub color: String,
}

/// Row of the project index with milestone progress counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub color: String,
    pub position: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub milestone_count: i64,
    pub completed_tasks: i64,
    pub total_tasks: i64,
    #[serde(default)]
    pub tags: Vec<ProjectTag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProject {
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub status: Option<String>,
    /// Replaces the project's tag set when present.
    pub tag_ids: Option<Vec<i64>>,
}

/// Board entry of the cross-project sidebar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectBoardSummary {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub project_title: Option<String>,
    pub list_count: i64,
    pub card_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectDocumentSummary {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub updated_at: Option<String>,
    pub project_title: Option<String>,
}

/// Navigation data shared by every page under a project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectLayout {
    pub project: Project,
    pub all_boards: Vec<ProjectBoardSummary>,
    pub all_documents: Vec<ProjectDocumentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectBoardStats {
    pub total_boards: i64,
    pub total_lists: i64,
    pub total_cards: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectDocumentStats {
    pub total_documents: i64,
    pub with_content: i64,
}

fn blank_to_null(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

const PROJECT_COLUMNS: &str =
    "id, user_id, title, description, status, color, position, created_at, updated_at";

impl Project {
    pub async fn find_by_id(db: &Db, id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?")).bind(id),
        )
        .await
    }

    pub async fn find_summaries(
        db: &Db,
        user_id: i64,
    ) -> Result<Vec<ProjectSummary>, StorageError> {
        let mut projects: Vec<ProjectSummary> = db
            .all(
                Statement::new(
                    "SELECT p.id, p.title, p.description, p.status, p.color, p.position, \
                            p.created_at, p.updated_at, \
                            (SELECT COUNT(*) FROM milestones m WHERE m.project_id = p.id) AS milestone_count, \
                            (SELECT COUNT(*) FROM milestone_tasks mt \
                               JOIN milestones m ON mt.milestone_id = m.id \
                              WHERE m.project_id = p.id AND mt.completed = 1) AS completed_tasks, \
                            (SELECT COUNT(*) FROM milestone_tasks mt \
                               JOIN milestones m ON mt.milestone_id = m.id \
                              WHERE m.project_id = p.id) AS total_tasks \
                     FROM projects p WHERE p.user_id = ? ORDER BY p.position",
                )
                .bind(user_id),
            )
            .await?;

        let mappings: Vec<TagMapping> = db
            .all(
                Statement::new(
                    "SELECT ptm.project_id, pt.id, pt.name, pt.color \
                     FROM project_tag_mappings ptm \
                     JOIN project_tags pt ON pt.id = ptm.tag_id \
                     JOIN projects p ON p.id = ptm.project_id \
                     WHERE p.user_id = ? ORDER BY pt.name",
                )
                .bind(user_id),
            )
            .await?;
        for mapping in mappings {
            if let Some(project) = projects.iter_mut().find(|p| p.id == mapping.project_id) {
                project.tags.push(ProjectTag {
                    id: mapping.id,
                    name: mapping.name,
                    color: mapping.color,
                });
            }
        }
        Ok(projects)
    }

    pub async fn create(db: &Db, user_id: i64, data: &CreateProject) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO projects (user_id, title, description, color, position) \
                     SELECT ?, ?, ?, ?, COALESCE(MAX(position), -1) + 1 FROM projects WHERE user_id = ?",
                )
                .bind(user_id)
                .bind(&data.title)
                .bind(blank_to_null(&data.description))
                .bind(blank_to_null(&data.color).unwrap_or(DEFAULT_PROJECT_COLOR))
                .bind(user_id),
            )
            .await?;
        Ok(result.last_row_id)
    }

    /// Update the project row and, when `tag_ids` is given, replace its tag mappings
    /// in the same batch.
    pub async fn update(db: &Db, id: i64, data: &UpdateProject) -> Result<(), StorageError> {
        let mut statements = vec![
            Statement::new(
                "UPDATE projects SET title = ?, description = ?, color = ?, status = ?, \
                 updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(&data.title)
            .bind(blank_to_null(&data.description))
            .bind(blank_to_null(&data.color).unwrap_or(DEFAULT_PROJECT_COLOR))
            .bind(blank_to_null(&data.status).unwrap_or(DEFAULT_PROJECT_STATUS))
            .bind(id),
        ];
        if let Some(tag_ids) = &data.tag_ids {
            statements.push(
                Statement::new("DELETE FROM project_tag_mappings WHERE project_id = ?").bind(id),
            );
            // Only tags owned by the project's user can be attached.
            statements.extend(tag_ids.iter().map(|tag_id| {
                Statement::new(
                    "INSERT OR IGNORE INTO project_tag_mappings (project_id, tag_id) \
                     SELECT p.id, t.id FROM projects p JOIN project_tags t ON t.user_id = p.user_id \
                     WHERE p.id = ? AND t.id = ?",
                )
                .bind(id)
                .bind(*tag_id)
            }));
        }
        db.batch(statements).await?;
        Ok(())
    }

    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(Statement::new("DELETE FROM projects WHERE id = ?").bind(id))
            .await?;
        Ok(result.changes)
    }

    pub async fn tags(db: &Db, id: i64) -> Result<Vec<ProjectTag>, StorageError> {
        db.all(
            Statement::new(
                "SELECT pt.id, pt.name, pt.color FROM project_tags pt \
                 JOIN project_tag_mappings ptm ON pt.id = ptm.tag_id \
                 WHERE ptm.project_id = ? ORDER BY pt.name",
            )
            .bind(id),
        )
        .await
    }

    pub async fn layout(db: &Db, project: Project) -> Result<ProjectLayout, StorageError> {
        let all_boards = db
            .all(
                Statement::new(
                    "SELECT pb.id, pb.project_id, pb.title, p.title AS project_title, \
                            (SELECT COUNT(*) FROM project_lists pl WHERE pl.project_board_id = pb.id) AS list_count, \
                            (SELECT COUNT(*) FROM project_cards pc \
                               JOIN project_lists pl ON pc.project_list_id = pl.id \
                              WHERE pl.project_board_id = pb.id) AS card_count \
                     FROM project_boards pb JOIN projects p ON pb.project_id = p.id \
                     WHERE p.user_id = ? ORDER BY pb.created_at DESC, pb.id DESC",
                )
                .bind(project.user_id),
            )
            .await?;
        let all_documents = db
            .all(
                Statement::new(
                    "SELECT pd.id, pd.project_id, pd.title, pd.updated_at, p.title AS project_title \
                     FROM project_documents pd JOIN projects p ON pd.project_id = p.id \
                     WHERE p.user_id = ? ORDER BY pd.updated_at DESC, pd.id DESC",
                )
                .bind(project.user_id),
            )
            .await?;
        Ok(ProjectLayout {
            project,
            all_boards,
            all_documents,
        })
    }

    pub async fn board_stats(db: &Db, id: i64) -> Result<ProjectBoardStats, StorageError> {
        let stats = db
            .first(
                Statement::new(
                    "SELECT \
                       (SELECT COUNT(*) FROM project_boards WHERE project_id = ?) AS total_boards, \
                       (SELECT COUNT(*) FROM project_lists pl \
                          JOIN project_boards pb ON pl.project_board_id = pb.id \
                         WHERE pb.project_id = ?) AS total_lists, \
                       (SELECT COUNT(*) FROM project_cards pc \
                          JOIN project_lists pl ON pc.project_list_id = pl.id \
                          JOIN project_boards pb ON pl.project_board_id = pb.id \
                         WHERE pb.project_id = ?) AS total_cards",
                )
                .bind(id)
                .bind(id)
                .bind(id),
            )
            .await?;
        Ok(stats.unwrap_or(ProjectBoardStats {
            total_boards: 0,
            total_lists: 0,
            total_cards: 0,
        }))
    }

    pub async fn document_stats(db: &Db, id: i64) -> Result<ProjectDocumentStats, StorageError> {
        let stats = db
            .first(
                Statement::new(
                    "SELECT COUNT(*) AS total_documents, \
                            COUNT(CASE WHEN content IS NOT NULL AND LENGTH(content) > 0 THEN 1 END) AS with_content \
                     FROM project_documents WHERE project_id = ?",
                )
                .bind(id),
            )
            .await?;
        Ok(stats.unwrap_or(ProjectDocumentStats {
            total_documents: 0,
            with_content: 0,
        }))
    }
}

#[derive(Deserialize)]
struct TagMapping {
    project_id: i64,
    id: i64,
    name: String,
    color: String,
}

impl ProjectTag {
    pub async fn find_for_user(db: &Db, user_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new("SELECT id, name, color FROM project_tags WHERE user_id = ? ORDER BY name")
                .bind(user_id),
        )
        .await
    }

    pub async fn create(
        db: &Db,
        user_id: i64,
        name: &str,
        color: Option<&str>,
    ) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new("INSERT INTO project_tags (user_id, name, color) VALUES (?, ?, ?)")
                    .bind(user_id)
                    .bind(name)
                    .bind(color.filter(|c| !c.is_empty()).unwrap_or(DEFAULT_TAG_COLOR)),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn update(
        db: &Db,
        user_id: i64,
        id: i64,
        name: &str,
        color: Option<&str>,
    ) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "UPDATE project_tags SET name = ?, color = COALESCE(?, color) \
                     WHERE id = ? AND user_id = ?",
                )
                .bind(name)
                .bind(color.filter(|c| !c.is_empty()))
                .bind(id)
                .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }

    /// Mappings are removed by the foreign-key cascade.
    pub async fn delete(db: &Db, user_id: i64, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new("DELETE FROM project_tags WHERE id = ? AND user_id = ?")
                    .bind(id)
                    .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }
}
