use serde::{Deserialize, Deserializer, Serialize};

use crate::storage::{Db, Statement, StorageError, int_bool};

pub const DEFAULT_NOTE_COLOR: &str = "#FEF3C7";
pub const DEFAULT_CATEGORY_COLOR: &str = "#6B7280";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: String,
    #[serde(deserialize_with = "int_bool")]
    pub pinned: bool,
    #[serde(deserialize_with = "int_bool")]
    pub archived: bool,
    pub category_id: Option<i64>,
    #[serde(deserialize_with = "tags_from_text")]
    pub tags: Vec<String>,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteCategory {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub position: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `category_id` and `tags` are only written when `Some`; use `Some(None)`
/// to clear the category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i64>>,
    pub tags: Option<Vec<String>>,
}

/// The notes screen: either the active or the archived view.
#[derive(Debug, Clone, Serialize)]
pub struct NotesOverview {
    pub notes: Vec<Note>,
    pub categories: Vec<NoteCategory>,
    pub archived_count: i64,
}

/// Tags are stored as a JSON array in a TEXT column; anything unparsable reads as empty.
fn tags_from_text<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default())
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

fn blank_to_null(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Note {
    pub async fn find_for_user(
        db: &Db,
        user_id: i64,
        archived: bool,
    ) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT n.id, n.title, n.content, n.color, n.pinned, n.archived, \
                        n.category_id, n.tags, n.created_at, n.updated_at, \
                        c.name AS category_name, c.color AS category_color \
                 FROM notes n \
                 LEFT JOIN note_categories c ON n.category_id = c.id \
                 WHERE n.user_id = ? AND n.archived = ? \
                 ORDER BY n.pinned DESC, n.updated_at DESC",
            )
            .bind(user_id)
            .bind(archived),
        )
        .await
    }

    pub async fn overview(
        db: &Db,
        user_id: i64,
        archived: bool,
    ) -> Result<NotesOverview, StorageError> {
        let notes = Self::find_for_user(db, user_id, archived).await?;
        let categories = NoteCategory::find_for_user(db, user_id).await?;
        let archived_count = db
            .scalar(
                Statement::new("SELECT COUNT(*) FROM notes WHERE user_id = ? AND archived = 1")
                    .bind(user_id),
            )
            .await?
            .unwrap_or(0);
        Ok(NotesOverview {
            notes,
            categories,
            archived_count,
        })
    }

    pub async fn create(db: &Db, user_id: i64, data: &CreateNote) -> Result<i64, StorageError> {
        let color = blank_to_null(&data.color).unwrap_or(DEFAULT_NOTE_COLOR);
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO notes (user_id, title, content, color, category_id, tags) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(user_id)
                .bind(blank_to_null(&data.title))
                .bind(blank_to_null(&data.content))
                .bind(color)
                .bind(data.category_id)
                .bind(&data.tags),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn update(
        db: &Db,
        user_id: i64,
        id: i64,
        data: &UpdateNote,
    ) -> Result<u64, StorageError> {
        let mut sql = String::from(
            "UPDATE notes SET title = ?, content = ?, color = COALESCE(?, color)",
        );
        if data.category_id.is_some() {
            sql.push_str(", category_id = ?");
        }
        if data.tags.is_some() {
            sql.push_str(", tags = ?");
        }
        sql.push_str(", updated_at = CURRENT_TIMESTAMP WHERE id = ? AND user_id = ?");

        let mut stmt = Statement::new(sql)
            .bind(blank_to_null(&data.title))
            .bind(blank_to_null(&data.content))
            .bind(blank_to_null(&data.color));
        if let Some(category_id) = data.category_id {
            stmt = stmt.bind(category_id);
        }
        if let Some(tags) = &data.tags {
            stmt = stmt.bind(tags);
        }
        let result = db.run(stmt.bind(id).bind(user_id)).await?;
        Ok(result.changes)
    }

    pub async fn delete(db: &Db, user_id: i64, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new("DELETE FROM notes WHERE id = ? AND user_id = ?")
                    .bind(id)
                    .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }

    pub async fn toggle_pinned(db: &Db, user_id: i64, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "UPDATE notes SET pinned = CASE WHEN pinned = 1 THEN 0 ELSE 1 END, \
                     updated_at = CURRENT_TIMESTAMP WHERE id = ? AND user_id = ?",
                )
                .bind(id)
                .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }

    pub async fn toggle_archived(db: &Db, user_id: i64, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "UPDATE notes SET archived = CASE WHEN archived = 1 THEN 0 ELSE 1 END, \
                     updated_at = CURRENT_TIMESTAMP WHERE id = ? AND user_id = ?",
                )
                .bind(id)
                .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }

    pub async fn set_color(
        db: &Db,
        user_id: i64,
        id: i64,
        color: Option<&str>,
    ) -> Result<u64, StorageError> {
        let color = color.filter(|c| !c.is_empty()).unwrap_or(DEFAULT_NOTE_COLOR);
        let result = db
            .run(
                Statement::new(
                    "UPDATE notes SET color = ?, updated_at = CURRENT_TIMESTAMP \
                     WHERE id = ? AND user_id = ?",
                )
                .bind(color)
                .bind(id)
                .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }

    pub async fn set_category(
        db: &Db,
        user_id: i64,
        id: i64,
        category_id: Option<i64>,
    ) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "UPDATE notes SET category_id = ?, updated_at = CURRENT_TIMESTAMP \
                     WHERE id = ? AND user_id = ?",
                )
                .bind(category_id)
                .bind(id)
                .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }

    pub async fn set_tags(
        db: &Db,
        user_id: i64,
        id: i64,
        tags: &[String],
    ) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "UPDATE notes SET tags = ?, updated_at = CURRENT_TIMESTAMP \
                     WHERE id = ? AND user_id = ?",
                )
                .bind(tags)
                .bind(id)
                .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }
}

impl NoteCategory {
    pub async fn find_for_user(db: &Db, user_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT id, name, color, position FROM note_categories \
                 WHERE user_id = ? ORDER BY position",
            )
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
        let color = color.filter(|c| !c.is_empty()).unwrap_or(DEFAULT_CATEGORY_COLOR);
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO note_categories (user_id, name, color, position) \
                     SELECT ?, ?, ?, COALESCE(MAX(position), -1) + 1 \
                     FROM note_categories WHERE user_id = ?",
                )
                .bind(user_id)
                .bind(name)
                .bind(color)
                .bind(user_id),
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
                    "UPDATE note_categories SET name = ?, color = COALESCE(?, color) \
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

    /// Detach the category's notes, then remove it, in one batch.
    pub async fn delete(db: &Db, user_id: i64, id: i64) -> Result<u64, StorageError> {
        let results = db
            .batch(vec![
                Statement::new("UPDATE notes SET category_id = NULL WHERE category_id = ? AND user_id = ?")
                    .bind(id)
                    .bind(user_id),
                Statement::new("DELETE FROM note_categories WHERE id = ? AND user_id = ?")
                    .bind(id)
                    .bind(user_id),
            ])
            .await?;
        Ok(results.last().map(|r| r.changes).unwrap_or(0))
    }
}
