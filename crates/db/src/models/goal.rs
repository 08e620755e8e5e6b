use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Pending,
    InProgress,
    Completed,
}

impl GoalStatus {
    /// Status implied by a progress value against its target.
    pub fn for_progress(current: f64, target: f64) -> Self {
        if current >= target {
            GoalStatus::Completed
        } else if current == 0.0 {
            GoalStatus::Pending
        } else {
            GoalStatus::InProgress
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Pending => "pending",
            GoalStatus::InProgress => "in_progress",
            GoalStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectGoal {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: Option<String>,
    pub deadline: Option<String>,
    pub status: GoalStatus,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalInput {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub target_value: f64,
    pub unit: Option<String>,
    pub deadline: Option<String>,
}

const COLUMNS: &str = "id, project_id, title, description, target_value, current_value, unit, \
     deadline, status, created_at, updated_at";

fn blank_to_null(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ProjectGoal {
    /// In-progress first, then pending, then completed; earliest deadline first within each.
    pub async fn find_by_project(db: &Db, project_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {COLUMNS} FROM project_goals WHERE project_id = ? \
                 ORDER BY CASE status \
                     WHEN 'in_progress' THEN 1 \
                     WHEN 'pending' THEN 2 \
                     WHEN 'completed' THEN 3 \
                     ELSE 4 END, \
                   deadline ASC"
            ))
            .bind(project_id),
        )
        .await
    }

    pub async fn find_by_id(db: &Db, id: i64) -> Result<Option<Self>, StorageError> {
        db.first(Statement::new(format!("SELECT {COLUMNS} FROM project_goals WHERE id = ?")).bind(id))
            .await
    }

    pub async fn create(db: &Db, project_id: i64, data: &GoalInput) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO project_goals \
                     (project_id, title, description, target_value, current_value, unit, deadline, status) \
                     VALUES (?, ?, ?, ?, 0, ?, ?, 'pending')",
                )
                .bind(project_id)
                .bind(&data.title)
                .bind(blank_to_null(&data.description))
                .bind(data.target_value)
                .bind(data.unit.as_deref().unwrap_or(""))
                .bind(blank_to_null(&data.deadline)),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn update(db: &Db, id: i64, data: &GoalInput) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "UPDATE project_goals SET title = ?, description = ?, target_value = ?, unit = ?, \
                 deadline = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(&data.title)
            .bind(blank_to_null(&data.description))
            .bind(data.target_value)
            .bind(data.unit.as_deref().unwrap_or(""))
            .bind(blank_to_null(&data.deadline))
            .bind(id),
        )
        .await?;
        Ok(())
    }

    /// Record progress and derive the status from it.
    pub async fn update_progress(
        db: &Db,
        goal: &ProjectGoal,
        current_value: f64,
    ) -> Result<GoalStatus, StorageError> {
        let status = GoalStatus::for_progress(current_value, goal.target_value);
        db.run(
            Statement::new(
                "UPDATE project_goals SET current_value = ?, status = ?, \
                 updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(current_value)
            .bind(status.as_str())
            .bind(goal.id),
        )
        .await?;
        Ok(status)
    }

    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(Statement::new("DELETE FROM project_goals WHERE id = ?").bind(id))
            .await?;
        Ok(result.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_reaching_target_completes_goal() {
        assert_eq!(GoalStatus::for_progress(10.0, 10.0), GoalStatus::Completed);
        assert_eq!(GoalStatus::for_progress(12.5, 10.0), GoalStatus::Completed);
    }

    #[test]
    fn zero_progress_is_pending_and_partial_is_in_progress() {
        assert_eq!(GoalStatus::for_progress(0.0, 10.0), GoalStatus::Pending);
        assert_eq!(GoalStatus::for_progress(3.0, 10.0), GoalStatus::InProgress);
    }

    #[test]
    fn zero_target_is_completed_immediately() {
        assert_eq!(GoalStatus::for_progress(0.0, 0.0), GoalStatus::Completed);
    }
}
