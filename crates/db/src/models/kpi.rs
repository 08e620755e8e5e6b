use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::storage::{Db, Statement, StorageError};

pub const DEFAULT_KPI_UNIT: &str = "件";
pub const RECENT_RECORD_LIMIT: i64 = 10;
pub const HISTORY_LIMIT: i64 = 12;

/// How often a KPI target resets.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RepeatCycle {
    #[default]
    Weekly,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
    None,
}

impl RepeatCycle {
    /// Unknown names behave like a weekly cycle.
    pub fn parse(value: &str) -> Self {
        match value {
            "monthly" => RepeatCycle::Monthly,
            "quarterly" => RepeatCycle::Quarterly,
            "half_yearly" => RepeatCycle::HalfYearly,
            "yearly" => RepeatCycle::Yearly,
            "none" => RepeatCycle::None,
            _ => RepeatCycle::Weekly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RepeatCycle::Weekly => "weekly",
            RepeatCycle::Monthly => "monthly",
            RepeatCycle::Quarterly => "quarterly",
            RepeatCycle::HalfYearly => "half_yearly",
            RepeatCycle::Yearly => "yearly",
            RepeatCycle::None => "none",
        }
    }
}

impl fmt::Display for RepeatCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RepeatCycle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(RepeatCycle::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiGoal {
    pub id: i64,
    pub project_id: i64,
    pub category: String,
    pub title: String,
    pub target_value: f64,
    pub unit: String,
    pub repeat_cycle: RepeatCycle,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiRecord {
    pub id: i64,
    pub goal_id: i64,
    pub value: f64,
    pub recorded_date: String,
    pub note: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiPeriodHistory {
    pub id: i64,
    pub goal_id: i64,
    pub period_start: String,
    pub period_end: String,
    pub target_value: f64,
    pub achieved_value: f64,
    pub achievement_rate: f64,
    pub created_at: Option<String>,
}

/// Inclusive `YYYY-MM-DD` date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodBounds {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone)]
pub struct NewKpiGoal<'a> {
    pub category: &'a str,
    pub title: &'a str,
    pub target_value: f64,
    pub unit: &'a str,
    pub repeat_cycle: RepeatCycle,
    pub period: PeriodBounds,
}

/// Partial update. `period` is `Some(None)` to clear the stored period.
#[derive(Debug, Clone, Default)]
pub struct KpiGoalChanges {
    pub title: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub repeat_cycle: Option<RepeatCycle>,
    pub period: Option<Option<PeriodBounds>>,
}

const GOAL_COLUMNS: &str = "id, project_id, category, title, target_value, unit, repeat_cycle, \
     period_start, period_end, created_at, updated_at";

impl KpiGoal {
    pub async fn find_by_project(db: &Db, project_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {GOAL_COLUMNS} FROM project_kpi_goals WHERE project_id = ? ORDER BY category, id"
            ))
            .bind(project_id),
        )
        .await
    }

    pub async fn find_by_id(db: &Db, id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!("SELECT {GOAL_COLUMNS} FROM project_kpi_goals WHERE id = ?"))
                .bind(id),
        )
        .await
    }

    pub async fn create(
        db: &Db,
        project_id: i64,
        goal: &NewKpiGoal<'_>,
    ) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO project_kpi_goals \
                     (project_id, category, title, target_value, unit, repeat_cycle, period_start, period_end) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(project_id)
                .bind(goal.category)
                .bind(goal.title)
                .bind(goal.target_value)
                .bind(goal.unit)
                .bind(goal.repeat_cycle.as_str())
                .bind(&goal.period.start)
                .bind(&goal.period.end),
            )
            .await?;
        Ok(result.last_row_id)
    }

    /// Write only the fields present in `changes`.
    pub async fn update(db: &Db, id: i64, changes: &KpiGoalChanges) -> Result<(), StorageError> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut stmt_params: Vec<serde_json::Value> = Vec::new();

        if let Some(title) = changes.title.as_deref().filter(|t| !t.is_empty()) {
            assignments.push("title = ?");
            stmt_params.push(title.into());
        }
        if let Some(target) = changes.target_value {
            assignments.push("target_value = ?");
            stmt_params.push(target.into());
        }
        if let Some(unit) = changes.unit.as_deref().filter(|u| !u.is_empty()) {
            assignments.push("unit = ?");
            stmt_params.push(unit.into());
        }
        if let Some(cycle) = changes.repeat_cycle {
            assignments.push("repeat_cycle = ?");
            stmt_params.push(cycle.as_str().into());
        }
        match &changes.period {
            Some(Some(period)) => {
                assignments.push("period_start = ?");
                assignments.push("period_end = ?");
                stmt_params.push(period.start.clone().into());
                stmt_params.push(period.end.clone().into());
            }
            Some(None) => {
                assignments.push("period_start = NULL");
                assignments.push("period_end = NULL");
            }
            None => {}
        }
        assignments.push("updated_at = CURRENT_TIMESTAMP");

        let mut stmt = Statement::new(format!(
            "UPDATE project_kpi_goals SET {} WHERE id = ?",
            assignments.join(", ")
        ));
        for param in stmt_params {
            stmt = stmt.bind(param);
        }
        db.run(stmt.bind(id)).await?;
        Ok(())
    }

    /// Records and history go with the goal through foreign-key cascades.
    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(Statement::new("DELETE FROM project_kpi_goals WHERE id = ?").bind(id))
            .await?;
        Ok(result.changes)
    }

    /// Most recent records, restricted to `period` when given.
    pub async fn recent_records(
        db: &Db,
        goal_id: i64,
        period: Option<&PeriodBounds>,
    ) -> Result<Vec<KpiRecord>, StorageError> {
        let stmt = match period {
            Some(period) => Statement::new(
                "SELECT id, goal_id, value, recorded_date, note, created_at FROM project_kpi_records \
                 WHERE goal_id = ? AND recorded_date >= ? AND recorded_date <= ? \
                 ORDER BY recorded_date DESC, id DESC LIMIT ?",
            )
            .bind(goal_id)
            .bind(&period.start)
            .bind(&period.end),
            None => Statement::new(
                "SELECT id, goal_id, value, recorded_date, note, created_at FROM project_kpi_records \
                 WHERE goal_id = ? ORDER BY recorded_date DESC, id DESC LIMIT ?",
            )
            .bind(goal_id),
        };
        db.all(stmt.bind(RECENT_RECORD_LIMIT)).await
    }

    pub async fn sum_records(
        db: &Db,
        goal_id: i64,
        period: Option<&PeriodBounds>,
    ) -> Result<f64, StorageError> {
        let stmt = match period {
            Some(period) => Statement::new(
                "SELECT COALESCE(SUM(value), 0) FROM project_kpi_records \
                 WHERE goal_id = ? AND recorded_date >= ? AND recorded_date <= ?",
            )
            .bind(goal_id)
            .bind(&period.start)
            .bind(&period.end),
            None => Statement::new(
                "SELECT COALESCE(SUM(value), 0) FROM project_kpi_records WHERE goal_id = ?",
            )
            .bind(goal_id),
        };
        Ok(db.scalar::<f64>(stmt).await?.unwrap_or(0.0))
    }

    pub async fn history(db: &Db, goal_id: i64) -> Result<Vec<KpiPeriodHistory>, StorageError> {
        db.all(
            Statement::new(
                "SELECT id, goal_id, period_start, period_end, target_value, achieved_value, \
                        achievement_rate, created_at \
                 FROM project_kpi_period_history WHERE goal_id = ? \
                 ORDER BY period_end DESC, id DESC LIMIT ?",
            )
            .bind(goal_id)
            .bind(HISTORY_LIMIT),
        )
        .await
    }

    pub async fn add_record(
        db: &Db,
        goal_id: i64,
        value: f64,
        recorded_date: &str,
        note: Option<&str>,
    ) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO project_kpi_records (goal_id, value, recorded_date, note) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(goal_id)
                .bind(value)
                .bind(recorded_date)
                .bind(note.filter(|n| !n.is_empty())),
            )
            .await?;
        Ok(result.last_row_id)
    }

    /// Close `period`: sum its records and store the achievement snapshot.
    pub async fn complete_period(
        db: &Db,
        goal: &KpiGoal,
        period: &PeriodBounds,
    ) -> Result<KpiPeriodHistory, StorageError> {
        let achieved = Self::sum_records(db, goal.id, Some(period)).await?;
        let rate = achievement_rate(achieved, goal.target_value);
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO project_kpi_period_history \
                     (goal_id, period_start, period_end, target_value, achieved_value, achievement_rate) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(goal.id)
                .bind(&period.start)
                .bind(&period.end)
                .bind(goal.target_value)
                .bind(achieved)
                .bind(rate),
            )
            .await?;
        Ok(KpiPeriodHistory {
            id: result.last_row_id,
            goal_id: goal.id,
            period_start: period.start.clone(),
            period_end: period.end.clone(),
            target_value: goal.target_value,
            achieved_value: achieved,
            achievement_rate: rate,
            created_at: None,
        })
    }
}

/// Percentage of `target` reached; zero when there is no positive target.
pub fn achievement_rate(achieved: f64, target: f64) -> f64 {
    if target > 0.0 {
        achieved / target * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_cycle_round_trips_known_names() {
        for cycle in [
            RepeatCycle::Weekly,
            RepeatCycle::Monthly,
            RepeatCycle::Quarterly,
            RepeatCycle::HalfYearly,
            RepeatCycle::Yearly,
            RepeatCycle::None,
        ] {
            assert_eq!(RepeatCycle::parse(cycle.as_str()), cycle);
        }
    }

    #[test]
    fn unknown_or_missing_cycle_reads_as_weekly() {
        let cycle: RepeatCycle = serde_json::from_value(serde_json::json!("fortnightly")).unwrap();
        assert_eq!(cycle, RepeatCycle::Weekly);
        let cycle: RepeatCycle = serde_json::from_value(serde_json::Value::Null).unwrap();
        assert_eq!(cycle, RepeatCycle::Weekly);
    }

    #[test]
    fn achievement_rate_handles_zero_target() {
        assert_eq!(achievement_rate(5.0, 0.0), 0.0);
        assert_eq!(achievement_rate(5.0, 10.0), 50.0);
    }
}
