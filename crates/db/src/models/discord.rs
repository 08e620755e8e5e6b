use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError, int_bool};

pub const WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";
pub const DEFAULT_DAYS_AHEAD: i64 = 3;
pub const DEFAULT_CRON_SCHEDULE: &str = "0 9 * * *";
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardDiscordSettings {
    pub id: i64,
    pub board_id: i64,
    pub webhook_url: String,
    #[serde(deserialize_with = "int_bool")]
    pub enabled: bool,
    pub days_ahead: i64,
    pub cron_schedule: String,
    pub timezone: String,
    pub last_sent_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveDiscordSettings {
    pub webhook_url: String,
    pub enabled: bool,
    pub days_ahead: i64,
    pub cron_schedule: String,
    pub timezone: String,
}

/// Enabled settings joined with their board, as consumed by the digest job.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DigestTarget {
    pub board_id: i64,
    pub board_title: String,
    pub webhook_url: String,
    pub days_ahead: i64,
    pub cron_schedule: String,
    pub timezone: String,
    pub last_sent_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpcomingTask {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: String,
    pub list_title: String,
    pub days_until_due: i64,
}

const SETTINGS_COLUMNS: &str = "id, board_id, webhook_url, enabled, \
                                COALESCE(days_ahead, 3) AS days_ahead, cron_schedule, \
                                COALESCE(timezone, 'Asia/Tokyo') AS timezone, last_sent_at, updated_at";

impl BoardDiscordSettings {
    pub async fn find_by_board(db: &Db, board_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!(
                "SELECT {SETTINGS_COLUMNS} FROM board_discord_settings WHERE board_id = ?"
            ))
            .bind(board_id),
        )
        .await
    }

    pub async fn save(
        db: &Db,
        board_id: i64,
        data: &SaveDiscordSettings,
    ) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "INSERT INTO board_discord_settings \
                 (board_id, webhook_url, enabled, days_ahead, cron_schedule, timezone) \
                 VALUES (?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(board_id) DO UPDATE SET \
                    webhook_url = excluded.webhook_url, \
                    enabled = excluded.enabled, \
                    days_ahead = excluded.days_ahead, \
                    cron_schedule = excluded.cron_schedule, \
                    timezone = excluded.timezone, \
                    updated_at = CURRENT_TIMESTAMP",
            )
            .bind(board_id)
            .bind(&data.webhook_url)
            .bind(data.enabled)
            .bind(data.days_ahead)
            .bind(&data.cron_schedule)
            .bind(&data.timezone),
        )
        .await?;
        Ok(())
    }

    pub async fn digest_targets(db: &Db) -> Result<Vec<DigestTarget>, StorageError> {
        db.all(Statement::new(
            "SELECT s.board_id, b.title AS board_title, s.webhook_url, \
                    COALESCE(s.days_ahead, 3) AS days_ahead, s.cron_schedule, \
                    COALESCE(s.timezone, 'Asia/Tokyo') AS timezone, s.last_sent_at \
             FROM board_discord_settings s \
             INNER JOIN boards b ON b.id = s.board_id \
             WHERE s.enabled = 1 AND s.webhook_url != '' \
             ORDER BY s.board_id",
        ))
        .await
    }

    pub async fn mark_sent(db: &Db, board_id: i64, sent_at: &str) -> Result<(), StorageError> {
        db.run(
            Statement::new("UPDATE board_discord_settings SET last_sent_at = ? WHERE board_id = ?")
                .bind(sent_at)
                .bind(board_id),
        )
        .await?;
        Ok(())
    }
}

impl UpcomingTask {
    /// Cards on the board due between now and `days_ahead` days from now.
    pub async fn for_board(
        db: &Db,
        board_id: i64,
        days_ahead: i64,
    ) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT c.id, c.title, c.description, c.due_date, l.title AS list_title, \
                        CAST((julianday(c.due_date) - julianday('now')) AS INTEGER) AS days_until_due \
                 FROM cards c \
                 INNER JOIN lists l ON c.list_id = l.id \
                 WHERE l.board_id = ? \
                   AND c.due_date IS NOT NULL \
                   AND julianday(c.due_date) >= julianday('now') \
                   AND julianday(c.due_date) <= julianday('now', '+' || ? || ' days') \
                 ORDER BY c.due_date ASC",
            )
            .bind(board_id)
            .bind(days_ahead),
        )
        .await
    }
}
