use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError};

/// TikTok has no API integration; the account and its counts are entered by hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TiktokAccount {
    pub id: i64,
    pub project_id: i64,
    pub account_id: Option<String>,
    pub username: String,
    pub display_name: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TiktokStat {
    pub id: i64,
    pub account_id: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub likes_count: i64,
    pub video_count: i64,
    pub recorded_date: String,
}

/// Counts for one day. Missing fields count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TiktokCounts {
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub video_count: i64,
}

impl TiktokAccount {
    pub async fn latest(db: &Db, project_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, project_id, account_id, username, display_name, created_at \
                 FROM tiktok_accounts WHERE project_id = ? \
                 ORDER BY created_at DESC, id DESC LIMIT 1",
            )
            .bind(project_id),
        )
        .await
    }

    /// Update the project's account in place, or register one.
    pub async fn upsert(
        db: &Db,
        project_id: i64,
        account_id: &str,
        username: &str,
        display_name: Option<&str>,
    ) -> Result<i64, StorageError> {
        if let Some(existing) = Self::latest(db, project_id).await? {
            db.run(
                Statement::new(
                    "UPDATE tiktok_accounts SET account_id = ?, username = ?, display_name = ?, \
                     updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                )
                .bind(account_id)
                .bind(username)
                .bind(display_name)
                .bind(existing.id),
            )
            .await?;
            return Ok(existing.id);
        }
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO tiktok_accounts (project_id, account_id, username, display_name) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(project_id)
                .bind(account_id)
                .bind(username)
                .bind(display_name),
            )
            .await?;
        Ok(result.last_row_id)
    }
}

impl TiktokStat {
    pub async fn latest(db: &Db, account_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, account_id, followers_count, following_count, likes_count, \
                 video_count, recorded_date FROM tiktok_stats WHERE account_id = ? \
                 ORDER BY recorded_date DESC LIMIT 1",
            )
            .bind(account_id),
        )
        .await
    }

    /// Write the counts for `date`, replacing any row already recorded that day.
    pub async fn upsert(
        db: &Db,
        account_id: i64,
        date: &str,
        counts: TiktokCounts,
    ) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "INSERT INTO tiktok_stats \
                 (account_id, followers_count, following_count, likes_count, video_count, recorded_date) \
                 VALUES (?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(account_id, recorded_date) DO UPDATE SET \
                    followers_count = excluded.followers_count, \
                    following_count = excluded.following_count, \
                    likes_count = excluded.likes_count, \
                    video_count = excluded.video_count",
            )
            .bind(account_id)
            .bind(counts.followers_count)
            .bind(counts.following_count)
            .bind(counts.likes_count)
            .bind(counts.video_count)
            .bind(date),
        )
        .await?;
        Ok(())
    }
}
