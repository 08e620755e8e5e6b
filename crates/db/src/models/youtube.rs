use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError};

pub const YOUTUBE_HISTORY_DAYS: i64 = 30;
pub const TOP_VIDEO_LIMIT: i64 = 50;
pub const DESCRIPTION_LIMIT: usize = 500;

/// An API key stored either for one project or, with `project_id` unset, for the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YoutubeSettings {
    pub id: i64,
    pub user_id: i64,
    pub project_id: Option<i64>,
    #[serde(skip_serializing)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YoutubeChannel {
    pub id: i64,
    pub user_id: i64,
    pub project_id: Option<i64>,
    pub channel_id: String,
    pub channel_handle: Option<String>,
    pub channel_name: String,
    pub thumbnail_url: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SaveChannel<'a> {
    pub channel_id: &'a str,
    pub channel_handle: Option<&'a str>,
    pub channel_name: &'a str,
    pub thumbnail_url: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YoutubeStat {
    pub id: i64,
    pub channel_id: i64,
    pub subscriber_count: i64,
    pub view_count: i64,
    pub video_count: i64,
    pub subscriber_change: i64,
    pub view_change: i64,
    pub recorded_date: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCounts {
    pub subscriber_count: i64,
    pub view_count: i64,
    pub video_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YoutubeVideo {
    pub id: i64,
    pub channel_id: i64,
    pub video_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<String>,
    pub duration: Option<String>,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SaveVideo<'a> {
    pub video_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub thumbnail_url: Option<&'a str>,
    pub published_at: Option<&'a str>,
    pub duration: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct VideoCounts {
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
}

impl YoutubeSettings {
    /// Project settings when present, otherwise the user's own key.
    pub async fn resolve(
        db: &Db,
        user_id: i64,
        project_id: Option<i64>,
    ) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, user_id, project_id, api_key FROM youtube_settings \
                 WHERE user_id = ? AND (project_id = ? OR project_id IS NULL) \
                 ORDER BY project_id IS NULL, id LIMIT 1",
            )
            .bind(user_id)
            .bind(project_id),
        )
        .await
    }

    pub async fn save(
        db: &Db,
        user_id: i64,
        project_id: Option<i64>,
        api_key: &str,
    ) -> Result<(), StorageError> {
        let updated = db
            .run(
                Statement::new(
                    "UPDATE youtube_settings SET api_key = ?, updated_at = CURRENT_TIMESTAMP \
                     WHERE user_id = ? AND COALESCE(project_id, 0) = COALESCE(?, 0)",
                )
                .bind(api_key)
                .bind(user_id)
                .bind(project_id),
            )
            .await?;
        if updated.changes == 0 {
            db.run(
                Statement::new(
                    "INSERT INTO youtube_settings (user_id, project_id, api_key) VALUES (?, ?, ?)",
                )
                .bind(user_id)
                .bind(project_id)
                .bind(api_key),
            )
            .await?;
        }
        Ok(())
    }
}

const CHANNEL_COLUMNS: &str = "id, user_id, project_id, channel_id, channel_handle, channel_name, \
                               thumbnail_url, created_at";

impl YoutubeChannel {
    pub async fn find_by_project(db: &Db, project_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {CHANNEL_COLUMNS} FROM youtube_channels WHERE project_id = ? ORDER BY created_at, id"
            ))
            .bind(project_id),
        )
        .await
    }

    pub async fn find_by_user(db: &Db, user_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {CHANNEL_COLUMNS} FROM youtube_channels WHERE user_id = ? ORDER BY created_at DESC, id DESC"
            ))
            .bind(user_id),
        )
        .await
    }

    pub async fn find_in_project(
        db: &Db,
        project_id: i64,
        id: i64,
    ) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!(
                "SELECT {CHANNEL_COLUMNS} FROM youtube_channels WHERE id = ? AND project_id = ?"
            ))
            .bind(id)
            .bind(project_id),
        )
        .await
    }

    /// Channels registered on the user's own settings page, newest first.
    pub async fn find_unassigned(db: &Db, user_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {CHANNEL_COLUMNS} FROM youtube_channels \
                 WHERE user_id = ? AND project_id IS NULL ORDER BY created_at DESC, id DESC"
            ))
            .bind(user_id),
        )
        .await
    }

    pub async fn find_unassigned_by_id(
        db: &Db,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!(
                "SELECT {CHANNEL_COLUMNS} FROM youtube_channels \
                 WHERE id = ? AND user_id = ? AND project_id IS NULL"
            ))
            .bind(id)
            .bind(user_id),
        )
        .await
    }

    /// Lookup by the YouTube channel id (`UC...`), in any project.
    pub async fn find_by_channel_id(
        db: &Db,
        user_id: i64,
        channel_id: &str,
    ) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!(
                "SELECT {CHANNEL_COLUMNS} FROM youtube_channels WHERE user_id = ? AND channel_id = ?"
            ))
            .bind(user_id)
            .bind(channel_id),
        )
        .await
    }

    /// A channel is unique per user; re-adding it moves it to `project_id`.
    pub async fn upsert(
        db: &Db,
        user_id: i64,
        project_id: Option<i64>,
        data: &SaveChannel<'_>,
    ) -> Result<i64, StorageError> {
        db.run(
            Statement::new(
                "INSERT INTO youtube_channels \
                 (user_id, project_id, channel_id, channel_handle, channel_name, thumbnail_url, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP) \
                 ON CONFLICT(user_id, channel_id) DO UPDATE SET \
                    channel_name = excluded.channel_name, \
                    channel_handle = COALESCE(excluded.channel_handle, channel_handle), \
                    thumbnail_url = excluded.thumbnail_url, \
                    project_id = excluded.project_id, \
                    updated_at = CURRENT_TIMESTAMP",
            )
            .bind(user_id)
            .bind(project_id)
            .bind(data.channel_id)
            .bind(data.channel_handle)
            .bind(data.channel_name)
            .bind(data.thumbnail_url),
        )
        .await?;
        let id = db
            .scalar(
                Statement::new("SELECT id FROM youtube_channels WHERE user_id = ? AND channel_id = ?")
                    .bind(user_id)
                    .bind(data.channel_id),
            )
            .await?;
        id.ok_or(StorageError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn touch(db: &Db, id: i64) -> Result<(), StorageError> {
        db.run(
            Statement::new("UPDATE youtube_channels SET updated_at = CURRENT_TIMESTAMP WHERE id = ?")
                .bind(id),
        )
        .await?;
        Ok(())
    }

    /// Removes the channel with its stats, videos and video stats.
    pub async fn delete(db: &Db, id: i64) -> Result<u64, StorageError> {
        let results = db
            .batch(vec![
                Statement::new(
                    "DELETE FROM youtube_video_stats WHERE video_id IN \
                     (SELECT id FROM youtube_videos WHERE channel_id = ?)",
                )
                .bind(id),
                Statement::new("DELETE FROM youtube_videos WHERE channel_id = ?").bind(id),
                Statement::new("DELETE FROM youtube_stats WHERE channel_id = ?").bind(id),
                Statement::new("DELETE FROM youtube_channels WHERE id = ?").bind(id),
            ])
            .await?;
        Ok(results.last().map(|r| r.changes).unwrap_or(0))
    }
}

const YT_STAT_COLUMNS: &str = "id, channel_id, subscriber_count, view_count, video_count, \
                               subscriber_change, view_change, recorded_date";

impl YoutubeStat {
    pub async fn latest(db: &Db, channel_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!(
                "SELECT {YT_STAT_COLUMNS} FROM youtube_stats WHERE channel_id = ? \
                 ORDER BY recorded_date DESC LIMIT 1"
            ))
            .bind(channel_id),
        )
        .await
    }

    /// Last `days` rows in chronological order.
    pub async fn history(db: &Db, channel_id: i64, days: i64) -> Result<Vec<Self>, StorageError> {
        let mut rows: Vec<Self> = db
            .all(
                Statement::new(format!(
                    "SELECT {YT_STAT_COLUMNS} FROM youtube_stats WHERE channel_id = ? \
                     ORDER BY recorded_date DESC LIMIT ?"
                ))
                .bind(channel_id)
                .bind(days),
            )
            .await?;
        rows.reverse();
        Ok(rows)
    }

    /// Upsert today's counts. With `track_changes` the changes are measured
    /// against the latest earlier row; otherwise they stay zero.
    pub async fn record(
        db: &Db,
        channel_id: i64,
        date: &str,
        counts: ChannelCounts,
        track_changes: bool,
    ) -> Result<(), StorageError> {
        let previous = if track_changes {
            db.first::<Self>(
                Statement::new(format!(
                    "SELECT {YT_STAT_COLUMNS} FROM youtube_stats \
                     WHERE channel_id = ? AND recorded_date < ? \
                     ORDER BY recorded_date DESC LIMIT 1"
                ))
                .bind(channel_id)
                .bind(date),
            )
            .await?
        } else {
            None
        };
        let (subscriber_change, view_change) = previous
            .map(|prev| {
                (
                    counts.subscriber_count - prev.subscriber_count,
                    counts.view_count - prev.view_count,
                )
            })
            .unwrap_or((0, 0));
        db.run(
            Statement::new(
                "INSERT INTO youtube_stats \
                 (channel_id, subscriber_count, view_count, video_count, \
                  subscriber_change, view_change, recorded_date) \
                 VALUES (?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(channel_id, recorded_date) DO UPDATE SET \
                    subscriber_count = excluded.subscriber_count, \
                    view_count = excluded.view_count, \
                    video_count = excluded.video_count, \
                    subscriber_change = excluded.subscriber_change, \
                    view_change = excluded.view_change",
            )
            .bind(channel_id)
            .bind(counts.subscriber_count)
            .bind(counts.view_count)
            .bind(counts.video_count)
            .bind(subscriber_change)
            .bind(view_change)
            .bind(date),
        )
        .await?;
        Ok(())
    }
}

impl YoutubeVideo {
    /// Videos with their latest stats, most viewed first.
    pub async fn top_by_views(
        db: &Db,
        channel_id: i64,
        limit: i64,
    ) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT v.id, v.channel_id, v.video_id, v.title, v.description, v.thumbnail_url, \
                        v.published_at, v.duration, vs.view_count, vs.like_count, vs.comment_count \
                 FROM youtube_videos v \
                 LEFT JOIN youtube_video_stats vs ON v.id = vs.video_id \
                    AND vs.recorded_date = (SELECT MAX(recorded_date) FROM youtube_video_stats WHERE video_id = v.id) \
                 WHERE v.channel_id = ? \
                 ORDER BY vs.view_count DESC NULLS LAST, v.id \
                 LIMIT ?",
            )
            .bind(channel_id)
            .bind(limit),
        )
        .await
    }

    /// Upsert the video and today's stats, measuring changes against the previous stats row.
    pub async fn record(
        db: &Db,
        channel_id: i64,
        data: &SaveVideo<'_>,
        counts: VideoCounts,
        date: &str,
    ) -> Result<i64, StorageError> {
        let description = data
            .description
            .map(|d| utils::text::truncate_chars(d, DESCRIPTION_LIMIT));
        db.run(
            Statement::new(
                "INSERT INTO youtube_videos \
                 (channel_id, video_id, title, description, thumbnail_url, published_at, duration, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP) \
                 ON CONFLICT(channel_id, video_id) DO UPDATE SET \
                    title = excluded.title, \
                    description = excluded.description, \
                    thumbnail_url = excluded.thumbnail_url, \
                    updated_at = CURRENT_TIMESTAMP",
            )
            .bind(channel_id)
            .bind(data.video_id)
            .bind(data.title)
            .bind(description)
            .bind(data.thumbnail_url)
            .bind(data.published_at)
            .bind(data.duration),
        )
        .await?;
        let video_row: i64 = db
            .scalar(
                Statement::new("SELECT id FROM youtube_videos WHERE channel_id = ? AND video_id = ?")
                    .bind(channel_id)
                    .bind(data.video_id),
            )
            .await?
            .ok_or(StorageError::Sqlx(sqlx::Error::RowNotFound))?;

        let previous: Option<VideoCounts> = db
            .first(
                Statement::new(
                    "SELECT view_count, like_count, comment_count FROM youtube_video_stats \
                     WHERE video_id = ? AND recorded_date < ? ORDER BY recorded_date DESC LIMIT 1",
                )
                .bind(video_row)
                .bind(date),
            )
            .await?;
        let changes = previous
            .map(|prev| VideoCounts {
                view_count: counts.view_count - prev.view_count,
                like_count: counts.like_count - prev.like_count,
                comment_count: counts.comment_count - prev.comment_count,
            })
            .unwrap_or_default();
        db.run(
            Statement::new(
                "INSERT INTO youtube_video_stats \
                 (video_id, view_count, like_count, comment_count, \
                  view_change, like_change, comment_change, recorded_date) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(video_id, recorded_date) DO UPDATE SET \
                    view_count = excluded.view_count, \
                    like_count = excluded.like_count, \
                    comment_count = excluded.comment_count, \
                    view_change = excluded.view_change, \
                    like_change = excluded.like_change, \
                    comment_change = excluded.comment_change",
            )
            .bind(video_row)
            .bind(counts.view_count)
            .bind(counts.like_count)
            .bind(counts.comment_count)
            .bind(changes.view_count)
            .bind(changes.like_count)
            .bind(changes.comment_count)
            .bind(date),
        )
        .await?;
        Ok(video_row)
    }
}
