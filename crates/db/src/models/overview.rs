use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError};

pub const SERIES_DAYS: i64 = 30;
pub const FEED_LIMIT: i64 = 50;

/// One post from any connected platform, normalized for the merged feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    pub platform: String,
    pub external_id: String,
    pub account: Option<String>,
    pub text: Option<String>,
    pub permalink: Option<String>,
    pub published_at: Option<String>,
    pub likes: i64,
    pub comments: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectScheduledPost {
    pub id: i64,
    pub account_id: i64,
    pub username: String,
    pub content: String,
    pub scheduled_at: String,
    pub status: String,
    pub error_message: Option<String>,
}

/// Daily follower-style figures for a platform, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    pub recorded_date: String,
    pub audience: i64,
    pub audience_change: i64,
    pub activity: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PlatformSeries {
    pub twitter: Vec<SeriesPoint>,
    pub youtube: Vec<SeriesPoint>,
}

async fn series(db: &Db, sql: &str, project_id: i64, days: i64) -> Result<Vec<SeriesPoint>, StorageError> {
    let mut rows: Vec<SeriesPoint> = db
        .all(Statement::new(sql).bind(project_id).bind(days))
        .await?;
    rows.reverse();
    Ok(rows)
}

impl PlatformSeries {
    /// Twitter: followers and tweets. YouTube: subscribers and views, summed over channels.
    pub async fn for_project(db: &Db, project_id: i64, days: i64) -> Result<Self, StorageError> {
        let twitter = series(
            db,
            "SELECT ts.recorded_date, SUM(ts.followers_count) AS audience, \
                    SUM(ts.follower_change) AS audience_change, SUM(ts.tweet_count) AS activity \
             FROM twitter_stats ts JOIN twitter_accounts ta ON ts.account_id = ta.id \
             WHERE ta.project_id = ? \
             GROUP BY ts.recorded_date ORDER BY ts.recorded_date DESC LIMIT ?",
            project_id,
            days,
        )
        .await?;
        let youtube = series(
            db,
            "SELECT ys.recorded_date, SUM(ys.subscriber_count) AS audience, \
                    SUM(ys.subscriber_change) AS audience_change, SUM(ys.view_count) AS activity \
             FROM youtube_stats ys JOIN youtube_channels yc ON ys.channel_id = yc.id \
             WHERE yc.project_id = ? \
             GROUP BY ys.recorded_date ORDER BY ys.recorded_date DESC LIMIT ?",
            project_id,
            days,
        )
        .await?;
        Ok(Self { twitter, youtube })
    }
}

impl FeedItem {
    /// Latest posts of every platform, newest first.
    pub async fn recent_for_project(
        db: &Db,
        project_id: i64,
        limit: i64,
    ) -> Result<Vec<Self>, StorageError> {
        let statements = [
            "SELECT 'twitter' AS platform, tp.tweet_id AS external_id, ta.username AS account, \
                    tp.content AS text, NULL AS permalink, tp.posted_at AS published_at, \
                    0 AS likes, 0 AS comments \
             FROM twitter_posts tp JOIN twitter_accounts ta ON tp.account_id = ta.id \
             WHERE ta.project_id = ? ORDER BY tp.posted_at DESC LIMIT ?",
            "SELECT 'youtube' AS platform, yv.video_id AS external_id, yc.channel_name AS account, \
                    yv.title AS text, 'https://www.youtube.com/watch?v=' || yv.video_id AS permalink, \
                    yv.published_at, \
                    COALESCE((SELECT like_count FROM youtube_video_stats WHERE video_id = yv.id \
                              ORDER BY recorded_date DESC LIMIT 1), 0) AS likes, \
                    COALESCE((SELECT comment_count FROM youtube_video_stats WHERE video_id = yv.id \
                              ORDER BY recorded_date DESC LIMIT 1), 0) AS comments \
             FROM youtube_videos yv JOIN youtube_channels yc ON yv.channel_id = yc.id \
             WHERE yc.project_id = ? ORDER BY yv.published_at DESC LIMIT ?",
            "SELECT 'instagram' AS platform, im.media_id AS external_id, ia.username AS account, \
                    im.caption AS text, im.permalink, im.timestamp AS published_at, \
                    im.like_count AS likes, im.comments_count AS comments \
             FROM instagram_media im JOIN instagram_business_accounts ia ON im.account_id = ia.id \
             WHERE ia.project_id = ? ORDER BY im.timestamp DESC LIMIT ?",
            "SELECT 'threads' AS platform, thread_id AS external_id, NULL AS account, text, \
                    permalink, timestamp AS published_at, like_count AS likes, reply_count AS comments \
             FROM threads_posts WHERE project_id = ? ORDER BY timestamp DESC LIMIT ?",
        ];

        let mut items = Vec::new();
        for sql in statements {
            let rows: Vec<Self> = db
                .all(Statement::new(sql).bind(project_id).bind(limit))
                .await?;
            items.extend(rows);
        }
        sort_newest_first(&mut items);
        items.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(items)
    }
}

/// Platforms store timestamps in different shapes; compare on the leading
/// `YYYY-MM-DD?HH:MM:SS` so ISO and SQLite forms interleave correctly.
fn sort_key(item: &FeedItem) -> String {
    item.published_at
        .as_deref()
        .map(|ts| ts.chars().take(19).map(|c| if c == 'T' { ' ' } else { c }).collect())
        .unwrap_or_default()
}

fn sort_newest_first(items: &mut [FeedItem]) {
    items.sort_by_key(|item| std::cmp::Reverse(sort_key(item)));
}

impl ProjectScheduledPost {
    pub async fn queue_for_project(
        db: &Db,
        project_id: i64,
        limit: i64,
    ) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT sp.id, sp.account_id, ta.username, sp.content, sp.scheduled_at, \
                        sp.status, sp.error_message \
                 FROM twitter_scheduled_posts sp \
                 JOIN twitter_accounts ta ON sp.account_id = ta.id \
                 WHERE ta.project_id = ? ORDER BY sp.scheduled_at ASC LIMIT ?",
            )
            .bind(project_id)
            .bind(limit),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(platform: &str, at: Option<&str>) -> FeedItem {
        FeedItem {
            platform: platform.to_string(),
            external_id: "x".to_string(),
            account: None,
            text: None,
            permalink: None,
            published_at: at.map(str::to_string),
            likes: 0,
            comments: 0,
        }
    }

    #[test]
    fn feed_interleaves_timestamp_formats() {
        let mut items = vec![
            item("twitter", Some("2025-03-01 10:00:00")),
            item("youtube", Some("2025-03-02T08:00:00Z")),
            item("threads", None),
            item("instagram", Some("2025-03-01T12:00:00+0000")),
        ];
        sort_newest_first(&mut items);
        let order: Vec<&str> = items.iter().map(|i| i.platform.as_str()).collect();
        assert_eq!(order, ["youtube", "instagram", "twitter", "threads"]);
    }
}
