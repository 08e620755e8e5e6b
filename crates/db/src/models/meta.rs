use serde::{Deserialize, Serialize};

use crate::storage::{Db, Statement, StorageError, int_bool};

pub const MEDIA_LIMIT: i64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetaApiSettings {
    pub id: i64,
    pub project_id: i64,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(deserialize_with = "int_bool")]
    pub enabled: bool,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacebookPage {
    pub id: i64,
    pub project_id: i64,
    pub page_id: String,
    pub page_name: String,
    #[serde(skip_serializing)]
    pub page_access_token: Option<String>,
    pub category: Option<String>,
    pub followers_count: i64,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SaveFacebookPage<'a> {
    pub page_id: &'a str,
    pub page_name: &'a str,
    pub page_access_token: Option<&'a str>,
    pub category: Option<&'a str>,
    pub followers_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstagramAccount {
    pub id: i64,
    pub project_id: i64,
    pub instagram_account_id: String,
    pub username: Option<String>,
    pub followers_count: i64,
    pub follows_count: i64,
    pub media_count: i64,
    pub profile_picture_url: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SaveInstagramAccount<'a> {
    pub instagram_account_id: &'a str,
    pub username: Option<&'a str>,
    pub followers_count: i64,
    pub follows_count: i64,
    pub media_count: i64,
    pub profile_picture_url: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstagramMedia {
    pub id: i64,
    pub account_id: i64,
    pub media_id: String,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub permalink: Option<String>,
    pub caption: Option<String>,
    pub like_count: i64,
    pub comments_count: i64,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SaveInstagramMedia<'a> {
    pub media_id: &'a str,
    pub media_type: Option<&'a str>,
    pub media_url: Option<&'a str>,
    pub permalink: Option<&'a str>,
    pub caption: Option<&'a str>,
    pub like_count: i64,
    pub comments_count: i64,
    pub timestamp: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadsPost {
    pub id: i64,
    pub project_id: i64,
    pub thread_id: String,
    pub text: Option<String>,
    pub permalink: Option<String>,
    pub timestamp: Option<String>,
    pub like_count: i64,
    pub reply_count: i64,
    pub quote_count: i64,
    pub repost_count: i64,
    pub views: i64,
}

#[derive(Debug, Clone)]
pub struct SaveThreadsPost<'a> {
    pub thread_id: &'a str,
    pub text: Option<&'a str>,
    pub permalink: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub like_count: i64,
    pub reply_count: i64,
    pub quote_count: i64,
    pub repost_count: i64,
    pub views: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct InstagramStats {
    pub total_likes: i64,
    pub total_comments: i64,
    pub avg_likes: i64,
    pub avg_comments: i64,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ThreadsStats {
    pub total_posts: i64,
    pub total_likes: i64,
    pub total_replies: i64,
    pub total_views: i64,
    pub avg_likes: i64,
    pub avg_replies: i64,
}

fn rounded_avg(total: i64, count: usize) -> i64 {
    (total as f64 / count as f64).round() as i64
}

impl InstagramStats {
    /// Engagement is the rounded average likes plus comments over followers, as a percentage.
    pub fn compute(media: &[InstagramMedia], followers: i64) -> Self {
        if media.is_empty() {
            return Self::default();
        }
        let total_likes: i64 = media.iter().map(|m| m.like_count).sum();
        let total_comments: i64 = media.iter().map(|m| m.comments_count).sum();
        let avg_likes = rounded_avg(total_likes, media.len());
        let avg_comments = rounded_avg(total_comments, media.len());
        let engagement_rate = if followers > 0 {
            (avg_likes + avg_comments) as f64 / followers as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_likes,
            total_comments,
            avg_likes,
            avg_comments,
            engagement_rate,
        }
    }
}

impl ThreadsStats {
    pub fn compute(posts: &[ThreadsPost]) -> Self {
        if posts.is_empty() {
            return Self::default();
        }
        let total_likes: i64 = posts.iter().map(|p| p.like_count).sum();
        let total_replies: i64 = posts.iter().map(|p| p.reply_count).sum();
        Self {
            total_posts: posts.len() as i64,
            total_likes,
            total_replies,
            total_views: posts.iter().map(|p| p.views).sum(),
            avg_likes: rounded_avg(total_likes, posts.len()),
            avg_replies: rounded_avg(total_replies, posts.len()),
        }
    }
}

impl MetaApiSettings {
    pub async fn find_by_project(db: &Db, project_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, project_id, access_token, enabled, updated_at \
                 FROM meta_api_settings WHERE project_id = ?",
            )
            .bind(project_id),
        )
        .await
    }

    pub async fn find_enabled(db: &Db, project_id: i64) -> Result<Option<Self>, StorageError> {
        Ok(Self::find_by_project(db, project_id)
            .await?
            .filter(|settings| settings.enabled))
    }

    pub async fn upsert(db: &Db, project_id: i64, access_token: &str) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "INSERT INTO meta_api_settings (project_id, access_token, enabled, updated_at) \
                 VALUES (?, ?, 1, CURRENT_TIMESTAMP) \
                 ON CONFLICT(project_id) DO UPDATE SET \
                    access_token = excluded.access_token, \
                    enabled = 1, \
                    updated_at = CURRENT_TIMESTAMP",
            )
            .bind(project_id)
            .bind(access_token),
        )
        .await?;
        Ok(())
    }
}

impl FacebookPage {
    pub async fn latest(db: &Db, project_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, project_id, page_id, page_name, page_access_token, category, \
                        followers_count, updated_at \
                 FROM facebook_pages WHERE project_id = ? ORDER BY updated_at DESC, id DESC LIMIT 1",
            )
            .bind(project_id),
        )
        .await
    }

    pub async fn upsert(
        db: &Db,
        project_id: i64,
        page: &SaveFacebookPage<'_>,
    ) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "INSERT INTO facebook_pages \
                 (project_id, page_id, page_name, page_access_token, category, followers_count, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP) \
                 ON CONFLICT(project_id, page_id) DO UPDATE SET \
                    page_name = excluded.page_name, \
                    page_access_token = excluded.page_access_token, \
                    category = excluded.category, \
                    followers_count = excluded.followers_count, \
                    updated_at = CURRENT_TIMESTAMP",
            )
            .bind(project_id)
            .bind(page.page_id)
            .bind(page.page_name)
            .bind(page.page_access_token)
            .bind(page.category)
            .bind(page.followers_count),
        )
        .await?;
        Ok(())
    }
}

impl InstagramAccount {
    pub async fn latest(db: &Db, project_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, project_id, instagram_account_id, username, followers_count, \
                        follows_count, media_count, profile_picture_url, updated_at \
                 FROM instagram_business_accounts WHERE project_id = ? \
                 ORDER BY updated_at DESC, id DESC LIMIT 1",
            )
            .bind(project_id),
        )
        .await
    }

    pub async fn upsert(
        db: &Db,
        project_id: i64,
        account: &SaveInstagramAccount<'_>,
    ) -> Result<i64, StorageError> {
        db.run(
            Statement::new(
                "INSERT INTO instagram_business_accounts \
                 (project_id, instagram_account_id, username, followers_count, follows_count, \
                  media_count, profile_picture_url, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP) \
                 ON CONFLICT(project_id, instagram_account_id) DO UPDATE SET \
                    username = excluded.username, \
                    followers_count = excluded.followers_count, \
                    follows_count = excluded.follows_count, \
                    media_count = excluded.media_count, \
                    profile_picture_url = excluded.profile_picture_url, \
                    updated_at = CURRENT_TIMESTAMP",
            )
            .bind(project_id)
            .bind(account.instagram_account_id)
            .bind(account.username)
            .bind(account.followers_count)
            .bind(account.follows_count)
            .bind(account.media_count)
            .bind(account.profile_picture_url),
        )
        .await?;
        db.scalar(
            Statement::new(
                "SELECT id FROM instagram_business_accounts \
                 WHERE project_id = ? AND instagram_account_id = ?",
            )
            .bind(project_id)
            .bind(account.instagram_account_id),
        )
        .await?
        .ok_or(StorageError::Sqlx(sqlx::Error::RowNotFound))
    }
}

impl InstagramMedia {
    pub async fn recent(db: &Db, account_id: i64, limit: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT id, account_id, media_id, media_type, media_url, permalink, caption, \
                        like_count, comments_count, timestamp \
                 FROM instagram_media WHERE account_id = ? ORDER BY timestamp DESC LIMIT ?",
            )
            .bind(account_id)
            .bind(limit),
        )
        .await
    }

    pub async fn upsert_many(
        db: &Db,
        account_id: i64,
        media: &[SaveInstagramMedia<'_>],
    ) -> Result<usize, StorageError> {
        if media.is_empty() {
            return Ok(0);
        }
        let statements = media
            .iter()
            .map(|m| {
                Statement::new(
                    "INSERT INTO instagram_media \
                     (account_id, media_id, media_type, media_url, permalink, caption, \
                      like_count, comments_count, timestamp) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(account_id, media_id) DO UPDATE SET \
                        media_url = excluded.media_url, \
                        caption = excluded.caption, \
                        like_count = excluded.like_count, \
                        comments_count = excluded.comments_count",
                )
                .bind(account_id)
                .bind(m.media_id)
                .bind(m.media_type)
                .bind(m.media_url)
                .bind(m.permalink)
                .bind(m.caption)
                .bind(m.like_count)
                .bind(m.comments_count)
                .bind(m.timestamp)
            })
            .collect();
        db.batch(statements).await?;
        Ok(media.len())
    }
}

impl ThreadsPost {
    pub async fn recent(db: &Db, project_id: i64, limit: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT id, project_id, thread_id, text, permalink, timestamp, like_count, \
                        reply_count, quote_count, repost_count, views \
                 FROM threads_posts WHERE project_id = ? ORDER BY timestamp DESC LIMIT ?",
            )
            .bind(project_id)
            .bind(limit),
        )
        .await
    }

    pub async fn upsert_many(
        db: &Db,
        project_id: i64,
        posts: &[SaveThreadsPost<'_>],
    ) -> Result<usize, StorageError> {
        if posts.is_empty() {
            return Ok(0);
        }
        let statements = posts
            .iter()
            .map(|p| {
                Statement::new(
                    "INSERT INTO threads_posts \
                     (project_id, thread_id, text, permalink, timestamp, like_count, \
                      reply_count, quote_count, repost_count, views) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(project_id, thread_id) DO UPDATE SET \
                        text = excluded.text, \
                        like_count = excluded.like_count, \
                        reply_count = excluded.reply_count, \
                        quote_count = excluded.quote_count, \
                        repost_count = excluded.repost_count, \
                        views = excluded.views",
                )
                .bind(project_id)
                .bind(p.thread_id)
                .bind(p.text)
                .bind(p.permalink)
                .bind(p.timestamp)
                .bind(p.like_count)
                .bind(p.reply_count)
                .bind(p.quote_count)
                .bind(p.repost_count)
                .bind(p.views)
            })
            .collect();
        db.batch(statements).await?;
        Ok(posts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(likes: i64, comments: i64) -> InstagramMedia {
        InstagramMedia {
            id: 0,
            account_id: 1,
            media_id: "m".into(),
            media_type: None,
            media_url: None,
            permalink: None,
            caption: None,
            like_count: likes,
            comments_count: comments,
            timestamp: None,
        }
    }

    fn post(likes: i64, replies: i64, views: i64) -> ThreadsPost {
        ThreadsPost {
            id: 0,
            project_id: 1,
            thread_id: "t".into(),
            text: None,
            permalink: None,
            timestamp: None,
            like_count: likes,
            reply_count: replies,
            quote_count: 0,
            repost_count: 0,
            views,
        }
    }

    #[test]
    fn instagram_engagement_uses_rounded_averages() {
        let stats = InstagramStats::compute(&[media(10, 1), media(21, 2)], 200);
        assert_eq!(stats.total_likes, 31);
        assert_eq!(stats.total_comments, 3);
        assert_eq!(stats.avg_likes, 16);
        assert_eq!(stats.avg_comments, 2);
        assert!((stats.engagement_rate - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn instagram_without_followers_has_zero_engagement() {
        let stats = InstagramStats::compute(&[media(5, 5)], 0);
        assert_eq!(stats.engagement_rate, 0.0);
        assert_eq!(InstagramStats::compute(&[], 100), InstagramStats::default());
    }

    #[test]
    fn threads_totals_and_averages() {
        let stats = ThreadsStats::compute(&[post(3, 1, 100), post(4, 2, 50)]);
        assert_eq!(stats.total_posts, 2);
        assert_eq!(stats.total_likes, 7);
        assert_eq!(stats.total_views, 150);
        assert_eq!(stats.avg_likes, 4);
        assert_eq!(stats.avg_replies, 2);
    }
}
