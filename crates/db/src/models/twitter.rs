use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utils::text::mask_secret;

use crate::storage::{Db, Statement, StorageError, int_bool};

pub const RECENT_POST_LIMIT: i64 = 10;
pub const MONTHLY_POST_LIMIT: i64 = 500;
pub const DUE_POST_BATCH: i64 = 50;
pub const STATS_HISTORY_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TwitterSettings {
    pub id: i64,
    pub project_id: i64,
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    #[serde(deserialize_with = "int_bool")]
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct SaveTwitterSettings<'a> {
    pub api_key: &'a str,
    pub api_secret: &'a str,
    pub access_token: &'a str,
    pub access_token_secret: &'a str,
}

/// Credentials as shown back to the user: only the last four characters survive.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MaskedTwitterSettings {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TwitterAccount {
    pub id: i64,
    pub project_id: i64,
    pub account_id: Option<String>,
    pub username: String,
    pub name: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TwitterStat {
    pub id: i64,
    pub account_id: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub tweet_count: i64,
    pub follower_change: i64,
    pub following_change: i64,
    pub tweet_change: i64,
    pub recorded_date: String,
}

/// Counts for a single day; changes are derived from the previous row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DailyCounts {
    pub followers_count: i64,
    pub following_count: i64,
    pub tweet_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TwitterPost {
    pub id: i64,
    pub account_id: i64,
    pub tweet_id: String,
    pub content: String,
    pub posted_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledPost {
    pub id: i64,
    pub account_id: i64,
    pub content: String,
    pub scheduled_at: String,
    pub status: String,
    pub posted_tweet_id: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: Option<String>,
}

/// A pending post whose time has come, with the project it publishes for.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DuePost {
    pub id: i64,
    pub account_id: i64,
    pub content: String,
    pub scheduled_at: String,
    pub project_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TwitterOAuthToken {
    pub id: i64,
    pub user_id: i64,
    pub project_id: i64,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub access_token_secret: String,
    pub twitter_user_id: Option<String>,
    pub twitter_username: Option<String>,
    pub twitter_screen_name: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SaveOAuthToken<'a> {
    pub access_token: &'a str,
    pub access_token_secret: &'a str,
    pub twitter_user_id: &'a str,
    pub screen_name: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TwitterAccountStat {
    pub id: i64,
    pub project_id: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub tweet_count: i64,
    pub listed_count: i64,
    pub followers_change: i64,
    pub following_change: i64,
    pub tweet_change: i64,
    pub recorded_date: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountCounts {
    pub followers_count: i64,
    pub following_count: i64,
    pub tweet_count: i64,
    pub listed_count: i64,
}

/// Derived figures for the stats page, computed over the full history.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StatsSummary {
    pub account_age_days: i64,
    pub record_days: i64,
    pub tweeted_days: i64,
    pub max_daily_tweets: i64,
    pub max_daily_tweets_date: String,
    pub latest_stat: Option<TwitterStat>,
    pub oldest_stat: Option<TwitterStat>,
}

impl TwitterSettings {
    pub async fn find_by_project(db: &Db, project_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, project_id, api_key, api_secret, access_token, access_token_secret, enabled \
                 FROM twitter_settings WHERE project_id = ?",
            )
            .bind(project_id),
        )
        .await
    }

    /// Settings usable for outbound calls; disabled rows are ignored.
    pub async fn find_enabled(db: &Db, project_id: i64) -> Result<Option<Self>, StorageError> {
        Ok(Self::find_by_project(db, project_id)
            .await?
            .filter(|settings| settings.enabled))
    }

    pub async fn upsert(
        db: &Db,
        project_id: i64,
        data: &SaveTwitterSettings<'_>,
    ) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "INSERT INTO twitter_settings \
                 (project_id, api_key, api_secret, access_token, access_token_secret, enabled) \
                 VALUES (?, ?, ?, ?, ?, 1) \
                 ON CONFLICT(project_id) DO UPDATE SET \
                    api_key = excluded.api_key, \
                    api_secret = excluded.api_secret, \
                    access_token = excluded.access_token, \
                    access_token_secret = excluded.access_token_secret, \
                    enabled = 1, \
                    updated_at = CURRENT_TIMESTAMP",
            )
            .bind(project_id)
            .bind(data.api_key)
            .bind(data.api_secret)
            .bind(data.access_token)
            .bind(data.access_token_secret),
        )
        .await?;
        Ok(())
    }

    pub fn masked(&self) -> MaskedTwitterSettings {
        MaskedTwitterSettings {
            api_key: mask_secret(&self.api_key),
            api_secret: mask_secret(&self.api_secret),
            access_token: mask_secret(&self.access_token),
            access_token_secret: mask_secret(&self.access_token_secret),
            enabled: self.enabled,
        }
    }
}

impl TwitterAccount {
    /// The most recently registered account for the project.
    pub async fn latest(db: &Db, project_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, project_id, account_id, username, name, created_at \
                 FROM twitter_accounts WHERE project_id = ? \
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
        name: Option<&str>,
    ) -> Result<i64, StorageError> {
        if let Some(existing) = Self::latest(db, project_id).await? {
            db.run(
                Statement::new(
                    "UPDATE twitter_accounts SET account_id = ?, username = ?, name = ?, \
                     updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                )
                .bind(account_id)
                .bind(username)
                .bind(name)
                .bind(existing.id),
            )
            .await?;
            return Ok(existing.id);
        }
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO twitter_accounts (project_id, account_id, username, name) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(project_id)
                .bind(account_id)
                .bind(username)
                .bind(name),
            )
            .await?;
        Ok(result.last_row_id)
    }
}

const STAT_COLUMNS: &str = "id, account_id, followers_count, following_count, tweet_count, \
                            follower_change, following_change, tweet_change, recorded_date";

impl TwitterStat {
    pub async fn latest(db: &Db, account_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!(
                "SELECT {STAT_COLUMNS} FROM twitter_stats WHERE account_id = ? \
                 ORDER BY recorded_date DESC LIMIT 1"
            ))
            .bind(account_id),
        )
        .await
    }

    /// Most recent `days` rows, newest first.
    pub async fn history(db: &Db, account_id: i64, days: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {STAT_COLUMNS} FROM twitter_stats WHERE account_id = ? \
                 ORDER BY recorded_date DESC LIMIT ?"
            ))
            .bind(account_id)
            .bind(days),
        )
        .await
    }

    pub async fn all_desc(db: &Db, account_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {STAT_COLUMNS} FROM twitter_stats WHERE account_id = ? \
                 ORDER BY recorded_date DESC"
            ))
            .bind(account_id),
        )
        .await
    }

    async fn previous_counts(
        db: &Db,
        account_id: i64,
        before: &str,
    ) -> Result<Option<DailyCounts>, StorageError> {
        db.first(
            Statement::new(
                "SELECT followers_count, following_count, tweet_count FROM twitter_stats \
                 WHERE account_id = ? AND recorded_date < ? \
                 ORDER BY recorded_date DESC LIMIT 1",
            )
            .bind(account_id)
            .bind(before),
        )
        .await
    }

    /// Write the counts for `date`, replacing any row already recorded that day.
    pub async fn upsert(
        db: &Db,
        account_id: i64,
        date: &str,
        counts: DailyCounts,
    ) -> Result<(), StorageError> {
        let previous = Self::previous_counts(db, account_id, date).await?;
        let (follower, following, tweet) = changes_against(counts, previous);
        db.run(
            Statement::new(
                "INSERT INTO twitter_stats \
                 (account_id, followers_count, following_count, tweet_count, \
                  follower_change, following_change, tweet_change, recorded_date) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(account_id, recorded_date) DO UPDATE SET \
                    followers_count = excluded.followers_count, \
                    following_count = excluded.following_count, \
                    tweet_count = excluded.tweet_count, \
                    follower_change = excluded.follower_change, \
                    following_change = excluded.following_change, \
                    tweet_change = excluded.tweet_change",
            )
            .bind(account_id)
            .bind(counts.followers_count)
            .bind(counts.following_count)
            .bind(counts.tweet_count)
            .bind(follower)
            .bind(following)
            .bind(tweet)
            .bind(date),
        )
        .await?;
        Ok(())
    }

    /// Insert unless the day already has a row. Returns whether a row was written.
    pub async fn insert_if_absent(
        db: &Db,
        account_id: i64,
        date: &str,
        counts: DailyCounts,
    ) -> Result<bool, StorageError> {
        let previous = Self::previous_counts(db, account_id, date).await?;
        let (follower, following, tweet) = changes_against(counts, previous);
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO twitter_stats \
                     (account_id, followers_count, following_count, tweet_count, \
                      follower_change, following_change, tweet_change, recorded_date) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(account_id, recorded_date) DO NOTHING",
                )
                .bind(account_id)
                .bind(counts.followers_count)
                .bind(counts.following_count)
                .bind(counts.tweet_count)
                .bind(follower)
                .bind(following)
                .bind(tweet)
                .bind(date),
            )
            .await?;
        Ok(result.changes > 0)
    }

    /// Rewrite every row's changes against the row recorded just before it.
    pub async fn recompute_changes(db: &Db, account_id: i64) -> Result<usize, StorageError> {
        let mut rows = Self::all_desc(db, account_id).await?;
        rows.reverse();
        let updates: Vec<Statement> = rows
            .windows(2)
            .map(|pair| {
                let (previous, current) = (&pair[0], &pair[1]);
                Statement::new(
                    "UPDATE twitter_stats SET follower_change = ?, following_change = ?, \
                     tweet_change = ? WHERE id = ?",
                )
                .bind(current.followers_count - previous.followers_count)
                .bind(current.following_count - previous.following_count)
                .bind(current.tweet_count - previous.tweet_count)
                .bind(current.id)
            })
            .collect();
        let count = updates.len();
        if count > 0 {
            db.batch(updates).await?;
        }
        Ok(count)
    }
}

fn changes_against(counts: DailyCounts, previous: Option<DailyCounts>) -> (i64, i64, i64) {
    match previous {
        Some(prev) => (
            counts.followers_count - prev.followers_count,
            counts.following_count - prev.following_count,
            counts.tweet_count - prev.tweet_count,
        ),
        None => (0, 0, 0),
    }
}

impl StatsSummary {
    /// `stats` must be ordered newest first.
    pub fn compute(stats: &[TwitterStat], account_created: Option<&str>, now: NaiveDateTime) -> Self {
        let (Some(latest), Some(oldest)) = (stats.first(), stats.last()) else {
            return Self::default();
        };

        let account_age_days = account_created
            .and_then(parse_timestamp)
            .map(|created| (now - created).num_days())
            .unwrap_or(0);

        let record_days = match (
            NaiveDate::parse_from_str(&oldest.recorded_date, "%Y-%m-%d"),
            NaiveDate::parse_from_str(&latest.recorded_date, "%Y-%m-%d"),
        ) {
            (Ok(start), Ok(end)) => ((end - start).num_days() + 1).max(1),
            _ => 1,
        };

        let mut summary = Self {
            account_age_days,
            record_days,
            latest_stat: Some(latest.clone()),
            oldest_stat: Some(oldest.clone()),
            ..Self::default()
        };
        for pair in stats.windows(2) {
            let daily = pair[0].tweet_count - pair[1].tweet_count;
            if daily > 0 {
                summary.tweeted_days += 1;
                if daily > summary.max_daily_tweets {
                    summary.max_daily_tweets = daily;
                    summary.max_daily_tweets_date = pair[0].recorded_date.clone();
                }
            }
        }
        summary
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

impl TwitterPost {
    pub async fn create(
        db: &Db,
        account_id: i64,
        tweet_id: &str,
        content: &str,
    ) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO twitter_posts (account_id, tweet_id, content, posted_at) \
                     VALUES (?, ?, ?, CURRENT_TIMESTAMP)",
                )
                .bind(account_id)
                .bind(tweet_id)
                .bind(content),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn recent(db: &Db, account_id: i64, limit: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT id, account_id, tweet_id, content, posted_at FROM twitter_posts \
                 WHERE account_id = ? ORDER BY posted_at DESC, id DESC LIMIT ?",
            )
            .bind(account_id)
            .bind(limit),
        )
        .await
    }

    /// Posts since the first day of the current UTC month.
    pub async fn count_this_month(db: &Db, account_id: i64) -> Result<i64, StorageError> {
        Ok(db
            .scalar(
                Statement::new(
                    "SELECT COUNT(*) FROM twitter_posts \
                     WHERE account_id = ? AND posted_at >= date('now', 'start of month')",
                )
                .bind(account_id),
            )
            .await?
            .unwrap_or(0))
    }
}

const SCHEDULED_COLUMNS: &str = "id, account_id, content, scheduled_at, status, posted_tweet_id, \
                                 error_message, created_at";

impl ScheduledPost {
    /// `scheduled_at` is expected in `YYYY-MM-DD HH:MM:SS` UTC so it compares
    /// lexically against `datetime('now')`.
    pub async fn create(
        db: &Db,
        account_id: i64,
        content: &str,
        scheduled_at: &str,
    ) -> Result<i64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "INSERT INTO twitter_scheduled_posts (account_id, content, scheduled_at, status) \
                     VALUES (?, ?, ?, 'pending')",
                )
                .bind(account_id)
                .bind(content)
                .bind(scheduled_at),
            )
            .await?;
        Ok(result.last_row_id)
    }

    pub async fn find_by_id(db: &Db, id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(format!(
                "SELECT {SCHEDULED_COLUMNS} FROM twitter_scheduled_posts WHERE id = ?"
            ))
            .bind(id),
        )
        .await
    }

    pub async fn pending_for_account(db: &Db, account_id: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(format!(
                "SELECT {SCHEDULED_COLUMNS} FROM twitter_scheduled_posts \
                 WHERE account_id = ? AND status = 'pending' ORDER BY scheduled_at"
            ))
            .bind(account_id),
        )
        .await
    }

    /// Only pending posts can be withdrawn.
    pub async fn delete_pending(db: &Db, account_id: i64, id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "DELETE FROM twitter_scheduled_posts \
                     WHERE id = ? AND account_id = ? AND status = 'pending'",
                )
                .bind(id)
                .bind(account_id),
            )
            .await?;
        Ok(result.changes)
    }

    pub async fn due(db: &Db, limit: i64) -> Result<Vec<DuePost>, StorageError> {
        db.all(
            Statement::new(
                "SELECT sp.id, sp.account_id, sp.content, sp.scheduled_at, ta.project_id \
                 FROM twitter_scheduled_posts sp \
                 INNER JOIN twitter_accounts ta ON sp.account_id = ta.id \
                 WHERE sp.status = 'pending' AND sp.scheduled_at <= datetime('now') \
                 ORDER BY sp.scheduled_at ASC, sp.id ASC LIMIT ?",
            )
            .bind(limit),
        )
        .await
    }

    /// Returns false when the post already left `pending`.
    /// `post_row_id` is `None` when the tweet went out but its history row
    /// could not be written.
    pub async fn mark_posted(
        db: &Db,
        id: i64,
        post_row_id: Option<i64>,
    ) -> Result<bool, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "UPDATE twitter_scheduled_posts \
                     SET status = 'posted', posted_tweet_id = ?, error_message = NULL, \
                         updated_at = CURRENT_TIMESTAMP \
                     WHERE id = ? AND status = 'pending'",
                )
                .bind(post_row_id)
                .bind(id),
            )
            .await?;
        Ok(result.changes > 0)
    }

    pub async fn mark_failed(db: &Db, id: i64, message: &str) -> Result<bool, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "UPDATE twitter_scheduled_posts \
                     SET status = 'failed', error_message = ?, updated_at = CURRENT_TIMESTAMP \
                     WHERE id = ? AND status = 'pending'",
                )
                .bind(message)
                .bind(id),
            )
            .await?;
        Ok(result.changes > 0)
    }
}

impl TwitterOAuthToken {
    pub async fn find_by_project(db: &Db, project_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, user_id, project_id, access_token, access_token_secret, \
                        twitter_user_id, twitter_username, twitter_screen_name, created_at \
                 FROM twitter_oauth_tokens WHERE project_id = ?",
            )
            .bind(project_id),
        )
        .await
    }

    pub async fn upsert(
        db: &Db,
        user_id: i64,
        project_id: i64,
        token: &SaveOAuthToken<'_>,
    ) -> Result<(), StorageError> {
        db.run(
            Statement::new(
                "INSERT INTO twitter_oauth_tokens \
                 (user_id, project_id, access_token, access_token_secret, \
                  twitter_user_id, twitter_username, twitter_screen_name, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP) \
                 ON CONFLICT(project_id) DO UPDATE SET \
                    access_token = excluded.access_token, \
                    access_token_secret = excluded.access_token_secret, \
                    twitter_user_id = excluded.twitter_user_id, \
                    twitter_username = excluded.twitter_username, \
                    twitter_screen_name = excluded.twitter_screen_name, \
                    updated_at = CURRENT_TIMESTAMP",
            )
            .bind(user_id)
            .bind(project_id)
            .bind(token.access_token)
            .bind(token.access_token_secret)
            .bind(token.twitter_user_id)
            .bind(token.screen_name)
            .bind(token.screen_name),
        )
        .await?;
        Ok(())
    }

    pub async fn delete(db: &Db, user_id: i64, project_id: i64) -> Result<u64, StorageError> {
        let result = db
            .run(
                Statement::new(
                    "DELETE FROM twitter_oauth_tokens WHERE project_id = ? AND user_id = ?",
                )
                .bind(project_id)
                .bind(user_id),
            )
            .await?;
        Ok(result.changes)
    }
}

impl TwitterAccountStat {
    pub async fn latest(db: &Db, project_id: i64) -> Result<Option<Self>, StorageError> {
        db.first(
            Statement::new(
                "SELECT id, project_id, followers_count, following_count, tweet_count, listed_count, \
                        followers_change, following_change, tweet_change, recorded_date \
                 FROM twitter_account_stats WHERE project_id = ? \
                 ORDER BY recorded_date DESC LIMIT 1",
            )
            .bind(project_id),
        )
        .await
    }

    pub async fn history(db: &Db, project_id: i64, days: i64) -> Result<Vec<Self>, StorageError> {
        db.all(
            Statement::new(
                "SELECT id, project_id, followers_count, following_count, tweet_count, listed_count, \
                        followers_change, following_change, tweet_change, recorded_date \
                 FROM twitter_account_stats WHERE project_id = ? \
                 ORDER BY recorded_date DESC LIMIT ?",
            )
            .bind(project_id)
            .bind(days),
        )
        .await
    }

    /// Record today's counts with changes measured against the latest earlier row.
    pub async fn record(
        db: &Db,
        project_id: i64,
        date: &str,
        counts: AccountCounts,
    ) -> Result<(), StorageError> {
        let previous: Option<Self> = db
            .first(
                Statement::new(
                    "SELECT id, project_id, followers_count, following_count, tweet_count, listed_count, \
                            followers_change, following_change, tweet_change, recorded_date \
                     FROM twitter_account_stats WHERE project_id = ? AND recorded_date < ? \
                     ORDER BY recorded_date DESC LIMIT 1",
                )
                .bind(project_id)
                .bind(date),
            )
            .await?;
        let (followers, following, tweets) = previous
            .map(|prev| {
                (
                    counts.followers_count - prev.followers_count,
                    counts.following_count - prev.following_count,
                    counts.tweet_count - prev.tweet_count,
                )
            })
            .unwrap_or((0, 0, 0));
        db.run(
            Statement::new(
                "INSERT INTO twitter_account_stats \
                 (project_id, followers_count, following_count, tweet_count, listed_count, \
                  followers_change, following_change, tweet_change, recorded_date) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(project_id, recorded_date) DO UPDATE SET \
                    followers_count = excluded.followers_count, \
                    following_count = excluded.following_count, \
                    tweet_count = excluded.tweet_count, \
                    listed_count = excluded.listed_count, \
                    followers_change = excluded.followers_change, \
                    following_change = excluded.following_change, \
                    tweet_change = excluded.tweet_change",
            )
            .bind(project_id)
            .bind(counts.followers_count)
            .bind(counts.following_count)
            .bind(counts.tweet_count)
            .bind(counts.listed_count)
            .bind(followers)
            .bind(following)
            .bind(tweets)
            .bind(date),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(date: &str, tweets: i64) -> TwitterStat {
        TwitterStat {
            id: 0,
            account_id: 1,
            followers_count: 0,
            following_count: 0,
            tweet_count: tweets,
            follower_change: 0,
            following_change: 0,
            tweet_change: 0,
            recorded_date: date.to_string(),
        }
    }

    fn at(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn masked_settings_hide_all_but_last_four() {
        let settings = TwitterSettings {
            id: 1,
            project_id: 1,
            api_key: "abcdefgh".into(),
            api_secret: "abc".into(),
            access_token: "".into(),
            access_token_secret: "0123456789".into(),
            enabled: true,
        };
        let masked = settings.masked();
        assert_eq!(masked.api_key, "****efgh");
        assert_eq!(masked.api_secret, "***");
        assert_eq!(masked.access_token, "");
        assert_eq!(masked.access_token_secret, "******6789");
    }

    #[test]
    fn summary_of_empty_history_is_zeroed() {
        let summary = StatsSummary::compute(&[], Some("2025-01-01 00:00:00"), at("2025-02-01 00:00:00"));
        assert_eq!(summary, StatsSummary::default());
    }

    #[test]
    fn summary_counts_days_with_new_tweets() {
        let stats = vec![
            stat("2025-03-05", 20),
            stat("2025-03-04", 20),
            stat("2025-03-03", 15),
            stat("2025-03-01", 12),
        ];
        let summary = StatsSummary::compute(
            &stats,
            Some("2025-02-01 12:00:00"),
            at("2025-03-05 12:00:00"),
        );
        assert_eq!(summary.account_age_days, 32);
        assert_eq!(summary.record_days, 5);
        assert_eq!(summary.tweeted_days, 2);
        assert_eq!(summary.max_daily_tweets, 5);
        assert_eq!(summary.max_daily_tweets_date, "2025-03-04");
        assert_eq!(summary.latest_stat.unwrap().recorded_date, "2025-03-05");
        assert_eq!(summary.oldest_stat.unwrap().recorded_date, "2025-03-01");
    }

    #[test]
    fn single_row_spans_one_day() {
        let summary = StatsSummary::compute(&[stat("2025-03-05", 3)], None, at("2025-03-05 00:00:00"));
        assert_eq!(summary.record_days, 1);
        assert_eq!(summary.tweeted_days, 0);
        assert_eq!(summary.account_age_days, 0);
    }
}
