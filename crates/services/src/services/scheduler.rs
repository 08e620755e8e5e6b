//! Publishes scheduled tweets once their time has come.
//!
//! Each due post moves from `pending` to `posted` or `failed` exactly once.
//! Failed posts are never retried.

use std::time::Duration;

use db::{
    Db, StorageError,
    models::twitter::{DUE_POST_BATCH, DuePost, ScheduledPost, TwitterPost, TwitterSettings},
};
use serde::Serialize;
use tokio::time::interval;
use tracing::{error, info, warn};

use super::twitter::{ApiCredentials, TwitterClient};

pub const SETTINGS_NOT_FOUND: &str = "Twitter API settings not found";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub processed: usize,
    pub posted: usize,
    pub failed: usize,
}

pub struct ScheduledPostService {
    db: Db,
    client: TwitterClient,
    poll_interval: Duration,
}

impl ScheduledPostService {
    pub fn new(db: Db, client: TwitterClient, poll_interval: Duration) -> Self {
        Self {
            db,
            client,
            poll_interval,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "Starting scheduled post processor with interval {:?}",
            self.poll_interval
        );
        let mut interval = interval(self.poll_interval);
        loop {
            interval.tick().await;
            match self.run_once().await {
                Ok(summary) if summary.processed > 0 => info!(
                    processed = summary.processed,
                    posted = summary.posted,
                    failed = summary.failed,
                    "Processed scheduled posts"
                ),
                Ok(_) => {}
                Err(e) => error!("Error processing scheduled posts: {}", e),
            }
        }
    }

    /// Handle up to [`DUE_POST_BATCH`] due posts, one after another.
    ///
    /// A storage error on one post marks that post failed and moves on to the
    /// next, so a single bad row never leaves the rest of the batch pending.
    pub async fn run_once(&self) -> Result<ProcessSummary, StorageError> {
        let due = ScheduledPost::due(&self.db, DUE_POST_BATCH).await?;
        let mut summary = ProcessSummary::default();
        for post in due {
            summary.processed += 1;
            match self.process(&post).await {
                Ok(true) => summary.posted += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    error!(post_id = post.id, error = %e, "Failed to process scheduled post");
                    if let Err(e) = ScheduledPost::mark_failed(&self.db, post.id, &e.to_string()).await
                    {
                        error!(post_id = post.id, error = %e, "Failed to mark scheduled post failed");
                    }
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Returns `true` when the tweet went out.
    ///
    /// Errors are only returned before the tweet is sent. Once Twitter has
    /// accepted it the post is always marked `posted`.
    #[tracing::instrument(skip(self, post), fields(post_id = post.id, project_id = post.project_id))]
    async fn process(&self, post: &DuePost) -> Result<bool, StorageError> {
        let Some(settings) = TwitterSettings::find_enabled(&self.db, post.project_id).await? else {
            warn!(post_id = post.id, project_id = post.project_id, "{}", SETTINGS_NOT_FOUND);
            ScheduledPost::mark_failed(&self.db, post.id, SETTINGS_NOT_FOUND).await?;
            return Ok(false);
        };

        let credentials = ApiCredentials::from(&settings);
        match self.client.post_tweet(&credentials, &post.content).await {
            Ok(tweet_id) => {
                let row = match TwitterPost::create(
                    &self.db,
                    post.account_id,
                    &tweet_id,
                    &post.content,
                )
                .await
                {
                    Ok(row) => Some(row),
                    Err(e) => {
                        warn!(post_id = post.id, tweet_id = %tweet_id, error = %e, "Failed to record posted tweet");
                        None
                    }
                };
                self.finish_posted(post.id, row).await;
                info!(post_id = post.id, tweet_id = %tweet_id, "Posted scheduled tweet");
                Ok(true)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(post_id = post.id, error = %message, "Scheduled tweet failed");
                ScheduledPost::mark_failed(&self.db, post.id, &message).await?;
                Ok(false)
            }
        }
    }

    async fn finish_posted(&self, post_id: i64, row: Option<i64>) {
        match ScheduledPost::mark_posted(&self.db, post_id, row).await {
            Ok(true) => {}
            Ok(false) => warn!(post_id, "Scheduled post was no longer pending"),
            Err(e) => error!(post_id, error = %e, "Failed to mark scheduled post posted"),
        }
    }
}
