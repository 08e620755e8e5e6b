//! Discord incoming-webhook notifications for cards that are due soon.

use std::time::Duration;

use db::{
    Db, StorageError,
    models::discord::{UpcomingTask, WEBHOOK_PREFIX},
};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("Webhook send failed: {status} {reason}")]
    Rejected { status: u16, reason: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotifyOutcome {
    pub success: bool,
    pub task_count: usize,
}

pub fn is_webhook_url(url: &str) -> bool {
    url.starts_with(WEBHOOK_PREFIX)
}

/// Message body for the digest; empty when there is nothing to report.
pub fn format_message(board_title: &str, tasks: &[UpcomingTask], days_ahead: i64) -> String {
    if tasks.is_empty() {
        return String::new();
    }

    let mut message = String::from("[Task board] Upcoming due dates\n\n");
    message.push_str(&format!("Board: {board_title}\n\n"));
    message.push_str(&format!("Tasks due within {days_ahead} days:\n\n"));
    for (index, task) in tasks.iter().enumerate() {
        message.push_str(&format!("{}. Task: {}\n", index + 1, task.title));
        message.push_str(&format!("   Due: {}\n", task.due_date));
        message.push_str(&format!("   List: {}\n", task.list_title));
        message.push_str(&format!("   Days left: {}\n\n", task.days_until_due));
    }
    message
}

pub fn test_message(board_title: &str) -> String {
    format!(
        "[Task board] Test notification\n\nBoard: {board_title}\n\n\
         This is a test of the Discord integration. Your settings are working."
    )
}

#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient").finish_non_exhaustive()
    }
}

impl DiscordClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new() -> Result<Self, DiscordError> {
        let http = Client::builder().timeout(Self::REQUEST_TIMEOUT).build()?;
        Ok(Self { http })
    }

    /// POST `{content}` to the webhook.
    pub async fn send(&self, webhook_url: &str, content: &str) -> Result<(), DiscordError> {
        let response = self
            .http
            .post(webhook_url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "discord webhook rejected message");
            return Err(DiscordError::Rejected {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        Ok(())
    }

    pub async fn send_test(&self, webhook_url: &str, board_title: &str) -> Result<(), DiscordError> {
        self.send(webhook_url, &test_message(board_title)).await
    }

    /// Send the digest for one board. Nothing is sent when no card is due.
    #[tracing::instrument(skip(self, db, webhook_url, board_title))]
    pub async fn notify_upcoming(
        &self,
        db: &Db,
        board_id: i64,
        board_title: &str,
        webhook_url: &str,
        days_ahead: i64,
    ) -> Result<NotifyOutcome, DiscordError> {
        let tasks = UpcomingTask::for_board(db, board_id, days_ahead).await?;
        if tasks.is_empty() {
            return Ok(NotifyOutcome {
                success: true,
                task_count: 0,
            });
        }

        self.send(webhook_url, &format_message(board_title, &tasks, days_ahead))
            .await?;
        tracing::info!(task_count = tasks.len(), "discord digest sent");
        Ok(NotifyOutcome {
            success: true,
            task_count: tasks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, due: &str, days: i64) -> UpcomingTask {
        UpcomingTask {
            id: 1,
            title: title.to_string(),
            description: None,
            due_date: due.to_string(),
            list_title: "Doing".to_string(),
            days_until_due: days,
        }
    }

    #[test]
    fn no_tasks_means_no_message() {
        assert_eq!(format_message("Board", &[], 3), "");
    }

    #[test]
    fn message_numbers_each_task() {
        let message = format_message(
            "Launch",
            &[task("Write copy", "2025-05-02", 1), task("Ship", "2025-05-03", 2)],
            3,
        );
        assert!(message.starts_with("[Task board] Upcoming due dates\n\nBoard: Launch\n\n"));
        assert!(message.contains("Tasks due within 3 days:"));
        assert!(message.contains("1. Task: Write copy\n   Due: 2025-05-02\n   List: Doing\n   Days left: 1\n"));
        assert!(message.contains("2. Task: Ship\n"));
    }

    #[test]
    fn webhook_prefix_is_enforced() {
        assert!(is_webhook_url("https://discord.com/api/webhooks/1/abc"));
        assert!(!is_webhook_url("http://discord.com/api/webhooks/1/abc"));
        assert!(!is_webhook_url("https://example.com/hook"));
    }

    #[test]
    fn rejection_message_includes_status_and_reason() {
        let error = DiscordError::Rejected {
            status: 404,
            reason: "Not Found".into(),
        };
        assert_eq!(error.to_string(), "Webhook send failed: 404 Not Found");
    }
}
