use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use db::{
    Db, StorageError,
    models::discord::{BoardDiscordSettings, DigestTarget},
};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use super::discord::DiscordClient;

const SENT_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A `M H * * *` cron expression: once a day at a fixed local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub minute: u32,
    pub hour: u32,
}

impl DailySchedule {
    /// Other cron shapes are not supported and return `None`.
    pub fn parse(expr: &str) -> Option<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, "*", "*", "*"] = fields.as_slice() else {
            return None;
        };
        let minute: u32 = minute.parse().ok().filter(|m| *m < 60)?;
        let hour: u32 = hour.parse().ok().filter(|h| *h < 24)?;
        Some(Self { minute, hour })
    }
}

/// Whether a board with `schedule` in `tz` should be sent at `now`.
///
/// A board already sent on the same local day is skipped.
pub fn is_due(
    schedule: DailySchedule,
    tz: Tz,
    now: DateTime<Utc>,
    last_sent_at: Option<&str>,
) -> bool {
    let local = now.with_timezone(&tz);
    if local.hour() != schedule.hour || local.minute() != schedule.minute {
        return false;
    }
    let already_sent_today = last_sent_at
        .and_then(|sent| NaiveDateTime::parse_from_str(sent, SENT_AT_FORMAT).ok())
        .map(|sent| sent.and_utc().with_timezone(&tz).date_naive() == local.date_naive())
        .unwrap_or(false);
    !already_sent_today
}

/// IANA zone names such as `Asia/Tokyo` or `UTC`.
pub fn is_valid_timezone(name: &str) -> bool {
    name.parse::<Tz>().is_ok()
}

/// Sends each enabled board's digest at its configured local time.
pub struct DiscordDigestService {
    db: Db,
    client: DiscordClient,
    poll_interval: Duration,
}

impl DiscordDigestService {
    pub fn new(db: Db, client: DiscordClient, poll_interval: Duration) -> Self {
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
            "Starting Discord digest scheduler with interval {:?}",
            self.poll_interval
        );
        let mut interval = interval(self.poll_interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.run_tick(Utc::now()).await {
                error!("Error running Discord digest tick: {}", e);
            }
        }
    }

    /// Send every due digest. Returns how many boards were processed.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let targets = BoardDiscordSettings::digest_targets(&self.db).await?;
        let mut sent = 0;
        for target in targets {
            if !self.target_is_due(&target, now) {
                continue;
            }
            match self
                .client
                .notify_upcoming(
                    &self.db,
                    target.board_id,
                    &target.board_title,
                    &target.webhook_url,
                    target.days_ahead,
                )
                .await
            {
                Ok(outcome) => {
                    let stamp = now.format(SENT_AT_FORMAT).to_string();
                    BoardDiscordSettings::mark_sent(&self.db, target.board_id, &stamp).await?;
                    debug!(board_id = target.board_id, task_count = outcome.task_count, "digest tick");
                    sent += 1;
                }
                Err(e) => warn!(board_id = target.board_id, "Failed to send Discord digest: {}", e),
            }
        }
        Ok(sent)
    }

    fn target_is_due(&self, target: &DigestTarget, now: DateTime<Utc>) -> bool {
        let Some(schedule) = DailySchedule::parse(&target.cron_schedule) else {
            warn!(
                board_id = target.board_id,
                cron = %target.cron_schedule,
                "Unsupported cron schedule, expected 'M H * * *'"
            );
            return false;
        };
        let Ok(tz) = target.timezone.parse::<Tz>() else {
            warn!(board_id = target.board_id, timezone = %target.timezone, "Unknown timezone");
            return false;
        };
        is_due(schedule, tz, now, target.last_sent_at.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(value: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(value, SENT_AT_FORMAT)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn parses_daily_schedules_only() {
        assert_eq!(
            DailySchedule::parse("0 9 * * *"),
            Some(DailySchedule { minute: 0, hour: 9 })
        );
        assert_eq!(
            DailySchedule::parse(" 30  18 * * * "),
            Some(DailySchedule { minute: 30, hour: 18 })
        );
        assert_eq!(DailySchedule::parse("0 9 * * 1"), None);
        assert_eq!(DailySchedule::parse("*/5 * * * *"), None);
        assert_eq!(DailySchedule::parse("60 9 * * *"), None);
        assert_eq!(DailySchedule::parse("0 24 * * *"), None);
    }

    #[test]
    fn timezone_names() {
        assert!(is_valid_timezone("Asia/Tokyo"));
        assert!(is_valid_timezone("UTC"));
        assert!(!is_valid_timezone("Mars/Olympus"));
    }

    #[test]
    fn due_in_board_timezone() {
        let schedule = DailySchedule { minute: 0, hour: 9 };
        let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
        // 00:00 UTC is 09:00 in Tokyo.
        assert!(is_due(schedule, tokyo, utc("2025-05-01 00:00:30"), None));
        assert!(!is_due(schedule, tokyo, utc("2025-05-01 09:00:00"), None));
        assert!(is_due(schedule, chrono_tz::UTC, utc("2025-05-01 09:00:00"), None));
    }

    #[test]
    fn not_sent_twice_on_the_same_local_day() {
        let schedule = DailySchedule { minute: 0, hour: 9 };
        let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
        let now = utc("2025-05-01 00:00:40");
        assert!(!is_due(schedule, tokyo, now, Some("2025-05-01 00:00:05")));
        assert!(is_due(schedule, tokyo, now, Some("2025-04-30 00:00:05")));
    }
}
