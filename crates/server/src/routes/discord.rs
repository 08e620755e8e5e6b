use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    board::Board,
    discord::{
        BoardDiscordSettings, DEFAULT_CRON_SCHEDULE, DEFAULT_DAYS_AHEAD, DEFAULT_TIMEZONE,
        SaveDiscordSettings, UpcomingTask, WEBHOOK_PREFIX,
    },
};
use serde::{Deserialize, Serialize};
use services::services::{
    discord::{NotifyOutcome, is_webhook_url},
    discord_digest::is_valid_timezone,
};
use utils::{response::ApiResponse, text::non_empty};

use crate::{AppState, error::ApiError, middleware::load_board_middleware};

const DAYS_AHEAD_RANGE: std::ops::RangeInclusive<i64> = 1..=30;

#[derive(Debug, Deserialize)]
pub struct SaveSettingsRequest {
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    pub days_ahead: Option<i64>,
    pub cron_schedule: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestWebhookRequest {
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
}

/// Stored settings, or the defaults a new board starts from.
#[derive(Debug, Serialize)]
pub struct DiscordSettingsView {
    pub webhook_url: String,
    pub enabled: bool,
    pub days_ahead: i64,
    pub cron_schedule: String,
    pub timezone: String,
    pub last_sent_at: Option<String>,
}

impl From<Option<BoardDiscordSettings>> for DiscordSettingsView {
    fn from(settings: Option<BoardDiscordSettings>) -> Self {
        match settings {
            Some(s) => Self {
                webhook_url: s.webhook_url,
                enabled: s.enabled,
                days_ahead: s.days_ahead,
                cron_schedule: s.cron_schedule,
                timezone: s.timezone,
                last_sent_at: s.last_sent_at,
            },
            None => Self {
                webhook_url: String::new(),
                enabled: false,
                days_ahead: DEFAULT_DAYS_AHEAD,
                cron_schedule: DEFAULT_CRON_SCHEDULE.to_string(),
                timezone: DEFAULT_TIMEZONE.to_string(),
                last_sent_at: None,
            },
        }
    }
}

fn validate(payload: SaveSettingsRequest) -> Result<SaveDiscordSettings, ApiError> {
    let webhook_url = non_empty(payload.webhook_url.as_deref()).unwrap_or_default();
    if payload.enabled && webhook_url.is_empty() {
        return Err(ApiError::bad_request(
            "A webhook URL is required to enable notifications",
        ));
    }
    if !webhook_url.is_empty() && !is_webhook_url(&webhook_url) {
        return Err(ApiError::bad_request(format!(
            "The webhook URL must start with {WEBHOOK_PREFIX}"
        )));
    }

    let days_ahead = payload.days_ahead.unwrap_or(DEFAULT_DAYS_AHEAD);
    if !DAYS_AHEAD_RANGE.contains(&days_ahead) {
        return Err(ApiError::bad_request(
            "Days ahead must be between 1 and 30",
        ));
    }

    let timezone =
        non_empty(payload.timezone.as_deref()).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    if !is_valid_timezone(&timezone) {
        return Err(ApiError::bad_request(format!("Unknown timezone: {timezone}")));
    }

    Ok(SaveDiscordSettings {
        webhook_url,
        enabled: payload.enabled,
        days_ahead,
        cron_schedule: non_empty(payload.cron_schedule.as_deref())
            .unwrap_or_else(|| DEFAULT_CRON_SCHEDULE.to_string()),
        timezone,
    })
}

pub async fn get_settings(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<DiscordSettingsView>>, ApiError> {
    let settings = BoardDiscordSettings::find_by_board(state.db(), board.id).await?;
    Ok(ResponseJson(ApiResponse::success(settings.into())))
}

pub async fn save_settings(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Json(payload): Json<SaveSettingsRequest>,
) -> Result<ResponseJson<ApiResponse<DiscordSettingsView>>, ApiError> {
    let data = validate(payload)?;
    BoardDiscordSettings::save(state.db(), board.id, &data).await?;
    tracing::info!(board_id = board.id, enabled = data.enabled, "saved discord settings");
    let settings = BoardDiscordSettings::find_by_board(state.db(), board.id).await?;
    Ok(ResponseJson(ApiResponse::success(settings.into())))
}

/// Uses the URL in the request when given, otherwise the saved one.
pub async fn send_test(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Json(payload): Json<TestWebhookRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let webhook_url = match non_empty(payload.webhook_url.as_deref()) {
        Some(url) => url,
        None => BoardDiscordSettings::find_by_board(state.db(), board.id)
            .await?
            .map(|s| s.webhook_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ApiError::bad_request("Save a webhook URL first"))?,
    };
    if !is_webhook_url(&webhook_url) {
        return Err(ApiError::bad_request(format!(
            "The webhook URL must start with {WEBHOOK_PREFIX}"
        )));
    }
    state.discord().send_test(&webhook_url, &board.title).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn notify_now(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<NotifyOutcome>>, ApiError> {
    let settings = BoardDiscordSettings::find_by_board(state.db(), board.id)
        .await?
        .filter(|s| !s.webhook_url.is_empty())
        .ok_or_else(|| ApiError::bad_request("Discord notifications are not configured"))?;
    let outcome = state
        .discord()
        .notify_upcoming(
            state.db(),
            board.id,
            &board.title,
            &settings.webhook_url,
            settings.days_ahead,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

pub async fn upcoming_tasks(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Query(query): Query<UpcomingQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<UpcomingTask>>>, ApiError> {
    let days = match query.days {
        Some(days) => days,
        None => BoardDiscordSettings::find_by_board(state.db(), board.id)
            .await?
            .map(|s| s.days_ahead)
            .unwrap_or(DEFAULT_DAYS_AHEAD),
    };
    let days = days.clamp(*DAYS_AHEAD_RANGE.start(), *DAYS_AHEAD_RANGE.end());
    let tasks = UpcomingTask::for_board(state.db(), board.id, days).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let discord = Router::new()
        .route("/", get(get_settings).put(save_settings))
        .route("/test", post(send_test))
        .route("/notify", post(notify_now))
        .route("/upcoming", get(upcoming_tasks))
        .layer(from_fn_with_state(state.clone(), load_board_middleware));

    Router::new().nest("/boards/{board_id}/discord", discord)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str, enabled: bool, days: Option<i64>) -> SaveSettingsRequest {
        SaveSettingsRequest {
            webhook_url: Some(url.to_string()),
            enabled,
            days_ahead: days,
            cron_schedule: None,
            timezone: None,
        }
    }

    #[test]
    fn enabling_requires_a_discord_webhook() {
        assert!(validate(request("", true, None)).is_err());
        assert!(validate(request("https://example.com/hook", false, None)).is_err());

        let saved = validate(request("https://discord.com/api/webhooks/1/abc", true, None)).unwrap();
        assert_eq!(saved.days_ahead, DEFAULT_DAYS_AHEAD);
        assert_eq!(saved.cron_schedule, DEFAULT_CRON_SCHEDULE);
        assert_eq!(saved.timezone, DEFAULT_TIMEZONE);
    }

    #[test]
    fn days_ahead_is_bounded() {
        let url = "https://discord.com/api/webhooks/1/abc";
        assert!(validate(request(url, true, Some(0))).is_err());
        assert!(validate(request(url, true, Some(31))).is_err());
        assert_eq!(validate(request(url, true, Some(30))).unwrap().days_ahead, 30);
    }

    #[test]
    fn disabled_without_url_is_allowed() {
        let saved = validate(request("  ", false, None)).unwrap();
        assert!(saved.webhook_url.is_empty());
        assert!(!saved.enabled);
    }
}
