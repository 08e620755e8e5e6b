//! Twitter/X pages of a project: account and settings, OAuth connection,
//! posting and scheduling, stats history and CSV import.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, header::SET_COOKIE},
    middleware::from_fn_with_state,
    response::{AppendHeaders, IntoResponse, Json as ResponseJson, Redirect},
    routing::{delete, get, post, put},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, NaiveDateTime, Utc};
use db::models::{
    ownership::Resource,
    project::Project,
    twitter::{
        AccountCounts, DailyCounts, MONTHLY_POST_LIMIT, MaskedTwitterSettings, RECENT_POST_LIMIT,
        STATS_HISTORY_DAYS, SaveOAuthToken, SaveTwitterSettings, ScheduledPost, StatsSummary,
        TwitterAccount, TwitterAccountStat, TwitterOAuthToken, TwitterPost, TwitterSettings,
        TwitterStat,
    },
};
use serde::{Deserialize, Serialize};
use services::services::{
    csv_import::{ImportSummary, import_twitter_stats},
    kpi_period::{format_date, parse_date},
    twitter::{ApiCredentials, MAX_TWEET_CHARS, TwitterUser, UserStats},
};
use utils::{response::ApiResponse, text::non_empty};

use super::{Created, required};
use crate::{
    AppState,
    auth::{CurrentUser, SameSite, clear_cookie, cookie_header},
    error::ApiError,
    middleware::load_project_middleware,
};

pub const REQUEST_SECRET_COOKIE: &str = "twitter_request_token_secret";
pub const OAUTH_PROJECT_COOKIE: &str = "twitter_oauth_project_id";
pub const OAUTH_COOKIE_MAX_AGE_SECS: i64 = 300;
pub const CALLBACK_PATH: &str = "/api/auth/twitter/callback";

const SCHEDULE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn today() -> String {
    format_date(Utc::now().date_naive())
}

#[derive(Debug, Serialize)]
pub struct TwitterOverview {
    pub account: Option<TwitterAccount>,
    pub latest_stat: Option<TwitterStat>,
    pub history: Vec<TwitterStat>,
    pub settings: Option<MaskedTwitterSettings>,
    pub oauth: Option<TwitterOAuthToken>,
    pub account_stat: Option<TwitterAccountStat>,
    pub account_stat_history: Vec<TwitterAccountStat>,
}

#[derive(Debug, Serialize)]
pub struct PostsOverview {
    pub account: Option<TwitterAccount>,
    pub pending: Vec<ScheduledPost>,
    pub recent_posts: Vec<TwitterPost>,
    pub monthly_count: i64,
    pub monthly_limit: i64,
}

#[derive(Debug, Serialize)]
pub struct StatsPage {
    pub account: TwitterAccount,
    pub stats: Vec<TwitterStat>,
    pub summary: StatsSummary,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub authorize_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveAccountRequest {
    pub username: Option<String>,
    pub account_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ManualStatsRequest {
    #[serde(flatten)]
    pub counts: DailyCounts,
    pub recorded_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveSettingsRequest {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub content: Option<String>,
}

/// Either `scheduled_at` (RFC 3339, or a naive UTC datetime) or a
/// `scheduled_date` + `scheduled_time` pair in UTC.
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub content: Option<String>,
    pub scheduled_at: Option<String>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub oauth_token: Option<String>,
    pub oauth_verifier: Option<String>,
    pub denied: Option<String>,
}

fn parse_schedule(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc).naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// The schedule as a UTC `YYYY-MM-DD HH:MM:SS` string, which must lie after `now`.
fn normalize_schedule(request: &ScheduleRequest, now: NaiveDateTime) -> Result<String, ApiError> {
    let raw = match (
        non_empty(request.scheduled_at.as_deref()),
        non_empty(request.scheduled_date.as_deref()),
        non_empty(request.scheduled_time.as_deref()),
    ) {
        (Some(at), _, _) => at,
        (None, Some(date), Some(time)) => format!("{date} {time}"),
        _ => return Err(ApiError::bad_request("Date and time are required")),
    };
    let at = parse_schedule(&raw)
        .ok_or_else(|| ApiError::bad_request("Invalid date or time"))?;
    if at <= now {
        return Err(ApiError::bad_request("Scheduled time must be in the future"));
    }
    Ok(at.format(SCHEDULE_FORMAT).to_string())
}

fn tweet_content(content: Option<&str>) -> Result<String, ApiError> {
    let content = required(content, "Post content is required")?;
    if content.chars().count() > MAX_TWEET_CHARS {
        return Err(ApiError::bad_request(format!(
            "Posts are limited to {MAX_TWEET_CHARS} characters"
        )));
    }
    Ok(content)
}

async fn require_account(state: &AppState, project_id: i64) -> Result<TwitterAccount, ApiError> {
    TwitterAccount::latest(state.db(), project_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Register a Twitter account first"))
}

async fn require_settings(state: &AppState, project_id: i64) -> Result<TwitterSettings, ApiError> {
    TwitterSettings::find_enabled(state.db(), project_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Twitter API settings not found"))
}

pub async fn overview(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TwitterOverview>>, ApiError> {
    let db = state.db();
    let account = TwitterAccount::latest(db, project.id).await?;
    let (latest_stat, history) = match &account {
        Some(account) => (
            TwitterStat::latest(db, account.id).await?,
            TwitterStat::history(db, account.id, STATS_HISTORY_DAYS).await?,
        ),
        None => (None, Vec::new()),
    };
    let overview = TwitterOverview {
        account,
        latest_stat,
        history,
        settings: TwitterSettings::find_by_project(db, project.id)
            .await?
            .map(|settings| settings.masked()),
        oauth: TwitterOAuthToken::find_by_project(db, project.id).await?,
        account_stat: TwitterAccountStat::latest(db, project.id).await?,
        account_stat_history: TwitterAccountStat::history(db, project.id, STATS_HISTORY_DAYS)
            .await?,
    };
    Ok(ResponseJson(ApiResponse::success(overview)))
}

/// `account_id` falls back to the username.
pub async fn save_account(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<SaveAccountRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let username = required(payload.username.as_deref(), "Username is required")?;
    let username = username.trim_start_matches('@').to_string();
    let account_id = non_empty(payload.account_id.as_deref()).unwrap_or_else(|| username.clone());
    let name = non_empty(payload.name.as_deref());
    let id = TwitterAccount::upsert(state.db(), project.id, &account_id, &username, name.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn record_manual_stats(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<ManualStatsRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let account = require_account(&state, project.id).await?;
    let date = match non_empty(payload.recorded_date.as_deref()) {
        Some(raw) => format_date(
            parse_date(&raw).ok_or_else(|| ApiError::bad_request("Date must be YYYY-MM-DD"))?,
        ),
        None => today(),
    };
    TwitterStat::upsert(state.db(), account.id, &date, payload.counts).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Settings are stored before they are verified, so a failed lookup still
/// leaves the new credentials in place.
pub async fn save_settings(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<SaveSettingsRequest>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    let (Some(api_key), Some(api_secret), Some(access_token), Some(access_token_secret)) = (
        non_empty(payload.api_key.as_deref()),
        non_empty(payload.api_secret.as_deref()),
        non_empty(payload.access_token.as_deref()),
        non_empty(payload.access_token_secret.as_deref()),
    ) else {
        return Err(ApiError::bad_request("All four API credentials are required"));
    };
    TwitterSettings::upsert(
        state.db(),
        project.id,
        &SaveTwitterSettings {
            api_key: &api_key,
            api_secret: &api_secret,
            access_token: &access_token,
            access_token_secret: &access_token_secret,
        },
    )
    .await?;

    let credentials = ApiCredentials {
        api_key,
        api_secret,
        access_token,
        access_token_secret,
    };
    let user = state.twitter().user_info(&credentials).await.map_err(|e| {
        ApiError::bad_request(format!("Settings saved, but the account lookup failed: {e}"))
    })?;
    TwitterAccount::upsert(
        state.db(),
        project.id,
        &user.id,
        &user.username,
        Some(&user.name),
    )
    .await?;
    tracing::info!(project_id = project.id, username = %user.username, "twitter settings verified");
    Ok(ResponseJson(ApiResponse::success(MessageResponse {
        message: format!("Settings saved and connected to @{}", user.username),
    })))
}

pub async fn test_connection(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TwitterUser>>, ApiError> {
    let settings = require_settings(&state, project.id).await?;
    let user = state
        .twitter()
        .user_info(&ApiCredentials::from(&settings))
        .await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

fn callback_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.config().public_base_url {
        return format!("{base}{CALLBACK_PATH}");
    }
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let scheme = header("x-forwarded-proto").unwrap_or("http");
    let host = header("host").unwrap_or("localhost");
    format!("{scheme}://{host}{CALLBACK_PATH}")
}

/// Issue a request token and remember its secret and the project in
/// short-lived cookies until the callback arrives.
pub async fn start_oauth(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let settings = TwitterSettings::find_by_project(state.db(), project.id)
        .await?
        .filter(|s| !s.api_key.is_empty() && !s.api_secret.is_empty())
        .ok_or_else(|| ApiError::bad_request("Save the API key and secret first"))?;
    let callback = callback_url(&state, &headers);
    let request_token = state
        .twitter()
        .request_token(&settings.api_key, &settings.api_secret, &callback)
        .await?;

    let secure = state.config().cookie_secure;
    let cookies = AppendHeaders([
        (
            SET_COOKIE,
            cookie_header(
                REQUEST_SECRET_COOKIE,
                &request_token.secret,
                OAUTH_COOKIE_MAX_AGE_SECS,
                SameSite::Lax,
                secure,
            ),
        ),
        (
            SET_COOKIE,
            cookie_header(
                OAUTH_PROJECT_COOKIE,
                &project.id.to_string(),
                OAUTH_COOKIE_MAX_AGE_SECS,
                SameSite::Lax,
                secure,
            ),
        ),
    ]);
    let body = AuthorizeResponse {
        authorize_url: state.twitter().authorize_url(&request_token.token),
    };
    Ok((
        cookies,
        ResponseJson(ApiResponse::<AuthorizeResponse>::success(body)),
    ))
}

/// Where the callback sends the browser; every outcome ends in a redirect.
#[derive(Debug, PartialEq, Eq)]
enum CallbackOutcome {
    Login,
    Projects(&'static str),
    Project(i64, &'static str, &'static str),
}

impl CallbackOutcome {
    fn location(&self) -> String {
        match self {
            CallbackOutcome::Login => "/login".to_string(),
            CallbackOutcome::Projects(error) => format!("/dashboard/projects?error={error}"),
            CallbackOutcome::Project(id, key, code) => {
                format!("/dashboard/projects/{id}/twitter?{key}={code}")
            }
        }
    }
}

async fn complete_oauth(
    state: &AppState,
    jar: &CookieJar,
    query: CallbackQuery,
) -> Result<CallbackOutcome, ApiError> {
    let Some(user) = CurrentUser::from_cookies(state.db(), jar).await? else {
        return Ok(CallbackOutcome::Login);
    };
    if query.denied.is_some() {
        return Ok(CallbackOutcome::Projects("twitter_auth_denied"));
    }
    let (Some(oauth_token), Some(verifier)) = (
        non_empty(query.oauth_token.as_deref()),
        non_empty(query.oauth_verifier.as_deref()),
    ) else {
        return Ok(CallbackOutcome::Projects("invalid_oauth_params"));
    };
    let secret = jar.get(REQUEST_SECRET_COOKIE).map(|c| c.value().to_string());
    let project_id = jar
        .get(OAUTH_PROJECT_COOKIE)
        .and_then(|c| c.value().parse::<i64>().ok());
    let (Some(secret), Some(project_id)) = (secret, project_id) else {
        return Ok(CallbackOutcome::Projects("missing_oauth_state"));
    };
    if !Resource::Project(project_id).owned_by(state.db(), user.id).await? {
        return Ok(CallbackOutcome::Projects("missing_oauth_state"));
    }

    let Some(settings) = TwitterSettings::find_by_project(state.db(), project_id).await? else {
        return Ok(CallbackOutcome::Project(project_id, "error", "settings_not_found"));
    };
    let access = match state
        .twitter()
        .access_token(
            &settings.api_key,
            &settings.api_secret,
            &oauth_token,
            &secret,
            &verifier,
        )
        .await
    {
        Ok(access) => access,
        Err(e) => {
            tracing::warn!(project_id, error = %e, "twitter access token exchange failed");
            return Ok(CallbackOutcome::Project(project_id, "error", "access_token_failed"));
        }
    };
    TwitterOAuthToken::upsert(
        state.db(),
        user.id,
        project_id,
        &SaveOAuthToken {
            access_token: &access.token,
            access_token_secret: &access.secret,
            twitter_user_id: &access.user_id,
            screen_name: &access.screen_name,
        },
    )
    .await?;
    tracing::info!(project_id, screen_name = %access.screen_name, "twitter account connected");
    Ok(CallbackOutcome::Project(project_id, "success", "oauth_connected"))
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = complete_oauth(&state, &jar, query).await?;
    let secure = state.config().cookie_secure;
    let cleared = AppendHeaders([
        (SET_COOKIE, clear_cookie(REQUEST_SECRET_COOKIE, SameSite::Lax, secure)),
        (SET_COOKIE, clear_cookie(OAUTH_PROJECT_COOKIE, SameSite::Lax, secure)),
    ]);
    Ok((cleared, Redirect::to(&outcome.location())))
}

/// Counts through the connected user's tokens, with deltas against the
/// previous recorded day.
pub async fn update_stats_via_oauth(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<UserStats>>, ApiError> {
    let token = TwitterOAuthToken::find_by_project(state.db(), project.id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Connect a Twitter account first"))?;
    let settings = TwitterSettings::find_by_project(state.db(), project.id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Twitter API settings not found"))?;
    let stats = state
        .twitter()
        .user_stats(&ApiCredentials::from_oauth(&settings, &token))
        .await?;
    TwitterAccountStat::record(
        state.db(),
        project.id,
        &today(),
        AccountCounts {
            followers_count: stats.followers_count,
            following_count: stats.following_count,
            tweet_count: stats.tweet_count,
            listed_count: stats.listed_count,
        },
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn fetch_stats(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<UserStats>>, ApiError> {
    let settings = require_settings(&state, project.id).await?;
    let account = require_account(&state, project.id).await?;
    let stats = state
        .twitter()
        .user_stats(&ApiCredentials::from(&settings))
        .await?;
    TwitterStat::upsert(
        state.db(),
        account.id,
        &today(),
        DailyCounts {
            followers_count: stats.followers_count,
            following_count: stats.following_count,
            tweet_count: stats.tweet_count,
        },
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn disconnect(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    TwitterOAuthToken::delete(state.db(), user.id, project.id).await?;
    tracing::info!(project_id = project.id, "twitter account disconnected");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub(crate) async fn publish_now(
    state: &AppState,
    project_id: i64,
    content: Option<&str>,
) -> Result<Created, ApiError> {
    let content = tweet_content(content)?;
    let account = require_account(state, project_id).await?;
    let settings = require_settings(state, project_id).await?;
    let tweet_id = state
        .twitter()
        .post_tweet(&ApiCredentials::from(&settings), &content)
        .await?;
    let id = TwitterPost::create(state.db(), account.id, &tweet_id, &content).await?;
    tracing::info!(project_id, tweet_id = %tweet_id, "tweet posted");
    Ok(Created { id })
}

pub(crate) async fn schedule(
    state: &AppState,
    project_id: i64,
    request: &ScheduleRequest,
) -> Result<Created, ApiError> {
    let content = tweet_content(request.content.as_deref())?;
    let scheduled_at = normalize_schedule(request, Utc::now().naive_utc())?;
    let account = require_account(state, project_id).await?;
    let id = ScheduledPost::create(state.db(), account.id, &content, &scheduled_at).await?;
    Ok(Created { id })
}

pub(crate) async fn remove_scheduled(
    state: &AppState,
    user: &CurrentUser,
    project_id: i64,
    post_id: i64,
) -> Result<(), ApiError> {
    user.ensure_owns(state.db(), Resource::ScheduledPost(post_id))
        .await?;
    let account = require_account(state, project_id).await?;
    if ScheduledPost::delete_pending(state.db(), account.id, post_id).await? == 0 {
        return Err(ApiError::not_found("Pending post not found"));
    }
    Ok(())
}

pub async fn posts_overview(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<PostsOverview>>, ApiError> {
    let db = state.db();
    let account = TwitterAccount::latest(db, project.id).await?;
    let overview = match account {
        Some(account) => PostsOverview {
            pending: ScheduledPost::pending_for_account(db, account.id).await?,
            recent_posts: TwitterPost::recent(db, account.id, RECENT_POST_LIMIT).await?,
            monthly_count: TwitterPost::count_this_month(db, account.id).await?,
            monthly_limit: MONTHLY_POST_LIMIT,
            account: Some(account),
        },
        None => PostsOverview {
            account: None,
            pending: Vec::new(),
            recent_posts: Vec::new(),
            monthly_count: 0,
            monthly_limit: MONTHLY_POST_LIMIT,
        },
    };
    Ok(ResponseJson(ApiResponse::success(overview)))
}

pub async fn post_now(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<PostRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let created = publish_now(&state, project.id, payload.content.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(created)))
}

pub async fn schedule_post(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<ScheduleRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let created = schedule(&state, project.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(created)))
}

pub async fn delete_scheduled(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, post_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    remove_scheduled(&state, &user, project.id, post_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn stats_page(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<StatsPage>>, ApiError> {
    let account = require_account(&state, project.id).await?;
    let stats = TwitterStat::all_desc(state.db(), account.id).await?;
    let summary = StatsSummary::compute(
        &stats,
        account.created_at.as_deref(),
        Utc::now().naive_utc(),
    );
    Ok(ResponseJson(ApiResponse::success(StatsPage {
        account,
        stats,
        summary,
    })))
}

/// The body is the CSV text itself.
pub async fn import_csv(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    body: String,
) -> Result<ResponseJson<ApiResponse<ImportSummary>>, ApiError> {
    let summary = import_twitter_stats(state.db(), project.id, &body).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let twitter = Router::new()
        .route("/", get(overview))
        .route("/account", put(save_account))
        .route("/stats", get(stats_page).post(record_manual_stats))
        .route("/stats/import", post(import_csv))
        .route("/stats/fetch", post(fetch_stats))
        .route("/stats/oauth", post(update_stats_via_oauth))
        .route("/settings", put(save_settings))
        .route("/test", post(test_connection))
        .route("/oauth", post(start_oauth).delete(disconnect))
        .route("/posts", get(posts_overview).post(post_now))
        .route("/posts/scheduled", post(schedule_post))
        .route("/posts/scheduled/{post_id}", delete(delete_scheduled))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new().nest("/projects/{project_id}/twitter", twitter)
}

/// The OAuth callback is reached by a browser redirect, so it sits outside
/// the session layer and resolves the user itself.
pub fn callback_router() -> Router<AppState> {
    Router::new().route("/auth/twitter/callback", get(oauth_callback))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, SCHEDULE_FORMAT).unwrap()
    }

    fn request(at: Option<&str>, date: Option<&str>, time: Option<&str>) -> ScheduleRequest {
        ScheduleRequest {
            content: Some("hello".into()),
            scheduled_at: at.map(String::from),
            scheduled_date: date.map(String::from),
            scheduled_time: time.map(String::from),
        }
    }

    #[test]
    fn schedule_is_normalized_to_utc() {
        let now = at("2025-03-01 08:00:00");
        assert_eq!(
            normalize_schedule(&request(None, Some("2025-03-01"), Some("09:30")), now).unwrap(),
            "2025-03-01 09:30:00"
        );
        assert_eq!(
            normalize_schedule(&request(Some("2025-03-01T18:00:00+09:00"), None, None), now)
                .unwrap(),
            "2025-03-01 09:00:00"
        );
    }

    #[test]
    fn schedule_must_be_in_the_future() {
        let now = at("2025-03-01 08:00:00");
        assert!(normalize_schedule(&request(None, Some("2025-03-01"), Some("08:00")), now).is_err());
        assert!(normalize_schedule(&request(None, Some("2025-03-01"), None), now).is_err());
        assert!(normalize_schedule(&request(Some("tomorrow"), None, None), now).is_err());
    }

    #[test]
    fn tweets_are_limited_by_characters_not_bytes() {
        let japanese = "あ".repeat(MAX_TWEET_CHARS);
        assert!(tweet_content(Some(&japanese)).is_ok());
        assert!(tweet_content(Some(&"a".repeat(MAX_TWEET_CHARS + 1))).is_err());
        assert!(tweet_content(Some("   ")).is_err());
    }

    #[test]
    fn callback_redirects() {
        assert_eq!(CallbackOutcome::Login.location(), "/login");
        assert_eq!(
            CallbackOutcome::Projects("twitter_auth_denied").location(),
            "/dashboard/projects?error=twitter_auth_denied"
        );
        assert_eq!(
            CallbackOutcome::Project(7, "success", "oauth_connected").location(),
            "/dashboard/projects/7/twitter?success=oauth_connected"
        );
    }
}
