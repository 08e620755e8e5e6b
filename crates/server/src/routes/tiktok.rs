//! TikTok page of a project. Nothing is fetched from TikTok: the account and
//! the daily counts are typed in by the user.

use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use chrono::Utc;
use db::models::{
    project::Project,
    tiktok::{TiktokAccount, TiktokCounts, TiktokStat},
};
use serde::{Deserialize, Serialize};
use services::services::kpi_period::{format_date, parse_date};
use utils::{response::ApiResponse, text::non_empty};

use super::{Created, required};
use crate::{AppState, error::ApiError, middleware::load_project_middleware};

#[derive(Debug, Serialize)]
pub struct TiktokOverview {
    pub account: Option<TiktokAccount>,
    pub latest_stat: Option<TiktokStat>,
}

/// `account_id` falls back to the username.
#[derive(Debug, Deserialize)]
pub struct SaveAccountRequest {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatsRequest {
    #[serde(flatten)]
    pub counts: TiktokCounts,
    pub recorded_date: Option<String>,
}

pub async fn overview(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TiktokOverview>>, ApiError> {
    let account = TiktokAccount::latest(state.db(), project.id).await?;
    let latest_stat = match &account {
        Some(account) => TiktokStat::latest(state.db(), account.id).await?,
        None => None,
    };
    Ok(ResponseJson(ApiResponse::success(TiktokOverview {
        account,
        latest_stat,
    })))
}

pub async fn save_account(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<SaveAccountRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let username = required(payload.username.as_deref(), "Username is required")?;
    let account_id = non_empty(payload.account_id.as_deref()).unwrap_or_else(|| username.clone());
    let display_name = non_empty(payload.display_name.as_deref());
    let id = TiktokAccount::upsert(
        state.db(),
        project.id,
        &account_id,
        &username,
        display_name.as_deref(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

/// Counts default to today; a second entry for the same day replaces the first.
pub async fn update_stats(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<StatsRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let account = TiktokAccount::latest(state.db(), project.id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Register a TikTok account first"))?;
    let date = match non_empty(payload.recorded_date.as_deref()) {
        Some(raw) => format_date(
            parse_date(&raw).ok_or_else(|| ApiError::bad_request("Date must be YYYY-MM-DD"))?,
        ),
        None => format_date(Utc::now().date_naive()),
    };
    TiktokStat::upsert(state.db(), account.id, &date, payload.counts).await?;
    tracing::info!(project_id = project.id, date = %date, "recorded tiktok stats");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let tiktok = Router::new()
        .route("/", get(overview))
        .route("/account", put(save_account))
        .route("/stats", post(update_stats))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new().nest("/projects/{project_id}/tiktok", tiktok)
}
