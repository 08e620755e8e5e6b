use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use chrono::Utc;
use db::models::{
    meta::{
        FacebookPage, InstagramAccount, InstagramMedia, InstagramStats, MEDIA_LIMIT,
        MetaApiSettings, SaveFacebookPage, SaveInstagramAccount, SaveInstagramMedia,
        SaveThreadsPost, ThreadsPost, ThreadsStats,
    },
    project::Project,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use services::services::meta::{PageInfo, TokenInfo};
use utils::{response::ApiResponse, text::non_empty};

use crate::{AppState, error::ApiError, middleware::load_project_middleware};

const THREADS_USER: &str = "me";

#[derive(Debug, Deserialize)]
pub struct SaveTokenRequest {
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MetaOverview {
    pub settings: Option<MetaApiSettings>,
    pub facebook_page: Option<FacebookPage>,
    pub instagram_account: Option<InstagramAccount>,
    pub instagram_media: Vec<InstagramMedia>,
    pub instagram_stats: InstagramStats,
    pub threads_posts: Vec<ThreadsPost>,
    pub threads_stats: ThreadsStats,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub updated: usize,
}

fn media_limit() -> u32 {
    u32::try_from(MEDIA_LIMIT).unwrap_or(50)
}

async fn access_token(state: &AppState, project_id: i64) -> Result<String, ApiError> {
    MetaApiSettings::find_enabled(state.db(), project_id)
        .await?
        .map(|settings| settings.access_token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::bad_request("Save a Meta access token first"))
}

async fn first_page(state: &AppState, token: &str) -> Result<PageInfo, ApiError> {
    state
        .meta()
        .pages(token)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::bad_request("No Facebook page is connected to this token"))
}

pub async fn overview(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<MetaOverview>>, ApiError> {
    let db = state.db();
    let instagram_account = InstagramAccount::latest(db, project.id).await?;
    let instagram_media = match &instagram_account {
        Some(account) => InstagramMedia::recent(db, account.id, MEDIA_LIMIT).await?,
        None => Vec::new(),
    };
    let followers = instagram_account
        .as_ref()
        .map(|account| account.followers_count)
        .unwrap_or(0);
    let threads_posts = ThreadsPost::recent(db, project.id, MEDIA_LIMIT).await?;
    Ok(ResponseJson(ApiResponse::success(MetaOverview {
        settings: MetaApiSettings::find_by_project(db, project.id).await?,
        facebook_page: FacebookPage::latest(db, project.id).await?,
        instagram_stats: InstagramStats::compute(&instagram_media, followers),
        threads_stats: ThreadsStats::compute(&threads_posts),
        instagram_account,
        instagram_media,
        threads_posts,
    })))
}

/// With app credentials configured, a short-lived token is exchanged for a
/// long-lived one before it is stored.
pub async fn save_token(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<SaveTokenRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let mut token = non_empty(payload.access_token.as_deref())
        .ok_or_else(|| ApiError::bad_request("Access token is required"))?;
    if let Some(app) = &state.config().meta_app {
        match state.meta().long_lived_token(&token, app).await {
            Ok(long_lived) => token = long_lived.access_token,
            Err(e) => {
                tracing::warn!(project_id = project.id, error = %e, "keeping short-lived meta token");
            }
        }
    }
    MetaApiSettings::upsert(state.db(), project.id, &token).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn inspect_token(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TokenInfo>>, ApiError> {
    let app = state
        .config()
        .meta_app
        .clone()
        .ok_or_else(|| ApiError::bad_request("META_APP_ID and META_APP_SECRET are not configured"))?;
    let token = access_token(&state, project.id).await?;
    let info = state.meta().debug_token(&token, &app).await?;
    Ok(ResponseJson(ApiResponse::success(info)))
}

pub async fn refresh_facebook(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<RefreshResponse>>, ApiError> {
    let token = access_token(&state, project.id).await?;
    let pages = state.meta().pages(&token).await?;
    for page in &pages {
        FacebookPage::upsert(
            state.db(),
            project.id,
            &SaveFacebookPage {
                page_id: &page.id,
                page_name: &page.name,
                page_access_token: page.access_token.as_deref(),
                category: page.category.as_deref(),
                followers_count: page.followers_count,
            },
        )
        .await?;
    }
    Ok(ResponseJson(ApiResponse::success(RefreshResponse {
        updated: pages.len(),
    })))
}

pub async fn facebook_insights(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Value>>>, ApiError> {
    let page = FacebookPage::latest(state.db(), project.id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Refresh the Facebook page first"))?;
    let page_token = match page.page_access_token {
        Some(token) => token,
        None => access_token(&state, project.id).await?,
    };
    let insights = state
        .meta()
        .page_insights(&page.page_id, &page_token, Utc::now())
        .await?;
    Ok(ResponseJson(ApiResponse::success(insights)))
}

/// The Instagram Business account hangs off the first connected page.
pub async fn refresh_instagram(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<RefreshResponse>>, ApiError> {
    let token = access_token(&state, project.id).await?;
    let page = first_page(&state, &token).await?;
    let page_token = page.access_token.clone().unwrap_or_else(|| token.clone());
    let info = state.meta().instagram_account(&page_token, &page.id).await?;
    let account_id = InstagramAccount::upsert(
        state.db(),
        project.id,
        &SaveInstagramAccount {
            instagram_account_id: &info.id,
            username: info.username.as_deref(),
            followers_count: info.followers_count,
            follows_count: info.follows_count,
            media_count: info.media_count,
            profile_picture_url: info.profile_picture_url.as_deref(),
        },
    )
    .await?;

    let media = state
        .meta()
        .instagram_media(&info.id, &page_token, media_limit())
        .await?;
    let rows: Vec<SaveInstagramMedia<'_>> = media
        .iter()
        .map(|m| SaveInstagramMedia {
            media_id: &m.id,
            media_type: m.media_type.as_deref(),
            media_url: m.media_url.as_deref(),
            permalink: m.permalink.as_deref(),
            caption: m.caption.as_deref(),
            like_count: m.like_count,
            comments_count: m.comments_count,
            timestamp: m.timestamp.as_deref(),
        })
        .collect();
    InstagramMedia::upsert_many(state.db(), account_id, &rows).await?;
    tracing::info!(project_id = project.id, media = rows.len(), "refreshed instagram");
    Ok(ResponseJson(ApiResponse::success(RefreshResponse {
        updated: rows.len(),
    })))
}

pub async fn refresh_threads(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<RefreshResponse>>, ApiError> {
    let token = access_token(&state, project.id).await?;
    let posts = state
        .meta()
        .threads_posts(&token, THREADS_USER, media_limit())
        .await?;
    let rows: Vec<SaveThreadsPost<'_>> = posts
        .iter()
        .map(|p| SaveThreadsPost {
            thread_id: &p.id,
            text: p.text.as_deref(),
            permalink: p.permalink.as_deref(),
            timestamp: p.timestamp.as_deref(),
            like_count: p.like_count,
            reply_count: p.reply_count,
            quote_count: p.quote_count,
            repost_count: p.repost_count,
            views: p.views,
        })
        .collect();
    ThreadsPost::upsert_many(state.db(), project.id, &rows).await?;
    Ok(ResponseJson(ApiResponse::success(RefreshResponse {
        updated: rows.len(),
    })))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let meta = Router::new()
        .route("/", get(overview))
        .route("/settings", put(save_token))
        .route("/token", get(inspect_token))
        .route("/facebook/refresh", post(refresh_facebook))
        .route("/facebook/insights", get(facebook_insights))
        .route("/instagram/refresh", post(refresh_instagram))
        .route("/threads/refresh", post(refresh_threads))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new().nest("/projects/{project_id}/meta", meta)
}
