//! Cross-platform pages of a project: the SNS summary, analytics series and
//! the merged post feed. Twitter actions on the posts page reuse the Twitter
//! post operations.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::{
    meta::{FacebookPage, InstagramAccount, MEDIA_LIMIT, ThreadsPost, ThreadsStats},
    overview::{FEED_LIMIT, FeedItem, PlatformSeries, ProjectScheduledPost, SERIES_DAYS},
    project::Project,
    twitter::{TwitterAccount, TwitterStat},
    youtube::{YoutubeChannel, YoutubeStat},
};
use serde::Serialize;
use utils::response::ApiResponse;

use super::{
    Created,
    twitter::{PostRequest, ScheduleRequest, publish_now, remove_scheduled, schedule},
};
use crate::{
    AppState, auth::CurrentUser, error::ApiError, middleware::load_project_middleware,
};

#[derive(Debug, Serialize)]
pub struct TwitterSummary {
    pub account: TwitterAccount,
    pub latest_stat: Option<TwitterStat>,
}

#[derive(Debug, Serialize)]
pub struct YoutubeSummary {
    pub channel: YoutubeChannel,
    pub latest_stat: Option<YoutubeStat>,
}

#[derive(Debug, Serialize)]
pub struct SnsOverview {
    pub twitter: Option<TwitterSummary>,
    pub youtube: Vec<YoutubeSummary>,
    pub instagram: Option<InstagramAccount>,
    pub facebook: Option<FacebookPage>,
    pub threads: ThreadsStats,
}

#[derive(Debug, Serialize)]
pub struct PostsPage {
    pub feed: Vec<FeedItem>,
    pub scheduled: Vec<ProjectScheduledPost>,
}

pub async fn sns(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<SnsOverview>>, ApiError> {
    let db = state.db();
    let twitter = match TwitterAccount::latest(db, project.id).await? {
        Some(account) => Some(TwitterSummary {
            latest_stat: TwitterStat::latest(db, account.id).await?,
            account,
        }),
        None => None,
    };
    let mut youtube = Vec::new();
    for channel in YoutubeChannel::find_by_project(db, project.id).await? {
        youtube.push(YoutubeSummary {
            latest_stat: YoutubeStat::latest(db, channel.id).await?,
            channel,
        });
    }
    let threads = ThreadsPost::recent(db, project.id, MEDIA_LIMIT).await?;
    Ok(ResponseJson(ApiResponse::success(SnsOverview {
        twitter,
        youtube,
        instagram: InstagramAccount::latest(db, project.id).await?,
        facebook: FacebookPage::latest(db, project.id).await?,
        threads: ThreadsStats::compute(&threads),
    })))
}

pub async fn analytics(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<PlatformSeries>>, ApiError> {
    let series = PlatformSeries::for_project(state.db(), project.id, SERIES_DAYS).await?;
    Ok(ResponseJson(ApiResponse::success(series)))
}

pub async fn posts(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<PostsPage>>, ApiError> {
    let db = state.db();
    Ok(ResponseJson(ApiResponse::success(PostsPage {
        feed: FeedItem::recent_for_project(db, project.id, FEED_LIMIT).await?,
        scheduled: ProjectScheduledPost::queue_for_project(db, project.id, FEED_LIMIT).await?,
    })))
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

pub fn router(state: &AppState) -> Router<AppState> {
    let sns = Router::new()
        .route("/", get(sns))
        .route("/analytics", get(analytics))
        .route("/posts", get(posts).post(post_now))
        .route("/posts/scheduled", post(schedule_post))
        .route("/posts/scheduled/{post_id}", delete(delete_scheduled))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new().nest("/projects/{project_id}/sns", sns)
}
