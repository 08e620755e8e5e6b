use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use chrono::Utc;
use db::models::{
    ownership::Resource,
    project::Project,
    youtube::{
        ChannelCounts, SaveChannel, SaveVideo, TOP_VIDEO_LIMIT, VideoCounts, YOUTUBE_HISTORY_DAYS,
        YoutubeChannel, YoutubeSettings, YoutubeStat, YoutubeVideo,
    },
};
use serde::{Deserialize, Serialize};
use services::services::{kpi_period::format_date, youtube::ChannelInfo};
use utils::{response::ApiResponse, text::non_empty};

use super::Created;
use crate::{
    AppState, auth::CurrentUser, error::ApiError, middleware::load_project_middleware,
};

#[derive(Debug, Default, Deserialize)]
pub struct OverviewQuery {
    pub channel: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyRequest {
    pub api_key: Option<String>,
}

/// `channel_input` takes either form: `UC...` is an id, anything else a handle.
#[derive(Debug, Deserialize)]
pub struct AddChannelRequest {
    pub handle: Option<String>,
    pub channel_id: Option<String>,
    pub channel_input: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChannelLookup {
    Handle(String),
    Id(String),
}

impl AddChannelRequest {
    fn lookup(&self) -> Option<ChannelLookup> {
        if let Some(handle) = non_empty(self.handle.as_deref()) {
            return Some(ChannelLookup::Handle(handle));
        }
        if let Some(id) = non_empty(self.channel_id.as_deref()) {
            return Some(ChannelLookup::Id(id));
        }
        let input = non_empty(self.channel_input.as_deref())?;
        if input.starts_with("UC") {
            Some(ChannelLookup::Id(input))
        } else {
            Some(ChannelLookup::Handle(input))
        }
    }
}

/// Difference between the two most recent days of the history.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyChange {
    pub subscribers: i64,
    pub views: i64,
    pub videos: i64,
}

impl DailyChange {
    /// `history` is ordered oldest first.
    fn from_history(history: &[YoutubeStat]) -> Self {
        match history {
            [.., previous, latest] => Self {
                subscribers: latest.subscriber_count - previous.subscriber_count,
                views: latest.view_count - previous.view_count,
                videos: latest.video_count - previous.video_count,
            },
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct YoutubeOverview {
    pub has_api_key: bool,
    pub channels: Vec<YoutubeChannel>,
    pub selected_channel: Option<YoutubeChannel>,
    pub latest_stat: Option<YoutubeStat>,
    pub history: Vec<YoutubeStat>,
    pub change: DailyChange,
    pub top_videos: Vec<YoutubeVideo>,
}

#[derive(Debug, Serialize)]
pub struct ChannelSummary {
    pub channel: YoutubeChannel,
    pub latest_stat: Option<YoutubeStat>,
}

/// Channels kept on the user's own key, outside any project.
#[derive(Debug, Serialize)]
pub struct UserYoutubeOverview {
    pub has_api_key: bool,
    pub channels: Vec<ChannelSummary>,
}

#[derive(Debug, Serialize)]
pub struct FetchVideosResponse {
    pub fetched: usize,
}

fn today() -> String {
    format_date(Utc::now().date_naive())
}

fn counts(info: &ChannelInfo) -> ChannelCounts {
    ChannelCounts {
        subscriber_count: info.subscriber_count,
        view_count: info.view_count,
        video_count: info.video_count,
    }
}

async fn api_key(
    state: &AppState,
    user: &CurrentUser,
    project_id: Option<i64>,
) -> Result<String, ApiError> {
    YoutubeSettings::resolve(state.db(), user.id, project_id)
        .await?
        .map(|settings| settings.api_key)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ApiError::bad_request("Save a YouTube API key first"))
}

async fn project_channel(
    state: &AppState,
    user: &CurrentUser,
    project_id: i64,
    channel_id: i64,
) -> Result<YoutubeChannel, ApiError> {
    user.ensure_owns(state.db(), Resource::YoutubeChannel(channel_id))
        .await?;
    YoutubeChannel::find_in_project(state.db(), project_id, channel_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel not found"))
}

async fn user_channel(
    state: &AppState,
    user: &CurrentUser,
    channel_id: i64,
) -> Result<YoutubeChannel, ApiError> {
    user.ensure_owns(state.db(), Resource::YoutubeChannel(channel_id))
        .await?;
    YoutubeChannel::find_unassigned_by_id(state.db(), user.id, channel_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel not found"))
}

/// Resolves the request against YouTube. Returns the channel and the handle to store.
async fn lookup_channel(
    state: &AppState,
    key: &str,
    payload: &AddChannelRequest,
) -> Result<(ChannelInfo, Option<String>), ApiError> {
    let lookup = payload
        .lookup()
        .ok_or_else(|| ApiError::bad_request("A channel handle or id is required"))?;
    let info = match &lookup {
        ChannelLookup::Handle(handle) => state.youtube().channel_by_handle(key, handle).await?,
        ChannelLookup::Id(id) => state.youtube().channel_by_id(key, id).await?,
    }
    .ok_or_else(|| ApiError::not_found("Channel not found"))?;

    let handle = info.custom_url.clone().or_else(|| match lookup {
        ChannelLookup::Handle(handle) => Some(format!("@{}", handle.trim_start_matches('@'))),
        ChannelLookup::Id(_) => None,
    });
    Ok((info, handle))
}

/// Upsert the channel under `project_id` and store today's counts.
async fn store_channel(
    state: &AppState,
    user: &CurrentUser,
    project_id: Option<i64>,
    info: &ChannelInfo,
    handle: Option<&str>,
    track_changes: bool,
) -> Result<i64, ApiError> {
    let id = YoutubeChannel::upsert(
        state.db(),
        user.id,
        project_id,
        &SaveChannel {
            channel_id: &info.id,
            channel_handle: handle,
            channel_name: &info.title,
            thumbnail_url: info.thumbnail_url.as_deref(),
        },
    )
    .await?;
    YoutubeStat::record(state.db(), id, &today(), counts(info), track_changes).await?;
    Ok(id)
}

/// Without `?channel=`, the first channel of the project is shown.
pub async fn overview(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> Result<ResponseJson<ApiResponse<YoutubeOverview>>, ApiError> {
    let db = state.db();
    let has_api_key = YoutubeSettings::resolve(db, user.id, Some(project.id))
        .await?
        .is_some_and(|settings| !settings.api_key.is_empty());
    let channels = YoutubeChannel::find_by_project(db, project.id).await?;
    let selected_channel = match query.channel {
        Some(id) => channels.iter().find(|c| c.id == id).cloned(),
        None => channels.first().cloned(),
    };

    let (latest_stat, history, top_videos) = match &selected_channel {
        Some(channel) => (
            YoutubeStat::latest(db, channel.id).await?,
            YoutubeStat::history(db, channel.id, YOUTUBE_HISTORY_DAYS).await?,
            YoutubeVideo::top_by_views(db, channel.id, TOP_VIDEO_LIMIT).await?,
        ),
        None => (None, Vec::new(), Vec::new()),
    };
    Ok(ResponseJson(ApiResponse::success(YoutubeOverview {
        has_api_key,
        change: DailyChange::from_history(&history),
        channels,
        selected_channel,
        latest_stat,
        history,
        top_videos,
    })))
}

pub async fn save_api_key(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<ApiKeyRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let key = non_empty(payload.api_key.as_deref())
        .ok_or_else(|| ApiError::bad_request("API key is required"))?;
    YoutubeSettings::save(state.db(), user.id, Some(project.id), &key).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Checks the key in the request, or the saved one.
pub async fn test_connection(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<ApiKeyRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let key = match non_empty(payload.api_key.as_deref()) {
        Some(key) => key,
        None => api_key(&state, &user, Some(project.id)).await?,
    };
    state.youtube().test_connection(&key).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Look the channel up by `@handle` or id, store it with its first stats row.
pub async fn add_channel(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<AddChannelRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let key = api_key(&state, &user, Some(project.id)).await?;
    let (info, handle) = lookup_channel(&state, &key, &payload).await?;
    let id = store_channel(&state, &user, Some(project.id), &info, handle.as_deref(), false).await?;
    tracing::info!(project_id = project.id, channel = %info.id, "added youtube channel");
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn delete_channel(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, channel_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let channel = project_channel(&state, &user, project.id, channel_id).await?;
    YoutubeChannel::delete(state.db(), channel.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn refresh_stats(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, channel_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<ChannelCounts>>, ApiError> {
    let channel = project_channel(&state, &user, project.id, channel_id).await?;
    let key = api_key(&state, &user, Some(project.id)).await?;
    let info = state
        .youtube()
        .channel_by_id(&key, &channel.channel_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel no longer exists on YouTube"))?;
    let counts = counts(&info);
    YoutubeStat::record(state.db(), channel.id, &today(), counts, true).await?;
    YoutubeChannel::touch(state.db(), channel.id).await?;
    Ok(ResponseJson(ApiResponse::success(counts)))
}

pub async fn fetch_videos(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, channel_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<FetchVideosResponse>>, ApiError> {
    let channel = project_channel(&state, &user, project.id, channel_id).await?;
    let key = api_key(&state, &user, Some(project.id)).await?;
    let ids = state
        .youtube()
        .search_recent_videos(&key, &channel.channel_id)
        .await?;
    let videos = state.youtube().videos(&key, &ids).await?;

    let date = today();
    for video in &videos {
        YoutubeVideo::record(
            state.db(),
            channel.id,
            &SaveVideo {
                video_id: &video.video_id,
                title: &video.title,
                description: video.description.as_deref(),
                thumbnail_url: video.thumbnail_url.as_deref(),
                published_at: video.published_at.as_deref(),
                duration: video.duration.as_deref(),
            },
            VideoCounts {
                view_count: video.view_count,
                like_count: video.like_count,
                comment_count: video.comment_count,
            },
            &date,
        )
        .await?;
    }
    tracing::info!(channel_id = channel.id, fetched = videos.len(), "fetched youtube videos");
    Ok(ResponseJson(ApiResponse::success(FetchVideosResponse {
        fetched: videos.len(),
    })))
}

pub async fn user_overview(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<UserYoutubeOverview>>, ApiError> {
    let db = state.db();
    let has_api_key = YoutubeSettings::resolve(db, user.id, None)
        .await?
        .is_some_and(|settings| !settings.api_key.is_empty());
    let mut channels = Vec::new();
    for channel in YoutubeChannel::find_unassigned(db, user.id).await? {
        let latest_stat = YoutubeStat::latest(db, channel.id).await?;
        channels.push(ChannelSummary {
            channel,
            latest_stat,
        });
    }
    Ok(ResponseJson(ApiResponse::success(UserYoutubeOverview {
        has_api_key,
        channels,
    })))
}

/// The key is verified against YouTube before it is stored.
pub async fn save_user_api_key(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ApiKeyRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let key = non_empty(payload.api_key.as_deref())
        .ok_or_else(|| ApiError::bad_request("API key is required"))?;
    if let Err(e) = state.youtube().test_connection(&key).await {
        return Err(ApiError::bad_request(format!("Invalid API key: {e}")));
    }
    YoutubeSettings::save(state.db(), user.id, None, &key).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Unlike the project pages, a channel already registered by the user is refused.
pub async fn add_user_channel(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AddChannelRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let key = api_key(&state, &user, None).await?;
    let (info, handle) = lookup_channel(&state, &key, &payload).await?;
    if YoutubeChannel::find_by_channel_id(state.db(), user.id, &info.id)
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("This channel is already registered"));
    }
    let id = store_channel(&state, &user, None, &info, handle.as_deref(), false).await?;
    tracing::info!(user_id = user.id, channel = %info.id, "added youtube channel");
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

/// Also refreshes the stored name, handle and thumbnail.
pub async fn refresh_user_channel(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<ChannelCounts>>, ApiError> {
    let channel = user_channel(&state, &user, channel_id).await?;
    let key = api_key(&state, &user, None).await?;
    let info = state
        .youtube()
        .channel_by_id(&key, &channel.channel_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel no longer exists on YouTube"))?;
    store_channel(&state, &user, None, &info, info.custom_url.as_deref(), true).await?;
    Ok(ResponseJson(ApiResponse::success(counts(&info))))
}

pub async fn delete_user_channel(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let channel = user_channel(&state, &user, channel_id).await?;
    YoutubeChannel::delete(state.db(), channel.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Settings page for the key and channels that belong to no project.
pub fn user_router() -> Router<AppState> {
    Router::new()
        .route("/youtube", get(user_overview))
        .route("/youtube/settings", put(save_user_api_key))
        .route("/youtube/channels", post(add_user_channel))
        .route("/youtube/channels/{channel_id}", delete(delete_user_channel))
        .route("/youtube/channels/{channel_id}/refresh", post(refresh_user_channel))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let youtube = Router::new()
        .route("/", get(overview))
        .route("/settings", put(save_api_key))
        .route("/test", post(test_connection))
        .route("/channels", post(add_channel))
        .route("/channels/{channel_id}", delete(delete_channel))
        .route("/channels/{channel_id}/refresh", post(refresh_stats))
        .route("/channels/{channel_id}/videos", post(fetch_videos))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new().nest("/projects/{project_id}/youtube", youtube)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(day: &str, subscribers: i64, views: i64, videos: i64) -> YoutubeStat {
        YoutubeStat {
            id: 0,
            channel_id: 1,
            subscriber_count: subscribers,
            view_count: views,
            video_count: videos,
            subscriber_change: 0,
            view_change: 0,
            recorded_date: day.to_string(),
        }
    }

    fn request(handle: Option<&str>, id: Option<&str>, input: Option<&str>) -> AddChannelRequest {
        AddChannelRequest {
            handle: handle.map(str::to_string),
            channel_id: id.map(str::to_string),
            channel_input: input.map(str::to_string),
        }
    }

    #[test]
    fn channel_input_is_an_id_only_with_the_uc_prefix() {
        assert_eq!(
            request(None, None, Some("UC123")).lookup(),
            Some(ChannelLookup::Id("UC123".to_string()))
        );
        assert_eq!(
            request(None, None, Some("@rust")).lookup(),
            Some(ChannelLookup::Handle("@rust".to_string()))
        );
        assert_eq!(
            request(None, None, Some("rustlang")).lookup(),
            Some(ChannelLookup::Handle("rustlang".to_string()))
        );
        assert_eq!(
            request(Some("@first"), Some("UC1"), Some("UC2")).lookup(),
            Some(ChannelLookup::Handle("@first".to_string()))
        );
        assert_eq!(request(None, Some(" "), None).lookup(), None);
    }

    #[test]
    fn change_compares_the_last_two_days() {
        let history = vec![
            stat("2025-01-01", 100, 1_000, 10),
            stat("2025-01-02", 110, 1_500, 11),
            stat("2025-01-03", 105, 1_800, 11),
        ];
        assert_eq!(
            DailyChange::from_history(&history),
            DailyChange {
                subscribers: -5,
                views: 300,
                videos: 0
            }
        );
        assert_eq!(DailyChange::from_history(&history[..1]), DailyChange::default());
    }
}
