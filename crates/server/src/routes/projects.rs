use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use chrono::Local;
use db::models::{
    board::Board,
    ownership::Resource,
    project::{
        CreateProject, Project, ProjectBoardStats, ProjectDocumentStats, ProjectLayout,
        ProjectSummary, ProjectTag, UpdateProject,
    },
    project_board::ProjectBoard,
    project_document::ProjectDocument,
};
use serde::{Deserialize, Serialize};
use utils::{response::ApiResponse, text::non_empty};

use super::{Created, kpi::KpiGoalView, required};
use crate::{
    AppState, auth::CurrentUser, error::ApiError, middleware::load_project_middleware,
};

const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub status: Option<String>,
    pub tag_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Everything the project home page shows.
#[derive(Debug, Serialize)]
pub struct ProjectOverview {
    pub project: Project,
    pub tags: Vec<ProjectTag>,
    pub linked_boards: Vec<Board>,
    pub kpi_goals: Vec<KpiGoalView>,
    pub documents: Vec<ProjectDocument>,
    pub project_boards: Vec<ProjectBoard>,
    pub board_stats: ProjectBoardStats,
    pub document_stats: ProjectDocumentStats,
}

pub async fn list_projects(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectSummary>>>, ApiError> {
    let projects = Project::find_summaries(state.db(), user.id).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn create_project(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProjectRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let title = required(payload.title.as_deref(), "Project title is required")?;
    let id = Project::create(
        state.db(),
        user.id,
        &CreateProject {
            title,
            description: non_empty(payload.description.as_deref()),
            color: non_empty(payload.color.as_deref()),
        },
    )
    .await?;
    tracing::info!(user_id = user.id, project_id = id, "created project");
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn get_project(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<ProjectOverview>>, ApiError> {
    let db = state.db();
    let overview = ProjectOverview {
        tags: Project::tags(db, project.id).await?,
        linked_boards: Board::find_by_project(db, project.id).await?,
        kpi_goals: super::kpi::goal_views(db, project.id, Local::now().date_naive()).await?,
        documents: ProjectDocument::recent(db, project.id, RECENT_LIMIT).await?,
        project_boards: ProjectBoard::recent(db, project.id, RECENT_LIMIT).await?,
        board_stats: Project::board_stats(db, project.id).await?,
        document_stats: Project::document_stats(db, project.id).await?,
        project,
    };
    Ok(ResponseJson(ApiResponse::success(overview)))
}

pub async fn get_layout(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<ProjectLayout>>, ApiError> {
    let layout = Project::layout(state.db(), project).await?;
    Ok(ResponseJson(ApiResponse::success(layout)))
}

pub async fn update_project(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<ProjectRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let title = required(payload.title.as_deref(), "Project title is required")?;
    Project::update(
        state.db(),
        project.id,
        &UpdateProject {
            title,
            description: non_empty(payload.description.as_deref()),
            color: non_empty(payload.color.as_deref()),
            status: non_empty(payload.status.as_deref()),
            tag_ids: payload.tag_ids,
        },
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_project(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    Project::delete(state.db(), project.id).await?;
    tracing::info!(project_id = project.id, "deleted project");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn link_board(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, board_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Board(board_id)).await?;
    Board::set_project(state.db(), board_id, Some(project.id)).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn unlink_board(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, board_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Board(board_id)).await?;
    let board = Board::find_by_id(state.db(), board_id)
        .await?
        .filter(|board| board.project_id == Some(project.id))
        .ok_or_else(|| ApiError::not_found("Board is not linked to this project"))?;
    Board::set_project(state.db(), board.id, None).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn list_tags(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectTag>>>, ApiError> {
    let tags = ProjectTag::find_for_user(state.db(), user.id).await?;
    Ok(ResponseJson(ApiResponse::success(tags)))
}

pub async fn create_tag(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<TagRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let name = required(payload.name.as_deref(), "Tag name is required")?;
    let color = non_empty(payload.color.as_deref());
    let id = ProjectTag::create(state.db(), user.id, &name, color.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn update_tag(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(tag_id): Path<i64>,
    Json(payload): Json<TagRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let name = required(payload.name.as_deref(), "Tag name is required")?;
    let color = non_empty(payload.color.as_deref());
    if ProjectTag::update(state.db(), user.id, tag_id, &name, color.as_deref()).await? == 0 {
        return Err(ApiError::not_found("Tag not found"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_tag(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(tag_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if ProjectTag::delete(state.db(), user.id, tag_id).await? == 0 {
        return Err(ApiError::not_found("Tag not found"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let project = Router::new()
        .route(
            "/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/layout", get(get_layout))
        .route(
            "/linked-boards/{board_id}",
            post(link_board).delete(unlink_board),
        )
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .nest("/projects/{project_id}", project)
        .route("/project-tags", get(list_tags).post(create_tag))
        .route("/project-tags/{tag_id}", put(update_tag).delete(delete_tag))
}
