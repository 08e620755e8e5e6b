use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::{
    Db,
    models::{
        goal::{GoalInput, GoalStatus, ProjectGoal},
        ownership::Resource,
        project::Project,
    },
};
use serde::{Deserialize, Serialize};
use utils::{response::ApiResponse, text::non_empty};

use super::{Created, required};
use crate::{
    AppState, auth::CurrentUser, error::ApiError, middleware::load_project_middleware,
};

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub target_value: f64,
    pub unit: Option<String>,
    pub deadline: Option<String>,
}

impl GoalRequest {
    fn into_input(self) -> Result<GoalInput, ApiError> {
        Ok(GoalInput {
            title: required(self.title.as_deref(), "Goal title is required")?,
            description: non_empty(self.description.as_deref()),
            target_value: self.target_value,
            unit: non_empty(self.unit.as_deref()),
            deadline: non_empty(self.deadline.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub current_value: f64,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub status: GoalStatus,
}

async fn project_goal(
    user: &CurrentUser,
    db: &Db,
    project: &Project,
    goal_id: i64,
) -> Result<ProjectGoal, ApiError> {
    user.ensure_owns(db, Resource::ProjectGoal(goal_id)).await?;
    ProjectGoal::find_by_id(db, goal_id)
        .await?
        .filter(|goal| goal.project_id == project.id)
        .ok_or_else(|| ApiError::not_found("Goal not found"))
}

pub async fn list_goals(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectGoal>>>, ApiError> {
    let goals = ProjectGoal::find_by_project(state.db(), project.id).await?;
    Ok(ResponseJson(ApiResponse::success(goals)))
}

pub async fn create_goal(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<GoalRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let input = payload.into_input()?;
    let id = ProjectGoal::create(state.db(), project.id, &input).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn update_goal(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, goal_id)): Path<(i64, i64)>,
    Json(payload): Json<GoalRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let goal = project_goal(&user, state.db(), &project, goal_id).await?;
    let input = payload.into_input()?;
    ProjectGoal::update(state.db(), goal.id, &input).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn update_progress(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, goal_id)): Path<(i64, i64)>,
    Json(payload): Json<ProgressRequest>,
) -> Result<ResponseJson<ApiResponse<ProgressResponse>>, ApiError> {
    let goal = project_goal(&user, state.db(), &project, goal_id).await?;
    let status = ProjectGoal::update_progress(state.db(), &goal, payload.current_value).await?;
    tracing::debug!(goal_id = goal.id, status = status.as_str(), "updated goal progress");
    Ok(ResponseJson(ApiResponse::success(ProgressResponse { status })))
}

pub async fn delete_goal(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, goal_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let goal = project_goal(&user, state.db(), &project, goal_id).await?;
    ProjectGoal::delete(state.db(), goal.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let goals = Router::new()
        .route("/", get(list_goals).post(create_goal))
        .route("/{goal_id}", put(update_goal).delete(delete_goal))
        .route("/{goal_id}/progress", put(update_progress))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new().nest("/projects/{project_id}/goals", goals)
}
