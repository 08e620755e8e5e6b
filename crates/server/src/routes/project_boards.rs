use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use db::models::{
    ownership::Resource,
    project::Project,
    project_board::{ProjectBoard, ProjectBoardsView, ProjectCard, ProjectList, UpdateProjectCard},
};
use serde::Deserialize;
use utils::{response::ApiResponse, text::non_empty};

use super::{Created, required};
use crate::{
    AppState, auth::CurrentUser, error::ApiError, middleware::load_project_middleware,
};

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BoardsQuery {
    pub board: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
}

/// Without `?board=`, the first board is selected.
pub async fn list_boards(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Query(query): Query<BoardsQuery>,
) -> Result<ResponseJson<ApiResponse<ProjectBoardsView>>, ApiError> {
    let selected = match query.board {
        Some(id) => Some(id),
        None => ProjectBoard::find_by_project(state.db(), project.id)
            .await?
            .first()
            .map(|board| board.id),
    };
    let view = ProjectBoard::view(state.db(), project.id, selected).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

pub async fn create_board(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<TitleRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let title = required(payload.title.as_deref(), "Board title is required")?;
    let id = ProjectBoard::create(state.db(), project.id, &title).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn delete_board(
    user: CurrentUser,
    State(state): State<AppState>,
    Path((_, board_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::ProjectBoard(board_id))
        .await?;
    ProjectBoard::delete(state.db(), board_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_list(
    user: CurrentUser,
    State(state): State<AppState>,
    Path((_, board_id)): Path<(i64, i64)>,
    Json(payload): Json<TitleRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    user.ensure_owns(state.db(), Resource::ProjectBoard(board_id))
        .await?;
    let title = required(payload.title.as_deref(), "List title is required")?;
    let id = ProjectList::create(state.db(), board_id, &title).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn delete_list(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::ProjectList(list_id))
        .await?;
    ProjectList::delete(state.db(), list_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_card(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    Json(payload): Json<TitleRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    user.ensure_owns(state.db(), Resource::ProjectList(list_id))
        .await?;
    let title = required(payload.title.as_deref(), "Card title is required")?;
    let id = ProjectCard::create(state.db(), list_id, &title).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn update_card(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
    Json(payload): Json<UpdateCardRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::ProjectCard(card_id))
        .await?;
    let data = UpdateProjectCard {
        title: required(payload.title.as_deref(), "Card title is required")?,
        description: non_empty(payload.description.as_deref()),
        due_date: non_empty(payload.due_date.as_deref()),
    };
    ProjectCard::update(state.db(), card_id, &data).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_card(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::ProjectCard(card_id))
        .await?;
    ProjectCard::delete(state.db(), card_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let boards = Router::new()
        .route("/", get(list_boards).post(create_board))
        .route("/{board_id}", delete(delete_board))
        .route("/{board_id}/lists", post(create_list))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new()
        .nest("/projects/{project_id}/project-boards", boards)
        .route("/project-lists/{list_id}", delete(delete_list))
        .route("/project-lists/{list_id}/cards", post(create_card))
        .route(
            "/project-cards/{card_id}",
            put(update_card).delete(delete_card),
        )
}
