use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{ownership::Resource, project::Project, project_document::ProjectDocument};
use serde::Deserialize;
use utils::response::ApiResponse;

use super::{Created, required};
use crate::{
    AppState, auth::CurrentUser, error::ApiError, middleware::load_project_middleware,
};

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: Option<String>,
    pub project_board_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SaveDocumentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub async fn list_documents(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectDocument>>>, ApiError> {
    let documents = ProjectDocument::find_by_project(state.db(), project.id).await?;
    Ok(ResponseJson(ApiResponse::success(documents)))
}

pub async fn create_document(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let title = required(payload.title.as_deref(), "Document title is required")?;
    if let Some(board_id) = payload.project_board_id {
        user.ensure_owns(state.db(), Resource::ProjectBoard(board_id))
            .await?;
    }
    let id =
        ProjectDocument::create(state.db(), project.id, &title, payload.project_board_id).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn get_document(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, document_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<ProjectDocument>>, ApiError> {
    let document = ProjectDocument::find_by_id(state.db(), document_id)
        .await?
        .filter(|document| document.project_id == project.id)
        .ok_or_else(|| ApiError::not_found("Document not found"))?;
    Ok(ResponseJson(ApiResponse::success(document)))
}

pub async fn save_document(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, document_id)): Path<(i64, i64)>,
    Json(payload): Json<SaveDocumentRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let title = required(payload.title.as_deref(), "Document title is required")?;
    let changed = ProjectDocument::save(
        state.db(),
        project.id,
        document_id,
        &title,
        payload.content.as_deref(),
    )
    .await?;
    if changed == 0 {
        return Err(ApiError::not_found("Document not found"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_document(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, document_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if ProjectDocument::delete(state.db(), project.id, document_id).await? == 0 {
        return Err(ApiError::not_found("Document not found"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let documents = Router::new()
        .route("/", get(list_documents).post(create_document))
        .route(
            "/{document_id}",
            get(get_document).put(save_document).delete(delete_document),
        )
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new().nest("/projects/{project_id}/documents", documents)
}
