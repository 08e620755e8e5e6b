use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{ownership::Resource, standalone_document::StandaloneDocument};
use serde::Deserialize;
use utils::response::ApiResponse;

use super::{Created, required};
use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct DocumentInput {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub async fn list_documents(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<StandaloneDocument>>>, ApiError> {
    let documents = StandaloneDocument::find_for_user(state.db(), user.id).await?;
    Ok(ResponseJson(ApiResponse::success(documents)))
}

pub async fn create_document(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<DocumentInput>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let title = required(payload.title.as_deref(), "Document title is required")?;
    let id = StandaloneDocument::create(state.db(), user.id, &title).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn get_document(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(document_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<StandaloneDocument>>, ApiError> {
    user.ensure_owns(state.db(), Resource::StandaloneDocument(document_id))
        .await?;
    let document = StandaloneDocument::find(state.db(), user.id, document_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;
    Ok(ResponseJson(ApiResponse::success(document)))
}

pub async fn save_document(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(document_id): Path<i64>,
    Json(payload): Json<DocumentInput>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::StandaloneDocument(document_id))
        .await?;
    let title = required(payload.title.as_deref(), "Document title is required")?;
    StandaloneDocument::save(
        state.db(),
        user.id,
        document_id,
        &title,
        payload.content.as_deref(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_document(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(document_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::StandaloneDocument(document_id))
        .await?;
    StandaloneDocument::delete(state.db(), user.id, document_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route(
            "/documents/{document_id}",
            get(get_document).put(save_document).delete(delete_document),
        )
}
