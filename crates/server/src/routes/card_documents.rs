use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::{
    Db,
    models::{
        board::Card,
        document::{CreateDocument, Document, DocumentScope, SaveDocument},
        ownership::Resource,
    },
};
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;

use super::{
    Created,
    board_documents::{ONLY_SUB_PAGES, ROOT_NOT_DELETABLE},
};
use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Serialize)]
pub struct CardDocuments {
    pub card: Card,
    pub documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
pub struct SaveContentRequest {
    #[serde(default)]
    pub content: String,
}

async fn owned_card(user: &CurrentUser, db: &Db, card_id: i64) -> Result<Card, ApiError> {
    user.ensure_owns(db, Resource::Card(card_id)).await?;
    Card::find_by_id(db, card_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Card not found"))
}

/// The tree is created lazily: opening a card's documents makes its root page.
pub async fn list_documents(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<CardDocuments>>, ApiError> {
    let card = owned_card(&user, state.db(), card_id).await?;
    Document::ensure_card_root(state.db(), card.id, &card.title).await?;
    let documents = Document::tree(state.db(), DocumentScope::Card(card.id)).await?;
    Ok(ResponseJson(ApiResponse::success(CardDocuments {
        card,
        documents,
    })))
}

pub async fn create_document(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
    Json(payload): Json<CreateDocument>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let card = owned_card(&user, state.db(), card_id).await?;
    let Some(parent_id) = payload.parent_id else {
        return Err(ApiError::bad_request(ONLY_SUB_PAGES));
    };
    let scope = DocumentScope::Card(card.id);
    if Document::find_in_scope(state.db(), scope, parent_id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Parent page not found"));
    }
    let id = Document::create_child(
        state.db(),
        scope,
        parent_id,
        &payload.title,
        &payload.content,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn save_document(
    user: CurrentUser,
    State(state): State<AppState>,
    Path((card_id, document_id)): Path<(i64, i64)>,
    Json(payload): Json<SaveDocument>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::CardDocument(document_id))
        .await?;
    if !Document::save(state.db(), DocumentScope::Card(card_id), document_id, &payload).await? {
        return Err(ApiError::not_found("Document not found"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_document(
    user: CurrentUser,
    State(state): State<AppState>,
    Path((card_id, document_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::CardDocument(document_id))
        .await?;
    let document = Document::find_in_scope(state.db(), DocumentScope::Card(card_id), document_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;
    if document.is_root() {
        return Err(ApiError::bad_request(ROOT_NOT_DELETABLE));
    }
    Document::delete(state.db(), document.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Single-page editor kept for older clients: the card's root page.
pub async fn get_legacy_document(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Document>>, ApiError> {
    let card = owned_card(&user, state.db(), card_id).await?;
    let root = Document::ensure_card_root(state.db(), card.id, &card.title).await?;
    Ok(ResponseJson(ApiResponse::success(root)))
}

pub async fn save_legacy_document(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
    Json(payload): Json<SaveContentRequest>,
) -> Result<ResponseJson<ApiResponse<Document>>, ApiError> {
    let card = owned_card(&user, state.db(), card_id).await?;
    let root =
        Document::save_card_content(state.db(), card.id, &card.title, &payload.content).await?;
    Ok(ResponseJson(ApiResponse::success(root)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/cards/{card_id}/documents",
            get(list_documents).post(create_document),
        )
        .route(
            "/cards/{card_id}/documents/{document_id}",
            put(save_document).delete(delete_document),
        )
        .route(
            "/document/{card_id}",
            get(get_legacy_document).put(save_legacy_document),
        )
}
