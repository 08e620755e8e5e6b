use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    board::{Board, MAX_BOARD_DOCUMENTS},
    document::{CreateDocument, Document, DocumentScope, MAX_BOARD_CHILDREN, SaveDocument},
    ownership::Resource,
};
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;

use super::{Created, required};
use crate::{AppState, auth::CurrentUser, error::ApiError, middleware::load_board_middleware};

pub(crate) const ONLY_SUB_PAGES: &str = "Only sub-pages can be created";
pub(crate) const ROOT_NOT_DELETABLE: &str = "The root page cannot be deleted";

#[derive(Debug, Deserialize)]
pub struct DocumentTitleRequest {
    pub title: Option<String>,
}

/// The editor screen: the page being edited plus the board's whole tree.
#[derive(Debug, Serialize)]
pub struct BoardDocumentTree {
    pub board_title: String,
    pub current: Document,
    pub documents: Vec<Document>,
}

async fn board_page(db: &db::Db, board: &Board, id: i64) -> Result<Document, ApiError> {
    Document::find_in_scope(db, DocumentScope::Board(board.id), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))
}

pub async fn create_root(
    user: CurrentUser,
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Json(payload): Json<DocumentTitleRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let title = required(payload.title.as_deref(), "Document title is required")?;
    let existing = Document::count_roots(state.db(), DocumentScope::Board(board.id)).await?;
    if existing >= MAX_BOARD_DOCUMENTS {
        return Err(ApiError::bad_request(format!(
            "A board can have at most {MAX_BOARD_DOCUMENTS} documents"
        )));
    }
    let id = Document::create_board_root(state.db(), board.id, user.id, &title).await?;
    tracing::info!(board_id = board.id, document_id = id, "created board document");
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn get_tree(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Path((_, document_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<BoardDocumentTree>>, ApiError> {
    let current = board_page(state.db(), &board, document_id).await?;
    let documents = Document::tree(state.db(), DocumentScope::Board(board.id)).await?;
    Ok(ResponseJson(ApiResponse::success(BoardDocumentTree {
        board_title: board.title,
        current,
        documents,
    })))
}

pub async fn rename_document(
    user: CurrentUser,
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Path((_, document_id)): Path<(i64, i64)>,
    Json(payload): Json<DocumentTitleRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::BoardDocument(document_id))
        .await?;
    board_page(state.db(), &board, document_id).await?;
    let title = required(payload.title.as_deref(), "Document title is required")?;
    Document::rename(state.db(), document_id, &title).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Removes a root board document together with its sub-pages.
pub async fn delete_document(
    user: CurrentUser,
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Path((_, document_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::BoardDocument(document_id))
        .await?;
    board_page(state.db(), &board, document_id).await?;
    Document::delete(state.db(), document_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_page(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Json(payload): Json<CreateDocument>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let Some(parent_id) = payload.parent_id else {
        return Err(ApiError::bad_request(ONLY_SUB_PAGES));
    };
    let parent = board_page(state.db(), &board, parent_id).await?;
    if parent.is_root() && Document::count_children(state.db(), parent.id).await? >= MAX_BOARD_CHILDREN
    {
        return Err(ApiError::bad_request(format!(
            "A page can have at most {MAX_BOARD_CHILDREN} sub-pages"
        )));
    }

    let id = Document::create_child(
        state.db(),
        DocumentScope::Board(board.id),
        parent.id,
        &payload.title,
        &payload.content,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn save_page(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Path((_, _, page_id)): Path<(i64, i64, i64)>,
    Json(payload): Json<SaveDocument>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if !Document::save(state.db(), DocumentScope::Board(board.id), page_id, &payload).await? {
        return Err(ApiError::not_found("Document not found"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_page(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Path((_, _, page_id)): Path<(i64, i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let page = board_page(state.db(), &board, page_id).await?;
    if page.is_root() {
        return Err(ApiError::bad_request(ROOT_NOT_DELETABLE));
    }
    Document::delete(state.db(), page.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let documents = Router::new()
        .route("/", post(create_root))
        .route(
            "/{document_id}",
            get(get_tree).put(rename_document).delete(delete_document),
        )
        .route("/{document_id}/pages", post(create_page))
        .route(
            "/{document_id}/pages/{page_id}",
            put(save_page).delete(delete_page),
        )
        .layer(from_fn_with_state(state.clone(), load_board_middleware));

    Router::new().nest("/boards/{board_id}/documents", documents)
}
