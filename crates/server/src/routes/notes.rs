use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    note::{CreateNote, Note, NoteCategory, NotesOverview, UpdateNote},
    ownership::Resource,
};
use serde::Deserialize;
use utils::{response::ApiResponse, text::non_empty};

use super::{Created, required};
use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct NotesQuery {
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Deserialize)]
pub struct ColorRequest {
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: Option<String>,
    pub color: Option<String>,
}

fn changed(rows_affected: u64) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if rows_affected == 0 {
        Err(ApiError::not_found("Note not found"))
    } else {
        Ok(ResponseJson(ApiResponse::success(())))
    }
}

/// Trimmed, de-duplicated, non-empty tags in input order.
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

async fn ensure_category(
    user: &CurrentUser,
    state: &AppState,
    category_id: Option<i64>,
) -> Result<(), ApiError> {
    if let Some(id) = category_id {
        user.ensure_owns(state.db(), Resource::NoteCategory(id))
            .await?;
    }
    Ok(())
}

pub async fn list_notes(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<NotesQuery>,
) -> Result<ResponseJson<ApiResponse<NotesOverview>>, ApiError> {
    let overview = Note::overview(state.db(), user.id, query.archived).await?;
    Ok(ResponseJson(ApiResponse::success(overview)))
}

pub async fn create_note(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(mut payload): Json<CreateNote>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let has_title = non_empty(payload.title.as_deref()).is_some();
    let has_content = non_empty(payload.content.as_deref()).is_some();
    if !has_title && !has_content {
        return Err(ApiError::bad_request("A note needs a title or content"));
    }
    ensure_category(&user, &state, payload.category_id).await?;
    payload.tags = clean_tags(payload.tags);

    let id = Note::create(state.db(), user.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn update_note(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    Json(mut payload): Json<UpdateNote>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Note(note_id)).await?;
    if let Some(category_id) = payload.category_id {
        ensure_category(&user, &state, category_id).await?;
    }
    payload.tags = payload.tags.map(clean_tags);
    changed(Note::update(state.db(), user.id, note_id, &payload).await?)
}

pub async fn delete_note(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Note(note_id)).await?;
    changed(Note::delete(state.db(), user.id, note_id).await?)
}

pub async fn toggle_pin(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Note(note_id)).await?;
    changed(Note::toggle_pinned(state.db(), user.id, note_id).await?)
}

pub async fn toggle_archive(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Note(note_id)).await?;
    changed(Note::toggle_archived(state.db(), user.id, note_id).await?)
}

pub async fn set_color(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    Json(payload): Json<ColorRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Note(note_id)).await?;
    let color = non_empty(payload.color.as_deref());
    changed(Note::set_color(state.db(), user.id, note_id, color.as_deref()).await?)
}

pub async fn set_category(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    Json(payload): Json<CategoryRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Note(note_id)).await?;
    ensure_category(&user, &state, payload.category_id).await?;
    changed(Note::set_category(state.db(), user.id, note_id, payload.category_id).await?)
}

pub async fn set_tags(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    Json(payload): Json<TagsRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Note(note_id)).await?;
    let tags = clean_tags(payload.tags);
    changed(Note::set_tags(state.db(), user.id, note_id, &tags).await?)
}

pub async fn list_categories(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<NoteCategory>>>, ApiError> {
    let categories = NoteCategory::find_for_user(state.db(), user.id).await?;
    Ok(ResponseJson(ApiResponse::success(categories)))
}

pub async fn create_category(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CategoryInput>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let name = required(payload.name.as_deref(), "Category name is required")?;
    let color = non_empty(payload.color.as_deref());
    let id = NoteCategory::create(state.db(), user.id, &name, color.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn update_category(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
    Json(payload): Json<CategoryInput>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::NoteCategory(category_id))
        .await?;
    let name = required(payload.name.as_deref(), "Category name is required")?;
    let color = non_empty(payload.color.as_deref());
    NoteCategory::update(state.db(), user.id, category_id, &name, color.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Notes in the category become uncategorized.
pub async fn delete_category(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::NoteCategory(category_id))
        .await?;
    NoteCategory::delete(state.db(), user.id, category_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/{note_id}", put(update_note).delete(delete_note))
        .route("/notes/{note_id}/pin", post(toggle_pin))
        .route("/notes/{note_id}/archive", post(toggle_archive))
        .route("/notes/{note_id}/color", put(set_color))
        .route("/notes/{note_id}/category", put(set_category))
        .route("/notes/{note_id}/tags", put(set_tags))
        .route(
            "/note-categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/note-categories/{category_id}",
            put(update_category).delete(delete_category),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_unique() {
        let tags = clean_tags(vec![
            " work ".into(),
            "".into(),
            "work".into(),
            "ideas".into(),
            "   ".into(),
        ]);
        assert_eq!(tags, vec!["work".to_string(), "ideas".to_string()]);
    }
}
