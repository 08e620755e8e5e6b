use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    board::{Board, BoardList, BoardView, Card, CardPlacement, UpdateCard},
    ownership::Resource,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use utils::response::ApiResponse;

use super::{Created, required};
use crate::{AppState, auth::CurrentUser, error::ApiError, middleware::load_board_middleware};

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: Option<String>,
}

/// Card edit form. `discord_notify` arrives as a checkbox value (`true`, `"1"`, `"on"`).
#[derive(Debug, Deserialize)]
pub struct UpdateCardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub title_color: Option<String>,
    pub description_color: Option<String>,
    pub due_date_color: Option<String>,
    pub title_bg_color: Option<String>,
    pub description_bg_color: Option<String>,
    pub border_color: Option<String>,
    #[serde(default, deserialize_with = "checkbox")]
    pub discord_notify: bool,
}

fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => matches!(s.as_str(), "1" | "true" | "on"),
        _ => false,
    })
}

#[derive(Debug, Deserialize)]
pub struct MoveCardRequest {
    pub list_id: i64,
    #[serde(default)]
    pub position: i64,
}

pub async fn list_boards(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Board>>>, ApiError> {
    let boards = Board::find_by_user(state.db(), user.id).await?;
    Ok(ResponseJson(ApiResponse::success(boards)))
}

pub async fn create_board(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<TitleRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let title = required(payload.title.as_deref(), "Board title is required")?;
    let id = Board::create(state.db(), user.id, &title).await?;
    tracing::info!(user_id = user.id, board_id = id, "created board");
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn get_board(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<BoardView>>, ApiError> {
    let view = Board::view(state.db(), board).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

pub async fn rename_board(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Json(payload): Json<TitleRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let title = required(payload.title.as_deref(), "Board title is required")?;
    Board::rename(state.db(), board.id, &title).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_board(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Board::delete(state.db(), board.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::not_found("Board not found"));
    }
    tracing::info!(board_id = board.id, "deleted board");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_list(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Json(payload): Json<TitleRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let title = required(payload.title.as_deref(), "List title is required")?;
    let id = BoardList::create(state.db(), board.id, &title).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn rename_list(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    Json(payload): Json<TitleRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::List(list_id)).await?;
    let title = required(payload.title.as_deref(), "List title is required")?;
    BoardList::rename(state.db(), list_id, &title).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_list(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::List(list_id)).await?;
    BoardList::delete(state.db(), list_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_card(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    Json(payload): Json<TitleRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    user.ensure_owns(state.db(), Resource::List(list_id)).await?;
    let title = required(payload.title.as_deref(), "Card title is required")?;
    let id = Card::create(state.db(), list_id, &title).await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn get_card(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Card>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Card(card_id)).await?;
    let card = Card::find_by_id(state.db(), card_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Card not found"))?;
    Ok(ResponseJson(ApiResponse::success(card)))
}

pub async fn update_card(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
    Json(payload): Json<UpdateCardRequest>,
) -> Result<ResponseJson<ApiResponse<Card>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Card(card_id)).await?;
    let data = UpdateCard {
        title: required(payload.title.as_deref(), "Card title is required")?,
        description: payload.description,
        due_date: payload.due_date,
        title_color: payload.title_color,
        description_color: payload.description_color,
        due_date_color: payload.due_date_color,
        title_bg_color: payload.title_bg_color,
        description_bg_color: payload.description_bg_color,
        border_color: payload.border_color,
        discord_notify: payload.discord_notify,
    };
    Card::update(state.db(), card_id, &data).await?;
    let card = Card::find_by_id(state.db(), card_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Card not found"))?;
    Ok(ResponseJson(ApiResponse::success(card)))
}

pub async fn delete_card(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Card(card_id)).await?;
    Card::delete(state.db(), card_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn move_card(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(card_id): Path<i64>,
    Json(payload): Json<MoveCardRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    user.ensure_owns(state.db(), Resource::Card(card_id)).await?;
    user.ensure_owns(state.db(), Resource::List(payload.list_id))
        .await?;
    Card::place(
        state.db(),
        &CardPlacement {
            id: card_id,
            list_id: payload.list_id,
            position: payload.position,
        },
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Every card and destination list is checked before anything is written.
#[tracing::instrument(skip_all, fields(user_id = user.id, count = placements.len()))]
pub async fn reorder_cards(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(placements): Json<Vec<CardPlacement>>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    for placement in &placements {
        user.ensure_owns(state.db(), Resource::Card(placement.id))
            .await?;
        user.ensure_owns(state.db(), Resource::List(placement.list_id))
            .await?;
    }
    if !placements.is_empty() {
        Card::reorder(state.db(), &placements).await?;
    }
    tracing::debug!("reordered cards");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let board_router = Router::new()
        .route("/", get(get_board).put(rename_board).delete(delete_board))
        .route("/lists", post(create_list))
        .layer(from_fn_with_state(state.clone(), load_board_middleware));

    Router::new()
        .route("/boards", get(list_boards).post(create_board))
        .nest("/boards/{board_id}", board_router)
        .route("/lists/{list_id}", put(rename_list).delete(delete_list))
        .route("/lists/{list_id}/cards", post(create_card))
        .route("/cards/reorder", post(reorder_cards))
        .route(
            "/cards/{card_id}",
            get(get_card).put(update_card).delete(delete_card),
        )
        .route("/cards/{card_id}/move", post(move_card))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_values() {
        for (raw, expected) in [
            (r#"{"title":"t","discord_notify":true}"#, true),
            (r#"{"title":"t","discord_notify":"1"}"#, true),
            (r#"{"title":"t","discord_notify":"on"}"#, true),
            (r#"{"title":"t","discord_notify":1}"#, true),
            (r#"{"title":"t","discord_notify":"0"}"#, false),
            (r#"{"title":"t","discord_notify":null}"#, false),
            (r#"{"title":"t"}"#, false),
        ] {
            let request: UpdateCardRequest = serde_json::from_str(raw).unwrap();
            assert_eq!(request.discord_notify, expected, "{raw}");
        }
    }
}
