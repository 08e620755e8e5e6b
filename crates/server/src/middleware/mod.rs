//! Session and ownership middleware.
//!
//! [`require_session`] wraps every protected route. The loaders resolve the
//! path id of a board- or project-scoped router, run the ownership guard and
//! put the loaded row into request extensions.

use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use db::models::{board::Board, ownership::Resource, project::Project};

use crate::{AppState, auth::CurrentUser, error::ApiError};

pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(user) = CurrentUser::from_cookies(state.db(), &jar).await? else {
        return Err(ApiError::Unauthorized);
    };
    tracing::Span::current().record("user_id", user.id);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn path_id(params: &HashMap<String, String>, key: &str) -> Result<i64, ApiError> {
    params
        .get(key)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| ApiError::bad_request(format!("Invalid {key}")))
}

fn current_user(request: &Request) -> Result<CurrentUser, ApiError> {
    request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or(ApiError::Unauthorized)
}

pub async fn load_board_middleware(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let board_id = path_id(&params, "board_id")?;
    let user = current_user(&request)?;
    user.ensure_owns(state.db(), Resource::Board(board_id)).await?;

    let board = Board::find_by_id(state.db(), board_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Board not found"))?;
    request.extensions_mut().insert(board);
    Ok(next.run(request).await)
}

pub async fn load_project_middleware(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let project_id = path_id(&params, "project_id")?;
    let user = current_user(&request)?;
    user.ensure_owns(state.db(), Resource::Project(project_id))
        .await?;

    let project = Project::find_by_id(state.db(), project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    request.extensions_mut().insert(project);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_ids_must_be_integers() {
        let mut params = HashMap::new();
        params.insert("board_id".to_string(), "17".to_string());
        params.insert("project_id".to_string(), "abc".to_string());

        assert_eq!(path_id(&params, "board_id").unwrap(), 17);
        assert!(matches!(
            path_id(&params, "project_id"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(path_id(&params, "card_id").is_err());
    }
}
