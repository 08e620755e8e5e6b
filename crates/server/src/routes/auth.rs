use axum::{
    Json, Router,
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Json as ResponseJson},
    routing::{get, post},
};
use db::models::user::User;
use serde::Deserialize;
use utils::{response::ApiResponse, text::non_empty};

use crate::{
    AppState,
    auth::{
        CurrentUser, MIN_PASSWORD_LEN, SESSION_COOKIE, SameSite, clear_cookie, hash_password,
        session_cookie, verify_password,
    },
    error::ApiError,
};

const BAD_CREDENTIALS: &str = "Wrong username or password";

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialsRequest {
    fn required(self) -> Result<(String, String), ApiError> {
        match (non_empty(self.username.as_deref()), self.password) {
            (Some(username), Some(password)) if !password.is_empty() => Ok((username, password)),
            _ => Err(ApiError::bad_request(
                "Username and password are required",
            )),
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (username, password) = payload.required()?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if User::username_taken(state.db(), &username).await? {
        return Err(ApiError::bad_request("This username is already taken"));
    }

    let hash = hash_password(password).await?;
    let id = User::create(state.db(), &username, &hash).await?;
    tracing::info!(user_id = id, "registered user");

    let cookie = session_cookie(id, state.config().cookie_secure);
    Ok((
        [(SET_COOKIE, cookie)],
        ResponseJson(ApiResponse::<CurrentUser>::success(CurrentUser { id, username })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (username, password) = payload.required()?;
    let Some(credentials) = User::credentials(state.db(), &username).await? else {
        return Err(ApiError::bad_request(BAD_CREDENTIALS));
    };
    if !verify_password(password, credentials.password_hash).await {
        tracing::info!(user_id = credentials.id, "rejected login");
        return Err(ApiError::bad_request(BAD_CREDENTIALS));
    }

    let cookie = session_cookie(credentials.id, state.config().cookie_secure);
    Ok((
        [(SET_COOKIE, cookie)],
        ResponseJson(ApiResponse::<CurrentUser>::success(CurrentUser {
            id: credentials.id,
            username,
        })),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(
            SET_COOKIE,
            clear_cookie(SESSION_COOKIE, SameSite::Strict, state.config().cookie_secure),
        )],
        ResponseJson(ApiResponse::<()>::success(())),
    )
}

pub async fn me(user: CurrentUser) -> ResponseJson<ApiResponse<CurrentUser>> {
    ResponseJson(ApiResponse::success(user))
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}
