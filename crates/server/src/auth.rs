//! Password hashing, the session cookie and the [`CurrentUser`] extractor.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use db::{Db, StorageError, models::ownership::Resource, models::user::User};
use serde::Serialize;

use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;
pub const BCRYPT_COST: u32 = 10;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
        }
    }
}

/// `Set-Cookie` value for an HttpOnly cookie on `/`.
pub fn cookie_header(
    name: &str,
    value: &str,
    max_age_secs: i64,
    same_site: SameSite,
    secure: bool,
) -> HeaderValue {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite={}; Path=/; Max-Age={}",
        name,
        urlencoding::encode(value),
        same_site.as_str(),
        max_age_secs.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

pub fn session_cookie(user_id: i64, secure: bool) -> HeaderValue {
    cookie_header(
        SESSION_COOKIE,
        &user_id.to_string(),
        SESSION_MAX_AGE_SECS,
        SameSite::Strict,
        secure,
    )
}

pub fn clear_cookie(name: &str, same_site: SameSite, secure: bool) -> HeaderValue {
    cookie_header(name, "", 0, same_site, secure)
}

pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// The authenticated user, placed in request extensions by
/// [`require_session`](crate::middleware::require_session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

impl CurrentUser {
    /// Resolve the session cookie to a user, if it names one.
    pub async fn from_cookies(db: &Db, jar: &CookieJar) -> Result<Option<Self>, StorageError> {
        let Some(user_id) = jar
            .get(SESSION_COOKIE)
            .and_then(|c| c.value().trim().parse::<i64>().ok())
        else {
            return Ok(None);
        };
        Ok(User::find_by_id(db, user_id).await?.map(|user| Self {
            id: user.id,
            username: user.username,
        }))
    }

    /// The single ownership check every handler goes through.
    pub async fn ensure_owns(&self, db: &Db, resource: Resource) -> Result<(), ApiError> {
        if resource.owned_by(db, self.id).await? {
            Ok(())
        } else {
            tracing::warn!(user_id = self.id, %resource, "ownership check failed");
            Err(ApiError::forbidden(resource))
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie(12, false);
        assert_eq!(
            cookie.to_str().unwrap(),
            "session=12; HttpOnly; SameSite=Strict; Path=/; Max-Age=2592000"
        );
    }

    #[test]
    fn secure_flag_is_appended() {
        let cookie = cookie_header("twitter_oauth_project_id", "3", 300, SameSite::Lax, true);
        assert!(cookie.to_str().unwrap().ends_with("Max-Age=300; Secure"));
    }

    #[test]
    fn clearing_expires_immediately() {
        let cookie = clear_cookie(SESSION_COOKIE, SameSite::Strict, false);
        assert!(cookie.to_str().unwrap().starts_with("session=; "));
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn password_round_trip() {
        let hash = hash_password("hunter22".into()).await.unwrap();
        assert!(hash.starts_with("$2b$10$"));
        assert!(verify_password("hunter22".into(), hash.clone()).await);
        assert!(!verify_password("hunter23".into(), hash).await);
        assert!(!verify_password("x".into(), "not-a-hash".into()).await);
    }
}
