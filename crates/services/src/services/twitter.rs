//! Twitter/X REST client signed with OAuth 1.0a.

use std::time::Duration;

use db::models::twitter::{TwitterOAuthToken, TwitterSettings};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::oauth1::{self, Credentials};

pub const TWITTER_API_BASE: &str = "https://api.twitter.com";

/// Longest tweet accepted by the post form.
pub const MAX_TWEET_CHARS: usize = 280;

#[derive(Debug, Error)]
pub enum TwitterError {
    #[error("{0}")]
    Api(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Failed to get request token: {0}")]
    RequestToken(u16),
    #[error("Failed to get access token: {0}")]
    AccessToken(u16),
    #[error("Invalid response from Twitter")]
    InvalidResponse,
}

/// The four credentials every signed API call needs.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl ApiCredentials {
    fn as_oauth(&self) -> Credentials<'_> {
        Credentials {
            consumer_key: &self.api_key,
            consumer_secret: &self.api_secret,
            token: Some(&self.access_token),
            token_secret: &self.access_token_secret,
        }
    }

    /// App keys from the project settings with the user's OAuth tokens.
    pub fn from_oauth(settings: &TwitterSettings, token: &TwitterOAuthToken) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
            access_token: token.access_token.clone(),
            access_token_secret: token.access_token_secret.clone(),
        }
    }
}

impl From<&TwitterSettings> for ApiCredentials {
    fn from(settings: &TwitterSettings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
            access_token: settings.access_token.clone(),
            access_token_secret: settings.access_token_secret.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TwitterUser {
    pub id: String,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub followers_count: i64,
    pub following_count: i64,
    pub tweet_count: i64,
    pub listed_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub token: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub secret: String,
    pub user_id: String,
    pub screen_name: String,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Deserialize)]
struct MeResponse {
    id: String,
    username: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct VerifyCredentials {
    #[serde(default)]
    followers_count: i64,
    #[serde(default)]
    friends_count: i64,
    #[serde(default)]
    statuses_count: i64,
    #[serde(default)]
    listed_count: i64,
}

#[derive(Clone)]
pub struct TwitterClient {
    http: Client,
    api_base: String,
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TwitterClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self, TwitterError> {
        Self::with_base(TWITTER_API_BASE)
    }

    /// Point the client at another host; used by tests.
    pub fn with_base(api_base: &str) -> Result<Self, TwitterError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("boardroom/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Browser URL the user is sent to after a request token is issued.
    pub fn authorize_url(&self, request_token: &str) -> String {
        format!(
            "{}/oauth/authorize?oauth_token={}",
            self.api_base,
            urlencoding::encode(request_token)
        )
    }

    /// POST /2/tweets. Returns the new tweet id.
    pub async fn post_tweet(
        &self,
        credentials: &ApiCredentials,
        text: &str,
    ) -> Result<String, TwitterError> {
        let url = self.url("/2/tweets");
        let auth = oauth1::authorize("POST", &url, credentials.as_oauth(), &[]);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %body, "tweet rejected");
            return Err(TwitterError::Api(v2_error_message(&body, status)));
        }
        let created: DataEnvelope<CreatedTweet> =
            serde_json::from_value(body).map_err(|_| TwitterError::InvalidResponse)?;
        Ok(created.data.id)
    }

    /// GET /2/users/me.
    pub async fn user_info(&self, credentials: &ApiCredentials) -> Result<TwitterUser, TwitterError> {
        let (status, body) = self.signed_get("/2/users/me", credentials).await?;
        if !status.is_success() {
            return Err(TwitterError::Api(v2_error_message(&body, status)));
        }
        let me: DataEnvelope<MeResponse> =
            serde_json::from_value(body).map_err(|_| TwitterError::InvalidResponse)?;
        let name = me.data.name.unwrap_or_else(|| me.data.username.clone());
        Ok(TwitterUser {
            id: me.data.id,
            username: me.data.username,
            name,
        })
    }

    /// GET /1.1/account/verify_credentials.json.
    pub async fn user_stats(&self, credentials: &ApiCredentials) -> Result<UserStats, TwitterError> {
        let (status, body) = self
            .signed_get("/1.1/account/verify_credentials.json", credentials)
            .await?;
        if !status.is_success() {
            let message = body
                .pointer("/errors/0/message")
                .and_then(Value::as_str)
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("API Error: {}", status.as_u16()));
            return Err(TwitterError::Api(message));
        }
        let stats: VerifyCredentials =
            serde_json::from_value(body).map_err(|_| TwitterError::InvalidResponse)?;
        Ok(UserStats {
            followers_count: stats.followers_count,
            following_count: stats.friends_count,
            tweet_count: stats.statuses_count,
            listed_count: stats.listed_count,
        })
    }

    async fn signed_get(
        &self,
        path: &str,
        credentials: &ApiCredentials,
    ) -> Result<(StatusCode, Value), TwitterError> {
        let url = self.url(path);
        let auth = oauth1::authorize("GET", &url, credentials.as_oauth(), &[]);
        let response = self
            .http
            .request(Method::GET, &url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await?;
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    /// POST /oauth/request_token, the first leg of the three-legged flow.
    pub async fn request_token(
        &self,
        api_key: &str,
        api_secret: &str,
        callback: &str,
    ) -> Result<RequestToken, TwitterError> {
        let url = self.url("/oauth/request_token");
        let credentials = Credentials {
            consumer_key: api_key,
            consumer_secret: api_secret,
            token: None,
            token_secret: "",
        };
        let auth = oauth1::authorize("POST", &url, credentials, &[("oauth_callback", callback)]);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %text, "request token rejected");
            return Err(TwitterError::RequestToken(status.as_u16()));
        }

        let fields = parse_form(&text);
        match (field(&fields, "oauth_token"), field(&fields, "oauth_token_secret")) {
            (Some(token), Some(secret)) => Ok(RequestToken { token, secret }),
            _ => Err(TwitterError::InvalidResponse),
        }
    }

    /// POST /oauth/access_token, exchanging the verifier for user tokens.
    pub async fn access_token(
        &self,
        api_key: &str,
        api_secret: &str,
        request_token: &str,
        request_token_secret: &str,
        verifier: &str,
    ) -> Result<AccessToken, TwitterError> {
        let url = self.url("/oauth/access_token");
        let credentials = Credentials {
            consumer_key: api_key,
            consumer_secret: api_secret,
            token: Some(request_token),
            token_secret: request_token_secret,
        };
        let auth = oauth1::authorize("POST", &url, credentials, &[("oauth_verifier", verifier)]);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %text, "access token rejected");
            return Err(TwitterError::AccessToken(status.as_u16()));
        }

        let fields = parse_form(&text);
        match (field(&fields, "oauth_token"), field(&fields, "oauth_token_secret")) {
            (Some(token), Some(secret)) => Ok(AccessToken {
                token,
                secret,
                user_id: field(&fields, "user_id").unwrap_or_default(),
                screen_name: field(&fields, "screen_name").unwrap_or_default(),
            }),
            _ => Err(TwitterError::InvalidResponse),
        }
    }
}

/// `detail`, then `error.message`, then the bare status.
fn v2_error_message(body: &Value, status: StatusCode) -> String {
    body.get("detail")
        .and_then(Value::as_str)
        .or_else(|| body.pointer("/error/message").and_then(Value::as_str))
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("API Error: {}", status.as_u16()))
}

fn parse_form(body: &str) -> Vec<(String, String)> {
    body.trim()
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let decode = |s: &str| {
                let s = s.replace('+', " ");
                urlencoding::decode(&s).map(|d| d.into_owned()).ok()
            };
            Some((decode(key)?, decode(value)?))
        })
        .collect()
}

fn field(fields: &[(String, String)], name: &str) -> Option<String> {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_errors_prefer_detail() {
        let status = StatusCode::FORBIDDEN;
        assert_eq!(
            v2_error_message(&serde_json::json!({"detail": "duplicate content"}), status),
            "duplicate content"
        );
        assert_eq!(
            v2_error_message(&serde_json::json!({"error": {"message": "bad auth"}}), status),
            "bad auth"
        );
        assert_eq!(v2_error_message(&Value::Null, status), "API Error: 403");
    }

    #[test]
    fn parses_form_encoded_token_responses() {
        let fields = parse_form(
            "oauth_token=abc&oauth_token_secret=d%2Fe&user_id=42&screen_name=rust+lang",
        );
        assert_eq!(field(&fields, "oauth_token").as_deref(), Some("abc"));
        assert_eq!(field(&fields, "oauth_token_secret").as_deref(), Some("d/e"));
        assert_eq!(field(&fields, "screen_name").as_deref(), Some("rust lang"));
        assert_eq!(field(&fields, "missing"), None);
    }

    #[test]
    fn authorize_url_encodes_token() {
        let client = TwitterClient::with_base("https://api.twitter.com/").unwrap();
        assert_eq!(
            client.authorize_url("a b"),
            "https://api.twitter.com/oauth/authorize?oauth_token=a%20b"
        );
    }
}
