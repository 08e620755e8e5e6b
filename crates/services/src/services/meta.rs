//! Meta Graph API client for Facebook Pages, Instagram Business and Threads.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

pub const GRAPH_API_BASE: &str = "https://graph.facebook.com/v19.0";

pub const DEFAULT_PAGE_SIZE: u32 = 25;

const INSIGHT_METRICS: &str = "page_impressions,page_engaged_users,page_post_engagements";
const INSIGHT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("{0}")]
    Api(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("No Facebook page is connected to this token")]
    NoPage,
    #[error("No Instagram Business Account linked to this page")]
    NoInstagramAccount,
    #[error("Unexpected response from the Graph API")]
    InvalidResponse,
}

/// App credentials used for token inspection and exchange.
#[derive(Debug, Clone)]
pub struct MetaApp {
    pub app_id: String,
    pub app_secret: String,
}

impl MetaApp {
    fn app_token(&self) -> String {
        format!("{}|{}", self.app_id, self.app_secret)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub followers_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstagramAccountInfo {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub follows_count: i64,
    #[serde(default)]
    pub media_count: i64,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MediaInfo {
    pub id: String,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThreadInfo {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub quote_count: i64,
    #[serde(default)]
    pub repost_count: i64,
    #[serde(default)]
    pub views: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub valid: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LongLivedToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct DataList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct LinkedAccount {
    instagram_business_account: Option<IdOnly>,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Deserialize)]
struct DebugData {
    #[serde(default)]
    is_valid: bool,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    scopes: Vec<String>,
}

#[derive(Deserialize)]
struct DebugEnvelope {
    data: DebugData,
}

#[derive(Clone)]
pub struct MetaClient {
    http: Client,
    api_base: String,
}

impl std::fmt::Debug for MetaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaClient")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl MetaClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self, MetaError> {
        Self::with_base(GRAPH_API_BASE)
    }

    pub fn with_base(api_base: &str) -> Result<Self, MetaError> {
        let http = Client::builder().timeout(Self::REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// GET `{base}/{path}`; a body carrying `error.message` is a failure
    /// regardless of status.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MetaError> {
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Graph API error")
                .to_string();
            tracing::warn!(status = status.as_u16(), path, error = %message, "graph api error");
            return Err(MetaError::Api(message));
        }
        if !status.is_success() {
            return Err(MetaError::Api(format!("Graph API error: {}", status.as_u16())));
        }
        serde_json::from_value(body).map_err(|_| MetaError::InvalidResponse)
    }

    /// Pages the token's user manages.
    pub async fn pages(&self, access_token: &str) -> Result<Vec<PageInfo>, MetaError> {
        let list: DataList<PageInfo> = self
            .get(
                "me/accounts",
                &[
                    ("fields", "id,name,access_token,category,followers_count"),
                    ("access_token", access_token),
                ],
            )
            .await?;
        Ok(list.data)
    }

    /// The Instagram Business account linked to `page_id`, with its details.
    pub async fn instagram_account(
        &self,
        page_access_token: &str,
        page_id: &str,
    ) -> Result<InstagramAccountInfo, MetaError> {
        let linked: LinkedAccount = self
            .get(
                page_id,
                &[
                    ("fields", "instagram_business_account"),
                    ("access_token", page_access_token),
                ],
            )
            .await?;
        let ig = linked
            .instagram_business_account
            .ok_or(MetaError::NoInstagramAccount)?;
        self.get(
            &ig.id,
            &[
                (
                    "fields",
                    "id,username,followers_count,follows_count,media_count,profile_picture_url",
                ),
                ("access_token", page_access_token),
            ],
        )
        .await
    }

    pub async fn instagram_media(
        &self,
        instagram_account_id: &str,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<MediaInfo>, MetaError> {
        let limit = limit.to_string();
        let list: DataList<MediaInfo> = self
            .get(
                &format!("{instagram_account_id}/media"),
                &[
                    (
                        "fields",
                        "id,media_type,media_url,permalink,caption,like_count,comments_count,timestamp",
                    ),
                    ("limit", &limit),
                    ("access_token", access_token),
                ],
            )
            .await?;
        Ok(list.data)
    }

    pub async fn threads_posts(
        &self,
        access_token: &str,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ThreadInfo>, MetaError> {
        let limit = limit.to_string();
        let list: DataList<ThreadInfo> = self
            .get(
                &format!("{user_id}/threads"),
                &[
                    (
                        "fields",
                        "id,text,permalink,timestamp,like_count,reply_count,quote_count,repost_count,views",
                    ),
                    ("limit", &limit),
                    ("access_token", access_token),
                ],
            )
            .await?;
        Ok(list.data)
    }

    /// Daily page metrics for the week ending at `now`.
    pub async fn page_insights(
        &self,
        page_id: &str,
        page_access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Value>, MetaError> {
        let until = now.timestamp();
        let since = (until - INSIGHT_WINDOW_DAYS * 24 * 60 * 60).to_string();
        let until = until.to_string();
        let list: DataList<Value> = self
            .get(
                &format!("{page_id}/insights"),
                &[
                    ("metric", INSIGHT_METRICS),
                    ("period", "day"),
                    ("since", &since),
                    ("until", &until),
                    ("access_token", page_access_token),
                ],
            )
            .await?;
        Ok(list.data)
    }

    pub async fn debug_token(&self, access_token: &str, app: &MetaApp) -> Result<TokenInfo, MetaError> {
        let app_token = app.app_token();
        let envelope: DebugEnvelope = self
            .get(
                "debug_token",
                &[("input_token", access_token), ("access_token", &app_token)],
            )
            .await?;
        Ok(TokenInfo {
            valid: envelope.data.is_valid,
            expires_at: envelope
                .data
                .expires_at
                .filter(|ts| *ts > 0)
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            scopes: envelope.data.scopes,
        })
    }

    /// Exchange a short-lived user token for a 60-day one.
    pub async fn long_lived_token(
        &self,
        short_lived_token: &str,
        app: &MetaApp,
    ) -> Result<LongLivedToken, MetaError> {
        self.get(
            "oauth/access_token",
            &[
                ("grant_type", "fb_exchange_token"),
                ("client_id", &app.app_id),
                ("client_secret", &app.app_secret),
                ("fb_exchange_token", short_lived_token),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_token_joins_id_and_secret() {
        let app = MetaApp {
            app_id: "123".into(),
            app_secret: "abc".into(),
        };
        assert_eq!(app.app_token(), "123|abc");
    }

    #[test]
    fn missing_counts_default_to_zero() {
        let media: MediaInfo = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "caption": "hello"
        }))
        .unwrap();
        assert_eq!(media.like_count, 0);
        assert_eq!(media.comments_count, 0);
        assert_eq!(media.caption.as_deref(), Some("hello"));
    }
}
