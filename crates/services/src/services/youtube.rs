//! YouTube Data API v3 client (API-key authentication).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Channel fetched by the connection test.
const KNOWN_CHANNEL_ID: &str = "UC_x5XG1OV2P6uZZ5FSM9Ttw";

const SEARCH_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum YoutubeError {
    #[error("{0}")]
    Api(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response from YouTube")]
    InvalidResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub id: String,
    pub title: String,
    pub custom_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub subscriber_count: i64,
    pub view_count: i64,
    pub video_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<String>,
    pub duration: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
}

#[derive(Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize, Default)]
struct Thumbnail {
    url: Option<String>,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        self.medium
            .and_then(|t| t.url)
            .or_else(|| self.default.and_then(|t| t.url))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    custom_url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

/// Statistics are reported as decimal strings.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    subscriber_count: Option<String>,
    view_count: Option<String>,
    video_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

fn count(value: &Option<String>) -> i64 {
    value.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0)
}

#[derive(Deserialize)]
struct ChannelItem {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Deserialize)]
struct SearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchId,
}

#[derive(Deserialize, Default)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: ContentDetails,
}

impl From<ChannelItem> for ChannelInfo {
    fn from(item: ChannelItem) -> Self {
        Self {
            subscriber_count: count(&item.statistics.subscriber_count),
            view_count: count(&item.statistics.view_count),
            video_count: count(&item.statistics.video_count),
            id: item.id,
            title: item.snippet.title,
            custom_url: item.snippet.custom_url,
            thumbnail_url: item.snippet.thumbnails.best(),
        }
    }
}

impl From<VideoItem> for VideoInfo {
    fn from(item: VideoItem) -> Self {
        Self {
            view_count: count(&item.statistics.view_count),
            like_count: count(&item.statistics.like_count),
            comment_count: count(&item.statistics.comment_count),
            video_id: item.id,
            title: item.snippet.title,
            description: item.snippet.description,
            published_at: item.snippet.published_at,
            thumbnail_url: item.snippet.thumbnails.best(),
            duration: item.content_details.duration,
        }
    }
}

#[derive(Clone)]
pub struct YoutubeClient {
    http: Client,
    api_base: String,
}

impl std::fmt::Debug for YoutubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeClient")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl YoutubeClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self, YoutubeError> {
        Self::with_base(YOUTUBE_API_BASE)
    }

    pub fn with_base(api_base: &str) -> Result<Self, YoutubeError> {
        let http = Client::builder().timeout(Self::REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        resource: &str,
        api_key: &str,
        query: &[(&str, &str)],
    ) -> Result<T, YoutubeError> {
        let url = format!("{}/{}", self.api_base, resource);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", api_key)])
            .send()
            .await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() || body.get("error").is_some() {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("YouTube API error: {}", status.as_u16()));
            tracing::warn!(status = status.as_u16(), resource, "youtube request failed");
            return Err(YoutubeError::Api(message));
        }
        serde_json::from_value(body).map_err(|_| YoutubeError::InvalidResponse)
    }

    /// Look a channel up by its `@handle`; the leading `@` is optional.
    pub async fn channel_by_handle(
        &self,
        api_key: &str,
        handle: &str,
    ) -> Result<Option<ChannelInfo>, YoutubeError> {
        let handle = handle.trim().trim_start_matches('@');
        let list: ItemList<ChannelItem> = self
            .get(
                "channels",
                api_key,
                &[("part", "snippet,statistics"), ("forHandle", handle)],
            )
            .await?;
        Ok(list.items.into_iter().next().map(ChannelInfo::from))
    }

    pub async fn channel_by_id(
        &self,
        api_key: &str,
        channel_id: &str,
    ) -> Result<Option<ChannelInfo>, YoutubeError> {
        let list: ItemList<ChannelItem> = self
            .get(
                "channels",
                api_key,
                &[("part", "snippet,statistics"), ("id", channel_id)],
            )
            .await?;
        Ok(list.items.into_iter().next().map(ChannelInfo::from))
    }

    /// Ids of the channel's most recent uploads, newest first.
    pub async fn search_recent_videos(
        &self,
        api_key: &str,
        channel_id: &str,
    ) -> Result<Vec<String>, YoutubeError> {
        let max_results = SEARCH_PAGE_SIZE.to_string();
        let list: ItemList<SearchItem> = self
            .get(
                "search",
                api_key,
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    ("type", "video"),
                    ("order", "date"),
                    ("maxResults", &max_results),
                ],
            )
            .await?;
        Ok(list.items.into_iter().filter_map(|item| item.id.video_id).collect())
    }

    pub async fn videos(&self, api_key: &str, ids: &[String]) -> Result<Vec<VideoInfo>, YoutubeError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let list: ItemList<VideoItem> = self
            .get(
                "videos",
                api_key,
                &[("part", "snippet,statistics,contentDetails"), ("id", &joined)],
            )
            .await?;
        Ok(list.items.into_iter().map(VideoInfo::from).collect())
    }

    /// Fetch a well-known channel to verify the key works.
    pub async fn test_connection(&self, api_key: &str) -> Result<(), YoutubeError> {
        let list: ItemList<Value> = self
            .get("channels", api_key, &[("part", "snippet"), ("id", KNOWN_CHANNEL_ID)])
            .await?;
        if list.items.is_empty() {
            return Err(YoutubeError::Api("Unable to fetch data".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_statistics_parse_from_strings() {
        let item: ChannelItem = serde_json::from_value(serde_json::json!({
            "id": "UC1",
            "snippet": {
                "title": "Rust",
                "customUrl": "@rust",
                "thumbnails": { "default": { "url": "d.jpg" } }
            },
            "statistics": { "subscriberCount": "1200", "viewCount": "50000", "videoCount": "x" }
        }))
        .unwrap();
        let channel = ChannelInfo::from(item);
        assert_eq!(channel.subscriber_count, 1200);
        assert_eq!(channel.view_count, 50000);
        assert_eq!(channel.video_count, 0);
        assert_eq!(channel.thumbnail_url.as_deref(), Some("d.jpg"));
        assert_eq!(channel.custom_url.as_deref(), Some("@rust"));
    }

    #[test]
    fn medium_thumbnail_preferred() {
        let thumbs: Thumbnails = serde_json::from_value(serde_json::json!({
            "default": { "url": "d.jpg" },
            "medium": { "url": "m.jpg" }
        }))
        .unwrap();
        assert_eq!(thumbs.best().as_deref(), Some("m.jpg"));
    }
}
