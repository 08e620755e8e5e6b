//! Outbound API clients exercised against local stub servers.

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use services::services::{
    discord::{DiscordClient, DiscordError},
    meta::{MetaApp, MetaClient, MetaError},
    twitter::{ApiCredentials, TwitterClient, TwitterError},
    youtube::{YoutubeClient, YoutubeError},
};
use std::collections::HashMap;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn credentials() -> ApiCredentials {
    ApiCredentials {
        api_key: "key".into(),
        api_secret: "secret".into(),
        access_token: "token".into(),
        access_token_secret: "token-secret".into(),
    }
}

fn twitter_stub() -> Router {
    Router::new()
        .route(
            "/2/tweets",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let signed = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.starts_with("OAuth ") && v.contains("oauth_signature="));
                if !signed {
                    return (StatusCode::UNAUTHORIZED, Json(json!({ "title": "Unauthorized" })));
                }
                if body["text"].as_str().is_some_and(|t| t.contains("duplicate")) {
                    return (
                        StatusCode::FORBIDDEN,
                        Json(json!({
                            "detail": "You are not allowed to create a Tweet with duplicate content."
                        })),
                    );
                }
                (StatusCode::CREATED, Json(json!({ "data": { "id": "1850000000000000001" } })))
            }),
        )
        .route(
            "/2/users/me",
            get(|| async { Json(json!({ "data": { "id": "42", "username": "rustlang" } })) }),
        )
        .route(
            "/1.1/account/verify_credentials.json",
            get(|| async {
                Json(json!({
                    "followers_count": 1200,
                    "friends_count": 80,
                    "statuses_count": 3400,
                    "listed_count": 12
                }))
            }),
        )
        .route(
            "/oauth/request_token",
            post(|| async { "oauth_token=req&oauth_token_secret=req-secret&oauth_callback_confirmed=true" }),
        )
        .route(
            "/oauth/access_token",
            post(|| async { (StatusCode::UNAUTHORIZED, "Invalid verifier") }),
        )
}

#[tokio::test]
async fn tweet_is_posted_and_returns_its_id() {
    let base = serve(twitter_stub()).await;
    let client = TwitterClient::with_base(&base).unwrap();

    let id = client.post_tweet(&credentials(), "hello world").await.unwrap();
    assert_eq!(id, "1850000000000000001");
}

#[tokio::test]
async fn tweet_rejection_surfaces_the_detail() {
    let base = serve(twitter_stub()).await;
    let client = TwitterClient::with_base(&base).unwrap();

    let err = client
        .post_tweet(&credentials(), "a duplicate tweet")
        .await
        .unwrap_err();
    assert!(matches!(err, TwitterError::Api(_)));
    assert_eq!(
        err.to_string(),
        "You are not allowed to create a Tweet with duplicate content."
    );
}

#[tokio::test]
async fn user_lookups_map_fields() {
    let base = serve(twitter_stub()).await;
    let client = TwitterClient::with_base(&base).unwrap();

    let user = client.user_info(&credentials()).await.unwrap();
    assert_eq!(user.id, "42");
    assert_eq!(user.username, "rustlang");
    // Missing display name falls back to the handle.
    assert_eq!(user.name, "rustlang");

    let stats = client.user_stats(&credentials()).await.unwrap();
    assert_eq!(stats.followers_count, 1200);
    assert_eq!(stats.following_count, 80);
    assert_eq!(stats.tweet_count, 3400);
    assert_eq!(stats.listed_count, 12);
}

#[tokio::test]
async fn oauth_token_legs() {
    let base = serve(twitter_stub()).await;
    let client = TwitterClient::with_base(&base).unwrap();

    let token = client
        .request_token("key", "secret", "http://localhost/callback")
        .await
        .unwrap();
    assert_eq!(token.token, "req");
    assert_eq!(token.secret, "req-secret");

    let err = client
        .access_token("key", "secret", "req", "req-secret", "bad")
        .await
        .unwrap_err();
    assert!(matches!(err, TwitterError::AccessToken(401)));
}

fn youtube_stub() -> Router {
    Router::new()
        .route(
            "/channels",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                if query.get("key").map(String::as_str) != Some("good-key") {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": { "code": 400, "message": "API key not valid." } })),
                    );
                }
                if query.get("forHandle").map(String::as_str) == Some("nobody") {
                    return (StatusCode::OK, Json(json!({ "pageInfo": { "totalResults": 0 } })));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "items": [{
                            "id": "UC123",
                            "snippet": {
                                "title": "Rust Videos",
                                "customUrl": "@rustvideos",
                                "thumbnails": { "medium": { "url": "https://img/m.jpg" } }
                            },
                            "statistics": {
                                "subscriberCount": "1500",
                                "viewCount": "99000",
                                "videoCount": "42"
                            }
                        }]
                    })),
                )
            }),
        )
        .route(
            "/search",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query.get("type").map(String::as_str), Some("video"));
                assert_eq!(query.get("order").map(String::as_str), Some("date"));
                Json(json!({
                    "items": [
                        { "id": { "kind": "youtube#video", "videoId": "v1" } },
                        { "id": { "kind": "youtube#playlist" } },
                        { "id": { "kind": "youtube#video", "videoId": "v2" } }
                    ]
                }))
            }),
        )
        .route(
            "/videos",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query.get("id").map(String::as_str), Some("v1,v2"));
                Json(json!({
                    "items": [{
                        "id": "v1",
                        "snippet": { "title": "Intro", "publishedAt": "2025-01-01T00:00:00Z" },
                        "statistics": { "viewCount": "300", "likeCount": "20" },
                        "contentDetails": { "duration": "PT4M13S" }
                    }]
                }))
            }),
        )
}

#[tokio::test]
async fn youtube_channel_lookup_strips_the_at_sign() {
    let base = serve(youtube_stub()).await;
    let client = YoutubeClient::with_base(&base).unwrap();

    let channel = client
        .channel_by_handle("good-key", "@rustvideos")
        .await
        .unwrap()
        .expect("channel");
    assert_eq!(channel.id, "UC123");
    assert_eq!(channel.subscriber_count, 1500);
    assert_eq!(channel.thumbnail_url.as_deref(), Some("https://img/m.jpg"));

    assert!(
        client
            .channel_by_handle("good-key", "nobody")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn youtube_errors_use_the_api_message() {
    let base = serve(youtube_stub()).await;
    let client = YoutubeClient::with_base(&base).unwrap();

    let err = client.test_connection("bad-key").await.unwrap_err();
    assert!(matches!(err, YoutubeError::Api(ref m) if m == "API key not valid."));
    assert!(client.test_connection("good-key").await.is_ok());
}

#[tokio::test]
async fn youtube_video_listing() {
    let base = serve(youtube_stub()).await;
    let client = YoutubeClient::with_base(&base).unwrap();

    let ids = client.search_recent_videos("good-key", "UC123").await.unwrap();
    assert_eq!(ids, vec!["v1".to_string(), "v2".to_string()]);

    let videos = client.videos("good-key", &ids).await.unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].view_count, 300);
    assert_eq!(videos[0].comment_count, 0);
    assert_eq!(videos[0].duration.as_deref(), Some("PT4M13S"));

    assert!(client.videos("good-key", &[]).await.unwrap().is_empty());
}

fn meta_stub() -> Router {
    Router::new()
        .route(
            "/me/accounts",
            get(|| async {
                Json(json!({
                    "data": [{
                        "id": "page-1",
                        "name": "Launch Page",
                        "access_token": "page-token",
                        "category": "Software",
                        "followers_count": 310
                    }]
                }))
            }),
        )
        .route(
            "/{node}",
            get(|Path(node): Path<String>| async move {
                match node.as_str() {
                    "page-1" => Json(json!({
                        "id": "page-1",
                        "instagram_business_account": { "id": "ig-1" }
                    })),
                    "page-2" => Json(json!({ "id": "page-2" })),
                    "ig-1" => Json(json!({
                        "id": "ig-1",
                        "username": "launch",
                        "followers_count": 900,
                        "follows_count": 10,
                        "media_count": 2
                    })),
                    _ => Json(json!({
                        "error": { "message": "Unsupported get request.", "code": 100 }
                    })),
                }
            }),
        )
        .route(
            "/ig-1/media",
            get(|| async {
                Json(json!({
                    "data": [
                        { "id": "m1", "media_type": "IMAGE", "like_count": 10, "comments_count": 2 },
                        { "id": "m2", "media_type": "VIDEO", "like_count": 30 }
                    ]
                }))
            }),
        )
        .route(
            "/debug_token",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query.get("access_token").map(String::as_str), Some("app|shh"));
                Json(json!({
                    "data": {
                        "is_valid": true,
                        "expires_at": 1767225600,
                        "scopes": ["pages_show_list", "instagram_basic"]
                    }
                }))
            }),
        )
}

#[tokio::test]
async fn meta_pages_and_linked_instagram_account() {
    let base = serve(meta_stub()).await;
    let client = MetaClient::with_base(&base).unwrap();

    let pages = client.pages("user-token").await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].access_token.as_deref(), Some("page-token"));

    let account = client.instagram_account("page-token", "page-1").await.unwrap();
    assert_eq!(account.id, "ig-1");
    assert_eq!(account.followers_count, 900);

    let err = client
        .instagram_account("page-token", "page-2")
        .await
        .unwrap_err();
    assert!(matches!(err, MetaError::NoInstagramAccount));
    assert_eq!(
        err.to_string(),
        "No Instagram Business Account linked to this page"
    );

    let err = client.instagram_account("page-token", "gone").await.unwrap_err();
    assert_eq!(err.to_string(), "Unsupported get request.");
}

#[tokio::test]
async fn meta_media_and_token_debug() {
    let base = serve(meta_stub()).await;
    let client = MetaClient::with_base(&base).unwrap();

    let media = client.instagram_media("ig-1", "page-token", 25).await.unwrap();
    assert_eq!(media.len(), 2);
    assert_eq!(media[1].comments_count, 0);

    let app = MetaApp {
        app_id: "app".into(),
        app_secret: "shh".into(),
    };
    let info = client.debug_token("user-token", &app).await.unwrap();
    assert!(info.valid);
    assert_eq!(info.scopes.len(), 2);
    assert_eq!(info.expires_at.map(|t| t.timestamp()), Some(1767225600));
}

#[tokio::test]
async fn discord_rejection_reports_status_and_reason() {
    let router = Router::new()
        .route("/ok", post(|| async { StatusCode::NO_CONTENT }))
        .route("/missing", post(|| async { StatusCode::NOT_FOUND }));
    let base = serve(router).await;
    let client = DiscordClient::new().unwrap();

    client.send_test(&format!("{base}/ok"), "Launch").await.unwrap();

    let err = client
        .send(&format!("{base}/missing"), "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, DiscordError::Rejected { status: 404, .. }));
    assert_eq!(err.to_string(), "Webhook send failed: 404 Not Found");
}
