//! Background jobs and imports against a migrated SQLite database.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use chrono::{Timelike, Utc};
use db::{
    Db, Statement,
    models::{
        discord::{BoardDiscordSettings, SaveDiscordSettings},
        twitter::{
            SaveTwitterSettings, ScheduledPost, TwitterAccount, TwitterPost, TwitterSettings,
            TwitterStat,
        },
    },
    test_utils::{create_test_db, seed_project, seed_user},
};
use serde_json::{Value, json};
use services::services::{
    csv_import::{CsvImportError, import_twitter_stats},
    discord::DiscordClient,
    discord_digest::DiscordDigestService,
    scheduler::{SETTINGS_NOT_FOUND, ScheduledPostService},
    twitter::TwitterClient,
};

type Captured = Arc<Mutex<Vec<Value>>>;

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

async fn twitter_stub() -> (String, Captured) {
    let captured: Captured = Arc::default();
    let router = Router::new()
        .route(
            "/2/tweets",
            post(
                |State(captured): State<Captured>, Json(body): Json<Value>| async move {
                    captured.lock().unwrap().push(body.clone());
                    if body["text"].as_str().is_some_and(|t| t.contains("rejected")) {
                        return (
                            StatusCode::FORBIDDEN,
                            Json(json!({ "detail": "duplicate content" })),
                        );
                    }
                    (StatusCode::CREATED, Json(json!({ "data": { "id": "987" } })))
                },
            ),
        )
        .with_state(captured.clone());
    (serve(router).await, captured)
}

async fn save_settings(db: &Db, project_id: i64) {
    TwitterSettings::upsert(
        db,
        project_id,
        &SaveTwitterSettings {
            api_key: "key",
            api_secret: "secret",
            access_token: "token",
            access_token_secret: "token-secret",
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn due_posts_are_published_or_failed_once() {
    let (db, _dir) = create_test_db().await;
    let user = seed_user(&db, "alice").await;
    let project = seed_project(&db, user, "Launch").await;
    save_settings(&db, project).await;
    let account = TwitterAccount::upsert(&db, project, "42", "launch", None)
        .await
        .unwrap();

    let ok = ScheduledPost::create(&db, account, "morning update", "2020-01-01 09:00:00")
        .await
        .unwrap();
    let bad = ScheduledPost::create(&db, account, "rejected update", "2020-01-01 10:00:00")
        .await
        .unwrap();
    let future = ScheduledPost::create(&db, account, "later", "2999-01-01 00:00:00")
        .await
        .unwrap();

    let (base, captured) = twitter_stub().await;
    let service = ScheduledPostService::new(
        db.clone(),
        TwitterClient::with_base(&base).unwrap(),
        Duration::from_secs(3600),
    );

    let summary = service.run_once().await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.posted, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(captured.lock().unwrap().len(), 2);

    let posted = ScheduledPost::find_by_id(&db, ok).await.unwrap().unwrap();
    assert_eq!(posted.status, "posted");
    let recent = TwitterPost::recent(&db, account, 10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].tweet_id, "987");
    assert_eq!(posted.posted_tweet_id, Some(recent[0].id));

    let failed = ScheduledPost::find_by_id(&db, bad).await.unwrap().unwrap();
    assert_eq!(failed.status, "failed");
    assert_eq!(failed.error_message.as_deref(), Some("duplicate content"));

    let pending = ScheduledPost::find_by_id(&db, future).await.unwrap().unwrap();
    assert_eq!(pending.status, "pending");

    // Nothing is retried on the next run.
    let summary = service.run_once().await.unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(captured.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn history_write_failures_never_resend_a_tweet() {
    let (db, _dir) = create_test_db().await;
    let user = seed_user(&db, "erin").await;
    let project = seed_project(&db, user, "Outage").await;
    save_settings(&db, project).await;
    let account = TwitterAccount::upsert(&db, project, "5", "outage", None)
        .await
        .unwrap();
    let first = ScheduledPost::create(&db, account, "first", "2020-01-01 09:00:00")
        .await
        .unwrap();
    let second = ScheduledPost::create(&db, account, "second", "2020-01-01 10:00:00")
        .await
        .unwrap();

    db.run(Statement::new(
        "CREATE TRIGGER reject_history BEFORE INSERT ON twitter_posts \
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    ))
    .await
    .unwrap();

    let (base, captured) = twitter_stub().await;
    let service = ScheduledPostService::new(
        db.clone(),
        TwitterClient::with_base(&base).unwrap(),
        Duration::from_secs(3600),
    );

    let summary = service.run_once().await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.posted, 2);
    {
        let sent = captured.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["text"], "first");
        assert_eq!(sent[1]["text"], "second");
    }

    for id in [first, second] {
        let post = ScheduledPost::find_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(post.status, "posted");
        assert_eq!(post.posted_tweet_id, None);
    }

    let summary = service.run_once().await.unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(captured.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_settings_fail_the_post_without_calling_twitter() {
    let (db, _dir) = create_test_db().await;
    let user = seed_user(&db, "bob").await;
    let project = seed_project(&db, user, "Side").await;
    let account = TwitterAccount::upsert(&db, project, "7", "side", None)
        .await
        .unwrap();
    let id = ScheduledPost::create(&db, account, "hello", "2020-01-01 00:00:00")
        .await
        .unwrap();

    let (base, captured) = twitter_stub().await;
    let service = ScheduledPostService::new(
        db.clone(),
        TwitterClient::with_base(&base).unwrap(),
        Duration::from_secs(3600),
    );
    let summary = service.run_once().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert!(captured.lock().unwrap().is_empty());

    let post = ScheduledPost::find_by_id(&db, id).await.unwrap().unwrap();
    assert_eq!(post.status, "failed");
    assert_eq!(post.error_message.as_deref(), Some(SETTINGS_NOT_FOUND));
}

#[tokio::test]
async fn csv_import_keeps_existing_days_and_recomputes_changes() {
    let (db, _dir) = create_test_db().await;
    let user = seed_user(&db, "carol").await;
    let project = seed_project(&db, user, "Stats").await;

    let csv = "Date,Followers_Count,Following_Count,Tweet_Count\n\
               2025-03-01,100,10,5\n\
               2025-03-02,110,12,9\n\
               2025-03-03,oops,12,9\n";

    let err = import_twitter_stats(&db, project, csv).await.unwrap_err();
    assert!(matches!(err, CsvImportError::NoAccount));

    let account = TwitterAccount::upsert(&db, project, "1", "carol", None)
        .await
        .unwrap();
    let summary = import_twitter_stats(&db, project, csv).await.unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 1);

    // Re-importing counts the valid rows again but leaves stored days alone.
    let changed = "Date,Followers_Count,Following_Count,Tweet_Count\n\
                   2025-03-01,999,10,5\n\
                   2025-03-02,110,12,9\n\
                   2025-03-03,oops,12,9\n";
    let again = import_twitter_stats(&db, project, changed).await.unwrap();
    assert_eq!(again.imported, 2);
    assert_eq!(again.skipped, 1);
    let stored = TwitterStat::all_desc(&db, account).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].recorded_date, "2025-03-01");
    assert_eq!(stored[1].followers_count, 100);

    let latest = TwitterStat::latest(&db, account).await.unwrap().unwrap();
    assert_eq!(latest.recorded_date, "2025-03-02");
    assert_eq!(latest.follower_change, 10);
    assert_eq!(latest.tweet_change, 4);
}

#[tokio::test]
async fn digest_sends_once_per_local_day() {
    let (db, _dir) = create_test_db().await;
    let user = seed_user(&db, "dave").await;
    let board = db
        .run(
            Statement::new("INSERT INTO boards (user_id, title, position) VALUES (?, 'Roadmap', 0)")
                .bind(user),
        )
        .await
        .unwrap()
        .last_row_id;
    let list = db
        .run(
            Statement::new("INSERT INTO lists (board_id, title, position) VALUES (?, 'Doing', 0)")
                .bind(board),
        )
        .await
        .unwrap()
        .last_row_id;
    db.run(
        Statement::new(
            "INSERT INTO cards (list_id, title, due_date, position) \
             VALUES (?, 'Ship beta', datetime('now', '+1 day'), 0)",
        )
        .bind(list),
    )
    .await
    .unwrap();

    let captured: Captured = Arc::default();
    let router = Router::new()
        .route(
            "/hook",
            post(
                |State(captured): State<Captured>, Json(body): Json<Value>| async move {
                    captured.lock().unwrap().push(body);
                    StatusCode::NO_CONTENT
                },
            ),
        )
        .with_state(captured.clone());
    let base = serve(router).await;

    let now = Utc::now();
    BoardDiscordSettings::save(
        &db,
        board,
        &SaveDiscordSettings {
            webhook_url: format!("{base}/hook"),
            enabled: true,
            days_ahead: 3,
            cron_schedule: format!("{} {} * * *", now.minute(), now.hour()),
            timezone: "UTC".to_string(),
        },
    )
    .await
    .unwrap();

    let service = DiscordDigestService::new(
        db.clone(),
        DiscordClient::new().unwrap(),
        Duration::from_secs(60),
    );
    assert_eq!(service.run_tick(now).await.unwrap(), 1);
    {
        let sent = captured.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let content = sent[0]["content"].as_str().unwrap();
        assert!(content.contains("Board: Roadmap"));
        assert!(content.contains("1. Task: Ship beta"));
    }

    assert_eq!(service.run_tick(now).await.unwrap(), 0);
    assert_eq!(captured.lock().unwrap().len(), 1);

    let settings = BoardDiscordSettings::find_by_board(&db, board)
        .await
        .unwrap()
        .unwrap();
    assert!(settings.last_sent_at.is_some());
}
