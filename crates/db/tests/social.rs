//! Integration tests for the social-media repositories.

use db::{
    Db, SqliteStorage, Statement,
    models::{
        ownership::Resource,
        tiktok::{TiktokAccount, TiktokCounts, TiktokStat},
        twitter::{
            DUE_POST_BATCH, DailyCounts, ScheduledPost, TwitterAccount, TwitterPost,
            SaveTwitterSettings, TwitterSettings, TwitterStat,
        },
        youtube::{ChannelCounts, SaveChannel, YoutubeChannel, YoutubeStat},
    },
};
use tempfile::TempDir;

async fn setup_db() -> (Db, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = SqliteStorage::open(&temp_dir.path().join("test.db"), 5)
        .await
        .expect("Failed to open database");
    (Db::new(storage), temp_dir)
}

async fn create_project(db: &Db, username: &str) -> (i64, i64) {
    let user = db
        .run(
            Statement::new("INSERT INTO users (username, password_hash) VALUES (?, 'x')")
                .bind(username),
        )
        .await
        .unwrap()
        .last_row_id;
    let project = db
        .run(
            Statement::new("INSERT INTO projects (user_id, title) VALUES (?, 'Launch')")
                .bind(user),
        )
        .await
        .unwrap()
        .last_row_id;
    (user, project)
}

fn counts(followers: i64, following: i64, tweets: i64) -> DailyCounts {
    DailyCounts {
        followers_count: followers,
        following_count: following,
        tweet_count: tweets,
    }
}

#[tokio::test]
async fn settings_upsert_replaces_credentials() {
    let (db, _dir) = setup_db().await;
    let (_, project) = create_project(&db, "alice").await;

    for key in ["first-key-1234", "second-key-5678"] {
        TwitterSettings::upsert(
            &db,
            project,
            &SaveTwitterSettings {
                api_key: key,
                api_secret: "secret",
                access_token: "token",
                access_token_secret: "token-secret",
            },
        )
        .await
        .unwrap();
    }

    let settings = TwitterSettings::find_enabled(&db, project).await.unwrap().unwrap();
    assert_eq!(settings.api_key, "second-key-5678");
    assert_eq!(settings.masked().api_key, "***********5678");
}

#[tokio::test]
async fn account_upsert_keeps_a_single_row() {
    let (db, _dir) = setup_db().await;
    let (_, project) = create_project(&db, "alice").await;

    let first = TwitterAccount::upsert(&db, project, "old", "old", None).await.unwrap();
    let second = TwitterAccount::upsert(&db, project, "123", "new", Some("New Name"))
        .await
        .unwrap();
    assert_eq!(first, second);

    let account = TwitterAccount::latest(&db, project).await.unwrap().unwrap();
    assert_eq!(account.username, "new");
    assert_eq!(account.name.as_deref(), Some("New Name"));
}

#[tokio::test]
async fn imported_rows_are_kept_and_changes_recomputed_by_date() {
    let (db, _dir) = setup_db().await;
    let (_, project) = create_project(&db, "alice").await;
    let account = TwitterAccount::upsert(&db, project, "a", "a", None).await.unwrap();

    // Out of order on purpose: changes are fixed up afterwards.
    assert!(TwitterStat::insert_if_absent(&db, account, "2025-01-03", counts(130, 10, 9)).await.unwrap());
    assert!(TwitterStat::insert_if_absent(&db, account, "2025-01-01", counts(100, 10, 5)).await.unwrap());
    assert!(TwitterStat::insert_if_absent(&db, account, "2025-01-02", counts(110, 12, 5)).await.unwrap());
    assert!(!TwitterStat::insert_if_absent(&db, account, "2025-01-02", counts(1, 1, 1)).await.unwrap());

    assert_eq!(TwitterStat::recompute_changes(&db, account).await.unwrap(), 2);

    let rows = TwitterStat::all_desc(&db, account).await.unwrap();
    let changes: Vec<(&str, i64, i64, i64)> = rows
        .iter()
        .map(|r| {
            (
                r.recorded_date.as_str(),
                r.follower_change,
                r.following_change,
                r.tweet_change,
            )
        })
        .collect();
    assert_eq!(
        changes,
        [
            ("2025-01-03", 20, -2, 4),
            ("2025-01-02", 10, 2, 0),
            ("2025-01-01", 0, 0, 0),
        ]
    );
}

#[tokio::test]
async fn scheduled_posts_transition_once() {
    let (db, _dir) = setup_db().await;
    let (_, project) = create_project(&db, "alice").await;
    let account = TwitterAccount::upsert(&db, project, "a", "a", None).await.unwrap();

    let due = ScheduledPost::create(&db, account, "past", "2000-01-01 00:00:00").await.unwrap();
    ScheduledPost::create(&db, account, "future", "2999-01-01 00:00:00").await.unwrap();

    let ready = ScheduledPost::due(&db, DUE_POST_BATCH).await.unwrap();
    assert_eq!(ready.len(), 1);
    assert_eq!((ready[0].id, ready[0].project_id), (due, project));

    let post_row = TwitterPost::create(&db, account, "tweet-1", "past").await.unwrap();
    assert!(ScheduledPost::mark_posted(&db, due, Some(post_row)).await.unwrap());
    assert!(!ScheduledPost::mark_failed(&db, due, "late failure").await.unwrap());

    let stored = ScheduledPost::find_by_id(&db, due).await.unwrap().unwrap();
    assert_eq!(stored.status, "posted");
    assert_eq!(stored.posted_tweet_id, Some(post_row));
    assert!(ScheduledPost::due(&db, DUE_POST_BATCH).await.unwrap().is_empty());
    assert_eq!(TwitterPost::count_this_month(&db, account).await.unwrap(), 1);
}

#[tokio::test]
async fn only_pending_posts_can_be_deleted() {
    let (db, _dir) = setup_db().await;
    let (user, project) = create_project(&db, "alice").await;
    let (intruder, _) = create_project(&db, "mallory").await;
    let account = TwitterAccount::upsert(&db, project, "a", "a", None).await.unwrap();
    let pending = ScheduledPost::create(&db, account, "p", "2999-01-01 00:00:00").await.unwrap();
    let failed = ScheduledPost::create(&db, account, "f", "2000-01-01 00:00:00").await.unwrap();
    ScheduledPost::mark_failed(&db, failed, "boom").await.unwrap();

    assert!(Resource::ScheduledPost(pending).owned_by(&db, user).await.unwrap());
    assert!(!Resource::ScheduledPost(pending).owned_by(&db, intruder).await.unwrap());

    assert_eq!(ScheduledPost::delete_pending(&db, account, failed).await.unwrap(), 0);
    assert_eq!(ScheduledPost::delete_pending(&db, account, pending).await.unwrap(), 1);
}

#[tokio::test]
async fn youtube_channel_stats_and_cascade() {
    let (db, _dir) = setup_db().await;
    let (user, project) = create_project(&db, "alice").await;

    let channel = YoutubeChannel::upsert(
        &db,
        user,
        Some(project),
        &SaveChannel {
            channel_id: "UC123",
            channel_handle: Some("@rustacean"),
            channel_name: "Rust",
            thumbnail_url: None,
        },
    )
    .await
    .unwrap();

    let day = |subs, views| ChannelCounts {
        subscriber_count: subs,
        view_count: views,
        video_count: 3,
    };
    YoutubeStat::record(&db, channel, "2025-01-01", day(100, 1000), false).await.unwrap();
    YoutubeStat::record(&db, channel, "2025-01-02", day(120, 1500), true).await.unwrap();

    let history = YoutubeStat::history(&db, channel, 30).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].subscriber_change, 20);
    assert_eq!(history[1].view_change, 500);

    assert!(Resource::YoutubeChannel(channel).owned_by(&db, user).await.unwrap());
    assert_eq!(YoutubeChannel::delete(&db, channel).await.unwrap(), 1);
    assert!(YoutubeStat::latest(&db, channel).await.unwrap().is_none());
}

#[tokio::test]
async fn tiktok_account_is_updated_in_place_and_stats_replace_the_day() {
    let (db, _dir) = setup_db().await;
    let (_, project) = create_project(&db, "tina").await;
    assert!(TiktokAccount::latest(&db, project).await.unwrap().is_none());

    let id = TiktokAccount::upsert(&db, project, "tina", "tina", None)
        .await
        .unwrap();
    let same = TiktokAccount::upsert(&db, project, "tt-1", "tina_dances", Some("Tina"))
        .await
        .unwrap();
    assert_eq!(id, same);
    let account = TiktokAccount::latest(&db, project).await.unwrap().unwrap();
    assert_eq!(account.username, "tina_dances");
    assert_eq!(account.account_id.as_deref(), Some("tt-1"));
    assert_eq!(account.display_name.as_deref(), Some("Tina"));

    let day = |followers| TiktokCounts {
        followers_count: followers,
        likes_count: 900,
        ..TiktokCounts::default()
    };
    TiktokStat::upsert(&db, id, "2025-05-01", day(10)).await.unwrap();
    TiktokStat::upsert(&db, id, "2025-05-02", day(20)).await.unwrap();
    TiktokStat::upsert(&db, id, "2025-05-02", day(25)).await.unwrap();

    let latest = TiktokStat::latest(&db, id).await.unwrap().unwrap();
    assert_eq!(latest.recorded_date, "2025-05-02");
    assert_eq!(latest.followers_count, 25);
    assert_eq!(latest.likes_count, 900);
    assert_eq!(latest.video_count, 0);

    let rows: Option<i64> = db
        .scalar(Statement::new("SELECT COUNT(*) FROM tiktok_stats WHERE account_id = ?").bind(id))
        .await
        .unwrap();
    assert_eq!(rows, Some(2));

    db.run(Statement::new("DELETE FROM projects WHERE id = ?").bind(project))
        .await
        .unwrap();
    assert!(TiktokStat::latest(&db, id).await.unwrap().is_none());
}
