//! Tests for database initialization
//!
//! - Database file is created on first run
//! - Re-opening an existing database is harmless
//! - Every syncr table exists after init
//! - Foreign keys cascade on every pooled connection

use clay_common::db::init::init_database;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("clay.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("clay.db");

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());
    drop(pool1);

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("clay.db")).await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    let expected = [
        "cache",
        "flickr_favoritelist",
        "flickr_favoritelist_photos",
        "flickr_photo",
        "flickr_photo_comment",
        "flickr_photoset",
        "flickr_photoset_photos",
        "genericfeed_entry",
        "genericfeed_feed",
        "magnolia_link",
        "picasaweb_album",
        "picasaweb_album_photos",
        "picasaweb_photo",
        "youtube_playlist",
        "youtube_playlist_video",
        "youtube_playlist_videos",
        "youtube_user",
        "youtube_user_favorites",
        "youtube_user_playlists",
        "youtube_user_uploads",
        "youtube_video",
    ];

    for name in expected {
        assert!(tables.iter().any(|t| t == name), "Missing table: {}", name);
    }
}

#[tokio::test]
async fn test_foreign_keys_enabled() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("clay.db")).await.unwrap();

    // Several connections, all must report foreign_keys = 1
    for _ in 0..3 {
        let mut conn = pool.acquire().await.unwrap();
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }
}

#[tokio::test]
async fn test_comment_requires_photo() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("clay.db")).await.unwrap();

    let result = sqlx::query(
        r#"
        INSERT INTO flickr_photo_comment
            (flickr_id, photo_id, author_nsid, author, pub_date, permanent_url, comment)
        VALUES ('c1', 42, 'nsid', 'someone', '2010-01-01 00:00:00', 'http://x', 'hi')
        "#,
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Orphan comment should violate the foreign key");
}
