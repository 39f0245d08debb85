//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates every table used by
//! the site and the syncr tools. All statements are idempotent, so this is
//! safe to run on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Per-connection pragmas go through the connect options so every pooled
    // connection enforces foreign keys (comment/m2m rows cascade on delete)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_cache_table(pool).await?;

    // Flickr
    create_flickr_tables(pool).await?;

    // Picasa Web Albums
    create_picasaweb_tables(pool).await?;

    // YouTube
    create_youtube_tables(pool).await?;

    // Magnolia bookmarks
    create_magnolia_tables(pool).await?;

    // Generic RSS/Atom feeds
    create_genericfeed_tables(pool).await?;

    Ok(())
}

async fn execute_all(pool: &SqlitePool, statements: &[&str]) -> Result<()> {
    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Key/value cache with expiry, used by the front page
async fn create_cache_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS cache (
            cache_key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            expires TIMESTAMP NOT NULL
        )
        "#],
    )
    .await
}

async fn create_flickr_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS flickr_photo (
                flickr_id INTEGER PRIMARY KEY,
                owner TEXT NOT NULL,
                owner_nsid TEXT NOT NULL,
                title TEXT NOT NULL,
                slug TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                taken_date TIMESTAMP NOT NULL,
                upload_date TIMESTAMP NOT NULL,
                update_date TIMESTAMP NOT NULL,
                photopage_url TEXT NOT NULL,
                farm INTEGER NOT NULL,
                server INTEGER NOT NULL,
                secret TEXT NOT NULL,
                original_secret TEXT NOT NULL DEFAULT '',
                thumbnail_width INTEGER,
                thumbnail_height INTEGER,
                small_width INTEGER,
                small_height INTEGER,
                medium_width INTEGER,
                medium_height INTEGER,
                large_width INTEGER,
                large_height INTEGER,
                original_width INTEGER NOT NULL DEFAULT 0,
                original_height INTEGER NOT NULL DEFAULT 0,
                tags TEXT NOT NULL DEFAULT '',
                enable_comments INTEGER NOT NULL DEFAULT 1,
                license TEXT NOT NULL,
                geo_latitude REAL,
                geo_longitude REAL,
                geo_accuracy INTEGER,
                geo_locality TEXT NOT NULL DEFAULT '',
                geo_county TEXT NOT NULL DEFAULT '',
                geo_region TEXT NOT NULL DEFAULT '',
                geo_country TEXT NOT NULL DEFAULT '',
                exif_make TEXT NOT NULL DEFAULT '',
                exif_model TEXT NOT NULL DEFAULT '',
                exif_orientation TEXT NOT NULL DEFAULT '',
                exif_exposure TEXT NOT NULL DEFAULT '',
                exif_software TEXT NOT NULL DEFAULT '',
                exif_aperture TEXT NOT NULL DEFAULT '',
                exif_iso TEXT NOT NULL DEFAULT '',
                exif_metering_mode TEXT NOT NULL DEFAULT '',
                exif_flash TEXT NOT NULL DEFAULT '',
                exif_focal_length TEXT NOT NULL DEFAULT '',
                exif_color_space TEXT NOT NULL DEFAULT ''
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_flickr_photo_taken ON flickr_photo(taken_date)",
            r#"
            CREATE TABLE IF NOT EXISTS flickr_photo_comment (
                flickr_id TEXT PRIMARY KEY,
                photo_id INTEGER NOT NULL REFERENCES flickr_photo(flickr_id) ON DELETE CASCADE,
                author_nsid TEXT NOT NULL,
                author TEXT NOT NULL,
                pub_date TIMESTAMP NOT NULL,
                permanent_url TEXT NOT NULL,
                comment TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS flickr_photoset (
                flickr_id TEXT PRIMARY KEY,
                primary_id INTEGER REFERENCES flickr_photo(flickr_id) ON DELETE SET NULL,
                owner TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                sort_order INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS flickr_photoset_photos (
                photoset_id TEXT NOT NULL REFERENCES flickr_photoset(flickr_id) ON DELETE CASCADE,
                photo_id INTEGER NOT NULL REFERENCES flickr_photo(flickr_id) ON DELETE CASCADE,
                PRIMARY KEY (photoset_id, photo_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS flickr_favoritelist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL UNIQUE,
                sync_date TIMESTAMP NOT NULL,
                primary_id INTEGER REFERENCES flickr_photo(flickr_id) ON DELETE SET NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS flickr_favoritelist_photos (
                favoritelist_id INTEGER NOT NULL REFERENCES flickr_favoritelist(id) ON DELETE CASCADE,
                photo_id INTEGER NOT NULL REFERENCES flickr_photo(flickr_id) ON DELETE CASCADE,
                PRIMARY KEY (favoritelist_id, photo_id)
            )
            "#,
        ],
    )
    .await
}

async fn create_picasaweb_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS picasaweb_album (
                gphoto_id TEXT PRIMARY KEY,
                albumname TEXT NOT NULL,
                owner TEXT NOT NULL,
                nickname TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                updated TIMESTAMP NOT NULL,
                access TEXT NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS picasaweb_photo (
                gphoto_id TEXT PRIMARY KEY,
                updated TIMESTAMP NOT NULL,
                owner TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                taken_date TIMESTAMP NOT NULL,
                photopage_url TEXT NOT NULL DEFAULT '',
                small_url TEXT NOT NULL DEFAULT '',
                medium_url TEXT NOT NULL DEFAULT '',
                thumbnail_url TEXT NOT NULL DEFAULT '',
                content_url TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '',
                geo_latitude REAL,
                geo_longitude REAL,
                exif_model TEXT NOT NULL DEFAULT '',
                exif_make TEXT NOT NULL DEFAULT '',
                exif_exposure TEXT NOT NULL DEFAULT '',
                exif_iso TEXT NOT NULL DEFAULT '',
                exif_flash TEXT NOT NULL DEFAULT '',
                exif_focal_length TEXT NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS picasaweb_album_photos (
                album_id TEXT NOT NULL REFERENCES picasaweb_album(gphoto_id) ON DELETE CASCADE,
                photo_id TEXT NOT NULL REFERENCES picasaweb_photo(gphoto_id) ON DELETE CASCADE,
                PRIMARY KEY (album_id, photo_id)
            )
            "#,
        ],
    )
    .await
}

async fn create_youtube_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS youtube_user (
                username TEXT PRIMARY KEY,
                feed TEXT NOT NULL,
                first_name TEXT NOT NULL DEFAULT '',
                age INTEGER,
                gender TEXT NOT NULL DEFAULT '',
                thumbnail_url TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                watch_count INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS youtube_video (
                feed TEXT PRIMARY KEY,
                video_id TEXT NOT NULL,
                published TIMESTAMP NOT NULL,
                updated TIMESTAMP NOT NULL,
                title TEXT NOT NULL,
                author TEXT NOT NULL REFERENCES youtube_user(username),
                description TEXT NOT NULL DEFAULT '',
                tag_list TEXT NOT NULL DEFAULT '',
                view_count INTEGER NOT NULL DEFAULT 0,
                url TEXT NOT NULL DEFAULT '',
                thumbnail_url TEXT NOT NULL DEFAULT '',
                length INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS youtube_playlist (
                feed TEXT PRIMARY KEY,
                updated TIMESTAMP NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                author TEXT NOT NULL REFERENCES youtube_user(username),
                url TEXT NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS youtube_playlist_video (
                feed TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                original TEXT NOT NULL REFERENCES youtube_video(feed) ON DELETE CASCADE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS youtube_playlist_videos (
                playlist_feed TEXT NOT NULL REFERENCES youtube_playlist(feed) ON DELETE CASCADE,
                playlist_video_feed TEXT NOT NULL REFERENCES youtube_playlist_video(feed) ON DELETE CASCADE,
                PRIMARY KEY (playlist_feed, playlist_video_feed)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS youtube_user_playlists (
                username TEXT NOT NULL REFERENCES youtube_user(username) ON DELETE CASCADE,
                playlist_feed TEXT NOT NULL REFERENCES youtube_playlist(feed) ON DELETE CASCADE,
                PRIMARY KEY (username, playlist_feed)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS youtube_user_favorites (
                username TEXT NOT NULL REFERENCES youtube_user(username) ON DELETE CASCADE,
                video_feed TEXT NOT NULL REFERENCES youtube_video(feed) ON DELETE CASCADE,
                PRIMARY KEY (username, video_feed)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS youtube_user_uploads (
                username TEXT NOT NULL REFERENCES youtube_user(username) ON DELETE CASCADE,
                video_feed TEXT NOT NULL REFERENCES youtube_video(feed) ON DELETE CASCADE,
                PRIMARY KEY (username, video_feed)
            )
            "#,
        ],
    )
    .await
}

async fn create_magnolia_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS magnolia_link (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            slug TEXT NOT NULL,
            magnolia_id TEXT,
            url TEXT NOT NULL,
            description TEXT,
            screen_url TEXT NOT NULL DEFAULT '',
            rating TEXT NOT NULL DEFAULT '0',
            add_date TIMESTAMP NOT NULL UNIQUE,
            tags TEXT NOT NULL DEFAULT ''
        )
        "#],
    )
    .await
}

async fn create_genericfeed_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS genericfeed_feed (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                subtitle TEXT,
                version TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS genericfeed_entry (
                id TEXT PRIMARY KEY,
                feed_id TEXT NOT NULL REFERENCES genericfeed_feed(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                author TEXT,
                summary TEXT,
                content TEXT,
                published TIMESTAMP,
                updated TIMESTAMP
            )
            "#,
        ],
    )
    .await
}
