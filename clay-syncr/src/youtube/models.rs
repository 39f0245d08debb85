//! YouTube tables
//!
//! Rows are get-or-create: a second sync of the same feed URL (or
//! username) returns the stored row untouched.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct YoutubeUser {
    pub username: String,
    pub feed: String,
    pub first_name: String,
    pub age: Option<i64>,
    pub gender: String,
    pub thumbnail_url: String,
    pub url: String,
    pub watch_count: i64,
}

impl fmt::Display for YoutubeUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    pub feed: String,
    pub video_id: String,
    pub published: NaiveDateTime,
    pub updated: NaiveDateTime,
    pub title: String,
    pub author: String,
    pub description: String,
    pub tag_list: String,
    pub view_count: i64,
    pub url: String,
    pub thumbnail_url: String,
    /// Seconds
    pub length: i64,
}

impl fmt::Display for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Playlist {
    pub feed: String,
    pub updated: NaiveDateTime,
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// A video as it appears in a playlist, with the playlist's own title and
/// description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlaylistVideo {
    pub feed: String,
    pub title: String,
    pub description: String,
    /// Feed URL of the original video
    pub original: String,
}

impl fmt::Display for PlaylistVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

pub async fn get_or_create_user(pool: &SqlitePool, user: &YoutubeUser) -> Result<(YoutubeUser, bool)> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO youtube_user (username, feed, first_name, age, gender, thumbnail_url, url, watch_count)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(username) DO NOTHING
        "#,
    )
    .bind(&user.username)
    .bind(&user.feed)
    .bind(&user.first_name)
    .bind(user.age)
    .bind(&user.gender)
    .bind(&user.thumbnail_url)
    .bind(&user.url)
    .bind(user.watch_count)
    .execute(pool)
    .await?;

    let stored = sqlx::query_as("SELECT * FROM youtube_user WHERE username = ?")
        .bind(&user.username)
        .fetch_one(pool)
        .await?;
    Ok((stored, inserted.rows_affected() > 0))
}

pub async fn get_or_create_video(pool: &SqlitePool, video: &Video) -> Result<(Video, bool)> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO youtube_video (
            feed, video_id, published, updated, title, author, description,
            tag_list, view_count, url, thumbnail_url, length
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(feed) DO NOTHING
        "#,
    )
    .bind(&video.feed)
    .bind(&video.video_id)
    .bind(video.published)
    .bind(video.updated)
    .bind(&video.title)
    .bind(&video.author)
    .bind(&video.description)
    .bind(&video.tag_list)
    .bind(video.view_count)
    .bind(&video.url)
    .bind(&video.thumbnail_url)
    .bind(video.length)
    .execute(pool)
    .await?;

    let stored = sqlx::query_as("SELECT * FROM youtube_video WHERE feed = ?")
        .bind(&video.feed)
        .fetch_one(pool)
        .await?;
    Ok((stored, inserted.rows_affected() > 0))
}

pub async fn get_or_create_playlist(pool: &SqlitePool, playlist: &Playlist) -> Result<(Playlist, bool)> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO youtube_playlist (feed, updated, title, description, author, url)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(feed) DO NOTHING
        "#,
    )
    .bind(&playlist.feed)
    .bind(playlist.updated)
    .bind(&playlist.title)
    .bind(&playlist.description)
    .bind(&playlist.author)
    .bind(&playlist.url)
    .execute(pool)
    .await?;

    let stored = sqlx::query_as("SELECT * FROM youtube_playlist WHERE feed = ?")
        .bind(&playlist.feed)
        .fetch_one(pool)
        .await?;
    Ok((stored, inserted.rows_affected() > 0))
}

pub async fn get_or_create_playlist_video(
    pool: &SqlitePool,
    video: &PlaylistVideo,
) -> Result<(PlaylistVideo, bool)> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO youtube_playlist_video (feed, title, description, original)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(feed) DO NOTHING
        "#,
    )
    .bind(&video.feed)
    .bind(&video.title)
    .bind(&video.description)
    .bind(&video.original)
    .execute(pool)
    .await?;

    let stored = sqlx::query_as("SELECT * FROM youtube_playlist_video WHERE feed = ?")
        .bind(&video.feed)
        .fetch_one(pool)
        .await?;
    Ok((stored, inserted.rows_affected() > 0))
}

/// Per-user video lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserVideoList {
    Favorites,
    Uploads,
}

impl UserVideoList {
    fn table(self) -> &'static str {
        match self {
            UserVideoList::Favorites => "youtube_user_favorites",
            UserVideoList::Uploads => "youtube_user_uploads",
        }
    }
}

pub async fn add_user_video(
    pool: &SqlitePool,
    list: UserVideoList,
    username: &str,
    video_feed: &str,
) -> Result<()> {
    let sql = format!(
        "INSERT OR IGNORE INTO {} (username, video_feed) VALUES (?, ?)",
        list.table()
    );
    sqlx::query(&sql)
        .bind(username)
        .bind(video_feed)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn user_videos(pool: &SqlitePool, list: UserVideoList, username: &str) -> Result<Vec<Video>> {
    let sql = format!(
        r#"
        SELECT v.* FROM youtube_video v
        JOIN {} l ON l.video_feed = v.feed
        WHERE l.username = ?
        ORDER BY v.published DESC
        "#,
        list.table()
    );
    let videos = sqlx::query_as(&sql).bind(username).fetch_all(pool).await?;
    Ok(videos)
}

pub async fn add_user_playlist(pool: &SqlitePool, username: &str, playlist_feed: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO youtube_user_playlists (username, playlist_feed) VALUES (?, ?)")
        .bind(username)
        .bind(playlist_feed)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn user_playlists(pool: &SqlitePool, username: &str) -> Result<Vec<Playlist>> {
    let playlists = sqlx::query_as(
        r#"
        SELECT p.* FROM youtube_playlist p
        JOIN youtube_user_playlists up ON up.playlist_feed = p.feed
        WHERE up.username = ?
        ORDER BY p.title
        "#,
    )
    .bind(username)
    .fetch_all(pool)
    .await?;
    Ok(playlists)
}

pub async fn add_playlist_video(pool: &SqlitePool, playlist_feed: &str, video_feed: &str) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO youtube_playlist_videos (playlist_feed, playlist_video_feed) VALUES (?, ?)",
    )
    .bind(playlist_feed)
    .bind(video_feed)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn playlist_videos(pool: &SqlitePool, playlist_feed: &str) -> Result<Vec<PlaylistVideo>> {
    let videos = sqlx::query_as(
        r#"
        SELECT pv.* FROM youtube_playlist_video pv
        JOIN youtube_playlist_videos l ON l.playlist_video_feed = pv.feed
        WHERE l.playlist_feed = ?
        "#,
    )
    .bind(playlist_feed)
    .fetch_all(pool)
    .await?;
    Ok(videos)
}
