//! Picasa Web Albums tables

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Photo {
    pub gphoto_id: String,
    pub updated: NaiveDateTime,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub taken_date: NaiveDateTime,
    pub photopage_url: String,
    pub small_url: String,
    pub medium_url: String,
    pub thumbnail_url: String,
    pub content_url: String,
    pub tags: String,
    pub geo_latitude: Option<f64>,
    pub geo_longitude: Option<f64>,
    pub exif_model: String,
    pub exif_make: String,
    pub exif_exposure: String,
    pub exif_iso: String,
    pub exif_flash: String,
    pub exif_focal_length: String,
}

impl fmt::Display for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Album {
    pub gphoto_id: String,
    pub albumname: String,
    pub owner: String,
    pub nickname: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub updated: NaiveDateTime,
    pub access: String,
}

impl Album {
    /// Photos of the album, oldest taken first
    pub async fn photos(&self, pool: &SqlitePool) -> Result<Vec<Photo>> {
        let photos = sqlx::query_as(
            r#"
            SELECT p.* FROM picasaweb_photo p
            JOIN picasaweb_album_photos ap ON ap.photo_id = p.gphoto_id
            WHERE ap.album_id = ?
            ORDER BY p.taken_date
            "#,
        )
        .bind(&self.gphoto_id)
        .fetch_all(pool)
        .await?;
        Ok(photos)
    }
}

impl fmt::Display for Album {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} album by {}", self.title, self.owner)
    }
}

pub async fn load_photo(pool: &SqlitePool, gphoto_id: &str) -> Result<Option<Photo>> {
    let photo = sqlx::query_as("SELECT * FROM picasaweb_photo WHERE gphoto_id = ?")
        .bind(gphoto_id)
        .fetch_optional(pool)
        .await?;
    Ok(photo)
}

pub async fn save_photo(pool: &SqlitePool, photo: &Photo) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO picasaweb_photo (
            gphoto_id, updated, owner, title, description, taken_date,
            photopage_url, small_url, medium_url, thumbnail_url, content_url, tags,
            geo_latitude, geo_longitude,
            exif_model, exif_make, exif_exposure, exif_iso, exif_flash, exif_focal_length
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(gphoto_id) DO UPDATE SET
            updated = excluded.updated,
            owner = excluded.owner,
            title = excluded.title,
            description = excluded.description,
            taken_date = excluded.taken_date,
            photopage_url = excluded.photopage_url,
            small_url = excluded.small_url,
            medium_url = excluded.medium_url,
            thumbnail_url = excluded.thumbnail_url,
            content_url = excluded.content_url,
            tags = excluded.tags,
            geo_latitude = excluded.geo_latitude,
            geo_longitude = excluded.geo_longitude,
            exif_model = excluded.exif_model,
            exif_make = excluded.exif_make,
            exif_exposure = excluded.exif_exposure,
            exif_iso = excluded.exif_iso,
            exif_flash = excluded.exif_flash,
            exif_focal_length = excluded.exif_focal_length
        "#,
    )
    .bind(&photo.gphoto_id)
    .bind(photo.updated)
    .bind(&photo.owner)
    .bind(&photo.title)
    .bind(&photo.description)
    .bind(photo.taken_date)
    .bind(&photo.photopage_url)
    .bind(&photo.small_url)
    .bind(&photo.medium_url)
    .bind(&photo.thumbnail_url)
    .bind(&photo.content_url)
    .bind(&photo.tags)
    .bind(photo.geo_latitude)
    .bind(photo.geo_longitude)
    .bind(&photo.exif_model)
    .bind(&photo.exif_make)
    .bind(&photo.exif_exposure)
    .bind(&photo.exif_iso)
    .bind(&photo.exif_flash)
    .bind(&photo.exif_focal_length)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_photo(pool: &SqlitePool, gphoto_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM picasaweb_photo WHERE gphoto_id = ?")
        .bind(gphoto_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn load_album(pool: &SqlitePool, gphoto_id: &str) -> Result<Option<Album>> {
    let album = sqlx::query_as("SELECT * FROM picasaweb_album WHERE gphoto_id = ?")
        .bind(gphoto_id)
        .fetch_optional(pool)
        .await?;
    Ok(album)
}

pub async fn save_album(pool: &SqlitePool, album: &Album) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO picasaweb_album (
            gphoto_id, albumname, owner, nickname, title, description, location, updated, access
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(gphoto_id) DO UPDATE SET
            albumname = excluded.albumname,
            owner = excluded.owner,
            nickname = excluded.nickname,
            title = excluded.title,
            description = excluded.description,
            location = excluded.location,
            updated = excluded.updated,
            access = excluded.access
        "#,
    )
    .bind(&album.gphoto_id)
    .bind(&album.albumname)
    .bind(&album.owner)
    .bind(&album.nickname)
    .bind(&album.title)
    .bind(&album.description)
    .bind(&album.location)
    .bind(album.updated)
    .bind(&album.access)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn add_photo_to_album(pool: &SqlitePool, album_id: &str, photo_id: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO picasaweb_album_photos (album_id, photo_id) VALUES (?, ?)")
        .bind(album_id)
        .bind(photo_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Ids of the photos linked to an album
pub async fn album_photo_ids(pool: &SqlitePool, album_id: &str) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar("SELECT photo_id FROM picasaweb_album_photos WHERE album_id = ?")
        .bind(album_id)
        .fetch_all(pool)
        .await?;
    Ok(ids)
}
