//! Flickr tables: photos, comments, photo sets and favorite lists

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;

use clay_common::text::{escape_html, strip_tags, truncate_words};

use crate::Result;

/// Flickr license codes and their display names
pub const FLICKR_LICENSES: [(&str, &str); 7] = [
    ("0", "All Rights Reserved"),
    ("1", "Attribution-NonCommercial-ShareAlike License"),
    ("2", "Attribution-NonCommercial License"),
    ("3", "Attribution-NonCommercial-NoDerivs License"),
    ("4", "Attribution License"),
    ("5", "Attribution-ShareAlike License"),
    ("6", "Attribution-NoDerivs License"),
];

/// A synced Flickr photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Photo {
    pub flickr_id: i64,
    pub owner: String,
    pub owner_nsid: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub taken_date: NaiveDateTime,
    pub upload_date: NaiveDateTime,
    pub update_date: NaiveDateTime,
    pub photopage_url: String,
    pub farm: i64,
    pub server: i64,
    pub secret: String,
    pub original_secret: String,
    pub thumbnail_width: Option<i64>,
    pub thumbnail_height: Option<i64>,
    pub small_width: Option<i64>,
    pub small_height: Option<i64>,
    pub medium_width: Option<i64>,
    pub medium_height: Option<i64>,
    pub large_width: Option<i64>,
    pub large_height: Option<i64>,
    pub original_width: i64,
    pub original_height: i64,
    pub tags: String,
    pub enable_comments: bool,
    pub license: String,
    pub geo_latitude: Option<f64>,
    pub geo_longitude: Option<f64>,
    pub geo_accuracy: Option<i64>,
    pub geo_locality: String,
    pub geo_county: String,
    pub geo_region: String,
    pub geo_country: String,
    pub exif_make: String,
    pub exif_model: String,
    pub exif_orientation: String,
    pub exif_exposure: String,
    pub exif_software: String,
    pub exif_aperture: String,
    pub exif_iso: String,
    pub exif_metering_mode: String,
    pub exif_flash: String,
    pub exif_focal_length: String,
    pub exif_color_space: String,
}

impl Photo {
    /// `/photos/YYYY/MM/DD/slug/`
    pub fn absolute_url(&self) -> String {
        format!(
            "/photos/{}/{}/",
            self.taken_date.format("%Y/%m/%d"),
            self.slug
        )
    }

    fn photo_url(&self, size: &str, secret: Option<&str>) -> String {
        let size = if size.is_empty() {
            String::new()
        } else {
            format!("_{}", size)
        };
        format!(
            "http://farm{}.static.flickr.com/{}/{}_{}{}.jpg",
            self.farm,
            self.server,
            self.flickr_id,
            secret.unwrap_or(&self.secret),
            size
        )
    }

    pub fn square_url(&self) -> String {
        self.photo_url("s", None)
    }

    pub fn thumbnail_url(&self) -> String {
        self.photo_url("t", None)
    }

    pub fn small_url(&self) -> String {
        self.photo_url("m", None)
    }

    /// Medium image, or the original when Flickr reported no medium size
    pub fn medium_url(&self) -> String {
        if self.has_medium_photo() {
            self.photo_url("", None)
        } else {
            self.original_url()
        }
    }

    /// Large image, or the original when Flickr reported no large size
    pub fn large_url(&self) -> String {
        if self.has_large_photo() {
            self.photo_url("b", None)
        } else {
            self.original_url()
        }
    }

    pub fn original_url(&self) -> String {
        if self.original_secret.is_empty() {
            self.photo_url("o", None)
        } else {
            self.photo_url("o", Some(&self.original_secret))
        }
    }

    pub fn has_medium_photo(&self) -> bool {
        self.medium_width.is_some()
    }

    pub fn has_large_photo(&self) -> bool {
        self.large_width.is_some()
    }

    pub fn has_original_photo(&self) -> bool {
        self.original_width > 0
    }

    pub fn license_name(&self) -> &str {
        FLICKR_LICENSES
            .iter()
            .find(|(code, _)| *code == self.license)
            .map(|(_, name)| *name)
            .unwrap_or(&self.license)
    }

    /// Next photo of `photoset_id` by taken date
    pub async fn next_in_set(&self, pool: &SqlitePool, photoset_id: &str) -> Result<Option<Photo>> {
        let photo = sqlx::query_as(
            r#"
            SELECT p.* FROM flickr_photo p
            JOIN flickr_photoset_photos sp ON sp.photo_id = p.flickr_id
            WHERE sp.photoset_id = ? AND p.taken_date > ?
            ORDER BY p.taken_date ASC
            LIMIT 1
            "#,
        )
        .bind(photoset_id)
        .bind(self.taken_date)
        .fetch_optional(pool)
        .await?;
        Ok(photo)
    }

    /// Previous photo of `photoset_id` by taken date
    pub async fn previous_in_set(&self, pool: &SqlitePool, photoset_id: &str) -> Result<Option<Photo>> {
        let photo = sqlx::query_as(
            r#"
            SELECT p.* FROM flickr_photo p
            JOIN flickr_photoset_photos sp ON sp.photo_id = p.flickr_id
            WHERE sp.photoset_id = ? AND p.taken_date < ?
            ORDER BY p.taken_date DESC
            LIMIT 1
            "#,
        )
        .bind(photoset_id)
        .bind(self.taken_date)
        .fetch_optional(pool)
        .await?;
        Ok(photo)
    }
}

impl fmt::Display for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Load a photo by Flickr id
pub async fn load_photo(pool: &SqlitePool, flickr_id: i64) -> Result<Option<Photo>> {
    let photo = sqlx::query_as("SELECT * FROM flickr_photo WHERE flickr_id = ?")
        .bind(flickr_id)
        .fetch_optional(pool)
        .await?;
    Ok(photo)
}

/// All photos, newest taken first
pub async fn list_photos(pool: &SqlitePool) -> Result<Vec<Photo>> {
    let photos = sqlx::query_as("SELECT * FROM flickr_photo ORDER BY taken_date DESC")
        .fetch_all(pool)
        .await?;
    Ok(photos)
}

/// Every photo in random order, as shown on the front page
pub async fn random_photos(pool: &SqlitePool) -> Result<Vec<Photo>> {
    let photos = sqlx::query_as("SELECT * FROM flickr_photo ORDER BY RANDOM()")
        .fetch_all(pool)
        .await?;
    Ok(photos)
}

pub async fn count_photos(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM flickr_photo")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Delete a photo (comments and set memberships cascade)
pub async fn delete_photo(pool: &SqlitePool, flickr_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM flickr_photo WHERE flickr_id = ?")
        .bind(flickr_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert or overwrite a photo row. `enable_comments` is only written on
/// insert so a locally disabled photo stays disabled across syncs.
pub async fn save_photo(pool: &SqlitePool, photo: &Photo) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO flickr_photo (
            flickr_id, owner, owner_nsid, title, slug, description,
            taken_date, upload_date, update_date, photopage_url,
            farm, server, secret, original_secret,
            thumbnail_width, thumbnail_height, small_width, small_height,
            medium_width, medium_height, large_width, large_height,
            original_width, original_height, tags, enable_comments, license,
            geo_latitude, geo_longitude, geo_accuracy,
            geo_locality, geo_county, geo_region, geo_country,
            exif_make, exif_model, exif_orientation, exif_exposure,
            exif_software, exif_aperture, exif_iso, exif_metering_mode,
            exif_flash, exif_focal_length, exif_color_space
        ) VALUES (
            ?, ?, ?, ?, ?, ?,
            ?, ?, ?, ?,
            ?, ?, ?, ?,
            ?, ?, ?, ?,
            ?, ?, ?, ?,
            ?, ?, ?, ?, ?,
            ?, ?, ?,
            ?, ?, ?, ?,
            ?, ?, ?, ?,
            ?, ?, ?, ?,
            ?, ?, ?
        )
        ON CONFLICT(flickr_id) DO UPDATE SET
            owner = excluded.owner,
            owner_nsid = excluded.owner_nsid,
            title = excluded.title,
            slug = excluded.slug,
            description = excluded.description,
            taken_date = excluded.taken_date,
            upload_date = excluded.upload_date,
            update_date = excluded.update_date,
            photopage_url = excluded.photopage_url,
            farm = excluded.farm,
            server = excluded.server,
            secret = excluded.secret,
            original_secret = excluded.original_secret,
            thumbnail_width = excluded.thumbnail_width,
            thumbnail_height = excluded.thumbnail_height,
            small_width = excluded.small_width,
            small_height = excluded.small_height,
            medium_width = excluded.medium_width,
            medium_height = excluded.medium_height,
            large_width = excluded.large_width,
            large_height = excluded.large_height,
            original_width = excluded.original_width,
            original_height = excluded.original_height,
            tags = excluded.tags,
            license = excluded.license,
            geo_latitude = excluded.geo_latitude,
            geo_longitude = excluded.geo_longitude,
            geo_accuracy = excluded.geo_accuracy,
            geo_locality = excluded.geo_locality,
            geo_county = excluded.geo_county,
            geo_region = excluded.geo_region,
            geo_country = excluded.geo_country,
            exif_make = excluded.exif_make,
            exif_model = excluded.exif_model,
            exif_orientation = excluded.exif_orientation,
            exif_exposure = excluded.exif_exposure,
            exif_software = excluded.exif_software,
            exif_aperture = excluded.exif_aperture,
            exif_iso = excluded.exif_iso,
            exif_metering_mode = excluded.exif_metering_mode,
            exif_flash = excluded.exif_flash,
            exif_focal_length = excluded.exif_focal_length,
            exif_color_space = excluded.exif_color_space
        "#,
    )
    .bind(photo.flickr_id)
    .bind(&photo.owner)
    .bind(&photo.owner_nsid)
    .bind(&photo.title)
    .bind(&photo.slug)
    .bind(&photo.description)
    .bind(photo.taken_date)
    .bind(photo.upload_date)
    .bind(photo.update_date)
    .bind(&photo.photopage_url)
    .bind(photo.farm)
    .bind(photo.server)
    .bind(&photo.secret)
    .bind(&photo.original_secret)
    .bind(photo.thumbnail_width)
    .bind(photo.thumbnail_height)
    .bind(photo.small_width)
    .bind(photo.small_height)
    .bind(photo.medium_width)
    .bind(photo.medium_height)
    .bind(photo.large_width)
    .bind(photo.large_height)
    .bind(photo.original_width)
    .bind(photo.original_height)
    .bind(&photo.tags)
    .bind(photo.enable_comments)
    .bind(&photo.license)
    .bind(photo.geo_latitude)
    .bind(photo.geo_longitude)
    .bind(photo.geo_accuracy)
    .bind(&photo.geo_locality)
    .bind(&photo.geo_county)
    .bind(&photo.geo_region)
    .bind(&photo.geo_country)
    .bind(&photo.exif_make)
    .bind(&photo.exif_model)
    .bind(&photo.exif_orientation)
    .bind(&photo.exif_exposure)
    .bind(&photo.exif_software)
    .bind(&photo.exif_aperture)
    .bind(&photo.exif_iso)
    .bind(&photo.exif_metering_mode)
    .bind(&photo.exif_flash)
    .bind(&photo.exif_focal_length)
    .bind(&photo.exif_color_space)
    .execute(pool)
    .await?;

    Ok(())
}

/// A comment left on a photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PhotoComment {
    pub flickr_id: String,
    pub photo_id: i64,
    pub author_nsid: String,
    pub author: String,
    pub pub_date: NaiveDateTime,
    pub permanent_url: String,
    pub comment: String,
}

impl PhotoComment {
    /// Comment text without markup, cut to `num` words (6 is the usual)
    pub fn short_comment(&self, num: usize) -> String {
        truncate_words(&strip_tags(&self.comment), num)
    }

    pub fn absolute_url(&self) -> &str {
        &self.permanent_url
    }
}

impl fmt::Display for PhotoComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} said: {}", self.author, self.short_comment(4))
    }
}

/// Insert a comment unless one with the same id exists. Returns whether a
/// row was created.
pub async fn create_comment_if_missing(pool: &SqlitePool, comment: &PhotoComment) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO flickr_photo_comment (
            flickr_id, photo_id, author_nsid, author, pub_date, permanent_url, comment
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(flickr_id) DO NOTHING
        "#,
    )
    .bind(&comment.flickr_id)
    .bind(comment.photo_id)
    .bind(&comment.author_nsid)
    .bind(&comment.author)
    .bind(comment.pub_date)
    .bind(&comment.permanent_url)
    .bind(&comment.comment)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Comments of a photo, oldest first
pub async fn comments_for_photo(pool: &SqlitePool, photo_id: i64) -> Result<Vec<PhotoComment>> {
    let comments = sqlx::query_as(
        "SELECT * FROM flickr_photo_comment WHERE photo_id = ? ORDER BY pub_date",
    )
    .bind(photo_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}

/// A Flickr photo set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PhotoSet {
    pub flickr_id: String,
    pub primary_id: Option<i64>,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub sort_order: i64,
}

/// First and last taken dates of a set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PhotoSet {
    pub fn absolute_url(&self) -> String {
        format!("/photos/sets/{}/", self.flickr_id)
    }

    /// Member photos ordered by taken date
    pub async fn photos(&self, pool: &SqlitePool) -> Result<Vec<Photo>> {
        let photos = sqlx::query_as(
            r#"
            SELECT p.* FROM flickr_photo p
            JOIN flickr_photoset_photos sp ON sp.photo_id = p.flickr_id
            WHERE sp.photoset_id = ?
            ORDER BY p.taken_date
            "#,
        )
        .bind(&self.flickr_id)
        .fetch_all(pool)
        .await?;
        Ok(photos)
    }

    /// The primary photo, else the first member, else nothing
    pub async fn highlight(&self, pool: &SqlitePool) -> Result<Option<Photo>> {
        if let Some(primary_id) = self.primary_id {
            if let Some(photo) = load_photo(pool, primary_id).await? {
                return Ok(Some(photo));
            }
        }
        Ok(self.photos(pool).await?.into_iter().next())
    }

    /// `None` for an empty set
    pub async fn time_period(&self, pool: &SqlitePool) -> Result<Option<TimePeriod>> {
        let row: (Option<NaiveDateTime>, Option<NaiveDateTime>) = sqlx::query_as(
            r#"
            SELECT MIN(p.taken_date), MAX(p.taken_date) FROM flickr_photo p
            JOIN flickr_photoset_photos sp ON sp.photo_id = p.flickr_id
            WHERE sp.photoset_id = ?
            "#,
        )
        .bind(&self.flickr_id)
        .fetch_one(pool)
        .await?;

        Ok(match row {
            (Some(start), Some(end)) => Some(TimePeriod { start, end }),
            _ => None,
        })
    }

    /// Linked 75x75 square of the primary photo
    pub async fn primary_photo_html(&self, pool: &SqlitePool) -> Result<Option<String>> {
        let Some(primary_id) = self.primary_id else {
            return Ok(None);
        };
        let Some(photo) = load_photo(pool, primary_id).await? else {
            return Ok(None);
        };
        Ok(Some(format!(
            r#"<a href="{}"><img src="{}" width="75" height="75" alt="{}" /></a>"#,
            photo.absolute_url(),
            photo.square_url(),
            escape_html(&photo.title)
        )))
    }
}

impl fmt::Display for PhotoSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} photo set by {}", self.title, self.owner)
    }
}

pub async fn load_photoset(pool: &SqlitePool, flickr_id: &str) -> Result<Option<PhotoSet>> {
    let set = sqlx::query_as("SELECT * FROM flickr_photoset WHERE flickr_id = ?")
        .bind(flickr_id)
        .fetch_optional(pool)
        .await?;
    Ok(set)
}

/// All sets in display order
pub async fn list_photosets(pool: &SqlitePool) -> Result<Vec<PhotoSet>> {
    let sets = sqlx::query_as("SELECT * FROM flickr_photoset ORDER BY sort_order")
        .fetch_all(pool)
        .await?;
    Ok(sets)
}

pub async fn save_photoset(pool: &SqlitePool, set: &PhotoSet) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO flickr_photoset (flickr_id, primary_id, owner, title, description, sort_order)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(flickr_id) DO UPDATE SET
            primary_id = excluded.primary_id,
            owner = excluded.owner,
            title = excluded.title,
            description = excluded.description,
            sort_order = excluded.sort_order
        "#,
    )
    .bind(&set.flickr_id)
    .bind(set.primary_id)
    .bind(&set.owner)
    .bind(&set.title)
    .bind(&set.description)
    .bind(set.sort_order)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn add_photo_to_set(pool: &SqlitePool, photoset_id: &str, photo_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO flickr_photoset_photos (photoset_id, photo_id) VALUES (?, ?)",
    )
    .bind(photoset_id)
    .bind(photo_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// A user's public favorites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FavoriteList {
    pub id: i64,
    pub owner: String,
    pub sync_date: NaiveDateTime,
    pub primary_id: Option<i64>,
}

impl FavoriteList {
    pub async fn photos(&self, pool: &SqlitePool) -> Result<Vec<Photo>> {
        let photos = sqlx::query_as(
            r#"
            SELECT p.* FROM flickr_photo p
            JOIN flickr_favoritelist_photos fp ON fp.photo_id = p.flickr_id
            WHERE fp.favoritelist_id = ?
            ORDER BY p.taken_date DESC
            "#,
        )
        .bind(self.id)
        .fetch_all(pool)
        .await?;
        Ok(photos)
    }

    pub async fn num_photos(&self, pool: &SqlitePool) -> Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM flickr_favoritelist_photos WHERE favoritelist_id = ?",
        )
        .bind(self.id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}

impl fmt::Display for FavoriteList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'s favorite photos", self.owner)
    }
}

/// Get the owner's list, creating it with `sync_date` when missing
pub async fn get_or_create_favorite_list(
    pool: &SqlitePool,
    owner: &str,
    sync_date: NaiveDateTime,
) -> Result<(FavoriteList, bool)> {
    let inserted = sqlx::query(
        "INSERT INTO flickr_favoritelist (owner, sync_date) VALUES (?, ?) ON CONFLICT(owner) DO NOTHING",
    )
    .bind(owner)
    .bind(sync_date)
    .execute(pool)
    .await?;

    let list = sqlx::query_as("SELECT * FROM flickr_favoritelist WHERE owner = ?")
        .bind(owner)
        .fetch_one(pool)
        .await?;
    Ok((list, inserted.rows_affected() > 0))
}

pub async fn add_photo_to_favorites(pool: &SqlitePool, list_id: i64, photo_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO flickr_favoritelist_photos (favoritelist_id, photo_id) VALUES (?, ?)",
    )
    .bind(list_id)
    .bind(photo_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_favorites_primary(pool: &SqlitePool, list_id: i64, photo_id: i64) -> Result<()> {
    sqlx::query("UPDATE flickr_favoritelist SET primary_id = ? WHERE id = ?")
        .bind(photo_id)
        .bind(list_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clay_common::db::init_database;
    use tempfile::TempDir;

    pub fn sample_photo(flickr_id: i64, slug: &str, taken: NaiveDateTime) -> Photo {
        Photo {
            flickr_id,
            owner: "samuelclay".into(),
            owner_nsid: "12@N00".into(),
            title: "Brooklyn Bridge".into(),
            slug: slug.into(),
            description: String::new(),
            taken_date: taken,
            upload_date: taken,
            update_date: taken,
            photopage_url: format!("http://www.flickr.com/photos/samuelclay/{}/", flickr_id),
            farm: 1,
            server: 45,
            secret: "abc123".into(),
            original_secret: String::new(),
            thumbnail_width: Some(100),
            thumbnail_height: Some(75),
            small_width: Some(240),
            small_height: Some(180),
            medium_width: None,
            medium_height: None,
            large_width: None,
            large_height: None,
            original_width: 0,
            original_height: 0,
            tags: "bridge brooklyn".into(),
            enable_comments: true,
            license: "4".into(),
            geo_latitude: None,
            geo_longitude: None,
            geo_accuracy: None,
            geo_locality: String::new(),
            geo_county: String::new(),
            geo_region: String::new(),
            geo_country: String::new(),
            exif_make: String::new(),
            exif_model: String::new(),
            exif_orientation: String::new(),
            exif_exposure: String::new(),
            exif_software: String::new(),
            exif_aperture: String::new(),
            exif_iso: String::new(),
            exif_metering_mode: String::new(),
            exif_flash: String::new(),
            exif_focal_length: String::new(),
            exif_color_space: String::new(),
        }
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2008, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    async fn setup() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("flickr.db")).await.unwrap();
        (dir, pool)
    }

    #[test]
    fn test_photo_urls() {
        let mut photo = sample_photo(2345, "bridge", at(3, 10));
        assert_eq!(photo.absolute_url(), "/photos/2008/05/03/bridge/");
        assert_eq!(photo.square_url(), "http://farm1.static.flickr.com/45/2345_abc123_s.jpg");
        assert_eq!(photo.small_url(), "http://farm1.static.flickr.com/45/2345_abc123_m.jpg");

        // No medium or large size known: both fall back to the original
        assert_eq!(photo.medium_url(), "http://farm1.static.flickr.com/45/2345_abc123_o.jpg");
        assert_eq!(photo.large_url(), photo.original_url());

        photo.medium_width = Some(500);
        photo.original_secret = "fff".into();
        assert_eq!(photo.medium_url(), "http://farm1.static.flickr.com/45/2345_abc123.jpg");
        assert_eq!(photo.original_url(), "http://farm1.static.flickr.com/45/2345_fff_o.jpg");
        assert!(!photo.has_original_photo());
    }

    #[test]
    fn test_license_and_display() {
        let mut photo = sample_photo(1, "a", at(1, 0));
        assert_eq!(photo.license_name(), "Attribution License");
        photo.license = "9".into();
        assert_eq!(photo.license_name(), "9");
        assert_eq!(photo.to_string(), "Brooklyn Bridge");
    }

    #[test]
    fn test_short_comment() {
        let comment = PhotoComment {
            flickr_id: "c1".into(),
            photo_id: 1,
            author_nsid: "99@N00".into(),
            author: "Ehudphilip".into(),
            pub_date: at(1, 0),
            permanent_url: "http://flickr.com/#c1".into(),
            comment: "<b>Great</b> shot, love the light on the water here".into(),
        };
        assert_eq!(comment.short_comment(6), "Great shot, love the light on ...");
        assert_eq!(comment.to_string(), "Ehudphilip said: Great shot, love the ...");
    }

    #[tokio::test]
    async fn test_save_photo_keeps_enable_comments() {
        let (_dir, pool) = setup().await;
        let mut photo = sample_photo(10, "bridge", at(3, 10));
        save_photo(&pool, &photo).await.unwrap();

        sqlx::query("UPDATE flickr_photo SET enable_comments = 0 WHERE flickr_id = 10")
            .execute(&pool)
            .await
            .unwrap();

        photo.title = "Renamed".into();
        save_photo(&pool, &photo).await.unwrap();

        let stored = load_photo(&pool, 10).await.unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert!(!stored.enable_comments);
    }

    #[tokio::test]
    async fn test_set_navigation_and_period() {
        let (_dir, pool) = setup().await;
        for (id, hour) in [(1, 8), (2, 12), (3, 18)] {
            save_photo(&pool, &sample_photo(id, &format!("p{}", id), at(3, hour)))
                .await
                .unwrap();
        }
        let set = PhotoSet {
            flickr_id: "set1".into(),
            primary_id: None,
            owner: "samuelclay".into(),
            title: "Bridges".into(),
            description: String::new(),
            sort_order: 1,
        };
        save_photoset(&pool, &set).await.unwrap();
        for id in [3, 1, 2] {
            add_photo_to_set(&pool, "set1", id).await.unwrap();
        }

        let middle = load_photo(&pool, 2).await.unwrap().unwrap();
        assert_eq!(middle.next_in_set(&pool, "set1").await.unwrap().unwrap().flickr_id, 3);
        assert_eq!(middle.previous_in_set(&pool, "set1").await.unwrap().unwrap().flickr_id, 1);
        let last = load_photo(&pool, 3).await.unwrap().unwrap();
        assert!(last.next_in_set(&pool, "set1").await.unwrap().is_none());

        // No primary: the earliest member is the highlight
        assert_eq!(set.highlight(&pool).await.unwrap().unwrap().flickr_id, 1);
        assert!(set.primary_photo_html(&pool).await.unwrap().is_none());

        let period = set.time_period(&pool).await.unwrap().unwrap();
        assert_eq!(period.start, at(3, 8));
        assert_eq!(period.end, at(3, 18));
        assert_eq!(set.to_string(), "Bridges photo set by samuelclay");
    }

    #[tokio::test]
    async fn test_primary_photo_html() {
        let (_dir, pool) = setup().await;
        save_photo(&pool, &sample_photo(7, "bridge", at(3, 10))).await.unwrap();
        let set = PhotoSet {
            flickr_id: "s".into(),
            primary_id: Some(7),
            owner: "o".into(),
            title: "t".into(),
            description: String::new(),
            sort_order: 0,
        };
        let html = set.primary_photo_html(&pool).await.unwrap().unwrap();
        assert_eq!(
            html,
            r#"<a href="/photos/2008/05/03/bridge/"><img src="http://farm1.static.flickr.com/45/7_abc123_s.jpg" width="75" height="75" alt="Brooklyn Bridge" /></a>"#
        );
    }

    #[tokio::test]
    async fn test_favorite_list_get_or_create() {
        let (_dir, pool) = setup().await;
        let (list, created) = get_or_create_favorite_list(&pool, "sam", at(1, 0)).await.unwrap();
        assert!(created);
        let (again, created) = get_or_create_favorite_list(&pool, "sam", at(2, 0)).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, list.id);
        assert_eq!(again.sync_date, at(1, 0));
        assert_eq!(again.to_string(), "sam's favorite photos");
    }
}
