//! Picasa Web Albums synchronizer
//!
//! Albums and photos come from the GData feeds under
//! `/data/feed/api/user/<user>`. An album sync also removes local photos
//! that disappeared from the album's feed.

pub mod feed;
pub mod models;

use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::http::Fetch;
use crate::{Result, SyncError};
use feed::{AlbumEntry, PhotoEntry};
pub use models::{Album, Photo};

/// Public Picasa Web Albums host
pub const PICASAWEB_URL: &str = "https://picasaweb.google.com";

/// How to pick an album out of the user's album feed
#[derive(Debug, Clone)]
pub enum AlbumRef {
    Entry(AlbumEntry),
    Id(String),
    Name(String),
}

impl AlbumRef {
    /// All-digit strings are album ids, anything else an album name
    pub fn parse(value: &str) -> Self {
        if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
            AlbumRef::Id(value.to_string())
        } else {
            AlbumRef::Name(value.to_string())
        }
    }
}

pub struct PicasawebSyncr<F: Fetch> {
    fetch: F,
    pool: SqlitePool,
    endpoint: String,
    thumbsizes: Vec<String>,
    imgmax: Option<String>,
}

impl<F: Fetch> PicasawebSyncr<F> {
    pub fn new(fetch: F, pool: SqlitePool) -> Self {
        Self {
            fetch,
            pool,
            endpoint: PICASAWEB_URL.to_string(),
            thumbsizes: Vec::new(),
            imgmax: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// Thumbnail sizes requested with photo feeds, e.g. `["72c", "160c", "288"]`
    pub fn with_thumbsizes(mut self, thumbsizes: Vec<String>) -> Self {
        self.thumbsizes = thumbsizes;
        self
    }

    /// Largest size served as `content_url`
    pub fn with_imgmax(mut self, imgmax: Option<String>) -> Self {
        self.imgmax = imgmax;
        self
    }

    fn user_url(&self, user: &str) -> String {
        format!("{}/data/feed/api/user/{}", self.endpoint, user)
    }

    fn photo_feed_url(&self, user: &str, album_name: &str) -> String {
        let mut url = format!("{}/album/{}?kind=photo", self.user_url(user), album_name);
        if !self.thumbsizes.is_empty() {
            url.push_str("&thumbsize=");
            url.push_str(&self.thumbsizes.join(","));
        }
        if let Some(imgmax) = &self.imgmax {
            url.push_str("&imgmax=");
            url.push_str(imgmax);
        }
        url
    }

    /// The user's albums
    pub async fn get_album_feed(&self, user: &str) -> Result<Vec<AlbumEntry>> {
        let body = self
            .fetch
            .get_text(&format!("{}?kind=album", self.user_url(user)))
            .await?;
        feed::parse_album_feed(&body)
    }

    /// Space-joined tags of one photo
    pub async fn get_photo_tag_list(&self, user: &str, album_name: &str, gphoto_id: &str) -> Result<String> {
        let url = format!(
            "{}/album/{}/photoid/{}?kind=tag",
            self.user_url(user),
            album_name,
            gphoto_id
        );
        let body = self.fetch.get_text(&url).await?;
        Ok(feed::parse_tag_feed(&body)?.join(" "))
    }

    async fn find_album(&self, user: &str, album: &AlbumRef) -> Result<AlbumEntry> {
        let albums = self.get_album_feed(user).await?;
        let matches: Vec<AlbumEntry> = albums
            .into_iter()
            .filter(|entry| match album {
                AlbumRef::Id(id) => &entry.gphoto_id == id,
                AlbumRef::Name(name) => &entry.name == name,
                AlbumRef::Entry(wanted) => entry.gphoto_id == wanted.gphoto_id,
            })
            .collect();

        match <[AlbumEntry; 1]>::try_from(matches) {
            Ok([entry]) => Ok(entry),
            Err(matches) => Err(SyncError::NotFound(format!(
                "No single album found for {:?} ({} matches)",
                album,
                matches.len()
            ))),
        }
    }

    /// Store one photo entry, resolving its album name from the album feed
    /// when it is not known.
    pub async fn sync_photo(
        &self,
        entry: &PhotoEntry,
        user: &str,
        album_name: Option<&str>,
        refresh: bool,
    ) -> Result<Photo> {
        if refresh {
            models::delete_photo(&self.pool, &entry.gphoto_id).await?;
        }

        let album_name = match album_name {
            Some(name) => name.to_string(),
            None => {
                debug!(user, album_id = %entry.album_id, "Album name unknown, reading album feed");
                self.find_album(user, &AlbumRef::Id(entry.album_id.clone()))
                    .await?
                    .name
            }
        };

        let thumbnail = |index: usize| entry.thumbnails.get(index).cloned().unwrap_or_default();
        let photo = Photo {
            gphoto_id: entry.gphoto_id.clone(),
            updated: entry.updated,
            owner: user.to_string(),
            title: entry.title.clone(),
            description: entry.summary.clone(),
            taken_date: entry.timestamp,
            photopage_url: entry.alternate_url.clone(),
            small_url: thumbnail(0),
            medium_url: thumbnail(1),
            thumbnail_url: thumbnail(2),
            content_url: entry.content_url.clone(),
            tags: entry.keywords.clone(),
            geo_latitude: entry.position.map(|(lat, _)| lat),
            geo_longitude: entry.position.map(|(_, lon)| lon),
            exif_model: entry.exif.model.clone(),
            exif_make: entry.exif.make.clone(),
            exif_exposure: entry.exif.exposure.clone(),
            exif_iso: entry.exif.iso.clone(),
            exif_flash: entry.exif.flash.clone(),
            exif_focal_length: entry.exif.focal_length.clone(),
        };

        match models::load_photo(&self.pool, &photo.gphoto_id).await? {
            None => {
                models::save_photo(&self.pool, &photo).await?;
                info!(gphoto_id = %photo.gphoto_id, album = %album_name, "Created photo");
                Ok(photo)
            }
            Some(existing) if existing.updated < photo.updated => {
                models::save_photo(&self.pool, &photo).await?;
                info!(gphoto_id = %photo.gphoto_id, album = %album_name, "Updated photo");
                Ok(photo)
            }
            Some(existing) => {
                debug!(gphoto_id = %existing.gphoto_id, "Photo unchanged");
                Ok(existing)
            }
        }
    }

    /// Sync one album and its photos. Photos linked locally but missing
    /// from the feed are deleted.
    pub async fn sync_album(&self, album: AlbumRef, user: &str) -> Result<Album> {
        let entry = match album {
            AlbumRef::Entry(entry) => entry,
            other => self.find_album(user, &other).await?,
        };
        let owner = if entry.user.is_empty() {
            user.to_string()
        } else {
            entry.user.clone()
        };

        let album = Album {
            gphoto_id: entry.gphoto_id.clone(),
            albumname: entry.name.clone(),
            owner: owner.clone(),
            nickname: entry.nickname.clone(),
            title: entry.title.clone(),
            description: entry.summary.clone(),
            location: entry.location.clone(),
            updated: entry.updated,
            access: entry.access.clone(),
        };
        let album = match models::load_album(&self.pool, &album.gphoto_id).await? {
            None => {
                models::save_album(&self.pool, &album).await?;
                info!(album = %album.title, "Created album");
                album
            }
            Some(existing) if existing.updated < album.updated => {
                models::save_album(&self.pool, &album).await?;
                info!(album = %album.title, "Updated album");
                album
            }
            Some(existing) => existing,
        };

        let body = self
            .fetch
            .get_text(&self.photo_feed_url(&owner, &album.albumname))
            .await?;
        let entries = feed::parse_photo_feed(&body)?;

        for photo_entry in &entries {
            let photo = self
                .sync_photo(photo_entry, &owner, Some(&album.albumname), false)
                .await?;
            models::add_photo_to_album(&self.pool, &album.gphoto_id, &photo.gphoto_id).await?;
        }

        let feed_ids: HashSet<&str> = entries.iter().map(|e| e.gphoto_id.as_str()).collect();
        for local_id in models::album_photo_ids(&self.pool, &album.gphoto_id).await? {
            if !feed_ids.contains(local_id.as_str()) {
                models::delete_photo(&self.pool, &local_id).await?;
                info!(gphoto_id = %local_id, album = %album.title, "Deleted photo missing from feed");
            }
        }

        Ok(album)
    }

    /// Sync every album of `user`
    pub async fn sync_all_albums(&self, user: &str) -> Result<usize> {
        let albums = self.get_album_feed(user).await?;
        let count = albums.len();
        for entry in albums {
            self.sync_album(AlbumRef::Entry(entry), user).await?;
        }
        info!(user, count, "Synced albums");
        Ok(count)
    }
}
