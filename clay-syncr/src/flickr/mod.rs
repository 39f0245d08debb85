//! Flickr synchronizer
//!
//! Pulls photos, comments, photo sets and favorites through the Flickr REST
//! API and stores normalized copies in the `flickr_*` tables. Photos are
//! keyed by their Flickr id; an existing row is only rewritten when Flickr
//! reports a newer `lastupdate`, and the URL-relevant fields (`slug`,
//! `taken_date`) of an existing row never change.

pub mod api;
pub mod models;
pub mod slug;

use chrono::{Duration, NaiveDateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use clay_common::dates::{from_unix_seconds, now_naive};
use clay_common::text::slugify;

use crate::{Result, SyncError};
use api::{
    call_typed, ExifResponse, FindByUsernameResponse, GeoResponse, PersonResponse, PhotoInfo,
    PhotoInfoResponse, PhotoListResponse, PhotoRef, PhotosetInfoResponse, PhotosetListResponse,
    PhotosetPhotosResponse, SizesResponse,
};
pub use api::{FlickrApi, FlickrClient};
pub use models::{FavoriteList, Photo, PhotoComment, PhotoSet};

/// Size labels reported by `flickr.photos.getSizes` that are kept
pub const SIZE_LABELS: [&str; 6] = ["Square", "Thumbnail", "Small", "Medium", "Large", "Original"];

/// EXIF labels copied onto a photo
pub const EXIF_LABELS: [&str; 11] = [
    "Make",
    "Model",
    "Orientation",
    "Exposure",
    "Software",
    "Aperture",
    "ISO Speed",
    "Metering Mode",
    "Flash",
    "Focal Length",
    "Color Space",
];

/// Stored tag strings stay below this many characters
pub const MAX_TAGS_LENGTH: usize = 255;

/// Largest page Flickr serves
const PAGE_SIZE: i64 = 500;

const TAKEN_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Width and height of one photo size
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SizeDims {
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// Size label to dimensions
pub type PhotoSizes = HashMap<String, SizeDims>;

/// Location of a photo; unknown parts stay `None` / empty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoData {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<i64>,
    pub locality: String,
    pub county: String,
    pub region: String,
    pub country: String,
}

/// Build the stored tag string from the space-joined tag list.
///
/// `geo:` machine tags are dropped and accumulation stops before the
/// result would reach `MAX_TAGS_LENGTH` characters.
pub fn normalize_tags(raw: &str) -> String {
    let mut tags = String::new();
    let mut count = 0;
    for tag in raw.split_whitespace() {
        let len = tag.chars().count() + 1;
        if count + len - 1 >= MAX_TAGS_LENGTH {
            break;
        }
        if tag.starts_with("geo:") {
            continue;
        }
        tags.push_str(tag);
        tags.push(' ');
        count += len;
    }
    tags.trim_end().to_string()
}

fn size_of(sizes: &PhotoSizes, label: &str) -> SizeDims {
    sizes.get(label).copied().unwrap_or_default()
}

fn parse_photo_id(id: &str) -> Result<i64> {
    id.trim()
        .parse()
        .map_err(|_| SyncError::Parse(format!("Invalid Flickr photo id: {}", id)))
}

/// Flickr to database synchronizer
pub struct FlickrSyncr<A: FlickrApi> {
    api: A,
    pool: SqlitePool,
}

impl<A: FlickrApi> FlickrSyncr<A> {
    pub fn new(api: A, pool: SqlitePool) -> Self {
        Self { api, pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Convert a Flickr username to an NSID
    pub async fn user2nsid(&self, username: &str) -> Result<String> {
        let response: FindByUsernameResponse = call_typed(
            &self.api,
            "flickr.people.findByUsername",
            &[("username", username.to_string())],
        )
        .await?;
        Ok(response.user.nsid)
    }

    /// Dimensions of every kept size label; missing sizes are `None`
    pub async fn get_photo_sizes(&self, photo_id: &str) -> Result<PhotoSizes> {
        let response: SizesResponse = call_typed(
            &self.api,
            "flickr.photos.getSizes",
            &[("photo_id", photo_id.to_string())],
        )
        .await?;

        let mut sizes: PhotoSizes = SIZE_LABELS
            .iter()
            .map(|label| (label.to_string(), SizeDims::default()))
            .collect();
        for size in response.sizes.size {
            if let Some(dims) = sizes.get_mut(&size.label) {
                dims.width = size.width;
                dims.height = size.height;
            }
        }
        Ok(sizes)
    }

    /// Comments on a photo, `None` when it has none
    pub async fn get_photo_comments(&self, photo_id: i64) -> Result<Option<Vec<PhotoComment>>> {
        let response: api::CommentsResponse = call_typed(
            &self.api,
            "flickr.photos.comments.getList",
            &[("photo_id", photo_id.to_string())],
        )
        .await?;

        let Some(raw_comments) = response.comments.comment else {
            return Ok(None);
        };

        let mut comments = Vec::with_capacity(raw_comments.len());
        for raw in raw_comments {
            comments.push(PhotoComment {
                flickr_id: raw.id,
                photo_id,
                author_nsid: raw.author,
                author: raw.authorname,
                pub_date: from_unix_seconds(&raw.datecreate)?,
                permanent_url: raw.permalink,
                comment: raw.text,
            });
        }
        Ok(Some(comments))
    }

    /// EXIF values for `EXIF_LABELS`, each `""` when unknown.
    ///
    /// The clean rendering is preferred over the raw one, and the first
    /// non-empty value for a label wins. Lookup failures yield the defaults.
    pub async fn get_exif_info(&self, photo_id: &str) -> HashMap<String, String> {
        let mut exif: HashMap<String, String> = EXIF_LABELS
            .iter()
            .map(|label| (label.to_string(), String::new()))
            .collect();

        let response: ExifResponse = match call_typed(
            &self.api,
            "flickr.photos.getExif",
            &[("photo_id", photo_id.to_string())],
        )
        .await
        {
            Ok(response) => response,
            Err(SyncError::Api { message, .. }) => {
                debug!(photo_id, %message, "No EXIF data");
                return exif;
            }
            Err(e) => {
                warn!(photo_id, error = %e, "EXIF lookup failed");
                return exif;
            }
        };

        for entry in response.photo.exif {
            let Some(current) = exif.get_mut(&entry.label) else {
                continue;
            };
            if !current.is_empty() {
                continue;
            }
            let value = entry
                .clean
                .or(entry.raw)
                .map(|content| content.text)
                .unwrap_or_default();
            if !value.is_empty() {
                *current = value;
            }
        }
        exif
    }

    /// Location of a photo; lookup failures yield the defaults
    pub async fn get_geo_location(&self, photo_id: &str) -> GeoData {
        let response: GeoResponse = match call_typed(
            &self.api,
            "flickr.photos.geo.getLocation",
            &[("photo_id", photo_id.to_string())],
        )
        .await
        {
            Ok(response) => response,
            Err(SyncError::Api { message, .. }) => {
                debug!(photo_id, %message, "No location data");
                return GeoData::default();
            }
            Err(e) => {
                warn!(photo_id, error = %e, "Location lookup failed");
                return GeoData::default();
            }
        };

        let location = response.photo.location;
        let text = |part: Option<api::Content>| part.map(|c| c.text).unwrap_or_default();
        GeoData {
            latitude: location.latitude.trim().parse().ok(),
            longitude: location.longitude.trim().parse().ok(),
            accuracy: location.accuracy,
            locality: text(location.locality),
            county: text(location.county),
            region: text(location.region),
            country: text(location.country),
        }
    }

    /// Store one photo from its `photos.getInfo` answer.
    ///
    /// Non-photo media (videos) are skipped with `None`. With `refresh` the
    /// stored row is deleted first, so slug and dates are recomputed.
    pub async fn sync_photo_info(&self, info: &PhotoInfo, refresh: bool) -> Result<Option<Photo>> {
        if info.media != "photo" {
            debug!(photo_id = %info.id, media = %info.media, "Skipping non-photo media");
            return Ok(None);
        }
        let flickr_id = parse_photo_id(&info.id)?;

        if refresh && models::delete_photo(&self.pool, flickr_id).await? {
            info!(flickr_id, "Deleted photo for refresh");
        }

        let sizes = self.get_photo_sizes(&info.id).await?;
        let exif = self.get_exif_info(&info.id).await;
        let geo = self.get_geo_location(&info.id).await;

        let taken_date = NaiveDateTime::parse_from_str(&info.dates.taken, TAKEN_DATE_FORMAT)
            .map_err(|e| {
                SyncError::Parse(format!("Invalid taken date {:?}: {}", info.dates.taken, e))
            })?;
        let upload_date = from_unix_seconds(&info.dates.posted)?;
        let update_date = from_unix_seconds(&info.dates.lastupdate)?;

        let existing = models::load_photo(&self.pool, flickr_id).await?;
        let slug = match &existing {
            Some(photo) => photo.slug.clone(),
            None => {
                let proposed = slugify(&info.title.text.to_lowercase());
                slug::get_unique_slug_for_photo(&self.pool, taken_date, &proposed).await?
            }
        };

        let exif_value = |label: &str| exif.get(label).cloned().unwrap_or_default();
        let thumbnail = size_of(&sizes, "Thumbnail");
        let small = size_of(&sizes, "Small");
        let medium = size_of(&sizes, "Medium");
        let large = size_of(&sizes, "Large");
        let original = size_of(&sizes, "Original");

        let mut photo = Photo {
            flickr_id,
            owner: info.owner.username.clone(),
            owner_nsid: info.owner.nsid.clone(),
            title: info.title.text.clone(),
            slug,
            description: info.description.text.clone(),
            taken_date,
            upload_date,
            update_date,
            photopage_url: info.photopage_url(),
            farm: info.farm,
            server: info.server,
            secret: info.secret.clone(),
            original_secret: info.originalsecret.clone().unwrap_or_default(),
            thumbnail_width: thumbnail.width,
            thumbnail_height: thumbnail.height,
            small_width: small.width,
            small_height: small.height,
            medium_width: medium.width,
            medium_height: medium.height,
            large_width: large.width,
            large_height: large.height,
            original_width: original.width.unwrap_or(0),
            original_height: original.height.unwrap_or(0),
            tags: normalize_tags(&info.tag_text()),
            enable_comments: true,
            license: info.license.clone(),
            geo_latitude: geo.latitude,
            geo_longitude: geo.longitude,
            geo_accuracy: geo.accuracy,
            geo_locality: geo.locality,
            geo_county: geo.county,
            geo_region: geo.region,
            geo_country: geo.country,
            exif_make: exif_value("Make"),
            exif_model: exif_value("Model"),
            exif_orientation: exif_value("Orientation"),
            exif_exposure: exif_value("Exposure"),
            exif_software: exif_value("Software"),
            exif_aperture: exif_value("Aperture"),
            exif_iso: exif_value("ISO Speed"),
            exif_metering_mode: exif_value("Metering Mode"),
            exif_flash: exif_value("Flash"),
            exif_focal_length: exif_value("Focal Length"),
            exif_color_space: exif_value("Color Space"),
        };

        let stored = match existing {
            None => {
                models::save_photo(&self.pool, &photo).await?;
                info!(flickr_id, slug = %photo.slug, "Created photo");
                photo
            }
            Some(existing) if existing.update_date < photo.update_date => {
                photo.slug = existing.slug;
                photo.taken_date = existing.taken_date;
                photo.enable_comments = existing.enable_comments;
                models::save_photo(&self.pool, &photo).await?;
                info!(flickr_id, "Updated photo");
                photo
            }
            Some(existing) => {
                debug!(flickr_id, "Photo unchanged");
                existing
            }
        };

        match self.get_photo_comments(flickr_id).await {
            Ok(Some(comments)) => {
                for comment in &comments {
                    if models::create_comment_if_missing(&self.pool, comment).await? {
                        debug!(flickr_id, comment_id = %comment.flickr_id, "Created comment");
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!(flickr_id, error = %e, "Comment lookup failed"),
        }

        Ok(Some(stored))
    }

    /// `photos.getInfo` plus sync for each listed photo
    pub async fn sync_photo_list(&self, photos: &[PhotoRef]) -> Result<Vec<Option<Photo>>> {
        let mut synced = Vec::with_capacity(photos.len());
        for photo in photos {
            synced.push(self.sync_photo(&photo.id, false).await?);
        }
        Ok(synced)
    }

    /// Sync a single photo by id
    pub async fn sync_photo(&self, photo_id: &str, refresh: bool) -> Result<Option<Photo>> {
        let response: PhotoInfoResponse = call_typed(
            &self.api,
            "flickr.photos.getInfo",
            &[("photo_id", photo_id.to_string())],
        )
        .await?;
        self.sync_photo_info(&response.photo, refresh).await
    }

    /// Sync every public photo of a user. Returns the number stored.
    pub async fn sync_all_public(&self, username: &str) -> Result<usize> {
        let nsid = self.user2nsid(username).await?;
        let person: PersonResponse = call_typed(
            &self.api,
            "flickr.people.getInfo",
            &[("user_id", nsid.clone())],
        )
        .await?;

        let count: i64 = person.person.photos.count.text.trim().parse().unwrap_or(0);
        if count <= 0 {
            info!(username, "No public photos");
            return Ok(0);
        }
        let per_page = count.min(PAGE_SIZE);
        let pages = (count + per_page - 1) / per_page;

        let mut synced = 0;
        for page in 1..=pages {
            let result: PhotoListResponse = call_typed(
                &self.api,
                "flickr.people.getPublicPhotos",
                &[
                    ("user_id", nsid.clone()),
                    ("per_page", per_page.to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;
            synced += self.sync_photo_list(&result.photos.photo).await?.iter().flatten().count();
        }

        info!(username, synced, pages, "Synced public photos");
        Ok(synced)
    }

    /// Sync photos uploaded in the last `days` days
    pub async fn sync_recent_photos(&self, username: &str, days: i64) -> Result<usize> {
        let since = (Utc::now() - Duration::days(days)).timestamp();
        let nsid = self.user2nsid(username).await?;

        let mut synced = 0;
        let mut page = 1;
        loop {
            let result: PhotoListResponse = call_typed(
                &self.api,
                "flickr.photos.search",
                &[
                    ("user_id", nsid.clone()),
                    ("per_page", PAGE_SIZE.to_string()),
                    ("min_upload_date", since.to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;
            synced += self.sync_photo_list(&result.photos.photo).await?.iter().flatten().count();

            if page >= result.photos.pages {
                break;
            }
            page += 1;
        }

        info!(username, days, synced, "Synced recent photos");
        Ok(synced)
    }

    /// Sync a user's public favorites into their favorite list. The last
    /// photo synced from the first page becomes the list's primary.
    pub async fn sync_public_favorites(&self, username: &str) -> Result<FavoriteList> {
        let nsid = self.user2nsid(username).await?;
        let (mut list, created) =
            models::get_or_create_favorite_list(&self.pool, username, now_naive()).await?;
        if created {
            info!(username, "Created favorite list");
        }

        let mut page = 1;
        loop {
            let result: PhotoListResponse = call_typed(
                &self.api,
                "flickr.favorites.getPublicList",
                &[
                    ("user_id", nsid.clone()),
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;

            let photos = self.sync_photo_list(&result.photos.photo).await?;
            for photo in photos.iter().flatten() {
                models::add_photo_to_favorites(&self.pool, list.id, photo.flickr_id).await?;
            }
            if page == 1 {
                if let Some(primary) = photos.iter().flatten().last() {
                    models::set_favorites_primary(&self.pool, list.id, primary.flickr_id).await?;
                    list.primary_id = Some(primary.flickr_id);
                }
            }

            if page >= result.photos.pages {
                break;
            }
            page += 1;
        }

        info!(username, "Synced public favorites");
        Ok(list)
    }

    /// Sync one photo set and its member photos
    pub async fn sync_photo_set(&self, photoset_id: &str, order: Option<i64>) -> Result<PhotoSet> {
        let info: PhotosetInfoResponse = call_typed(
            &self.api,
            "flickr.photosets.getInfo",
            &[("photoset_id", photoset_id.to_string())],
        )
        .await?;
        let info = info.photoset;

        let person: PersonResponse = call_typed(
            &self.api,
            "flickr.people.getInfo",
            &[("user_id", info.owner.clone())],
        )
        .await?;

        let primary = self.sync_photo(&info.primary, false).await?;
        let existing = models::load_photoset(&self.pool, photoset_id).await?;

        let mut set = PhotoSet {
            flickr_id: photoset_id.to_string(),
            primary_id: primary.as_ref().map(|photo| photo.flickr_id),
            owner: person.person.username.text,
            title: info.title.text,
            description: info.description.text,
            sort_order: order
                .or(existing.as_ref().map(|set| set.sort_order))
                .unwrap_or(0),
        };
        models::save_photoset(&self.pool, &set).await?;
        if existing.is_none() {
            info!(photoset_id, title = %set.title, "Created photo set");
        } else {
            info!(photoset_id, title = %set.title, "Updated photo set");
        }

        let mut listed_primary: Option<String> = None;
        let mut page = 1;
        loop {
            let result: PhotosetPhotosResponse = call_typed(
                &self.api,
                "flickr.photosets.getPhotos",
                &[
                    ("photoset_id", photoset_id.to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;
            if listed_primary.is_none() {
                listed_primary = Some(result.photoset.primary.clone());
            }

            for photo in self.sync_photo_list(&result.photoset.photo).await?.iter().flatten() {
                models::add_photo_to_set(&self.pool, photoset_id, photo.flickr_id).await?;
            }

            if page >= result.photoset.pages {
                break;
            }
            page += 1;
        }

        if let Some(Ok(primary_id)) = listed_primary.map(|id| id.trim().parse::<i64>()) {
            if let Some(photo) = models::load_photo(&self.pool, primary_id).await? {
                set.primary_id = Some(photo.flickr_id);
            }
        }
        models::save_photoset(&self.pool, &set).await?;

        Ok(set)
    }

    /// Sync every set of a user, numbering them in listing order from 1
    pub async fn sync_all_photo_sets(&self, username: &str) -> Result<usize> {
        let nsid = self.user2nsid(username).await?;
        let result: PhotosetListResponse = call_typed(
            &self.api,
            "flickr.photosets.getList",
            &[("user_id", nsid)],
        )
        .await?;

        let sets = result.photosets.photoset;
        for (index, set) in sets.iter().enumerate() {
            self.sync_photo_set(&set.id, Some(index as i64 + 1)).await?;
        }

        info!(username, count = sets.len(), "Synced photo sets");
        Ok(sets.len())
    }
}
