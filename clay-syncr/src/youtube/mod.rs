//! YouTube GData synchronizer
//!
//! Syncs users, videos, playlists, favorites and uploads from the GData
//! feeds. Everything is get-or-create: a stored row is never rewritten.

pub mod models;

use chrono::NaiveDateTime;
use roxmltree::{Document, Node};
use sqlx::SqlitePool;
use tracing::{debug, info};

use clay_common::dates::parse_gdata_time;

use crate::http::Fetch;
use crate::xml::{child, children, find, find_text, link_href, ATOM_NS, MRSS_NS, YOUTUBE_NS};
use crate::{Result, SyncError};
pub use models::{Playlist, PlaylistVideo, UserVideoList, Video, YoutubeUser};

/// GData feed base
pub const YOUTUBE_FEED_BASE: &str = "http://gdata.youtube.com/feeds/api/";

/// Thumbnail height picked for `Video::thumbnail_url`
const THUMBNAIL_HEIGHT: &str = "240";

/// Convert a GData timestamp, dropping fractional seconds
pub fn gtime2datetime(gtime: &str) -> Result<NaiveDateTime> {
    Ok(parse_gdata_time(gtime)?)
}

/// Last `/` or `:` separated segment of a GData id
fn id_tail(id: &str) -> &str {
    id.rsplit(['/', ':']).next().unwrap_or(id)
}

fn required_text(node: Node, path: &[(&str, &str)], what: &str) -> Result<String> {
    find_text(node, path).ok_or_else(|| SyncError::Parse(format!("GData document without {}", what)))
}

fn required_link(node: Node, rel: &str) -> Result<String> {
    link_href(node, rel).ok_or_else(|| SyncError::Parse(format!("GData document without {} link", rel)))
}

pub struct YoutubeSyncr<F: Fetch> {
    fetch: F,
    pool: SqlitePool,
    base: String,
}

impl<F: Fetch> YoutubeSyncr<F> {
    pub fn new(fetch: F, pool: SqlitePool) -> Self {
        Self {
            fetch,
            pool,
            base: YOUTUBE_FEED_BASE.to_string(),
        }
    }

    /// Use another feed base (must end with `/`)
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        self
    }

    fn feed_url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn sync_video(&self, video_id: &str) -> Result<Video> {
        self.sync_video_feed(&self.feed_url(&format!("videos/{}", video_id)))
            .await
    }

    /// Sync a video from its entry URL; the author is synced first
    pub async fn sync_video_feed(&self, video_feed: &str) -> Result<Video> {
        let body = self.fetch.get_text(video_feed).await?;
        let doc = Document::parse(&body)?;
        let entry = doc.root_element();

        let author_uri = required_text(entry, &[(ATOM_NS, "author"), (ATOM_NS, "uri")], "author uri")?;
        let author = self.sync_user_feed(&author_uri).await?;

        let group = find(entry, &[(MRSS_NS, "group")]);
        let thumbnails = group
            .map(|g| children(g, (MRSS_NS, "thumbnail")))
            .unwrap_or_default();
        let thumbnail_url = thumbnails
            .iter()
            .find(|t| t.attribute("height") == Some(THUMBNAIL_HEIGHT))
            .or_else(|| thumbnails.first())
            .and_then(|t| t.attribute("url"))
            .unwrap_or_default()
            .to_string();
        let length = group
            .and_then(|g| child(g, (YOUTUBE_NS, "duration")))
            .and_then(|d| d.attribute("seconds"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let view_count = child(entry, (YOUTUBE_NS, "statistics"))
            .and_then(|s| s.attribute("viewCount"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let id = required_text(entry, &[(ATOM_NS, "id")], "id")?;
        let video = Video {
            feed: video_feed.to_string(),
            video_id: id_tail(&id).to_string(),
            published: gtime2datetime(&required_text(entry, &[(ATOM_NS, "published")], "published")?)?,
            updated: gtime2datetime(&required_text(entry, &[(ATOM_NS, "updated")], "updated")?)?,
            title: find_text(entry, &[(ATOM_NS, "title")]).unwrap_or_default(),
            author: author.username,
            description: find_text(entry, &[(MRSS_NS, "group"), (MRSS_NS, "description")])
                .unwrap_or_default(),
            tag_list: find_text(entry, &[(MRSS_NS, "group"), (MRSS_NS, "keywords")])
                .unwrap_or_default(),
            view_count,
            url: required_link(entry, "alternate")?,
            thumbnail_url,
            length,
        };

        let (video, created) = models::get_or_create_video(&self.pool, &video).await?;
        if created {
            info!(video_id = %video.video_id, title = %video.title, "Created video");
        } else {
            debug!(video_id = %video.video_id, "Video already stored");
        }
        Ok(video)
    }

    pub async fn sync_user(&self, username: &str) -> Result<YoutubeUser> {
        self.sync_user_feed(&self.feed_url(&format!("users/{}", username)))
            .await
    }

    /// Sync a user profile from its entry URL
    pub async fn sync_user_feed(&self, user_feed: &str) -> Result<YoutubeUser> {
        let body = self.fetch.get_text(user_feed).await?;
        let doc = Document::parse(&body)?;
        let entry = doc.root_element();

        let id = required_text(entry, &[(ATOM_NS, "id")], "id")?;
        let user = YoutubeUser {
            username: id_tail(&id).to_string(),
            feed: user_feed.to_string(),
            first_name: find_text(entry, &[(YOUTUBE_NS, "firstName")]).unwrap_or_default(),
            age: find_text(entry, &[(YOUTUBE_NS, "age")]).and_then(|a| a.trim().parse().ok()),
            gender: find_text(entry, &[(YOUTUBE_NS, "gender")]).unwrap_or_default(),
            thumbnail_url: child(entry, (MRSS_NS, "thumbnail"))
                .and_then(|t| t.attribute("url"))
                .unwrap_or_default()
                .to_string(),
            url: required_link(entry, "alternate")?,
            watch_count: child(entry, (YOUTUBE_NS, "statistics"))
                .and_then(|s| s.attribute("videoWatchCount"))
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        };

        let (user, created) = models::get_or_create_user(&self.pool, &user).await?;
        if created {
            info!(username = %user.username, "Created user");
        }
        Ok(user)
    }

    /// Sync one playlist entry: the original video through its `related`
    /// link, then the playlist's own copy
    async fn sync_playlist_video(&self, entry: Node<'_, '_>) -> Result<PlaylistVideo> {
        let original = self.sync_video_feed(&required_link(entry, "related")?).await?;

        let custom = find_text(entry, &[(YOUTUBE_NS, "description")]).filter(|d| !d.is_empty());
        let description = custom
            .or_else(|| find_text(entry, &[(MRSS_NS, "group"), (MRSS_NS, "description")]))
            .unwrap_or_default();

        let video = PlaylistVideo {
            feed: required_text(entry, &[(ATOM_NS, "id")], "id")?,
            title: find_text(entry, &[(ATOM_NS, "title")]).unwrap_or_default(),
            description,
            original: original.feed,
        };
        let (video, _) = models::get_or_create_playlist_video(&self.pool, &video).await?;
        Ok(video)
    }

    pub async fn sync_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        self.sync_playlist_feed(&self.feed_url(&format!("playlists/{}", playlist_id)))
            .await
    }

    /// Sync a playlist and link each of its entries
    pub async fn sync_playlist_feed(&self, playlist_feed: &str) -> Result<Playlist> {
        let body = self.fetch.get_text(playlist_feed).await?;
        let doc = Document::parse(&body)?;
        let root = doc.root_element();

        let author_uri = required_text(root, &[(ATOM_NS, "author"), (ATOM_NS, "uri")], "author uri")?;
        let author = self.sync_user_feed(&author_uri).await?;

        let playlist = Playlist {
            feed: playlist_feed.to_string(),
            updated: gtime2datetime(&required_text(root, &[(ATOM_NS, "updated")], "updated")?)?,
            title: find_text(root, &[(ATOM_NS, "title")]).unwrap_or_default(),
            description: find_text(root, &[(MRSS_NS, "group"), (MRSS_NS, "description")])
                .unwrap_or_default(),
            author: author.username,
            url: required_link(root, "alternate")?,
        };
        let (playlist, created) = models::get_or_create_playlist(&self.pool, &playlist).await?;
        if created {
            info!(title = %playlist.title, "Created playlist");
        }

        for entry in children(root, (ATOM_NS, "entry")) {
            let video = self.sync_playlist_video(entry).await?;
            models::add_playlist_video(&self.pool, &playlist.feed, &video.feed).await?;
        }
        Ok(playlist)
    }

    /// Sync every playlist of a user
    pub async fn sync_user_playlists(&self, username: &str) -> Result<Vec<Playlist>> {
        let user = self.sync_user(username).await?;
        let body = self
            .fetch
            .get_text(&self.feed_url(&format!("users/{}/playlists", username)))
            .await?;

        let playlist_ids: Vec<String> = {
            let doc = Document::parse(&body)?;
            children(doc.root_element(), (ATOM_NS, "entry"))
                .into_iter()
                .filter_map(|entry| find_text(entry, &[(ATOM_NS, "id")]))
                .map(|id| id_tail(&id).to_string())
                .collect()
        };

        for playlist_id in playlist_ids {
            let playlist = self.sync_playlist(&playlist_id).await?;
            models::add_user_playlist(&self.pool, &user.username, &playlist.feed).await?;
        }
        models::user_playlists(&self.pool, &user.username).await
    }

    pub async fn sync_user_favorites(&self, username: &str) -> Result<Vec<Video>> {
        self.sync_user_list(username, UserVideoList::Favorites, "favorites")
            .await
    }

    pub async fn sync_user_uploads(&self, username: &str) -> Result<Vec<Video>> {
        self.sync_user_list(username, UserVideoList::Uploads, "uploads")
            .await
    }

    async fn sync_user_list(&self, username: &str, list: UserVideoList, path: &str) -> Result<Vec<Video>> {
        let user = self.sync_user(username).await?;
        let videos = self
            .sync_feed(&self.feed_url(&format!("users/{}/{}", username, path)))
            .await?;
        for video in &videos {
            models::add_user_video(&self.pool, list, &user.username, &video.feed).await?;
        }
        info!(username, list = path, count = videos.len(), "Synced user videos");
        models::user_videos(&self.pool, list, &user.username).await
    }

    /// Walk a paged video feed with `start-index`, advancing by the entries
    /// seen, until a page comes back empty
    pub async fn sync_feed(&self, feed_url: &str) -> Result<Vec<Video>> {
        let separator = if feed_url.contains('?') { '&' } else { '?' };
        let mut start_index = 1;
        let mut videos = Vec::new();

        loop {
            let url = format!("{}{}start-index={}", feed_url, separator, start_index);
            let body = self.fetch.get_text(&url).await?;
            let entry_ids: Vec<String> = {
                let doc = Document::parse(&body)?;
                children(doc.root_element(), (ATOM_NS, "entry"))
                    .into_iter()
                    .filter_map(|entry| find_text(entry, &[(ATOM_NS, "id")]))
                    .collect()
            };
            if entry_ids.is_empty() {
                break;
            }

            start_index += entry_ids.len();
            for id in entry_ids {
                videos.push(self.sync_video_feed(&id).await?);
            }
        }
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeFetch;
    use clay_common::db::init_database;
    use tempfile::TempDir;

    const BASE: &str = "http://gdata.youtube.com/feeds/api/";

    fn user_entry(name: &str) -> String {
        format!(
            r#"<entry xmlns="http://www.w3.org/2005/Atom"
                     xmlns:yt="http://gdata.youtube.com/schemas/2007"
                     xmlns:media="http://search.yahoo.com/mrss/">
  <id>http://gdata.youtube.com/feeds/api/users/{name}</id>
  <title>{name} Channel</title>
  <link rel="alternate" type="text/html" href="http://www.youtube.com/profile?user={name}"/>
  <yt:firstName>Samuel</yt:firstName>
  <yt:age>25</yt:age>
  <yt:gender>m</yt:gender>
  <yt:statistics viewCount="100" videoWatchCount="42"/>
  <media:thumbnail url="http://i.ytimg.com/vi/{name}/default.jpg"/>
</entry>"#
        )
    }

    fn video_entry(id: &str, author: &str) -> String {
        format!(
            r#"<entry xmlns="http://www.w3.org/2005/Atom"
                     xmlns:yt="http://gdata.youtube.com/schemas/2007"
                     xmlns:media="http://search.yahoo.com/mrss/">
  <id>http://gdata.youtube.com/feeds/api/videos/{id}</id>
  <published>2008-04-01T10:00:00.000Z</published>
  <updated>2008-04-02T11:00:00.000Z</updated>
  <title type="text">Video {id}</title>
  <author><name>{author}</name><uri>http://gdata.youtube.com/feeds/api/users/{author}</uri></author>
  <link rel="alternate" type="text/html" href="http://www.youtube.com/watch?v={id}"/>
  <media:group>
    <media:description type="plain">About {id}</media:description>
    <media:keywords>bikes, boston</media:keywords>
    <media:thumbnail url="http://i.ytimg.com/vi/{id}/2.jpg" height="97" width="130"/>
    <media:thumbnail url="http://i.ytimg.com/vi/{id}/0.jpg" height="240" width="320"/>
    <yt:duration seconds="215"/>
  </media:group>
  <yt:statistics viewCount="1234" favoriteCount="5"/>
</entry>"#
        )
    }

    fn id_feed(ids: &[&str]) -> String {
        let entries: String = ids
            .iter()
            .map(|id| format!("<entry><id>{}videos/{}</id></entry>", BASE, id))
            .collect();
        format!(r#"<feed xmlns="http://www.w3.org/2005/Atom">{}</feed>"#, entries)
    }

    async fn setup() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("youtube.db")).await.unwrap();
        (dir, pool)
    }

    #[test]
    fn test_gtime2datetime_drops_fraction() {
        assert_eq!(
            gtime2datetime("2008-04-02T11:00:00.000Z").unwrap().to_string(),
            "2008-04-02 11:00:00"
        );
        assert!(gtime2datetime("yesterday").is_err());
    }

    #[test]
    fn test_id_tail() {
        assert_eq!(id_tail("http://gdata.youtube.com/feeds/api/videos/abc123"), "abc123");
        assert_eq!(id_tail("tag:youtube.com,2008:video:abc123"), "abc123");
    }

    #[tokio::test]
    async fn test_sync_video_creates_author_and_video() {
        let (_dir, pool) = setup().await;
        let fetch = FakeFetch::new()
            .route("videos/abc123", &video_entry("abc123", "samuelclay"))
            .route("users/samuelclay", &user_entry("samuelclay"));
        let syncr = YoutubeSyncr::new(fetch, pool.clone());

        let video = syncr.sync_video("abc123").await.unwrap();
        assert_eq!(video.video_id, "abc123");
        assert_eq!(video.author, "samuelclay");
        assert_eq!(video.view_count, 1234);
        assert_eq!(video.length, 215);
        assert_eq!(video.thumbnail_url, "http://i.ytimg.com/vi/abc123/0.jpg");
        assert_eq!(video.url, "http://www.youtube.com/watch?v=abc123");
        assert_eq!(video.tag_list, "bikes, boston");
        assert_eq!(video.published.to_string(), "2008-04-01 10:00:00");

        let (user, created) = models::get_or_create_user(
            &pool,
            &YoutubeUser {
                username: "samuelclay".into(),
                feed: String::new(),
                first_name: String::new(),
                age: None,
                gender: String::new(),
                thumbnail_url: String::new(),
                url: String::new(),
                watch_count: 0,
            },
        )
        .await
        .unwrap();
        assert!(!created);
        assert_eq!(user.first_name, "Samuel");
        assert_eq!(user.age, Some(25));
        assert_eq!(user.watch_count, 42);
    }

    #[tokio::test]
    async fn test_sync_feed_pages_until_empty() {
        let (_dir, pool) = setup().await;
        let fetch = FakeFetch::new()
            .route("favorites?start-index=1", &id_feed(&["v1", "v2"]))
            .route("favorites?start-index=3", &id_feed(&["v3"]))
            .route("favorites?start-index=4", &id_feed(&[]))
            .route("videos/v1", &video_entry("v1", "samuelclay"))
            .route("videos/v2", &video_entry("v2", "samuelclay"))
            .route("videos/v3", &video_entry("v3", "samuelclay"))
            .route("users/samuelclay", &user_entry("samuelclay"));
        let syncr = YoutubeSyncr::new(fetch, pool.clone());

        let favorites = syncr.sync_user_favorites("samuelclay").await.unwrap();
        assert_eq!(favorites.len(), 3);

        let uploads = models::user_videos(&pool, UserVideoList::Uploads, "samuelclay").await.unwrap();
        assert!(uploads.is_empty());
    }

    #[tokio::test]
    async fn test_sync_playlist_keeps_custom_description() {
        let (_dir, pool) = setup().await;
        let playlist = format!(
            r#"<feed xmlns="http://www.w3.org/2005/Atom"
                    xmlns:yt="http://gdata.youtube.com/schemas/2007"
                    xmlns:media="http://search.yahoo.com/mrss/">
  <id>{base}playlists/PL1</id>
  <updated>2008-05-01T00:00:00.000Z</updated>
  <title>Bike Rides</title>
  <author><name>samuelclay</name><uri>{base}users/samuelclay</uri></author>
  <link rel="alternate" href="http://www.youtube.com/view_play_list?p=PL1"/>
  <media:group><media:description>Rides around town</media:description></media:group>
  <entry>
    <id>{base}playlists/PL1/entry1</id>
    <title>First ride</title>
    <link rel="related" href="{base}videos/v1"/>
    <yt:description>My favorite</yt:description>
    <media:group><media:description>About v1</media:description></media:group>
  </entry>
  <entry>
    <id>{base}playlists/PL1/entry2</id>
    <title>Second ride</title>
    <link rel="related" href="{base}videos/v2"/>
    <yt:description></yt:description>
    <media:group><media:description>About v2</media:description></media:group>
  </entry>
</feed>"#,
            base = BASE
        );
        let fetch = FakeFetch::new()
            .route("playlists/PL1", &playlist)
            .route("videos/v1", &video_entry("v1", "samuelclay"))
            .route("videos/v2", &video_entry("v2", "samuelclay"))
            .route("users/samuelclay", &user_entry("samuelclay"));
        let syncr = YoutubeSyncr::new(fetch, pool.clone());

        let stored = syncr.sync_playlist("PL1").await.unwrap();
        assert_eq!(stored.title, "Bike Rides");
        assert_eq!(stored.description, "Rides around town");

        let mut videos = models::playlist_videos(&pool, &stored.feed).await.unwrap();
        videos.sort_by(|a, b| a.feed.cmp(&b.feed));
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].description, "My favorite");
        assert_eq!(videos[1].description, "About v2");
        assert_eq!(videos[1].original, format!("{}videos/v2", BASE));
    }

    #[tokio::test]
    async fn test_second_sync_keeps_stored_video() {
        let (_dir, pool) = setup().await;
        let fetch = FakeFetch::new()
            .route("videos/abc123", &video_entry("abc123", "samuelclay"))
            .route("users/samuelclay", &user_entry("samuelclay"));
        let syncr = YoutubeSyncr::new(fetch, pool.clone());
        syncr.sync_video("abc123").await.unwrap();

        sqlx::query("UPDATE youtube_video SET title = 'Local edit'")
            .execute(&pool)
            .await
            .unwrap();
        let video = syncr.sync_video("abc123").await.unwrap();
        assert_eq!(video.title, "Local edit");
    }
}
