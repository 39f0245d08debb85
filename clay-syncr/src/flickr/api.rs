//! Flickr REST API access
//!
//! All calls go through the `FlickrApi` trait so the syncr can run against
//! canned responses in tests. `FlickrClient` is the real implementation and
//! speaks the JSON flavor of the REST endpoint (`format=json`,
//! `nojsoncallback=1`).
//!
//! Flickr is inconsistent about quoting numbers (`"pages": "3"` vs
//! `"pages": 3`), so numeric fields go through the `flexible` helpers.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::http::{Fetch, HttpFetcher};
use crate::{Result, SyncError};

/// Flickr REST endpoint
pub const FLICKR_REST_URL: &str = "https://api.flickr.com/services/rest/";

/// One Flickr REST call: method name plus parameters, answering the decoded
/// JSON body. `stat: "fail"` answers become `SyncError::Api`.
#[async_trait]
pub trait FlickrApi: Send + Sync {
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value>;
}

/// Call a method and decode the answer into `T`
pub async fn call_typed<T, A>(api: &A, method: &str, params: &[(&str, String)]) -> Result<T>
where
    T: DeserializeOwned,
    A: FlickrApi + ?Sized,
{
    let value = api.call(method, params).await?;
    serde_json::from_value(value)
        .map_err(|e| SyncError::Parse(format!("Unexpected {} response: {}", method, e)))
}

/// Real Flickr client
pub struct FlickrClient<F: Fetch = HttpFetcher> {
    fetch: F,
    api_key: String,
    endpoint: String,
}

impl FlickrClient<HttpFetcher> {
    /// Client against the public endpoint
    pub fn new(api_key: &str) -> Result<Self> {
        Ok(Self::with_fetch(HttpFetcher::new()?, api_key))
    }
}

impl<F: Fetch> FlickrClient<F> {
    pub fn with_fetch(fetch: F, api_key: &str) -> Self {
        Self {
            fetch,
            api_key: api_key.to_string(),
            endpoint: FLICKR_REST_URL.to_string(),
        }
    }

    /// Point the client at another REST endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    fn request_url(&self, method: &str, params: &[(&str, String)]) -> Result<String> {
        let mut query: Vec<(&str, String)> = vec![
            ("method", method.to_string()),
            ("api_key", self.api_key.clone()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
        ];
        query.extend(params.iter().cloned());

        let url = reqwest::Url::parse_with_params(&self.endpoint, &query)
            .map_err(|e| SyncError::Parse(format!("Bad Flickr endpoint {}: {}", self.endpoint, e)))?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl<F: Fetch> FlickrApi for FlickrClient<F> {
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        debug!(method, "Flickr API call");
        let url = self.request_url(method, params)?;
        let body = self.fetch.get_text(&url).await?;
        parse_response(&body)
    }
}

/// Decode a REST body, turning `stat: "fail"` into an API error
pub fn parse_response(body: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(body)?;
    if value.get("stat").and_then(Value::as_str) == Some("fail") {
        let code = match value.get("code") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(SyncError::Api { code, message });
    }
    Ok(value)
}

/// Deserializers tolerant of Flickr's string/number mixing
pub(crate) mod flexible {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        })
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(opt_i64(d)?.unwrap_or(0))
    }
}

/// `{"_content": "..."}` wrapper used throughout the API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(rename = "_content", default, deserialize_with = "flexible::string")]
    pub text: String,
}

// flickr.people.findByUsername

#[derive(Debug, Deserialize)]
pub struct FindByUsernameResponse {
    pub user: FoundUser,
}

#[derive(Debug, Deserialize)]
pub struct FoundUser {
    #[serde(deserialize_with = "flexible::string")]
    pub nsid: String,
}

// flickr.people.getInfo

#[derive(Debug, Deserialize)]
pub struct PersonResponse {
    pub person: Person,
}

#[derive(Debug, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub username: Content,
    #[serde(default)]
    pub photos: PersonPhotos,
}

#[derive(Debug, Default, Deserialize)]
pub struct PersonPhotos {
    #[serde(default)]
    pub count: Content,
}

// flickr.photos.getSizes

#[derive(Debug, Deserialize)]
pub struct SizesResponse {
    pub sizes: Sizes,
}

#[derive(Debug, Deserialize)]
pub struct Sizes {
    #[serde(default)]
    pub size: Vec<Size>,
}

#[derive(Debug, Deserialize)]
pub struct Size {
    pub label: String,
    #[serde(default, deserialize_with = "flexible::opt_i64")]
    pub width: Option<i64>,
    #[serde(default, deserialize_with = "flexible::opt_i64")]
    pub height: Option<i64>,
}

// flickr.photos.comments.getList

#[derive(Debug, Deserialize)]
pub struct CommentsResponse {
    pub comments: CommentList,
}

#[derive(Debug, Deserialize)]
pub struct CommentList {
    #[serde(default)]
    pub comment: Option<Vec<RawComment>>,
}

#[derive(Debug, Deserialize)]
pub struct RawComment {
    #[serde(deserialize_with = "flexible::string")]
    pub id: String,
    #[serde(default, deserialize_with = "flexible::string")]
    pub author: String,
    #[serde(default, deserialize_with = "flexible::string")]
    pub authorname: String,
    #[serde(deserialize_with = "flexible::string")]
    pub datecreate: String,
    #[serde(default, deserialize_with = "flexible::string")]
    pub permalink: String,
    #[serde(rename = "_content", default, deserialize_with = "flexible::string")]
    pub text: String,
}

// flickr.photos.getExif

#[derive(Debug, Deserialize)]
pub struct ExifResponse {
    pub photo: ExifPhoto,
}

#[derive(Debug, Deserialize)]
pub struct ExifPhoto {
    #[serde(default)]
    pub exif: Vec<ExifEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ExifEntry {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub raw: Option<Content>,
    #[serde(default)]
    pub clean: Option<Content>,
}

// flickr.photos.geo.getLocation

#[derive(Debug, Deserialize)]
pub struct GeoResponse {
    pub photo: GeoPhoto,
}

#[derive(Debug, Deserialize)]
pub struct GeoPhoto {
    pub location: Location,
}

#[derive(Debug, Deserialize)]
pub struct Location {
    #[serde(deserialize_with = "flexible::string")]
    pub latitude: String,
    #[serde(deserialize_with = "flexible::string")]
    pub longitude: String,
    #[serde(default, deserialize_with = "flexible::opt_i64")]
    pub accuracy: Option<i64>,
    #[serde(default)]
    pub locality: Option<Content>,
    #[serde(default)]
    pub county: Option<Content>,
    #[serde(default)]
    pub region: Option<Content>,
    #[serde(default)]
    pub country: Option<Content>,
}

// flickr.photos.getInfo

#[derive(Debug, Deserialize)]
pub struct PhotoInfoResponse {
    pub photo: PhotoInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoInfo {
    #[serde(deserialize_with = "flexible::string")]
    pub id: String,
    #[serde(deserialize_with = "flexible::string")]
    pub secret: String,
    #[serde(deserialize_with = "flexible::i64")]
    pub server: i64,
    #[serde(deserialize_with = "flexible::i64")]
    pub farm: i64,
    #[serde(default)]
    pub originalsecret: Option<String>,
    #[serde(default, deserialize_with = "flexible::string")]
    pub license: String,
    #[serde(default = "default_media")]
    pub media: String,
    pub owner: Owner,
    #[serde(default)]
    pub title: Content,
    #[serde(default)]
    pub description: Content,
    pub dates: Dates,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub urls: Urls,
}

fn default_media() -> String {
    "photo".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    #[serde(default, deserialize_with = "flexible::string")]
    pub nsid: String,
    #[serde(default, deserialize_with = "flexible::string")]
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dates {
    #[serde(deserialize_with = "flexible::string")]
    pub posted: String,
    #[serde(deserialize_with = "flexible::string")]
    pub taken: String,
    #[serde(deserialize_with = "flexible::string")]
    pub lastupdate: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub tag: Vec<Content>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Urls {
    #[serde(default)]
    pub url: Vec<Content>,
}

impl PhotoInfo {
    /// Space-joined normalized tags
    pub fn tag_text(&self) -> String {
        self.tags
            .tag
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First listed URL (the photo page)
    pub fn photopage_url(&self) -> String {
        self.urls
            .url
            .first()
            .map(|u| u.text.clone())
            .unwrap_or_default()
    }
}

// Paged photo lists: people.getPublicPhotos, photos.search, favorites.getPublicList

#[derive(Debug, Deserialize)]
pub struct PhotoListResponse {
    pub photos: PhotoPage,
}

#[derive(Debug, Deserialize)]
pub struct PhotoPage {
    #[serde(default, deserialize_with = "flexible::i64")]
    pub pages: i64,
    #[serde(default)]
    pub photo: Vec<PhotoRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoRef {
    #[serde(deserialize_with = "flexible::string")]
    pub id: String,
}

// Photo sets

#[derive(Debug, Deserialize)]
pub struct PhotosetInfoResponse {
    pub photoset: PhotosetInfo,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetInfo {
    #[serde(deserialize_with = "flexible::string")]
    pub owner: String,
    #[serde(deserialize_with = "flexible::string")]
    pub primary: String,
    #[serde(default)]
    pub title: Content,
    #[serde(default)]
    pub description: Content,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetPhotosResponse {
    pub photoset: PhotosetPage,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetPage {
    #[serde(deserialize_with = "flexible::string")]
    pub id: String,
    #[serde(default, deserialize_with = "flexible::string")]
    pub primary: String,
    #[serde(default, deserialize_with = "flexible::i64")]
    pub pages: i64,
    #[serde(default)]
    pub photo: Vec<PhotoRef>,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetListResponse {
    pub photosets: PhotosetList,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetList {
    #[serde(default)]
    pub photoset: Vec<PhotoRef>,
}
