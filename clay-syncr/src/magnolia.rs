//! Ma.gnolia bookmark synchronizer
//!
//! `bookmarks_find` is a form POST to the REST API answering with an XML
//! `<response>`. Links are get-or-create keyed by their creation time.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use tracing::{debug, info};

use clay_common::dates::parse_gdata_time;

use crate::http::Fetch;
use crate::xml::element_text;
use crate::{Result, SyncError};

pub const MAGNOLIA_URL: &str = "http://ma.gnolia.com";

const API_VERSION: &str = "1";

/// Star ratings as Ma.gnolia reports them
pub const RATINGS: [(&str, &str); 5] = [
    ("1", "1 Star"),
    ("2", "2 Stars"),
    ("3", "3 Stars"),
    ("4", "4 Stars"),
    ("5", "5 Stars"),
];

/// One bookmark from a `bookmarks_find` response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bookmark {
    pub id: String,
    pub created: String,
    pub updated: Option<String>,
    pub rating: String,
    pub owner: String,
    pub private: bool,
    pub title: String,
    pub url: String,
    pub description: String,
    pub screenshot: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Link {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub magnolia_id: Option<String>,
    pub url: String,
    pub description: Option<String>,
    pub screen_url: String,
    pub rating: String,
    pub add_date: NaiveDateTime,
    pub tags: String,
}

impl Link {
    /// `/maglinks/2008/apr/03/slug`
    pub fn absolute_url(&self) -> String {
        format!(
            "/maglinks/{}/{}",
            self.add_date.format("%Y/%b/%d").to_string().to_lowercase(),
            self.slug
        )
    }

    pub fn rating_name(&self) -> Option<&'static str> {
        RATINGS
            .iter()
            .find(|(code, _)| *code == self.rating)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

static SLUG_JUNK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]+").expect("slug regex is valid"));

/// Lowercase, replace every run outside `[a-z0-9-]` with `-`, trim hyphens
pub fn link_slug(title: &str) -> String {
    SLUG_JUNK_RE
        .replace_all(&title.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

fn parse_bookmark(node: Node) -> Bookmark {
    let text = |name: &str| {
        node.children()
            .find(|n| n.has_tag_name(name))
            .map(element_text)
            .unwrap_or_default()
    };
    let tags = node
        .children()
        .find(|n| n.has_tag_name("tags"))
        .map(|tags| {
            tags.children()
                .filter(|n| n.has_tag_name("tag"))
                .filter_map(|n| n.attribute("name"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Bookmark {
        id: node.attribute("id").unwrap_or_default().to_string(),
        created: node.attribute("created").unwrap_or_default().to_string(),
        updated: node.attribute("updated").map(str::to_string),
        rating: node.attribute("rating").unwrap_or("0").to_string(),
        owner: node.attribute("owner").unwrap_or_default().to_string(),
        private: node.attribute("private") == Some("true"),
        title: text("title"),
        url: text("url"),
        description: text("description"),
        screenshot: text("screenshot"),
        tags,
    }
}

/// Parse a REST response; an `<error>` element anywhere is an API failure
pub fn parse_bookmarks(body: &str) -> Result<Vec<Bookmark>> {
    let doc = Document::parse(body)?;
    if let Some(error) = doc.descendants().find(|n| n.has_tag_name("error")) {
        return Err(SyncError::Api {
            code: error.attribute("code").unwrap_or_default().to_string(),
            message: error.attribute("message").unwrap_or_default().to_string(),
        });
    }

    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name("bookmark"))
        .map(parse_bookmark)
        .collect())
}

pub async fn load_link_by_date(pool: &SqlitePool, add_date: NaiveDateTime) -> Result<Option<Link>> {
    Ok(sqlx::query_as("SELECT * FROM magnolia_link WHERE add_date = ?")
        .bind(add_date)
        .fetch_optional(pool)
        .await?)
}

/// Newest first
pub async fn list_links(pool: &SqlitePool) -> Result<Vec<Link>> {
    Ok(sqlx::query_as("SELECT * FROM magnolia_link ORDER BY add_date DESC")
        .fetch_all(pool)
        .await?)
}

pub struct MagnoliaSyncr<F: Fetch> {
    fetch: F,
    pool: SqlitePool,
    api_key: String,
    endpoint: String,
}

impl<F: Fetch> MagnoliaSyncr<F> {
    pub fn new(fetch: F, pool: SqlitePool, api_key: &str) -> Self {
        Self {
            fetch,
            pool,
            api_key: api_key.to_string(),
            endpoint: MAGNOLIA_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// All bookmarks of `person`
    pub async fn bookmarks_find(&self, person: &str) -> Result<Vec<Bookmark>> {
        let url = format!("{}/api/rest/{}/bookmarks_find", self.endpoint, API_VERSION);
        let params = [
            ("person", person.to_string()),
            ("api_key", self.api_key.clone()),
        ];
        let body = self.fetch.post_form(&url, &params).await?;
        parse_bookmarks(&body)
    }

    /// Store every bookmark of `person` not already stored.
    ///
    /// Returns how many links were created.
    pub async fn sync_links(&self, person: &str) -> Result<usize> {
        let bookmarks = self.bookmarks_find(person).await?;
        let mut created = 0;
        for bookmark in &bookmarks {
            if self.sync_link(bookmark).await? {
                created += 1;
            }
        }
        info!(person, total = bookmarks.len(), created, "Synced Magnolia links");
        Ok(created)
    }

    async fn sync_link(&self, bookmark: &Bookmark) -> Result<bool> {
        // Wall-clock time as sent; the zone offset is dropped
        let add_date = parse_gdata_time(&bookmark.created)?;
        if load_link_by_date(&self.pool, add_date).await?.is_some() {
            debug!(magnolia_id = %bookmark.id, "Link already stored");
            return Ok(false);
        }

        let description = Some(bookmark.description.clone()).filter(|d| !d.is_empty());
        let magnolia_id = Some(bookmark.id.clone()).filter(|id| !id.is_empty());
        let inserted = sqlx::query(
            r#"
            INSERT INTO magnolia_link (
                title, slug, magnolia_id, url, description, screen_url, rating, add_date, tags
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(add_date) DO NOTHING
            "#,
        )
        .bind(&bookmark.title)
        .bind(link_slug(&bookmark.title))
        .bind(magnolia_id)
        .bind(&bookmark.url)
        .bind(description)
        .bind(&bookmark.screenshot)
        .bind(&bookmark.rating)
        .bind(add_date)
        .bind(bookmark.tags.join(", "))
        .execute(&self.pool)
        .await?;

        let created = inserted.rows_affected() > 0;
        if created {
            info!(magnolia_id = %bookmark.id, title = %bookmark.title, "Created link");
        }
        Ok(created)
    }
}
