//! Generic RSS 2.0 / Atom synchronizer
//!
//! `parse_feed` turns either dialect into one `ParsedFeed`. The web front
//! page reuses it for the blog feed.

use chrono::{DateTime, NaiveDateTime};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use tracing::{debug, info, warn};

use clay_common::dates::parse_gdata_time;

use crate::http::Fetch;
use crate::xml::{child, children, element_text, ATOM_NS};
use crate::{Result, SyncError};

const DEFAULT_TITLE: &str = "No Title";
const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

/// Channel-level fields of a parsed feed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub subtitle: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published: Option<NaiveDateTime>,
    pub updated: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedFeed {
    pub feed: FeedInfo,
    pub entries: Vec<ParsedEntry>,
}

/// RFC 2822 (RSS), RFC 3339 (Atom), or a bare ISO timestamp
fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| parse_gdata_time(value).ok())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Text of an un-namespaced RSS child element
fn rss_text(node: Node, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().namespace().is_none() && n.tag_name().name() == name)
        .map(element_text)
        .and_then(non_empty)
}

fn atom_text(node: Node, name: &str) -> Option<String> {
    child(node, (ATOM_NS, name)).map(element_text).and_then(non_empty)
}

/// Atom alternate link: `rel="alternate"` or no `rel` at all
fn atom_link(node: Node) -> Option<String> {
    children(node, (ATOM_NS, "link"))
        .into_iter()
        .find(|l| matches!(l.attribute("rel"), None | Some("alternate")))
        .and_then(|l| l.attribute("href"))
        .map(str::to_string)
}

fn parse_rss(channel: Node) -> ParsedFeed {
    let entries = channel
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "item")
        .map(|item| ParsedEntry {
            id: rss_text(item, "guid"),
            title: rss_text(item, "title"),
            link: rss_text(item, "link"),
            author: rss_text(item, "author")
                .or_else(|| child(item, (DC_NS, "creator")).map(element_text).and_then(non_empty)),
            summary: rss_text(item, "description"),
            content: child(item, (CONTENT_NS, "encoded")).map(element_text).and_then(non_empty),
            published: rss_text(item, "pubDate").and_then(|d| parse_date(&d)),
            updated: None,
        })
        .collect();

    ParsedFeed {
        feed: FeedInfo {
            id: None,
            title: rss_text(channel, "title"),
            link: rss_text(channel, "link"),
            subtitle: rss_text(channel, "description"),
            version: "rss20".to_string(),
        },
        entries,
    }
}

fn parse_atom(root: Node) -> ParsedFeed {
    let entries = children(root, (ATOM_NS, "entry"))
        .into_iter()
        .map(|entry| ParsedEntry {
            id: atom_text(entry, "id"),
            title: atom_text(entry, "title"),
            link: atom_link(entry),
            author: child(entry, (ATOM_NS, "author")).and_then(|a| atom_text(a, "name")),
            summary: atom_text(entry, "summary"),
            content: atom_text(entry, "content"),
            published: atom_text(entry, "published").and_then(|d| parse_date(&d)),
            updated: atom_text(entry, "updated").and_then(|d| parse_date(&d)),
        })
        .collect();

    ParsedFeed {
        feed: FeedInfo {
            id: atom_text(root, "id"),
            title: atom_text(root, "title"),
            link: atom_link(root),
            subtitle: atom_text(root, "subtitle"),
            version: "atom10".to_string(),
        },
        entries,
    }
}

/// Parse RSS 2.0 or Atom 1.0. Malformed XML or any other root is an error.
pub fn parse_feed(body: &str) -> Result<ParsedFeed> {
    let doc = Document::parse(body)?;
    let root = doc.root_element();

    if root.has_tag_name((ATOM_NS, "feed")) {
        return Ok(parse_atom(root));
    }
    if root.tag_name().name() == "rss" {
        let channel = root
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "channel")
            .ok_or_else(|| SyncError::Parse("RSS document without channel".to_string()))?;
        return Ok(parse_rss(channel));
    }

    Err(SyncError::Parse(format!(
        "Not an RSS or Atom document: <{}>",
        root.tag_name().name()
    )))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Feed {
    pub id: String,
    pub title: String,
    pub link: String,
    pub subtitle: Option<String>,
    pub version: Option<String>,
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Entry {
    pub id: String,
    pub feed_id: String,
    pub title: String,
    pub link: String,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published: Option<NaiveDateTime>,
    pub updated: Option<NaiveDateTime>,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

pub async fn load_feed(pool: &SqlitePool, id: &str) -> Result<Option<Feed>> {
    Ok(sqlx::query_as("SELECT * FROM genericfeed_feed WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn feed_entries(pool: &SqlitePool, feed_id: &str) -> Result<Vec<Entry>> {
    Ok(sqlx::query_as(
        "SELECT * FROM genericfeed_entry WHERE feed_id = ? ORDER BY published DESC, id",
    )
    .bind(feed_id)
    .fetch_all(pool)
    .await?)
}

/// Insert, or refresh the title and any present optional fields. The link
/// of a stored feed is kept.
async fn save_feed(pool: &SqlitePool, feed: &Feed) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO genericfeed_feed (id, title, link, subtitle, version)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            subtitle = COALESCE(excluded.subtitle, subtitle),
            version = COALESCE(excluded.version, version)
        "#,
    )
    .bind(&feed.id)
    .bind(&feed.title)
    .bind(&feed.link)
    .bind(&feed.subtitle)
    .bind(&feed.version)
    .execute(pool)
    .await?;
    Ok(())
}

async fn save_entry(pool: &SqlitePool, entry: &Entry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO genericfeed_entry (
            id, feed_id, title, link, author, summary, content, published, updated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            feed_id = excluded.feed_id,
            title = excluded.title,
            author = COALESCE(excluded.author, author),
            summary = COALESCE(excluded.summary, summary),
            content = COALESCE(excluded.content, content),
            published = COALESCE(excluded.published, published),
            updated = COALESCE(excluded.updated, updated)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.feed_id)
    .bind(&entry.title)
    .bind(&entry.link)
    .bind(&entry.author)
    .bind(&entry.summary)
    .bind(&entry.content)
    .bind(entry.published)
    .bind(entry.updated)
    .execute(pool)
    .await?;
    Ok(())
}

pub struct GenericFeedSyncr<F: Fetch> {
    fetch: F,
    pool: SqlitePool,
}

impl<F: Fetch> GenericFeedSyncr<F> {
    pub fn new(fetch: F, pool: SqlitePool) -> Self {
        Self { fetch, pool }
    }

    /// Fetch and store one feed with its entries.
    ///
    /// A malformed feed is skipped with a warning and yields `None`.
    pub async fn sync_feed(&self, url: &str) -> Result<Option<Feed>> {
        let body = self.fetch.get_text(url).await?;
        let parsed = match parse_feed(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(url, error = %e, "Skipping malformed feed");
                return Ok(None);
            }
        };

        let link = parsed.feed.link.clone().unwrap_or_else(|| url.to_string());
        let feed = Feed {
            id: parsed.feed.id.clone().unwrap_or_else(|| link.clone()),
            title: parsed.feed.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            link,
            subtitle: parsed.feed.subtitle.clone(),
            version: Some(parsed.feed.version.clone()),
        };
        save_feed(&self.pool, &feed).await?;

        let mut stored = 0;
        for source in parsed.entries {
            let Some(id) = source.id.clone().or_else(|| source.link.clone()) else {
                debug!(feed = %feed.id, "Entry without id or link");
                continue;
            };
            let entry = Entry {
                id,
                feed_id: feed.id.clone(),
                title: source.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                link: source.link.unwrap_or_default(),
                author: source.author,
                summary: source.summary,
                content: source.content,
                published: source.published,
                updated: source.updated,
            };
            save_entry(&self.pool, &entry).await?;
            stored += 1;
        }

        info!(feed = %feed.id, entries = stored, "Synced feed");
        load_feed(&self.pool, &feed.id).await
    }
}
