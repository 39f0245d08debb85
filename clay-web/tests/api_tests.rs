//! Integration tests for clay-web routes
//!
//! Each test gets a fresh database, template and media folders, and canned
//! blog/Twitter sources that count how often they are asked.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use clay_common::db::init_database;
use clay_syncr::{Result, SyncError};
use clay_web::render::ISA_QUOTES;
use clay_web::sources::{BlogEntry, BlogSource, Tweet, TweetSource};
use clay_web::{build_router, AppState};

#[derive(Default)]
struct CannedBlog {
    entries: Vec<BlogEntry>,
    calls: AtomicUsize,
}

#[async_trait]
impl BlogSource for CannedBlog {
    async fn entries(&self) -> Result<Vec<BlogEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.clone())
    }
}

/// Timeline answering with `tweets`, or failing when `None`
#[derive(Default)]
struct CannedTweets {
    tweets: Option<Vec<Tweet>>,
    calls: AtomicUsize,
}

#[async_trait]
impl TweetSource for CannedTweets {
    async fn user_timeline(&self) -> Result<Vec<Tweet>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tweets
            .clone()
            .ok_or_else(|| SyncError::NotFound("timeline".to_string()))
    }
}

struct TestSite {
    _dir: TempDir,
    db: SqlitePool,
    blog: Arc<CannedBlog>,
    tweets: Arc<CannedTweets>,
    state: AppState,
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Layout: <tmp>/site/media, <tmp>/site/templates, <tmp>/site/bikes, ...
async fn setup(blog: CannedBlog, tweets: CannedTweets, debug: bool) -> TestSite {
    let dir = TempDir::new().unwrap();
    let site = dir.path().join("site");
    write(&site.join("templates/schedulerjones.html"), "<h1>Scheduler Jones</h1>");
    write(&site.join("templates/bikes.html"), "<h1>Boston Bikes</h1>");
    write(&site.join("bikes/bike_crashes.js"), "var crashes = [];");
    write(&site.join("media/css/main.css"), "body { margin: 0; }");

    let db = init_database(&dir.path().join("clay.db")).await.unwrap();
    let blog = Arc::new(blog);
    let tweets = Arc::new(tweets);
    let state = AppState::new(db.clone(), blog.clone(), tweets.clone())
        .with_media_root(site.join("media"))
        .with_templates_root(site.join("templates"))
        .with_debug(debug);

    TestSite {
        _dir: dir,
        db,
        blog,
        tweets,
        state,
    }
}

async fn get(site: &TestSite, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = build_router(site.state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn tweet(text: &str) -> Tweet {
    Tweet {
        created_at: "Wed Aug 27 13:08:45 +0000 2008".to_string(),
        text: text.to_string(),
        in_reply_to_status_id: None,
        retweeted_status: None,
    }
}

async fn insert_photo(db: &SqlitePool, id: i64, title: &str) {
    sqlx::query(
        r#"
        INSERT INTO flickr_photo (
            flickr_id, owner, owner_nsid, title, slug, taken_date, upload_date, update_date,
            photopage_url, farm, server, secret, license
        ) VALUES (?, 'samuelclay', '12@N00', ?, ?, '2008-05-03 09:00:00', '2008-05-04 10:00:00',
                  '2008-05-04 10:00:00', ?, 1, 45, 'abc', '0')
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(title.to_lowercase())
    .bind(format!("http://www.flickr.com/photos/samuelclay/{}/", id))
    .execute(db)
    .await
    .unwrap();
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let site = setup(CannedBlog::default(), CannedTweets::default(), false).await;
    let (status, body) = get(&site, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "clay-web");
    assert!(body["version"].is_string());
    assert_eq!(body["database"]["reachable"], true);
    assert_eq!(body["database"]["synced_photos"], 0);
}

#[tokio::test]
async fn test_health_reports_photos_and_cache() {
    let site = setup(CannedBlog::default(), CannedTweets::default(), false).await;
    insert_photo(&site.db, 101, "Harbor").await;
    insert_photo(&site.db, 102, "Bridge").await;

    // Front page fills the blog, tweets and photos entries
    let (status, _) = get(&site, "/").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&site, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["database"]["synced_photos"], 2);
    assert_eq!(body["database"]["live_cache_entries"], 3);
}

#[tokio::test]
async fn test_health_degraded_without_database() {
    let site = setup(CannedBlog::default(), CannedTweets::default(), false).await;
    site.db.close().await;

    let (status, body) = get(&site, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"]["reachable"], false);
}

// =============================================================================
// Front page
// =============================================================================

#[tokio::test]
async fn test_index_renders_sources_and_caches_them() {
    let blog = CannedBlog {
        entries: vec![BlogEntry {
            title: "Riding the Charles".to_string(),
            link: "http://www.ofbrooklyn.com/2008/riding/".to_string(),
            summary: "<p>Along the river</p>".to_string(),
            updated: None,
        }],
        ..Default::default()
    };
    let tweets = CannedTweets {
        tweets: Some(vec![tweet("New photos #bikes")]),
        ..Default::default()
    };
    let site = setup(blog, tweets, false).await;
    for id in 1..=8 {
        insert_photo(&site.db, id, &format!("Photo{}", id)).await;
    }

    let (status, html) = get(&site, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Riding the Charles"));
    assert!(html.contains("Along the river"));
    assert!(html.contains(r#"<a href="http://search.twitter.com/search?q=bikes""#));
    assert!(html.contains(" ago</span>"));
    assert!(ISA_QUOTES.iter().any(|q| html.contains(q)));
    // Eight photos make a row of seven and a row of one
    assert_eq!(html.matches(r#"class="photo-row""#).count(), 2);
    assert_eq!(html.matches("<img ").count(), 8);

    let (status, _) = get(&site, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(site.blog.calls.load(Ordering::SeqCst), 1);
    assert_eq!(site.tweets.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_twitter_caches_empty_list() {
    let site = setup(CannedBlog::default(), CannedTweets::default(), false).await;

    let (status, html) = get(&site, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!html.contains(r#"class="tweet""#));

    get(&site, "/").await;
    assert_eq!(site.tweets.calls.load(Ordering::SeqCst), 1);
    // An empty blog is not worth caching
    assert_eq!(site.blog.calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Project pages and static trees
// =============================================================================

#[tokio::test]
async fn test_project_page_with_optional_slash() {
    let site = setup(CannedBlog::default(), CannedTweets::default(), false).await;

    for uri in ["/schedulerjones", "/schedulerjones/"] {
        let (status, html) = get(&site, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(html, "<h1>Scheduler Jones</h1>");
    }
}

#[tokio::test]
async fn test_bikes_page_requires_slash() {
    let site = setup(CannedBlog::default(), CannedTweets::default(), false).await;

    let (status, html) = get(&site, "/boston-bikes/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(html, "<h1>Boston Bikes</h1>");

    let (status, _) = get(&site, "/boston-bikes").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_template_and_unknown_page_are_404() {
    let site = setup(CannedBlog::default(), CannedTweets::default(), false).await;

    let (status, body) = get(&site, "/caselife").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = get(&site, "/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_tree_served_from_sibling_directory() {
    let site = setup(CannedBlog::default(), CannedTweets::default(), false).await;

    let (status, body) = get(&site, "/boston-bikes/bike_crashes.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "var crashes = [];");

    let (status, _) = get(&site, "/boston-bikes/missing.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&site, "/unknown/file.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_media_only_in_debug() {
    let site = setup(CannedBlog::default(), CannedTweets::default(), false).await;
    let (status, _) = get(&site, "/static/css/main.css").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let site = setup(CannedBlog::default(), CannedTweets::default(), true).await;
    let (status, body) = get(&site, "/static/css/main.css").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "body { margin: 0; }");
}
