//! clay-web library - the personal site's HTTP front end
//!
//! Serves the front page (blog, tweets, synced Flickr photos), project
//! pages rendered from template files, and the static trees beside them.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use clay_common::cache::Cache;

pub mod api;
pub mod error;
pub mod render;
pub mod sources;

use sources::{BlogSource, TweetSource};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database holding the synced tables and the cache
    pub db: SqlitePool,
    pub cache: Cache,
    pub blog: Arc<dyn BlogSource>,
    pub tweets: Arc<dyn TweetSource>,
    /// `/static` root; project trees are its siblings
    pub media_root: PathBuf,
    pub templates_root: PathBuf,
    /// Serve `/static` from the media root
    pub debug: bool,
}

impl AppState {
    pub fn new(db: SqlitePool, blog: Arc<dyn BlogSource>, tweets: Arc<dyn TweetSource>) -> Self {
        Self {
            cache: Cache::new(db.clone()),
            db,
            blog,
            tweets,
            media_root: PathBuf::from("media"),
            templates_root: PathBuf::from("templates"),
            debug: false,
        }
    }

    pub fn with_media_root(mut self, media_root: PathBuf) -> Self {
        self.media_root = media_root;
        self
    }

    pub fn with_templates_root(mut self, templates_root: PathBuf) -> Self {
        self.templates_root = templates_root;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Build application router
///
/// Literal routes (`/`, `/health`) win over the section patterns; unknown
/// sections answer 404.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index))
        .merge(api::health_routes())
        .route("/:section", get(api::project_page))
        .route("/:section/", get(api::project_page))
        .route("/:section/*path", get(api::static_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
