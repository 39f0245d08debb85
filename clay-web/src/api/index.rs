//! Front page
//!
//! Blog entries, tweets and photos are each cached for ten minutes. An
//! empty blog or photo list counts as a miss; an empty tweet list is a
//! valid cached value, so a failing Twitter is not retried on every hit.

use axum::{extract::State, response::Html};
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use clay_common::cache::DEFAULT_TTL_SECONDS;
use clay_syncr::flickr::models::random_photos;
use clay_syncr::flickr::Photo;

use crate::error::ApiResult;
use crate::render::{index_page, ISA_QUOTES};
use crate::sources::{fetch_shown_tweets, BlogEntry, ShownTweet};
use crate::AppState;

pub const BLOG_CACHE_KEY: &str = "blog";
pub const TWEETS_CACHE_KEY: &str = "tweets";
pub const PHOTOS_CACHE_KEY: &str = "photos";

async fn blog_entries(state: &AppState) -> ApiResult<Vec<BlogEntry>> {
    match state.cache.get::<Vec<BlogEntry>>(BLOG_CACHE_KEY).await? {
        Some(blog) if !blog.is_empty() => {
            debug!("Cached blog");
            Ok(blog)
        }
        _ => {
            debug!("Fetching blog");
            let blog = state.blog.entries().await.unwrap_or_else(|e| {
                warn!(error = %e, "Blog fetch failed");
                Vec::new()
            });
            state.cache.set(BLOG_CACHE_KEY, &blog, DEFAULT_TTL_SECONDS).await?;
            Ok(blog)
        }
    }
}

async fn tweets(state: &AppState) -> ApiResult<Vec<ShownTweet>> {
    if let Some(tweets) = state.cache.get::<Vec<ShownTweet>>(TWEETS_CACHE_KEY).await? {
        debug!("Cached twitter");
        return Ok(tweets);
    }

    debug!("Fetching twitter");
    let tweets = fetch_shown_tweets(state.tweets.as_ref()).await;
    state.cache.set(TWEETS_CACHE_KEY, &tweets, DEFAULT_TTL_SECONDS).await?;
    Ok(tweets)
}

async fn photos(state: &AppState) -> ApiResult<Vec<Photo>> {
    match state.cache.get::<Vec<Photo>>(PHOTOS_CACHE_KEY).await? {
        Some(photos) if !photos.is_empty() => {
            debug!("Cached flickr");
            Ok(photos)
        }
        _ => {
            debug!("Loading flickr photos");
            let photos = random_photos(&state.db).await?;
            state.cache.set(PHOTOS_CACHE_KEY, &photos, DEFAULT_TTL_SECONDS).await?;
            Ok(photos)
        }
    }
}

/// GET /
pub async fn index(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let blog = blog_entries(&state).await?;
    let tweets = tweets(&state).await?;
    let photos = photos(&state).await?;
    let isa_quote = ISA_QUOTES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(ISA_QUOTES[0]);

    Ok(Html(index_page(&blog, &tweets, &photos, isa_quote)))
}
