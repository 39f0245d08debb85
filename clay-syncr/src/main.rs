//! syncr - pull third-party data into the site database
//!
//! One subcommand per synchronizer. Credentials and default account names
//! come from `clay.toml`; the database is created on first run.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use clay_common::config::{ensure_root_folder, resolve_root_folder, TomlConfig};
use clay_common::db::init_database;
use clay_syncr::flickr::{FlickrClient, FlickrSyncr};
use clay_syncr::genericfeed::GenericFeedSyncr;
use clay_syncr::http::HttpFetcher;
use clay_syncr::magnolia::MagnoliaSyncr;
use clay_syncr::picasaweb::{AlbumRef, PicasawebSyncr};
use clay_syncr::youtube::YoutubeSyncr;

/// Command-line arguments for syncr
#[derive(Parser, Debug)]
#[command(name = "syncr")]
#[command(about = "Synchronize Flickr, Picasa, YouTube, Magnolia and feeds into the site database")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, env = "CLAY_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, env = "CLAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flickr photos, sets and favorites
    Flickr {
        #[command(subcommand)]
        action: FlickrAction,
    },
    /// Picasa Web Albums
    Picasaweb {
        #[command(subcommand)]
        action: PicasawebAction,
    },
    /// YouTube users, videos and playlists
    Youtube {
        #[command(subcommand)]
        action: YoutubeAction,
    },
    /// Ma.gnolia bookmarks of the configured user
    Magnolia,
    /// Any RSS 2.0 or Atom feed
    Feed { url: String },
}

#[derive(Subcommand, Debug)]
enum FlickrAction {
    /// Photos uploaded in the last few days
    Recent {
        #[arg(long, default_value_t = 7)]
        days: i64,
        #[arg(long)]
        user: Option<String>,
    },
    /// Every public photo
    Public {
        #[arg(long)]
        user: Option<String>,
    },
    /// Every page of public favorites
    Favorites {
        #[arg(long)]
        user: Option<String>,
    },
    /// Every photo set, in Flickr's order
    Sets {
        #[arg(long)]
        user: Option<String>,
    },
    /// One photo set
    Set { id: String },
    /// One photo
    Photo {
        id: String,
        /// Delete and re-create the stored copy
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PicasawebAction {
    /// Every album of the user
    Albums {
        #[arg(long)]
        user: Option<String>,
    },
    /// One album, by name or numeric id
    Album {
        album: String,
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum YoutubeAction {
    User { name: String },
    Playlists { name: String },
    Favorites { name: String },
    Uploads { name: String },
    Video { id: String },
    Playlist { id: String },
}

/// Explicit `--user`, else the configured account
fn account(explicit: Option<String>, configured: &str, service: &str) -> Result<String> {
    match explicit {
        Some(user) => Ok(user),
        None if !configured.is_empty() => Ok(configured.to_string()),
        None => bail!("No {} username given and none configured", service),
    }
}

async fn run_flickr(action: FlickrAction, config: &TomlConfig, pool: SqlitePool) -> Result<()> {
    if config.flickr.api_key.is_empty() {
        bail!("[flickr] api_key is not configured");
    }
    let mut client = FlickrClient::new(&config.flickr.api_key)?;
    if let Some(endpoint) = &config.flickr.endpoint {
        client = client.with_endpoint(endpoint);
    }
    let syncr = FlickrSyncr::new(client, pool);
    let configured = config.flickr.username.as_str();

    match action {
        FlickrAction::Recent { days, user } => {
            let user = account(user, configured, "Flickr")?;
            let count = syncr.sync_recent_photos(&user, days).await?;
            info!("Synced {} recent photos of {}", count, user);
        }
        FlickrAction::Public { user } => {
            let user = account(user, configured, "Flickr")?;
            let count = syncr.sync_all_public(&user).await?;
            info!("Synced {} public photos of {}", count, user);
        }
        FlickrAction::Favorites { user } => {
            let user = account(user, configured, "Flickr")?;
            let list = syncr.sync_public_favorites(&user).await?;
            info!("Synced favorites: {}", list);
        }
        FlickrAction::Sets { user } => {
            let user = account(user, configured, "Flickr")?;
            let count = syncr.sync_all_photo_sets(&user).await?;
            info!("Synced {} photo sets of {}", count, user);
        }
        FlickrAction::Set { id } => {
            let set = syncr
                .sync_photo_set(&id, None)
                .await
                .with_context(|| format!("Failed to sync photo set {}", id))?;
            info!("Synced photo set {}", set);
        }
        FlickrAction::Photo { id, refresh } => match syncr.sync_photo(&id, refresh).await? {
            Some(photo) => info!("Synced photo {}", photo),
            None => info!("Photo {} is not a photo, skipped", id),
        },
    }
    Ok(())
}

async fn run_picasaweb(action: PicasawebAction, config: &TomlConfig, pool: SqlitePool) -> Result<()> {
    let fetch = HttpFetcher::new()?.with_bearer_token(&config.picasaweb.access_token);
    let mut syncr = PicasawebSyncr::new(fetch, pool)
        .with_thumbsizes(config.picasaweb.thumbsizes.clone())
        .with_imgmax(config.picasaweb.imgmax.clone());
    if let Some(endpoint) = &config.picasaweb.endpoint {
        syncr = syncr.with_endpoint(endpoint);
    }
    let configured = config.picasaweb.username.as_str();

    match action {
        PicasawebAction::Albums { user } => {
            let user = account(user, configured, "Picasa")?;
            let count = syncr.sync_all_albums(&user).await?;
            info!("Synced {} albums of {}", count, user);
        }
        PicasawebAction::Album { album, user } => {
            let user = account(user, configured, "Picasa")?;
            let stored = syncr
                .sync_album(AlbumRef::parse(&album), &user)
                .await
                .with_context(|| format!("Failed to sync album {}", album))?;
            info!("Synced album {}", stored);
        }
    }
    Ok(())
}

async fn run_youtube(action: YoutubeAction, config: &TomlConfig, pool: SqlitePool) -> Result<()> {
    let mut syncr = YoutubeSyncr::new(HttpFetcher::new()?, pool);
    if let Some(endpoint) = &config.youtube.endpoint {
        syncr = syncr.with_base(endpoint);
    }

    match action {
        YoutubeAction::User { name } => {
            let user = syncr.sync_user(&name).await?;
            info!("Synced user {}", user);
        }
        YoutubeAction::Playlists { name } => {
            let playlists = syncr.sync_user_playlists(&name).await?;
            info!("Synced {} playlists of {}", playlists.len(), name);
        }
        YoutubeAction::Favorites { name } => {
            let videos = syncr.sync_user_favorites(&name).await?;
            info!("{} has {} favorites", name, videos.len());
        }
        YoutubeAction::Uploads { name } => {
            let videos = syncr.sync_user_uploads(&name).await?;
            info!("{} has {} uploads", name, videos.len());
        }
        YoutubeAction::Video { id } => {
            let video = syncr.sync_video(&id).await?;
            info!("Synced video {}", video);
        }
        YoutubeAction::Playlist { id } => {
            let playlist = syncr.sync_playlist(&id).await?;
            info!("Synced playlist {}", playlist);
        }
    }
    Ok(())
}

async fn run_magnolia(config: &TomlConfig, pool: SqlitePool) -> Result<()> {
    if config.magnolia.api_key.is_empty() {
        bail!("[magnolia] api_key is not configured");
    }
    let person = account(None, &config.magnolia.username, "Magnolia")?;
    let mut syncr = MagnoliaSyncr::new(HttpFetcher::new()?, pool, &config.magnolia.api_key);
    if let Some(endpoint) = &config.magnolia.endpoint {
        syncr = syncr.with_endpoint(endpoint);
    }
    let created = syncr.sync_links(&person).await?;
    info!("Created {} links", created);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Tracing before config so loader warnings are visible; the configured
    // level is applied afterwards unless RUST_LOG is set
    let (filter, filter_handle) =
        reload::Layer::new(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none() {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&config.logging.level)) {
            warn!("Could not apply log level {:?}: {}", config.logging.level, e);
        }
    }

    info!(
        "Starting syncr v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    ensure_root_folder(&root_folder).context("Failed to initialize root folder")?;
    let db_path = config.database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match args.command {
        Command::Flickr { action } => run_flickr(action, &config, pool).await?,
        Command::Picasaweb { action } => run_picasaweb(action, &config, pool).await?,
        Command::Youtube { action } => run_youtube(action, &config, pool).await?,
        Command::Magnolia => run_magnolia(&config, pool).await?,
        Command::Feed { url } => {
            let syncr = GenericFeedSyncr::new(HttpFetcher::new()?, pool);
            match syncr.sync_feed(&url).await? {
                Some(feed) => info!("Synced feed {}", feed),
                None => info!("Feed {} skipped", url),
            }
        }
    }

    Ok(())
}
