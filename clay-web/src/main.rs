//! clay-web - personal site server
//!
//! Resolves the root folder, opens (or creates) the database, wires the
//! blog feed and Twitter timeline sources, and serves until Ctrl-C or
//! SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use clay_common::config::{ensure_root_folder, resolve_root_folder, TomlConfig};
use clay_common::db::init_database;
use clay_syncr::http::HttpFetcher;
use clay_web::sources::{FeedBlog, TwitterTimeline};
use clay_web::{build_router, AppState};

/// Command-line arguments for clay-web
#[derive(Parser, Debug)]
#[command(name = "clay-web")]
#[command(about = "Personal site server")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "CLAY_PORT")]
    port: Option<u16>,

    /// Root folder holding the database and media
    #[arg(short, long, env = "CLAY_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, env = "CLAY_CONFIG")]
    config: Option<PathBuf>,
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

    // Build identification first, before any database delay
    info!(
        "Starting clay-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    ensure_root_folder(&root_folder).context("Failed to initialize root folder")?;

    let db_path = config.database_path(&root_folder);
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let blog = FeedBlog::new(HttpFetcher::new()?, &config.blog.feed_url);
    let mut tweets = TwitterTimeline::new(
        HttpFetcher::new()?.with_bearer_token(&config.twitter.bearer_token),
        &config.twitter.username,
    );
    if let Some(endpoint) = &config.twitter.endpoint {
        tweets = tweets.with_endpoint(endpoint);
    }

    let media_root = config.media_root(&root_folder);
    let templates_root = config.templates_root(&root_folder);
    info!("Media root: {}", media_root.display());
    info!("Templates: {}", templates_root.display());

    let state = AppState::new(pool, Arc::new(blog), Arc::new(tweets))
        .with_media_root(media_root)
        .with_templates_root(templates_root)
        .with_debug(config.server.debug);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
