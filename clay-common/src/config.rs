//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from `clay.toml`. Everything in it is
//! optional: a missing file logs a warning and the compiled defaults are
//! used instead.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `CLAY_ROOT_FOLDER` environment variable
//! 3. `root_folder` key in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "CLAY_ROOT_FOLDER";

/// Environment variable naming an explicit config file
pub const CONFIG_FILE_ENV: &str = "CLAY_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "clay.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and media
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path (overrides `<root>/clay.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub flickr: FlickrConfig,

    #[serde(default)]
    pub picasaweb: PicasawebConfig,

    #[serde(default)]
    pub youtube: YoutubeConfig,

    #[serde(default)]
    pub magnolia: MagnoliaConfig,

    #[serde(default)]
    pub twitter: TwitterConfig,

    #[serde(default)]
    pub blog: BlogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served under `/static`; project trees are its siblings
    #[serde(default)]
    pub media_root: Option<PathBuf>,

    /// Directory holding the project page templates
    #[serde(default)]
    pub templates_root: Option<PathBuf>,

    /// Serve `/static` from the media root
    #[serde(default = "default_true")]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            media_root: None,
            templates_root: None,
            debug: true,
        }
    }
}

/// Flickr API credentials and the account synced by default
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlickrConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub username: String,
    /// REST endpoint override (tests, proxies)
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Picasa Web Albums access
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PicasawebConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub username: String,
    /// Three thumbnail sizes, e.g. `["72c", "160c", "288"]`
    #[serde(default)]
    pub thumbsizes: Vec<String>,
    /// Maximum size of `content_url` images
    #[serde(default)]
    pub imgmax: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// YouTube GData feed host
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Magnolia bookmarks API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MagnoliaConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Twitter timeline shown on the front page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwitterConfig {
    #[serde(default)]
    pub bearer_token: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Blog feed shown on the front page
#[derive(Debug, Clone, Deserialize)]
pub struct BlogConfig {
    #[serde(default = "default_blog_feed")]
    pub feed_url: String,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            feed_url: default_blog_feed(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_blog_feed() -> String {
    "http://www.ofbrooklyn.com/feeds/all/".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from the explicit path, `CLAY_CONFIG`, or the platform config
    /// location. A missing file yields defaults; a malformed one is an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from))
            .or_else(default_config_file);

        match candidate {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("No config file location available, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Resolve the database path: explicit setting, else `<root>/clay.db`
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME))
    }

    /// Media root, defaulting to `<root>/media`
    pub fn media_root(&self, root_folder: &Path) -> PathBuf {
        self.server
            .media_root
            .clone()
            .unwrap_or_else(|| root_folder.join("media"))
    }

    /// Templates root, defaulting to `<root>/templates`
    pub fn templates_root(&self, root_folder: &Path) -> PathBuf {
        self.server
            .templates_root
            .clone()
            .unwrap_or_else(|| root_folder.join("templates"))
    }
}

/// Resolve the root folder following the priority order above
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Create the root folder if it is missing
pub fn ensure_root_folder(root_folder: &Path) -> Result<()> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(())
}

/// Platform config file location (`~/.config/clay/clay.toml` on Linux)
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("clay").join("clay.toml"))
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("clay"))
        .unwrap_or_else(|| PathBuf::from("./clay_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.debug);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.blog.feed_url, "http://www.ofbrooklyn.com/feeds/all/");
        assert!(config.flickr.api_key.is_empty());
    }

    #[test]
    fn test_sections_parse() {
        let config = TomlConfig::from_toml_str(
            r#"
            root_folder = "/srv/clay"

            [server]
            port = 9000
            debug = false

            [flickr]
            api_key = "key"
            username = "samuelclay"

            [picasaweb]
            thumbsizes = ["72c", "160c", "288"]
            imgmax = "800"
            "#,
        )
        .unwrap();

        assert_eq!(config.root_folder, Some(PathBuf::from("/srv/clay")));
        assert_eq!(config.server.port, 9000);
        assert!(!config.server.debug);
        assert_eq!(config.flickr.username, "samuelclay");
        assert_eq!(config.picasaweb.thumbsizes.len(), 3);
        assert_eq!(config.picasaweb.imgmax.as_deref(), Some("800"));
    }

    #[test]
    fn test_malformed_config_is_error() {
        let result = TomlConfig::from_toml_str("[server\nport = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_database_path_defaults_to_root() {
        let config = TomlConfig::default();
        let path = config.database_path(Path::new("/srv/clay"));
        assert_eq!(path, PathBuf::from("/srv/clay/clay.db"));

        let config = TomlConfig {
            database_path: Some(PathBuf::from("/tmp/other.db")),
            ..Default::default()
        };
        assert_eq!(
            config.database_path(Path::new("/srv/clay")),
            PathBuf::from("/tmp/other.db")
        );
    }

    #[test]
    fn test_cli_arg_wins() {
        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let resolved = resolve_root_folder(Some(Path::new("/from/cli")), &config);
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }
}
