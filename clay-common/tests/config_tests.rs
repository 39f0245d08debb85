//! Tests for root folder resolution and config loading
//!
//! Uses serial_test because the resolver reads CLAY_ROOT_FOLDER / CLAY_CONFIG.

use clay_common::config::{resolve_root_folder, TomlConfig, CONFIG_FILE_ENV, ROOT_FOLDER_ENV};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

/// Log sink shared between a test and the subscriber it installs
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, &config);
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_toml_beats_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_default_when_nothing_set() {
    env::remove_var(ROOT_FOLDER_ENV);
    let resolved = resolve_root_folder(None, &TomlConfig::default());

    assert!(resolved.ends_with("clay") || resolved.ends_with("clay_data"));
}

#[test]
#[serial]
fn test_missing_config_file_yields_defaults() {
    env::remove_var(CONFIG_FILE_ENV);
    let config = TomlConfig::load_or_default(Some(Path::new("/nonexistent/clay.toml"))).unwrap();

    assert_eq!(config.server.port, 8000);
    assert!(config.root_folder.is_none());
}

#[test]
#[serial]
fn test_missing_config_file_is_logged() {
    env::remove_var(CONFIG_FILE_ENV);
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("clay.toml");

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let config = tracing::subscriber::with_default(subscriber, || TomlConfig::load_or_default(Some(&missing)));

    assert!(config.is_ok());
    let output = logs.text();
    assert!(output.contains("WARN"), "no warning in {:?}", output);
    assert!(output.contains(&format!("Config file {} not found, using defaults", missing.display())));
}

#[test]
#[serial]
fn test_config_file_from_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clay.toml");
    std::fs::write(
        &path,
        r#"
        [flickr]
        api_key = "abc"
        username = "samuelclay"

        [twitter]
        username = "samuelclay"
        "#,
    )
    .unwrap();

    env::set_var(CONFIG_FILE_ENV, &path);
    let config = TomlConfig::load_or_default(None);
    env::remove_var(CONFIG_FILE_ENV);

    let config = config.unwrap();
    assert_eq!(config.flickr.api_key, "abc");
    assert_eq!(config.twitter.username, "samuelclay");
}

#[test]
fn test_media_and_templates_default_under_root() {
    let config = TomlConfig::default();
    let root = Path::new("/srv/clay");

    assert_eq!(config.media_root(root), PathBuf::from("/srv/clay/media"));
    assert_eq!(config.templates_root(root), PathBuf::from("/srv/clay/templates"));
}
