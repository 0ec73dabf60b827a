//! Configuration file locations
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/loadero-ci/`
//! - macOS: `~/Library/Application Support/loadero-ci/`
//! - Windows: `%APPDATA%\loadero-ci\`

use std::path::PathBuf;

/// Application name used for the configuration directory
const APP_NAME: &str = "loadero-ci";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
