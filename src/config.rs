//! Configuration loading and management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::controller::ControllerSettings;

const DEFAULT_APP_ID: &str = "capture-session";
const CONFIG_FILE: &str = "config.toml";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Application identifier, scopes the preference record
    pub app_id: String,

    /// Where captured photos and movies are kept
    pub media_dir: PathBuf,

    /// How long the shutter flash stays raised
    pub flash_duration: Duration,

    /// Property events buffered per subscriber
    pub event_capacity: usize,

    /// Whether the simulated camera grants access
    pub camera_authorized: bool,
}

/// Optional overrides read from `config.toml` in the data directory
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    socket_path: Option<PathBuf>,
    media_dir: Option<PathBuf>,
    app_id: Option<String>,
    flash_duration_ms: Option<u64>,
    event_capacity: Option<usize>,
    camera_authorized: Option<bool>,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("capture-session");

        Self::from_data_dir(data_dir)
    }

    /// Defaults rooted at `data_dir`, overridden by its `config.toml` if present
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let file = read_file_config(&data_dir.join(CONFIG_FILE))?;
        let defaults = ControllerSettings::default();

        Ok(Self {
            socket_path: file
                .socket_path
                .unwrap_or_else(|| data_dir.join("daemon.sock")),
            media_dir: file.media_dir.unwrap_or_else(|| data_dir.join("media")),
            app_id: file.app_id.unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            flash_duration: file
                .flash_duration_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.flash_duration),
            event_capacity: file.event_capacity.unwrap_or(defaults.event_capacity),
            camera_authorized: file.camera_authorized.unwrap_or(true),
            data_dir,
        })
    }

    /// Location of the persisted preference record
    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join(&self.app_id).join("camera-state.json")
    }

    /// Recordings wait here until the media library takes them
    pub fn pending_dir(&self) -> PathBuf {
        self.data_dir.join("pending")
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            flash_duration: self.flash_duration,
            event_capacity: self.event_capacity,
        }
    }

    /// Ensure data directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.data_dir.join(&self.app_id))?;
        std::fs::create_dir_all(&self.media_dir)?;
        Ok(())
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            toml::from_str(&content).with_context(|| format!("invalid {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}
