//! Shell configuration
//!
//! Parses `operator.toml` and exposes the application identity, the primary
//! surface geometry and the per-platform main process command.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "OPERATOR_CONFIG";

const CONFIG_FILE: &str = "operator.toml";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name, forwarded to the main process as `--name`
    pub name: String,

    /// Title of the primary surface
    pub title: String,

    /// Version string, forwarded as `--version`
    pub version: String,

    /// Names of environment variables handed to the surfaces
    pub env: Vec<String>,

    /// Primary surface size
    pub width: u32,
    pub height: u32,

    /// Main process command per platform
    pub linux_cmd: Option<String>,
    pub mac_cmd: Option<String>,
    pub win_cmd: Option<String>,

    /// Renderer executable; surfaces run headless without one
    pub render_cmd: Option<String>,

    /// Copy renderer stderr to the shell's stderr
    pub forward_console: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "operator".to_string(),
            title: "Operator".to_string(),
            version: "0.1.0".to_string(),
            env: Vec::new(),
            width: 750,
            height: 520,
            linux_cmd: None,
            mac_cmd: None,
            win_cmd: None,
            render_cmd: None,
            forward_console: false,
        }
    }
}

impl AppConfig {
    /// Main process command for the platform this binary was built for
    pub fn platform_command(&self) -> Option<&str> {
        let command = if cfg!(target_os = "macos") {
            &self.mac_cmd
        } else if cfg!(windows) {
            &self.win_cmd
        } else {
            &self.linux_cmd
        };

        command.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Tag name and title, e.g. for debug or test builds
    pub fn add_suffix(&mut self, suffix: &str) {
        self.name.push_str(suffix);
        self.title.push_str(suffix);
    }
}

/// First existing config file in lookup order
pub fn find_config(app_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    let candidates = [
        Some(app_dir.join(CONFIG_FILE)),
        dirs::config_dir().map(|dir| dir.join("operator").join(CONFIG_FILE)),
    ];
    candidates.into_iter().flatten().find(|path| path.exists())
}

/// Read the configuration for an application installed in `app_dir`
pub fn read_config(app_dir: &Path) -> Result<AppConfig> {
    match find_config(app_dir) {
        Some(path) => read_config_from_path(&path),
        None => {
            tracing::warn!("No {} found, using defaults", CONFIG_FILE);
            Ok(AppConfig::default())
        }
    }
}

/// Read configuration from a specific path
pub fn read_config_from_path(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    let config: AppConfig = toml::from_str(&content)?;

    tracing::debug!("Loaded config from {:?} for {}", path, config.name);

    Ok(config)
}
