use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::Error;
use crate::vfs::SchemeOptions;

/// Global configuration loaded from `~/.config/ferry/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FerryConfig {
    /// Snapshot file override. When absent, the snapshot lives at
    /// `~/.local/state/ferry/data.json`.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    /// Options applied to `ftp://` locations.
    #[serde(default)]
    pub ftp: SchemeOptions,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ferry")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FerryConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FerryConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FerryConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// Default snapshot location under the XDG state directory.
pub fn default_data_file() -> crate::error::Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ferry")
        .map_err(|e| Error::Persistence(io::Error::other(e)))?;
    Ok(xdg_dirs.get_state_home().join("ferry").join("data.json"))
}
