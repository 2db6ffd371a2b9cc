//! Config file discovery and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info};

use crate::schema::PulseConfig;

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the AgentPulse config directory.
/// Priority: `AGENTPULSE_CONFIG_DIR` env > `~/.agentpulse/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AGENTPULSE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".agentpulse");
    }
    PathBuf::from(".agentpulse")
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist (first run).
pub async fn load_config(path: &Path) -> Result<PulseConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(PulseConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: PulseConfig = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse config TOML at: {}", path.display()))?;

    info!(path = %path.display(), agents = config.agents.len(), "Loaded config");
    Ok(config)
}
