mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./recast.toml",
        "~/.config/recast/config.toml",
        "/etc/recast/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.storage.retention_secs == 0 {
        anyhow::bail!("Artifact retention cannot be 0 seconds");
    }

    if config.storage.sweep_interval_secs == 0 {
        anyhow::bail!("Sweep interval cannot be 0 seconds");
    }

    if config.queue.capacity == 0 {
        anyhow::bail!("Queue capacity cannot be 0");
    }

    if config.retry.max_attempts == 0 {
        anyhow::bail!("Retry attempts cannot be 0; a job is always tried once");
    }

    if config.engines.timeout_secs == 0 {
        anyhow::bail!("Engine timeout cannot be 0 seconds");
    }

    // A configured format table must exist up front, not at first use
    if let Some(path) = &config.formats.path {
        if !path.exists() {
            anyhow::bail!("Format table does not exist: {:?}", path);
        }
    }

    Ok(())
}
