//! Configuration loading.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::tick::TickConfig;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "ENGINE_APP_CONFIG";

/// Load the tick configuration.
///
/// Reads the file named by [`CONFIG_ENV`] if it is set, otherwise returns
/// [`TickConfig::default`].
pub fn load() -> Result<TickConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => from_path(path),
        Err(_) => {
            debug!("{CONFIG_ENV} not set, using default configuration");
            Ok(TickConfig::default())
        }
    }
}

/// Load the tick configuration from a JSON file. Missing fields take their
/// default values.
pub fn from_path(path: impl AsRef<Path>) -> Result<TickConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: TickConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config file {}", path.display()))?;
    info!(path = %path.display(), "loaded configuration");
    Ok(config)
}
