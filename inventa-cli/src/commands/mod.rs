//! Command handlers -- one module per subcommand

pub mod config;
pub mod library;
pub mod run;

use std::path::Path;

use inventa_core::config::InventaConfig;
use tracing::debug;

use crate::error::CliError;

/// Load the effective configuration.
///
/// A missing file at `path` falls back to defaults, still applying
/// environment overrides and validation.
pub async fn load_config(path: &Path) -> Result<InventaConfig, CliError> {
    if path.exists() {
        return Ok(InventaConfig::load(path).await?);
    }

    debug!(path = %path.display(), "config file not found, using defaults");
    let mut config = InventaConfig::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
