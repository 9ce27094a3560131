//! Configuration file resolution and loading
//!
//! Missing configuration never prevents startup: a warning is logged and
//! compiled defaults are used. A file that exists but cannot be parsed is
//! reported as an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "TINT_CONFIG";

/// Configuration file resolution in priority order:
/// 1. Explicit path argument (highest priority)
/// 2. Environment variable (`TINT_CONFIG`)
/// 3. Per-user config file (`<config dir>/tint/config.toml`), if it exists
/// 4. None (compiled defaults)
pub fn resolve_config_path(explicit: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: explicit argument
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: per-user config file
    default_config_file().filter(|path| path.exists())
}

/// Platform config location (`~/.config/tint/config.toml` on Linux)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tint").join("config.toml"))
}

/// Parse a TOML document into `T`
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(toml::from_str(content)?)
}

/// Load `T` from a TOML file, falling back to `T::default()` when absent
///
/// - `None` path or missing file: warning + defaults
/// - unreadable or malformed file: `Error::Config`
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        info!("No configuration file, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!(
            "Configuration file {} not found, using compiled defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let parsed = parse_toml(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(parsed)
}
