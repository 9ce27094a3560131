//! Engine configuration
//!
//! Loaded from TOML through `tint_common::config`; every field has a
//! compiled default so an absent or partial file is always usable.
//!
//! ```toml
//! extraction_timeout_ms = 2000
//! variable_prefix = "--tint"
//! presets_file = "/etc/tint/presets.toml"
//!
//! [user]
//! music_reactive = true
//! aggregation = "blend"
//!
//! [tier]
//! hysteresis_samples = 3
//!
//! [logging]
//! level = "debug"
//! ```

use crate::authority::{LatencyBudgets, DEFAULT_PREFIX};
use crate::error::{Error, Result};
use crate::performance::TierConfig;
use crate::processing::OrchestratorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tint_common::config::{load_toml_or_default, resolve_config_path, CONFIG_ENV_VAR};
use tint_common::logging::LoggingConfig;
use tint_common::{PresetTable, UserConfig};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub extraction_timeout_ms: u64,
    pub debounce_ms: u64,
    pub event_bus_capacity: usize,
    pub variable_prefix: String,
    pub commit_budget_ms: u64,
    pub skip_budget_ms: u64,
    /// Optional preset table layered over the built-in one
    pub presets_file: Option<PathBuf>,
    pub user: UserConfig,
    pub tier: TierConfig,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extraction_timeout_ms: 2000,
            debounce_ms: 0,
            event_bus_capacity: 256,
            variable_prefix: DEFAULT_PREFIX.to_string(),
            commit_budget_ms: 15,
            skip_budget_ms: 2,
            presets_file: None,
            user: UserConfig::default(),
            tier: TierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Resolve and load the configuration file
    ///
    /// Priority: `explicit` path, then `TINT_CONFIG`, then the per-user file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(explicit, CONFIG_ENV_VAR);
        let config: EngineConfig = load_toml_or_default(path.as_deref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = tint_common::config::parse_toml(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extraction_timeout_ms == 0 {
            return Err(Error::Config("extraction_timeout_ms must be positive".to_string()));
        }
        if self.event_bus_capacity == 0 {
            return Err(Error::Config("event_bus_capacity must be positive".to_string()));
        }
        if self.variable_prefix.trim().is_empty() {
            return Err(Error::Config("variable_prefix must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.user.intensity) {
            return Err(Error::Config(format!(
                "user.intensity must be within [0, 1], got {}",
                self.user.intensity
            )));
        }
        if self.tier.low_frame_ms < self.tier.medium_frame_ms {
            return Err(Error::Config(format!(
                "tier.low_frame_ms ({}) must not be below tier.medium_frame_ms ({})",
                self.tier.low_frame_ms, self.tier.medium_frame_ms
            )));
        }
        Ok(())
    }

    /// Built-in presets, overlaid with `presets_file` when set
    pub fn presets(&self) -> Result<PresetTable> {
        match &self.presets_file {
            Some(path) => {
                let table = PresetTable::load_file(path)?;
                info!(
                    "Loaded preset table v{} ({} genres) from {}",
                    table.version,
                    table.presets.len(),
                    path.display()
                );
                Ok(table)
            }
            None => Ok(PresetTable::builtin()),
        }
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            extraction_timeout: Duration::from_millis(self.extraction_timeout_ms),
            debounce: Duration::from_millis(self.debounce_ms),
            user: self.user.clone(),
        }
    }

    pub fn budgets(&self) -> LatencyBudgets {
        LatencyBudgets {
            commit: Duration::from_millis(self.commit_budget_ms),
            skip: Duration::from_millis(self.skip_budget_ms),
        }
    }
}
