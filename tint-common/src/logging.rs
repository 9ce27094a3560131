//! Tracing initialisation for hosts embedding the pipeline

use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Install a global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false` if
/// a global subscriber was already installed (calling twice is harmless).
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

fn default_directive(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        "tint_engine=info,tint_common=info".to_string()
    } else if level.contains('=') {
        level.to_string()
    } else {
        format!("tint_engine={level},tint_common={level}")
    }
}
