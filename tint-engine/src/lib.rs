//! # Tint Engine
//!
//! Audio-reactive color pipeline: derives a perceptually harmonious palette
//! from album artwork colors and audio features, and publishes it as named
//! style variables through a single writer.
//!
//! **Flow:** extraction → `colors:extracted` → strategy selection and
//! evaluation → aggregation → `colors:harmonized` → state authority diff
//! and commit → `colors:applied`.

pub mod authority;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod performance;
pub mod processing;
pub mod strategy;

pub use authority::{MemorySink, StateAuthority, StyleSink};
pub use config::EngineConfig;
pub use engine::ThemeEngine;
pub use error::{Error, Result};
pub use performance::{PerformanceTierController, TierHandle};
pub use processing::{CycleOutcome, ProcessingOrchestrator};
pub use strategy::{ColorStrategy, StrategySelector};
