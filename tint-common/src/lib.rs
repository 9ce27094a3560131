//! # Tint Common Library
//!
//! Shared code for the tint color pipeline:
//! - Data model (colors, contexts, results, quality tiers)
//! - Event types (TintEvent enum) and the in-process EventBus
//! - Genre-keyed enhancement preset table
//! - Configuration file resolution and loading
//! - Tracing initialisation

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;
pub mod presets;

pub use error::{Error, Result};
pub use model::{
    AggregationPolicy, ColorContext, ColorResult, ColorResultMetadata, ColorRole, MusicFeatures,
    QualityTier, RawColorSample, Rgb, UserConfig,
};
pub use presets::{EnhancementPreset, PresetTable};
