//! Color strategies
//!
//! A strategy turns a `ColorContext` into a `ColorResult`. Strategies only
//! compute: they never see the output sink, and their output depends on
//! nothing but the context and the quality tier they are invoked with.
//!
//! The set of selectable strategies is closed (`StrategyKind`) so the
//! selector can be tested exhaustively. `DefaultPaletteStrategy` is not part
//! of the registry; the orchestrator uses it when nothing else qualifies.

pub mod blend;
pub mod dominant;
pub mod fallback;
pub mod music;
pub mod selector;

pub use blend::WeightedBlendStrategy;
pub use dominant::DominantHueStrategy;
pub use fallback::DefaultPaletteStrategy;
pub use music::MusicReactiveStrategy;
pub use selector::StrategySelector;

use crate::color::space::{self, Oklab};
use crate::color::DerivedPalette;
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tint_common::{ColorContext, ColorResult, ColorResultMetadata, PresetTable, QualityTier, Rgb};
use uuid::Uuid;

/// Interchangeable palette algorithm
pub trait ColorStrategy: Send + Sync {
    /// Stable identifier reported in result metadata
    fn name(&self) -> &'static str;

    /// Declared precedence; higher wins
    fn priority(&self) -> u32;

    /// Whether this strategy applies to the context at all
    fn can_process(&self, context: &ColorContext) -> bool;

    /// Relative cost, used to break priority ties (lower first)
    fn estimated_cost(&self, context: &ColorContext) -> f64;

    /// Compute a result; must be pure in `(context, tier)`
    fn process(&self, context: &ColorContext, tier: QualityTier) -> Result<ColorResult>;
}

/// Closed registry of selectable strategies
#[derive(Debug, Clone)]
pub enum StrategyKind {
    MusicReactive(MusicReactiveStrategy),
    WeightedBlend(WeightedBlendStrategy),
    DominantHue(DominantHueStrategy),
    #[cfg(test)]
    Panicking(testing::PanickingStrategy),
}

impl StrategyKind {
    /// Every selectable strategy with its default priority
    pub fn standard_registry(presets: Arc<PresetTable>) -> Vec<StrategyKind> {
        vec![
            StrategyKind::MusicReactive(MusicReactiveStrategy::new(Arc::clone(&presets))),
            StrategyKind::WeightedBlend(WeightedBlendStrategy::new(Arc::clone(&presets))),
            StrategyKind::DominantHue(DominantHueStrategy::new(presets)),
        ]
    }

    fn inner(&self) -> &dyn ColorStrategy {
        match self {
            StrategyKind::MusicReactive(s) => s,
            StrategyKind::WeightedBlend(s) => s,
            StrategyKind::DominantHue(s) => s,
            #[cfg(test)]
            StrategyKind::Panicking(s) => s,
        }
    }
}

impl ColorStrategy for StrategyKind {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn priority(&self) -> u32 {
        self.inner().priority()
    }

    fn can_process(&self, context: &ColorContext) -> bool {
        self.inner().can_process(context)
    }

    fn estimated_cost(&self, context: &ColorContext) -> f64 {
        self.inner().estimated_cost(context)
    }

    fn process(&self, context: &ColorContext, tier: QualityTier) -> Result<ColorResult> {
        self.inner().process(context, tier)
    }
}

/// Build a result from perceptual colors keyed by processed-color name
///
/// Role fields are read back from the map; timing is filled in later by
/// the orchestrator.
pub fn assemble_result(
    strategy_name: impl Into<String>,
    source_context_id: Uuid,
    tier: QualityTier,
    entries: impl IntoIterator<Item = (String, Oklab)>,
) -> ColorResult {
    let mut processed_colors = BTreeMap::new();
    let mut coordinates = BTreeMap::new();
    for (key, lab) in entries {
        processed_colors.insert(key.clone(), space::to_rgb(lab));
        coordinates.insert(key, lab.to_array());
    }

    let role = |key: &str| processed_colors.get(key).copied().unwrap_or(Rgb::new(0, 0, 0));
    ColorResult {
        accent: role("accent"),
        primary: role("primary"),
        secondary: role("secondary"),
        shadow: role("shadow"),
        highlight: role("highlight"),
        metadata: ColorResultMetadata {
            strategy_name: strategy_name.into(),
            processing_time_ms: 0.0,
            coordinates,
            source_context_id,
            tier,
        },
        processed_colors,
    }
}

pub(crate) fn palette_result(
    strategy_name: &'static str,
    context: &ColorContext,
    tier: QualityTier,
    palette: &DerivedPalette,
) -> ColorResult {
    assemble_result(
        strategy_name,
        context.context_id,
        tier,
        palette
            .entries()
            .into_iter()
            .map(|(key, lch)| (key.to_string(), lch.to_lab())),
    )
}
