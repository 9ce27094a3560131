//! Dominant-hue strategy: single derivation from the heaviest sample

use super::{palette_result, ColorStrategy};
use crate::color::space::to_perceptual_lch;
use crate::color::HarmonyDeriver;
use crate::error::{Error, Result};
use std::sync::Arc;
use tint_common::{ColorContext, ColorResult, PresetTable, QualityTier};

pub const NAME: &str = "dominant-hue";
pub const DEFAULT_PRIORITY: u32 = 10;

/// Cheapest strategy; identical output at every tier
#[derive(Debug, Clone)]
pub struct DominantHueStrategy {
    presets: Arc<PresetTable>,
    priority: u32,
}

impl DominantHueStrategy {
    pub fn new(presets: Arc<PresetTable>) -> Self {
        Self {
            presets,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

impl ColorStrategy for DominantHueStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn can_process(&self, context: &ColorContext) -> bool {
        context.has_colors()
    }

    fn estimated_cost(&self, _context: &ColorContext) -> f64 {
        1.0
    }

    fn process(&self, context: &ColorContext, tier: QualityTier) -> Result<ColorResult> {
        let dominant = context
            .dominant()
            .ok_or_else(|| Error::strategy(NAME, "no colors in context"))?;

        let base = to_perceptual_lch(dominant.color);
        let preset = self.presets.lookup(context.music_features.genre.as_deref());
        let palette = HarmonyDeriver::derive_palette(base, preset);

        Ok(palette_result(NAME, context, tier, &palette))
    }
}
