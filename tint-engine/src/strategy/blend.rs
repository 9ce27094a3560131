//! Weighted-blend strategy
//!
//! Mixes the heaviest samples in OKLab. Plain averaging pulls chroma toward
//! grey when hues disagree, so the blend keeps the averaged hue and lightness
//! but restores the weighted mean chroma of its inputs.

use super::{palette_result, ColorStrategy};
use crate::color::space::{to_perceptual, weighted_mean, Oklab};
use crate::color::HarmonyDeriver;
use crate::error::{Error, Result};
use std::sync::Arc;
use tint_common::{ColorContext, ColorResult, PresetTable, QualityTier};

pub const NAME: &str = "weighted-blend";
pub const DEFAULT_PRIORITY: u32 = 20;

/// Below this the averaged hue is unreliable (inputs cancelled out)
const MIN_BLEND_CHROMA: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct WeightedBlendStrategy {
    presets: Arc<PresetTable>,
    priority: u32,
}

impl WeightedBlendStrategy {
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

impl ColorStrategy for WeightedBlendStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn can_process(&self, context: &ColorContext) -> bool {
        context.user_config.blend_enabled
            && context.raw_colors.len() >= 2
            && context.device_tier != QualityTier::Low
    }

    fn estimated_cost(&self, context: &ColorContext) -> f64 {
        let samples = context
            .device_tier
            .blend_samples()
            .min(context.raw_colors.len());
        0.4 * samples as f64
    }

    fn process(&self, context: &ColorContext, tier: QualityTier) -> Result<ColorResult> {
        let samples: Vec<(Oklab, f64)> = context
            .samples_by_weight()
            .into_iter()
            .take(tier.blend_samples())
            .map(|s| (to_perceptual(s.color), s.weight))
            .collect();

        let mean = weighted_mean(&samples)
            .ok_or_else(|| Error::strategy(NAME, "total sample weight is not positive"))?;

        let total: f64 = samples.iter().map(|(_, w)| w.max(0.0)).sum();
        let mean_chroma = samples
            .iter()
            .map(|(lab, w)| lab.to_lch().c * w.max(0.0) / total)
            .sum::<f64>();

        let mut base = mean.to_lch();
        if base.c < MIN_BLEND_CHROMA {
            // Opposing hues cancelled: borrow the heaviest sample's hue
            if let Some((lab, _)) = samples.first() {
                base.h = lab.to_lch().h;
            }
        }
        base.c = base.c.max(mean_chroma);

        let preset = self.presets.lookup(context.music_features.genre.as_deref());
        let palette = HarmonyDeriver::derive_palette(base, preset);

        Ok(palette_result(NAME, context, tier, &palette))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::space::to_perceptual_lch;
    use tint_common::{MusicFeatures, RawColorSample, Rgb, UserConfig};

    fn context(colors: Vec<RawColorSample>, tier: QualityTier) -> ColorContext {
        ColorContext::new("track", 1, colors, MusicFeatures::neutral(), tier, UserConfig::default())
    }

    fn two_colors() -> Vec<RawColorSample> {
        vec![
            RawColorSample::new(Rgb::new(220, 40, 40), 0.5),
            RawColorSample::new(Rgb::new(40, 40, 220), 0.5),
        ]
    }

    #[test]
    fn test_applicability() {
        let strategy = WeightedBlendStrategy::new(Arc::new(PresetTable::builtin()));
        assert!(strategy.can_process(&context(two_colors(), QualityTier::High)));
        assert!(!strategy.can_process(&context(two_colors(), QualityTier::Low)));
        assert!(!strategy.can_process(&context(two_colors()[..1].to_vec(), QualityTier::High)));

        let mut ctx = context(two_colors(), QualityTier::High);
        ctx.user_config.blend_enabled = false;
        assert!(!strategy.can_process(&ctx));
    }

    #[test]
    fn test_zero_weights_fail() {
        let strategy = WeightedBlendStrategy::new(Arc::new(PresetTable::builtin()));
        let colors = vec![
            RawColorSample::new(Rgb::new(220, 40, 40), 0.0),
            RawColorSample::new(Rgb::new(40, 40, 220), 0.0),
        ];
        let result = strategy.process(&context(colors, QualityTier::High), QualityTier::High);
        assert!(matches!(result, Err(Error::Strategy { strategy: NAME, .. })));
    }

    #[test]
    fn test_blend_is_not_muddy() {
        let strategy = WeightedBlendStrategy::new(Arc::new(PresetTable::builtin()));
        let ctx = context(two_colors(), QualityTier::High);
        let result = strategy.process(&ctx, QualityTier::High).unwrap();

        let red = to_perceptual_lch(Rgb::new(220, 40, 40));
        let blue = to_perceptual_lch(Rgb::new(40, 40, 220));
        let expected_chroma = (red.c + blue.c) / 2.0;

        let primary = result.metadata.coordinates["primary"];
        let primary_chroma = (primary[1] * primary[1] + primary[2] * primary[2]).sqrt();
        assert!((primary_chroma - expected_chroma).abs() < 1e-6);
    }

    #[test]
    fn test_tier_limits_blended_samples() {
        let strategy = WeightedBlendStrategy::new(Arc::new(PresetTable::builtin()));
        let mut colors = two_colors();
        colors.push(RawColorSample::new(Rgb::new(40, 220, 40), 0.3));
        colors.push(RawColorSample::new(Rgb::new(240, 240, 40), 0.3));
        let ctx = context(colors, QualityTier::High);

        let low = strategy.process(&ctx, QualityTier::Low).unwrap();
        let high = strategy.process(&ctx, QualityTier::High).unwrap();
        assert!(!low.same_colors(&high));
    }
}
