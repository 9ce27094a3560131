//! Music-reactive strategy
//!
//! Scores the heaviest samples against the track's energy, then lets the
//! audio features bend the chosen base color before harmony derivation:
//! energy drives chroma, valence rotates hue, tempo nudges lightness.
//! Higher tiers score more candidates; the low tier derives from the
//! dominant sample only.

use super::{palette_result, ColorStrategy};
use crate::color::space::{normalize_hue, to_perceptual_lch, Oklch};
use crate::color::HarmonyDeriver;
use crate::error::{Error, Result};
use std::sync::Arc;
use tint_common::{ColorContext, ColorResult, MusicFeatures, PresetTable, QualityTier};

pub const NAME: &str = "music-reactive";
pub const DEFAULT_PRIORITY: u32 = 30;

/// Chroma treated as "fully saturated" when scoring candidates
const REFERENCE_CHROMA: f64 = 0.32;
/// Maximum hue rotation at full valence deviation and intensity
const VALENCE_HUE_RANGE: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct MusicReactiveStrategy {
    presets: Arc<PresetTable>,
    priority: u32,
}

impl MusicReactiveStrategy {
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

/// How well a candidate suits the track: heavier, more saturated colors
/// win, with saturation matched to energy and extreme lightness penalised
fn candidate_score(lch: Oklch, weight: f64, energy: f64) -> f64 {
    let chroma = (lch.c / REFERENCE_CHROMA).min(1.0);
    let energy_fit = 1.0 - (chroma - energy).abs() * 0.5;
    let lightness_fit = if lch.l < 0.15 || lch.l > 0.95 { 0.5 } else { 1.0 };
    weight.max(0.0) * (0.5 + 0.5 * chroma) * energy_fit * lightness_fit
}

/// Bend a base color by the track's audio features
pub fn modulate(base: Oklch, features: &MusicFeatures, intensity: f64) -> Oklch {
    let intensity = if intensity.is_finite() {
        intensity.clamp(0.0, 1.0)
    } else {
        1.0
    };

    let chroma_scale = 1.0 + ((0.7 + 0.6 * features.energy) - 1.0) * intensity;
    let hue_rotation = (features.valence - 0.5) * VALENCE_HUE_RANGE * intensity;
    let tempo = ((features.tempo - 60.0) / 120.0).clamp(0.0, 1.0);
    let lightness_scale = 1.0 + ((0.95 + 0.1 * tempo) - 1.0) * intensity;

    Oklch {
        l: (base.l * lightness_scale).clamp(0.0, 1.0),
        c: (base.c * chroma_scale).max(0.0),
        h: normalize_hue(base.h + hue_rotation),
    }
}

impl ColorStrategy for MusicReactiveStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn can_process(&self, context: &ColorContext) -> bool {
        context.has_colors()
            && context.user_config.music_reactive
            && !context.music_features.is_neutral()
    }

    fn estimated_cost(&self, context: &ColorContext) -> f64 {
        let candidates = context
            .device_tier
            .candidate_count()
            .min(context.raw_colors.len())
            .max(1);
        2.0 * candidates as f64
    }

    fn process(&self, context: &ColorContext, tier: QualityTier) -> Result<ColorResult> {
        let features = &context.music_features;

        let base = context
            .samples_by_weight()
            .into_iter()
            .take(tier.candidate_count())
            .map(|sample| {
                let lch = to_perceptual_lch(sample.color);
                (lch, candidate_score(lch, sample.weight, features.energy))
            })
            .fold(None, |best: Option<(Oklch, f64)>, (lch, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((lch, score)),
            })
            .map(|(lch, _)| lch)
            .ok_or_else(|| Error::strategy(NAME, "no colors in context"))?;

        let modulated = modulate(base, features, context.user_config.intensity);
        let preset = self.presets.lookup(features.genre.as_deref());
        let palette = HarmonyDeriver::derive_palette(modulated, preset);

        Ok(palette_result(NAME, context, tier, &palette))
    }
}
