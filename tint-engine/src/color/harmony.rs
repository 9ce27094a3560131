//! Harmony derivation
//!
//! Role-specific variants (shadow, highlight, hue-shifted accents) computed
//! from one base color with an enhancement preset. Every function here is a
//! deterministic pure function of its inputs.
//!
//! Shadow and highlight are algebraic mirrors of each other:
//!
//! ```text
//! shadow.L    = max(0.02, L × r)
//! highlight.L = min(1.00, L × (2 − r))      r = preset.shadow_reduction
//! ```
//!
//! so away from the clamps `shadow.L + highlight.L = 2L`.

use super::space::{self, normalize_hue, Oklch};
use tint_common::model::{KEY_ACCENT_ANALOGOUS, KEY_ACCENT_COMPLEMENT, KEY_GRADIENT_MID};
use tint_common::EnhancementPreset;

/// Darkest lightness a shadow may reach
pub const SHADOW_MIN_LIGHTNESS: f64 = 0.02;
/// Chroma retained by shadows
pub const SHADOW_CHROMA_FACTOR: f64 = 0.8;
/// Chroma retained by highlights
pub const HIGHLIGHT_CHROMA_FACTOR: f64 = 0.9;
/// Extra chroma given to the accent
const ACCENT_CHROMA_FACTOR: f64 = 1.1;
/// Chroma retained by the complementary secondary
const SECONDARY_CHROMA_FACTOR: f64 = 0.6;
/// Hue offset of the analogous accent variant
const ANALOGOUS_DEGREES: f64 = 30.0;
/// Lightness window for enhanced colors
const ENHANCED_LIGHTNESS: (f64, f64) = (0.05, 0.95);
/// Upper chroma bound; sRGB tops out around 0.32
const MAX_CHROMA: f64 = 0.37;

/// Harmony transforms
#[derive(Debug, Clone, Copy, Default)]
pub struct HarmonyDeriver;

/// Role-assigned colors derived from one base color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedPalette {
    pub accent: Oklch,
    pub primary: Oklch,
    pub secondary: Oklch,
    pub shadow: Oklch,
    pub highlight: Oklch,
}

impl HarmonyDeriver {
    /// Darkened, slightly desaturated variant; hue unchanged
    pub fn derive_shadow(base: Oklch, preset: &EnhancementPreset) -> Oklch {
        Oklch {
            l: (base.l * preset.shadow_reduction).max(SHADOW_MIN_LIGHTNESS),
            c: base.c * SHADOW_CHROMA_FACTOR,
            h: base.h,
        }
    }

    /// Lightened variant mirroring `derive_shadow`; hue unchanged
    pub fn derive_highlight(base: Oklch, preset: &EnhancementPreset) -> Oklch {
        Oklch {
            l: (base.l * (2.0 - preset.shadow_reduction)).min(1.0),
            c: base.c * HIGHLIGHT_CHROMA_FACTOR,
            h: base.h,
        }
    }

    /// Rotate hue modulo 360°, leaving lightness and chroma untouched
    pub fn derive_hue_shift(base: Oklch, degrees: f64) -> Oklch {
        Oklch {
            l: base.l,
            c: base.c,
            h: normalize_hue(base.h + degrees),
        }
    }

    pub fn complement(base: Oklch) -> Oklch {
        Self::derive_hue_shift(base, 180.0)
    }

    /// The two analogous neighbours (−offset, +offset)
    pub fn analogous(base: Oklch, offset_degrees: f64) -> (Oklch, Oklch) {
        (
            Self::derive_hue_shift(base, -offset_degrees),
            Self::derive_hue_shift(base, offset_degrees),
        )
    }

    /// Apply the preset's chroma and lightness boosts; hue unchanged
    pub fn enhance(base: Oklch, preset: &EnhancementPreset) -> Oklch {
        let (min_l, max_l) = ENHANCED_LIGHTNESS;
        Oklch {
            l: (base.l * preset.lightness_boost).clamp(min_l, max_l),
            c: (base.c * preset.chroma_boost).clamp(0.0, MAX_CHROMA),
            h: base.h,
        }
    }

    /// Full role assignment for a base color
    pub fn derive_palette(base: Oklch, preset: &EnhancementPreset) -> DerivedPalette {
        let primary = Self::enhance(base, preset);

        let mut accent = Self::derive_hue_shift(primary, preset.hue_shift_degrees);
        accent.c = (accent.c * ACCENT_CHROMA_FACTOR).min(MAX_CHROMA);

        let mut secondary = Self::complement(primary);
        secondary.c *= SECONDARY_CHROMA_FACTOR;

        DerivedPalette {
            accent,
            primary,
            secondary,
            shadow: Self::derive_shadow(primary, preset),
            highlight: Self::derive_highlight(primary, preset),
        }
    }
}

impl DerivedPalette {
    /// All processed keys with their perceptual colors, in a fixed order
    pub fn entries(&self) -> [(&'static str, Oklch); 8] {
        let (_, analogous) = HarmonyDeriver::analogous(self.accent, ANALOGOUS_DEGREES);
        let gradient_mid = space::lerp(self.primary.to_lab(), self.secondary.to_lab(), 0.5).to_lch();
        [
            ("accent", self.accent),
            ("primary", self.primary),
            ("secondary", self.secondary),
            ("shadow", self.shadow),
            ("highlight", self.highlight),
            (KEY_ACCENT_COMPLEMENT, HarmonyDeriver::complement(self.accent)),
            (KEY_ACCENT_ANALOGOUS, analogous),
            (KEY_GRADIENT_MID, gradient_mid),
        ]
    }
}
