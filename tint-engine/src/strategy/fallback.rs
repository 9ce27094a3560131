//! Built-in default palette
//!
//! Used whenever extraction fails, no strategy qualifies or every selected
//! strategy fails. "No color" is never a valid end state.

use super::{assemble_result, ColorStrategy};
use crate::color::space::{to_perceptual, to_perceptual_lch};
use crate::color::DerivedPalette;
use crate::error::Result;
use tint_common::{ColorContext, ColorResult, ColorRole, QualityTier, Rgb};
use uuid::Uuid;

pub const NAME: &str = "default-palette";

pub const DEFAULT_ACCENT: Rgb = Rgb::new(203, 166, 247);
pub const DEFAULT_PRIMARY: Rgb = Rgb::new(137, 180, 250);
pub const DEFAULT_SECONDARY: Rgb = Rgb::new(245, 194, 231);
pub const DEFAULT_SHADOW: Rgb = Rgb::new(17, 17, 27);
pub const DEFAULT_HIGHLIGHT: Rgb = Rgb::new(205, 214, 244);

/// Static palette, identical for every context and tier
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPaletteStrategy;

impl DefaultPaletteStrategy {
    pub fn new() -> Self {
        Self
    }

    fn role_color(role: ColorRole) -> Rgb {
        match role {
            ColorRole::Accent => DEFAULT_ACCENT,
            ColorRole::Primary => DEFAULT_PRIMARY,
            ColorRole::Secondary => DEFAULT_SECONDARY,
            ColorRole::Shadow => DEFAULT_SHADOW,
            ColorRole::Highlight => DEFAULT_HIGHLIGHT,
        }
    }

    /// The default palette attributed to `source_context_id`
    pub fn palette(&self, source_context_id: Uuid, tier: QualityTier) -> ColorResult {
        let palette = DerivedPalette {
            accent: to_perceptual_lch(DEFAULT_ACCENT),
            primary: to_perceptual_lch(DEFAULT_PRIMARY),
            secondary: to_perceptual_lch(DEFAULT_SECONDARY),
            shadow: to_perceptual_lch(DEFAULT_SHADOW),
            highlight: to_perceptual_lch(DEFAULT_HIGHLIGHT),
        };
        let mut result = assemble_result(
            NAME,
            source_context_id,
            tier,
            palette
                .entries()
                .into_iter()
                .map(|(key, lch)| (key.to_string(), lch.to_lab())),
        );

        // Role colors are published exactly, not via a perceptual round trip
        for role in ColorRole::all_variants() {
            let color = Self::role_color(*role);
            result.set_role(*role, color);
            result
                .metadata
                .coordinates
                .insert(role.as_str().to_string(), to_perceptual(color).to_array());
        }
        result
    }
}

impl ColorStrategy for DefaultPaletteStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u32 {
        0
    }

    fn can_process(&self, _context: &ColorContext) -> bool {
        true
    }

    fn estimated_cost(&self, _context: &ColorContext) -> f64 {
        0.0
    }

    fn process(&self, context: &ColorContext, tier: QualityTier) -> Result<ColorResult> {
        Ok(self.palette(context.context_id, tier))
    }
}
