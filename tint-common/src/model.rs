//! Data model shared by the color pipeline
//!
//! Everything here is plain data: contexts are created once per track change
//! and superseded rather than mutated, results are produced once per
//! processing cycle.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 8-bit sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse "#rrggbb" or "rrggbb" (case insensitive)
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(Error::InvalidInput(format!(
                "expected 6 hex digits, got {:?}",
                hex
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|e| Error::InvalidInput(format!("invalid hex color {:?}: {}", hex, e)))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Lowercase "#rrggbb"
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Numeric channel triplet "r,g,b"
    pub fn to_triplet(self) -> String {
        format!("{},{},{}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// One extracted artwork color with its population weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawColorSample {
    pub color: Rgb,
    pub weight: f64,
}

impl RawColorSample {
    pub fn new(color: Rgb, weight: f64) -> Self {
        Self { color, weight }
    }
}

/// Neutral midpoint used when a provider has no energy value
pub const NEUTRAL_ENERGY: f64 = 0.5;
/// Neutral midpoint used when a provider has no valence value
pub const NEUTRAL_VALENCE: f64 = 0.5;
/// Neutral tempo (BPM) used when a provider has no tempo value
pub const NEUTRAL_TEMPO: f64 = 120.0;

/// Audio features of the current track
///
/// `energy` and `valence` are in [0.0, 1.0], `tempo` is in BPM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicFeatures {
    pub energy: f64,
    pub valence: f64,
    pub tempo: f64,
    pub genre: Option<String>,
}

impl MusicFeatures {
    /// All fields at their neutral midpoints, no genre
    pub fn neutral() -> Self {
        Self {
            energy: NEUTRAL_ENERGY,
            valence: NEUTRAL_VALENCE,
            tempo: NEUTRAL_TEMPO,
            genre: None,
        }
    }

    /// Build features from best-effort provider output
    ///
    /// Missing fields default to neutral midpoints. Out-of-range or
    /// non-finite values are clamped/replaced so downstream math never sees NaN.
    pub fn from_partial(
        energy: Option<f64>,
        valence: Option<f64>,
        tempo: Option<f64>,
        genre: Option<String>,
    ) -> Self {
        let unit = |v: Option<f64>, neutral: f64| match v {
            Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
            _ => neutral,
        };
        let tempo = match tempo {
            Some(t) if t.is_finite() && t > 0.0 => t.clamp(20.0, 300.0),
            _ => NEUTRAL_TEMPO,
        };
        let genre = genre
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty());

        Self {
            energy: unit(energy, NEUTRAL_ENERGY),
            valence: unit(valence, NEUTRAL_VALENCE),
            tempo,
            genre,
        }
    }

    /// True when nothing informative is known about the track
    pub fn is_neutral(&self) -> bool {
        self.genre.is_none()
            && (self.energy - NEUTRAL_ENERGY).abs() < f64::EPSILON
            && (self.valence - NEUTRAL_VALENCE).abs() < f64::EPSILON
            && (self.tempo - NEUTRAL_TEMPO).abs() < f64::EPSILON
    }
}

impl Default for MusicFeatures {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Discrete performance level used to scale algorithmic cost
///
/// Ordered: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    #[default]
    High,
}

impl QualityTier {
    /// Number of candidate base colors a multi-candidate strategy may score
    pub fn candidate_count(&self) -> usize {
        match self {
            QualityTier::Low => 1,
            QualityTier::Medium => 2,
            QualityTier::High => 4,
        }
    }

    /// Number of samples a blending strategy may mix
    pub fn blend_samples(&self) -> usize {
        match self {
            QualityTier::Low => 2,
            QualityTier::Medium => 3,
            QualityTier::High => 6,
        }
    }

    /// Relative cost multiplier used by strategy cost estimates
    pub fn cost_multiplier(&self) -> f64 {
        match self {
            QualityTier::Low => 0.5,
            QualityTier::Medium => 1.0,
            QualityTier::High => 1.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }

    pub fn all_variants() -> &'static [QualityTier] {
        &[QualityTier::Low, QualityTier::Medium, QualityTier::High]
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" | "med" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            other => Err(Error::InvalidInput(format!("unknown quality tier: {}", other))),
        }
    }
}

/// Precedence rule when more than one strategy succeeds for a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// First successful strategy in selection order wins
    #[default]
    HighestPriority,
    /// Mix all successful results in perceptual space, weighted by priority
    Blend,
}

/// User-controlled processing flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Let audio features modulate the palette
    pub music_reactive: bool,
    /// Allow multi-sample palette blending
    pub blend_enabled: bool,
    /// Strength of music modulation, [0.0, 1.0]
    pub intensity: f64,
    pub aggregation: AggregationPolicy,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            music_reactive: true,
            blend_enabled: true,
            intensity: 1.0,
            aggregation: AggregationPolicy::HighestPriority,
        }
    }
}

/// Input to one processing cycle
///
/// Created per track change and superseded, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorContext {
    pub context_id: Uuid,
    pub track_id: String,
    pub sequence: u64,
    pub raw_colors: Vec<RawColorSample>,
    pub music_features: MusicFeatures,
    pub device_tier: QualityTier,
    pub user_config: UserConfig,
}

impl ColorContext {
    pub fn new(
        track_id: impl Into<String>,
        sequence: u64,
        raw_colors: Vec<RawColorSample>,
        music_features: MusicFeatures,
        device_tier: QualityTier,
        user_config: UserConfig,
    ) -> Self {
        Self {
            context_id: Uuid::new_v4(),
            track_id: track_id.into(),
            sequence,
            raw_colors,
            music_features,
            device_tier,
            user_config,
        }
    }

    pub fn has_colors(&self) -> bool {
        !self.raw_colors.is_empty()
    }

    /// Highest-weight sample (first one wins on ties)
    pub fn dominant(&self) -> Option<&RawColorSample> {
        self.raw_colors.iter().fold(None, |best, sample| match best {
            Some(b) if b.weight >= sample.weight => Some(b),
            _ => Some(sample),
        })
    }

    /// Samples ordered by descending weight (stable for equal weights)
    pub fn samples_by_weight(&self) -> Vec<&RawColorSample> {
        let mut samples: Vec<&RawColorSample> = self.raw_colors.iter().collect();
        samples.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        samples
    }
}

/// The five palette roles every result assigns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorRole {
    Accent,
    Primary,
    Secondary,
    Shadow,
    Highlight,
}

impl ColorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorRole::Accent => "accent",
            ColorRole::Primary => "primary",
            ColorRole::Secondary => "secondary",
            ColorRole::Shadow => "shadow",
            ColorRole::Highlight => "highlight",
        }
    }

    pub fn all_variants() -> &'static [ColorRole] {
        &[
            ColorRole::Accent,
            ColorRole::Primary,
            ColorRole::Secondary,
            ColorRole::Shadow,
            ColorRole::Highlight,
        ]
    }
}

/// Complement of the accent hue
pub const KEY_ACCENT_COMPLEMENT: &str = "accent-complement";
/// Analogous neighbour of the accent hue
pub const KEY_ACCENT_ANALOGOUS: &str = "accent-analogous";
/// Perceptual midpoint between primary and secondary
pub const KEY_GRADIENT_MID: &str = "gradient-mid";

/// Every key present in `ColorResult::processed_colors`
pub const PROCESSED_KEYS: [&str; 8] = [
    "accent",
    "primary",
    "secondary",
    "shadow",
    "highlight",
    KEY_ACCENT_COMPLEMENT,
    KEY_ACCENT_ANALOGOUS,
    KEY_GRADIENT_MID,
];

/// Diagnostics attached to every result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorResultMetadata {
    pub strategy_name: String,
    pub processing_time_ms: f64,
    /// OKLab coordinates `[L, a, b]` per processed key
    pub coordinates: BTreeMap<String, [f64; 3]>,
    pub source_context_id: Uuid,
    /// Quality tier the result was computed under
    pub tier: QualityTier,
}

/// Output of one processing cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorResult {
    pub processed_colors: BTreeMap<String, Rgb>,
    pub accent: Rgb,
    pub primary: Rgb,
    pub secondary: Rgb,
    pub shadow: Rgb,
    pub highlight: Rgb,
    pub metadata: ColorResultMetadata,
}

impl ColorResult {
    pub fn role(&self, role: ColorRole) -> Rgb {
        match role {
            ColorRole::Accent => self.accent,
            ColorRole::Primary => self.primary,
            ColorRole::Secondary => self.secondary,
            ColorRole::Shadow => self.shadow,
            ColorRole::Highlight => self.highlight,
        }
    }

    /// Set a role color in both the role field and `processed_colors`
    pub fn set_role(&mut self, role: ColorRole, color: Rgb) {
        let field = match role {
            ColorRole::Accent => &mut self.accent,
            ColorRole::Primary => &mut self.primary,
            ColorRole::Secondary => &mut self.secondary,
            ColorRole::Shadow => &mut self.shadow,
            ColorRole::Highlight => &mut self.highlight,
        };
        *field = color;
        self.processed_colors.insert(role.as_str().to_string(), color);
    }

    /// Compare colors only, ignoring metadata
    pub fn same_colors(&self, other: &ColorResult) -> bool {
        self.processed_colors == other.processed_colors
    }
}
