//! Genre-keyed enhancement presets
//!
//! A static, versioned table of chroma/lightness/hue tuning per genre. The
//! built-in table can be extended or overridden by a TOML preset file:
//!
//! ```toml
//! version = 1
//!
//! [presets.electronic]
//! chroma_boost = 1.3
//! lightness_boost = 1.05
//! hue_shift_degrees = 50.0
//! shadow_reduction = 0.3
//! ```

use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Version of the built-in preset table
pub const PRESET_TABLE_VERSION: u32 = 1;

/// Key of the preset used when no genre matches
pub const DEFAULT_PRESET_KEY: &str = "default";

/// Genre-tuned enhancement parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnhancementPreset {
    /// Chroma multiplier applied to the base color
    pub chroma_boost: f64,
    /// Lightness multiplier applied to the base color
    pub lightness_boost: f64,
    /// Hue rotation of the accent relative to the primary
    pub hue_shift_degrees: f64,
    /// Shadow lightness factor, in (0.0, 1.0]; highlight uses `2.0 - shadow_reduction`
    pub shadow_reduction: f64,
}

impl EnhancementPreset {
    pub const fn new(
        chroma_boost: f64,
        lightness_boost: f64,
        hue_shift_degrees: f64,
        shadow_reduction: f64,
    ) -> Self {
        Self {
            chroma_boost,
            lightness_boost,
            hue_shift_degrees,
            shadow_reduction,
        }
    }

    /// Reject values that would produce NaN or inverted shadow/highlight
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.chroma_boost,
            self.lightness_boost,
            self.hue_shift_degrees,
            self.shadow_reduction,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(Error::InvalidInput("preset contains non-finite value".to_string()));
        }
        if self.chroma_boost <= 0.0 || self.lightness_boost <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "boosts must be positive (chroma={}, lightness={})",
                self.chroma_boost, self.lightness_boost
            )));
        }
        if self.shadow_reduction <= 0.0 || self.shadow_reduction > 1.0 {
            return Err(Error::InvalidInput(format!(
                "shadow_reduction must be in (0, 1], got {}",
                self.shadow_reduction
            )));
        }
        Ok(())
    }
}

impl Default for EnhancementPreset {
    fn default() -> Self {
        BUILTIN_DEFAULT
    }
}

const BUILTIN_DEFAULT: EnhancementPreset = EnhancementPreset::new(1.0, 1.0, 30.0, 0.35);

static BUILTIN_PRESETS: Lazy<PresetTable> = Lazy::new(|| {
    let entries = [
        (DEFAULT_PRESET_KEY, BUILTIN_DEFAULT),
        ("electronic", EnhancementPreset::new(1.25, 1.05, 45.0, 0.30)),
        ("rock", EnhancementPreset::new(1.10, 0.95, 20.0, 0.40)),
        ("metal", EnhancementPreset::new(0.90, 0.85, 15.0, 0.25)),
        ("pop", EnhancementPreset::new(1.20, 1.10, 35.0, 0.45)),
        ("hip-hop", EnhancementPreset::new(1.15, 0.95, 25.0, 0.35)),
        ("jazz", EnhancementPreset::new(0.90, 1.00, 20.0, 0.45)),
        ("classical", EnhancementPreset::new(0.80, 1.05, 15.0, 0.50)),
        ("ambient", EnhancementPreset::new(0.85, 1.10, 40.0, 0.55)),
        ("folk", EnhancementPreset::new(0.85, 1.00, 20.0, 0.50)),
        ("r&b", EnhancementPreset::new(1.05, 1.00, 30.0, 0.40)),
    ];
    PresetTable {
        version: PRESET_TABLE_VERSION,
        presets: entries
            .into_iter()
            .map(|(key, preset)| (key.to_string(), preset))
            .collect(),
    }
});

/// Map common spellings onto table keys
fn canonical_genre(genre: &str) -> &str {
    match genre {
        "edm" | "house" | "techno" | "trance" | "dubstep" | "dance" | "electronica" => "electronic",
        "hiphop" | "hip hop" | "rap" | "trap" => "hip-hop",
        "heavy metal" | "hard rock" | "death metal" | "black metal" => "metal",
        "rnb" | "r and b" | "soul" | "r'n'b" => "r&b",
        "symphonic" | "orchestral" | "baroque" | "opera" => "classical",
        "chillout" | "chill" | "lo-fi" | "lofi" | "new age" => "ambient",
        "acoustic" | "singer-songwriter" | "country" => "folk",
        other => other,
    }
}

/// Versioned genre → preset table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetTable {
    pub version: u32,
    pub presets: BTreeMap<String, EnhancementPreset>,
}

impl PresetTable {
    /// The compiled-in table
    pub fn builtin() -> Self {
        BUILTIN_PRESETS.clone()
    }

    /// Preset for a genre
    ///
    /// Resolution order: exact (after alias mapping), longest table key
    /// contained in the genre string, then the default preset.
    pub fn lookup(&self, genre: Option<&str>) -> &EnhancementPreset {
        if let Some(genre) = genre {
            let lowered = genre.trim().to_lowercase();
            let key = canonical_genre(&lowered);

            if let Some(preset) = self.presets.get(key) {
                return preset;
            }

            let partial = self
                .presets
                .iter()
                .filter(|(k, _)| k.as_str() != DEFAULT_PRESET_KEY && key.contains(k.as_str()))
                .max_by_key(|(k, _)| k.len());
            if let Some((_, preset)) = partial {
                return preset;
            }
        }
        self.default_preset()
    }

    pub fn default_preset(&self) -> &EnhancementPreset {
        self.presets
            .get(DEFAULT_PRESET_KEY)
            .unwrap_or(&BUILTIN_DEFAULT)
    }

    /// Parse a preset file and layer it over the built-in table
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let overrides: PresetTable = toml::from_str(content)?;
        Self::builtin().merged_with(overrides)
    }

    /// Load a preset file from disk and layer it over the built-in table
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Toml(err) => Error::Config(format!("{}: {}", path.display(), err)),
            other => other,
        })
    }

    fn merged_with(mut self, overrides: PresetTable) -> Result<Self> {
        if overrides.version < self.version {
            return Err(Error::Config(format!(
                "preset table version {} is older than built-in version {}",
                overrides.version, self.version
            )));
        }
        for (genre, preset) in overrides.presets {
            preset
                .validate()
                .map_err(|e| Error::Config(format!("preset '{}': {}", genre, e)))?;
            self.presets.insert(genre.trim().to_lowercase(), preset);
        }
        self.version = overrides.version;
        Ok(self)
    }
}

impl Default for PresetTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_presets_are_valid() {
        let table = PresetTable::builtin();
        assert_eq!(table.version, PRESET_TABLE_VERSION);
        for (genre, preset) in &table.presets {
            assert!(preset.validate().is_ok(), "invalid builtin preset {}", genre);
        }
        assert!(table.presets.contains_key(DEFAULT_PRESET_KEY));
    }

    #[test]
    fn test_lookup_exact_and_case_insensitive() {
        let table = PresetTable::builtin();
        assert_eq!(table.lookup(Some("Jazz")), &table.presets["jazz"]);
        assert_eq!(table.lookup(Some("  ROCK ")), &table.presets["rock"]);
    }

    #[test]
    fn test_lookup_aliases() {
        let table = PresetTable::builtin();
        assert_eq!(table.lookup(Some("EDM")), &table.presets["electronic"]);
        assert_eq!(table.lookup(Some("rap")), &table.presets["hip-hop"]);
        assert_eq!(table.lookup(Some("Heavy Metal")), &table.presets["metal"]);
    }

    #[test]
    fn test_lookup_substring_prefers_longest_key() {
        let table = PresetTable::builtin();
        assert_eq!(table.lookup(Some("progressive rock")), &table.presets["rock"]);
        assert_eq!(table.lookup(Some("alternative hip-hop")), &table.presets["hip-hop"]);
    }

    #[test]
    fn test_lookup_unknown_falls_back_to_default() {
        let table = PresetTable::builtin();
        assert_eq!(table.lookup(Some("polka")), table.default_preset());
        assert_eq!(table.lookup(None), table.default_preset());
    }

    #[test]
    fn test_toml_override_merges_over_builtin() {
        let table = PresetTable::from_toml_str(
            r#"
            version = 1

            [presets.Polka]
            chroma_boost = 1.4
            lightness_boost = 1.0
            hue_shift_degrees = 60.0
            shadow_reduction = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(table.lookup(Some("polka")).chroma_boost, 1.4);
        // builtin entries survive
        assert!(table.presets.contains_key("jazz"));
    }

    #[test]
    fn test_toml_override_rejects_invalid_preset() {
        let result = PresetTable::from_toml_str(
            r#"
            version = 1
            [presets.bad]
            chroma_boost = 1.0
            lightness_boost = 1.0
            hue_shift_degrees = 0.0
            shadow_reduction = 1.5
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_toml_override_rejects_older_version() {
        let result = PresetTable::from_toml_str("version = 0\n[presets]\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
