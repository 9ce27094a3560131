//! External collaborator seams
//!
//! Artwork color extraction and audio feature lookup live outside the
//! engine. Implementations are foreign code, so they report failures with
//! `anyhow` and the orchestrator turns every failure into a fallback.

use anyhow::Result;
use async_trait::async_trait;
use tint_common::{MusicFeatures, RawColorSample};

/// Artwork color extraction
#[async_trait]
pub trait ColorExtractionAdapter: Send + Sync {
    /// Identifier used in log lines
    fn source_id(&self) -> &'static str {
        "extractor"
    }

    /// Extract weighted colors for a track
    ///
    /// # Returns
    /// * `Ok(samples)` - possibly empty; empty means "no usable colors"
    /// * `Err(_)` - extraction failed (logged, resolved to the default palette)
    async fn extract(&self, track_id: &str) -> Result<Vec<RawColorSample>>;
}

/// Features as reported by a provider; any field may be missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialFeatures {
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub genre: Option<String>,
}

impl PartialFeatures {
    /// Fill missing fields with neutral midpoints
    pub fn resolve(self) -> MusicFeatures {
        MusicFeatures::from_partial(self.energy, self.valence, self.tempo, self.genre)
    }
}

/// Best-effort synchronous audio feature lookup
pub trait AudioFeatureProvider: Send + Sync {
    fn get_features(&self, track_id: &str) -> PartialFeatures;
}

/// Provider that knows nothing about any track
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralFeatures;

impl AudioFeatureProvider for NeutralFeatures {
    fn get_features(&self, _track_id: &str) -> PartialFeatures {
        PartialFeatures::default()
    }
}

/// Extractor returning the same samples for every track
#[derive(Debug, Clone, Default)]
pub struct StaticExtractor {
    samples: Vec<RawColorSample>,
}

impl StaticExtractor {
    pub fn new(samples: Vec<RawColorSample>) -> Self {
        Self { samples }
    }
}

#[async_trait]
impl ColorExtractionAdapter for StaticExtractor {
    fn source_id(&self) -> &'static str {
        "static"
    }

    async fn extract(&self, _track_id: &str) -> Result<Vec<RawColorSample>> {
        Ok(self.samples.clone())
    }
}
