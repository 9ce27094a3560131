//! Adapter doubles

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tint_common::{QualityTier, RawColorSample};
use tint_engine::performance::PerformanceTierController;
use tint_engine::processing::{AudioFeatureProvider, ColorExtractionAdapter, PartialFeatures};
use tokio::sync::Notify;

/// Blocks extraction of gated tracks until released
#[derive(Default)]
pub struct GatedExtractor {
    samples: Vec<RawColorSample>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl GatedExtractor {
    pub fn new(samples: Vec<RawColorSample>) -> Self {
        Self {
            samples,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Hold extraction of `track_id` until `release` is called
    pub fn gate(&self, track_id: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(track_id.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, track_id: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(track_id) {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl ColorExtractionAdapter for GatedExtractor {
    fn source_id(&self) -> &'static str {
        "gated"
    }

    async fn extract(&self, track_id: &str) -> Result<Vec<RawColorSample>> {
        let gate = self.gates.lock().unwrap().get(track_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.samples.clone())
    }
}

/// Answers only after `delay`
pub struct SlowExtractor {
    pub delay: Duration,
    pub samples: Vec<RawColorSample>,
}

#[async_trait]
impl ColorExtractionAdapter for SlowExtractor {
    async fn extract(&self, _track_id: &str) -> Result<Vec<RawColorSample>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.samples.clone())
    }
}

/// Forces the tier while extraction is in progress
pub struct TierShiftExtractor {
    pub controller: Arc<PerformanceTierController>,
    pub shift_to: QualityTier,
    pub samples: Vec<RawColorSample>,
}

#[async_trait]
impl ColorExtractionAdapter for TierShiftExtractor {
    async fn extract(&self, _track_id: &str) -> Result<Vec<RawColorSample>> {
        self.controller.force_tier(self.shift_to);
        Ok(self.samples.clone())
    }
}

/// Same features for every track
pub struct FixedFeatures(pub PartialFeatures);

impl AudioFeatureProvider for FixedFeatures {
    fn get_features(&self, _track_id: &str) -> PartialFeatures {
        self.0.clone()
    }
}
