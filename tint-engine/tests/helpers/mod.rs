//! Shared doubles for tint-engine integration tests
//!
//! - Extractors that block, stall or shift the tier mid-extraction
//! - A fixed feature provider
//! - `Harness`: bus + tier controller + orchestrator wired like the engine
//! - Test log capture

#![allow(dead_code)]

pub mod doubles;

pub use doubles::{FixedFeatures, GatedExtractor, SlowExtractor, TierShiftExtractor};

use std::sync::Arc;
use tint_common::events::{EventBus, TintEvent};
use tint_common::{PresetTable, RawColorSample, Rgb, UserConfig};
use tint_engine::performance::{PerformanceTierController, TierConfig};
use tint_engine::processing::{
    AudioFeatureProvider, ColorExtractionAdapter, NeutralFeatures, OrchestratorConfig,
    ProcessingOrchestrator,
};
use tint_engine::strategy::StrategySelector;
use tokio::sync::broadcast;

/// Route engine logs to the test harness (`RUST_LOG` to adjust)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tint_engine=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Artwork with one clearly dominant lavender
pub fn lavender_samples() -> Vec<RawColorSample> {
    vec![
        RawColorSample::new(Rgb::new(203, 166, 247), 0.6),
        RawColorSample::new(Rgb::new(30, 30, 46), 0.25),
        RawColorSample::new(Rgb::new(243, 139, 168), 0.15),
    ]
}

/// Six distinct samples with descending weights
pub fn six_samples() -> Vec<RawColorSample> {
    [
        (220, 60, 60),
        (60, 160, 220),
        (240, 200, 80),
        (90, 200, 120),
        (150, 90, 210),
        (250, 150, 60),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (r, g, b))| RawColorSample::new(Rgb::new(r, g, b), 0.3 - 0.04 * i as f64))
    .collect()
}

pub struct Harness {
    pub bus: Arc<EventBus>,
    pub tiers: Arc<PerformanceTierController>,
    pub orchestrator: Arc<ProcessingOrchestrator>,
}

impl Harness {
    pub fn new(extractor: Arc<dyn ColorExtractionAdapter>) -> Self {
        Self::with(extractor, Arc::new(NeutralFeatures), OrchestratorConfig::default())
    }

    pub fn with(
        extractor: Arc<dyn ColorExtractionAdapter>,
        features: Arc<dyn AudioFeatureProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        let (bus, tiers) = Self::bus_and_tiers();
        Self::assemble(bus, tiers, extractor, features, config)
    }

    /// Bus and tier controller, for doubles that need the controller up front
    pub fn bus_and_tiers() -> (Arc<EventBus>, Arc<PerformanceTierController>) {
        let bus = Arc::new(EventBus::new(64));
        let tiers = Arc::new(PerformanceTierController::new(
            TierConfig::default(),
            Arc::clone(&bus),
        ));
        (bus, tiers)
    }

    pub fn assemble(
        bus: Arc<EventBus>,
        tiers: Arc<PerformanceTierController>,
        extractor: Arc<dyn ColorExtractionAdapter>,
        features: Arc<dyn AudioFeatureProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        let orchestrator = Arc::new(ProcessingOrchestrator::new(
            Arc::clone(&bus),
            StrategySelector::standard(Arc::new(PresetTable::builtin())),
            extractor,
            features,
            tiers.handle(),
            config,
        ));
        Self {
            bus,
            tiers,
            orchestrator,
        }
    }

    pub fn with_user(extractor: Arc<dyn ColorExtractionAdapter>, user: UserConfig) -> Self {
        Self::with(
            extractor,
            Arc::new(NeutralFeatures),
            OrchestratorConfig {
                user,
                ..Default::default()
            },
        )
    }
}

/// Everything currently buffered on a receiver
pub fn drain(rx: &mut broadcast::Receiver<TintEvent>) -> Vec<TintEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

/// Sequences of the `colors:harmonized` events among `events`
pub fn harmonized_sequences(events: &[TintEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            TintEvent::ColorsHarmonized { sequence, .. } => Some(*sequence),
            _ => None,
        })
        .collect()
}
