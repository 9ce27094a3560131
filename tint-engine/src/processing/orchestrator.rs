//! Processing orchestrator
//!
//! Routes a track change through extraction, strategy selection and
//! aggregation, and publishes exactly one `colors:harmonized` event per
//! surviving generation. It holds no color math and never touches the
//! output sink.
//!
//! **Generations:** every track change takes the next sequence number.
//! A cycle checks the counter at each checkpoint (after debounce, after
//! extraction, before every strategy, at publish) and abandons itself as
//! soon as a newer generation exists. Publishing happens under a gate that
//! remembers the last published sequence, so an older generation can never
//! publish after a newer one.
//!
//! **Phases:** `Idle → Extracting → Processing → Publishing → Idle`,
//! reported for the latest generation only.

use super::adapters::{AudioFeatureProvider, ColorExtractionAdapter, PartialFeatures};
use super::aggregate::{aggregate, RankedResult};
use crate::error::Error;
use crate::performance::TierHandle;
use crate::strategy::{ColorStrategy, DefaultPaletteStrategy, StrategySelector};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tint_common::events::{EventBus, TintEvent};
use tint_common::{AggregationPolicy, ColorContext, ColorResult, RawColorSample, UserConfig};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Orchestrator state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorPhase {
    Idle,
    Extracting,
    Processing,
    Publishing,
}

impl OrchestratorPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => OrchestratorPhase::Extracting,
            2 => OrchestratorPhase::Processing,
            3 => OrchestratorPhase::Publishing,
            _ => OrchestratorPhase::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            OrchestratorPhase::Idle => 0,
            OrchestratorPhase::Extracting => 1,
            OrchestratorPhase::Processing => 2,
            OrchestratorPhase::Publishing => 3,
        }
    }
}

/// How a processing cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The result was published as `colors:harmonized`
    Published(ColorResult),
    /// A newer generation superseded this one; nothing was published
    Stale { sequence: u64 },
    /// The orchestrator shut down mid-cycle
    Cancelled { sequence: u64 },
}

impl CycleOutcome {
    pub fn published(&self) -> Option<&ColorResult> {
        match self {
            CycleOutcome::Published(result) => Some(result),
            _ => None,
        }
    }
}

/// Orchestrator counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorStats {
    pub cycles_started: u64,
    pub published: u64,
    pub stale_discarded: u64,
    pub extraction_failures: u64,
    pub extraction_timeouts: u64,
    pub strategy_failures: u64,
    pub fallbacks: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cycles_started: AtomicU64,
    published: AtomicU64,
    stale_discarded: AtomicU64,
    extraction_failures: AtomicU64,
    extraction_timeouts: AtomicU64,
    strategy_failures: AtomicU64,
    fallbacks: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> OrchestratorStats {
        OrchestratorStats {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            extraction_timeouts: self.extraction_timeouts.load(Ordering::Relaxed),
            strategy_failures: self.strategy_failures.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub extraction_timeout: Duration,
    /// Settle window before a track change starts extracting
    pub debounce: Duration,
    pub user: UserConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            extraction_timeout: Duration::from_secs(2),
            debounce: Duration::ZERO,
            user: UserConfig::default(),
        }
    }
}

pub struct ProcessingOrchestrator {
    bus: Arc<EventBus>,
    selector: StrategySelector,
    fallback: DefaultPaletteStrategy,
    extractor: Arc<dyn ColorExtractionAdapter>,
    features: Arc<dyn AudioFeatureProvider>,
    tier: TierHandle,
    config: OrchestratorConfig,
    generation: AtomicU64,
    /// Last published sequence
    publish_gate: Mutex<u64>,
    phase: AtomicU8,
    counters: Counters,
    cancel: CancellationToken,
}

impl ProcessingOrchestrator {
    pub fn new(
        bus: Arc<EventBus>,
        selector: StrategySelector,
        extractor: Arc<dyn ColorExtractionAdapter>,
        features: Arc<dyn AudioFeatureProvider>,
        tier: TierHandle,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            bus,
            selector,
            fallback: DefaultPaletteStrategy::new(),
            extractor,
            features,
            tier,
            config,
            generation: AtomicU64::new(0),
            publish_gate: Mutex::new(0),
            phase: AtomicU8::new(OrchestratorPhase::Idle.as_u8()),
            counters: Counters::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel in-flight and future cycles when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn phase(&self) -> OrchestratorPhase {
        OrchestratorPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.counters.snapshot()
    }

    /// Sequence number of the newest generation (0 before any)
    pub fn current_sequence(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn next_generation(&self) -> u64 {
        self.counters.cycles_started.fetch_add(1, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_stale(&self, sequence: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != sequence
    }

    fn set_phase(&self, sequence: u64, phase: OrchestratorPhase) {
        if !self.is_stale(sequence) {
            self.phase.store(phase.as_u8(), Ordering::Release);
        }
    }

    fn discard(&self, sequence: u64) -> CycleOutcome {
        Counters::bump(&self.counters.stale_discarded);
        debug!("Discarding superseded generation {}", sequence);
        CycleOutcome::Stale { sequence }
    }

    fn cancelled(&self, sequence: u64) -> CycleOutcome {
        debug!("Generation {} cancelled by shutdown", sequence);
        self.set_phase(sequence, OrchestratorPhase::Idle);
        CycleOutcome::Cancelled { sequence }
    }

    /// Run a full cycle for a newly current track
    ///
    /// Never fails: extraction problems resolve to the default palette and
    /// superseded work resolves to `CycleOutcome::Stale`.
    pub async fn handle_track_change(&self, track_id: &str) -> CycleOutcome {
        let sequence = self.next_generation();
        let device_tier = self.tier.current();
        debug!("Track changed: {} (generation {})", track_id, sequence);

        self.bus.emit_lossy(TintEvent::TrackChanged {
            track_id: track_id.to_string(),
            sequence,
            timestamp: chrono::Utc::now(),
        });

        if !self.config.debounce.is_zero() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(sequence),
                _ = tokio::time::sleep(self.config.debounce) => {}
            }
            if self.is_stale(sequence) {
                return self.discard(sequence);
            }
        }

        self.set_phase(sequence, OrchestratorPhase::Extracting);
        let extraction = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return self.cancelled(sequence),
            outcome = tokio::time::timeout(
                self.config.extraction_timeout,
                self.extractor.extract(track_id),
            ) => outcome,
        };

        let raw_colors = match extraction {
            Ok(Ok(samples)) => samples,
            Ok(Err(e)) => {
                Counters::bump(&self.counters.extraction_failures);
                let err = Error::Extraction(format!("{:#}", e));
                warn!("{} for {} ({}); using default palette", err, track_id, self.extractor.source_id());
                Vec::new()
            }
            Err(_) => {
                Counters::bump(&self.counters.extraction_timeouts);
                let err = Error::ExtractionTimeout(self.config.extraction_timeout);
                warn!("{} for {}; using default palette", err, track_id);
                Vec::new()
            }
        };

        if self.is_stale(sequence) {
            return self.discard(sequence);
        }

        let features = self.features.get_features(track_id).resolve();
        self.bus.emit_lossy(TintEvent::ColorsExtracted {
            track_id: track_id.to_string(),
            sequence,
            raw_colors: raw_colors.clone(),
            music_features: features.clone(),
            timestamp: chrono::Utc::now(),
        });

        let context = ColorContext::new(
            track_id,
            sequence,
            raw_colors,
            features,
            device_tier,
            self.config.user.clone(),
        );
        self.process_cycle(context).await
    }

    /// Run a cycle for colors extracted outside the engine
    ///
    /// Starts a new generation, superseding any cycle in flight.
    pub async fn handle_extracted(
        &self,
        track_id: &str,
        raw_colors: Vec<RawColorSample>,
        features: PartialFeatures,
    ) -> CycleOutcome {
        let sequence = self.next_generation();
        let features = features.resolve();

        self.bus.emit_lossy(TintEvent::ColorsExtracted {
            track_id: track_id.to_string(),
            sequence,
            raw_colors: raw_colors.clone(),
            music_features: features.clone(),
            timestamp: chrono::Utc::now(),
        });

        let context = ColorContext::new(
            track_id,
            sequence,
            raw_colors,
            features,
            self.tier.current(),
            self.config.user.clone(),
        );
        self.process_cycle(context).await
    }

    async fn process_cycle(&self, context: ColorContext) -> CycleOutcome {
        let sequence = context.sequence;
        let started = Instant::now();
        self.set_phase(sequence, OrchestratorPhase::Processing);

        let mut result = if !context.has_colors() {
            debug!("No colors for generation {}; using default palette", sequence);
            Counters::bump(&self.counters.fallbacks);
            self.fallback.palette(context.context_id, self.tier.current())
        } else {
            let context_id = context.context_id;
            match self.run_strategies(context).await {
                Ok(Some(result)) => result,
                Ok(None) => {
                    Counters::bump(&self.counters.fallbacks);
                    self.fallback.palette(context_id, self.tier.current())
                }
                Err(outcome) => return outcome,
            }
        };
        result.metadata.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.publish(sequence, result).await
    }

    /// Evaluate selected strategies in order and aggregate their results
    ///
    /// `Ok(None)` means nothing qualified or everything failed.
    #[allow(clippy::result_large_err)]
    async fn run_strategies(
        &self,
        context: ColorContext,
    ) -> std::result::Result<Option<ColorResult>, CycleOutcome> {
        let sequence = context.sequence;
        let policy = context.user_config.aggregation;
        let selected = self.selector.select(&context);
        let attempted = selected.len();

        if selected.is_empty() {
            debug!("No strategy qualifies for generation {}", sequence);
        }

        let context = Arc::new(context);
        let mut ranked = Vec::with_capacity(selected.len());
        for strategy in selected {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(sequence));
            }
            if self.is_stale(sequence) {
                return Err(self.discard(sequence));
            }

            // Read per invocation so a tier change applies to the next strategy
            let tier = self.tier.current();
            let name = strategy.name();
            let priority = strategy.priority();
            let ctx = Arc::clone(&context);

            match tokio::task::spawn_blocking(move || strategy.process(&ctx, tier)).await {
                Ok(Ok(result)) => {
                    debug!("Strategy {} succeeded at {} tier", name, tier);
                    ranked.push(RankedResult { priority, result });
                    if policy == AggregationPolicy::HighestPriority {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    Counters::bump(&self.counters.strategy_failures);
                    warn!("{}; excluded from aggregation", e);
                }
                Err(join_err) => {
                    Counters::bump(&self.counters.strategy_failures);
                    let err = Error::strategy(name, join_err.to_string());
                    warn!("{}; excluded from aggregation", err);
                }
            }
        }

        if ranked.is_empty() && attempted > 0 {
            warn!("All {} strategies failed for generation {}; using default palette", attempted, sequence);
        }
        Ok(aggregate(policy, ranked))
    }

    async fn publish(&self, sequence: u64, result: ColorResult) -> CycleOutcome {
        self.set_phase(sequence, OrchestratorPhase::Publishing);

        let mut last_published = self.publish_gate.lock().await;
        if self.is_stale(sequence) || sequence <= *last_published {
            drop(last_published);
            return self.discard(sequence);
        }
        *last_published = sequence;

        self.bus.emit_lossy(TintEvent::ColorsHarmonized {
            sequence,
            color_result: result.clone(),
            processing_time_ms: result.metadata.processing_time_ms,
            timestamp: chrono::Utc::now(),
        });
        drop(last_published);

        Counters::bump(&self.counters.published);
        info!(
            "Published generation {} via {} in {:.2}ms",
            sequence, result.metadata.strategy_name, result.metadata.processing_time_ms
        );
        self.set_phase(sequence, OrchestratorPhase::Idle);
        CycleOutcome::Published(result)
    }
}
