//! Engine wiring
//!
//! Builds the event bus, tier controller, orchestrator and state authority
//! and connects them. The sink goes to the authority and nowhere else.

use crate::authority::{AuthorityMetrics, AuthorityStats, StateAuthority, StyleSink};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::performance::{PerformanceTierController, SignalSource, TierHandle};
use crate::processing::{
    AudioFeatureProvider, ColorExtractionAdapter, CycleOutcome, PartialFeatures,
    ProcessingOrchestrator,
};
use crate::strategy::StrategySelector;
use std::sync::Arc;
use tint_common::events::{EventBus, TintEvent};
use tint_common::{PresetTable, RawColorSample};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Running color pipeline
pub struct ThemeEngine {
    bus: Arc<EventBus>,
    tiers: Arc<PerformanceTierController>,
    orchestrator: Arc<ProcessingOrchestrator>,
    authority: AuthorityMetrics,
    cancel: CancellationToken,
    runtime: Handle,
    tasks: Vec<JoinHandle<()>>,
}

impl ThemeEngine {
    /// Start the pipeline on the current tokio runtime
    ///
    /// The tier sampling loop only runs when `signals` is given; without it
    /// the tier stays at `tier.initial_tier` unless forced. Called outside a
    /// tokio runtime this returns `Error::Config` instead of starting.
    pub fn start<S>(
        config: &EngineConfig,
        presets: PresetTable,
        extractor: Arc<dyn ColorExtractionAdapter>,
        features: Arc<dyn AudioFeatureProvider>,
        sink: S,
        signals: Option<Arc<dyn SignalSource>>,
    ) -> Result<Self>
    where
        S: StyleSink + 'static,
    {
        config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| Error::Config(format!("theme engine needs a tokio runtime: {}", e)))?;

        let bus = Arc::new(EventBus::new(config.event_bus_capacity));
        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();

        let tiers = Arc::new(PerformanceTierController::new(
            config.tier.clone(),
            Arc::clone(&bus),
        ));
        if let Some(source) = signals {
            tasks.push(runtime.spawn(
                Arc::clone(&tiers).run(source, cancel.child_token()),
            ));
        }

        let orchestrator = Arc::new(
            ProcessingOrchestrator::new(
                Arc::clone(&bus),
                StrategySelector::standard(Arc::new(presets)),
                extractor,
                features,
                tiers.handle(),
                config.orchestrator(),
            )
            .with_cancellation(cancel.child_token()),
        );

        let authority = StateAuthority::new(sink, Arc::clone(&bus), config.variable_prefix.clone())
            .with_budgets(config.budgets());
        let metrics = authority.metrics();
        // Subscribe before returning so no harmonized event can be missed
        let events = bus.subscribe();
        tasks.push(runtime.spawn(authority.run(events, cancel.child_token())));

        info!(
            "Theme engine started: tier={}, extraction timeout={}ms, prefix={}",
            tiers.get_tier(),
            config.extraction_timeout_ms,
            config.variable_prefix
        );

        Ok(Self {
            bus,
            tiers,
            orchestrator,
            authority: metrics,
            cancel,
            runtime,
            tasks,
        })
    }

    /// Start a cycle for the new current track
    ///
    /// Supersedes any cycle still in flight.
    pub fn track_changed(&self, track_id: impl Into<String>) -> JoinHandle<CycleOutcome> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let track_id = track_id.into();
        self.runtime
            .spawn(async move { orchestrator.handle_track_change(&track_id).await })
    }

    /// Start a cycle for colors extracted by the host
    pub fn submit_extracted(
        &self,
        track_id: impl Into<String>,
        raw_colors: Vec<RawColorSample>,
        features: PartialFeatures,
    ) -> JoinHandle<CycleOutcome> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let track_id = track_id.into();
        self.runtime.spawn(async move {
            orchestrator
                .handle_extracted(&track_id, raw_colors, features)
                .await
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TintEvent> {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn tier(&self) -> TierHandle {
        self.tiers.handle()
    }

    pub fn tier_controller(&self) -> &Arc<PerformanceTierController> {
        &self.tiers
    }

    pub fn orchestrator(&self) -> &Arc<ProcessingOrchestrator> {
        &self.orchestrator
    }

    pub fn authority_stats(&self) -> AuthorityStats {
        self.authority.snapshot()
    }

    /// Stop background tasks and wait for them to finish
    ///
    /// Cycles still in flight resolve to `CycleOutcome::Cancelled`.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Engine task ended abnormally: {}", e);
            }
        }
        info!("Theme engine stopped");
    }
}
