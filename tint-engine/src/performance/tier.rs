//! Process-wide quality tier
//!
//! The controller is the only writer of the current tier. Readers hold a
//! `TierHandle` (a watch receiver) and read the tier at the moment they
//! need it, so a change lands between two strategy invocations rather
//! than aborting a cycle.
//!
//! **Hysteresis:** a new tier is adopted only after `hysteresis_samples`
//! consecutive samples agree on it. A sample agreeing with the current
//! tier resets the streak.

use super::signals::{RuntimeSignals, SignalSource, ThermalState};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tint_common::events::{EventBus, TintEvent};
use tint_common::QualityTier;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Tier controller settings (`[tier]` in the config file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub initial_tier: QualityTier,
    pub sample_interval_ms: u64,
    /// Consecutive agreeing samples required before switching
    pub hysteresis_samples: u32,
    /// Frame time at or above which the device drops to medium
    pub medium_frame_ms: f64,
    /// Frame time at or above which the device drops to low
    pub low_frame_ms: f64,
    /// Battery level at or below which a discharging device is capped at medium
    pub low_battery_level: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            initial_tier: QualityTier::High,
            sample_interval_ms: 1000,
            hysteresis_samples: 3,
            medium_frame_ms: 20.0,
            low_frame_ms: 33.0,
            low_battery_level: 0.2,
        }
    }
}

impl TierConfig {
    /// Tier the signals call for, before hysteresis
    pub fn classify(&self, signals: &RuntimeSignals) -> QualityTier {
        let by_frame = match signals.frame_ms {
            Some(ms) if ms >= self.low_frame_ms => QualityTier::Low,
            Some(ms) if ms >= self.medium_frame_ms => QualityTier::Medium,
            _ => QualityTier::High,
        };
        let by_thermal = match signals.thermal {
            ThermalState::Critical => QualityTier::Low,
            ThermalState::Serious => QualityTier::Medium,
            ThermalState::Nominal | ThermalState::Fair => QualityTier::High,
        };
        let by_battery = match signals.battery_level {
            Some(level) if !signals.charging && level <= self.low_battery_level => {
                QualityTier::Medium
            }
            _ => QualityTier::High,
        };
        by_frame.min(by_thermal).min(by_battery)
    }
}

/// Read-only view of the current tier
#[derive(Debug, Clone)]
pub struct TierHandle {
    rx: watch::Receiver<QualityTier>,
}

impl TierHandle {
    pub fn current(&self) -> QualityTier {
        *self.rx.borrow()
    }

    /// Wait for the next tier change; `None` once the controller is gone
    pub async fn changed(&mut self) -> Option<QualityTier> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

#[derive(Debug, Default)]
struct Streak {
    candidate: Option<QualityTier>,
    count: u32,
}

/// Owner of the process-wide quality tier
pub struct PerformanceTierController {
    tx: watch::Sender<QualityTier>,
    bus: Arc<EventBus>,
    config: TierConfig,
    streak: Mutex<Streak>,
}

impl PerformanceTierController {
    pub fn new(config: TierConfig, bus: Arc<EventBus>) -> Self {
        let (tx, _) = watch::channel(config.initial_tier);
        info!(
            "Tier controller initialized: tier={}, hysteresis={} samples, interval={}ms",
            config.initial_tier, config.hysteresis_samples, config.sample_interval_ms
        );
        Self {
            tx,
            bus,
            config,
            streak: Mutex::new(Streak::default()),
        }
    }

    pub fn get_tier(&self) -> QualityTier {
        *self.tx.borrow()
    }

    pub fn handle(&self) -> TierHandle {
        TierHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    /// Switch immediately, bypassing hysteresis
    ///
    /// Returns true when the tier actually changed.
    pub fn force_tier(&self, tier: QualityTier) -> bool {
        *self.streak.lock().unwrap_or_else(|e| e.into_inner()) = Streak::default();
        self.switch_to(tier)
    }

    /// Feed one signal sample; returns the new tier if this sample caused a switch
    pub fn record_sample(&self, signals: &RuntimeSignals) -> Option<QualityTier> {
        let target = self.config.classify(signals);
        let current = self.get_tier();

        {
            let mut streak = self.streak.lock().unwrap_or_else(|e| e.into_inner());
            if target == current {
                *streak = Streak::default();
                return None;
            }

            if streak.candidate == Some(target) {
                streak.count += 1;
            } else {
                streak.candidate = Some(target);
                streak.count = 1;
            }

            debug!(
                "Tier sample: current={}, target={}, streak={}/{}",
                current, target, streak.count, self.config.hysteresis_samples
            );

            if streak.count < self.config.hysteresis_samples.max(1) {
                return None;
            }
            *streak = Streak::default();
        }

        self.switch_to(target).then_some(target)
    }

    fn switch_to(&self, tier: QualityTier) -> bool {
        let previous = self.tx.send_replace(tier);
        if previous == tier {
            return false;
        }

        info!("Quality tier changed: {} -> {}", previous, tier);
        self.bus.emit_lossy(TintEvent::TierChanged {
            tier,
            previous,
            timestamp: chrono::Utc::now(),
        });
        true
    }

    /// Sample `source` every `sample_interval_ms` until cancelled
    pub async fn run(self: Arc<Self>, source: Arc<dyn SignalSource>, cancel: CancellationToken) {
        let period = Duration::from_millis(self.config.sample_interval_ms.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!("Tier sampling loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.record_sample(&source.sample());
                }
            }
        }
        info!("Tier sampling loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::signals::LatestSignals;

    fn controller(hysteresis_samples: u32) -> (PerformanceTierController, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new(16));
        let config = TierConfig {
            hysteresis_samples,
            ..Default::default()
        };
        (PerformanceTierController::new(config, Arc::clone(&bus)), bus)
    }

    #[test]
    fn test_classify() {
        let config = TierConfig::default();
        assert_eq!(config.classify(&RuntimeSignals::with_frame_ms(16.0)), QualityTier::High);
        assert_eq!(config.classify(&RuntimeSignals::with_frame_ms(25.0)), QualityTier::Medium);
        assert_eq!(config.classify(&RuntimeSignals::with_frame_ms(50.0)), QualityTier::Low);
        assert_eq!(config.classify(&RuntimeSignals::default()), QualityTier::High);

        let hot = RuntimeSignals {
            thermal: ThermalState::Critical,
            ..RuntimeSignals::with_frame_ms(10.0)
        };
        assert_eq!(config.classify(&hot), QualityTier::Low);

        let draining = RuntimeSignals {
            battery_level: Some(0.1),
            ..Default::default()
        };
        assert_eq!(config.classify(&draining), QualityTier::Medium);
        let charging = RuntimeSignals {
            charging: true,
            ..draining
        };
        assert_eq!(config.classify(&charging), QualityTier::High);
    }

    #[test]
    fn test_hysteresis_requires_consecutive_samples() {
        let (controller, _bus) = controller(3);
        let slow = RuntimeSignals::with_frame_ms(50.0);

        assert_eq!(controller.record_sample(&slow), None);
        assert_eq!(controller.record_sample(&slow), None);
        assert_eq!(controller.get_tier(), QualityTier::High);
        assert_eq!(controller.record_sample(&slow), Some(QualityTier::Low));
        assert_eq!(controller.get_tier(), QualityTier::Low);
    }

    #[test]
    fn test_agreeing_sample_resets_streak() {
        let (controller, _bus) = controller(3);
        let slow = RuntimeSignals::with_frame_ms(50.0);
        let fine = RuntimeSignals::with_frame_ms(10.0);

        controller.record_sample(&slow);
        controller.record_sample(&slow);
        controller.record_sample(&fine);
        controller.record_sample(&slow);
        controller.record_sample(&slow);
        assert_eq!(controller.get_tier(), QualityTier::High);
    }

    #[test]
    fn test_changing_target_restarts_streak() {
        let (controller, _bus) = controller(2);
        controller.record_sample(&RuntimeSignals::with_frame_ms(50.0));
        controller.record_sample(&RuntimeSignals::with_frame_ms(25.0));
        assert_eq!(controller.get_tier(), QualityTier::High);
        controller.record_sample(&RuntimeSignals::with_frame_ms(25.0));
        assert_eq!(controller.get_tier(), QualityTier::Medium);
    }

    #[tokio::test]
    async fn test_force_tier_notifies() {
        let (controller, bus) = controller(3);
        let mut events = bus.subscribe();
        let mut handle = controller.handle();

        assert!(controller.force_tier(QualityTier::Low));
        assert!(!controller.force_tier(QualityTier::Low));

        assert_eq!(handle.changed().await, Some(QualityTier::Low));
        assert_eq!(handle.current(), QualityTier::Low);
        match events.recv().await.unwrap() {
            TintEvent::TierChanged { tier, previous, .. } => {
                assert_eq!(tier, QualityTier::Low);
                assert_eq!(previous, QualityTier::High);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_loop_switches_and_stops() {
        let bus = Arc::new(EventBus::new(16));
        let config = TierConfig {
            sample_interval_ms: 100,
            hysteresis_samples: 2,
            ..Default::default()
        };
        let controller = Arc::new(PerformanceTierController::new(config, bus));
        let source = Arc::new(LatestSignals::new(RuntimeSignals::with_frame_ms(40.0)));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Arc::clone(&controller).run(source, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(controller.get_tier(), QualityTier::Low);

        cancel.cancel();
        task.await.unwrap();
    }
}
