//! Runtime signals sampled by the tier controller

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Platform thermal pressure, mildest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermalState {
    #[default]
    Nominal,
    Fair,
    Serious,
    Critical,
}

/// One sample of device health
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RuntimeSignals {
    /// Recent average frame time; `None` when the host does not report it
    pub frame_ms: Option<f64>,
    pub thermal: ThermalState,
    /// Battery charge in [0, 1]; `None` on mains-only devices
    pub battery_level: Option<f64>,
    pub charging: bool,
}

impl RuntimeSignals {
    /// Healthy device at the given frame time
    pub fn with_frame_ms(frame_ms: f64) -> Self {
        Self {
            frame_ms: Some(frame_ms),
            ..Default::default()
        }
    }
}

/// Host-provided signal source, polled on the sampling interval
pub trait SignalSource: Send + Sync {
    fn sample(&self) -> RuntimeSignals;
}

/// Source returning whatever was last stored
///
/// Hosts that receive signals by push (frame callbacks, OS notifications)
/// store into this and hand it to the controller.
#[derive(Debug, Default)]
pub struct LatestSignals {
    latest: Mutex<RuntimeSignals>,
}

impl LatestSignals {
    pub fn new(initial: RuntimeSignals) -> Self {
        Self {
            latest: Mutex::new(initial),
        }
    }

    pub fn store(&self, signals: RuntimeSignals) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = signals;
    }
}

impl SignalSource for LatestSignals {
    fn sample(&self) -> RuntimeSignals {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }
}
