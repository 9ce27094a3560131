//! Performance tier control
//!
//! Samples device health and scales algorithmic cost through a single
//! process-wide `QualityTier`.

pub mod signals;
pub mod tier;

pub use signals::{LatestSignals, RuntimeSignals, SignalSource, ThermalState};
pub use tier::{PerformanceTierController, TierConfig, TierHandle};
