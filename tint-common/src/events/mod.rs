//! Event types for the tint event system
//!
//! Provides the closed set of pipeline events and the EventBus connecting
//! the orchestrator, the state authority and the tier controller.

use crate::model::{ColorResult, MusicFeatures, QualityTier, RawColorSample};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Tint event types
///
/// Every payload is an explicitly typed record; subscribers match
/// exhaustively instead of probing dynamically shaped data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TintEvent {
    /// A new track became current (`track:changed`)
    ///
    /// Triggers:
    /// - Orchestrator: start a new generation, supersede in-flight work
    TrackChanged {
        track_id: String,
        /// Generation number assigned to this track change
        sequence: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Raw artwork colors and audio features are available (`colors:extracted`)
    ColorsExtracted {
        track_id: String,
        sequence: u64,
        raw_colors: Vec<RawColorSample>,
        music_features: MusicFeatures,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A processing cycle produced the canonical palette (`colors:harmonized`)
    ///
    /// Emitted at most once per generation, only for the latest generation.
    ///
    /// Triggers:
    /// - StateAuthority: diff and commit style variables
    ColorsHarmonized {
        sequence: u64,
        color_result: ColorResult,
        processing_time_ms: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The state authority finished handling a result (`colors:applied`)
    ColorsApplied {
        /// Variable names written by this commit (empty when skipped)
        applied_keys: Vec<String>,
        /// True when the diff was empty and nothing was written
        skipped: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The process-wide quality tier changed (`tier:changed`)
    TierChanged {
        tier: QualityTier,
        previous: QualityTier,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TintEvent {
    /// Wire name of the event (`"colors:harmonized"` etc.)
    pub fn event_name(&self) -> &'static str {
        match self {
            TintEvent::TrackChanged { .. } => "track:changed",
            TintEvent::ColorsExtracted { .. } => "colors:extracted",
            TintEvent::ColorsHarmonized { .. } => "colors:harmonized",
            TintEvent::ColorsApplied { .. } => "colors:applied",
            TintEvent::TierChanged { .. } => "tier:changed",
        }
    }

    /// JSON payload for hosts forwarding events across a process boundary
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Generation number carried by the event, if any
    pub fn sequence(&self) -> Option<u64> {
        match self {
            TintEvent::TrackChanged { sequence, .. }
            | TintEvent::ColorsExtracted { sequence, .. }
            | TintEvent::ColorsHarmonized { sequence, .. } => Some(*sequence),
            TintEvent::ColorsApplied { .. } | TintEvent::TierChanged { .. } => None,
        }
    }
}

/// Event bus for in-process pub/sub
///
/// Thin wrapper over a tokio broadcast channel. Every subscriber sees every
/// event emitted after it subscribed; slow subscribers lag rather than
/// blocking publishers.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<TintEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging subscribers lose old events
    ///
    /// # Examples
    ///
    /// ```
    /// use tint_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TintEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TintEvent,
    ) -> Result<usize, broadcast::error::SendError<TintEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// # Examples
    ///
    /// ```
    /// use tint_common::events::{EventBus, TintEvent};
    /// use tint_common::QualityTier;
    ///
    /// let event_bus = EventBus::new(16);
    ///
    /// // Tier notifications - OK if no one is listening
    /// event_bus.emit_lossy(TintEvent::TierChanged {
    ///     tier: QualityTier::Low,
    ///     previous: QualityTier::High,
    ///     timestamp: chrono::Utc::now(),
    /// });
    /// ```
    pub fn emit_lossy(&self, event: TintEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
