//! State authority
//!
//! The single writer of the style-variable store. Processors hand it
//! finished `ColorResult`s; it diffs the full target variable set against
//! what it last applied, commits only the delta and remembers the new
//! state. Results are applied strictly in the order received.
//!
//! The authority runs as an actor: it owns its sink and its last-applied
//! map outright, and its task is the only code path that reaches either.

pub mod sink;
pub mod variables;

pub use sink::{MemorySink, SinkError, StyleSink};
pub use variables::{variable_map, StateVariableBatch, VariableMap, DEFAULT_PREFIX};

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tint_common::events::{EventBus, TintEvent};
use tint_common::ColorResult;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of one `apply_color_result`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The batch was committed; names of the variables written
    Committed { keys: Vec<String> },
    /// Nothing changed; the sink was not touched
    Skipped,
    /// The sink failed twice; the previous palette stays in effect
    Dropped,
}

/// Authority counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityStats {
    pub commits: u64,
    pub skips: u64,
    pub retries: u64,
    pub dropped_batches: u64,
    pub keys_written: u64,
    pub last_commit_micros: u64,
}

#[derive(Debug, Default)]
struct Counters {
    commits: AtomicU64,
    skips: AtomicU64,
    retries: AtomicU64,
    dropped_batches: AtomicU64,
    keys_written: AtomicU64,
    last_commit_micros: AtomicU64,
}

/// Read-only access to authority counters while the actor runs
#[derive(Debug, Clone)]
pub struct AuthorityMetrics {
    counters: Arc<Counters>,
}

impl AuthorityMetrics {
    pub fn snapshot(&self) -> AuthorityStats {
        let c = &self.counters;
        AuthorityStats {
            commits: c.commits.load(Ordering::Relaxed),
            skips: c.skips.load(Ordering::Relaxed),
            retries: c.retries.load(Ordering::Relaxed),
            dropped_batches: c.dropped_batches.load(Ordering::Relaxed),
            keys_written: c.keys_written.load(Ordering::Relaxed),
            last_commit_micros: c.last_commit_micros.load(Ordering::Relaxed),
        }
    }
}

/// Latency targets; overruns are logged, never enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyBudgets {
    pub commit: Duration,
    pub skip: Duration,
}

impl Default for LatencyBudgets {
    fn default() -> Self {
        Self {
            commit: Duration::from_millis(15),
            skip: Duration::from_millis(2),
        }
    }
}

pub struct StateAuthority<S: StyleSink> {
    sink: S,
    bus: Arc<EventBus>,
    prefix: String,
    budgets: LatencyBudgets,
    last_applied: VariableMap,
    counters: Arc<Counters>,
}

impl<S: StyleSink> StateAuthority<S> {
    pub fn new(sink: S, bus: Arc<EventBus>, prefix: impl Into<String>) -> Self {
        Self {
            sink,
            bus,
            prefix: prefix.into(),
            budgets: LatencyBudgets::default(),
            last_applied: VariableMap::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_budgets(mut self, budgets: LatencyBudgets) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn metrics(&self) -> AuthorityMetrics {
        AuthorityMetrics {
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn stats(&self) -> AuthorityStats {
        self.metrics().snapshot()
    }

    /// Variables as last committed
    pub fn last_applied(&self) -> &VariableMap {
        &self.last_applied
    }

    /// Diff `result` against the last-applied state and commit the delta
    pub fn apply_color_result(&mut self, result: &ColorResult) -> ApplyOutcome {
        let started = Instant::now();
        let target = variable_map(&self.prefix, result);
        let batch = StateVariableBatch::diff(&self.last_applied, &target);

        if batch.is_empty() {
            self.counters.skips.fetch_add(1, Ordering::Relaxed);
            self.bus.emit_lossy(TintEvent::ColorsApplied {
                applied_keys: Vec::new(),
                skipped: true,
                timestamp: chrono::Utc::now(),
            });

            let elapsed = started.elapsed();
            if elapsed > self.budgets.skip {
                warn!("Skip path took {:?} (budget {:?})", elapsed, self.budgets.skip);
            }
            debug!("No variable changes from {}", result.metadata.strategy_name);
            return ApplyOutcome::Skipped;
        }

        if let Err(first) = self.sink.commit(&batch) {
            self.counters.retries.fetch_add(1, Ordering::Relaxed);
            warn!("Commit of {} variables failed ({}); retrying once", batch.len(), first);

            if let Err(second) = self.sink.commit(&batch) {
                self.counters.dropped_batches.fetch_add(1, Ordering::Relaxed);
                let err = Error::Commit(second.to_string());
                error!("{}; dropping batch of {} variables", err, batch.len());
                return ApplyOutcome::Dropped;
            }
        }

        let keys: Vec<String> = batch.names().map(str::to_string).collect();
        self.last_applied = target;

        let elapsed = started.elapsed();
        let c = &self.counters;
        c.commits.fetch_add(1, Ordering::Relaxed);
        c.keys_written.fetch_add(keys.len() as u64, Ordering::Relaxed);
        c.last_commit_micros
            .store(elapsed.as_micros() as u64, Ordering::Relaxed);

        self.bus.emit_lossy(TintEvent::ColorsApplied {
            applied_keys: keys.clone(),
            skipped: false,
            timestamp: chrono::Utc::now(),
        });

        if elapsed > self.budgets.commit {
            warn!("Commit took {:?} (budget {:?})", elapsed, self.budgets.commit);
        }
        debug!(
            "Committed {} variables from {} in {}µs",
            keys.len(),
            result.metadata.strategy_name,
            elapsed.as_micros()
        );
        ApplyOutcome::Committed { keys }
    }

    /// Apply every `colors:harmonized` event until cancelled or the bus closes
    pub async fn run(mut self, mut events: broadcast::Receiver<TintEvent>, cancel: CancellationToken) {
        info!("State authority started (prefix {})", self.prefix);
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };

            match event {
                Ok(TintEvent::ColorsHarmonized {
                    sequence,
                    color_result,
                    ..
                }) => {
                    debug!("Applying generation {}", sequence);
                    self.apply_color_result(&color_result);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!("State authority lagged; {} events missed", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("State authority stopped");
    }
}
