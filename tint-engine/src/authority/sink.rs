//! Output sink contract
//!
//! The sink is handed to the `StateAuthority` and nothing else. A commit
//! must apply the whole batch or none of it.

use super::variables::{StateVariableBatch, VariableMap};
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The backing store cannot be reached right now
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// The store refused the batch
    #[error("batch rejected: {0}")]
    Rejected(String),
}

/// Key-value store of named style variables
pub trait StyleSink: Send + Sync {
    fn commit(&self, batch: &StateVariableBatch) -> Result<(), SinkError>;
}

impl<S: StyleSink + ?Sized> StyleSink for Arc<S> {
    fn commit(&self, batch: &StateVariableBatch) -> Result<(), SinkError> {
        (**self).commit(batch)
    }
}

/// In-process variable registry
///
/// Clones share one registry. A batch is written under a single write lock,
/// so readers see either all of it or none of it.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    store: Arc<RwLock<VariableMap>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every variable currently set
    pub fn snapshot(&self) -> VariableMap {
        self.store.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.store
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }
}

impl StyleSink for MemorySink {
    fn commit(&self, batch: &StateVariableBatch) -> Result<(), SinkError> {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        for (name, value) in batch.iter() {
            store.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }
}
