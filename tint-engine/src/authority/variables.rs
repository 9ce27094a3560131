//! Style variable naming and change batches
//!
//! Each processed color key publishes two variables:
//!
//! ```text
//! {prefix}-{key}       "#rrggbb"
//! {prefix}-{key}-rgb   "r,g,b"
//! ```
//!
//! The five role keys are taken from the result's role fields, so a result
//! whose map disagrees with them still publishes its declared roles.

use std::collections::BTreeMap;
use tint_common::{ColorResult, ColorRole};

pub const DEFAULT_PREFIX: &str = "--tint";

/// Full variable set, name → value
pub type VariableMap = BTreeMap<String, String>;

/// Every variable a result publishes
pub fn variable_map(prefix: &str, result: &ColorResult) -> VariableMap {
    let roles = ColorRole::all_variants()
        .iter()
        .map(|role| (role.as_str(), result.role(*role)));
    let extras = result
        .processed_colors
        .iter()
        .filter(|(key, _)| !ColorRole::all_variants().iter().any(|r| r.as_str() == key.as_str()))
        .map(|(key, color)| (key.as_str(), *color));

    let mut map = VariableMap::new();
    for (key, color) in roles.chain(extras) {
        map.insert(format!("{}-{}", prefix, key), color.to_hex());
        map.insert(format!("{}-{}-rgb", prefix, key), color.to_triplet());
    }
    map
}

/// Changed variables only; built and discarded per commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateVariableBatch {
    entries: BTreeMap<String, String>,
}

impl StateVariableBatch {
    /// Entries of `target` that are new or differ from `applied`
    pub fn diff(applied: &VariableMap, target: &VariableMap) -> Self {
        let entries = target
            .iter()
            .filter(|(name, value)| applied.get(*name) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for StateVariableBatch {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
