//! Strategy selection
//!
//! Filters the registry down to strategies that can process a context and
//! orders them by declared priority (highest first), breaking ties with the
//! lowest estimated cost. An empty selection is a valid answer: the
//! orchestrator then falls back to the default palette.

use super::{ColorStrategy, StrategyKind};
use std::sync::Arc;
use tint_common::{ColorContext, PresetTable};

#[derive(Debug, Clone)]
pub struct StrategySelector {
    registry: Vec<StrategyKind>,
}

impl StrategySelector {
    pub fn new(registry: Vec<StrategyKind>) -> Self {
        Self { registry }
    }

    /// Selector over the standard registry
    pub fn standard(presets: Arc<PresetTable>) -> Self {
        Self::new(StrategyKind::standard_registry(presets))
    }

    pub fn registry(&self) -> &[StrategyKind] {
        &self.registry
    }

    /// Applicable strategies in evaluation order
    pub fn select(&self, context: &ColorContext) -> Vec<StrategyKind> {
        let mut selected: Vec<(StrategyKind, f64)> = self
            .registry
            .iter()
            .filter(|s| s.can_process(context))
            .map(|s| (s.clone(), s.estimated_cost(context)))
            .collect();

        selected.sort_by(|(a, a_cost), (b, b_cost)| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a_cost.total_cmp(b_cost))
        });

        selected.into_iter().map(|(s, _)| s).collect()
    }
}
