//! Aggregation of successful strategy results
//!
//! The orchestrator hands over results in selection order (highest
//! priority first). `HighestPriority` keeps the first; `Blend` mixes every
//! processed key in OKLab weighted by declared priority.

use crate::color::space::{self, Oklab};
use crate::strategy::assemble_result;
use tint_common::model::PROCESSED_KEYS;
use tint_common::{AggregationPolicy, ColorResult};

/// A successful strategy output with the priority it was selected at
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub priority: u32,
    pub result: ColorResult,
}

/// Combine results under `policy`; `None` only when `results` is empty
pub fn aggregate(policy: AggregationPolicy, mut results: Vec<RankedResult>) -> Option<ColorResult> {
    match (policy, results.len()) {
        (_, 0) => None,
        (AggregationPolicy::HighestPriority, _) | (AggregationPolicy::Blend, 1) => {
            Some(results.swap_remove(0).result)
        }
        (AggregationPolicy::Blend, _) => Some(blend(&results)),
    }
}

fn blend(results: &[RankedResult]) -> ColorResult {
    let first = &results[0].result;
    let name = format!(
        "blend({})",
        results
            .iter()
            .map(|r| r.result.metadata.strategy_name.as_str())
            .collect::<Vec<_>>()
            .join("+")
    );
    // Every strategy priority of zero would leave nothing to weight by
    let weight = |r: &RankedResult| f64::from(r.priority.max(1));

    let entries = PROCESSED_KEYS.iter().filter_map(|key| {
        let samples: Vec<(Oklab, f64)> = results
            .iter()
            .filter_map(|r| {
                r.result
                    .metadata
                    .coordinates
                    .get(*key)
                    .map(|[l, a, b]| (Oklab::new(*l, *a, *b), weight(r)))
            })
            .collect();
        space::weighted_mean(&samples).map(|lab| (key.to_string(), lab))
    });

    assemble_result(
        name,
        first.metadata.source_context_id,
        first.metadata.tier,
        entries,
    )
}
