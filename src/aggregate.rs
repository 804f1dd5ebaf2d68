//! Merging of per-grid cost tables into batch-level results.

use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};

use crate::domain::{CostRecord, RunOutcome, TargetDescriptor, TargetId};

#[derive(Debug, Default, Clone, Copy)]
pub struct ResultAggregator;

impl ResultAggregator {
    /// Cost records of all successful grids, ordered by grid and category.
    /// Failures contribute nothing.
    pub fn aggregate(outcomes: &BTreeMap<TargetId, RunOutcome>) -> Vec<CostRecord> {
        outcomes
            .values()
            .filter_map(RunOutcome::cost_table)
            .flat_map(|table| table.records().iter().cloned())
            .sorted_by(|a, b| {
                a.target_id
                    .cmp(&b.target_id)
                    .then_with(|| a.category.cmp(&b.category))
            })
            .collect()
    }

    /// Per-category costs extrapolated by descriptor weight.
    ///
    /// A cluster representative stands for `weight` grids, so its costs are
    /// counted `weight` times. Records of grids without a descriptor count once.
    pub fn weighted_totals(
        descriptors: &[TargetDescriptor],
        records: &[CostRecord],
    ) -> Vec<(String, f64)> {
        let weights: HashMap<TargetId, u32> =
            descriptors.iter().map(|d| (d.id, d.weight)).collect();

        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for record in records {
            let weight = weights.get(&record.target_id).copied().unwrap_or(1);
            *totals.entry(record.category.as_str()).or_insert(0.0) += record.amount * f64::from(weight);
        }
        totals
            .into_iter()
            .map(|(category, amount)| (category.to_string(), amount))
            .collect()
    }

    pub fn totals_by_target(records: &[CostRecord]) -> BTreeMap<TargetId, f64> {
        let mut totals = BTreeMap::new();
        for record in records {
            *totals.entry(record.target_id).or_insert(0.0) += record.amount;
        }
        totals
    }
}
