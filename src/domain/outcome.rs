use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{TargetDescriptor, TargetId, TargetState};

/// Raw cost row as reported by the reinforcement engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRow {
    pub category: String,
    /// Cost in kEUR
    pub amount: f64,
}

impl CostRow {
    pub fn new(category: impl Into<String>, amount: f64) -> Self {
        Self {
            category: category.into(),
            amount,
        }
    }
}

/// Normalized cost row tagged with the grid it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub target_id: TargetId,
    pub category: String,
    /// Cost in kEUR
    pub amount: f64,
}

/// Reinforcement costs of one grid, one record per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTable {
    target_id: TargetId,
    records: Vec<CostRecord>,
}

impl CostTable {
    /// Group raw rows by category and sum them, ordered by category
    pub fn from_rows(target_id: TargetId, rows: impl IntoIterator<Item = CostRow>) -> Self {
        let mut grouped: BTreeMap<String, f64> = BTreeMap::new();
        for row in rows {
            *grouped.entry(row.category).or_insert(0.0) += row.amount;
        }
        let records = grouped
            .into_iter()
            .map(|(category, amount)| CostRecord {
                target_id,
                category,
                amount,
            })
            .collect();
        Self { target_id, records }
    }

    pub fn target_id(&self) -> TargetId {
        self.target_id
    }

    pub fn records(&self) -> &[CostRecord] {
        &self.records
    }

    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }

    pub fn amount(&self, category: &str) -> Option<f64> {
        self.records
            .iter()
            .find(|r| r.category == category)
            .map(|r| r.amount)
    }
}

/// Error taxonomy used to classify per-grid failures
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    DataAvailability,
    Analysis,
    Infrastructure,
    Timeout,
    Panic,
}

/// Failure record kept for a grid whose pipeline did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    pub target_id: TargetId,
    pub class: ErrorClass,
    pub cause: String,
}

impl std::fmt::Display for FailureSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MV grid {} failed ({}): {}", self.target_id, self.class, self.cause)
    }
}

/// Result of running the pipeline for one grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Success {
        cost_table: CostTable,
        /// Worst-case reinforcement costs computed before the interface data is applied
        baseline_costs: CostTable,
    },
    Failure { error_summary: FailureSummary },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    pub fn state(&self) -> TargetState {
        match self {
            RunOutcome::Success { .. } => TargetState::Succeeded,
            RunOutcome::Failure { .. } => TargetState::Failed,
        }
    }

    pub fn cost_table(&self) -> Option<&CostTable> {
        match self {
            RunOutcome::Success { cost_table, .. } => Some(cost_table),
            RunOutcome::Failure { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureSummary> {
        match self {
            RunOutcome::Success { .. } => None,
            RunOutcome::Failure { error_summary } => Some(error_summary),
        }
    }
}

/// Everything a batch produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub descriptors: Vec<TargetDescriptor>,
    pub outcomes: BTreeMap<TargetId, RunOutcome>,
    pub aggregated_costs: Vec<CostRecord>,
}

impl BatchResult {
    pub fn successes(&self) -> impl Iterator<Item = (&TargetId, &CostTable)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.cost_table().map(|table| (id, table)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &FailureSummary> {
        self.outcomes.values().filter_map(RunOutcome::failure)
    }

    pub fn summary(&self) -> BatchSummary {
        let failures_by_class = self.failures().map(|f| f.class).counts().into_iter().collect();
        let succeeded = self.outcomes.values().filter(|o| o.is_success()).count();
        BatchSummary {
            total: self.outcomes.len(),
            succeeded,
            failed: self.outcomes.len() - succeeded,
            failures_by_class,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures_by_class: BTreeMap<ErrorClass, usize>,
}
