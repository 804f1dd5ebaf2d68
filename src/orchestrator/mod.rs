//! Batch execution across all selected MV grids.
//!
//! A batch moves through `Selecting -> Dispatching -> Aggregating -> Done`.
//! Only a [`ConfigurationError`] during selection stops it; every selected grid
//! gets exactly one outcome, however its pipeline ends.

pub mod progress;

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::aggregate::ResultAggregator;
use crate::config::BatchConfig;
use crate::domain::{
    BatchPhase, BatchResult, ErrorClass, FailureSummary, RunOutcome, SelectionPolicy,
    TargetDescriptor, TargetId, TargetState,
};
use crate::error::ConfigurationError;
use crate::runner::TargetRunner;
use crate::selection::TargetSelector;
use crate::store::TargetStore;

pub use progress::{LogProgress, Progress, ProgressSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    #[default]
    Sequential,
    Pool { workers: usize },
}

impl Concurrency {
    /// `Sequential` for a single worker, a pool otherwise
    pub fn from_workers(workers: usize) -> Self {
        if workers <= 1 {
            Concurrency::Sequential
        } else {
            Concurrency::Pool { workers }
        }
    }
}

pub struct BatchOrchestrator {
    selector: TargetSelector,
    runner: Arc<TargetRunner>,
    concurrency: Concurrency,
    progress: Arc<dyn ProgressSink>,
}

impl BatchOrchestrator {
    pub fn new(selector: TargetSelector, runner: Arc<TargetRunner>) -> Self {
        Self {
            selector,
            runner,
            concurrency: Concurrency::Sequential,
            progress: Arc::new(LogProgress),
        }
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Select grids per `policy`, run each of them and aggregate the costs.
    pub async fn execute(
        &self,
        policy: &SelectionPolicy,
        available: &[TargetId],
    ) -> Result<BatchResult, ConfigurationError> {
        let batch_id = Uuid::new_v4();
        let span = info_span!("batch", %batch_id, scenario = %self.runner.scenario());
        self.execute_batch(batch_id, policy, available)
            .instrument(span)
            .await
    }

    /// Run the batch described by `config` over the grids found in `store`
    pub async fn execute_with_config(
        &self,
        config: &BatchConfig,
        store: &dyn TargetStore,
    ) -> Result<BatchResult, ConfigurationError> {
        let policy = config.selection_policy()?;
        let available = store.discover().await?;
        info!(
            grid_dir = %config.grid_dir.display(),
            available = available.len(),
            "discovered MV grids"
        );
        self.execute(&policy, &available).await
    }

    async fn execute_batch(
        &self,
        batch_id: Uuid,
        policy: &SelectionPolicy,
        available: &[TargetId],
    ) -> Result<BatchResult, ConfigurationError> {
        self.progress.phase(BatchPhase::Selecting);
        let descriptors = self.selector.select(policy, available).await?;
        info!(selected = descriptors.len(), concurrency = ?self.concurrency, "starting batch");

        self.progress.phase(BatchPhase::Dispatching);
        for descriptor in &descriptors {
            self.progress.transition(descriptor.id, TargetState::Pending);
        }
        let outcomes = match self.concurrency {
            Concurrency::Sequential => self.run_sequential(&descriptors).await,
            Concurrency::Pool { workers } => self.run_pool(&descriptors, workers).await,
        };

        self.progress.phase(BatchPhase::Aggregating);
        let aggregated_costs = ResultAggregator::aggregate(&outcomes);

        let result = BatchResult {
            batch_id,
            descriptors,
            outcomes,
            aggregated_costs,
        };
        let summary = result.summary();
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch finished"
        );
        self.progress.phase(BatchPhase::Done);
        Ok(result)
    }

    async fn run_sequential(
        &self,
        descriptors: &[TargetDescriptor],
    ) -> BTreeMap<TargetId, RunOutcome> {
        let mut collector = Collector::new(descriptors.len(), self.progress.as_ref());
        for descriptor in descriptors {
            self.progress.transition(descriptor.id, TargetState::Running);
            let outcome = self.runner.run(descriptor.id).await;
            collector.record(descriptor.id, outcome);
        }
        collector.finish(descriptors)
    }

    /// Bounded pool: at most `workers` pipelines in flight, results collected here
    async fn run_pool(
        &self,
        descriptors: &[TargetDescriptor],
        workers: usize,
    ) -> BTreeMap<TargetId, RunOutcome> {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut tasks = JoinSet::new();

        for descriptor in descriptors {
            let target_id = descriptor.id;
            let runner = Arc::clone(&self.runner);
            let semaphore = Arc::clone(&semaphore);
            let progress = Arc::clone(&self.progress);
            tasks.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    progress.transition(target_id, TargetState::Running);
                    (target_id, runner.run(target_id).await)
                }
                .in_current_span(),
            );
        }

        let mut collector = Collector::new(descriptors.len(), self.progress.as_ref());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((target_id, outcome)) => collector.record(target_id, outcome),
                Err(e) => error!(error = %e, "worker task lost"),
            }
        }
        collector.finish(descriptors)
    }
}

/// Single writer of outcomes and progress
struct Collector<'a> {
    outcomes: BTreeMap<TargetId, RunOutcome>,
    total: usize,
    progress: &'a dyn ProgressSink,
}

impl<'a> Collector<'a> {
    fn new(total: usize, progress: &'a dyn ProgressSink) -> Self {
        Self {
            outcomes: BTreeMap::new(),
            total,
            progress,
        }
    }

    fn record(&mut self, target_id: TargetId, outcome: RunOutcome) {
        let state = outcome.state();
        debug_assert!(state.is_terminal());
        self.outcomes.insert(target_id, outcome);
        self.progress.progress(&Progress {
            completed: self.outcomes.len(),
            total: self.total,
            target_id,
            state,
        });
    }

    /// Grids whose worker vanished are recorded as failed
    fn finish(mut self, descriptors: &[TargetDescriptor]) -> BTreeMap<TargetId, RunOutcome> {
        for descriptor in descriptors {
            if !self.outcomes.contains_key(&descriptor.id) {
                let error_summary = FailureSummary {
                    target_id: descriptor.id,
                    class: ErrorClass::Panic,
                    cause: "worker task terminated before reporting an outcome".to_string(),
                };
                self.record(descriptor.id, RunOutcome::Failure { error_summary });
            }
        }
        self.outcomes
    }
}
