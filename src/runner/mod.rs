//! Pipeline for a single MV grid.
//!
//! [`TargetRunner::run`] is the isolation boundary of a batch: whatever goes
//! wrong inside the pipeline (missing data, non-convergence, an unreachable
//! service, a panic, a hang) comes back as a [`RunOutcome::Failure`].

pub mod retry;

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{error, info, info_span, warn, Instrument, Span};

use crate::analysis::AnalysisEngine;
use crate::bridge::IdentifierBridge;
use crate::domain::{
    CostTable, GenerationAssumption, InterfaceSeries, RunOutcome, Scenario, TargetDefinition,
    TargetId,
};
use crate::error::TargetError;
use crate::provider::InterfaceProvider;
use crate::store::TargetStore;

pub use retry::RetryPolicy;

struct PipelineCosts {
    cost_table: CostTable,
    baseline_costs: CostTable,
}

pub struct TargetRunner {
    bridge: Arc<IdentifierBridge>,
    interface: Arc<dyn InterfaceProvider>,
    engine: Arc<dyn AnalysisEngine>,
    store: Arc<dyn TargetStore>,
    scenario: Scenario,
    retry: RetryPolicy,
    timeout: Option<Duration>,
    analysis_slots: Option<Arc<Semaphore>>,
}

impl TargetRunner {
    pub fn new(
        bridge: Arc<IdentifierBridge>,
        interface: Arc<dyn InterfaceProvider>,
        engine: Arc<dyn AnalysisEngine>,
        store: Arc<dyn TargetStore>,
        scenario: Scenario,
    ) -> Self {
        Self {
            bridge,
            interface,
            engine,
            store,
            scenario,
            retry: RetryPolicy::default(),
            timeout: None,
            analysis_slots: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Abort a grid's pipeline after `timeout`; `None` waits indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound the number of blocking analyses running at once.
    ///
    /// A timeout only drops the pipeline future, the blocking analysis keeps
    /// running to completion. Its slot is released when it actually ends, so
    /// timed-out grids still count against `slots`.
    pub fn with_analysis_slots(mut self, slots: usize) -> Self {
        self.analysis_slots = Some(Arc::new(Semaphore::new(slots.max(1))));
        self
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Run the full pipeline for one grid. Never fails and never panics.
    pub async fn run(&self, target_id: TargetId) -> RunOutcome {
        let span = info_span!("mv_grid", id = %target_id);
        let pipeline = AssertUnwindSafe(self.try_run(target_id).instrument(span.clone())).catch_unwind();

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, pipeline).await {
                Ok(result) => result,
                Err(_) => Ok(Err(TargetError::Timeout(limit))),
            },
            None => pipeline.await,
        };
        let result = result.unwrap_or_else(|panic| Err(TargetError::Panicked(panic_message(&*panic))));

        let _entered = span.enter();
        match result {
            Ok(costs) => {
                info!(
                    total_costs = costs.cost_table.total(),
                    baseline_costs = costs.baseline_costs.total(),
                    categories = costs.cost_table.records().len(),
                    "MV grid calculated"
                );
                RunOutcome::Success {
                    cost_table: costs.cost_table,
                    baseline_costs: costs.baseline_costs,
                }
            }
            Err(e) => {
                let error_summary = e.summarize(target_id);
                error!(class = %error_summary.class, cause = %error_summary.cause, "MV grid failed");
                RunOutcome::Failure { error_summary }
            }
        }
    }

    async fn try_run(&self, target_id: TargetId) -> Result<PipelineCosts, TargetError> {
        let bus_id = self
            .retry
            .run("identifier", move || async move {
                Ok(self.bridge.to_external_id(target_id).await?)
            })
            .await?;

        info!(
            %bus_id,
            scenario = %self.scenario,
            generator_scenario = self.scenario.generator_scenario().unwrap_or("none"),
            "calculating interface values"
        );
        let series = self
            .retry
            .run("interface", move || async move {
                Ok(self.interface.get_interface_series(bus_id, self.scenario).await?)
            })
            .await?;

        let definition = self
            .retry
            .run("definition", move || async move {
                self.store
                    .locate(target_id)
                    .await?
                    .ok_or(TargetError::MissingTargetData(target_id))
            })
            .await?;

        if !series.curtailment_abs.columns.is_empty() {
            warn!("curtailment can only be included after generator import");
        }

        let slot = match &self.analysis_slots {
            Some(slots) => Arc::clone(slots).acquire_owned().await.ok(),
            None => None,
        };
        let engine = Arc::clone(&self.engine);
        let span = Span::current();
        tokio::task::spawn_blocking(move || {
            let _slot = slot;
            let _entered = span.enter();
            analyze(engine.as_ref(), &definition, &series)
        })
        .await
        .map_err(join_error)?
    }
}

/// Worst-case reinforcement, then the interface feed-in case on the same network
fn analyze(
    engine: &dyn AnalysisEngine,
    definition: &TargetDefinition,
    series: &InterfaceSeries,
) -> Result<PipelineCosts, TargetError> {
    info!("initial MV grid reinforcement (starting grid)");
    let mut network = engine.build(definition, &GenerationAssumption::WorstCase)?;
    network.analyze()?;
    network.reinforce()?;
    let baseline_costs = CostTable::from_rows(definition.target_id, network.cost_table());

    info!(snapshots = series.snapshots().len(), "interface feed-in case");
    network.reset_results();
    network.apply_interface(series)?;
    network.analyze()?;
    network.reinforce()?;
    let cost_table = CostTable::from_rows(definition.target_id, network.cost_table());

    Ok(PipelineCosts {
        cost_table,
        baseline_costs,
    })
}

fn join_error(err: JoinError) -> TargetError {
    if err.is_panic() {
        TargetError::Panicked(panic_message(&*err.into_panic()))
    } else {
        TargetError::Panicked("analysis task was cancelled".to_string())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
