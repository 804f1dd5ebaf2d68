//! Seam to the external grid analysis engine.
//!
//! The engine builds a network from a stored grid definition, runs the power
//! flow analysis and the reinforcement, and reports grid expansion costs. All
//! calls are blocking units of work.

use thiserror::Error;

use crate::domain::{CostRow, GenerationAssumption, InterfaceSeries, TargetDefinition};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("power flow did not converge: {0}")]
    NonConvergence(String),

    #[error("reinforcement failed: {0}")]
    Reinforcement(String),

    #[error("invalid network definition: {0}")]
    InvalidNetwork(String),
}

/// A built network, owned by exactly one pipeline run
#[cfg_attr(test, mockall::automock)]
pub trait GridNetwork: Send {
    /// Run the power flow analysis for all snapshots
    fn analyze(&mut self) -> Result<(), AnalysisError>;

    /// Replace the generation time series by the interface series
    fn apply_interface(&mut self, series: &InterfaceSeries) -> Result<(), AnalysisError>;

    /// Discard analysis and reinforcement results, keep the topology
    fn reset_results(&mut self);

    /// Reinforce the grid until no constraint is violated
    fn reinforce(&mut self) -> Result<(), AnalysisError>;

    /// Grid expansion costs of the last reinforcement
    fn cost_table(&self) -> Vec<CostRow>;
}

#[cfg_attr(test, mockall::automock)]
pub trait AnalysisEngine: Send + Sync {
    fn build(
        &self,
        definition: &TargetDefinition,
        assumption: &GenerationAssumption,
    ) -> Result<Box<dyn GridNetwork>, AnalysisError>;
}
