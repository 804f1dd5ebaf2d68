//! Simplified MV grid model standing in for the external analysis engine.
//!
//! A grid is reduced to one feeder capacity and one transformer capacity,
//! both derived from the grid id. Analysis compares the peak load of the
//! current generation assumption against them; reinforcement adds parallel
//! lines and transformers until nothing is overloaded.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashSet;

use crate::analysis::{AnalysisEngine, AnalysisError, GridNetwork};
use crate::domain::{CostRow, GenerationAssumption, InterfaceSeries, TargetDefinition, TargetId};

/// kEUR per parallel line
const LINE_COST: f64 = 80.0;
/// kEUR per additional HV/MV transformer
const TRANSFORMER_COST: f64 = 1_200.0;
/// Worst case feed-in relative to the installed capacity
const WORST_CASE_FACTOR: f64 = 1.0;
/// Installed generation per unit of interface feed-in, in MW
const INSTALLED_MW: f64 = 40.0;

#[derive(Debug, Clone, Default)]
pub struct SimulatedAnalysisEngine {
    diverging: HashSet<TargetId>,
    invalid: HashSet<TargetId>,
}

impl SimulatedAnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grids whose power flow never converges
    pub fn with_diverging(mut self, ids: impl IntoIterator<Item = TargetId>) -> Self {
        self.diverging.extend(ids);
        self
    }

    /// Grids whose stored definition cannot be loaded
    pub fn with_invalid(mut self, ids: impl IntoIterator<Item = TargetId>) -> Self {
        self.invalid.extend(ids);
        self
    }
}

impl AnalysisEngine for SimulatedAnalysisEngine {
    fn build(
        &self,
        definition: &TargetDefinition,
        assumption: &GenerationAssumption,
    ) -> Result<Box<dyn GridNetwork>, AnalysisError> {
        let target_id = definition.target_id;
        if self.invalid.contains(&target_id) {
            return Err(AnalysisError::InvalidNetwork(format!(
                "cannot load {}",
                definition.path.display()
            )));
        }

        let mut rng = StdRng::seed_from_u64(u64::from(target_id.0));
        let mut network = SimulatedNetwork {
            diverges: self.diverging.contains(&target_id),
            line_capacity_mw: rng.gen_range(8.0..20.0),
            transformer_capacity_mw: rng.gen_range(20.0..40.0),
            peak_mw: 0.0,
            lines_added: 0,
            transformers_added: 0,
            overload: None,
        };
        network.load(assumption);
        Ok(Box::new(network))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Overload {
    line: f64,
    transformer: f64,
}

#[derive(Debug)]
pub struct SimulatedNetwork {
    diverges: bool,
    line_capacity_mw: f64,
    transformer_capacity_mw: f64,
    peak_mw: f64,
    lines_added: u32,
    transformers_added: u32,
    overload: Option<Overload>,
}

impl SimulatedNetwork {
    fn load(&mut self, assumption: &GenerationAssumption) {
        self.peak_mw = match assumption {
            GenerationAssumption::WorstCase => WORST_CASE_FACTOR * INSTALLED_MW,
        };
    }

    fn interface_peak(series: &InterfaceSeries) -> f64 {
        series.potential.peak_total().unwrap_or(0.0).max(0.0) * INSTALLED_MW / 2.0
    }

    fn line_capacity(&self) -> f64 {
        self.line_capacity_mw * f64::from(self.lines_added + 1)
    }

    fn transformer_capacity(&self) -> f64 {
        self.transformer_capacity_mw * f64::from(self.transformers_added + 1)
    }
}

impl GridNetwork for SimulatedNetwork {
    fn analyze(&mut self) -> Result<(), AnalysisError> {
        if self.diverges {
            return Err(AnalysisError::NonConvergence(
                "Newton-Raphson did not converge within 100 iterations".to_string(),
            ));
        }
        self.overload = Some(Overload {
            line: self.peak_mw / self.line_capacity(),
            transformer: self.peak_mw / self.transformer_capacity(),
        });
        Ok(())
    }

    fn apply_interface(&mut self, series: &InterfaceSeries) -> Result<(), AnalysisError> {
        series.validate().map_err(AnalysisError::InvalidNetwork)?;
        self.peak_mw = Self::interface_peak(series);
        Ok(())
    }

    fn reset_results(&mut self) {
        self.lines_added = 0;
        self.transformers_added = 0;
        self.overload = None;
    }

    fn reinforce(&mut self) -> Result<(), AnalysisError> {
        let overload = self.overload.ok_or_else(|| {
            AnalysisError::Reinforcement("no analysis results to reinforce".to_string())
        })?;
        if overload.line > 1.0 {
            self.lines_added = (self.peak_mw / self.line_capacity_mw).ceil() as u32 - 1;
        }
        if overload.transformer > 1.0 {
            self.transformers_added = (self.peak_mw / self.transformer_capacity_mw).ceil() as u32 - 1;
        }
        Ok(())
    }

    fn cost_table(&self) -> Vec<CostRow> {
        let mut rows = Vec::new();
        if self.lines_added > 0 {
            rows.push(CostRow::new("line", f64::from(self.lines_added) * LINE_COST));
        }
        if self.transformers_added > 0 {
            rows.push(CostRow::new(
                "transformer",
                f64::from(self.transformers_added) * TRANSFORMER_COST,
            ));
        }
        rows
    }
}
