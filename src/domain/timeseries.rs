use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time-indexed table of values, one column per generator type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub index: Vec<DateTime<Utc>>,
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl TimeSeries {
    pub fn new(index: Vec<DateTime<Utc>>) -> Self {
        Self {
            index,
            columns: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.insert(name.into(), values);
        self
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Sum over all columns per timestep
    pub fn row_totals(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| {
                self.columns
                    .values()
                    .map(|col| col.get(i).copied().unwrap_or(0.0))
                    .sum()
            })
            .collect()
    }

    /// Largest row total, `None` for an empty series
    pub fn peak_total(&self) -> Option<f64> {
        self.row_totals().into_iter().reduce(f64::max)
    }

    /// Validate column lengths against the index
    pub fn validate(&self) -> Result<(), String> {
        for (name, values) in &self.columns {
            if values.len() != self.index.len() {
                return Err(format!(
                    "column '{}' has {} values but the index has {} timesteps",
                    name,
                    values.len(),
                    self.index.len()
                ));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(format!("column '{}' contains non-finite values", name));
            }
        }
        if self.index.windows(2).any(|w| w[0] >= w[1]) {
            return Err("index is not strictly increasing".to_string());
        }
        Ok(())
    }
}

/// Boundary data coupling one grid to the transmission network state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSeries {
    /// Normalized feed-in potential of fluctuating generators
    pub potential: TimeSeries,
    /// Dispatch of conventional generators
    pub conv_dispatch: TimeSeries,
    /// Absolute curtailment
    pub curtailment_abs: TimeSeries,
}

impl InterfaceSeries {
    /// Snapshot calendar all three series are aligned to
    pub fn snapshots(&self) -> &[DateTime<Utc>] {
        &self.conv_dispatch.index
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.conv_dispatch.is_empty() {
            return Err("interface series contain no snapshots".to_string());
        }
        for (name, series) in [
            ("potential", &self.potential),
            ("conv_dispatch", &self.conv_dispatch),
            ("curtailment_abs", &self.curtailment_abs),
        ] {
            series.validate().map_err(|e| format!("{name}: {e}"))?;
            if series.index != self.conv_dispatch.index {
                return Err(format!("{name} is not aligned to the snapshot calendar"));
            }
        }
        Ok(())
    }
}

/// Generation assumption a network is built with. Interface feed-in is
/// applied to a built network through `GridNetwork::apply_interface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationAssumption {
    /// Conservative default: every generator at full feed-in, minimal load
    WorstCase,
}
