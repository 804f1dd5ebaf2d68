use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Identifier of an MV grid (the HV/MV substation id it hangs off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub u32);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TargetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TargetId)
    }
}

impl From<u32> for TargetId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Identifier of the connection point in the external transmission network (bus id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(pub u64);

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ExternalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Rule deciding which grids a batch processes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Cluster all available grids into `count` groups and run one representative per group
    Cluster { count: usize },
    /// Run exactly the given grids, in the given order
    Manual { ids: Vec<TargetId> },
    /// Run every grid found at the storage location
    All,
}

/// One selected grid and the number of original grids it represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub id: TargetId,
    pub weight: u32,
}

impl TargetDescriptor {
    pub fn new(id: TargetId, weight: u32) -> Self {
        debug_assert!(weight >= 1, "descriptor weight must be at least 1");
        Self { id, weight }
    }

    /// Descriptor standing only for itself
    pub fn single(id: TargetId) -> Self {
        Self::new(id, 1)
    }
}

/// Stored network definition of one grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDefinition {
    pub target_id: TargetId,
    pub path: PathBuf,
}

/// Lifecycle of a single grid within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TargetState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TargetState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TargetState::Succeeded | TargetState::Failed)
    }
}

/// Lifecycle of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BatchPhase {
    Selecting,
    Dispatching,
    Aggregating,
    Done,
}
